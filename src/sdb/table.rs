use crate::config::TableOptions;
use crate::error::{Error, Result};
use crate::read::reader::{Page, Pager, Reader};
use crate::read::select::Select;
use crate::reliability::Reliability;
use crate::sdb::expression;
use crate::sdb::service::{Action, DomainMetadata, Response, Service};
use crate::table::Table;
use crate::write::batch_put_item::BatchPutWriter;
use crate::write::common::ExpectedWriter;
use crate::write::delete_item::DeleteWriter;
use crate::write::put_item::{PutChange, PutWriter};

use std::sync;

/// The maximum number of items the service accepts in one batch put.
pub const BATCH_PUT_ITEM_LIMIT: usize = 25;

/// Table stored in a domain of the remote attribute service.
///
/// Every request goes through the table's [`Reliability`]. Puts and deletes map
/// to the service's single-item conditional writes; a batch put larger than
/// [`BATCH_PUT_ITEM_LIMIT`] items is split into several requests.
///
/// ```rust,no_run
/// use attribute_table::config::TableOptions;
/// use attribute_table::sdb::service::Service;
/// use attribute_table::sdb::table::SdbTable;
/// use attribute_table::table::Table;
/// use std::sync::Arc;
///
/// # fn example(service: Arc<dyn Service>) -> attribute_table::Result<()> {
/// let options = TableOptions {
///     ensure: true,
///     ..Default::default()
/// };
/// let table = SdbTable::open(service, "users", options)?;
/// table.put("e0", &mut |writer| {
///     writer.replace("status", "active");
/// })?;
/// # Ok(())
/// # }
/// ```
pub struct SdbTable {
    service: sync::Arc<dyn Service>,
    domain_name: String,
    options: TableOptions,
    reliability: Reliability,
}

impl SdbTable {
    /// Opens `domain_name` with the default retry policy.
    ///
    /// A missing domain is created when `options.ensure` is set and is
    /// [`Error::NotFound`] otherwise.
    pub fn open(
        service: sync::Arc<dyn Service>,
        domain_name: impl Into<String>,
        options: TableOptions,
    ) -> Result<Self> {
        Self::open_with_reliability(service, domain_name, options, Reliability::default())
    }

    /// Opens `domain_name`, retrying every request as `reliability` allows.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "attribute_table.sdb.open", skip_all, err)
    )]
    pub fn open_with_reliability(
        service: sync::Arc<dyn Service>,
        domain_name: impl Into<String>,
        options: TableOptions,
        reliability: Reliability,
    ) -> Result<Self> {
        let domain_name = domain_name.into();
        let exists = list_domains(service.as_ref(), &reliability)?.contains(&domain_name);
        if !exists {
            if !options.ensure {
                return Err(Error::NotFound(domain_name));
            }
            let action = Action::CreateDomain {
                domain_name: domain_name.clone(),
            };
            execute(service.as_ref(), &reliability, &action)?;
        }
        Ok(Self {
            service,
            domain_name,
            options,
            reliability,
        })
    }

    /// Lists the names of every domain the service holds.
    pub fn list(service: &dyn Service) -> Result<Vec<String>> {
        list_domains(service, &Reliability::default())
    }

    /// Reads the size statistics of the domain.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "attribute_table.sdb.metadata",
            skip_all,
            fields(domain = %self.domain_name),
            err
        )
    )]
    pub fn metadata(&self) -> Result<DomainMetadata> {
        let action = Action::DomainMetadata {
            domain_name: self.domain_name.clone(),
        };
        match self.execute(&action)? {
            Response::Metadata(metadata) => Ok(metadata),
            response => Err(unexpected(&action, &response)),
        }
    }

    /// The table defaults.
    pub fn options(&self) -> &TableOptions {
        &self.options
    }

    /// Runs a raw select expression, returning a reader over its results.
    ///
    /// The expression is sent as is, so it may name any domain and use any
    /// syntax the service accepts. Pages are followed like in [`Table::select`].
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "attribute_table.sdb.select_expression",
            skip_all,
            fields(domain = %self.domain_name),
            err
        )
    )]
    pub fn select_expression(
        &self,
        select_expression: impl Into<String>,
        consistent_read: bool,
    ) -> Result<Reader> {
        let pager = SelectPager {
            service: self.service.clone(),
            reliability: self.reliability,
            select_expression: select_expression.into(),
            consistent_read,
        };
        Ok(Reader::new(Box::new(pager)))
    }

    fn execute(&self, action: &Action) -> Result<Response> {
        execute(self.service.as_ref(), &self.reliability, action)
    }
}

impl Table for SdbTable {
    fn name(&self) -> &str {
        &self.domain_name
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "attribute_table.sdb.put",
            skip_all,
            fields(domain = %self.domain_name, item_name = %item_name),
            err
        )
    )]
    fn put(&self, item_name: &str, configure: &mut dyn FnMut(&mut PutWriter)) -> Result<()> {
        let mut writer = PutWriter::default();
        configure(&mut writer);
        writer.validate(item_name)?;
        if writer.is_empty() {
            return Ok(());
        }
        let action = Action::PutAttributes {
            domain_name: self.domain_name.clone(),
            item_name: item_name.to_string(),
            attributes: writer.changes().to_vec(),
            expected: writer.expectations().to_vec(),
        };
        self.execute(&action).map(|_| ())
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "attribute_table.sdb.delete",
            skip_all,
            fields(domain = %self.domain_name, item_name = %item_name),
            err
        )
    )]
    fn delete(
        &self,
        item_name: &str,
        configure: &mut dyn FnMut(&mut DeleteWriter),
    ) -> Result<()> {
        let mut writer = DeleteWriter::default();
        configure(&mut writer);
        writer.validate(item_name)?;
        if writer.is_empty() {
            return Ok(());
        }
        let attributes = if writer.deletes_item() {
            Vec::new()
        } else {
            writer.changes().to_vec()
        };
        let action = Action::DeleteAttributes {
            domain_name: self.domain_name.clone(),
            item_name: item_name.to_string(),
            attributes,
            expected: writer.expectations().to_vec(),
        };
        self.execute(&action).map(|_| ())
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "attribute_table.sdb.batch_put",
            skip_all,
            fields(domain = %self.domain_name),
            err
        )
    )]
    fn batch_put(&self, configure: &mut dyn FnMut(&mut BatchPutWriter)) -> Result<()> {
        let mut writer = BatchPutWriter::default();
        configure(&mut writer);
        writer.validate()?;
        let items: Vec<(String, Vec<PutChange>)> = writer
            .items()
            .filter(|(_, changes)| !changes.is_empty())
            .map(|(item_name, changes)| (item_name.to_string(), changes.to_vec()))
            .collect();
        for chunk in items.chunks(BATCH_PUT_ITEM_LIMIT) {
            let action = Action::BatchPutAttributes {
                domain_name: self.domain_name.clone(),
                items: chunk.to_vec(),
            };
            self.execute(&action)?;
        }
        Ok(())
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "attribute_table.sdb.select",
            skip_all,
            fields(domain = %self.domain_name),
            err
        )
    )]
    fn select(&self, select: &Select) -> Result<Reader> {
        let select_expression = expression::select_expression(
            &self.domain_name,
            &select.selection,
            select.effective_condition(),
            select.limit.or(self.options.select_limit),
        )?;
        let consistent_read = select
            .consistent_read
            .unwrap_or(self.options.consistent_read);
        self.select_expression(select_expression, consistent_read)
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "attribute_table.sdb.delete_table",
            skip_all,
            fields(domain = %self.domain_name),
            err
        )
    )]
    fn delete_table(&self) -> Result<()> {
        let action = Action::DeleteDomain {
            domain_name: self.domain_name.clone(),
        };
        self.execute(&action).map(|_| ())
    }
}

impl std::fmt::Debug for SdbTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SdbTable")
            .field("domain_name", &self.domain_name)
            .field("options", &self.options)
            .field("reliability", &self.reliability)
            .finish_non_exhaustive()
    }
}

/// Fetches select pages, following the service's next tokens.
struct SelectPager {
    service: sync::Arc<dyn Service>,
    reliability: Reliability,
    select_expression: String,
    consistent_read: bool,
}

impl Pager for SelectPager {
    fn fetch(&mut self, continuation: Option<&str>) -> Result<Page> {
        let action = Action::Select {
            select_expression: self.select_expression.clone(),
            next_token: continuation.map(str::to_string),
            consistent_read: self.consistent_read,
        };
        match execute(self.service.as_ref(), &self.reliability, &action)? {
            Response::Select { items, next_token } => Ok(Page {
                items,
                continuation: next_token,
            }),
            response => Err(unexpected(&action, &response)),
        }
    }
}

fn execute(service: &dyn Service, reliability: &Reliability, action: &Action) -> Result<Response> {
    reliability.execute(|| service.execute(action).map_err(Error::from))
}

fn list_domains(service: &dyn Service, reliability: &Reliability) -> Result<Vec<String>> {
    let mut domain_names = Vec::new();
    let mut next_token = None;
    loop {
        let action = Action::ListDomains { next_token };
        match execute(service, reliability, &action)? {
            Response::Domains { names, next_token: None } => {
                domain_names.extend(names);
                return Ok(domain_names);
            }
            Response::Domains {
                names,
                next_token: token,
            } => {
                domain_names.extend(names);
                next_token = token;
            }
            response => return Err(unexpected(&action, &response)),
        }
    }
}

fn unexpected(action: &Action, response: &Response) -> Error {
    Error::PermanentServiceFault {
        code: "UnexpectedResponse".to_string(),
        message: format!("{} answered with {response:?}", action.name()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::condition::Condition;
    use crate::common::selection::Selection;
    use crate::read::reader::{RawItem, ReaderPosition};
    use crate::sdb::service::ServiceFault;
    use crate::table::extension::TableExt;

    use std::{collections, time};

    /// Records every action and answers from a script, then with `Empty`.
    struct ScriptedService {
        actions: sync::Mutex<Vec<Action>>,
        responses: sync::Mutex<collections::VecDeque<Result<Response, ServiceFault>>>,
    }

    impl ScriptedService {
        fn new(responses: Vec<Result<Response, ServiceFault>>) -> sync::Arc<Self> {
            sync::Arc::new(Self {
                actions: sync::Mutex::new(Vec::new()),
                responses: sync::Mutex::new(responses.into()),
            })
        }

        fn actions(&self) -> Vec<Action> {
            self.actions.lock().unwrap().clone()
        }
    }

    impl Service for ScriptedService {
        fn execute(&self, action: &Action) -> Result<Response, ServiceFault> {
            self.actions.lock().unwrap().push(action.clone());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(Response::Empty))
        }
    }

    fn domains(names: &[&str], next_token: Option<&str>) -> Result<Response, ServiceFault> {
        Ok(Response::Domains {
            names: names.iter().map(|name| name.to_string()).collect(),
            next_token: next_token.map(str::to_string),
        })
    }

    fn item(name: &str, attributes: &[(&str, &str)]) -> RawItem {
        RawItem {
            name: name.to_string(),
            attributes: attributes
                .iter()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect(),
        }
    }

    fn quick() -> Reliability {
        Reliability {
            max_retries: 2,
            backoff_base: time::Duration::from_millis(1),
        }
    }

    /// Opens domain `d` on a service answering the open with one domain page.
    fn open(
        responses: Vec<Result<Response, ServiceFault>>,
        options: TableOptions,
    ) -> (SdbTable, sync::Arc<ScriptedService>) {
        let mut script = vec![domains(&["d"], None)];
        script.extend(responses);
        let service = ScriptedService::new(script);
        let table = SdbTable::open_with_reliability(service.clone(), "d", options, quick()).unwrap();
        service.actions.lock().unwrap().clear();
        (table, service)
    }

    #[test]
    fn test_open_existing_across_pages() {
        let service = ScriptedService::new(vec![
            domains(&["a", "b"], Some("t1")),
            domains(&["d"], None),
        ]);
        let table =
            SdbTable::open_with_reliability(service.clone(), "d", TableOptions::default(), quick())
                .unwrap();
        assert_eq!(table.name(), "d");
        assert_eq!(
            service.actions(),
            vec![
                Action::ListDomains { next_token: None },
                Action::ListDomains {
                    next_token: Some("t1".to_string()),
                },
            ]
        );
    }

    #[test]
    fn test_open_missing() {
        let service = ScriptedService::new(vec![domains(&["a"], None)]);
        let actual =
            SdbTable::open_with_reliability(service.clone(), "d", TableOptions::default(), quick());
        assert!(matches!(actual, Err(Error::NotFound(name)) if name == "d"));
        assert_eq!(service.actions().len(), 1);
    }

    #[test]
    fn test_open_ensure_creates() {
        let service = ScriptedService::new(vec![domains(&["a"], None)]);
        let options = TableOptions {
            ensure: true,
            ..Default::default()
        };
        SdbTable::open_with_reliability(service.clone(), "d", options, quick()).unwrap();
        assert_eq!(
            service.actions()[1],
            Action::CreateDomain {
                domain_name: "d".to_string(),
            }
        );
    }

    #[test]
    fn test_list() {
        let service = ScriptedService::new(vec![domains(&["a"], Some("t")), domains(&["b"], None)]);
        let actual = SdbTable::list(service.as_ref()).unwrap();
        assert_eq!(actual, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_put() {
        let (table, service) = open(vec![], TableOptions::default());
        table
            .put("e1", &mut |writer| {
                writer.expect_absent("X");
                writer.add("X", "A");
            })
            .unwrap();
        assert_eq!(
            service.actions(),
            vec![Action::PutAttributes {
                domain_name: "d".to_string(),
                item_name: "e1".to_string(),
                attributes: vec![PutChange {
                    name: "X".to_string(),
                    value: "A".to_string(),
                    replace: false,
                }],
                expected: vec![crate::write::common::Expectation::Absent {
                    name: "X".to_string(),
                }],
            }]
        );
    }

    #[test]
    fn test_put_nothing_issues_no_request() {
        let (table, service) = open(vec![], TableOptions::default());
        table.put("e0", &mut |_| {}).unwrap();
        table.delete("e0", &mut |_| {}).unwrap();
        table.batch_put(&mut |_| {}).unwrap();
        assert!(service.actions().is_empty());
    }

    #[test]
    fn test_put_empty_name() {
        let (table, service) = open(vec![], TableOptions::default());
        let actual = table.put("", &mut |writer| {
            writer.add("a", "1");
        });
        assert!(matches!(actual, Err(Error::EmptyName)));
        assert!(service.actions().is_empty());
    }

    #[test]
    fn test_put_expectation_violated() {
        let (table, service) = open(
            vec![Err(ServiceFault::new("ConditionalCheckFailed", "a"))],
            TableOptions::default(),
        );
        let actual = table.put("e1", &mut |writer| {
            writer.expect_absent("X");
            writer.add("X", "A");
        });
        assert!(matches!(actual, Err(Error::ExpectationViolated)));
        assert_eq!(service.actions().len(), 1);
    }

    #[test]
    fn test_put_retries_transient_fault() {
        let (table, service) = open(
            vec![
                Err(ServiceFault::new("ServiceUnavailable", "a")),
                Err(ServiceFault::new("Timeout", "b")),
            ],
            TableOptions::default(),
        );
        table
            .put("e0", &mut |writer| {
                writer.add("a", "1");
            })
            .unwrap();
        assert_eq!(service.actions().len(), 3);
    }

    #[test]
    fn test_put_permanent_fault() {
        let (table, service) = open(
            vec![Err(ServiceFault::new("NoSuchDomain", "a"))],
            TableOptions::default(),
        );
        let actual = table.put("e0", &mut |writer| {
            writer.add("a", "1");
        });
        assert!(matches!(actual, Err(Error::PermanentServiceFault { code, .. }) if code == "NoSuchDomain"));
        assert_eq!(service.actions().len(), 1);
    }

    #[test]
    fn test_delete_item() {
        let (table, service) = open(vec![], TableOptions::default());
        table
            .delete("e0", &mut |writer| {
                writer.delete_attribute("a");
                writer.delete_item();
            })
            .unwrap();
        assert_eq!(
            service.actions(),
            vec![Action::DeleteAttributes {
                domain_name: "d".to_string(),
                item_name: "e0".to_string(),
                attributes: vec![],
                expected: vec![],
            }]
        );
    }

    #[test]
    fn test_batch_put_splits_requests() {
        let (table, service) = open(vec![], TableOptions::default());
        table
            .batch_put(&mut |writer| {
                for index in 0..30 {
                    writer.replace(format!("e{index}"), "a", "1");
                }
            })
            .unwrap();
        let actions = service.actions();
        assert_eq!(actions.len(), 2);
        match &actions[1] {
            Action::BatchPutAttributes { items, .. } => {
                assert_eq!(items.len(), 5);
                assert_eq!(items[0].0, "e25");
            }
            action => panic!("unexpected action {action:?}"),
        }
    }

    #[test]
    fn test_select_pages() {
        let options = TableOptions {
            select_limit: Some(2),
            consistent_read: true,
            ..Default::default()
        };
        let (table, service) = open(
            vec![
                Ok(Response::Select {
                    items: vec![item("e0", &[("X", "A"), ("Y", "B"), ("X", "C")])],
                    next_token: Some("t1".to_string()),
                }),
                Ok(Response::Select {
                    items: vec![],
                    next_token: Some("t2".to_string()),
                }),
                Ok(Response::Select {
                    items: vec![item("e1", &[])],
                    next_token: None,
                }),
            ],
            options,
        );
        let select = Select::with_condition(Some(Condition::attribute_value("X", "A")));
        let mut reader = table.select(&select).unwrap();
        let mut positions = Vec::new();
        while reader.read().unwrap() != ReaderPosition::End {
            positions.push((
                reader.position(),
                reader.item_name().map(str::to_string),
                reader.attribute_value().map(str::to_string),
            ));
        }
        assert_eq!(
            positions,
            vec![
                (ReaderPosition::Item, Some("e0".to_string()), Some("A".to_string())),
                (ReaderPosition::Value, Some("e0".to_string()), Some("C".to_string())),
                (ReaderPosition::Attribute, Some("e0".to_string()), Some("B".to_string())),
                (ReaderPosition::EmptyItem, Some("e1".to_string()), None),
            ]
        );
        let expected = |next_token: Option<&str>| Action::Select {
            select_expression: "select * from d where X = 'A' limit 2".to_string(),
            next_token: next_token.map(str::to_string),
            consistent_read: true,
        };
        assert_eq!(
            service.actions(),
            vec![expected(None), expected(Some("t1")), expected(Some("t2"))]
        );
    }

    #[test]
    fn test_select_overrides_defaults() {
        let options = TableOptions {
            select_limit: Some(2),
            consistent_read: true,
            ..Default::default()
        };
        let (table, service) = open(
            vec![Ok(Response::Select {
                items: vec![],
                next_token: None,
            })],
            options,
        );
        let select = Select {
            selection: Selection::ItemName,
            consistent_read: Some(false),
            limit: Some(7),
            ..Default::default()
        };
        let mut reader = table.select(&select).unwrap();
        assert_eq!(reader.read().unwrap(), ReaderPosition::End);
        assert_eq!(
            service.actions(),
            vec![Action::Select {
                select_expression: "select itemName() from d limit 7".to_string(),
                next_token: None,
                consistent_read: false,
            }]
        );
    }

    #[test]
    fn test_select_raw_expression() {
        let (table, service) = open(
            vec![
                Ok(Response::Select {
                    items: vec![item("e0", &[("a", "1")])],
                    next_token: Some("t1".to_string()),
                }),
                Ok(Response::Select {
                    items: vec![item("e1", &[("a", "2")])],
                    next_token: None,
                }),
            ],
            TableOptions::default(),
        );
        let expression = "select a from other where a > '0' order by a";
        let mut reader = table.select_expression(expression, true).unwrap();
        assert!(service.actions().is_empty());

        let mut names = Vec::new();
        while reader.read().unwrap() != ReaderPosition::End {
            names.push(reader.item_name().unwrap().to_string());
        }
        assert_eq!(names, vec!["e0".to_string(), "e1".to_string()]);
        assert_eq!(
            service.actions(),
            vec![
                Action::Select {
                    select_expression: expression.to_string(),
                    next_token: None,
                    consistent_read: true,
                },
                Action::Select {
                    select_expression: expression.to_string(),
                    next_token: Some("t1".to_string()),
                    consistent_read: true,
                },
            ]
        );
    }

    #[test]
    fn test_select_empty_in_issues_no_request() {
        let (table, service) = open(vec![], TableOptions::default());
        let select = Select::with_condition(Some(Condition::attribute_in("X", Vec::<String>::new())));
        assert!(matches!(table.select(&select), Err(Error::InvalidPredicate(_))));
        assert!(service.actions().is_empty());
    }

    #[test]
    fn test_select_count() {
        let (table, service) = open(
            vec![
                Ok(Response::Select {
                    items: vec![item("Domain", &[("Count", "100")])],
                    next_token: Some("t1".to_string()),
                }),
                Ok(Response::Select {
                    items: vec![item("Domain", &[("Count", "23")])],
                    next_token: None,
                }),
            ],
            TableOptions {
                select_limit: Some(5),
                ..Default::default()
            },
        );
        let condition = Condition::attribute_is_not_null("a");
        assert_eq!(table.select_count(Some(&condition)).unwrap(), 123);
        match &service.actions()[0] {
            Action::Select {
                select_expression, ..
            } => assert_eq!(select_expression, "select count(*) from d where a is not null"),
            action => panic!("unexpected action {action:?}"),
        }
    }

    #[test]
    fn test_erase() {
        let (table, service) = open(
            vec![Ok(Response::Select {
                items: vec![item("e0", &[]), item("e1", &[])],
                next_token: None,
            })],
            TableOptions::default(),
        );
        table.erase().unwrap();
        let deleted: Vec<_> = service
            .actions()
            .into_iter()
            .filter_map(|action| match action {
                Action::DeleteAttributes { item_name, .. } => Some(item_name),
                _ => None,
            })
            .collect();
        assert_eq!(deleted, vec!["e0".to_string(), "e1".to_string()]);
    }

    #[test]
    fn test_metadata() {
        let metadata = DomainMetadata {
            item_count: 3,
            item_names_size_bytes: 10,
            attribute_names_size_bytes: 20,
            attribute_values_size_bytes: 30,
        };
        let (table, _) = open(vec![Ok(Response::Metadata(metadata))], TableOptions::default());
        let actual = table.metadata().unwrap();
        assert_eq!(actual.item_count, 3);
        assert_eq!(actual.size_bytes(), 60);
    }

    #[test]
    fn test_unexpected_response() {
        let (table, _) = open(vec![Ok(Response::Empty)], TableOptions::default());
        assert!(matches!(
            table.metadata(),
            Err(Error::PermanentServiceFault { code, .. }) if code == "UnexpectedResponse"
        ));
    }

    #[test]
    fn test_delete_table() {
        let (table, service) = open(vec![], TableOptions::default());
        table.delete_table().unwrap();
        assert_eq!(
            service.actions(),
            vec![Action::DeleteDomain {
                domain_name: "d".to_string(),
            }]
        );
    }
}
