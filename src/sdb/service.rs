use crate::error::Error;
use crate::read::reader::RawItem;
use crate::write::common::Expectation;
use crate::write::delete_item::DeleteChange;
use crate::write::put_item::PutChange;

/// Fault codes the service reports for conditions worth retrying.
pub const TRANSIENT_CODES: [&str; 4] = [
    "ServiceUnavailable",
    "RequestThrottled",
    "RequestTimeout",
    "InternalError",
];

/// Fault codes a transport reports for failed exchanges worth retrying.
pub const TRANSPORT_CODES: [&str; 9] = [
    "ConnectFailure",
    "ReceiveFailure",
    "SendFailure",
    "PipelineFailure",
    "ConnectionClosed",
    "KeepAliveFailure",
    "Pending",
    "Timeout",
    "UnknownError",
];

/// Fault codes reporting a violated expectation.
pub const EXPECTATION_CODES: [&str; 2] = ["ConditionalCheckFailed", "AttributeDoesNotExist"];

/// Transport to the attribute service.
///
/// Implementations sign and send the request described by an [`Action`] and
/// decode the reply. They are shared between threads, one request per call.
pub trait Service: Send + Sync {
    /// Executes `action`, returning the decoded response or the fault raised.
    fn execute(&self, action: &Action) -> Result<Response, ServiceFault>;
}

/// A fault raised by the service or its transport.
#[derive(Clone, Debug, Eq, Hash, PartialEq, thiserror::Error)]
#[error("{code}: {message}")]
pub struct ServiceFault {
    /// The fault code.
    pub code: String,
    /// The human readable message.
    pub message: String,
}

impl ServiceFault {
    /// Creates a fault.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Whether the failed request may succeed when sent again.
    pub fn is_transient(&self) -> bool {
        let code = self.code.as_str();
        TRANSIENT_CODES.contains(&code) || TRANSPORT_CODES.contains(&code)
    }

    /// Whether the fault reports a violated expectation.
    pub fn is_expectation_violated(&self) -> bool {
        EXPECTATION_CODES.contains(&self.code.as_str())
    }
}

impl From<ServiceFault> for Error {
    fn from(fault: ServiceFault) -> Self {
        if fault.is_expectation_violated() {
            Error::ExpectationViolated
        } else if fault.is_transient() {
            Error::TransientServiceFault {
                code: fault.code,
                message: fault.message,
            }
        } else {
            Error::PermanentServiceFault {
                code: fault.code,
                message: fault.message,
            }
        }
    }
}

/// A request to the attribute service.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Action {
    /// Lists one page of domain names.
    ListDomains {
        /// Token of the page to fetch.
        next_token: Option<String>,
    },
    /// Creates a domain; creating an existing domain succeeds.
    CreateDomain {
        /// The domain name.
        domain_name: String,
    },
    /// Deletes a domain with every item in it.
    DeleteDomain {
        /// The domain name.
        domain_name: String,
    },
    /// Reads the size statistics of a domain.
    DomainMetadata {
        /// The domain name.
        domain_name: String,
    },
    /// Fetches one page of select results.
    Select {
        /// The compiled select expression.
        select_expression: String,
        /// Token of the page to fetch.
        next_token: Option<String>,
        /// Whether the read must observe every completed write.
        consistent_read: bool,
    },
    /// Writes attribute values to one item.
    PutAttributes {
        /// The domain name.
        domain_name: String,
        /// The item name.
        item_name: String,
        /// The values to write.
        attributes: Vec<PutChange>,
        /// Preconditions of the write.
        expected: Vec<Expectation>,
    },
    /// Deletes attribute values from one item; no attributes deletes the item.
    DeleteAttributes {
        /// The domain name.
        domain_name: String,
        /// The item name.
        item_name: String,
        /// The values to delete.
        attributes: Vec<DeleteChange>,
        /// Preconditions of the deletion.
        expected: Vec<Expectation>,
    },
    /// Writes attribute values to several items.
    BatchPutAttributes {
        /// The domain name.
        domain_name: String,
        /// The items with the values to write.
        items: Vec<(String, Vec<PutChange>)>,
    },
}

impl Action {
    /// The action name sent as the `Action` parameter.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ListDomains { .. } => "ListDomains",
            Self::CreateDomain { .. } => "CreateDomain",
            Self::DeleteDomain { .. } => "DeleteDomain",
            Self::DomainMetadata { .. } => "DomainMetadata",
            Self::Select { .. } => "Select",
            Self::PutAttributes { .. } => "PutAttributes",
            Self::DeleteAttributes { .. } => "DeleteAttributes",
            Self::BatchPutAttributes { .. } => "BatchPutAttributes",
        }
    }

    /// Flattens the action into the service's query parameters.
    ///
    /// Indexed parameters count from zero; signing parameters are left to the transport.
    pub fn parameters(&self) -> Vec<(String, String)> {
        let mut parameters = Parameters::default();
        parameters.add("Action", self.name());
        match self {
            Self::ListDomains { next_token } => {
                parameters.add_optional("NextToken", next_token.as_deref());
            }
            Self::CreateDomain { domain_name }
            | Self::DeleteDomain { domain_name }
            | Self::DomainMetadata { domain_name } => {
                parameters.add("DomainName", domain_name);
            }
            Self::Select {
                select_expression,
                next_token,
                consistent_read,
            } => {
                parameters.add("SelectExpression", select_expression);
                parameters.add_optional("NextToken", next_token.as_deref());
                if *consistent_read {
                    parameters.add("ConsistentRead", "true");
                }
            }
            Self::PutAttributes {
                domain_name,
                item_name,
                attributes,
                expected,
            } => {
                parameters.add("DomainName", domain_name);
                parameters.add("ItemName", item_name);
                parameters.add_put_changes("", attributes);
                parameters.add_expectations(expected);
            }
            Self::DeleteAttributes {
                domain_name,
                item_name,
                attributes,
                expected,
            } => {
                parameters.add("DomainName", domain_name);
                parameters.add("ItemName", item_name);
                for (index, change) in attributes.iter().enumerate() {
                    parameters.add(format!("Attribute.{index}.Name"), &change.name);
                    parameters.add_optional(
                        format!("Attribute.{index}.Value"),
                        change.value.as_deref(),
                    );
                }
                parameters.add_expectations(expected);
            }
            Self::BatchPutAttributes { domain_name, items } => {
                parameters.add("DomainName", domain_name);
                for (index, (item_name, changes)) in items.iter().enumerate() {
                    parameters.add(format!("Item.{index}.ItemName"), item_name);
                    parameters.add_put_changes(&format!("Item.{index}."), changes);
                }
            }
        }
        parameters.0
    }
}

#[derive(Default)]
struct Parameters(Vec<(String, String)>);

impl Parameters {
    fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.push((name.into(), value.into()));
    }

    fn add_optional(&mut self, name: impl Into<String>, value: Option<&str>) {
        if let Some(value) = value {
            self.add(name, value);
        }
    }

    fn add_put_changes(&mut self, prefix: &str, changes: &[PutChange]) {
        for (index, change) in changes.iter().enumerate() {
            self.add(format!("{prefix}Attribute.{index}.Name"), &change.name);
            self.add(format!("{prefix}Attribute.{index}.Value"), &change.value);
            if change.replace {
                self.add(format!("{prefix}Attribute.{index}.Replace"), "true");
            }
        }
    }

    fn add_expectations(&mut self, expectations: &[Expectation]) {
        for (index, expectation) in expectations.iter().enumerate() {
            self.add(format!("Expected.{index}.Name"), expectation.name());
            match expectation {
                Expectation::Equals { value, .. } => {
                    self.add(format!("Expected.{index}.Value"), value);
                    self.add(format!("Expected.{index}.Exists"), "true");
                }
                Expectation::Absent { .. } => {
                    self.add(format!("Expected.{index}.Exists"), "false");
                }
            }
        }
    }
}

/// Size statistics of a domain.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct DomainMetadata {
    /// The number of items.
    pub item_count: u64,
    /// The total size of all item names, in bytes.
    pub item_names_size_bytes: u64,
    /// The total size of all distinct attribute names, in bytes.
    pub attribute_names_size_bytes: u64,
    /// The total size of all attribute values, in bytes.
    pub attribute_values_size_bytes: u64,
}

impl DomainMetadata {
    /// The total stored size, in bytes.
    pub fn size_bytes(&self) -> u64 {
        self.item_names_size_bytes
            + self.attribute_names_size_bytes
            + self.attribute_values_size_bytes
    }
}

/// A decoded reply of the attribute service.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Response {
    /// One page of domain names.
    Domains {
        /// The domain names of this page.
        names: Vec<String>,
        /// Token of the next page, if any.
        next_token: Option<String>,
    },
    /// One page of select results.
    Select {
        /// The items of this page.
        items: Vec<RawItem>,
        /// Token of the next page, if any.
        next_token: Option<String>,
    },
    /// Domain statistics.
    Metadata(DomainMetadata),
    /// A reply without content.
    Empty,
}
