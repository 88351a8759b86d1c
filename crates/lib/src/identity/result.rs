use serde::{Deserialize, Serialize};

use crate::Error;

/// One reason a write was refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityFault {
    pub code: String,
    pub description: String,
}

/// Outcome of a create, update or delete.
///
/// Write paths never surface raw backend errors; they report them here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdentityResult {
    Success,
    Failed(Vec<IdentityFault>),
}

impl IdentityResult {
    pub fn succeeded(&self) -> bool {
        matches!(self, IdentityResult::Success)
    }

    /// Faults of a failed result; empty on success.
    pub fn faults(&self) -> &[IdentityFault] {
        match self {
            IdentityResult::Success => &[],
            IdentityResult::Failed(faults) => faults,
        }
    }
}

impl From<&Error> for IdentityFault {
    fn from(err: &Error) -> Self {
        IdentityFault {
            code: err.code(),
            description: err.to_string(),
        }
    }
}

impl From<Error> for IdentityResult {
    fn from(err: Error) -> Self {
        IdentityResult::Failed(vec![IdentityFault::from(&err)])
    }
}
