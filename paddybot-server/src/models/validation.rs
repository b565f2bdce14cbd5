//! Field-level rejection of request input
//!
//! Each variant names the field and the rule it broke. The API layer turns
//! these into a 422 whose `details` carry `field`, `rule` and, for length
//! rules, `limit`.

/// A request field that failed its rule
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: &'static str },

    #[error("{field} must be at least {min} characters")]
    TooShort { field: &'static str, min: usize },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },

    /// Present and within length, but not shaped like `expected`
    #[error("{field} is malformed: expected {expected}")]
    Malformed {
        field: &'static str,
        expected: &'static str,
    },
}

impl ValidationError {
    /// Name of the offending request field
    pub fn field(&self) -> &'static str {
        match self {
            Self::Required { field }
            | Self::TooShort { field, .. }
            | Self::TooLong { field, .. }
            | Self::Malformed { field, .. } => field,
        }
    }

    /// Machine-readable rule name for clients
    pub fn rule(&self) -> &'static str {
        match self {
            Self::Required { .. } => "required",
            Self::TooShort { .. } => "min_length",
            Self::TooLong { .. } => "max_length",
            Self::Malformed { .. } => "format",
        }
    }

    /// Character bound for length rules
    pub fn limit(&self) -> Option<usize> {
        match self {
            Self::TooShort { min, .. } => Some(*min),
            Self::TooLong { max, .. } => Some(*max),
            Self::Required { .. } | Self::Malformed { .. } => None,
        }
    }
}
