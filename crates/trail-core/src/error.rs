use std::fmt;

/// Machine-readable error codes surfaced through API responses and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigParseError,
    StoreOpenFailed,
    EntityNotFound,
    HistoryNotFound,
    InvalidKind,
    ValidationFailed,
    Unauthenticated,
    HistoryWriteFailed,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigParseError => "E1001",
            Self::StoreOpenFailed => "E1002",
            Self::EntityNotFound => "E2001",
            Self::HistoryNotFound => "E2002",
            Self::InvalidKind => "E2003",
            Self::ValidationFailed => "E2004",
            Self::Unauthenticated => "E2005",
            Self::HistoryWriteFailed => "E3001",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and API error bodies.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigParseError => "Config file parse error",
            Self::StoreOpenFailed => "Store open failed",
            Self::EntityNotFound => "Workflow entity not found",
            Self::HistoryNotFound => "History entry not found",
            Self::InvalidKind => "Invalid entity kind",
            Self::ValidationFailed => "Request validation failed",
            Self::Unauthenticated => "Authentication required",
            Self::HistoryWriteFailed => "History entry write failed",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigParseError => Some("Fix syntax in trail.toml and retry."),
            Self::StoreOpenFailed => Some("Check the store path and file permissions."),
            Self::EntityNotFound | Self::HistoryNotFound => None,
            Self::InvalidKind => Some("Use one of: brief, lead, planner."),
            Self::ValidationFailed => Some("Correct the listed fields and retry."),
            Self::Unauthenticated => Some("Send a valid X-Actor-Id header."),
            Self::HistoryWriteFailed => {
                Some("Primary update is unaffected; see logs for the lost diff.")
            }
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
