//! Outcome codes for Strata
//!
//! The store never formats user-facing text. Every outcome handed to the
//! notification collaborator carries one of the structured codes below, and
//! the presentation layer decides how to word it.

use serde::{Deserialize, Serialize};

/// Error code structure for classified outcomes
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorCode<'a> {
    pub code: i32,
    pub message: &'a str,
}

impl ErrorCode<'_> {
    /// Whether this code denotes success.
    pub fn is_success(&self) -> bool {
        self.code == SUCCESS.code
    }
}

impl std::fmt::Display for ErrorCode<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code)
    }
}

// General success code
pub const SUCCESS: ErrorCode<'static> = ErrorCode {
    code: 0,
    message: "success",
};

// Session errors
pub const ACCESS_DENIED: ErrorCode<'static> = ErrorCode {
    code: 10001,
    message: "access denied",
};

pub const SESSION_LOADING: ErrorCode<'static> = ErrorCode {
    code: 10003,
    message: "session still loading",
};

// Dispatch errors
pub const DISPATCH_REJECTED: ErrorCode<'static> = ErrorCode {
    code: 20020,
    message: "settings dispatch rejected",
};
