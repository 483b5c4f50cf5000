//! Error types for relay wire values.

use thiserror::Error;

/// Errors raised while parsing request parameters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypesError {
    /// A required parameter was not supplied.
    #[error("missing parameter `{0}`")]
    MissingParameter(&'static str),

    /// A parameter was supplied but could not be parsed.
    #[error("invalid parameter `{name}`: {value:?} ({reason})")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Raw value as received.
        value: String,
        /// Why the value was rejected.
        reason: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = TypesError::MissingParameter("tick");
        assert_eq!(err.to_string(), "missing parameter `tick`");

        let err = TypesError::InvalidParameter {
            name: "tps",
            value: "abc".into(),
            reason: "not a number",
        };
        assert_eq!(err.to_string(), "invalid parameter `tps`: \"abc\" (not a number)");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TypesError>();
    }
}
