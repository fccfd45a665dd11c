use std::fmt;

use miette::Diagnostic;
use thiserror::Error;

/// Rejection of a hook's parameters.
///
/// This is the only failure a hook reports. Every variant names the hook (or builder) that
/// rejected the call and the offending field so a misconfigured plan can be fixed without
/// reading the hook's source.
#[derive(Clone, Debug, PartialEq, Eq, Error, Diagnostic)]
#[non_exhaustive]
pub enum ValidationError {
    #[error("{hook}: `{field}` is required")]
    #[diagnostic(code(hook::missing_parameter))]
    Missing { hook: &'static str, field: String },

    #[error("{hook}: `{field}` must be {expected}")]
    #[diagnostic(code(hook::wrong_shape))]
    WrongShape {
        hook: &'static str,
        field: String,
        expected: &'static str,
    },

    #[error("{hook}: `{field}` {message}")]
    #[diagnostic(code(hook::constraint))]
    Constraint {
        hook: &'static str,
        field: String,
        message: String,
    },

    #[error("{hook}: invalid parameters: {message}")]
    #[diagnostic(
        code(hook::malformed_parameters),
        help("check the parameter names and value types passed to `{hook}`")
    )]
    Malformed { hook: &'static str, message: String },
}

impl ValidationError {
    pub fn missing(hook: &'static str, field: impl Into<String>) -> Self {
        Self::Missing {
            hook,
            field: field.into(),
        }
    }

    pub fn wrong_shape(hook: &'static str, field: impl Into<String>, expected: &'static str) -> Self {
        Self::WrongShape {
            hook,
            field: field.into(),
            expected,
        }
    }

    pub fn constraint(
        hook: &'static str,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Constraint {
            hook,
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn malformed(hook: &'static str, err: impl fmt::Display) -> Self {
        Self::Malformed {
            hook,
            message: err.to_string(),
        }
    }

    pub fn hook(&self) -> &'static str {
        match self {
            Self::Missing { hook, .. }
            | Self::WrongShape { hook, .. }
            | Self::Constraint { hook, .. }
            | Self::Malformed { hook, .. } => hook,
        }
    }

    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Missing { field, .. }
            | Self::WrongShape { field, .. }
            | Self::Constraint { field, .. } => Some(field),
            Self::Malformed { .. } => None,
        }
    }
}

pub type Result<T, E = ValidationError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_hook_and_field() {
        let err = ValidationError::missing("sqs topology builder", "name");
        assert_eq!(err.to_string(), "sqs topology builder: `name` is required");

        let err = ValidationError::wrong_shape("api", "path", "a string");
        assert_eq!(err.to_string(), "api: `path` must be a string");
        assert_eq!(err.hook(), "api");
        assert_eq!(err.field(), Some("path"));

        let err = ValidationError::malformed("cors", "unknown field `origin`");
        assert_eq!(err.field(), None);
        assert!(err.to_string().contains("unknown field `origin`"));
    }
}
