//! Model Mutation Errors
//!
//! Errors raised synchronously by the mutation operations of the workflow
//! model. A call that returns one of these has left the model untouched.
//!
//! Structural problems (dangling references, cycles) are not errors in this
//! sense; they are collected as [`ValidationFinding`]s when a workflow is
//! generated.
//!
//! [`ValidationFinding`]: crate::workflow::validator::ValidationFinding

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result alias for model mutations.
pub type Result<T> = std::result::Result<T, ModelError>;

/// Independent name spaces inside a workflow model.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Namespace {
    Parameter,
    Process,
    Profile,
    Input,
    Output,
    Directive,
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Parameter => "parameter",
            Self::Process => "process",
            Self::Profile => "profile",
            Self::Input => "input",
            Self::Output => "output",
            Self::Directive => "directive",
        };
        f.write_str(label)
    }
}

/// Errors reported immediately by a rejected mutation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Invalid {namespace} name '{name}': expected a letter or '_' followed by letters, digits or '_', and not a reserved word")]
    InvalidIdentifier { namespace: Namespace, name: String },

    #[error("Duplicate {namespace} name: '{name}'")]
    DuplicateName { namespace: Namespace, name: String },

    #[error("No {namespace} named '{name}'")]
    NotFound { namespace: Namespace, name: String },

    #[error("Process '{0}' has an empty script body")]
    EmptyScript(String),

    #[error("Parameter '{parameter}' is still referenced by: {}", processes.join(", "))]
    ReferencedByProcess {
        parameter: String,
        processes: Vec<String>,
    },

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl ModelError {
    pub(crate) fn invalid_identifier(namespace: Namespace, name: &str) -> Self {
        Self::InvalidIdentifier {
            namespace,
            name: name.to_string(),
        }
    }

    pub(crate) fn duplicate(namespace: Namespace, name: &str) -> Self {
        Self::DuplicateName {
            namespace,
            name: name.to_string(),
        }
    }

    pub(crate) fn not_found(namespace: Namespace, name: impl Into<String>) -> Self {
        Self::NotFound {
            namespace,
            name: name.into(),
        }
    }

    pub(crate) fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Stable code for the error kind.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidIdentifier { .. } => "INVALID_IDENTIFIER",
            Self::DuplicateName { .. } => "DUPLICATE_NAME",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::EmptyScript(_) => "EMPTY_SCRIPT",
            Self::ReferencedByProcess { .. } => "REFERENCED_BY_PROCESS",
            Self::InvalidValue { .. } => "INVALID_VALUE",
        }
    }
}
