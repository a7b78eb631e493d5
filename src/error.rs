//! Error types for the object model
//!
//! Every internal method returns a [`JsResult`]. Specification-mandated
//! rejections (non-configurable, non-extensible, ...) are `Ok(false)`; an
//! `Err` is always an abrupt completion: a thrown value, a non-throw
//! completion travelling through nested algorithms, or a host resource
//! failure.

use thiserror::Error;

use crate::value::{JsString, JsValue};

/// Result of any operation that can complete abruptly.
pub type JsResult<T> = Result<T, JsError>;

/// Abrupt completion record.
#[derive(Debug, Clone, Error)]
pub enum JsError {
    #[error("TypeError: {message}")]
    TypeError { message: String },

    #[error("RangeError: {message}")]
    RangeError { message: String },

    #[error("ReferenceError: {name} is not defined")]
    ReferenceError { name: String },

    /// A value thrown by user code (getter, setter, proxy trap, native function)
    #[error("Uncaught {}", .value.to_js_string())]
    ThrownValue { value: JsValue },

    /// `return` completion threaded through an algorithm
    #[error("Return")]
    Return { value: JsValue },

    /// `break` completion, optionally labelled
    #[error("Break")]
    Break { label: Option<JsString> },

    /// `continue` completion, optionally labelled
    #[error("Continue")]
    Continue { label: Option<JsString> },

    /// Host resource failure: nesting of accessors, traps or prototype walks
    /// went past the configured limit.
    #[error("RangeError: Maximum call stack size exceeded (depth {depth})")]
    RecursionLimit { depth: usize },

    /// Host resource failure: an allocation could not be satisfied.
    #[error("InternalError: out of memory")]
    OutOfMemory,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl JsError {
    pub fn type_error(message: impl Into<String>) -> Self {
        JsError::TypeError {
            message: message.into(),
        }
    }

    pub fn range_error(message: impl Into<String>) -> Self {
        JsError::RangeError {
            message: message.into(),
        }
    }

    pub fn reference_error(name: impl Into<String>) -> Self {
        JsError::ReferenceError { name: name.into() }
    }

    /// Wrap a thrown JsValue
    pub fn thrown(value: JsValue) -> Self {
        JsError::ThrownValue { value }
    }

    pub fn recursion_limit(depth: usize) -> Self {
        JsError::RecursionLimit { depth }
    }

    /// Create an internal error for states that correctly-written callers never reach
    pub fn internal_error(message: impl Into<String>) -> Self {
        JsError::Internal(message.into())
    }

    /// Resource failures must be propagated, never recovered from and retried.
    pub fn is_resource_failure(&self) -> bool {
        matches!(self, JsError::RecursionLimit { .. } | JsError::OutOfMemory)
    }

    /// True for the `throw` completion type (including engine-raised errors)
    pub fn is_throw(&self) -> bool {
        !matches!(
            self,
            JsError::Return { .. } | JsError::Break { .. } | JsError::Continue { .. }
        )
    }

    /// Extract the JsValue carried by this completion
    pub fn to_value(&self) -> JsValue {
        match self {
            JsError::ThrownValue { value } | JsError::Return { value } => value.clone(),
            JsError::Break { .. } | JsError::Continue { .. } => JsValue::Undefined,
            other => JsValue::String(JsString::from(other.to_string())),
        }
    }
}
