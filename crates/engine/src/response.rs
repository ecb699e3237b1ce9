//! Caller-facing result shape.

use serde::{Deserialize, Serialize};

use crate::{EngineError, ErrorKind};

/// Outcome of a public operation as handed to callers.
///
/// Either `success` with `data`, or a failure with a short `msg` and its
/// `kind`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
}

impl<T> Response<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            msg: None,
            kind: None,
        }
    }

    pub fn failure(err: &EngineError) -> Self {
        Self {
            success: false,
            data: None,
            msg: Some(err.user_message()),
            kind: Some(err.kind()),
        }
    }
}

impl<T> From<Result<T, EngineError>> for Response<T> {
    fn from(result: Result<T, EngineError>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(err) => Self::failure(&err),
        }
    }
}
