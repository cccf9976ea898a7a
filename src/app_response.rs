use std::fmt::{Display, Formatter};
use std::io::Error as IoError;

use serde::{Deserialize, Serialize};
use serde_json::Error as SerdeError;
use serde_json::Value as JsonValue;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AppResponse {
    StorageError(String),
    SerializationError(String),
    NotFound(String),
    ValidationError(String),
    BadRequest(String),
    Rejected(String),
    TimedOut(String),
    ExecutionFailed(String),
    Ok(String),
}

impl Display for AppResponse {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            AppResponse::StorageError(msg) => write!(f, "Storage error: {}", msg),
            AppResponse::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            AppResponse::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppResponse::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            AppResponse::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            AppResponse::Rejected(msg) => write!(f, "Rejected: {}", msg),
            AppResponse::TimedOut(msg) => write!(f, "Timed out: {}", msg),
            AppResponse::ExecutionFailed(msg) => write!(f, "Execution failed: {}", msg),
            AppResponse::Ok(msg) => write!(f, "Ok: {}", msg),
        }
    }
}

impl std::error::Error for AppResponse {}

impl From<IoError> for AppResponse {
    fn from(err: IoError) -> Self {
        AppResponse::StorageError(format!("IO error: {}", err))
    }
}

impl From<SerdeError> for AppResponse {
    fn from(err: SerdeError) -> Self {
        AppResponse::SerializationError(format!("JSON serialization error: {}", err))
    }
}

impl From<toml::de::Error> for AppResponse {
    fn from(err: toml::de::Error) -> Self {
        AppResponse::SerializationError(format!("Config parse error: {}", err))
    }
}

impl From<toml::ser::Error> for AppResponse {
    fn from(err: toml::ser::Error) -> Self {
        AppResponse::SerializationError(format!("Config serialization error: {}", err))
    }
}

impl AppResponse {
    pub fn success(msg: impl Into<String>) -> Self {
        AppResponse::Ok(msg.into())
    }

    /// The bare message, without the variant prefix `Display` adds.
    pub fn message(&self) -> &str {
        match self {
            AppResponse::StorageError(msg)
            | AppResponse::SerializationError(msg)
            | AppResponse::NotFound(msg)
            | AppResponse::ValidationError(msg)
            | AppResponse::BadRequest(msg)
            | AppResponse::Rejected(msg)
            | AppResponse::TimedOut(msg)
            | AppResponse::ExecutionFailed(msg)
            | AppResponse::Ok(msg) => msg,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, AppResponse::Ok(_))
    }
}

/// The `{success, message, ...}` object every contract function hands back to
/// the request layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationResult {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<JsonValue>,
}

impl OperationResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            id: None,
            data: None,
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_data(mut self, data: JsonValue) -> Self {
        self.data = Some(data);
        self
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            log::warn!("Error serializing operation result: {e}");
            serde_json::json!({"success": false, "message": format!("Error: {e}")}).to_string()
        })
    }
}

impl From<AppResponse> for OperationResult {
    fn from(response: AppResponse) -> Self {
        let message = match &response {
            AppResponse::Ok(msg) | AppResponse::NotFound(msg) | AppResponse::Rejected(msg) => {
                msg.clone()
            }
            other => format!("Error: {}", other.message()),
        };
        Self {
            success: response.is_ok(),
            message,
            id: None,
            data: None,
        }
    }
}
