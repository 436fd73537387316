//! # API Response Models
//!
//! Structures for outgoing API response bodies.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Standard success wrapper.
///
/// ```json
/// {
///     "success": true,
///     "data": { ... }
/// }
/// ```
///
/// Failures never use this wrapper, see [`ErrorBody`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> ApiResponse<T> {
    /// Create a successful response with data.
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Body of every error response.
///
/// ```json
/// {
///     "error_code": 500,
///     "error_msg": "Database error: Database connection failed: refused",
///     "traceback": [
///         "Database error: Database connection failed: refused",
///         "Database connection failed: refused"
///     ]
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// HTTP status code.
    pub error_code: u16,

    /// Human-readable message.
    pub error_msg: String,

    /// Error source chain, outermost first.
    pub traceback: Vec<String>,
}

/// Entry of the blueprint list in [`ServiceInfoResponse`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlueprintInfo {
    pub name: String,
    pub url_prefix: String,
}

/// Returned by `GET /`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceInfoResponse {
    pub name: String,
    pub version: String,
    pub namespace: String,
    pub blueprints: Vec<BlueprintInfo>,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status: "healthy" or "unhealthy".
    pub status: String,

    /// Database connection status.
    pub database: bool,

    /// Connections currently open in the pool.
    pub pool_size: u64,

    /// Configured pool capacity.
    pub pool_max_size: u64,

    /// Service version.
    pub version: String,

    pub namespace: String,

    /// Current timestamp (`YYYY-MM-DD HH:MM:SS`, UTC).
    pub timestamp: String,
}

/// Returned by the echo endpoints: the model name and what it parsed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EchoResponse {
    pub model: String,
    pub args: Map<String, Value>,

    /// Row offset derived from the paging arguments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,

    /// Filters the request actually supplied, as `name=value`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<String>,
}
