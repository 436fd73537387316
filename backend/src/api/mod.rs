//! # REST API Module
//!
//! Routes are grouped into blueprints: named units that mount a set of
//! routes under a URL prefix. Domain route modules add their blueprint to
//! [`routes::all_blueprints`].
//!
//! ## Built-in Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/` | Service information |
//! | GET | `/health` | Health check |
//! | GET, POST | `/echo` | Echo parsed query-model arguments |
//! | GET | `/echo/none` | Endpoint without arguments |
//! | GET | `/echo/fail` | Raise an error with the given code |
//!
//! ## Response Format
//!
//! ```json
//! // Success response
//! {
//!     "success": true,
//!     "data": { ... }
//! }
//!
//! // Error response
//! {
//!     "error_code": 400,
//!     "error_msg": "page: invalid integer value: 'x'",
//!     "traceback": ["page: invalid integer value: 'x'"]
//! }
//! ```

pub mod handlers;
pub mod routes;

pub use routes::register_blueprints;
