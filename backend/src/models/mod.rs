//! # API Models
//!
//! This module defines the request and response structures for the REST API.
//!
//! ## Organization
//!
//! - `requests.rs` - Query models parsed from incoming requests
//! - `responses.rs` - Outgoing response bodies
//!
//! ## Serialization
//!
//! All models use Serde for JSON serialization/deserialization.
//! Field names stay in snake_case, matching the error body.

pub mod requests;
pub mod responses;

pub use requests::*;
pub use responses::*;
