//! API-compatible types.
//!
//! The types in this module are serialised in an API-friendly way, e.g.:
//!
//! - IDs are serialised as hex strings.
//! - Field names are camelCase.
//! - Viewer-specific fields are computed per request and never stored.

pub mod auth;
pub mod id;
pub mod incident;
