//! Domain types shared by the persistence and HTTP layers.
//!
//! Nothing in this crate performs I/O; it holds identifiers, the domain error
//! type, the refresh credential wire format, and input normalization rules.

pub mod credential;
pub mod error;
pub mod types;
pub mod validation;
