//! Row types and creation DTOs.

pub mod session;
pub mod user;
