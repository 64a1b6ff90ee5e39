//! Lambda handler behind the signed-request canary API.
//!
//! The handler performs no business logic; a `200` from it proves the
//! gateway accepted the caller's signature.

pub mod config;
pub mod handlers;
