//! Route handlers for the credential lifecycle API.

pub mod auth;
pub mod health;
pub mod me;
