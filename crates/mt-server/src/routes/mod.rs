//! Route handlers.

pub mod admin;
pub mod compose;
pub mod health;
pub mod library;
