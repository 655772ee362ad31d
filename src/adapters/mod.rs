//! Adapters Layer - External service implementations
//!
//! - `geckoterminal`: pool price lookups over HTTP
//! - `sqlite`: durable alert table

pub mod geckoterminal;
pub mod sqlite;
