//! SQLite alert store adapter

mod store;

pub use store::SqliteAlertStore;
