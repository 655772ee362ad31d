//! GeckoTerminal price source adapter

mod client;

pub use client::{GeckoTerminalClient, GECKOTERMINAL_API};
