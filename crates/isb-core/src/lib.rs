//! Core domain + application logic for the Infosphere school bot.
//!
//! Telegram lives behind the ports in [`messaging::port`], implemented in the
//! adapter crate.

pub mod access;
pub mod audit;
pub mod config;
pub mod console;
pub mod conversation;
pub mod domain;
pub mod errors;
pub mod identity_store;
pub mod logging;
pub mod menu;
pub mod messaging;
pub mod moderation;
pub mod rate_limit;
pub mod workflow;

#[cfg(test)]
pub(crate) mod testing;

pub use errors::{Error, Result};
