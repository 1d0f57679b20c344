//! Core logic for the members-query bot.
//!
//! Group membership lists are treated as sets and combined with a small boolean
//! set-algebra language. Telegram lives behind the `MembershipProvider` port,
//! implemented in the adapter crate.

pub mod cache;
pub mod config;
pub mod domain;
pub mod errors;
pub mod executor;
pub mod formatting;
pub mod logging;
pub mod ports;
pub mod query;
pub mod roster;
pub mod security;
pub mod set;

pub use errors::{Error, Result};
