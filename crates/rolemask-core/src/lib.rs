//! Core types and trait definitions for rolemask.
//!
//! rolemask keeps the roles of a chat platform guild in line with a set of
//! internal subjects (groups and states) while hiding the subjects' real
//! names behind deterministic or randomised pseudonyms.
//!
//! This crate is free of HTTP and database dependencies. It holds the pure
//! naming and palette engines, the roleset resolver, and the capability
//! traits ([`store::ObfuscationStore`], [`platform::RoleClient`]) the other
//! crates implement or drive.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod color;
pub mod color_rule;
pub mod config;
pub mod error;
pub mod event;
pub mod obfuscate;
pub mod platform;
pub mod resolve;
pub mod role;
pub mod settings;
pub mod store;
pub mod subject;

pub use error::{Error, Result};
