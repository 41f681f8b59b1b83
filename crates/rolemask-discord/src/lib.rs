//! Discord REST implementation of [`rolemask_core::platform::RoleClient`].
//!
//! Talks to the guild role endpoints with a bot token. Role listings are
//! cached for a configurable time and the cache is dropped whenever the
//! sync layer reports a successful mutation.

mod client;

pub use client::{DiscordClient, DiscordConfig};

#[cfg(test)]
mod tests;
