//! Sync orchestration for rolemask.
//!
//! [`Syncer`] ties an [`ObfuscationStore`](rolemask_core::store::ObfuscationStore)
//! to a [`RoleClient`](rolemask_core::platform::RoleClient) and exposes the
//! job entry points: per-subject and batch name sync, random-key rotation
//! with repositioning, rule-based role coloring, and the subject event
//! outbox consumer.
//!
//! Every mutating platform call goes through [`retry::call_with_retry`] and
//! invalidates the client's role cache on success.

pub mod control;
pub mod error;
pub mod retry;
pub mod rotation;

mod colors;
mod lifecycle;
mod syncer;

pub use control::{BatchControl, BatchLimits};
pub use error::{Error, Result};
pub use lifecycle::ManagedSubject;
pub use retry::{RetryPolicy, Sleeper, TokioSleeper};
pub use rotation::RepositionSettings;
pub use syncer::{ConfigSaved, SyncSettings, Syncer};
