//! Error type for `rolemask-sync`.

use rolemask_core::platform::PlatformError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] rolemask_core::Error),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("platform error: {0}")]
  Platform(#[from] PlatformError),
}

impl Error {
  /// Box a backend error from any [`ObfuscationStore`](rolemask_core::store::ObfuscationStore).
  pub fn store<E: std::error::Error + Send + Sync + 'static>(err: E) -> Self {
    Self::Store(Box::new(err))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
