// OS trust store - fallback for platforms without an implementation
// (c) 2024 Ross Younger

use async_trait::async_trait;

use super::{Platform, TrustEntry, TrustStore};
use crate::error::{Error, Result};

/// Refuses to install or delete; nothing is ever installed
#[derive(Debug, Clone)]
pub struct UnsupportedStore {
    os: String,
}

impl UnsupportedStore {
    /// Constructor; `os` names the platform for error messages
    #[must_use]
    pub fn new(os: &str) -> Self {
        Self { os: os.to_string() }
    }
}

#[async_trait]
impl TrustStore for UnsupportedStore {
    fn platform(&self) -> Platform {
        Platform::Unsupported
    }

    async fn install(&self, _: &TrustEntry) -> Result<()> {
        Err(Error::UnsupportedPlatform(self.os.clone()))
    }

    async fn is_installed(&self, _: &TrustEntry) -> bool {
        false
    }

    async fn delete(&self, _: &TrustEntry) -> Result<bool> {
        Err(Error::UnsupportedPlatform(self.os.clone()))
    }
}
