//! URL launching through the system's default browser

use bridge_traits::{
    error::{BridgeError, Result},
    interaction::UrlLauncher,
};
use tracing::debug;

/// Opens URLs with the desktop's registered handler (`xdg-open`, `open`,
/// `start`).
#[derive(Debug, Clone, Default)]
pub struct SystemBrowser;

impl SystemBrowser {
    pub fn new() -> Self {
        Self
    }
}

impl UrlLauncher for SystemBrowser {
    fn open_url(&self, url: &str) -> Result<()> {
        open::that(url)
            .map_err(|e| BridgeError::OperationFailed(format!("Failed to open browser: {}", e)))?;
        debug!("Opened authorization URL in system browser");
        Ok(())
    }
}
