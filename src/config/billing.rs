//! Billing-facing configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Billing configuration
///
/// The engine only reads subscription state; the upgrade URL is the one piece
/// of billing surface it hands back to clients on entitlement denials.
#[derive(Debug, Clone, Deserialize)]
pub struct BillingConfig {
    /// Where denied users are sent to upgrade
    #[serde(default = "default_upgrade_url")]
    pub upgrade_url: String,
}

impl BillingConfig {
    /// Validate billing configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.upgrade_url.starts_with("http://") && !self.upgrade_url.starts_with("https://") {
            return Err(ValidationError::InvalidUpgradeUrl);
        }
        Ok(())
    }
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            upgrade_url: default_upgrade_url(),
        }
    }
}

fn default_upgrade_url() -> String {
    "https://app.mindpath.example/upgrade".to_string()
}
