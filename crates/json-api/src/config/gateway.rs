//! Payment Gateway Config

use clap::Args;
use kitbag_app::domain::payments::{GatewayConfig, GatewaySecret};

/// Payment gateway connection settings.
#[derive(Debug, Args)]
pub struct GatewayClientConfig {
    /// Gateway API base URL
    #[arg(long, env = "GATEWAY_BASE_URL", default_value = "https://api.razorpay.com")]
    pub gateway_base_url: String,

    /// Merchant key id
    #[arg(long, env = "GATEWAY_KEY_ID")]
    pub gateway_key_id: String,

    /// Merchant key secret
    #[arg(long, env = "GATEWAY_KEY_SECRET")]
    pub gateway_key_secret: String,
}

impl GatewayClientConfig {
    #[must_use]
    pub fn to_gateway_config(&self) -> GatewayConfig {
        GatewayConfig {
            base_url: self.gateway_base_url.clone(),
            key_id: self.gateway_key_id.clone(),
            key_secret: GatewaySecret::new(self.gateway_key_secret.clone()),
        }
    }
}
