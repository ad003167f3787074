// Gateway notification
//
// The selected gateway is told that a recording is about to start with
// `GET {gateway}/setdata?status=1`.

use std::time::Duration;

use crate::constants::GATEWAY_SETDATA_PATH;
use crate::error::Result;

#[derive(Debug, Clone)]
pub struct GatewayClient {
    client: reqwest::Client,
}

impl GatewayClient {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { client })
    }

    pub fn setdata_url(gateway: &str) -> String {
        format!("{}{}", gateway.trim_end_matches('/'), GATEWAY_SETDATA_PATH)
    }

    /// Returns the HTTP status code of the gateway's reply.
    pub async fn notify_recording(&self, gateway: &str) -> Result<u16> {
        let response = self
            .client
            .get(Self::setdata_url(gateway))
            .query(&[("status", "1")])
            .send()
            .await?;

        let status = response.status();
        log::info!("Gateway {} answered {}", gateway, status);
        Ok(status.as_u16())
    }
}
