//! Shared HTTP client for all outbound adapters.

use std::time::Duration;

use once_cell::sync::OnceCell;

const CONNECT_TIMEOUT_SECS: u64 = 10;

static HTTP_CLIENT: OnceCell<reqwest::Client> = OnceCell::new();

/// Get the process-wide reqwest client, building it on first use.
///
/// Per-request timeouts are set by each adapter; only the connect timeout
/// lives here.
pub fn get_http_client() -> Result<&'static reqwest::Client, reqwest::Error> {
    HTTP_CLIENT.get_or_try_init(|| {
        reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
    })
}
