//! Process-wide proxy setting.
//!
//! The configured `PROXY_HOST` is probed once at startup; if the probe fails the
//! proxy is dropped for the whole process. After `init` the value is read-only.

use once_cell::sync::OnceCell;

use crate::core::config;

static ACTIVE_PROXY: OnceCell<Option<String>> = OnceCell::new();

/// Checks that the proxy can reach the probe URL.
pub async fn probe(proxy_url: &str) -> bool {
    let client = match reqwest::Proxy::all(proxy_url).and_then(|p| {
        reqwest::Client::builder()
            .proxy(p)
            .danger_accept_invalid_certs(true)
            .timeout(config::network::proxy_probe_timeout())
            .build()
    }) {
        Ok(client) => client,
        Err(e) => {
            log::error!("Invalid proxy {}: {}", proxy_url, e);
            return false;
        }
    };

    match client.get(config::network::PROXY_PROBE_URL).send().await {
        Ok(resp) => resp.status().is_success(),
        Err(e) => {
            log::error!("Proxy probe via {} failed: {}", proxy_url, e);
            false
        }
    }
}

/// Probes the configured proxy and freezes the result. Later calls return the
/// first value.
pub async fn init() -> Option<&'static str> {
    if let Some(active) = ACTIVE_PROXY.get() {
        return active.as_deref();
    }

    let active = match config::PROXY_HOST.as_deref() {
        Some(host) if probe(host).await => {
            log::info!("Proxy {} reachable", host);
            Some(host.to_string())
        }
        Some(host) => {
            log::warn!("Proxy {} configured but unreachable, connecting directly", host);
            None
        }
        None => None,
    };

    let _ = ACTIVE_PROXY.set(active);
    active_proxy()
}

/// The proxy every outbound component should use, if any.
pub fn active_proxy() -> Option<&'static str> {
    ACTIVE_PROXY.get().and_then(|p| p.as_deref())
}
