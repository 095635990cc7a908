//! Best-effort IP geolocation.
//!
//! Enrichment only, never a hard dependency: private and loopback
//! addresses map straight to "Local network", public addresses are
//! looked up once against an ip-api-style endpoint with a short timeout
//! and cached for the lifetime of the process.  Every failure — bad
//! address, timeout, transport error, malformed body — yields the
//! unknown sentinel.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Mutex;
use std::time::Duration;

use tracing::debug;

use crate::{LOCAL_NETWORK, UNKNOWN_LOCATION};

const LOOKUP_TIMEOUT: Duration = Duration::from_secs(3);

pub struct GeoResolver {
    endpoint: String,
    http: reqwest::Client,
    cache: Mutex<HashMap<String, String>>,
}

impl GeoResolver {
    /// `endpoint` is the lookup base URL; the IP is appended as a path
    /// segment (ip-api.com JSON convention).
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            http: reqwest::Client::builder()
                .timeout(LOOKUP_TIMEOUT)
                .build()
                .unwrap_or_default(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve an IP to a free-text location label.
    pub async fn resolve(&self, ip: &str) -> String {
        if let Some(label) = self.local_label(ip) {
            return label;
        }
        if let Some(cached) = self.cached(ip) {
            return cached;
        }
        let label = self.lookup(ip).await.unwrap_or_else(|| UNKNOWN_LOCATION.to_owned());
        // Unknown results are cached too: a flaky upstream should not be
        // re-queried on every ping.
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(ip.to_owned(), label.clone());
        }
        label
    }

    fn cached(&self, ip: &str) -> Option<String> {
        self.cache.lock().ok()?.get(ip).cloned()
    }

    fn local_label(&self, ip: &str) -> Option<String> {
        let parsed: IpAddr = ip.parse().ok()?;
        let is_local = match parsed {
            IpAddr::V4(v4) => v4.is_private() || v4.is_loopback() || v4.is_link_local(),
            IpAddr::V6(v6) => v6.is_loopback() || v6.is_unique_local(),
        };
        is_local.then(|| LOCAL_NETWORK.to_owned())
    }

    async fn lookup(&self, ip: &str) -> Option<String> {
        let url = format!("{}/{}", self.endpoint.trim_end_matches('/'), ip);
        let body: serde_json::Value = match self.http.get(&url).send().await {
            Ok(response) => match response.json().await {
                Ok(body) => body,
                Err(e) => {
                    debug!(ip, error = %e, "geolocation body not parseable");
                    return None;
                }
            },
            Err(e) => {
                debug!(ip, error = %e, "geolocation lookup failed");
                return None;
            }
        };
        let parts: Vec<&str> = ["city", "regionName", "country"]
            .iter()
            .filter_map(|key| body.get(*key).and_then(|v| v.as_str()))
            .filter(|s| !s.is_empty())
            .collect();
        if parts.is_empty() {
            return None;
        }
        Some(parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> GeoResolver {
        GeoResolver::new("http://ip-api.invalid/json")
    }

    #[tokio::test]
    async fn private_addresses_are_local() {
        let geo = resolver();
        assert_eq!(geo.resolve("192.168.1.10").await, LOCAL_NETWORK);
        assert_eq!(geo.resolve("127.0.0.1").await, LOCAL_NETWORK);
        assert_eq!(geo.resolve("10.0.0.2").await, LOCAL_NETWORK);
    }

    #[tokio::test]
    async fn unparseable_address_degrades_to_unknown() {
        let geo = resolver();
        assert_eq!(geo.resolve("not-an-ip").await, UNKNOWN_LOCATION);
    }

    #[tokio::test]
    async fn failed_lookup_is_cached() {
        let geo = resolver();
        // .invalid never resolves, so the first call fails and caches.
        assert_eq!(geo.resolve("93.184.216.34").await, UNKNOWN_LOCATION);
        assert!(geo.cached("93.184.216.34").is_some());
    }
}
