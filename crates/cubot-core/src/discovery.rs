//! Controller discovery on a /24 subnet.

use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;
use tracing::{debug, info, instrument, warn};

use crate::protocol::Endpoint;

/// Probe every host of `subnet` (`a.b.c`) with `workers` threads, each
/// scanning a contiguous block of addresses. Returns responding hosts in
/// ascending order.
pub fn discover_with<P>(subnet: &str, workers: usize, probe: P) -> Vec<String>
where
    P: Fn(&str) -> bool + Sync,
{
    let workers = workers.clamp(1, 256);
    let block = 256usize.div_ceil(workers);
    let probe = &probe;

    let mut found: Vec<u8> = thread::scope(|scope| {
        let handles: Vec<_> = (0..workers)
            .map(|w| {
                let start = w * block;
                let end = (start + block).min(256);
                scope.spawn(move || {
                    (start..end)
                        .filter_map(|octet| {
                            let octet = octet as u8;
                            probe(&format!("{subnet}.{octet}")).then_some(octet)
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        handles
            .into_iter()
            .flat_map(|h| h.join().unwrap_or_default())
            .collect()
    });

    found.sort_unstable();
    found
        .into_iter()
        .map(|octet| format!("{subnet}.{octet}"))
        .collect()
}

/// Scan `subnet` for controllers answering `checkConnection`.
#[instrument(level = "info")]
pub fn discover(subnet: &str, workers: usize, probe_timeout: Duration) -> Vec<String> {
    let client = match Client::builder().timeout(probe_timeout).build() {
        Ok(client) => client,
        Err(e) => {
            warn!(error = %e, "Cannot build probe client");
            return Vec::new();
        }
    };

    let path = Endpoint::CheckConnection.path();
    let found = discover_with(subnet, workers, |host| {
        let ok = client
            .post(format!("http://{host}{path}"))
            .send()
            .is_ok_and(|r| r.status().is_success());
        if ok {
            debug!(host, "Controller answered");
        }
        ok
    });

    info!(count = found.len(), "Discovery finished");
    found
}
