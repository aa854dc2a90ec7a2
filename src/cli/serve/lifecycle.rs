//! Server lifecycle: worker install/activate and port binding.

use crate::{
    config::PixConfig,
    log,
    offline::{CacheStorage, DirOrigin, OfflineWorker},
};
use anyhow::{Result, anyhow};
use std::{net::SocketAddr, sync::Arc};
use tiny_http::Server;

/// Maximum number of port binding attempts.
const MAX_PORT_RETRIES: u16 = 10;

/// Bind to the specified interface and port, with automatic port retry.
pub fn bind_with_retry(
    interface: std::net::IpAddr,
    base_port: u16,
) -> Result<(Server, SocketAddr)> {
    let mut last_error = None;
    for offset in 0..MAX_PORT_RETRIES {
        let port = base_port.saturating_add(offset);
        let addr = SocketAddr::new(interface, port);

        match Server::http(addr) {
            Ok(server) => {
                if offset > 0 {
                    log!("serve"; "port {} in use, using {} instead", base_port, port);
                }
                return Ok((server, addr));
            }
            Err(e) => last_error = Some(e),
        }
    }

    Err(anyhow!(
        "Failed to bind after {} attempts (ports {}-{}): {}",
        MAX_PORT_RETRIES,
        base_port,
        base_port.saturating_add(MAX_PORT_RETRIES - 1),
        last_error.map(|e| e.to_string()).unwrap_or_default()
    ))
}

/// Offline worker over the built site, configured from `[cache]`.
pub fn build_worker(config: &PixConfig) -> OfflineWorker {
    OfflineWorker::new(
        CacheStorage::new(config.cache_dir()),
        Arc::new(DirOrigin::new(config.site_root())),
        config.cache.store_names(),
    )
    .with_precache(config.cache.routes.clone(), config.critical_images())
}

/// Install, then activate. A failed install keeps the previous stores, the
/// same way a browser keeps the old worker when a new one fails to install.
pub async fn start_worker(worker: &OfflineWorker) {
    match worker.install().await {
        Ok(report) => {
            log!(
                "cache";
                "precached {} routes and {} images",
                report.routes,
                report.images
            );
        }
        Err(e) => {
            log!("warning"; "precache failed, serving without it: {}", e);
            return;
        }
    }

    match worker.activate() {
        Ok(deleted) if !deleted.is_empty() => {
            log!("cache"; "removed stale stores: {}", deleted.join(", "));
        }
        Ok(_) => {}
        Err(e) => log!("warning"; "failed to remove stale stores: {}", e),
    }
}
