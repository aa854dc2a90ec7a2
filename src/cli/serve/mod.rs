//! Development server: every request goes through the offline worker.
//!
//! Requests are handled on a small `rayon` pool; each one blocks on the
//! worker through a shared `tokio` runtime handle.

mod lifecycle;
mod response;

use crate::{
    config::PixConfig,
    core::{is_shutdown, register_server},
    debug, log,
    offline::{self, Destination, OfflineWorker},
};
use anyhow::{Context, Result};
use std::sync::Arc;
use tiny_http::{Method, Request, Server};
use tokio::runtime::Handle;

pub use lifecycle::build_worker;

pub fn serve(config: &PixConfig) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")?;

    let worker = Arc::new(build_worker(config));
    runtime.block_on(lifecycle::start_worker(&worker));

    let (server, addr) = lifecycle::bind_with_retry(config.serve.interface, config.serve.port)?;
    let server = Arc::new(server);
    register_server(Arc::clone(&server));

    log!(
        "serve";
        "http://{} ({})",
        addr,
        config.root_relative(config.site_root()).display()
    );

    run_request_loop(&server, &worker, runtime.handle(), config.serve.threads)
}

fn run_request_loop(
    server: &Server,
    worker: &Arc<OfflineWorker>,
    rt: &Handle,
    threads: usize,
) -> Result<()> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .context("Failed to create thread pool")?;

    for request in server.incoming_requests() {
        let worker = Arc::clone(worker);
        let rt = rt.clone();
        pool.spawn(move || {
            if let Err(e) = handle_request(request, &worker, &rt) {
                log!("serve"; "request error: {e}");
            }
        });
    }
    Ok(())
}

fn handle_request(request: Request, worker: &OfflineWorker, rt: &Handle) -> Result<()> {
    if is_shutdown() {
        return response::respond_unavailable(request);
    }
    if !matches!(request.method(), Method::Get | Method::Head) {
        return response::respond_method_not_allowed(request);
    }

    let url = request.url().to_string();
    let destination = response::fetch_dest(&request)
        .and_then(|dest| Destination::from_fetch_dest(&dest))
        .unwrap_or_else(|| Destination::from_url(&url));

    match rt.block_on(worker.handle(&offline::Request::new(url.as_str(), destination))) {
        Ok(res) => {
            debug!("serve"; "{} {} [{}]", res.status, url, res.source.as_str());
            response::respond(request, res)
        }
        Err(e) => {
            log!("serve"; "{}: {}", url, e);
            response::respond_bad_gateway(request, &e)
        }
    }
}
