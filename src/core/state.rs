//! Ctrl+C handling.
//!
//! Before a server is registered, Ctrl+C exits right away (status 130).
//! Afterwards it only unblocks the accept loop so in-flight requests can
//! finish and `serve` returns normally.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use anyhow::Context;
use tiny_http::Server;

static SHUTDOWN: AtomicBool = AtomicBool::new(false);
static SERVER: OnceLock<Arc<Server>> = OnceLock::new();

/// Install the handler. Call once, before anything blocks.
pub fn setup_shutdown_handler() -> anyhow::Result<()> {
    ctrlc::set_handler(|| {
        SHUTDOWN.store(true, Ordering::SeqCst);
        match SERVER.get() {
            Some(server) => {
                crate::log!("serve"; "shutting down...");
                server.unblock();
            }
            None => std::process::exit(130),
        }
    })
    .context("Failed to set Ctrl+C handler")
}

/// Hand the bound server to the handler. Later calls are ignored.
pub fn register_server(server: Arc<Server>) {
    let _ = SERVER.set(server);
}

pub fn is_shutdown() -> bool {
    SHUTDOWN.load(Ordering::Relaxed)
}
