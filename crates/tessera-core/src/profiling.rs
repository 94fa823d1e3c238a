//! Profiling utilities based on the `puffin` crate.

use std::sync::OnceLock;

pub use puffin::{GlobalProfiler, profile_function, profile_scope};

/// Global profiling server instance.
static PROFILING_SERVER: OnceLock<puffin_http::Server> = OnceLock::new();

/// Enable puffin scopes and start the HTTP server for `puffin_viewer`.
pub fn init_profiling() {
    puffin::set_scopes_on(true);

    match puffin_http::Server::new("0.0.0.0:8585") {
        Ok(server) => {
            tracing::info!("Puffin profiler server started on http://0.0.0.0:8585");
            let _ = PROFILING_SERVER.set(server);
        }
        Err(e) => {
            tracing::error!("Failed to start puffin server: {}", e);
        }
    }
}

/// Mark the start of a new frame for profiling.
///
/// Call this once per frame in the main loop to organize profiling data by frame.
#[inline]
pub fn new_frame() {
    puffin::GlobalProfiler::lock().new_frame();
}
