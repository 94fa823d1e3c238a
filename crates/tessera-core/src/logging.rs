//! Logging setup on top of `tracing`.

/// Install the global subscriber. Call once at startup.
pub fn init() {
    tracing_subscriber::fmt()
        .with_env_filter("trace,wgpu_core=info,wgpu_hal=info,naga=info")
        .init();
}
