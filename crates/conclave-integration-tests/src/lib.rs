//! Multi-peer integration scenarios for the Conclave protocol.
//!
//! The tests live in `tests/`: each one runs several independent peers,
//! each with its own replica, and models replication rounds as explicit
//! merges - no transport involved.

/// Install a tracing subscriber for test runs, honoring `RUST_LOG`.
/// Safe to call from every test; only the first call wins.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
