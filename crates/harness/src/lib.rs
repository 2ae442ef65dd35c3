pub mod client;
pub mod service;

pub use client::{Circle, TestClient};
pub use service::{Call, FakeService};

/// Install a fmt subscriber routed to the test writer. Safe to call from
/// every test; only the first call wins.
pub fn init_logging() {
    use tracing_subscriber::EnvFilter;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
