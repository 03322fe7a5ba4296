//! Shared fixtures for the `kern` integration tests: resource declarations,
//! temporary workspaces and a recording action handler.

pub mod builders;
pub mod handlers;
pub mod workspace;

use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use kern::logging::LOG_ENV;
use tracing_subscriber::EnvFilter;

pub use builders::ResourceBuilder;
pub use handlers::{Call, RecordingHandler, registry_with};
pub use workspace::Workspace;

/// Upper bound for a single engine run in tests.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(10);

static INIT: Once = Once::new();

/// Route `tracing` output through the test harness capture.
///
/// Honours the same `KERN_LOG` directives as the binary, e.g.
/// `KERN_LOG=kern::exec=debug cargo test`.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// Await `f`, failing the test if it takes longer than [`TEST_TIMEOUT`].
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: Future<Output = T>,
{
    match tokio::time::timeout(TEST_TIMEOUT, f).await {
        Ok(value) => value,
        Err(_) => panic!("engine run did not finish within {TEST_TIMEOUT:?}"),
    }
}
