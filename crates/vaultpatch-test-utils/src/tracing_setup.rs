//! Tracing for tests.
//!
//! [`init_test_tracing`] installs a subscriber at most once per process, so
//! every test that wants patch-engine or client logs can call it.

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "warn,vaultpatch_core=info,vaultpatch_config=info";

/// Install a fmt subscriber on the test-harness writer, filtered by
/// `RUST_LOG`. Without it only vaultpatch crates log, at `info`. Later calls
/// are no-ops.
///
/// ```ignore
/// #[tokio::test]
/// async fn patches_note() {
///     vaultpatch_test_utils::tracing_setup::init_test_tracing();
///     tracing::debug!("visible when RUST_LOG=debug");
/// }
/// ```
pub fn init_test_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_test_writer()
        .try_init();
}
