//! Skip policy for suites that need the embedded test cluster.
//!
//! Environments that cannot download or start PostgreSQL set
//! `SKIP_TEST_CLUSTER` so those suites report a skip instead of failing.

/// True when `SKIP_TEST_CLUSTER` is "1", "true" or "yes" (any case).
pub fn should_skip_test_cluster() -> bool {
    std::env::var("SKIP_TEST_CLUSTER")
        .map(|value| matches!(value.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

/// Report a cluster setup failure.
///
/// Prints a skip marker and returns `None` when skipping is allowed;
/// otherwise panics so CI breakage is not masked.
pub fn handle_cluster_setup_failure<T>(reason: impl std::fmt::Display) -> Option<T> {
    if should_skip_test_cluster() {
        eprintln!("SKIP-TEST-CLUSTER: {reason}");
        None
    } else {
        panic!("Test cluster setup failed: {reason}. Set SKIP_TEST_CLUSTER=1 to skip.");
    }
}
