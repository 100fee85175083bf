//! Offline unit tests for condir-db pool configuration and row types.
//! These tests do not require a live database connection.

use chrono::Utc;
use condir_core::{load_app_config_from_env, AppConfig};
use condir_db::{DbError, HarvestRunRow, PoolConfig};
use uuid::Uuid;

fn app_config_with_pool(max: u32, min: u32, timeout: u64) -> AppConfig {
    let mut config = load_app_config_from_env().expect("default config should load");
    config.db_max_connections = max;
    config.db_min_connections = min;
    config.db_acquire_timeout_secs = timeout;
    config
}

#[test]
fn pool_config_from_app_config_uses_core_values() {
    let pool_config = PoolConfig::from_app_config(&app_config_with_pool(42, 7, 9));
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout_secs, 9);
}

#[tokio::test]
async fn connect_without_database_url_is_a_typed_error() {
    let mut config = app_config_with_pool(1, 1, 1);
    config.database_url = None;

    let err = condir_db::connect_pool_from_app_config(&config)
        .await
        .expect_err("connecting without a URL should fail");
    assert!(matches!(err, DbError::MissingDatabaseUrl));
}

/// Compile-time smoke test: confirm that [`HarvestRunRow`] has all expected
/// fields with the correct types. No database required.
#[test]
fn harvest_run_row_has_expected_fields() {
    let row = HarvestRunRow {
        id: 1_i64,
        public_id: Uuid::new_v4(),
        source_url: "https://directory.example/list".to_string(),
        status: "queued".to_string(),
        started_at: None,
        completed_at: None,
        pages_visited: 0_i32,
        records_harvested: 0_i32,
        stop_reason: None,
        error_message: None,
        created_at: Utc::now(),
    };

    assert_eq!(row.status, "queued");
    assert!(row.started_at.is_none());
    assert_eq!(row.pages_visited, 0);
}

#[test]
fn transition_error_names_expected_status() {
    let err = DbError::InvalidHarvestRunTransition {
        id: 3,
        expected_status: "running",
    };
    assert_eq!(
        err.to_string(),
        "harvest run 3 is not in the expected 'running' state"
    );
}
