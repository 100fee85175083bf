//! Live integration tests for condir-db using `#[sqlx::test]`.
//!
//! Each test gets a fresh, fully-migrated Postgres database spun up by the
//! sqlx test harness. They need a reachable server in `DATABASE_URL`
//! (Postgres 15+ for `NULLS NOT DISTINCT`), so they are ignored by default:
//! run them with `cargo test -p condir-db -- --ignored`.

use condir_core::NormalizedContractor;
use condir_db::{
    complete_harvest_run, count_contractors, create_harvest_run, fail_harvest_run,
    get_contractor_certifications, get_contractor_services, get_harvest_run, insert_insight,
    list_contractors, list_contractors_without_insight, list_harvest_runs, list_insights,
    start_harvest_run, upsert_contractor, DbError,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn contractor(name: &str, address: Option<&str>) -> NormalizedContractor {
    NormalizedContractor {
        name: name.to_string(),
        rating: Some(4.8),
        address: address.map(ToString::to_string),
        phone: Some("(212) 555-0100".to_string()),
        website: Some("https://summitroofing.example".to_string()),
        description: None,
        external_id: Some("C-991".to_string()),
        reviews_count: Some(87),
        certifications: vec!["Master Elite".to_string(), "President's Club".to_string()],
        services: vec!["Roof repair".to_string()],
    }
}

// ---------------------------------------------------------------------------
// Section 1: Contractor upsert
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a live Postgres via DATABASE_URL"]
async fn upsert_inserts_then_updates_same_name_and_address(pool: sqlx::PgPool) {
    let first = upsert_contractor(&pool, &contractor("Summit Roofing", Some("Brooklyn, NY")))
        .await
        .expect("first upsert failed");
    assert!(first.inserted);

    let mut changed = contractor("Summit Roofing", Some("Brooklyn, NY"));
    changed.rating = Some(4.9);
    changed.external_id = None;
    let second = upsert_contractor(&pool, &changed)
        .await
        .expect("second upsert failed");

    assert_eq!(second.id, first.id);
    assert!(!second.inserted);
    assert_eq!(count_contractors(&pool).await.expect("count failed"), 1);

    let rows = list_contractors(&pool).await.expect("list failed");
    assert_eq!(rows[0].rating, Some(4.9));
    assert_eq!(rows[0].external_id.as_deref(), Some("C-991"));
    assert_eq!(rows[0].reviews_count, Some(87));
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a live Postgres via DATABASE_URL"]
async fn missing_address_still_deduplicates(pool: sqlx::PgPool) {
    let first = upsert_contractor(&pool, &contractor("Ridge Co", None))
        .await
        .expect("first upsert failed");
    let second = upsert_contractor(&pool, &contractor("Ridge Co", None))
        .await
        .expect("second upsert failed");

    assert_eq!(first.id, second.id);
    assert_eq!(count_contractors(&pool).await.expect("count failed"), 1);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a live Postgres via DATABASE_URL"]
async fn upsert_replaces_certifications_and_services(pool: sqlx::PgPool) {
    let first = upsert_contractor(&pool, &contractor("Summit Roofing", Some("Brooklyn, NY")))
        .await
        .expect("first upsert failed");

    let mut changed = contractor("Summit Roofing", Some("Brooklyn, NY"));
    changed.certifications = vec!["Certified Plus".to_string()];
    changed.services = vec![];
    upsert_contractor(&pool, &changed)
        .await
        .expect("second upsert failed");

    let certs = get_contractor_certifications(&pool, first.id)
        .await
        .expect("certifications query failed");
    let services = get_contractor_services(&pool, first.id)
        .await
        .expect("services query failed");
    assert_eq!(certs, vec!["Certified Plus".to_string()]);
    assert!(services.is_empty());
}

// ---------------------------------------------------------------------------
// Section 2: Insights
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a live Postgres via DATABASE_URL"]
async fn contractors_with_insight_are_not_pending(pool: sqlx::PgPool) {
    let summit = upsert_contractor(&pool, &contractor("Summit Roofing", Some("Brooklyn, NY")))
        .await
        .expect("upsert failed");
    upsert_contractor(&pool, &contractor("Ridge Co", Some("Bronx, NY")))
        .await
        .expect("upsert failed");

    insert_insight(&pool, summit.id, "Lead with the Master Elite badge.", Some("gpt-4o"))
        .await
        .expect("insert_insight failed");

    let pending = list_contractors_without_insight(&pool, None)
        .await
        .expect("pending query failed");
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].name, "Ridge Co");

    let limited = list_contractors_without_insight(&pool, Some(0))
        .await
        .expect("limited query failed");
    assert!(limited.is_empty());

    let insights = list_insights(&pool).await.expect("list_insights failed");
    assert_eq!(insights.len(), 1);
    assert_eq!(insights[0].contractor_name, "Summit Roofing");
    assert_eq!(insights[0].rating, Some(4.8));
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a live Postgres via DATABASE_URL"]
async fn insight_for_unknown_contractor_fails(pool: sqlx::PgPool) {
    let err = insert_insight(&pool, 999_999, "orphan", None)
        .await
        .expect_err("foreign key should reject unknown contractor");
    assert!(matches!(err, DbError::Sqlx(_)));
}

// ---------------------------------------------------------------------------
// Section 3: Harvest run lifecycle
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a live Postgres via DATABASE_URL"]
async fn harvest_run_lifecycle_queued_to_succeeded(pool: sqlx::PgPool) {
    let run = create_harvest_run(&pool, "https://directory.example/list")
        .await
        .expect("create_harvest_run failed");
    assert_eq!(run.status, "queued");
    assert!(run.started_at.is_none());

    start_harvest_run(&pool, run.id)
        .await
        .expect("start_harvest_run failed");
    complete_harvest_run(&pool, run.id, 3, 41, "saturated")
        .await
        .expect("complete_harvest_run failed");

    let fetched = get_harvest_run(&pool, run.id)
        .await
        .expect("get_harvest_run failed");
    assert_eq!(fetched.status, "succeeded");
    assert!(fetched.started_at.is_some());
    assert!(fetched.completed_at.is_some());
    assert_eq!(fetched.pages_visited, 3);
    assert_eq!(fetched.records_harvested, 41);
    assert_eq!(fetched.stop_reason.as_deref(), Some("saturated"));
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a live Postgres via DATABASE_URL"]
async fn harvest_run_lifecycle_queued_to_failed(pool: sqlx::PgPool) {
    let run = create_harvest_run(&pool, "https://directory.example/list")
        .await
        .expect("create_harvest_run failed");
    start_harvest_run(&pool, run.id)
        .await
        .expect("start_harvest_run failed");
    fail_harvest_run(&pool, run.id, "chrome failed to launch")
        .await
        .expect("fail_harvest_run failed");

    let fetched = get_harvest_run(&pool, run.id)
        .await
        .expect("get_harvest_run failed");
    assert_eq!(fetched.status, "failed");
    assert_eq!(fetched.error_message.as_deref(), Some("chrome failed to launch"));

    let recent = list_harvest_runs(&pool, 10).await.expect("list failed");
    assert_eq!(recent.len(), 1);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a live Postgres via DATABASE_URL"]
async fn harvest_run_cannot_complete_directly_from_queued(pool: sqlx::PgPool) {
    let run = create_harvest_run(&pool, "https://directory.example/list")
        .await
        .expect("create_harvest_run failed");

    let err = complete_harvest_run(&pool, run.id, 1, 1, "saturated")
        .await
        .expect_err("completing a queued run should fail");

    assert!(matches!(
        err,
        DbError::InvalidHarvestRunTransition {
            expected_status: "running",
            ..
        }
    ));
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a live Postgres via DATABASE_URL"]
async fn get_unknown_harvest_run_is_not_found(pool: sqlx::PgPool) {
    let err = get_harvest_run(&pool, 999_999)
        .await
        .expect_err("unknown run should not be found");
    assert!(matches!(err, DbError::NotFound));
}
