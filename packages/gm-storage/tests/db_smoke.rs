use serde_json::json;
use time::OffsetDateTime;
use uuid::Uuid;

use gm_config::Postgres;
use gm_storage::{
	Error, candidates, connections, db::Db, dismissals, models::CandidateScoreRow, organizations,
};
use gm_testkit::TestDatabase;

async fn bootstrap(test_db: &TestDatabase) -> Db {
	let cfg = Postgres { dsn: test_db.dsn().to_string(), pool_max_conns: 2 };
	let db = Db::connect(&cfg).await.expect("Failed to connect to Postgres.");

	db.ensure_schema().await.expect("Failed to ensure schema.");

	db
}

async fn insert_org(db: &Db, role: &str) -> Uuid {
	let org_id = Uuid::new_v4();
	let mut conn = db.pool.acquire().await.expect("Failed to acquire connection.");

	organizations::insert_organization(
		&mut conn,
		org_id,
		role,
		"active",
		Some("Test Org"),
		OffsetDateTime::now_utc(),
	)
	.await
	.expect("Failed to insert organization.");

	org_id
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set GM_PG_DSN to run."]
async fn schema_bootstrap_is_idempotent() {
	let Some(base_dsn) = gm_testkit::env_dsn() else {
		eprintln!("Skipping schema_bootstrap_is_idempotent; set GM_PG_DSN to run this test.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let db = bootstrap(&test_db).await;

	db.ensure_schema().await.expect("Second bootstrap must succeed.");

	for table in ["organizations", "org_profiles", "connections", "candidate_scores"] {
		let count: i64 = sqlx::query_scalar(
			"SELECT count(*) FROM information_schema.tables WHERE table_name = $1",
		)
		.bind(table)
		.fetch_one(&db.pool)
		.await
		.expect("Failed to query schema tables.");

		assert_eq!(count, 1, "Missing table {table}.");
	}

	db.pool.close().await;
	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set GM_PG_DSN to run."]
async fn connection_pair_is_unique_in_both_directions() {
	let Some(base_dsn) = gm_testkit::env_dsn() else {
		eprintln!(
			"Skipping connection_pair_is_unique_in_both_directions; set GM_PG_DSN to run this test."
		);

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let db = bootstrap(&test_db).await;
	let provider = insert_org(&db, "provider").await;
	let recipient = insert_org(&db, "recipient").await;
	let mut conn = db.pool.acquire().await.expect("Failed to acquire connection.");
	let now = OffsetDateTime::now_utc();

	connections::insert_connection(&mut conn, Uuid::new_v4(), provider, recipient, now)
		.await
		.expect("First connection must insert.");

	let err = connections::insert_connection(&mut conn, Uuid::new_v4(), recipient, provider, now)
		.await
		.expect_err("Reverse connection must conflict.");

	assert!(matches!(err, Error::Conflict(_)), "Unexpected error: {err}");
	assert!(
		connections::connection_exists(&mut conn, recipient, provider)
			.await
			.expect("Failed to check connection.")
	);
	assert_eq!(
		connections::list_connected_ids(&mut conn, recipient)
			.await
			.expect("Failed to list connections."),
		vec![provider]
	);

	drop(conn);
	db.pool.close().await;
	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set GM_PG_DSN to run."]
async fn candidate_set_replace_and_pair_delete() {
	let Some(base_dsn) = gm_testkit::env_dsn() else {
		eprintln!("Skipping candidate_set_replace_and_pair_delete; set GM_PG_DSN to run this test.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let db = bootstrap(&test_db).await;
	let provider = insert_org(&db, "provider").await;
	let first = insert_org(&db, "recipient").await;
	let second = insert_org(&db, "recipient").await;
	let now = OffsetDateTime::now_utc();
	let row = |candidate_id, score| CandidateScoreRow {
		candidate_id,
		score,
		breakdown: json!({ "composite": score }),
	};
	let mut tx = db.pool.begin().await.expect("Failed to begin transaction.");

	candidates::lock_subject(&mut tx, provider).await.expect("Failed to lock subject.");
	candidates::replace_candidate_set(&mut tx, provider, &[row(first, 40.0), row(second, 90.0)], now)
		.await
		.expect("Failed to replace candidate set.");
	tx.commit().await.expect("Failed to commit.");

	let mut conn = db.pool.acquire().await.expect("Failed to acquire connection.");
	let listed = candidates::list_candidate_set(&mut conn, provider)
		.await
		.expect("Failed to list candidates.");

	assert_eq!(listed.iter().map(|c| c.candidate_id).collect::<Vec<_>>(), vec![second, first]);

	candidates::replace_candidate_set(&mut conn, provider, &[row(first, 55.0)], now)
		.await
		.expect("Failed to replace candidate set.");

	let listed = candidates::list_candidate_set(&mut conn, provider)
		.await
		.expect("Failed to list candidates.");

	assert_eq!(listed.len(), 1);
	assert_eq!(listed[0].score, 55.0);
	assert_eq!(
		candidates::delete_pair(&mut conn, first, provider).await.expect("Failed to delete pair."),
		1
	);
	assert!(
		!candidates::candidate_present(&mut conn, provider, first)
			.await
			.expect("Failed to check candidate.")
	);

	drop(conn);
	db.pool.close().await;
	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set GM_PG_DSN to run."]
async fn dismissal_insert_reports_first_write_only() {
	let Some(base_dsn) = gm_testkit::env_dsn() else {
		eprintln!(
			"Skipping dismissal_insert_reports_first_write_only; set GM_PG_DSN to run this test."
		);

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let db = bootstrap(&test_db).await;
	let subject = insert_org(&db, "recipient").await;
	let candidate = insert_org(&db, "provider").await;
	let mut conn = db.pool.acquire().await.expect("Failed to acquire connection.");
	let now = OffsetDateTime::now_utc();

	assert!(
		dismissals::insert_dismissal(&mut conn, subject, candidate, now)
			.await
			.expect("Failed to dismiss.")
	);
	assert!(
		!dismissals::insert_dismissal(&mut conn, subject, candidate, now)
			.await
			.expect("Failed to dismiss.")
	);
	assert!(
		dismissals::is_dismissed(&mut conn, subject, candidate)
			.await
			.expect("Failed to check dismissal.")
	);
	assert!(
		!dismissals::is_dismissed(&mut conn, candidate, subject)
			.await
			.expect("Failed to check dismissal.")
	);

	drop(conn);
	db.pool.close().await;
	test_db.cleanup().await.expect("Failed to cleanup test database.");
}
