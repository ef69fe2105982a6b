use sqlx::PgConnection;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::Result;

/// Records a dismissal. Returns `false` when the pair was already dismissed.
pub async fn insert_dismissal(
	executor: &mut PgConnection,
	subject_id: Uuid,
	candidate_id: Uuid,
	now: OffsetDateTime,
) -> Result<bool> {
	let result = sqlx::query(
		"\
INSERT INTO dismissed_matches (subject_id, candidate_id, dismissed_at)
VALUES ($1, $2, $3)
ON CONFLICT (subject_id, candidate_id) DO NOTHING",
	)
	.bind(subject_id)
	.bind(candidate_id)
	.bind(now)
	.execute(&mut *executor)
	.await?;

	Ok(result.rows_affected() == 1)
}

pub async fn is_dismissed(
	executor: &mut PgConnection,
	subject_id: Uuid,
	candidate_id: Uuid,
) -> Result<bool> {
	let exists = sqlx::query_scalar::<_, bool>(
		"\
SELECT EXISTS (
	SELECT 1
	FROM dismissed_matches
	WHERE subject_id = $1 AND candidate_id = $2
)",
	)
	.bind(subject_id)
	.bind(candidate_id)
	.fetch_one(&mut *executor)
	.await?;

	Ok(exists)
}

pub async fn list_dismissed_ids(executor: &mut PgConnection, subject_id: Uuid) -> Result<Vec<Uuid>> {
	let ids = sqlx::query_scalar::<_, Uuid>(
		"\
SELECT candidate_id
FROM dismissed_matches
WHERE subject_id = $1",
	)
	.bind(subject_id)
	.fetch_all(&mut *executor)
	.await?;

	Ok(ids)
}
