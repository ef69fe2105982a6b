use sqlx::PgConnection;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
	Result,
	models::{CandidateScoreRow, CandidateSummary},
};

const LOCK_NAMESPACE: &str = "candidate_set:";

/// Stable advisory lock key for one subject's candidate set.
pub fn subject_lock_key(subject_id: Uuid) -> i64 {
	let mut hasher = blake3::Hasher::new();

	hasher.update(LOCK_NAMESPACE.as_bytes());
	hasher.update(subject_id.as_bytes());

	let digest = hasher.finalize();
	let mut prefix = [0_u8; 8];

	prefix.copy_from_slice(&digest.as_bytes()[..8]);

	i64::from_be_bytes(prefix)
}

/// Serializes writers of the subject's candidate set until the surrounding transaction ends.
pub async fn lock_subject(executor: &mut PgConnection, subject_id: Uuid) -> Result<()> {
	sqlx::query("SELECT pg_advisory_xact_lock($1)")
		.bind(subject_lock_key(subject_id))
		.execute(&mut *executor)
		.await?;

	Ok(())
}

/// Locks several subjects in ascending key order so two writers touching the same pair cannot
/// deadlock.
pub async fn lock_subjects(executor: &mut PgConnection, subject_ids: &[Uuid]) -> Result<()> {
	let mut keys = subject_ids.iter().map(|id| subject_lock_key(*id)).collect::<Vec<_>>();

	keys.sort_unstable();
	keys.dedup();

	for key in keys {
		sqlx::query("SELECT pg_advisory_xact_lock($1)").bind(key).execute(&mut *executor).await?;
	}

	Ok(())
}

/// Bounds every statement in the surrounding transaction.
pub async fn set_local_statement_timeout(executor: &mut PgConnection, timeout_ms: u64) -> Result<()> {
	sqlx::query("SELECT set_config('statement_timeout', $1, true)")
		.bind(timeout_ms.to_string())
		.execute(&mut *executor)
		.await?;

	Ok(())
}

/// Discards the subject's stored set and writes `rows` in its place. Callers run this inside a
/// transaction so readers observe either the old set or the new one.
pub async fn replace_candidate_set(
	executor: &mut PgConnection,
	subject_id: Uuid,
	rows: &[CandidateScoreRow],
	computed_at: OffsetDateTime,
) -> Result<()> {
	sqlx::query("DELETE FROM candidate_scores WHERE subject_id = $1")
		.bind(subject_id)
		.execute(&mut *executor)
		.await?;

	for row in rows {
		sqlx::query(
			"\
INSERT INTO candidate_scores (subject_id, candidate_id, score, breakdown, computed_at)
VALUES ($1, $2, $3, $4, $5)",
		)
		.bind(subject_id)
		.bind(row.candidate_id)
		.bind(row.score)
		.bind(&row.breakdown)
		.bind(computed_at)
		.execute(&mut *executor)
		.await?;
	}

	Ok(())
}

/// The stored set, highest score first, ties by ascending candidate id.
pub async fn list_candidate_set(
	executor: &mut PgConnection,
	subject_id: Uuid,
) -> Result<Vec<CandidateSummary>> {
	let rows = sqlx::query_as::<_, CandidateSummary>(
		"\
SELECT
	cs.candidate_id,
	cs.score,
	cs.breakdown,
	cs.computed_at,
	o.role,
	p.organization_name,
	p.profile_picture_url,
	p.state,
	p.city
FROM candidate_scores cs
JOIN organizations o ON o.org_id = cs.candidate_id
LEFT JOIN org_profiles p ON p.org_id = cs.candidate_id
WHERE cs.subject_id = $1
ORDER BY cs.score DESC, cs.candidate_id ASC",
	)
	.bind(subject_id)
	.fetch_all(&mut *executor)
	.await?;

	Ok(rows)
}

pub async fn candidate_present(
	executor: &mut PgConnection,
	subject_id: Uuid,
	candidate_id: Uuid,
) -> Result<bool> {
	let exists = sqlx::query_scalar::<_, bool>(
		"\
SELECT EXISTS (
	SELECT 1
	FROM candidate_scores
	WHERE subject_id = $1 AND candidate_id = $2
)",
	)
	.bind(subject_id)
	.bind(candidate_id)
	.fetch_one(&mut *executor)
	.await?;

	Ok(exists)
}

pub async fn delete_candidate(
	executor: &mut PgConnection,
	subject_id: Uuid,
	candidate_id: Uuid,
) -> Result<u64> {
	let result =
		sqlx::query("DELETE FROM candidate_scores WHERE subject_id = $1 AND candidate_id = $2")
			.bind(subject_id)
			.bind(candidate_id)
			.execute(&mut *executor)
			.await?;

	Ok(result.rows_affected())
}

/// Removes the pair from both subjects' sets.
pub async fn delete_pair(executor: &mut PgConnection, a: Uuid, b: Uuid) -> Result<u64> {
	let result = sqlx::query(
		"\
DELETE FROM candidate_scores
WHERE (subject_id = $1 AND candidate_id = $2)
	OR (subject_id = $2 AND candidate_id = $1)",
	)
	.bind(a)
	.bind(b)
	.execute(&mut *executor)
	.await?;

	Ok(result.rows_affected())
}

/// Drops every stored row in which the organization appears, as subject or as candidate.
pub async fn purge_organization(executor: &mut PgConnection, org_id: Uuid) -> Result<u64> {
	let result =
		sqlx::query("DELETE FROM candidate_scores WHERE subject_id = $1 OR candidate_id = $1")
			.bind(org_id)
			.execute(&mut *executor)
			.await?;

	Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
	use uuid::Uuid;

	use crate::candidates::subject_lock_key;

	#[test]
	fn lock_key_is_stable_and_distinct() {
		let a = Uuid::from_u128(0x0123_4567_89ab_cdef_0123_4567_89ab_cdef);
		let b = Uuid::from_u128(0x0123_4567_89ab_cdef_0123_4567_89ab_cdee);

		assert_eq!(subject_lock_key(a), subject_lock_key(a));
		assert_ne!(subject_lock_key(a), subject_lock_key(b));
	}
}
