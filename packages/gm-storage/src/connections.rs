use sqlx::PgConnection;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Error, Result, models::ConnectionSummary};

pub async fn insert_connection(
	executor: &mut PgConnection,
	connection_id: Uuid,
	initiator_id: Uuid,
	target_id: Uuid,
	now: OffsetDateTime,
) -> Result<()> {
	let result = sqlx::query(
		"\
INSERT INTO connections (connection_id, initiator_id, target_id, created_at)
VALUES ($1, $2, $3, $4)",
	)
	.bind(connection_id)
	.bind(initiator_id)
	.bind(target_id)
	.bind(now)
	.execute(&mut *executor)
	.await;

	match result {
		Ok(_) => Ok(()),
		Err(sqlx::Error::Database(err)) if err.is_unique_violation() => Err(Error::Conflict(
			format!("Connection between {initiator_id} and {target_id} already exists."),
		)),
		Err(err) => Err(err.into()),
	}
}

/// True when the pair is connected in either direction.
pub async fn connection_exists(executor: &mut PgConnection, a: Uuid, b: Uuid) -> Result<bool> {
	let exists = sqlx::query_scalar::<_, bool>(
		"\
SELECT EXISTS (
	SELECT 1
	FROM connections
	WHERE (initiator_id = $1 AND target_id = $2)
		OR (initiator_id = $2 AND target_id = $1)
)",
	)
	.bind(a)
	.bind(b)
	.fetch_one(&mut *executor)
	.await?;

	Ok(exists)
}

/// Deletes the pair's connection regardless of who initiated it. Returns the number removed.
pub async fn delete_connection(executor: &mut PgConnection, a: Uuid, b: Uuid) -> Result<u64> {
	let result = sqlx::query(
		"\
DELETE FROM connections
WHERE (initiator_id = $1 AND target_id = $2)
	OR (initiator_id = $2 AND target_id = $1)",
	)
	.bind(a)
	.bind(b)
	.execute(&mut *executor)
	.await?;

	Ok(result.rows_affected())
}

pub async fn list_connected_ids(executor: &mut PgConnection, subject_id: Uuid) -> Result<Vec<Uuid>> {
	let ids = sqlx::query_scalar::<_, Uuid>(
		"\
SELECT CASE WHEN initiator_id = $1 THEN target_id ELSE initiator_id END
FROM connections
WHERE initiator_id = $1 OR target_id = $1",
	)
	.bind(subject_id)
	.fetch_all(&mut *executor)
	.await?;

	Ok(ids)
}

/// Connections touching the subject, newest first.
pub async fn list_connections(
	executor: &mut PgConnection,
	subject_id: Uuid,
) -> Result<Vec<ConnectionSummary>> {
	let rows = sqlx::query_as::<_, ConnectionSummary>(
		"\
SELECT
	c.connection_id,
	c.initiator_id,
	c.target_id,
	c.created_at,
	o.org_id AS other_id,
	o.role AS other_role,
	p.organization_name,
	p.profile_picture_url,
	p.state,
	p.city
FROM connections c
JOIN organizations o
	ON o.org_id = CASE WHEN c.initiator_id = $1 THEN c.target_id ELSE c.initiator_id END
LEFT JOIN org_profiles p ON p.org_id = o.org_id
WHERE c.initiator_id = $1 OR c.target_id = $1
ORDER BY c.created_at DESC, c.connection_id",
	)
	.bind(subject_id)
	.fetch_all(&mut *executor)
	.await?;

	Ok(rows)
}
