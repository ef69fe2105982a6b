use sqlx::PgConnection;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
	Result,
	models::{OrgProfile, Organization, ProfileRecord, ProviderTermsRow, RecipientNeedsRow},
};

const PROFILE_SELECT: &str = "\
SELECT
	o.org_id,
	o.role,
	o.status,
	p.organization_name,
	p.mission_statement,
	p.profile_picture_url,
	p.state,
	p.city,
	p.zip_code,
	COALESCE(p.sectors, '{}'::text[]) AS sectors,
	COALESCE(p.target_groups, '{}'::text[]) AS target_groups,
	pt.funding_type,
	pt.amount_offered,
	pt.deadline,
	pt.region_scope,
	pt.eligibility_notes,
	pt.application_link,
	COALESCE(rn.needs, '{}'::text[]) AS needs,
	rn.budget_requested,
	rn.timeline,
	rn.project_stage,
	rn.team_size,
	rn.prior_funding,
	o.created_at,
	o.updated_at
FROM organizations o
LEFT JOIN org_profiles p ON p.org_id = o.org_id
LEFT JOIN provider_terms pt ON pt.org_id = o.org_id
LEFT JOIN recipient_needs rn ON rn.org_id = o.org_id";

/// Inserts the organization and an empty descriptive profile.
pub async fn insert_organization(
	executor: &mut PgConnection,
	org_id: Uuid,
	role: &str,
	status: &str,
	organization_name: Option<&str>,
	now: OffsetDateTime,
) -> Result<()> {
	sqlx::query(
		"\
INSERT INTO organizations (org_id, role, status, created_at, updated_at)
VALUES ($1, $2, $3, $4, $4)",
	)
	.bind(org_id)
	.bind(role)
	.bind(status)
	.bind(now)
	.execute(&mut *executor)
	.await?;
	sqlx::query(
		"\
INSERT INTO org_profiles (org_id, organization_name, updated_at)
VALUES ($1, $2, $3)",
	)
	.bind(org_id)
	.bind(organization_name)
	.bind(now)
	.execute(&mut *executor)
	.await?;

	Ok(())
}

pub async fn get_organization(
	executor: &mut PgConnection,
	org_id: Uuid,
) -> Result<Option<Organization>> {
	let row = sqlx::query_as::<_, Organization>(
		"\
SELECT org_id, role, status, created_at, updated_at
FROM organizations
WHERE org_id = $1",
	)
	.bind(org_id)
	.fetch_optional(&mut *executor)
	.await?;

	Ok(row)
}

/// Same as [`get_organization`] but holds a row lock until the surrounding transaction ends.
pub async fn get_organization_for_update(
	executor: &mut PgConnection,
	org_id: Uuid,
) -> Result<Option<Organization>> {
	let row = sqlx::query_as::<_, Organization>(
		"\
SELECT org_id, role, status, created_at, updated_at
FROM organizations
WHERE org_id = $1
FOR UPDATE",
	)
	.bind(org_id)
	.fetch_optional(&mut *executor)
	.await?;

	Ok(row)
}

pub async fn get_profile(
	executor: &mut PgConnection,
	org_id: Uuid,
) -> Result<Option<ProfileRecord>> {
	let sql = format!("{PROFILE_SELECT}\nWHERE o.org_id = $1");
	let row = sqlx::query_as::<_, ProfileRecord>(&sql)
		.bind(org_id)
		.fetch_optional(&mut *executor)
		.await?;

	Ok(row)
}

/// Bulk read of every organization with the given role and stored status.
pub async fn list_profiles_by_role(
	executor: &mut PgConnection,
	role: &str,
	status: &str,
) -> Result<Vec<ProfileRecord>> {
	let sql = format!("{PROFILE_SELECT}\nWHERE o.role = $1 AND o.status = $2\nORDER BY o.org_id");
	let rows = sqlx::query_as::<_, ProfileRecord>(&sql)
		.bind(role)
		.bind(status)
		.fetch_all(&mut *executor)
		.await?;

	Ok(rows)
}

pub async fn list_org_ids_by_status(executor: &mut PgConnection, status: &str) -> Result<Vec<Uuid>> {
	let ids = sqlx::query_scalar::<_, Uuid>(
		"\
SELECT org_id
FROM organizations
WHERE status = $1
ORDER BY org_id",
	)
	.bind(status)
	.fetch_all(&mut *executor)
	.await?;

	Ok(ids)
}

pub async fn upsert_org_profile(
	executor: &mut PgConnection,
	profile: &OrgProfile,
	now: OffsetDateTime,
) -> Result<()> {
	sqlx::query(
		"\
INSERT INTO org_profiles (
	org_id,
	organization_name,
	mission_statement,
	profile_picture_url,
	state,
	city,
	zip_code,
	sectors,
	target_groups,
	updated_at
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
ON CONFLICT (org_id) DO UPDATE
SET
	organization_name = EXCLUDED.organization_name,
	mission_statement = EXCLUDED.mission_statement,
	profile_picture_url = EXCLUDED.profile_picture_url,
	state = EXCLUDED.state,
	city = EXCLUDED.city,
	zip_code = EXCLUDED.zip_code,
	sectors = EXCLUDED.sectors,
	target_groups = EXCLUDED.target_groups,
	updated_at = EXCLUDED.updated_at",
	)
	.bind(profile.org_id)
	.bind(profile.organization_name.as_deref())
	.bind(profile.mission_statement.as_deref())
	.bind(profile.profile_picture_url.as_deref())
	.bind(profile.state.as_deref())
	.bind(profile.city.as_deref())
	.bind(profile.zip_code.as_deref())
	.bind(&profile.sectors)
	.bind(&profile.target_groups)
	.bind(now)
	.execute(&mut *executor)
	.await?;

	Ok(())
}

pub async fn upsert_provider_terms(
	executor: &mut PgConnection,
	terms: &ProviderTermsRow,
	now: OffsetDateTime,
) -> Result<()> {
	sqlx::query(
		"\
INSERT INTO provider_terms (
	org_id,
	funding_type,
	amount_offered,
	deadline,
	region_scope,
	eligibility_notes,
	application_link,
	updated_at
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
ON CONFLICT (org_id) DO UPDATE
SET
	funding_type = EXCLUDED.funding_type,
	amount_offered = EXCLUDED.amount_offered,
	deadline = EXCLUDED.deadline,
	region_scope = EXCLUDED.region_scope,
	eligibility_notes = EXCLUDED.eligibility_notes,
	application_link = EXCLUDED.application_link,
	updated_at = EXCLUDED.updated_at",
	)
	.bind(terms.org_id)
	.bind(terms.funding_type.as_deref())
	.bind(terms.amount_offered)
	.bind(terms.deadline)
	.bind(terms.region_scope.as_deref())
	.bind(terms.eligibility_notes.as_deref())
	.bind(terms.application_link.as_deref())
	.bind(now)
	.execute(&mut *executor)
	.await?;

	Ok(())
}

pub async fn upsert_recipient_needs(
	executor: &mut PgConnection,
	needs: &RecipientNeedsRow,
	now: OffsetDateTime,
) -> Result<()> {
	sqlx::query(
		"\
INSERT INTO recipient_needs (
	org_id,
	needs,
	budget_requested,
	timeline,
	project_stage,
	team_size,
	prior_funding,
	updated_at
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
ON CONFLICT (org_id) DO UPDATE
SET
	needs = EXCLUDED.needs,
	budget_requested = EXCLUDED.budget_requested,
	timeline = EXCLUDED.timeline,
	project_stage = EXCLUDED.project_stage,
	team_size = EXCLUDED.team_size,
	prior_funding = EXCLUDED.prior_funding,
	updated_at = EXCLUDED.updated_at",
	)
	.bind(needs.org_id)
	.bind(&needs.needs)
	.bind(needs.budget_requested)
	.bind(needs.timeline.as_deref())
	.bind(needs.project_stage.as_deref())
	.bind(needs.team_size)
	.bind(needs.prior_funding)
	.bind(now)
	.execute(&mut *executor)
	.await?;

	Ok(())
}

pub async fn update_status(
	executor: &mut PgConnection,
	org_id: Uuid,
	status: &str,
	now: OffsetDateTime,
) -> Result<()> {
	sqlx::query(
		"\
UPDATE organizations
SET status = $2, updated_at = $3
WHERE org_id = $1",
	)
	.bind(org_id)
	.bind(status)
	.bind(now)
	.execute(&mut *executor)
	.await?;

	Ok(())
}

/// Flips active providers whose deadline has passed to inactive and returns their ids.
pub async fn deactivate_expired_providers(
	executor: &mut PgConnection,
	now: OffsetDateTime,
) -> Result<Vec<Uuid>> {
	let ids = sqlx::query_scalar::<_, Uuid>(
		"\
UPDATE organizations o
SET status = 'inactive', updated_at = $1
FROM provider_terms pt
WHERE pt.org_id = o.org_id
	AND o.role = 'provider'
	AND o.status = 'active'
	AND pt.deadline IS NOT NULL
	AND pt.deadline < $1
RETURNING o.org_id",
	)
	.bind(now)
	.fetch_all(&mut *executor)
	.await?;

	Ok(ids)
}
