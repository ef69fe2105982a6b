use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, sqlx::FromRow)]
pub struct Organization {
	pub org_id: Uuid,
	pub role: String,
	pub status: String,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

/// One organization with its descriptive profile and whichever role block it has, flattened by a
/// left join. Columns of the other role's block are `NULL`.
#[derive(Debug, sqlx::FromRow)]
pub struct ProfileRecord {
	pub org_id: Uuid,
	pub role: String,
	pub status: String,
	pub organization_name: Option<String>,
	pub mission_statement: Option<String>,
	pub profile_picture_url: Option<String>,
	pub state: Option<String>,
	pub city: Option<String>,
	pub zip_code: Option<String>,
	pub sectors: Vec<String>,
	pub target_groups: Vec<String>,
	pub funding_type: Option<String>,
	pub amount_offered: Option<f64>,
	pub deadline: Option<OffsetDateTime>,
	pub region_scope: Option<String>,
	pub eligibility_notes: Option<String>,
	pub application_link: Option<String>,
	pub needs: Vec<String>,
	pub budget_requested: Option<f64>,
	pub timeline: Option<String>,
	pub project_stage: Option<String>,
	pub team_size: Option<i32>,
	pub prior_funding: Option<bool>,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

#[derive(Debug)]
pub struct OrgProfile {
	pub org_id: Uuid,
	pub organization_name: Option<String>,
	pub mission_statement: Option<String>,
	pub profile_picture_url: Option<String>,
	pub state: Option<String>,
	pub city: Option<String>,
	pub zip_code: Option<String>,
	pub sectors: Vec<String>,
	pub target_groups: Vec<String>,
}

#[derive(Debug)]
pub struct ProviderTermsRow {
	pub org_id: Uuid,
	pub funding_type: Option<String>,
	pub amount_offered: Option<f64>,
	pub deadline: Option<OffsetDateTime>,
	pub region_scope: Option<String>,
	pub eligibility_notes: Option<String>,
	pub application_link: Option<String>,
}

#[derive(Debug)]
pub struct RecipientNeedsRow {
	pub org_id: Uuid,
	pub needs: Vec<String>,
	pub budget_requested: Option<f64>,
	pub timeline: Option<String>,
	pub project_stage: Option<String>,
	pub team_size: Option<i32>,
	pub prior_funding: Option<bool>,
}

#[derive(Debug)]
pub struct CandidateScoreRow {
	pub candidate_id: Uuid,
	pub score: f64,
	pub breakdown: Value,
}

/// A stored candidate joined with the summary fields shown in listings.
#[derive(Debug, sqlx::FromRow)]
pub struct CandidateSummary {
	pub candidate_id: Uuid,
	pub score: f64,
	pub breakdown: Value,
	pub computed_at: OffsetDateTime,
	pub role: String,
	pub organization_name: Option<String>,
	pub profile_picture_url: Option<String>,
	pub state: Option<String>,
	pub city: Option<String>,
}

/// A connection seen from one side, with the other party's summary.
#[derive(Debug, sqlx::FromRow)]
pub struct ConnectionSummary {
	pub connection_id: Uuid,
	pub initiator_id: Uuid,
	pub target_id: Uuid,
	pub created_at: OffsetDateTime,
	pub other_id: Uuid,
	pub other_role: String,
	pub organization_name: Option<String>,
	pub profile_picture_url: Option<String>,
	pub state: Option<String>,
	pub city: Option<String>,
}
