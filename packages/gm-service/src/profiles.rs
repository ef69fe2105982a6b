use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{Error, MatchService, Result};
use gm_domain::{
	OrgStatus, Profile, ProjectStage, ProviderTerms, RecipientNeeds, Role, RoleAttributes,
	Timeline, derive_status, normalize_tags, status::recipient_profile_complete,
};
use gm_storage::{
	candidates as candidate_store,
	models::{OrgProfile, ProfileRecord, ProviderTermsRow, RecipientNeedsRow},
	organizations,
};

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RegisterRequest {
	pub role: Role,
	#[serde(default)]
	pub organization_name: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RegisterResponse {
	pub org_id: Uuid,
	pub role: Role,
	pub status: OrgStatus,
}

/// Partial profile write. Absent fields keep their stored value, present set fields replace the
/// stored set, and blank text clears a field.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct ProfileUpdate {
	#[serde(default)]
	pub organization_name: Option<String>,
	#[serde(default)]
	pub mission_statement: Option<String>,
	#[serde(default)]
	pub profile_picture_url: Option<String>,
	#[serde(default)]
	pub state: Option<String>,
	#[serde(default)]
	pub city: Option<String>,
	#[serde(default)]
	pub zip_code: Option<String>,
	#[serde(default)]
	pub sectors: Option<Vec<String>>,
	#[serde(default)]
	pub target_groups: Option<Vec<String>>,
	#[serde(default)]
	pub provider: Option<ProviderTermsUpdate>,
	#[serde(default)]
	pub recipient: Option<RecipientNeedsUpdate>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct ProviderTermsUpdate {
	#[serde(default)]
	pub funding_type: Option<String>,
	#[serde(default)]
	pub amount_offered: Option<f64>,
	#[serde(default, with = "crate::time_serde::option")]
	pub deadline: Option<OffsetDateTime>,
	/// Makes the deadline open-ended. Ignored when `deadline` is also set.
	#[serde(default)]
	pub clear_deadline: bool,
	#[serde(default)]
	pub region_scope: Option<String>,
	#[serde(default)]
	pub eligibility_notes: Option<String>,
	#[serde(default)]
	pub application_link: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct RecipientNeedsUpdate {
	#[serde(default)]
	pub needs: Option<Vec<String>>,
	#[serde(default)]
	pub budget_requested: Option<f64>,
	#[serde(default)]
	pub timeline: Option<Timeline>,
	#[serde(default)]
	pub project_stage: Option<ProjectStage>,
	#[serde(default)]
	pub team_size: Option<i32>,
	#[serde(default)]
	pub prior_funding: Option<bool>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ProviderTermsView {
	pub funding_type: Option<String>,
	pub amount_offered: Option<f64>,
	#[serde(default, with = "crate::time_serde::option")]
	pub deadline: Option<OffsetDateTime>,
	pub region_scope: Option<String>,
	pub eligibility_notes: Option<String>,
	pub application_link: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RecipientNeedsView {
	pub needs: Vec<String>,
	pub budget_requested: Option<f64>,
	pub timeline: Option<Timeline>,
	pub project_stage: Option<ProjectStage>,
	pub team_size: Option<i32>,
	pub prior_funding: Option<bool>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ProfileResponse {
	pub org_id: Uuid,
	pub role: Role,
	pub status: OrgStatus,
	pub organization_name: Option<String>,
	pub mission_statement: Option<String>,
	pub profile_picture_url: Option<String>,
	pub state: Option<String>,
	pub city: Option<String>,
	pub zip_code: Option<String>,
	pub sectors: Vec<String>,
	pub target_groups: Vec<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub provider: Option<ProviderTermsView>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub recipient: Option<RecipientNeedsView>,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
	#[serde(with = "crate::time_serde")]
	pub updated_at: OffsetDateTime,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct StatusResponse {
	pub org_id: Uuid,
	pub role: Role,
	pub status: OrgStatus,
	pub profile_complete: bool,
}

/// A decoded profile row plus the descriptive fields scoring never reads.
#[derive(Clone, Debug)]
pub(crate) struct StoredProfile {
	pub(crate) profile: Profile,
	pub(crate) stored_status: OrgStatus,
	pub(crate) mission_statement: Option<String>,
	pub(crate) profile_picture_url: Option<String>,
	pub(crate) created_at: OffsetDateTime,
	pub(crate) updated_at: OffsetDateTime,
}

impl MatchService {
	pub async fn register_organization(&self, req: RegisterRequest) -> Result<RegisterResponse> {
		let now = OffsetDateTime::now_utc();
		let org_id = Uuid::new_v4();
		let mut profile = Profile::new(org_id, req.role);

		profile.organization_name = clean_text(req.organization_name);

		let status = derive_status(&profile, now);
		let mut tx = self.db.pool.begin().await?;

		organizations::insert_organization(
			&mut *tx,
			org_id,
			req.role.as_str(),
			status.as_str(),
			profile.organization_name.as_deref(),
			now,
		)
		.await?;
		write_role_attributes(&mut *tx, &profile, now).await?;

		tx.commit().await?;

		info!(org_id = %org_id, role = req.role.as_str(), "Organization registered.");

		Ok(RegisterResponse { org_id, role: req.role, status })
	}

	pub async fn get_profile(&self, org_id: Uuid) -> Result<ProfileResponse> {
		let now = OffsetDateTime::now_utc();
		let stored = self.load_profile(org_id).await?;
		let status = derive_status(&stored.profile, now);

		Ok(profile_response(&stored, status))
	}

	pub async fn status(&self, org_id: Uuid) -> Result<StatusResponse> {
		let now = OffsetDateTime::now_utc();
		let stored = self.load_profile(org_id).await?;
		let profile_complete = match stored.profile.role() {
			Role::Recipient => recipient_profile_complete(&stored.profile),
			Role::Provider => stored.profile.organization_name.is_some(),
		};

		Ok(StatusResponse {
			org_id,
			role: stored.profile.role(),
			status: derive_status(&stored.profile, now),
			profile_complete,
		})
	}

	/// Merges `update` into the stored profile and re-derives status in the same transaction.
	///
	/// An organization that ends up inactive is purged from every stored candidate set; an active
	/// one has its own set recomputed after the write commits.
	pub async fn put_profile(
		&self,
		org_id: Uuid,
		update: ProfileUpdate,
	) -> Result<ProfileResponse> {
		let now = OffsetDateTime::now_utc();
		let mut tx = self.db.pool.begin().await?;

		organizations::get_organization_for_update(&mut *tx, org_id)
			.await?
			.ok_or_else(|| organization_not_found(org_id))?;

		let record = organizations::get_profile(&mut *tx, org_id)
			.await?
			.ok_or_else(|| organization_not_found(org_id))?;
		let mut stored = decode_profile(record)?;

		apply_update(
			&mut stored.profile,
			&mut stored.mission_statement,
			&mut stored.profile_picture_url,
			update,
		)?;

		let status = derive_status(&stored.profile, now);

		organizations::upsert_org_profile(&mut *tx, &org_profile_row(&stored), now).await?;
		write_role_attributes(&mut *tx, &stored.profile, now).await?;
		organizations::update_status(&mut *tx, org_id, status.as_str(), now).await?;

		// Only the organization's own set is locked. Another subject's recompute that loaded the pool
		// before this commit may still write the organization back; its next recompute drops it.
		if !status.is_active() {
			candidate_store::lock_subject(&mut *tx, org_id).await?;
			candidate_store::purge_organization(&mut *tx, org_id).await?;
		}

		tx.commit().await?;

		if stored.stored_status != status {
			info!(
				org_id = %org_id,
				from = stored.stored_status.as_str(),
				to = status.as_str(),
				"Organization status changed."
			);
		}

		stored.stored_status = status;
		stored.updated_at = now;

		if status.is_active()
			&& let Err(err) = self.recompute(org_id).await
		{
			warn!(error = %err, org_id = %org_id, "Recompute after profile write failed.");
		}

		Ok(profile_response(&stored, status))
	}

	pub(crate) async fn load_profile(&self, org_id: Uuid) -> Result<StoredProfile> {
		let mut conn = self.db.pool.acquire().await?;
		let record = organizations::get_profile(&mut conn, org_id)
			.await?
			.ok_or_else(|| organization_not_found(org_id))?;

		decode_profile(record)
	}
}

pub(crate) fn organization_not_found(org_id: Uuid) -> Error {
	Error::NotFound { message: format!("Organization {org_id} does not exist.") }
}

/// Maps a stored row onto the domain model. Unrecognized enumeration text in optional columns is
/// read as missing data, never as an error.
pub(crate) fn decode_profile(record: ProfileRecord) -> Result<StoredProfile> {
	let role: Role = record.role.parse().map_err(|err| Error::Storage {
		message: format!("Organization {} has an unreadable role: {err}", record.org_id),
	})?;
	let stored_status: OrgStatus = record.status.parse().map_err(|err| Error::Storage {
		message: format!("Organization {} has an unreadable status: {err}", record.org_id),
	})?;
	let attributes = match role {
		Role::Provider => RoleAttributes::Provider(ProviderTerms {
			funding_type: record.funding_type,
			amount_offered: record.amount_offered,
			deadline: record.deadline,
			region_scope: record.region_scope,
			eligibility_notes: record.eligibility_notes,
			application_link: record.application_link,
		}),
		Role::Recipient => RoleAttributes::Recipient(RecipientNeeds {
			needs: normalize_tags(&record.needs),
			budget_requested: record.budget_requested,
			timeline: record.timeline.as_deref().and_then(Timeline::parse),
			project_stage: record.project_stage.as_deref().and_then(ProjectStage::parse),
			team_size: record.team_size,
			prior_funding: record.prior_funding,
		}),
	};
	let profile = Profile {
		org_id: record.org_id,
		organization_name: record.organization_name,
		sectors: normalize_tags(&record.sectors),
		target_groups: normalize_tags(&record.target_groups),
		state: record.state,
		city: record.city,
		zip_code: record.zip_code,
		attributes,
	};

	Ok(StoredProfile {
		profile,
		stored_status,
		mission_statement: record.mission_statement,
		profile_picture_url: record.profile_picture_url,
		created_at: record.created_at,
		updated_at: record.updated_at,
	})
}

fn apply_update(
	profile: &mut Profile,
	mission_statement: &mut Option<String>,
	profile_picture_url: &mut Option<String>,
	update: ProfileUpdate,
) -> Result<()> {
	let ProfileUpdate {
		organization_name,
		mission_statement: mission_update,
		profile_picture_url: picture_update,
		state,
		city,
		zip_code,
		sectors,
		target_groups,
		provider,
		recipient,
	} = update;

	match (&mut profile.attributes, provider, recipient) {
		(RoleAttributes::Provider(_), _, Some(_)) =>
			return Err(Error::InvalidRequest {
				message: "recipient fields are only accepted for recipient organizations."
					.to_string(),
			}),
		(RoleAttributes::Recipient(_), Some(_), _) =>
			return Err(Error::InvalidRequest {
				message: "provider fields are only accepted for provider organizations."
					.to_string(),
			}),
		(RoleAttributes::Provider(terms), Some(update), None) => merge_provider(terms, update)?,
		(RoleAttributes::Recipient(needs), None, Some(update)) => merge_recipient(needs, update)?,
		_ => {},
	}

	merge_text(&mut profile.organization_name, organization_name);
	merge_text(mission_statement, mission_update);
	merge_text(profile_picture_url, picture_update);
	merge_text(&mut profile.state, state);
	merge_text(&mut profile.city, city);
	merge_text(&mut profile.zip_code, zip_code);

	if let Some(sectors) = sectors {
		profile.sectors = normalize_tags(sectors);
	}
	if let Some(target_groups) = target_groups {
		profile.target_groups = normalize_tags(target_groups);
	}

	Ok(())
}

fn merge_provider(terms: &mut ProviderTerms, update: ProviderTermsUpdate) -> Result<()> {
	if let Some(amount) = update.amount_offered {
		terms.amount_offered = Some(validate_amount("provider.amount_offered", amount)?);
	}
	if let Some(deadline) = update.deadline {
		terms.deadline = Some(deadline);
	} else if update.clear_deadline {
		terms.deadline = None;
	}

	merge_text(&mut terms.funding_type, update.funding_type);
	merge_text(&mut terms.region_scope, update.region_scope);
	merge_text(&mut terms.eligibility_notes, update.eligibility_notes);
	merge_text(&mut terms.application_link, update.application_link);

	Ok(())
}

fn merge_recipient(needs: &mut RecipientNeeds, update: RecipientNeedsUpdate) -> Result<()> {
	if let Some(amount) = update.budget_requested {
		needs.budget_requested = Some(validate_amount("recipient.budget_requested", amount)?);
	}
	if let Some(team_size) = update.team_size {
		if team_size < 0 {
			return Err(Error::InvalidRequest {
				message: "recipient.team_size must be zero or greater.".to_string(),
			});
		}

		needs.team_size = Some(team_size);
	}
	if let Some(tags) = update.needs {
		needs.needs = normalize_tags(tags);
	}
	if let Some(timeline) = update.timeline {
		needs.timeline = Some(timeline);
	}
	if let Some(stage) = update.project_stage {
		needs.project_stage = Some(stage);
	}
	if let Some(prior_funding) = update.prior_funding {
		needs.prior_funding = Some(prior_funding);
	}

	Ok(())
}

fn validate_amount(field: &str, amount: f64) -> Result<f64> {
	if !amount.is_finite() || amount < 0.0 {
		return Err(Error::InvalidRequest {
			message: format!("{field} must be a finite amount of zero or greater."),
		});
	}

	Ok(amount)
}

fn merge_text(slot: &mut Option<String>, update: Option<String>) {
	if let Some(value) = update {
		*slot = clean_text(Some(value));
	}
}

fn clean_text(value: Option<String>) -> Option<String> {
	value.map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}

fn org_profile_row(stored: &StoredProfile) -> OrgProfile {
	let profile = &stored.profile;

	OrgProfile {
		org_id: profile.org_id,
		organization_name: profile.organization_name.clone(),
		mission_statement: stored.mission_statement.clone(),
		profile_picture_url: stored.profile_picture_url.clone(),
		state: profile.state.clone(),
		city: profile.city.clone(),
		zip_code: profile.zip_code.clone(),
		sectors: profile.sectors.iter().cloned().collect(),
		target_groups: profile.target_groups.iter().cloned().collect(),
	}
}

async fn write_role_attributes(
	executor: &mut sqlx::PgConnection,
	profile: &Profile,
	now: OffsetDateTime,
) -> Result<()> {
	match &profile.attributes {
		RoleAttributes::Provider(terms) => {
			let row = ProviderTermsRow {
				org_id: profile.org_id,
				funding_type: terms.funding_type.clone(),
				amount_offered: terms.amount_offered,
				deadline: terms.deadline,
				region_scope: terms.region_scope.clone(),
				eligibility_notes: terms.eligibility_notes.clone(),
				application_link: terms.application_link.clone(),
			};

			organizations::upsert_provider_terms(executor, &row, now).await?;
		},
		RoleAttributes::Recipient(needs) => {
			let row = RecipientNeedsRow {
				org_id: profile.org_id,
				needs: needs.needs.iter().cloned().collect(),
				budget_requested: needs.budget_requested,
				timeline: needs.timeline.map(|timeline| timeline.as_str().to_string()),
				project_stage: needs.project_stage.map(|stage| stage.as_str().to_string()),
				team_size: needs.team_size,
				prior_funding: needs.prior_funding,
			};

			organizations::upsert_recipient_needs(executor, &row, now).await?;
		},
	}

	Ok(())
}

fn profile_response(stored: &StoredProfile, status: OrgStatus) -> ProfileResponse {
	let profile = &stored.profile;
	let (provider, recipient) = match &profile.attributes {
		RoleAttributes::Provider(terms) => (
			Some(ProviderTermsView {
				funding_type: terms.funding_type.clone(),
				amount_offered: terms.amount_offered,
				deadline: terms.deadline,
				region_scope: terms.region_scope.clone(),
				eligibility_notes: terms.eligibility_notes.clone(),
				application_link: terms.application_link.clone(),
			}),
			None,
		),
		RoleAttributes::Recipient(needs) => (
			None,
			Some(RecipientNeedsView {
				needs: needs.needs.iter().cloned().collect(),
				budget_requested: needs.budget_requested,
				timeline: needs.timeline,
				project_stage: needs.project_stage,
				team_size: needs.team_size,
				prior_funding: needs.prior_funding,
			}),
		),
	};

	ProfileResponse {
		org_id: profile.org_id,
		role: profile.role(),
		status,
		organization_name: profile.organization_name.clone(),
		mission_statement: stored.mission_statement.clone(),
		profile_picture_url: stored.profile_picture_url.clone(),
		state: profile.state.clone(),
		city: profile.city.clone(),
		zip_code: profile.zip_code.clone(),
		sectors: profile.sectors.iter().cloned().collect(),
		target_groups: profile.target_groups.iter().cloned().collect(),
		provider,
		recipient,
		created_at: stored.created_at,
		updated_at: stored.updated_at,
	}
}

#[cfg(test)]
mod tests {
	use time::macros::datetime;
	use uuid::Uuid;

	use crate::{
		Error,
		profiles::{ProfileUpdate, ProviderTermsUpdate, RecipientNeedsUpdate, apply_update},
	};
	use gm_domain::{Profile, ProjectStage, Role, RoleAttributes, Timeline};

	fn apply(profile: &mut Profile, update: ProfileUpdate) -> crate::Result<()> {
		let mut mission = None;
		let mut picture = None;

		apply_update(profile, &mut mission, &mut picture, update)
	}

	#[test]
	fn absent_fields_keep_stored_values() {
		let mut profile = Profile::new(Uuid::new_v4(), Role::Recipient);

		profile.organization_name = Some("Harbor Arts".to_string());
		profile.city = Some("Tacoma".to_string());

		apply(
			&mut profile,
			ProfileUpdate {
				sectors: Some(vec![" Arts ".to_string(), "Arts".to_string()]),
				city: Some("  ".to_string()),
				..Default::default()
			},
		)
		.expect("Update must apply.");

		assert_eq!(profile.organization_name.as_deref(), Some("Harbor Arts"));
		assert_eq!(profile.city, None);
		assert_eq!(profile.sectors.iter().collect::<Vec<_>>(), vec!["Arts"]);
	}

	#[test]
	fn wrong_role_block_is_rejected() {
		let mut profile = Profile::new(Uuid::new_v4(), Role::Recipient);
		let err = apply(
			&mut profile,
			ProfileUpdate {
				provider: Some(ProviderTermsUpdate::default()),
				..Default::default()
			},
		)
		.expect_err("Provider block on a recipient must fail.");

		assert!(matches!(err, Error::InvalidRequest { .. }));

		let mut profile = Profile::new(Uuid::new_v4(), Role::Provider);
		let err = apply(
			&mut profile,
			ProfileUpdate {
				recipient: Some(RecipientNeedsUpdate::default()),
				..Default::default()
			},
		)
		.expect_err("Recipient block on a provider must fail.");

		assert!(matches!(err, Error::InvalidRequest { .. }));
	}

	#[test]
	fn negative_or_non_finite_amounts_are_rejected() {
		for amount in [-1.0, f64::INFINITY, f64::NAN] {
			let mut profile = Profile::new(Uuid::new_v4(), Role::Provider);
			let result = apply(
				&mut profile,
				ProfileUpdate {
					provider: Some(ProviderTermsUpdate {
						amount_offered: Some(amount),
						..Default::default()
					}),
					..Default::default()
				},
			);

			assert!(matches!(result, Err(Error::InvalidRequest { .. })), "amount {amount}");
		}
	}

	#[test]
	fn recipient_block_merges_field_by_field() {
		let mut profile = Profile::new(Uuid::new_v4(), Role::Recipient);

		apply(
			&mut profile,
			ProfileUpdate {
				recipient: Some(RecipientNeedsUpdate {
					budget_requested: Some(40_000.0),
					timeline: Some(Timeline::ShortTerm),
					..Default::default()
				}),
				..Default::default()
			},
		)
		.expect("First update must apply.");
		apply(
			&mut profile,
			ProfileUpdate {
				recipient: Some(RecipientNeedsUpdate {
					project_stage: Some(ProjectStage::EarlyStage),
					..Default::default()
				}),
				..Default::default()
			},
		)
		.expect("Second update must apply.");

		let RoleAttributes::Recipient(needs) = &profile.attributes else {
			panic!("Recipient attributes expected.");
		};

		assert_eq!(needs.budget_requested, Some(40_000.0));
		assert_eq!(needs.timeline, Some(Timeline::ShortTerm));
		assert_eq!(needs.project_stage, Some(ProjectStage::EarlyStage));
	}

	#[test]
	fn deadline_can_be_set_and_cleared() {
		let mut profile = Profile::new(Uuid::new_v4(), Role::Provider);
		let deadline = datetime!(2026-09-30 23:59 UTC);

		apply(
			&mut profile,
			ProfileUpdate {
				provider: Some(ProviderTermsUpdate {
					deadline: Some(deadline),
					..Default::default()
				}),
				..Default::default()
			},
		)
		.expect("Deadline update must apply.");

		assert_eq!(profile.provider_terms().and_then(|terms| terms.deadline), Some(deadline));

		apply(
			&mut profile,
			ProfileUpdate {
				provider: Some(ProviderTermsUpdate { clear_deadline: true, ..Default::default() }),
				..Default::default()
			},
		)
		.expect("Deadline clear must apply.");

		assert_eq!(profile.provider_terms().and_then(|terms| terms.deadline), None);
	}
}
