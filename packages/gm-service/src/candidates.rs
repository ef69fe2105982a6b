//! Candidate Set Manager.
//!
//! Each subject owns a materialized, ranked set of opposite-role candidates. The set is rebuilt
//! wholesale by [`MatchService::recompute`], read by [`MatchService::list`], and shrunk by
//! dismissals and by promotion to a connection. Every writer of a subject's set holds that
//! subject's advisory lock for the length of its transaction, so two recomputes for one subject
//! never interleave and readers see either the old set or the new one.

use serde::{Deserialize, Serialize};
use sqlx::PgConnection;
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
	Error, MatchService, Result,
	profiles::{self, organization_not_found},
};
use gm_domain::{Exclusions, OrgStatus, Role, ScoreBreakdown, derive_status, select_candidates};
use gm_storage::{
	candidates as candidate_store, connections, dismissals,
	models::{CandidateScoreRow, CandidateSummary},
	organizations,
};

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RecomputeReport {
	pub subject_id: Uuid,
	pub considered: usize,
	pub selected: usize,
	pub truncated: usize,
	#[serde(with = "crate::time_serde")]
	pub computed_at: OffsetDateTime,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CandidateItem {
	pub candidate_id: Uuid,
	pub score: f64,
	pub breakdown: ScoreBreakdown,
	pub role: Role,
	pub organization_name: Option<String>,
	pub profile_picture_url: Option<String>,
	pub state: Option<String>,
	pub city: Option<String>,
	#[serde(with = "crate::time_serde")]
	pub computed_at: OffsetDateTime,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PotentialMatchesResponse {
	pub subject_id: Uuid,
	pub candidates: Vec<CandidateItem>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct DismissResponse {
	pub subject_id: Uuid,
	pub candidate_id: Uuid,
	pub already_dismissed: bool,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PromoteResponse {
	pub removed: u64,
}

impl MatchService {
	/// Rebuilds the subject's candidate set and swaps it in atomically. Any failure rolls the
	/// transaction back and leaves the previous set authoritative.
	pub async fn recompute(&self, subject_id: Uuid) -> Result<RecomputeReport> {
		let now = OffsetDateTime::now_utc();
		let mut tx = self.db.pool.begin().await?;

		candidate_store::set_local_statement_timeout(
			&mut *tx,
			self.cfg.matching.statement_timeout_ms,
		)
		.await?;
		candidate_store::lock_subject(&mut *tx, subject_id).await?;

		let record = organizations::get_profile(&mut *tx, subject_id)
			.await?
			.ok_or_else(|| organization_not_found(subject_id))?;
		let subject = profiles::decode_profile(record)?.profile;
		let pool = if derive_status(&subject, now).is_active() {
			load_candidate_pool(&mut *tx, subject.role().opposite()).await?
		} else {
			Vec::new()
		};
		let exclusions = Exclusions {
			connected: connections::list_connected_ids(&mut *tx, subject_id)
				.await?
				.into_iter()
				.collect(),
			dismissed: dismissals::list_dismissed_ids(&mut *tx, subject_id)
				.await?
				.into_iter()
				.collect(),
		};
		let selection =
			select_candidates(&subject, &pool, &exclusions, self.selection_policy(), now);
		let rows = selection
			.candidates
			.iter()
			.map(|candidate| {
				let breakdown = serde_json::to_value(candidate.breakdown).map_err(|err| {
					Error::Storage { message: format!("Failed to encode score breakdown: {err}.") }
				})?;

				Ok(CandidateScoreRow {
					candidate_id: candidate.candidate_id,
					score: candidate.score(),
					breakdown,
				})
			})
			.collect::<Result<Vec<_>>>()?;

		candidate_store::replace_candidate_set(&mut *tx, subject_id, &rows, now).await?;

		tx.commit().await?;

		let stats = &selection.stats;

		info!(
			subject_id = %subject_id,
			considered = stats.considered,
			selected = stats.selected,
			truncated = stats.truncated,
			rejected_inactive = stats.rejected_inactive,
			rejected_excluded = stats.rejected_excluded,
			rejected_no_signal = stats.rejected_no_signal,
			rejected_below_threshold = stats.rejected_below_threshold,
			"Candidate set recomputed."
		);

		Ok(RecomputeReport {
			subject_id,
			considered: stats.considered,
			selected: stats.selected,
			truncated: stats.truncated,
			computed_at: now,
		})
	}

	/// The stored set as of the last recompute. Never recomputes.
	pub async fn list(&self, subject_id: Uuid) -> Result<Vec<CandidateItem>> {
		let mut conn = self.db.pool.acquire().await?;

		organizations::get_organization(&mut conn, subject_id)
			.await?
			.ok_or_else(|| organization_not_found(subject_id))?;

		let rows = candidate_store::list_candidate_set(&mut conn, subject_id).await?;

		rows.into_iter().map(candidate_item).collect()
	}

	/// Listing entry point for callers. Recomputes first when `matching.recompute_on_read` is on.
	pub async fn potential_matches(&self, subject_id: Uuid) -> Result<PotentialMatchesResponse> {
		if self.cfg.matching.recompute_on_read {
			self.recompute(subject_id).await?;
		}

		let candidates = self.list(subject_id).await?;

		Ok(PotentialMatchesResponse { subject_id, candidates })
	}

	/// Permanently removes `candidate_id` from the subject's set.
	///
	/// Dismissing an already-dismissed candidate succeeds without changes. A candidate that is
	/// neither dismissed nor in the current set is `NotFound`, and nothing is recorded.
	pub async fn dismiss(&self, subject_id: Uuid, candidate_id: Uuid) -> Result<DismissResponse> {
		let now = OffsetDateTime::now_utc();
		let mut tx = self.db.pool.begin().await?;

		candidate_store::lock_subject(&mut *tx, subject_id).await?;
		organizations::get_organization(&mut *tx, subject_id)
			.await?
			.ok_or_else(|| organization_not_found(subject_id))?;

		if dismissals::is_dismissed(&mut *tx, subject_id, candidate_id).await? {
			candidate_store::delete_candidate(&mut *tx, subject_id, candidate_id).await?;

			tx.commit().await?;

			return Ok(DismissResponse { subject_id, candidate_id, already_dismissed: true });
		}
		if !candidate_store::candidate_present(&mut *tx, subject_id, candidate_id).await? {
			return Err(Error::NotFound {
				message: format!("Candidate {candidate_id} is not in the current candidate set."),
			});
		}

		dismissals::insert_dismissal(&mut *tx, subject_id, candidate_id, now).await?;
		candidate_store::delete_candidate(&mut *tx, subject_id, candidate_id).await?;

		tx.commit().await?;

		info!(subject_id = %subject_id, candidate_id = %candidate_id, "Candidate dismissed.");

		Ok(DismissResponse { subject_id, candidate_id, already_dismissed: false })
	}

	/// Removes the pair from both subjects' sets. A pair that is in neither set is a no-op.
	pub async fn promote(&self, a: Uuid, b: Uuid) -> Result<PromoteResponse> {
		let mut tx = self.db.pool.begin().await?;
		let removed = promote_pair(&mut *tx, a, b).await?;

		tx.commit().await?;

		Ok(PromoteResponse { removed })
	}
}

/// Transaction-scoped half of promotion, shared with connection creation.
pub(crate) async fn promote_pair(executor: &mut PgConnection, a: Uuid, b: Uuid) -> Result<u64> {
	candidate_store::lock_subjects(executor, &[a, b]).await?;

	let removed = candidate_store::delete_pair(executor, a, b).await?;

	Ok(removed)
}

async fn load_candidate_pool(
	executor: &mut PgConnection,
	role: Role,
) -> Result<Vec<gm_domain::Profile>> {
	let records =
		organizations::list_profiles_by_role(executor, role.as_str(), OrgStatus::Active.as_str())
			.await?;
	let mut pool = Vec::with_capacity(records.len());

	for record in records {
		let org_id = record.org_id;

		match profiles::decode_profile(record) {
			Ok(stored) => pool.push(stored.profile),
			Err(err) => warn!(error = %err, org_id = %org_id, "Skipping unreadable profile."),
		}
	}

	Ok(pool)
}

fn candidate_item(row: CandidateSummary) -> Result<CandidateItem> {
	let role: Role = row.role.parse().map_err(|err| Error::Storage {
		message: format!("Candidate {} has an unreadable role: {err}", row.candidate_id),
	})?;
	let breakdown: ScoreBreakdown = serde_json::from_value(row.breakdown).map_err(|err| {
		Error::Storage {
			message: format!("Candidate {} has an unreadable breakdown: {err}.", row.candidate_id),
		}
	})?;

	Ok(CandidateItem {
		candidate_id: row.candidate_id,
		score: row.score,
		breakdown,
		role,
		organization_name: row.organization_name,
		profile_picture_url: row.profile_picture_url,
		state: row.state,
		city: row.city,
		computed_at: row.computed_at,
	})
}
