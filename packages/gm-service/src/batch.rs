use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{error, info};

use crate::{MatchService, Result};
use gm_domain::OrgStatus;
use gm_storage::{candidates as candidate_store, organizations};

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct BatchReport {
	pub processed: usize,
	pub failed: usize,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct StatusRefreshReport {
	pub deactivated: usize,
}

impl MatchService {
	/// Recomputes every active organization's candidate set independently. A failing subject is
	/// logged and counted; it never aborts the batch.
	pub async fn recompute_all(&self) -> Result<BatchReport> {
		let subject_ids = {
			let mut conn = self.db.pool.acquire().await?;

			organizations::list_org_ids_by_status(&mut conn, OrgStatus::Active.as_str()).await?
		};
		let mut report = BatchReport::default();

		for subject_id in subject_ids {
			match self.recompute(subject_id).await {
				Ok(_) => report.processed += 1,
				Err(err) => {
					report.failed += 1;

					error!(error = %err, subject_id = %subject_id, "Batch recompute failed.");
				},
			}
		}

		info!(processed = report.processed, failed = report.failed, "Batch recompute finished.");

		Ok(report)
	}

	/// Persists the inactive status of providers whose deadline has elapsed and drops them from
	/// every stored candidate set.
	pub async fn refresh_statuses(&self) -> Result<StatusRefreshReport> {
		let now = OffsetDateTime::now_utc();
		let mut tx = self.db.pool.begin().await?;
		let expired = organizations::deactivate_expired_providers(&mut *tx, now).await?;

		for org_id in &expired {
			candidate_store::purge_organization(&mut *tx, *org_id).await?;
		}

		tx.commit().await?;

		if !expired.is_empty() {
			info!(deactivated = expired.len(), "Expired providers deactivated.");
		}

		Ok(StatusRefreshReport { deactivated: expired.len() })
	}
}
