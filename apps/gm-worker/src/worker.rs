//! Periodic maintenance: expire providers whose deadline passed, then rebuild every active
//! organization's candidate set so time-dependent scores stay current.

use std::time::Duration as StdDuration;

use color_eyre::Result;
use time::{Duration, OffsetDateTime};
use tokio::time as tokio_time;

use gm_service::MatchService;

const POLL_INTERVAL_MS: i64 = 1_000;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Schedule {
	pub recompute_every: Duration,
	pub status_refresh_every: Duration,
}
impl Schedule {
	pub fn from_config(cfg: &gm_config::Worker) -> Self {
		Self {
			recompute_every: seconds(cfg.recompute_interval_seconds),
			status_refresh_every: seconds(cfg.status_refresh_interval_seconds),
		}
	}
}

pub struct WorkerState {
	pub service: MatchService,
	pub schedule: Schedule,
}

pub async fn run_worker(state: WorkerState) -> Result<()> {
	let mut last_status_refresh: Option<OffsetDateTime> = None;
	let mut last_recompute: Option<OffsetDateTime> = None;

	loop {
		let now = OffsetDateTime::now_utc();

		if is_due(last_status_refresh, now, state.schedule.status_refresh_every)
			&& refresh_statuses(&state.service).await
		{
			last_status_refresh = Some(now);
		}
		if is_due(last_recompute, now, state.schedule.recompute_every)
			&& recompute_all(&state.service).await
		{
			last_recompute = Some(now);
		}

		tokio_time::sleep(to_std_duration(Duration::milliseconds(POLL_INTERVAL_MS))).await;
	}
}

pub async fn run_once(state: &WorkerState) {
	refresh_statuses(&state.service).await;
	recompute_all(&state.service).await;
}

async fn refresh_statuses(service: &MatchService) -> bool {
	match service.refresh_statuses().await {
		Ok(report) => {
			tracing::debug!(deactivated = report.deactivated, "Status refresh tick done.");

			true
		},
		Err(err) => {
			tracing::error!(error = %err, "Status refresh tick failed.");

			false
		},
	}
}

async fn recompute_all(service: &MatchService) -> bool {
	match service.recompute_all().await {
		Ok(report) => {
			tracing::debug!(processed = report.processed, "Recompute tick done.");

			true
		},
		Err(err) => {
			tracing::error!(error = %err, "Recompute tick failed.");

			false
		},
	}
}

/// A zero interval disables the job.
fn is_due(last: Option<OffsetDateTime>, now: OffsetDateTime, every: Duration) -> bool {
	if every <= Duration::ZERO {
		return false;
	}

	match last {
		None => true,
		Some(last) => now - last >= every,
	}
}

fn seconds(value: u64) -> Duration {
	Duration::seconds(i64::try_from(value).unwrap_or(i64::MAX))
}

fn to_std_duration(duration: Duration) -> StdDuration {
	let millis = duration.whole_milliseconds().max(0);

	StdDuration::from_millis(u64::try_from(millis).unwrap_or(u64::MAX))
}
