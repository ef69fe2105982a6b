//! Candidate selection.
//!
//! Given a subject and a pool of opposite-role profiles, decides which candidates belong in the
//! subject's materialized set and in what order. Everything here is in memory; the service layer
//! loads the pool, calls [`select_candidates`], and swaps the result in atomically.

use std::{cmp::Ordering, collections::HashSet};

use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
	profile::{OrgStatus, Profile},
	scoring::{self, ScoreBreakdown},
	status,
};

/// Pairs that must never appear in the subject's set regardless of score.
#[derive(Clone, Debug, Default)]
pub struct Exclusions {
	pub connected: HashSet<Uuid>,
	pub dismissed: HashSet<Uuid>,
}
impl Exclusions {
	pub fn contains(&self, candidate_id: &Uuid) -> Option<Rejection> {
		if self.connected.contains(candidate_id) {
			return Some(Rejection::Connected);
		}
		if self.dismissed.contains(candidate_id) {
			return Some(Rejection::Dismissed);
		}

		None
	}
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CandidateScore {
	pub candidate_id: Uuid,
	pub breakdown: ScoreBreakdown,
}
impl CandidateScore {
	pub fn score(&self) -> f64 {
		self.breakdown.composite
	}
}

/// Why a candidate was left out of a subject's set.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Rejection {
	SameRole,
	SelfMatch,
	SubjectInactive,
	CandidateInactive,
	Connected,
	Dismissed,
	NoSharedSignal,
	BelowThreshold,
}
#[derive(Clone, Copy, Debug)]
pub struct SelectionPolicy {
	/// Inclusive lower bound on the composite score.
	pub threshold: f64,
	/// Zero keeps every qualifying candidate.
	pub max_candidates: usize,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SelectionStats {
	pub considered: usize,
	pub selected: usize,
	pub truncated: usize,
	pub rejected_same_role: usize,
	pub rejected_inactive: usize,
	pub rejected_excluded: usize,
	pub rejected_no_signal: usize,
	pub rejected_below_threshold: usize,
}
impl SelectionStats {
	fn record(&mut self, rejection: Rejection) {
		match rejection {
			Rejection::SameRole | Rejection::SelfMatch => self.rejected_same_role += 1,
			Rejection::SubjectInactive | Rejection::CandidateInactive => {
				self.rejected_inactive += 1
			},
			Rejection::Connected | Rejection::Dismissed => self.rejected_excluded += 1,
			Rejection::NoSharedSignal => self.rejected_no_signal += 1,
			Rejection::BelowThreshold => self.rejected_below_threshold += 1,
		}
	}
}

#[derive(Clone, Debug, Default)]
pub struct Selection {
	pub candidates: Vec<CandidateScore>,
	pub stats: SelectionStats,
}

/// Applies the eligibility gate to one pair, then scores it.
///
/// Status is derived from the profiles at `now` rather than read from storage, so a provider
/// whose deadline lapsed since the last status refresh is already treated as inactive.
pub fn evaluate_candidate(
	subject: &Profile,
	candidate: &Profile,
	exclusions: &Exclusions,
	threshold: f64,
	now: OffsetDateTime,
) -> Result<CandidateScore, Rejection> {
	if subject.org_id == candidate.org_id {
		return Err(Rejection::SelfMatch);
	}
	if subject.role() == candidate.role() {
		return Err(Rejection::SameRole);
	}
	if status::derive_status(subject, now) != OrgStatus::Active {
		return Err(Rejection::SubjectInactive);
	}
	if status::derive_status(candidate, now) != OrgStatus::Active {
		return Err(Rejection::CandidateInactive);
	}
	if let Some(rejection) = exclusions.contains(&candidate.org_id) {
		return Err(rejection);
	}

	let breakdown =
		scoring::score_pair(subject, candidate, now).ok_or(Rejection::SameRole)?;

	if !breakdown.has_shared_signal() {
		return Err(Rejection::NoSharedSignal);
	}
	if breakdown.composite < threshold {
		return Err(Rejection::BelowThreshold);
	}

	Ok(CandidateScore { candidate_id: candidate.org_id, breakdown })
}

/// Scores every candidate in `pool` against `subject` and returns the qualifying ones ranked by
/// score descending, ties broken by candidate id ascending.
pub fn select_candidates<'a, I>(
	subject: &Profile,
	pool: I,
	exclusions: &Exclusions,
	policy: SelectionPolicy,
	now: OffsetDateTime,
) -> Selection
where
	I: IntoIterator<Item = &'a Profile>,
{
	let mut selection = Selection::default();

	for candidate in pool {
		selection.stats.considered += 1;

		match evaluate_candidate(subject, candidate, exclusions, policy.threshold, now) {
			Ok(scored) => selection.candidates.push(scored),
			Err(rejection) => selection.stats.record(rejection),
		}
	}

	selection.candidates.sort_by(rank);

	if policy.max_candidates > 0 && selection.candidates.len() > policy.max_candidates {
		selection.stats.truncated = selection.candidates.len() - policy.max_candidates;

		selection.candidates.truncate(policy.max_candidates);
	}

	selection.stats.selected = selection.candidates.len();

	selection
}

/// Total order used everywhere a candidate set is presented.
pub fn rank(left: &CandidateScore, right: &CandidateScore) -> Ordering {
	right
		.score()
		.total_cmp(&left.score())
		.then_with(|| left.candidate_id.cmp(&right.candidate_id))
}
