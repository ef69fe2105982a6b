//! Match Scoring Engine.
//!
//! A pure function of two opposite-role profiles and the current time. The pair is always
//! oriented as (provider, recipient) before any factor is evaluated, so scoring A against B and B
//! against A produce identical breakdowns.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::profile::{FundingType, Profile, ProjectStage, ProviderTerms, RecipientNeeds};

pub const SECTOR_WEIGHT: f64 = 0.30;
pub const TARGET_GROUP_WEIGHT: f64 = 0.30;
pub const BUDGET_WEIGHT: f64 = 0.20;
pub const TIMELINE_WEIGHT: f64 = 0.10;
pub const STAGE_WEIGHT: f64 = 0.10;

pub const FULL_CREDIT: f64 = 100.0;
pub const STAGE_BASELINE: f64 = 20.0;

/// Per-factor scores on the 0-100 scale plus their weighted composite.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct ScoreBreakdown {
	pub sector: f64,
	pub target_group: f64,
	pub budget: f64,
	pub timeline: f64,
	pub stage: f64,
	pub composite: f64,
}
impl ScoreBreakdown {
	/// True when at least one of the tag-overlap factors carries signal.
	pub fn has_shared_signal(&self) -> bool {
		self.sector > 0.0 || self.target_group > 0.0
	}
}

/// Scores an ordered pair. Returns `None` when both profiles have the same role.
pub fn score_pair(a: &Profile, b: &Profile, now: OffsetDateTime) -> Option<ScoreBreakdown> {
	let (provider, terms, recipient, needs) = orient(a, b)?;
	let sector = tag_overlap(&provider.sectors, &recipient.sectors);
	let target_group = tag_overlap(&provider.target_groups, &recipient.target_groups);
	let budget = budget_fit(terms, needs);
	let timeline = timeline_fit(terms, needs, now);
	let stage = stage_fit(terms, needs);
	let composite = round_score(
		sector * SECTOR_WEIGHT
			+ target_group * TARGET_GROUP_WEIGHT
			+ budget * BUDGET_WEIGHT
			+ timeline * TIMELINE_WEIGHT
			+ stage * STAGE_WEIGHT,
	);

	Some(ScoreBreakdown { sector, target_group, budget, timeline, stage, composite })
}

/// `|A ∩ B| / max(|A|, |B|)` on the 0-100 scale; zero when either set is empty.
pub fn tag_overlap(left: &BTreeSet<String>, right: &BTreeSet<String>) -> f64 {
	let denominator = left.len().max(right.len());

	if left.is_empty() || right.is_empty() {
		return 0.0;
	}

	let shared = left.intersection(right).count();

	shared as f64 / denominator as f64 * FULL_CREDIT
}

pub fn budget_fit(terms: &ProviderTerms, needs: &RecipientNeeds) -> f64 {
	let requested = finite_non_negative(needs.budget_requested);

	if requested <= 0.0 {
		return 0.0;
	}

	let offered = finite_non_negative(terms.amount_offered);

	if offered >= requested { FULL_CREDIT } else { offered / requested * FULL_CREDIT }
}

/// Full credit when the provider's deadline is open or lands inside the recipient's horizon.
/// A recipient without a declared timeline earns nothing.
pub fn timeline_fit(terms: &ProviderTerms, needs: &RecipientNeeds, now: OffsetDateTime) -> f64 {
	let Some(timeline) = needs.timeline else {
		return 0.0;
	};
	let within = match terms.deadline {
		None => true,
		Some(deadline) => deadline >= now && deadline <= now + timeline.horizon(),
	};

	if within { FULL_CREDIT } else { 0.0 }
}

pub fn stage_fit(terms: &ProviderTerms, needs: &RecipientNeeds) -> f64 {
	let funding = terms.funding_type.as_deref().and_then(FundingType::parse);

	match (needs.project_stage, funding) {
		(Some(stage), Some(funding)) => stage_table(stage, funding),
		_ => STAGE_BASELINE,
	}
}

fn stage_table(stage: ProjectStage, funding: FundingType) -> f64 {
	match (stage, funding) {
		(ProjectStage::EarlyStage, FundingType::Seed)
		| (ProjectStage::GrowthStage, FundingType::SeriesA)
		| (ProjectStage::MatureStage, FundingType::SeriesB) => FULL_CREDIT,
		(ProjectStage::EarlyStage, FundingType::PitchCompetition) => 80.0,
		(ProjectStage::GrowthStage, FundingType::PitchCompetition) => 60.0,
		(ProjectStage::MatureStage, FundingType::PitchCompetition) => 40.0,
		_ => STAGE_BASELINE,
	}
}

/// Rounds to two decimal places, the precision stored and displayed.
pub fn round_score(value: f64) -> f64 {
	if !value.is_finite() {
		return 0.0;
	}

	(value * 100.0).round() / 100.0
}

fn orient<'a>(
	a: &'a Profile,
	b: &'a Profile,
) -> Option<(&'a Profile, &'a ProviderTerms, &'a Profile, &'a RecipientNeeds)> {
	if let (Some(terms), Some(needs)) = (a.provider_terms(), b.recipient_needs()) {
		return Some((a, terms, b, needs));
	}
	if let (Some(needs), Some(terms)) = (a.recipient_needs(), b.provider_terms()) {
		return Some((b, terms, a, needs));
	}

	None
}

fn finite_non_negative(value: Option<f64>) -> f64 {
	match value {
		Some(value) if value.is_finite() && value > 0.0 => value,
		_ => 0.0,
	}
}
