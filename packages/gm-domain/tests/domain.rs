use std::collections::HashSet;

use time::{Duration, OffsetDateTime, macros::datetime};
use uuid::Uuid;

use gm_domain::{
	Exclusions, OrgStatus, Profile, ProjectStage, ProviderTerms, RecipientNeeds, Rejection, Role,
	RoleAttributes, SelectionPolicy, Timeline, derive_status, evaluate_candidate, normalize_tags,
	score_pair, select_candidates,
};

const NOW: OffsetDateTime = datetime!(2026-04-01 09:00 UTC);

fn policy(threshold: f64) -> SelectionPolicy {
	SelectionPolicy { threshold, max_candidates: 0 }
}

fn provider(id: u128, sectors: &[&str], target_groups: &[&str], terms: ProviderTerms) -> Profile {
	let mut profile = Profile::new(Uuid::from_u128(id), Role::Provider);

	profile.organization_name = Some(format!("Provider {id}"));
	profile.sectors = normalize_tags(sectors);
	profile.target_groups = normalize_tags(target_groups);
	profile.attributes = RoleAttributes::Provider(terms);

	profile
}

fn recipient(id: u128, sectors: &[&str], target_groups: &[&str], needs: RecipientNeeds) -> Profile {
	let mut profile = Profile::new(Uuid::from_u128(id), Role::Recipient);

	profile.organization_name = Some(format!("Recipient {id}"));
	profile.sectors = normalize_tags(sectors);
	profile.target_groups = normalize_tags(target_groups);
	profile.state = Some("WA".to_string());
	profile.city = Some("Spokane".to_string());
	profile.zip_code = Some("99201".to_string());
	profile.attributes = RoleAttributes::Recipient(needs);

	profile
}

fn seed_terms(amount_offered: f64) -> ProviderTerms {
	ProviderTerms {
		funding_type: Some("seed".to_string()),
		amount_offered: Some(amount_offered),
		deadline: Some(NOW + Duration::days(60)),
		..Default::default()
	}
}

fn early_needs(budget_requested: f64) -> RecipientNeeds {
	RecipientNeeds {
		budget_requested: Some(budget_requested),
		timeline: Some(Timeline::ShortTerm),
		project_stage: Some(ProjectStage::EarlyStage),
		..Default::default()
	}
}

fn boundary_pair(amount_offered: f64) -> (Profile, Profile) {
	let p = provider(
		1,
		&["Education", "Health", "Arts"],
		&["Youth", "Seniors", "Veterans"],
		ProviderTerms {
			funding_type: Some("grant".to_string()),
			amount_offered: Some(amount_offered),
			deadline: Some(NOW + Duration::days(400)),
			..Default::default()
		},
	);
	let r = recipient(
		2,
		&["Education", "Water", "Housing"],
		&["Youth", "Families", "Refugees"],
		RecipientNeeds {
			budget_requested: Some(100_000.0),
			timeline: Some(Timeline::ShortTerm),
			project_stage: Some(ProjectStage::EarlyStage),
			..Default::default()
		},
	);

	(p, r)
}

#[test]
fn well_aligned_pair_scores_high_and_is_selected() {
	let p = provider(1, &["Education"], &["Youth"], seed_terms(50_000.0));
	let r = recipient(2, &["Education", "Health"], &["Youth"], early_needs(40_000.0));
	let breakdown = score_pair(&p, &r, NOW).expect("Opposite roles must score.");

	assert_eq!(breakdown.sector, 50.0);
	assert_eq!(breakdown.target_group, 100.0);
	assert_eq!(breakdown.budget, 100.0);
	assert_eq!(breakdown.timeline, 100.0);
	assert_eq!(breakdown.stage, 100.0);
	assert_eq!(breakdown.composite, 85.0);

	let selection =
		select_candidates(&p, [&r], &Exclusions::default(), policy(30.0), NOW);

	assert_eq!(selection.candidates.len(), 1);
	assert_eq!(selection.candidates[0].candidate_id, r.org_id);
	assert!(selection.candidates[0].score() >= 80.0);
}

#[test]
fn scoring_is_symmetric() {
	let p = provider(1, &["Education", "Arts"], &["Youth"], seed_terms(10_000.0));
	let r = recipient(2, &["Education"], &["Youth", "Families"], early_needs(40_000.0));

	assert_eq!(score_pair(&p, &r, NOW), score_pair(&r, &p, NOW));
}

#[test]
fn same_role_pairs_do_not_score() {
	let a = provider(1, &["Education"], &["Youth"], seed_terms(1.0));
	let b = provider(2, &["Education"], &["Youth"], seed_terms(1.0));

	assert!(score_pair(&a, &b, NOW).is_none());
	assert_eq!(
		evaluate_candidate(&a, &b, &Exclusions::default(), 0.0, NOW),
		Err(Rejection::SameRole)
	);
}

#[test]
fn threshold_is_inclusive() {
	let (p, r) = boundary_pair(40_000.0);
	let scored = evaluate_candidate(&p, &r, &Exclusions::default(), 30.0, NOW)
		.expect("Composite at the threshold must be selected.");

	assert_eq!(scored.breakdown.budget, 40.0);
	assert_eq!(scored.breakdown.timeline, 0.0);
	assert_eq!(scored.breakdown.stage, 20.0);
	assert_eq!(scored.score(), 30.0);

	let (p, r) = boundary_pair(35_000.0);

	assert_eq!(score_pair(&p, &r, NOW).map(|b| b.composite), Some(29.0));
	assert_eq!(
		evaluate_candidate(&p, &r, &Exclusions::default(), 30.0, NOW),
		Err(Rejection::BelowThreshold)
	);
}

#[test]
fn pairs_without_shared_tags_are_rejected() {
	let p = provider(1, &[], &[], seed_terms(500_000.0));
	let r = recipient(2, &["Education"], &["Youth"], early_needs(40_000.0));
	let breakdown = score_pair(&p, &r, NOW).expect("Opposite roles must score.");

	assert_eq!(breakdown.sector, 0.0);
	assert_eq!(breakdown.target_group, 0.0);
	assert_eq!(
		evaluate_candidate(&p, &r, &Exclusions::default(), 0.0, NOW),
		Err(Rejection::NoSharedSignal)
	);
}

#[test]
fn connected_and_dismissed_candidates_are_excluded() {
	let p = provider(1, &["Education"], &["Youth"], seed_terms(50_000.0));
	let connected = recipient(2, &["Education"], &["Youth"], early_needs(40_000.0));
	let dismissed = recipient(3, &["Education"], &["Youth"], early_needs(40_000.0));
	let open = recipient(4, &["Education"], &["Youth"], early_needs(40_000.0));
	let exclusions = Exclusions {
		connected: HashSet::from([connected.org_id]),
		dismissed: HashSet::from([dismissed.org_id]),
	};
	let selection =
		select_candidates(&p, [&connected, &dismissed, &open], &exclusions, policy(30.0), NOW);
	let ids = selection.candidates.iter().map(|c| c.candidate_id).collect::<Vec<_>>();

	assert_eq!(ids, vec![open.org_id]);
	assert_eq!(selection.stats.considered, 3);
	assert_eq!(selection.stats.rejected_excluded, 2);
}

#[test]
fn inactive_parties_never_match() {
	let expired = ProviderTerms { deadline: Some(NOW - Duration::days(1)), ..seed_terms(50_000.0) };
	let p_expired = provider(1, &["Education"], &["Youth"], expired);
	let p_open = provider(3, &["Education"], &["Youth"], seed_terms(50_000.0));
	let r = recipient(2, &["Education"], &["Youth"], early_needs(40_000.0));
	let mut r_incomplete = recipient(4, &["Education"], &["Youth"], early_needs(40_000.0));

	r_incomplete.zip_code = None;

	assert_eq!(derive_status(&p_expired, NOW), OrgStatus::Inactive);
	assert_eq!(
		evaluate_candidate(&r, &p_expired, &Exclusions::default(), 0.0, NOW),
		Err(Rejection::CandidateInactive)
	);
	assert_eq!(
		evaluate_candidate(&p_expired, &r, &Exclusions::default(), 0.0, NOW),
		Err(Rejection::SubjectInactive)
	);
	assert_eq!(
		evaluate_candidate(&p_open, &r_incomplete, &Exclusions::default(), 0.0, NOW),
		Err(Rejection::CandidateInactive)
	);
}

#[test]
fn ties_break_by_candidate_id() {
	let p = provider(1, &["Education"], &["Youth"], seed_terms(50_000.0));
	let high = recipient(9, &["Education"], &["Youth"], early_needs(40_000.0));
	let tie_b = recipient(7, &["Education", "Health"], &["Youth"], early_needs(40_000.0));
	let tie_a = recipient(5, &["Education", "Arts"], &["Youth"], early_needs(40_000.0));
	let selection =
		select_candidates(&p, [&tie_b, &high, &tie_a], &Exclusions::default(), policy(30.0), NOW);
	let ids = selection.candidates.iter().map(|c| c.candidate_id).collect::<Vec<_>>();

	assert_eq!(ids, vec![high.org_id, tie_a.org_id, tie_b.org_id]);
	assert_eq!(selection.candidates[1].score(), selection.candidates[2].score());
}

#[test]
fn max_candidates_keeps_the_best() {
	let p = provider(1, &["Education"], &["Youth"], seed_terms(50_000.0));
	let best = recipient(2, &["Education"], &["Youth"], early_needs(40_000.0));
	let weaker = recipient(3, &["Education", "Health"], &["Youth"], early_needs(40_000.0));
	let selection = select_candidates(
		&p,
		[&weaker, &best],
		&Exclusions::default(),
		SelectionPolicy { threshold: 30.0, max_candidates: 1 },
		NOW,
	);

	assert_eq!(selection.candidates.len(), 1);
	assert_eq!(selection.candidates[0].candidate_id, best.org_id);
	assert_eq!(selection.stats.truncated, 1);
	assert_eq!(selection.stats.selected, 1);
}
