pub mod candidates;
pub mod profile;
pub mod scoring;
pub mod status;

pub use candidates::{
	CandidateScore, Exclusions, Rejection, Selection, SelectionPolicy, SelectionStats,
	evaluate_candidate, select_candidates,
};
pub use profile::{
	FundingType, OrgStatus, Profile, ProjectStage, ProviderTerms, RecipientNeeds, Role,
	RoleAttributes, Timeline, UnknownVariant, normalize_tags,
};
pub use scoring::{ScoreBreakdown, score_pair};
pub use status::derive_status;
