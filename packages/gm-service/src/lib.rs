pub mod batch;
pub mod candidates;
pub mod connections;
pub mod profiles;
pub mod time_serde;

mod error;

pub use batch::{BatchReport, StatusRefreshReport};
pub use candidates::{
	CandidateItem, DismissResponse, PotentialMatchesResponse, PromoteResponse, RecomputeReport,
};
pub use connections::{
	ConnectRequest, ConnectionDirection, ConnectionItem, ConnectionResponse, DisconnectResponse,
};
pub use error::{Error, Result};
pub use profiles::{
	ProfileResponse, ProfileUpdate, ProviderTermsUpdate, ProviderTermsView, RecipientNeedsUpdate,
	RecipientNeedsView, RegisterRequest, RegisterResponse, StatusResponse,
};

use gm_config::Config;
use gm_domain::SelectionPolicy;
use gm_storage::db::Db;

/// Candidate Set Manager plus the profile, connection, and dismissal stores it reads.
pub struct MatchService {
	pub cfg: Config,
	pub db: Db,
}
impl MatchService {
	pub fn new(cfg: Config, db: Db) -> Self {
		Self { cfg, db }
	}

	pub(crate) fn selection_policy(&self) -> SelectionPolicy {
		SelectionPolicy {
			threshold: self.cfg.matching.score_threshold,
			max_candidates: self.cfg.matching.max_candidates as usize,
		}
	}
}
