use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	#[serde(default)]
	pub matching: Matching,
	#[serde(default)]
	pub worker: Worker,
	pub security: Security,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub admin_bind: String,
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
}

#[derive(Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Deserialize)]
pub struct Matching {
	/// Inclusive lower bound on the composite score, on the 0-100 scale.
	#[serde(default = "default_score_threshold")]
	pub score_threshold: f64,
	/// When true, listing potential matches recomputes the subject's candidate set first.
	#[serde(default = "default_true")]
	pub recompute_on_read: bool,
	#[serde(default = "default_statement_timeout_ms")]
	pub statement_timeout_ms: u64,
	/// Zero keeps every qualifying candidate.
	#[serde(default)]
	pub max_candidates: u32,
}

#[derive(Debug, Deserialize)]
pub struct Worker {
	#[serde(default = "default_recompute_interval_seconds")]
	pub recompute_interval_seconds: u64,
	#[serde(default = "default_status_refresh_interval_seconds")]
	pub status_refresh_interval_seconds: u64,
}

#[derive(Debug, Deserialize)]
pub struct Security {
	pub bind_localhost_only: bool,
	pub api_auth_token: Option<String>,
	pub admin_auth_token: Option<String>,
}

impl Default for Matching {
	fn default() -> Self {
		Self {
			score_threshold: default_score_threshold(),
			recompute_on_read: true,
			statement_timeout_ms: default_statement_timeout_ms(),
			max_candidates: 0,
		}
	}
}

impl Default for Worker {
	fn default() -> Self {
		Self {
			recompute_interval_seconds: default_recompute_interval_seconds(),
			status_refresh_interval_seconds: default_status_refresh_interval_seconds(),
		}
	}
}

fn default_score_threshold() -> f64 {
	30.0
}

fn default_true() -> bool {
	true
}

fn default_statement_timeout_ms() -> u64 {
	10_000
}

fn default_recompute_interval_seconds() -> u64 {
	3_600
}

fn default_status_refresh_interval_seconds() -> u64 {
	300
}
