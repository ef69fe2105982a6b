mod error;
mod types;

pub use error::{Error, Result};
pub use types::{Config, Matching, Postgres, Security, Service, Storage, Worker};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	for (label, value) in [
		("service.http_bind", &cfg.service.http_bind),
		("service.admin_bind", &cfg.service.admin_bind),
		("service.log_level", &cfg.service.log_level),
		("storage.postgres.dsn", &cfg.storage.postgres.dsn),
	] {
		if value.trim().is_empty() {
			return Err(Error::Validation { message: format!("{label} must be non-empty.") });
		}
	}

	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
		});
	}
	if !cfg.matching.score_threshold.is_finite() {
		return Err(Error::Validation {
			message: "matching.score_threshold must be a finite number.".to_string(),
		});
	}
	if !(0.0..=100.0).contains(&cfg.matching.score_threshold) {
		return Err(Error::Validation {
			message: "matching.score_threshold must be in the range 0.0-100.0.".to_string(),
		});
	}
	if cfg.matching.statement_timeout_ms == 0 {
		return Err(Error::Validation {
			message: "matching.statement_timeout_ms must be greater than zero.".to_string(),
		});
	}
	if cfg.worker.recompute_interval_seconds == 0 {
		return Err(Error::Validation {
			message: "worker.recompute_interval_seconds must be greater than zero.".to_string(),
		});
	}
	if cfg.worker.status_refresh_interval_seconds == 0 {
		return Err(Error::Validation {
			message: "worker.status_refresh_interval_seconds must be greater than zero."
				.to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg.security.api_auth_token.as_deref().map(|token| token.trim().is_empty()).unwrap_or(false)
	{
		cfg.security.api_auth_token = None;
	}
	if cfg
		.security
		.admin_auth_token
		.as_deref()
		.map(|token| token.trim().is_empty())
		.unwrap_or(false)
	{
		cfg.security.admin_auth_token = None;
	}
}
