pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Not found: {message}")]
	NotFound { message: String },
	#[error("Conflict: {message}")]
	Conflict { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
}
impl Error {
	/// Data-access failures abandon the operation without partial writes, so callers may retry.
	pub fn is_retryable(&self) -> bool {
		matches!(self, Self::Storage { .. })
	}
}

impl From<sqlx::Error> for Error {
	fn from(err: sqlx::Error) -> Self {
		Self::Storage { message: err.to_string() }
	}
}

impl From<gm_storage::Error> for Error {
	fn from(err: gm_storage::Error) -> Self {
		match err {
			gm_storage::Error::Sqlx(inner) => Self::Storage { message: inner.to_string() },
			gm_storage::Error::NotFound(message) => Self::NotFound { message },
			gm_storage::Error::Conflict(message) => Self::Conflict { message },
		}
	}
}
