use sqlx::{PgPool, postgres::PgPoolOptions};

use crate::{Result, schema};

/// Serializes concurrent schema bootstraps across api and worker processes.
const SCHEMA_LOCK_KEY: i64 = 0x676d_5f73_6368;

pub struct Db {
	pub pool: PgPool,
}
impl Db {
	pub async fn connect(cfg: &gm_config::Postgres) -> Result<Self> {
		let pool =
			PgPoolOptions::new().max_connections(cfg.pool_max_conns).connect(&cfg.dsn).await?;

		Ok(Self { pool })
	}

	pub async fn ensure_schema(&self) -> Result<()> {
		let sql = schema::render_schema();
		let mut tx = self.pool.begin().await?;

		sqlx::query("SELECT pg_advisory_xact_lock($1)")
			.bind(SCHEMA_LOCK_KEY)
			.execute(&mut *tx)
			.await?;

		// Table files never carry a semicolon inside a statement.
		for statement in sql.split(';').map(str::trim).filter(|statement| !statement.is_empty()) {
			sqlx::query(statement).execute(&mut *tx).await?;
		}

		tx.commit().await?;

		Ok(())
	}
}
