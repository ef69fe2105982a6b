pub mod worker;

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use gm_service::MatchService;
use gm_storage::db::Db;

#[derive(Debug, Parser)]
#[command(
	version = gm_cli::VERSION,
	rename_all = "kebab",
	styles = gm_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	/// Run one status refresh and one full recompute, then exit.
	#[arg(long)]
	pub once: bool,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = gm_config::load(&args.config)?;
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).init();

	let db = Db::connect(&config.storage.postgres).await?;

	db.ensure_schema().await?;

	let schedule = worker::Schedule::from_config(&config.worker);
	let state = worker::WorkerState { service: MatchService::new(config, db), schedule };

	if args.once {
		worker::run_once(&state).await;

		return Ok(());
	}

	worker::run_worker(state).await
}
