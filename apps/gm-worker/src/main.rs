use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = gm_worker::Args::parse();

	gm_worker::run(args).await
}
