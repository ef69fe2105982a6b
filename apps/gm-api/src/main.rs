use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = gm_api::Args::parse();

	gm_api::run(args).await
}
