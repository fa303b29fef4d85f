use clap::Parser;
use tandem::config::Cli;
use tandem::RunConfig;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tandem::logging::init_tracing(cli.verbose);

    // Convert CLI args to RunConfig - this validates immediately
    let config = RunConfig::try_from(cli)?;

    tracing::info!(version = tandem::VERSION, "tandem starting");
    tandem::commands::sync::run(config)?;

    Ok(())
}
