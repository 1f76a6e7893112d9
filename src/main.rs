use anyhow::Result;
use clap::Parser;
use hijaiyah_trainer::{cli::Cli, infra::logging};

fn main() -> Result<()> {
    let cli = Cli::parse();
    // Held until exit so buffered file logs are flushed
    let _guard = logging::init(cli.verbose, cli.log_file.as_deref())?;
    cli.run()
}
