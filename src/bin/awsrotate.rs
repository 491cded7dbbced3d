use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use awsudo::app;
use awsudo::config::ResolvedConfig;
use awsudo::profile::DEFAULT_PROFILE;

#[derive(Parser)]
#[command(name = "awsrotate", version)]
#[command(about = "Rotates AWS API keys")]
#[command(long_about = app::rotate::LONG_ABOUT)]
struct Cli {
    /// Section of the credentials file holding the key to rotate
    #[arg(value_name = "SECTION", default_value = DEFAULT_PROFILE)]
    section: String,

    /// Path to config file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = ResolvedConfig::load(cli.config.as_deref())?;
    app::rotate::run(&config, &cli.section).await?;
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    awsudo::logging::init();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", app::render_error(&err));
            ExitCode::FAILURE
        }
    }
}
