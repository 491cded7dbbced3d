use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use awsudo::app;
use awsudo::config::ResolvedConfig;

#[derive(Parser)]
#[command(name = "awsudo", version)]
#[command(about = "Sets AWS environment variables and then executes the COMMAND")]
struct Cli {
    /// Profile to run as (defaults to the default profile)
    #[arg(short = 'u', value_name = "PROFILE")]
    profile: Option<String>,

    /// Path to config file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Command to run, followed by its arguments
    #[arg(
        value_name = "COMMAND",
        required = true,
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    command: Vec<OsString>,
}

async fn run(cli: Cli) -> anyhow::Result<i32> {
    let config = ResolvedConfig::load(cli.config.as_deref())?;
    app::sudo::run(&config, cli.profile.as_deref(), &cli.command).await
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    awsudo::logging::init();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        Err(err) => {
            eprintln!("{}", app::render_error(&err));
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_profile_and_command() {
        let cli = Cli::try_parse_from(["awsudo", "-u", "prod", "aws", "s3", "ls"]).unwrap();
        assert_eq!(cli.profile.as_deref(), Some("prod"));
        assert_eq!(cli.command, vec!["aws", "s3", "ls"]);
    }

    #[test]
    fn command_flags_are_not_parsed_as_ours() {
        let cli = Cli::try_parse_from(["awsudo", "--", "env", "-u", "HOME"]).unwrap();
        assert_eq!(cli.profile, None);
        assert_eq!(cli.command, vec!["env", "-u", "HOME"]);

        let cli = Cli::try_parse_from(["awsudo", "ls", "-la"]).unwrap();
        assert_eq!(cli.command, vec!["ls", "-la"]);
    }

    #[test]
    fn command_is_required() {
        assert!(Cli::try_parse_from(["awsudo"]).is_err());
        assert!(Cli::try_parse_from(["awsudo", "-u", "prod"]).is_err());
    }
}
