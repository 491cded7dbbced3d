use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Filter directives, e.g. `AWSUDO_LOG=awsudo=debug`.
pub const LOG_ENV: &str = "AWSUDO_LOG";
/// Set to `json` for one JSON object per event.
pub const LOG_FORMAT_ENV: &str = "AWSUDO_LOG_FORMAT";

/// Install the global subscriber. Logs go to stderr so they never mix with
/// the output of the command being run.
pub fn init() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let json = std::env::var(LOG_FORMAT_ENV)
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let json_layer = json.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_level(true)
            .json()
    });
    let text_layer = (!json).then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .init();
}
