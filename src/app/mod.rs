//! Glue between the binaries and the library: builds clients from config and
//! renders errors for the terminal.

pub mod rotate;
pub mod sudo;

use std::error::Error as _;

use crate::aws::Endpoint;
use crate::config::ResolvedConfig;
use crate::rotate::RotateError;

fn endpoint(url: Option<&str>, config: &ResolvedConfig) -> Endpoint {
    let endpoint = Endpoint::new(config.endpoints.region.clone()).with_timeout(config.http.timeout);
    match url {
        Some(url) => endpoint.with_url(url),
        None => endpoint,
    }
}

pub fn sts_endpoint(config: &ResolvedConfig) -> Endpoint {
    endpoint(config.endpoints.sts.as_deref(), config)
}

pub fn iam_endpoint(config: &ResolvedConfig) -> Endpoint {
    endpoint(config.endpoints.iam.as_deref(), config)
}

/// Text printed to stderr for a fatal error.
///
/// A rotation that needs manual remediation prints what went wrong before
/// the advice. Everything else prints the error chain.
pub fn render_error(err: &anyhow::Error) -> String {
    match err.downcast_ref::<RotateError>() {
        Some(rotate) if rotate.needs_remediation() => {
            let mut causes = Vec::new();
            let mut next = rotate.source();
            while let Some(cause) = next {
                causes.push(cause.to_string());
                next = cause.source();
            }
            format!("{}\n{rotate}", causes.join(": "))
        }
        _ => format!("{err:#}"),
    }
}
