//! Glue between our credential and error types and the AWS SDK's.

use aws_credential_types::Credentials;
// Every generated client shares the smithy result types; the STS re-exports
// serve IAM errors as well.
use aws_sdk_sts::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use secrecy::ExposeSecret;

use super::{ProviderError, StaticCredentials};

const PROVIDER_NAME: &str = "awsudo";

pub(crate) fn credentials(credentials: &StaticCredentials) -> Credentials {
    Credentials::new(
        credentials.access_key_id.clone(),
        credentials.secret_access_key.expose_secret().to_string(),
        credentials
            .session_token
            .as_ref()
            .map(|token| token.expose_secret().to_string()),
        None,
        PROVIDER_NAME,
    )
}

enum Failure {
    Service {
        code: String,
        message: String,
        status: u16,
    },
    Decode,
    Transport {
        transient: bool,
    },
}

/// Map an SDK failure of `operation` onto [`ProviderError`].
///
/// An error response carries a code. A successful response the SDK could not
/// parse surfaces as a service error without one and becomes
/// [`ProviderError::Decode`].
pub(crate) fn provider_error<E>(operation: &str, err: SdkError<E>) -> ProviderError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    let failure = match &err {
        SdkError::ServiceError(context) => match context.err().code() {
            Some(code) => Failure::Service {
                code: code.to_string(),
                message: context.err().message().unwrap_or_default().to_string(),
                status: context.raw().status().as_u16(),
            },
            None => Failure::Decode,
        },
        SdkError::ResponseError(_) => Failure::Decode,
        SdkError::TimeoutError(_) => Failure::Transport { transient: true },
        SdkError::DispatchFailure(dispatch) => Failure::Transport {
            transient: dispatch.is_timeout() || dispatch.is_io(),
        },
        _ => Failure::Transport { transient: false },
    };

    let operation = operation.to_string();
    match failure {
        Failure::Service {
            code,
            message,
            status,
        } => ProviderError::Service {
            operation,
            code,
            message,
            status,
        },
        Failure::Decode => ProviderError::Decode {
            operation,
            message: DisplayErrorContext(&err).to_string(),
        },
        Failure::Transport { transient } => ProviderError::Transport {
            operation,
            transient,
            source: Box::new(err),
        },
    }
}

/// Reject a response that lacks a member the call cannot do without.
pub(crate) fn missing(operation: &str, member: &str) -> ProviderError {
    ProviderError::Decode {
        operation: operation.to_string(),
        message: format!("response has no {member}"),
    }
}
