mod support;

use anyhow::Result;
use awsudo::app::sudo::resolve_environment;
use awsudo::aws::{Endpoint, RoleAssumer, StaticCredentials, StsClient};
use awsudo::profile::RoleConfig;
use awsudo::resolver::{
    ENV_ACCESS_KEY_ID, ENV_DEFAULT_REGION, ENV_SECRET_ACCESS_KEY, ENV_SECURITY_TOKEN,
    ENV_SESSION_TOKEN,
};
use secrecy::{ExposeSecret, SecretString};
use support::{assume_role_body, config_for, error_xml, write, xml};
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, header_regex, method};
use wiremock::{Mock, MockServer};

const CREDENTIALS: &str = "\
[default]
aws_access_key_id = AKSOURCE
aws_secret_access_key = SSOURCE
";

const CONFIG: &str = "\
[default]
region = us-west-2

[profile deploy]
role_arn = arn:aws:iam::123456789012:role/deploy
source_profile = default
region = eu-west-1
external_id = shared-secret
role_session_name = ci-run
duration_seconds = 900

[profile plain]
role_arn = arn:aws:iam::123456789012:role/plain
";

#[tokio::test]
async fn assume_role_sends_optional_parameters() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_string_contains("Action=AssumeRole"))
        .and(body_string_contains("Version=2011-06-15"))
        .and(body_string_contains(
            "RoleArn=arn%3Aaws%3Aiam%3A%3A123456789012%3Arole%2Fdeploy",
        ))
        .and(body_string_contains("RoleSessionName=ci-run"))
        .and(body_string_contains("ExternalId=shared-secret"))
        .and(body_string_contains("DurationSeconds=900"))
        .and(header_regex("authorization", r"Credential=AKSOURCE/\d{8}/us-east-1/sts/aws4_request"))
        .respond_with(xml(assume_role_body("ASIATEMP", "STEMP", "TOKEN")))
        .expect(1)
        .mount(&server)
        .await;

    let sts = StsClient::new(Endpoint::new("us-east-1").with_url(server.uri()));
    let role = RoleConfig {
        external_id: Some("shared-secret".to_string()),
        session_name: Some("ci-run".to_string()),
        duration_seconds: Some(900),
        ..RoleConfig::new("arn:aws:iam::123456789012:role/deploy")
    };

    let creds = sts
        .assume_role(
            &StaticCredentials::new("AKSOURCE", SecretString::from("SSOURCE")),
            &role,
        )
        .await?;

    assert_eq!(creds.access_key_id, "ASIATEMP");
    assert_eq!(creds.secret_access_key.expose_secret(), "STEMP");
    assert_eq!(creds.session_token.expose_secret(), "TOKEN");
    assert_eq!(
        creds.expiration.map(|at| at.to_rfc3339()),
        Some("2030-01-01T00:00:00+00:00".to_string())
    );

    Ok(())
}

#[tokio::test]
async fn resolves_role_profile_from_files() -> Result<()> {
    let server = MockServer::start().await;
    let dir = TempDir::new()?;
    write(dir.path(), "credentials", CREDENTIALS);
    write(dir.path(), "config", CONFIG);

    Mock::given(method("POST"))
        .and(body_string_contains("Action=AssumeRole"))
        .and(body_string_contains("RoleSessionName=awsudo-"))
        .respond_with(xml(assume_role_body("ASIATEMP", "STEMP", "TOKEN")))
        .expect(1)
        .mount(&server)
        .await;

    let config = config_for(dir.path(), &server.uri());
    let env = resolve_environment(&config, Some("plain")).await?;

    assert_eq!(env.get(ENV_ACCESS_KEY_ID), Some("ASIATEMP"));
    assert_eq!(env.get(ENV_SECRET_ACCESS_KEY), Some("STEMP"));
    assert_eq!(env.get(ENV_SESSION_TOKEN), Some("TOKEN"));
    assert_eq!(env.get(ENV_SECURITY_TOKEN), Some("TOKEN"));
    // Not inherited from [default].
    assert_eq!(env.get(ENV_DEFAULT_REGION), None);

    Ok(())
}

#[tokio::test]
async fn static_profile_needs_no_network() -> Result<()> {
    let server = MockServer::start().await;
    let dir = TempDir::new()?;
    write(dir.path(), "credentials", CREDENTIALS);
    write(dir.path(), "config", CONFIG);

    let config = config_for(dir.path(), &server.uri());
    let env = resolve_environment(&config, None).await?;

    assert_eq!(env.get(ENV_ACCESS_KEY_ID), Some("AKSOURCE"));
    assert_eq!(env.get(ENV_DEFAULT_REGION), Some("us-west-2"));
    assert_eq!(env.get(ENV_SESSION_TOKEN), None);
    assert!(server.received_requests().await.unwrap_or_default().is_empty());

    Ok(())
}

#[tokio::test]
async fn invalid_source_key_suggests_checking_credentials_file() -> Result<()> {
    let server = MockServer::start().await;
    let dir = TempDir::new()?;
    let credentials = write(dir.path(), "credentials", CREDENTIALS);
    write(dir.path(), "config", CONFIG);

    Mock::given(method("POST"))
        .and(body_string_contains("Action=AssumeRole"))
        .respond_with(error_xml(
            403,
            "InvalidClientTokenId",
            "The security token included in the request is invalid.",
        ))
        .mount(&server)
        .await;

    let config = config_for(dir.path(), &server.uri());
    let err = resolve_environment(&config, Some("deploy"))
        .await
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        format!(
            "An error occurred (InvalidClientTokenId) when calling the AssumeRole operation: \
             The security token included in the request is invalid.\n\n\
             Are the credentials in {} valid?",
            credentials.display()
        )
    );

    Ok(())
}

#[tokio::test]
async fn unknown_profile_is_reported() -> Result<()> {
    let dir = TempDir::new()?;
    write(dir.path(), "credentials", CREDENTIALS);

    let config = config_for(dir.path(), "http://127.0.0.1:9");
    let err = resolve_environment(&config, Some("ghost")).await.unwrap_err();
    assert_eq!(format!("{err:#}"), "The config profile (ghost) could not be found");

    Ok(())
}
