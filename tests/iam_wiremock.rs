mod support;

use std::time::Duration;

use anyhow::Result;
use awsudo::aws::{
    AccessKeyStatus, Endpoint, IamClient, IamClientFactory, KeyManager, KeyManagerFactory,
    ProviderError, StaticCredentials,
};
use secrecy::{ExposeSecret, SecretString};
use support::{create_key_body, error_xml, get_user_body, list_keys_body, metadata_only_body, xml};
use wiremock::matchers::{body_string_contains, header_regex, method, path};
use wiremock::{Mock, MockServer};

fn endpoint(server: &MockServer) -> Endpoint {
    Endpoint::new("us-east-1").with_url(server.uri())
}

fn client(server: &MockServer) -> IamClient {
    IamClient::new(
        &endpoint(server),
        &StaticCredentials::new("AKIDEXAMPLE", SecretString::from("secret")),
    )
}

#[tokio::test]
async fn get_user_sends_signed_form_post() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/"))
        .and(header_regex(
            "content-type",
            "^application/x-www-form-urlencoded",
        ))
        .and(header_regex(
            "authorization",
            r"^AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/\d{8}/us-east-1/iam/aws4_request, SignedHeaders=[a-z0-9;-]+, Signature=[0-9a-f]{64}$",
        ))
        .and(body_string_contains("Action=GetUser"))
        .and(body_string_contains("Version=2010-05-08"))
        .respond_with(xml(get_user_body("bob")))
        .expect(1)
        .mount(&server)
        .await;

    let user = client(&server).get_current_user().await?;
    assert_eq!(user, "bob");

    Ok(())
}

#[tokio::test]
async fn list_access_keys_follows_marker() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_string_contains("Action=ListAccessKeys"))
        .and(body_string_contains("Marker=page2"))
        .respond_with(xml(list_keys_body("bob", &[("AK3", "Inactive")], None)))
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(body_string_contains("Action=ListAccessKeys"))
        .and(body_string_contains("UserName=bob"))
        .respond_with(xml(list_keys_body(
            "bob",
            &[("AK1", "Active"), ("AK2", "Inactive")],
            Some("page2"),
        )))
        .expect(1)
        .mount(&server)
        .await;

    let keys = client(&server).list_access_keys("bob").await?;
    let ids: Vec<(&str, AccessKeyStatus)> = keys.iter().map(|k| (k.id.as_str(), k.status)).collect();
    assert_eq!(
        ids,
        vec![
            ("AK1", AccessKeyStatus::Active),
            ("AK2", AccessKeyStatus::Inactive),
            ("AK3", AccessKeyStatus::Inactive),
        ]
    );
    assert!(keys.iter().all(|k| k.user_name == "bob"));

    Ok(())
}

#[tokio::test]
async fn create_update_and_delete_keys() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_string_contains("Action=CreateAccessKey"))
        .and(body_string_contains("UserName=bob"))
        .respond_with(xml(create_key_body("bob", "AK2", "S2")))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(body_string_contains("Action=UpdateAccessKey"))
        .and(body_string_contains("AccessKeyId=AK1"))
        .and(body_string_contains("Status=Inactive"))
        .and(body_string_contains("UserName=bob"))
        .respond_with(xml(metadata_only_body("UpdateAccessKey")))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(body_string_contains("Action=DeleteAccessKey"))
        .and(body_string_contains("AccessKeyId=AK0"))
        .respond_with(xml(metadata_only_body("DeleteAccessKey")))
        .expect(1)
        .mount(&server)
        .await;

    let iam = client(&server);
    let created = iam.create_access_key("bob").await?;
    assert_eq!(created.id, "AK2");
    assert_eq!(created.secret.expose_secret(), "S2");
    assert_eq!(created.user_name, "bob");

    iam.update_access_key_status("AK1", AccessKeyStatus::Inactive, "bob")
        .await?;
    iam.delete_access_key("AK0").await?;

    Ok(())
}

#[tokio::test]
async fn error_document_becomes_service_error() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_string_contains("Action=CreateAccessKey"))
        .respond_with(error_xml(
            409,
            "LimitExceeded",
            "Cannot exceed quota for AccessKeysPerUser: 2",
        ))
        .mount(&server)
        .await;

    let err = client(&server)
        .create_access_key("bob")
        .await
        .unwrap_err();

    assert!(err.is_service_error());
    assert_eq!(err.code(), Some("LimitExceeded"));
    assert_eq!(err.operation(), "CreateAccessKey");
    assert_eq!(
        err.to_string(),
        "An error occurred (LimitExceeded) when calling the CreateAccessKey operation: \
         Cannot exceed quota for AccessKeysPerUser: 2"
    );

    Ok(())
}

#[tokio::test]
async fn malformed_success_body_is_a_decode_error() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_string_contains("Action=GetUser"))
        .respond_with(xml("<GetUserResponse><Nope/></GetUserResponse>".to_string()))
        .mount(&server)
        .await;

    let err = client(&server).get_current_user().await.unwrap_err();
    assert!(!err.is_service_error());
    assert_eq!(err.operation(), "GetUser");

    Ok(())
}

#[tokio::test]
async fn factory_clients_sign_as_the_given_key() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_string_contains("Action=GetUser"))
        .and(header_regex(
            "authorization",
            r"Credential=AKNEW/\d{8}/us-east-1/iam/aws4_request",
        ))
        .respond_with(xml(get_user_body("bob")))
        .expect(1)
        .mount(&server)
        .await;

    let factory = IamClientFactory::new(endpoint(&server));
    let iam = factory.connect(&StaticCredentials::new("AKNEW", SecretString::from("SNEW")))?;
    assert_eq!(iam.get_current_user().await?, "bob");

    Ok(())
}

#[tokio::test]
async fn slow_response_is_a_transient_transport_error() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_string_contains("Action=UpdateAccessKey"))
        .respond_with(
            xml(metadata_only_body("UpdateAccessKey")).set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let iam = IamClient::new(
        &endpoint(&server).with_timeout(Duration::from_millis(200)),
        &StaticCredentials::new("AKNEW", SecretString::from("SNEW")),
    );
    let err = iam
        .update_access_key_status("AK1", AccessKeyStatus::Inactive, "bob")
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::Transport { transient: true, .. }));
    assert!(err.is_retryable());
    assert_eq!(err.operation(), "UpdateAccessKey");

    Ok(())
}
