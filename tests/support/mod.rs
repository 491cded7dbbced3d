#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use awsudo::config::{Config, EndpointsConfig, ResolvedConfig};
use awsudo::retry::RetryPolicy;
use wiremock::ResponseTemplate;

/// Config pointing every endpoint at `server_uri` and both profile files
/// into `dir`.
pub fn config_for(dir: &Path, server_uri: &str) -> ResolvedConfig {
    let config = Config {
        credentials_file: Some(dir.join("credentials")),
        config_file: Some(dir.join("config")),
        endpoints: EndpointsConfig {
            sts: Some(server_uri.to_string()),
            iam: Some(server_uri.to_string()),
            region: "us-east-1".to_string(),
        },
        rotation: RetryPolicy {
            max_total_wait: Duration::from_secs(2),
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(10),
        },
        ..Default::default()
    };
    ResolvedConfig::resolve(config, |_| None)
}

pub fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).expect("write fixture");
    path
}

pub fn xml(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "text/xml")
}

pub fn error_xml(status: u16, code: &str, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_raw(
        format!(
            "<ErrorResponse><Error><Type>Sender</Type><Code>{code}</Code>\
             <Message>{message}</Message></Error>\
             <RequestId>00000000-0000-0000-0000-000000000000</RequestId></ErrorResponse>"
        ),
        "text/xml",
    )
}

pub fn get_user_body(user_name: &str) -> String {
    format!(
        "<GetUserResponse><GetUserResult><User>\
         <UserName>{user_name}</UserName><UserId>AIDAEXAMPLE</UserId>\
         <Arn>arn:aws:iam::123456789012:user/{user_name}</Arn>\
         </User></GetUserResult></GetUserResponse>"
    )
}

pub fn list_keys_body(user_name: &str, keys: &[(&str, &str)], marker: Option<&str>) -> String {
    let members: String = keys
        .iter()
        .map(|(id, status)| {
            format!(
                "<member><UserName>{user_name}</UserName>\
                 <AccessKeyId>{id}</AccessKeyId><Status>{status}</Status></member>"
            )
        })
        .collect();
    let tail = match marker {
        Some(marker) => format!("<IsTruncated>true</IsTruncated><Marker>{marker}</Marker>"),
        None => "<IsTruncated>false</IsTruncated>".to_string(),
    };
    format!(
        "<ListAccessKeysResponse><ListAccessKeysResult>\
         <AccessKeyMetadata>{members}</AccessKeyMetadata>{tail}\
         </ListAccessKeysResult></ListAccessKeysResponse>"
    )
}

pub fn create_key_body(user_name: &str, id: &str, secret: &str) -> String {
    format!(
        "<CreateAccessKeyResponse><CreateAccessKeyResult><AccessKey>\
         <UserName>{user_name}</UserName><AccessKeyId>{id}</AccessKeyId>\
         <Status>Active</Status><SecretAccessKey>{secret}</SecretAccessKey>\
         </AccessKey></CreateAccessKeyResult></CreateAccessKeyResponse>"
    )
}

pub fn metadata_only_body(action: &str) -> String {
    format!(
        "<{action}Response><ResponseMetadata>\
         <RequestId>00000000-0000-0000-0000-000000000000</RequestId>\
         </ResponseMetadata></{action}Response>"
    )
}

pub fn assume_role_body(id: &str, secret: &str, token: &str) -> String {
    format!(
        "<AssumeRoleResponse><AssumeRoleResult>\
         <AssumedRoleUser><Arn>arn:aws:sts::123456789012:assumed-role/test/awsudo</Arn>\
         <AssumedRoleId>AROAEXAMPLE:awsudo</AssumedRoleId></AssumedRoleUser>\
         <Credentials><AccessKeyId>{id}</AccessKeyId>\
         <SecretAccessKey>{secret}</SecretAccessKey>\
         <SessionToken>{token}</SessionToken>\
         <Expiration>2030-01-01T00:00:00Z</Expiration></Credentials>\
         </AssumeRoleResult></AssumeRoleResponse>"
    )
}
