//! Integration tests for successful CLI runs
//!
//! Tests:
//! - User-managed and automatic replication on fresh secrets
//! - Existing secrets only receive a new version
//! - A concurrent create (409) is tolerated
//! - Secret values never appear in the log output
//! - Names with reserved URL characters stay in their own resource path

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::support::{
    base_args, mount_add_version, mount_create_secret, mount_create_status,
    mount_existing_secret, mount_missing_secret, received, run_cli_command, with_args,
    TempSecretsFile, PROJECT,
};

/// `name` is absent at its percent-encoded path and the backend rejects creating it
async fn mount_rejected_name(server: &MockServer, name: &str, encoded: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/projects/{}/secrets/{}", PROJECT, encoded)))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/projects/{}/secrets", PROJECT)))
        .and(query_param("secretId", name))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {"code": 400, "message": "invalid secret id", "status": "INVALID_ARGUMENT"}
        })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_provisions_new_secrets_with_user_managed_replication() {
    let server = MockServer::start().await;
    let replication = json!({"userManaged": {"replicas": [{"location": "us-east1"}]}});
    for name in ["db-password", "api-key"] {
        mount_missing_secret(&server, name).await;
        mount_create_secret(&server, name, replication.clone()).await;
        mount_add_version(&server, name).await;
    }

    let file = TempSecretsFile::new("name,value\ndb-password,s3cr3t\napi-key,abc123\n");
    let args = with_args(base_args(&server, &file), &["--secrets-location", "us-east1"]);
    let output = run_cli_command(&args).await;

    assert!(output.success, "CLI should succeed: {}", output.combined());
    assert!(output.stdout.contains("Successfully uploaded all secrets"));
    assert!(output.stdout.contains("\"count\":2"));

    let secrets = format!("/projects/{}/secrets", PROJECT);
    assert_eq!(
        received(&server).await,
        vec![
            format!("GET {}/db-password", secrets),
            format!("POST {}", secrets),
            format!("POST {}/db-password:addVersion", secrets),
            format!("GET {}/api-key", secrets),
            format!("POST {}", secrets),
            format!("POST {}/api-key:addVersion", secrets),
        ]
    );
}

#[tokio::test]
async fn test_global_flag_creates_automatic_secret() {
    let server = MockServer::start().await;
    mount_missing_secret(&server, "db-password").await;
    mount_create_secret(&server, "db-password", json!({"automatic": {}})).await;
    mount_add_version(&server, "db-password").await;

    let file = TempSecretsFile::new("name,value\ndb-password,s3cr3t\n");
    let output = run_cli_command(&with_args(base_args(&server, &file), &["--global"])).await;

    assert!(output.success, "CLI should succeed: {}", output.combined());
    assert!(output.stdout.contains("\"count\":1"));
}

#[tokio::test]
async fn test_existing_secret_only_gets_new_version() {
    let server = MockServer::start().await;
    mount_existing_secret(&server, "db-password").await;
    mount_add_version(&server, "db-password").await;

    let file = TempSecretsFile::new("name,value\ndb-password,rotated\n");
    let args =
        with_args(base_args(&server, &file), &["--secrets-location", "us-east1,europe-west1"]);
    let output = run_cli_command(&args).await;

    assert!(output.success, "CLI should succeed: {}", output.combined());

    let requests = received(&server).await;
    assert_eq!(requests.len(), 2);
    assert!(requests.iter().all(|r| r != &format!("POST /projects/{}/secrets", PROJECT)));
    assert!(output.stdout.contains("\"reused\":1"));
}

#[tokio::test]
async fn test_concurrent_create_is_tolerated() {
    let server = MockServer::start().await;
    mount_missing_secret(&server, "db-password").await;
    mount_create_status(&server, "db-password", 409).await;
    mount_add_version(&server, "db-password").await;

    let file = TempSecretsFile::new("name,value\ndb-password,s3cr3t\n");
    let output = run_cli_command(&with_args(base_args(&server, &file), &["--global"])).await;

    assert!(output.success, "409 on create should not fail the run: {}", output.combined());
    assert_eq!(received(&server).await.len(), 3);
}

#[tokio::test]
async fn test_secret_values_are_not_logged() {
    let server = MockServer::start().await;
    mount_missing_secret(&server, "db-password").await;
    mount_create_secret(&server, "db-password", json!({"automatic": {}})).await;
    mount_add_version(&server, "db-password").await;

    let file = TempSecretsFile::new("name,value\ndb-password,hunter2-very-secret\n");
    let args = with_args(base_args(&server, &file), &["--global", "-v"]);
    let output = run_cli_command(&args).await;

    assert!(output.success, "CLI should succeed: {}", output.combined());
    assert!(output.stdout.contains("db-password"));
    assert!(!output.combined().contains("hunter2-very-secret"));
    assert!(!output.combined().contains("integration-token"));
}

#[tokio::test]
async fn test_reserved_url_characters_never_reach_another_secret() {
    for (name, encoded) in [
        ("victim#frag", "victim%23frag"),
        ("victim?x=1", "victim%3Fx=1"),
        ("other/../victim", "other%2F..%2Fvictim"),
    ] {
        let server = MockServer::start().await;
        mount_existing_secret(&server, "victim").await;
        mount_add_version(&server, "victim").await;
        mount_rejected_name(&server, name, encoded).await;

        let file = TempSecretsFile::new(&format!("name,value\n{},payload\n", name));
        let output = run_cli_command(&with_args(base_args(&server, &file), &["--global"])).await;

        assert!(!output.success, "{} should be rejected by the backend", name);
        let victim = format!("/projects/{}/secrets/victim", PROJECT);
        let requests = received(&server).await;
        assert!(
            requests.iter().all(|r| !r.ends_with(&victim) && !r.contains("victim:addVersion")),
            "{} touched the existing secret: {:?}",
            name,
            requests
        );
    }
}
