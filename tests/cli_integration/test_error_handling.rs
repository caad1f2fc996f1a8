//! Integration tests for CLI error handling
//!
//! Tests:
//! - Invalid replication flags and missing parameters
//! - Malformed and missing input files
//! - Backend failures stop the run at the failing record

use serde_json::json;
use wiremock::MockServer;

use super::support::{
    base_args, mount_add_version, mount_add_version_status, mount_create_secret,
    mount_missing_secret, received, run_cli_command, with_args, TempSecretsFile, PROJECT, TOKEN,
};

#[tokio::test]
async fn test_conflicting_replication_flags() {
    let server = MockServer::start().await;
    let file = TempSecretsFile::new("name,value\ndb-password,s3cr3t\n");

    let args =
        with_args(base_args(&server, &file), &["--global", "--secrets-location", "us-east1"]);
    let output = run_cli_command(&args).await;

    assert!(!output.success, "Should fail when both replication flags are given");
    assert!(
        output.combined().contains("either --global or --secrets-location must be provided"),
        "Error should explain the replication mode: {}",
        output.combined()
    );
    assert!(received(&server).await.is_empty());
}

#[tokio::test]
async fn test_missing_replication_flags() {
    let server = MockServer::start().await;
    let file = TempSecretsFile::new("name,value\ndb-password,s3cr3t\n");

    let output = run_cli_command(&base_args(&server, &file)).await;

    assert!(!output.success);
    assert!(output.combined().contains("but not both"));
    assert!(received(&server).await.is_empty());
}

#[tokio::test]
async fn test_missing_project_id() {
    let server = MockServer::start().await;
    let file = TempSecretsFile::new("name,value\ndb-password,s3cr3t\n");

    let args = vec![
        "--secrets-file".to_string(),
        file.path_str(),
        "--global".to_string(),
        "--endpoint".to_string(),
        server.uri(),
        "--access-token".to_string(),
        TOKEN.to_string(),
    ];
    let output = run_cli_command(&args).await;

    assert!(!output.success);
    assert!(
        output.combined().contains("project-id is required"),
        "Error should name the missing flag: {}",
        output.combined()
    );
}

#[tokio::test]
async fn test_missing_access_token() {
    let server = MockServer::start().await;
    let file = TempSecretsFile::new("name,value\ndb-password,s3cr3t\n");

    let args = vec![
        "--project-id".to_string(),
        PROJECT.to_string(),
        "--secrets-file".to_string(),
        file.path_str(),
        "--global".to_string(),
        "--endpoint".to_string(),
        server.uri(),
    ];
    let output = run_cli_command(&args).await;

    assert!(!output.success, "Should fail without credentials");
    assert!(received(&server).await.is_empty());
}

#[tokio::test]
async fn test_malformed_header_makes_no_backend_calls() {
    let server = MockServer::start().await;
    let file = TempSecretsFile::new("key,val\ndb-password,s3cr3t\n");

    let output = run_cli_command(&with_args(base_args(&server, &file), &["--global"])).await;

    assert!(!output.success);
    assert!(
        output.combined().contains("CSV header must be 'name,value'"),
        "Error should describe the header: {}",
        output.combined()
    );
    assert!(received(&server).await.is_empty());
}

#[tokio::test]
async fn test_wrong_field_count_names_the_line() {
    let server = MockServer::start().await;
    let file = TempSecretsFile::new("name,value\ndb-password,s3cr3t\napi-key\n");

    let output = run_cli_command(&with_args(base_args(&server, &file), &["--global"])).await;

    assert!(!output.success);
    let combined = output.combined();
    assert!(combined.contains("line 3"), "Error should name the line: {}", combined);
    assert!(received(&server).await.is_empty());
}

#[tokio::test]
async fn test_missing_secrets_file() {
    let server = MockServer::start().await;
    let args = vec![
        "--project-id".to_string(),
        PROJECT.to_string(),
        "--secrets-file".to_string(),
        "/nonexistent/secrets.csv".to_string(),
        "--global".to_string(),
        "--endpoint".to_string(),
        server.uri(),
        "--access-token".to_string(),
        TOKEN.to_string(),
    ];
    let output = run_cli_command(&args).await;

    assert!(!output.success);
    assert!(output.combined().contains("unable to open file"));
    assert!(received(&server).await.is_empty());
}

#[tokio::test]
async fn test_append_failure_stops_the_run() {
    let server = MockServer::start().await;
    mount_missing_secret(&server, "db-password").await;
    mount_create_secret(&server, "db-password", json!({"automatic": {}})).await;
    mount_add_version(&server, "db-password").await;
    mount_missing_secret(&server, "api-key").await;
    mount_create_secret(&server, "api-key", json!({"automatic": {}})).await;
    mount_add_version_status(&server, "api-key", 500).await;

    let file =
        TempSecretsFile::new("name,value\ndb-password,s3cr3t\napi-key,abc123\nnever-reached,x\n");
    let output = run_cli_command(&with_args(base_args(&server, &file), &["--global"])).await;

    assert!(!output.success, "Backend failure should fail the run");
    let combined = output.combined();
    assert!(combined.contains("api-key"), "Error should name the secret: {}", combined);
    assert!(combined.contains("append version"), "Error should name the step: {}", combined);
    assert!(!combined.contains("Successfully uploaded all secrets"));

    let requests = received(&server).await;
    assert_eq!(requests.len(), 6);
    assert!(requests.iter().all(|r| !r.contains("never-reached")));
}
