//! Integration tests for the `carehub` CLI binary.
//!
//! Argument parsing, help output, completions and error handling run
//! without a backend; the listing and mutation tests point the binary at
//! a wiremock server.
#![allow(clippy::unwrap_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `carehub` binary with env isolation.
///
/// Clears all `CAREHUB_*` env vars and points config directories at a
/// fresh temp dir so tests never touch the user's real configuration.
fn carehub_cmd(home: &tempfile::TempDir) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("carehub");
    cmd.env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path())
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .env_remove("CAREHUB_PROFILE")
        .env_remove("CAREHUB_API_URL")
        .env_remove("CAREHUB_TOKEN")
        .env_remove("CAREHUB_OUTPUT")
        .env_remove("CAREHUB_INSECURE")
        .env_remove("CAREHUB_TIMEOUT");
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

fn asset(id: u32, name: &str, condition: &str) -> serde_json::Value {
    json!({ "id": id, "name": name, "condition": condition, "categoryId": 1 })
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn no_args_shows_help() {
    let home = tempfile::tempdir().unwrap();
    let output = carehub_cmd(&home).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("Usage"));
}

#[test]
fn help_lists_resources() {
    let home = tempfile::tempdir().unwrap();
    carehub_cmd(&home).arg("--help").assert().success().stdout(
        predicate::str::contains("residents")
            .and(predicate::str::contains("assets"))
            .and(predicate::str::contains("inventory"))
            .and(predicate::str::contains("config")),
    );
}

#[test]
fn version_flag() {
    let home = tempfile::tempdir().unwrap();
    carehub_cmd(&home)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("carehub"));
}

#[test]
fn completions_zsh() {
    let home = tempfile::tempdir().unwrap();
    carehub_cmd(&home)
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

#[test]
fn resource_subcommands_exist() {
    let home = tempfile::tempdir().unwrap();
    carehub_cmd(&home)
        .args(["assets", "--help"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("list")
                .and(predicate::str::contains("get"))
                .and(predicate::str::contains("create"))
                .and(predicate::str::contains("update"))
                .and(predicate::str::contains("delete")),
        );
}

// ── Error cases ─────────────────────────────────────────────────────

#[test]
fn list_without_config_points_at_init() {
    let home = tempfile::tempdir().unwrap();
    carehub_cmd(&home)
        .args(["residents", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("config init").or(predicate::str::contains("Configuration")));
}

#[test]
fn filters_are_mutually_exclusive() {
    let home = tempfile::tempdir().unwrap();
    let output = carehub_cmd(&home)
        .args(["assets", "list", "--category", "1", "--search", "hoist"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("cannot be used with"));
}

#[test]
fn unknown_condition_is_rejected() {
    let home = tempfile::tempdir().unwrap();
    let output = carehub_cmd(&home)
        .args(["assets", "list", "--condition", "sparkly"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn create_requires_a_body() {
    let home = tempfile::tempdir().unwrap();
    let output = carehub_cmd(&home).args(["assets", "create"]).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn unknown_profile_is_reported() {
    let home = tempfile::tempdir().unwrap();
    carehub_cmd(&home)
        .args(["--profile", "nowhere", "guardians", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nowhere"));
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn config_show_without_file_renders_defaults() {
    let home = tempfile::tempdir().unwrap();
    carehub_cmd(&home)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("page_size = 10"));
}

#[test]
fn config_set_then_profiles() {
    let home = tempfile::tempdir().unwrap();
    carehub_cmd(&home)
        .args(["config", "set", "api_url", "https://care.example.org/api"])
        .assert()
        .success();
    carehub_cmd(&home)
        .args(["config", "profiles"])
        .assert()
        .success()
        .stdout(predicate::str::contains("default *"));
    carehub_cmd(&home)
        .args(["-o", "json", "config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("https://care.example.org/api"));
}

// ── Against a backend ───────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn list_clamps_page_and_prints_rows() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/Asset"))
        .and(query_param("pageNumber", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [asset(11, "Walker", "Good"), asset(12, "Bed", "Poor")],
            "totalRecords": 12,
            "pageNumber": 3,
            "pageSize": 5
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/Asset"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [],
            "totalRecords": 12,
            "pageNumber": 9,
            "pageSize": 5
        })))
        .mount(&server)
        .await;

    let home = tempfile::tempdir().unwrap();
    let url = format!("{}/api", server.uri());
    let output = carehub_cmd(&home)
        .args(["--api-url", &url, "--token", "t0k", "assets", "list", "--page", "9", "--page-size", "5"])
        .output()
        .unwrap();

    assert!(output.status.success(), "{}", combined_output(&output));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Walker"), "{stdout}");
    assert!(stdout.contains("Poor (!)"), "{stdout}");
    assert!(String::from_utf8_lossy(&output.stderr).contains("Page 3 of 3 (12 records)"));
}

#[tokio::test(flavor = "multi_thread")]
async fn plain_output_lists_ids_for_condition_filter() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/Asset"))
        .and(query_param("condition", "Poor"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([asset(5, "Hoist", "Poor")])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/Asset"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let home = tempfile::tempdir().unwrap();
    let url = format!("{}/api", server.uri());
    carehub_cmd(&home)
        .args(["-u", &url, "--token", "t0k", "-o", "plain", "assets", "list", "--condition", "poor"])
        .assert()
        .success()
        .stdout(predicate::str::diff("5\n"));
}

#[tokio::test(flavor = "multi_thread")]
async fn filtered_list_sends_one_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/Asset"))
        .and(query_param("categoryId", "2"))
        .and(query_param("pageNumber", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [asset(12, "Bed", "Good")],
            "totalRecords": 6,
            "pageNumber": 2,
            "pageSize": 5
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/Asset"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let home = tempfile::tempdir().unwrap();
    let url = format!("{}/api", server.uri());
    carehub_cmd(&home)
        .args(["-u", &url, "--token", "t0k", "-o", "plain", "assets", "list", "--category", "2", "--page", "2", "-l", "5"])
        .assert()
        .success()
        .stdout(predicate::str::diff("12\n"));
}

#[tokio::test(flavor = "multi_thread")]
async fn delete_conflict_exits_with_conflict_code() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/AssetCategory/2"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({ "message": "FK violation" })))
        .mount(&server)
        .await;

    let home = tempfile::tempdir().unwrap();
    let url = format!("{}/api", server.uri());
    let output = carehub_cmd(&home)
        .args(["-u", &url, "--token", "t0k", "--yes", "categories", "delete", "2"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(6));
    assert!(combined_output(&output).contains("Category is already in use and cannot be deleted"));
}

#[tokio::test(flavor = "multi_thread")]
async fn create_echoes_notification_and_record() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/Guardian"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 9,
            "fullName": "Ada Byron",
            "relationship": "Daughter"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let home = tempfile::tempdir().unwrap();
    let url = format!("{}/api", server.uri());
    let output = carehub_cmd(&home)
        .args([
            "-u",
            &url,
            "--token",
            "t0k",
            "guardians",
            "create",
            "--data",
            r#"{"fullName": "Ada Byron"}"#,
        ])
        .output()
        .unwrap();

    assert!(output.status.success(), "{}", combined_output(&output));
    assert!(String::from_utf8_lossy(&output.stdout).contains("Ada Byron"));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Guardian created successfully"));
}

#[tokio::test(flavor = "multi_thread")]
async fn update_answered_with_no_content_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/api/Asset/4"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let home = tempfile::tempdir().unwrap();
    let url = format!("{}/api", server.uri());
    carehub_cmd(&home)
        .args(["-u", &url, "--token", "t0k", "assets", "update", "4", "--data", r#"{"condition": "Fair"}"#])
        .assert()
        .success()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Asset updated successfully"));
}

#[tokio::test(flavor = "multi_thread")]
async fn unrecognized_body_is_not_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/Resident"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "unexpected": true })))
        .mount(&server)
        .await;

    let home = tempfile::tempdir().unwrap();
    let url = format!("{}/api", server.uri());
    carehub_cmd(&home)
        .args(["-u", &url, "--token", "t0k", "residents", "list"])
        .assert()
        .success()
        .stderr(predicate::str::contains("not recognized"));
}
