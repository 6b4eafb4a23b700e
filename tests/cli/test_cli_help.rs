use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn superplane() -> Command {
    let mut cmd = Command::cargo_bin("superplane-integrations").unwrap();
    cmd.env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_help_lists_catalog_commands() {
    superplane()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("CATALOG COMMANDS"))
        .stdout(predicate::str::contains("list"))
        .stdout(predicate::str::contains("setup"))
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("sync"))
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("--workspace"));
}

#[test]
fn test_run_help_shows_config_and_input() {
    superplane()
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--config"))
        .stdout(predicate::str::contains("--input"))
        .stdout(predicate::str::contains("aws.ecs.describeTask"));
}

#[test]
fn test_serve_help_mentions_webhook_route() {
    superplane()
        .args(["serve", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("/v1/webhooks/<trigger>"))
        .stdout(predicate::str::contains("--bind"));
}

#[test]
fn test_list_with_empty_workspace() {
    let workspace = TempDir::new().unwrap();
    superplane()
        .args(["list", "--workspace"])
        .arg(workspace.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("No integrations configured"));
}

#[test]
fn test_list_json_reports_configured_catalog() {
    let workspace = TempDir::new().unwrap();
    fs::write(
        workspace.path().join("superplane.toml"),
        "[cloudflare]\napi_token = \"cf-token\"\n",
    )
    .unwrap();

    let output = superplane()
        .args(["list", "--json", "--workspace"])
        .arg(workspace.path())
        .output()
        .unwrap();
    assert!(output.status.success());

    let catalog: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(catalog["integrations"][0]["name"], "cloudflare");
    let components: Vec<&str> = catalog["components"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|component| component["name"].as_str())
        .collect();
    assert!(components.contains(&"cloudflare.createDnsRecord"));
    assert!(catalog["triggers"].as_array().unwrap().is_empty());
}

#[test]
fn test_setup_reports_invalid_configuration() {
    let workspace = TempDir::new().unwrap();
    fs::write(
        workspace.path().join("superplane.toml"),
        "[cloudflare]\napi_token = \"cf-token\"\n",
    )
    .unwrap();

    superplane()
        .args(["setup", "cloudflare.deleteDnsRecord", "--config", r#"{"zoneId": "z"}"#])
        .arg("--workspace")
        .arg(workspace.path())
        .assert()
        .failure();

    superplane()
        .args([
            "setup",
            "cloudflare.deleteDnsRecord",
            "--config",
            r#"{"zoneId": "z", "recordId": "r"}"#,
        ])
        .arg("--workspace")
        .arg(workspace.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("configuration is valid"));
}

#[test]
fn test_unknown_component_fails() {
    let workspace = TempDir::new().unwrap();
    superplane()
        .args(["run", "nope.component", "--config", "{}", "--workspace"])
        .arg(workspace.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown component: nope.component"));
}
