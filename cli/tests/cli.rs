#![allow(clippy::unwrap_used, clippy::expect_used)]
//! End-to-end runs of the `taiga-stats` binary against a mock tracker.

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::TempDir;
use wiremock::Mock;
use wiremock::MockServer;
use wiremock::ResponseTemplate;
use wiremock::matchers::method;
use wiremock::matchers::path;

async fn tracker() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/userstory-statuses"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 2, "name": "Done", "order": 2, "is_closed": true},
            {"id": 1, "name": "New", "order": 1, "is_closed": false}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/userstories"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 100, "ref": 1, "subject": "Checkout \"v2\"", "status": 1,
             "is_closed": false, "total_points": 3.0, "tags": [["ui", null]]},
            {"id": 200, "ref": 2, "subject": "Cart", "status": 2,
             "is_closed": true, "total_points": null, "tags": []}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/projects/5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 5, "name": "Shop", "slug": "ann-shop"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/userstories/custom-attributes-values/100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "attributes_values": {"7": "#2"}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/userstories/custom-attributes-values/200"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "attributes_values": {}
        })))
        .mount(&server)
        .await;
    server
}

async fn mount_attributes(server: &MockServer, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/api/v1/userstory-custom-attributes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

fn taiga_stats(server: &MockServer, dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("taiga-stats").unwrap();
    cmd.env("TAIGA_STATS_CONFIG", dir.join("config.toml"))
        .env_remove("RUST_LOG")
        .args(["--url", &server.uri(), "--project-id", "5"])
        .arg("--output-dir")
        .arg(dir);
    cmd
}

#[tokio::test(flavor = "multi_thread")]
async fn store_daily_appends_counts_under_the_header() {
    let server = tracker().await;
    let tmp = TempDir::new().unwrap();

    taiga_stats(&server, tmp.path())
        .args(["store-daily", "--date", "2024-01-01"])
        .assert()
        .success();
    taiga_stats(&server, tmp.path())
        .args(["store-daily", "--date", "2024-01-02", "--tag", "ui"])
        .assert()
        .success();

    let all = std::fs::read_to_string(tmp.path().join("cfd_all.dat")).unwrap();
    assert_eq!(
        all,
        "#date\tannotation\tannotation_layer\tNew\tDone\n2024-01-01\tNONE\t0\t1\t1\n"
    );
    let ui = std::fs::read_to_string(tmp.path().join("cfd_tag_ui.dat")).unwrap();
    assert_eq!(
        ui,
        "#date\tannotation\tannotation_layer\tNew\tDone\n2024-01-02\tNONE\t0\t1\t0\n"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn store_daily_with_unmatched_tag_writes_nothing() {
    let server = tracker().await;
    let tmp = TempDir::new().unwrap();

    taiga_stats(&server, tmp.path())
        .args(["store-daily", "--tag", "*", "--tag", "nobody-uses-this"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no items match tag filter nobody-uses-this"));

    assert!(!tmp.path().join("cfd_all.dat").exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn cfd_renders_chart_next_to_data() {
    let server = tracker().await;
    let tmp = TempDir::new().unwrap();
    std::fs::write(
        tmp.path().join("cfd_all.dat"),
        "#date\tannotation\tannotation_layer\tNew\tDone\n\
         2024-01-01\tNONE\t0\t2\t0\n\
         2024-01-02\tRelease\t0\t1\t1\n",
    )
    .unwrap();

    taiga_stats(&server, tmp.path())
        .args(["cfd", "--annotations", "--target-date", "2024-01-05"])
        .assert()
        .success()
        .stdout(predicate::str::contains("cfd_all.svg"));

    let svg = std::fs::read_to_string(tmp.path().join("cfd_all.svg")).unwrap();
    assert!(svg.starts_with("<svg"));
    assert!(svg.contains("Release"));
    assert!(svg.contains("ideal-pace"));
    assert!(svg.contains("pace-extension"));
}

#[tokio::test(flavor = "multi_thread")]
async fn cfd_unknown_status_fails_before_reading_data() {
    let server = tracker().await;
    let tmp = TempDir::new().unwrap();

    // No data file exists: the status check must fail first.
    taiga_stats(&server, tmp.path())
        .args(["cfd", "--status-ids", "1,9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown status id 9"));

    assert!(!tmp.path().join("cfd_all.svg").exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn cfd_rejects_out_of_range_target_layer() {
    let server = tracker().await;
    let tmp = TempDir::new().unwrap();
    std::fs::write(
        tmp.path().join("cfd_all.dat"),
        "#date\tannotation\tannotation_layer\tNew\tDone\n2024-01-01\tNONE\t0\t2\t0\n",
    )
    .unwrap();

    taiga_stats(&server, tmp.path())
        .args(["cfd", "--target-date", "2024-02-01", "--target-layer", "2"])
        .assert()
        .failure();

    assert!(!tmp.path().join("cfd_all.svg").exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn deps_prints_sorted_dot() {
    let server = tracker().await;
    mount_attributes(&server, json!([{"id": 7, "name": "Depends On"}])).await;
    let tmp = TempDir::new().unwrap();

    let output = taiga_stats(&server, tmp.path())
        .args(["deps", "--include-points"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let dot = String::from_utf8(output).unwrap();

    assert!(dot.starts_with("digraph \"Shop dependencies\" {"));
    assert!(dot.contains("    \"2\" -> \"1\"\n"));
    assert!(dot.contains(r##""1" [label="#1 Checkout v2\nPoints: 3", color="black"]"##));
    assert!(dot.contains(r##""2" [label="#2 Cart\nPoints: -", color="green"]"##));
}

#[tokio::test(flavor = "multi_thread")]
async fn deps_without_dependency_attribute_fails() {
    let server = tracker().await;
    mount_attributes(&server, json!([{"id": 3, "name": "Due"}])).await;
    let tmp = TempDir::new().unwrap();
    let out = tmp.path().join("deps.dot");

    taiga_stats(&server, tmp.path())
        .args(["deps", "--output"])
        .arg(&out)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Depends On"));

    assert!(!out.exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn list_statuses_in_ascending_order() {
    let server = tracker().await;
    let tmp = TempDir::new().unwrap();

    taiga_stats(&server, tmp.path())
        .arg("list-statuses")
        .assert()
        .success()
        .stdout("1\t1\tNew\n2\t2\tDone\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn config_persists_flags() {
    let server = tracker().await;
    let tmp = TempDir::new().unwrap();

    taiga_stats(&server, tmp.path())
        .arg("config")
        .assert()
        .success();

    let saved = std::fs::read_to_string(tmp.path().join("config.toml")).unwrap();
    assert!(saved.contains("project_id = 5"));
    assert!(saved.contains(&server.uri()));

    // Later runs pick the project up from the file.
    Command::cargo_bin("taiga-stats")
        .unwrap()
        .env("TAIGA_STATS_CONFIG", tmp.path().join("config.toml"))
        .arg("list-statuses")
        .assert()
        .success()
        .stdout(predicate::str::contains("Done"));
}
