//! CLI integration tests using assert_cmd.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{json, Value};
use tempfile::TempDir;

const DAY_MS: i64 = 86_400_000;

fn skillscope() -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("skillscope").unwrap();
    cmd.env_remove("SKILLSCOPE_DATA_DIR")
        .env_remove("SKILLSCOPE_LADDER_URL");
    cmd
}

/// A temp dir with a config pointing its data dir inside it.
fn workspace(extra: &str) -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("skillscope.toml");
    let data_dir = dir.path().join("data");
    std::fs::write(
        &config,
        format!("data_dir = {:?}\n{extra}", data_dir.display().to_string()),
    )
    .unwrap();
    (dir, config)
}

fn days_ago(days: i64) -> i64 {
    chrono::Utc::now().timestamp_millis() - days * DAY_MS
}

fn record(config: &Path, event: Value) {
    skillscope()
        .arg("--config")
        .arg(config)
        .arg("record")
        .arg("--event")
        .arg(event.to_string())
        .assert()
        .success();
}

fn json_output(config: &Path, args: &[&str]) -> Value {
    let output = skillscope()
        .arg("--config")
        .arg(config)
        .arg("--format")
        .arg("json")
        .args(args)
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    serde_json::from_slice(&output.stdout).unwrap()
}

fn seed_growth(config: &Path, student: &str, series: &[(i64, f64)]) {
    let events: Vec<Value> = series
        .iter()
        .map(|(days, acc)| {
            json!({
                "studentId": student,
                "targets": ["LIT.DEC.SYL"],
                "timestamp": days_ago(*days),
                "result": { "accuracy": acc },
                "confidence": 0.7
            })
        })
        .collect();
    record(config, Value::Array(events));
}

#[test]
fn record_and_snapshot() {
    let (_dir, config) = workspace("");
    record(
        &config,
        json!({
            "studentId": "stu-1",
            "module": "Word Quest",
            "targets": ["LIT.DEC.SYL", " LIT.DEC.SYL ", "LIT.FLU.ACC"],
            "tier": "t3",
            "result": { "accuracy": "0.8" }
        }),
    );

    let snapshot = json_output(&config, &["snapshot", "--student", "stu-1"]);
    assert_eq!(snapshot["studentId"], "stu-1");
    let skills = snapshot["skills"].as_object().unwrap();
    assert_eq!(skills.len(), 2);
    assert_eq!(skills["LIT.DEC.SYL"]["n"], 1);
    assert_eq!(skills["LIT.DEC.SYL"]["tier"], "T3");
    assert_eq!(skills["LIT.DEC.SYL"]["rawMastery"], 0.8);
}

#[test]
fn record_reports_rejections() {
    let (_dir, config) = workspace("");
    skillscope()
        .arg("--config")
        .arg(&config)
        .arg("record")
        .arg("--event")
        .arg(r#"[{"studentId":"","targets":["A"]},{"studentId":"s","targets":["A"]}]"#)
        .assert()
        .success()
        .stdout(predicate::str::contains("#0 rejected"))
        .stdout(predicate::str::contains("#1 recorded"));
}

#[test]
fn record_batch_survives_wrongly_typed_entries() {
    let (_dir, config) = workspace("");
    skillscope()
        .arg("--config")
        .arg(&config)
        .arg("record")
        .arg("--event")
        .arg(r#"[{"studentId":42,"targets":["A"]},7,{"studentId":"s","targets":["A",3],"tier":3}]"#)
        .assert()
        .success()
        .stdout(predicate::str::contains("#0 rejected"))
        .stdout(predicate::str::contains("#1 rejected"))
        .stdout(predicate::str::contains("#2 recorded: s -> A (wordquest, T2)"));
}

#[test]
fn record_from_file() {
    let (dir, config) = workspace("");
    let event_file = dir.path().join("event.json");
    std::fs::write(&event_file, r#"{"studentId":"file-stu","targets":["A"]}"#).unwrap();

    skillscope()
        .arg("--config")
        .arg(&config)
        .arg("record")
        .arg("--event")
        .arg(format!("@{}", event_file.display()))
        .assert()
        .success()
        .stdout(predicate::str::contains("file-stu"));
}

#[test]
fn record_malformed_json() {
    let (_dir, config) = workspace("");
    skillscope()
        .arg("--config")
        .arg(&config)
        .arg("record")
        .arg("--event")
        .arg("{oops")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"))
        .stderr(predicate::str::contains("not valid JSON"));
}

#[test]
fn priority_without_evidence_falls_back() {
    let (_dir, config) = workspace("");
    let report = json_output(&config, &["priority", "--student", "ghost"]);
    assert_eq!(report["topSkills"][0]["skillId"], "MISSING_EVIDENCE");
    assert_eq!(report["overallPriority"], 0.9);
}

#[test]
fn priority_uses_ladder_file() {
    let (dir, config) = workspace("[ladder]\npath = \"LADDER\"\n");
    let ladder = dir.path().join("ladder.json");
    std::fs::write(
        &ladder,
        r#"{"version":"district","tiers":{"T2":{"evidenceCadenceDays":1}}}"#,
    )
    .unwrap();
    let raw = std::fs::read_to_string(&config).unwrap();
    std::fs::write(&config, raw.replace("LADDER", &ladder.display().to_string())).unwrap();

    record(
        &config,
        json!({
            "studentId": "stu",
            "targets": ["S"],
            "timestamp": days_ago(3),
            "result": { "accuracy": 0.5 }
        }),
    );
    let report = json_output(&config, &["priority", "--student", "stu"]);
    assert_eq!(report["topSkills"][0]["cadenceDays"], 1.0);
    assert_eq!(report["topSkills"][0]["stalenessNorm"], 2.0);
}

#[test]
fn unreachable_ladder_keeps_defaults() {
    let (_dir, config) =
        workspace("[ladder]\nurl = \"http://127.0.0.1:9/ladder.json\"\ntimeout_secs = 2\n");
    record(&config, json!({ "studentId": "stu", "targets": ["S"], "tier": "T3" }));
    let report = json_output(&config, &["priority", "--student", "stu"]);
    assert_eq!(report["topSkills"][0]["cadenceDays"], 7.0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn ladder_fetched_over_http() {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ladder.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "version": "remote",
            "tiers": { "T3": { "evidenceCadenceDays": 3 } }
        })))
        .mount(&server)
        .await;

    let (_dir, config) = workspace("");
    record(&config, json!({ "studentId": "stu", "targets": ["S"], "tier": "T3" }));

    let mut cmd = skillscope();
    cmd.env("SKILLSCOPE_LADDER_URL", format!("{}/ladder.json", server.uri()))
        .arg("--config")
        .arg(&config)
        .arg("--format")
        .arg("json")
        .args(["priority", "--student", "stu"]);
    let output = tokio::task::spawn_blocking(move || cmd.output())
        .await
        .unwrap()
        .unwrap();
    assert!(output.status.success());
    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["topSkills"][0]["cadenceDays"], 3.0);
}

#[test]
fn growth_and_track() {
    let (_dir, config) = workspace("");
    seed_growth(&config, "g-up", &[(28, 0.42), (21, 0.53), (14, 0.60), (7, 0.70)]);
    seed_growth(&config, "g-down", &[(28, 0.78), (21, 0.68), (14, 0.62), (7, 0.54)]);

    let growth = json_output(
        &config,
        &["growth", "--student", "g-up", "--skill", "LIT.DEC.SYL"],
    );
    assert_eq!(growth["velocity"]["direction"], "ACCELERATING");
    assert_eq!(growth["expectation"]["meetsExpectation"], true);
    assert_eq!(growth["stability"]["stability"], "STABLE");

    let up = json_output(&config, &["track", "--student", "g-up"]);
    assert_eq!(up["status"], "ON_TRACK");
    let down = json_output(&config, &["track", "--student", "g-down"]);
    assert_eq!(down["status"], "OFF_TRACK");
    let nobody = json_output(&config, &["track", "--student", "nobody"]);
    assert_eq!(nobody["status"], "WATCH");
}

#[test]
fn growth_text_output() {
    let (_dir, config) = workspace("");
    skillscope()
        .arg("--config")
        .arg(&config)
        .args(["growth", "--student", "x", "--skill", "S"])
        .assert()
        .success()
        .stdout(predicate::str::contains("INSUFFICIENT"));
}

#[test]
fn audit_with_catalog() {
    let (dir, config) = workspace("known_skills = [\"LIT.DEC.SYL\"]\n");
    record(&config, json!({ "studentId": "a", "targets": ["LIT.DEC.SYL", "LIT.OLD.X"] }));
    record(
        &config,
        json!({ "studentId": "b", "targets": ["LIT.DEC.SYL"], "timestamp": days_ago(400) }),
    );

    let report = json_output(&config, &["audit"]);
    assert_eq!(report["trackedStudents"], 2);
    assert_eq!(report["totalRows"], 3);
    assert_eq!(report["staleRows"], 1);
    assert_eq!(report["orphanSkillIds"], json!(["LIT.OLD.X"]));

    let catalog = dir.path().join("skills.txt");
    std::fs::write(&catalog, "LIT.OLD.X\n").unwrap();
    let report = json_output(&config, &["audit", "--catalog", catalog.to_str().unwrap()]);
    assert_eq!(report["orphanSkillIds"], json!([]));

    skillscope()
        .arg("--config")
        .arg(&config)
        .args(["audit", "--fail-on-findings"])
        .assert()
        .failure();
}

#[test]
fn audit_without_catalog_skips_orphans() {
    let (_dir, config) = workspace("");
    let report = json_output(&config, &["audit"]);
    assert_eq!(report["orphanSkillIds"], Value::Null);
    assert_eq!(report["trackedStudents"], 0);
}

#[test]
fn missing_config_file() {
    skillscope()
        .arg("--config")
        .arg("definitely-not-here.toml")
        .args(["snapshot", "--student", "x"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("config file not found"));
}

#[test]
fn init_creates_files() {
    let dir = TempDir::new().unwrap();

    skillscope()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created skillscope.toml"))
        .stdout(predicate::str::contains("Created ladder.json"));

    assert!(dir.path().join("skillscope.toml").exists());
    let ladder: Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("ladder.json")).unwrap())
            .unwrap();
    assert_eq!(ladder["tiers"]["T2"]["evidenceCadenceDays"], 14.0);

    skillscope()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
}

#[test]
fn help_lists_commands() {
    skillscope()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("record"))
        .stdout(predicate::str::contains("priority"))
        .stdout(predicate::str::contains("audit"));
}
