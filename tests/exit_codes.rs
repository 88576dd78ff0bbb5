use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn abusedash_cmd(home: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_abusedash"));
    cmd.env("HOME", home);
    for key in [
        "ABUSEDASH_CONFIG",
        "ABUSEDASH_API_BASE_URL",
        "ABUSEDASH_API_TIMEOUT_SECS",
        "ABUSEDASH_UI_COLOR",
        "ABUSEDASH_UI_MAX_TABLE_ROWS",
        "ABUSEDASH_REVIEWER_INITIALS",
        "ABUSEDASH_LOG_LEVEL",
        "RUST_LOG",
    ] {
        cmd.env_remove(key);
    }
    cmd
}

fn run(home: &Path, args: &[&str]) -> Output {
    abusedash_cmd(home).args(args).output().expect("run abusedash")
}

fn make_temp_home() -> PathBuf {
    static HOME_SEQ: AtomicU64 = AtomicU64::new(0);
    let seq = HOME_SEQ.fetch_add(1, Ordering::Relaxed);
    let home =
        std::env::temp_dir().join(format!("abusedash-exit-test-{}-{seq}", std::process::id()));
    let _ = std::fs::remove_dir_all(&home);
    std::fs::create_dir_all(&home).expect("create home");
    home
}

fn closed_port_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let url = format!("http://{}", listener.local_addr().expect("addr"));
    drop(listener);
    url
}

#[test]
fn completion_unknown_shell_exits_2() {
    let home = make_temp_home();
    let out = run(&home, &["completion", "nope"]);
    assert_eq!(out.status.code(), Some(2));
    let _ = std::fs::remove_dir_all(&home);
}

#[test]
fn ui_requires_tty_exits_2() {
    let home = make_temp_home();
    let out = run(&home, &["ui"]);
    assert_eq!(out.status.code(), Some(2));
    let _ = std::fs::remove_dir_all(&home);
}

#[test]
fn invalid_report_exits_2_before_any_request() {
    let home = make_temp_home();
    let base_url = closed_port_url();
    let out = run(
        &home,
        &[
            "create",
            "--domain",
            "example",
            "--source",
            "Netcraft",
            "--base-url",
            &base_url,
        ],
    );
    assert_eq!(out.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("Enter a valid domain."), "{stderr}");
    assert!(
        !home.join(".config/abusedash/logs").exists(),
        "nothing was sent, so nothing should be audited"
    );
    let _ = std::fs::remove_dir_all(&home);
}

#[test]
fn status_without_initials_exits_2() {
    let home = make_temp_home();
    let out = run(&home, &["status", "example.com", "--status", "REVIEWED"]);
    assert_eq!(out.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("Reviewer initials required."), "{stderr}");
    let _ = std::fs::remove_dir_all(&home);
}

#[test]
fn malformed_base_url_exits_2() {
    let home = make_temp_home();
    let out = run(&home, &["health", "--base-url", "not a url"]);
    assert_eq!(out.status.code(), Some(2));
    let _ = std::fs::remove_dir_all(&home);
}

#[test]
fn malformed_config_exits_2() {
    let home = make_temp_home();
    let cfg = home.join(".config/abusedash/config.toml");
    std::fs::create_dir_all(cfg.parent().expect("parent")).expect("mkdirs");
    std::fs::write(&cfg, "[api\nbase_url = ").expect("write config");
    let out = run(&home, &["config", "--show"]);
    assert_eq!(out.status.code(), Some(2));
    let _ = std::fs::remove_dir_all(&home);
}

#[test]
fn unreachable_api_exits_10() {
    let home = make_temp_home();
    let base_url = closed_port_url();
    let out = run(&home, &["detail", "example.com", "--base-url", &base_url]);
    assert_eq!(out.status.code(), Some(10));
    let _ = std::fs::remove_dir_all(&home);
}

#[tokio::test(flavor = "multi_thread")]
async fn unknown_domain_exits_11() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/report/unknown.example"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({"detail": "Domain not found"})),
        )
        .mount(&server)
        .await;

    let home = make_temp_home();
    let out = run(
        &home,
        &["detail", "unknown.example", "--base-url", &server.uri()],
    );
    assert_eq!(out.status.code(), Some(11));
    let _ = std::fs::remove_dir_all(&home);
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_status_update_is_audited_and_exits_10() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/domains/example.com/status"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let home = make_temp_home();
    let out = run(
        &home,
        &[
            "status",
            "example.com",
            "--status",
            "ESCALATED",
            "--initials",
            "SD",
            "--base-url",
            &server.uri(),
        ],
    );
    assert_eq!(out.status.code(), Some(10));

    let logs: Vec<_> = std::fs::read_dir(home.join(".config/abusedash/logs"))
        .expect("logs dir")
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().and_then(|x| x.to_str()) == Some("json"))
        .collect();
    assert_eq!(logs.len(), 1);
    let v: serde_json::Value =
        serde_json::from_slice(&std::fs::read(logs[0].path()).expect("read log")).expect("json");
    assert_eq!(v["command"], "update-status");
    assert_eq!(v["status"], "error");
    assert_eq!(v["domain"], "example.com");
    let _ = std::fs::remove_dir_all(&home);
}
