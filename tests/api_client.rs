//! ApiClient against a stub server.

use std::time::Duration;

use serde_json::json;
use time::macros::datetime;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use abusedash::api::{ApiClient, ApiConfig, ApiError};
use abusedash::core::{AbuseType, NewReport, ReviewStatus, RiskLevel, StatusUpdate};

fn client_for(server: &MockServer) -> ApiClient {
    ApiClient::new(&ApiConfig {
        base_url: server.uri(),
        timeout: Duration::from_secs(5),
    })
    .expect("client")
}

fn detail_body(history: serde_json::Value) -> serde_json::Value {
    json!({
        "domain": {
            "domain_id": 4,
            "domain_name": "verify-paypal-online.online",
            "current_status": "OPEN"
        },
        "reports": [{
            "report_id": 11,
            "domain_name": "verify-paypal-online.online",
            "abuse_type": "PHISHING",
            "risk_level": "MEDIUM",
            "reported_timestamp": "2025-09-19T08:30:00"
        }],
        "status_history": history
    })
}

#[tokio::test]
async fn list_reports_decodes_rows_without_optional_fields() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/reports"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "report_id": 1,
                "domain_name": "alpha.com",
                "abuse_type": "BOTNET_C2",
                "risk_level": "HIGH",
                "reported_timestamp": "2024-01-01T10:00:00Z"
            },
            {
                "report_id": 2,
                "domain_name": "beta.org",
                "abuse_type": "SPAM",
                "risk_level": "LOW",
                "reported_timestamp": "2024-01-02T10:00:00.123456"
            }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let rows = client_for(&server).list_reports().await.expect("list");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].abuse_type, AbuseType::BotnetC2);
    assert_eq!(rows[0].risk_level, RiskLevel::High);
    assert_eq!(rows[0].reporter_source, None);
    assert_eq!(rows[0].reported_timestamp, datetime!(2024-01-01 10:00:00 UTC));
    assert_eq!(
        rows[1].reported_timestamp,
        datetime!(2024-01-02 10:00:00.123456 UTC)
    );
}

#[tokio::test]
async fn detail_decodes_the_aggregate() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/report/verify-paypal-online.online"))
        .respond_with(ResponseTemplate::new(200).set_body_json(detail_body(json!([{
            "status_id": 1,
            "new_status": "ESCALATED",
            "reviewer_initials": "SD",
            "notes": "registrar contacted",
            "created_at": "2025-09-19T09:00:00"
        }]))))
        .mount(&server)
        .await;

    let detail = client_for(&server)
        .get_domain_detail("verify-paypal-online.online")
        .await
        .expect("detail");
    assert_eq!(detail.domain.domain_id, Some(4));
    assert_eq!(detail.domain.current_status, "OPEN");
    assert_eq!(detail.reports.len(), 1);
    assert_eq!(detail.status_history[0].new_status, ReviewStatus::Escalated);
    assert_eq!(
        detail.status_history[0].notes.as_deref(),
        Some("registrar contacted")
    );
}

#[tokio::test]
async fn missing_domain_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/report/unknown.example"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({"detail": "Domain not found"})),
        )
        .mount(&server)
        .await;

    let err = client_for(&server)
        .get_domain_detail("unknown.example")
        .await
        .expect_err("404");
    assert!(err.is_not_found(), "{err:?}");
}

#[tokio::test]
async fn create_report_sends_utc_timestamp_and_returns_scored_report() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/report"))
        .and(body_json(json!({
            "domain_name": "verify-paypal-online.online",
            "reporter_source": "Netcraft",
            "abuse_type": "PHISHING",
            "timestamp": "2025-09-19T08:30:00Z",
            "confidence_score": 10
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "report_id": 12,
            "domain_name": "verify-paypal-online.online",
            "abuse_type": "PHISHING",
            "risk_level": "MEDIUM",
            "reported_timestamp": "2025-09-19T08:30:00",
            "reporter_source": "Netcraft",
            "confidence_score": 10
        })))
        .expect(1)
        .mount(&server)
        .await;

    let report = client_for(&server)
        .create_report(&NewReport {
            domain_name: "verify-paypal-online.online".to_string(),
            reporter_source: "Netcraft".to_string(),
            abuse_type: AbuseType::Phishing,
            timestamp: datetime!(2025-09-19 10:30:00 +2),
            confidence_score: 10,
        })
        .await
        .expect("create");
    assert_eq!(report.report_id, 12);
    assert_eq!(report.risk_level, RiskLevel::Medium);
    assert_eq!(report.confidence_score, Some(10));
}

#[tokio::test]
async fn status_update_posts_null_notes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/domains/example.com/status"))
        .and(body_json(json!({
            "new_status": "SUSPENDED",
            "reviewer_initials": "SD",
            "notes": null
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    client_for(&server)
        .update_domain_status(
            "example.com",
            &StatusUpdate {
                new_status: ReviewStatus::Suspended,
                reviewer_initials: "SD".to_string(),
                notes: None,
            },
        )
        .await
        .expect("status update");
}

#[tokio::test]
async fn validation_rejection_carries_server_detail() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/domains/example.com/status"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "detail": [{"loc": ["body", "reviewer_initials"], "msg": "too long"}]
        })))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .update_domain_status(
            "example.com",
            &StatusUpdate {
                new_status: ReviewStatus::Reviewed,
                reviewer_initials: "SD".to_string(),
                notes: Some("ok".to_string()),
            },
        )
        .await
        .expect_err("422");
    match err {
        ApiError::Rejected { status, detail } => {
            assert_eq!(status.as_u16(), 422);
            assert!(detail.contains("too long"), "{detail}");
        }
        other => panic!("expected Rejected, got {other:?}"),
    }
}

#[tokio::test]
async fn server_errors_and_bad_bodies_are_distinguished() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/reports"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert!(matches!(
        client.list_reports().await,
        Err(ApiError::Server { .. })
    ));
    assert!(matches!(client.health().await, Err(ApiError::Decode(_))));
}

#[tokio::test]
async fn health_reports_ok() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
        .mount(&server)
        .await;

    let health = client_for(&server).health().await.expect("health");
    assert!(health.is_ok());
}

#[tokio::test]
async fn unreachable_server_is_a_network_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let uri = format!("http://{}", listener.local_addr().expect("addr"));
    drop(listener);

    let client = ApiClient::new(&ApiConfig {
        base_url: uri.clone(),
        timeout: Duration::from_secs(2),
    })
    .expect("client");
    match client.list_reports().await {
        Err(ApiError::Network { base_url, .. }) => assert_eq!(base_url, uri),
        other => panic!("expected Network error, got {other:?}"),
    }
}
