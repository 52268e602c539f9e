//! End-to-end tests: HTTP drain deliveries through to routed records.

use std::time::Duration;

use axum::http::StatusCode;
use logdrain_router::logline::LogLevel;

mod common;

use common::{drain_body, postgres_frame, start_pipeline, test_config};

async fn deliver(client: &reqwest::Client, url: String, body: Vec<u8>) -> StatusCode {
    let res = client.post(url).body(body).send().await.unwrap();
    StatusCode::from_u16(res.status().as_u16()).unwrap()
}

#[tokio::test]
async fn test_identification_then_routing() {
    let mut pipeline = start_pipeline(test_config()).await;
    let client = reqwest::Client::new();

    // before identification: dropped
    let status = deliver(
        &client,
        pipeline.url("/logs/app-a"),
        drain_body(&[postgres_frame("LOG:  message A")]),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let status = deliver(
        &client,
        pipeline.url("/logs/app-a"),
        drain_body(&[
            postgres_frame("pganalyze-collector-identify: db1"),
            postgres_frame("LOG:  message B"),
        ]),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let record = pipeline.next_record().await;
    assert_eq!(record.identifier, "srv-1");
    assert_eq!(record.log_line.level, LogLevel::Log);
    assert_eq!(record.log_line.content, "message B");
    assert_eq!(record.log_line.username.as_deref(), Some("app_user"));
    assert_eq!(record.log_line.database.as_deref(), Some("orders"));
    assert!(pipeline.no_more_records().await);
}

#[tokio::test]
async fn test_rebinding_and_independent_sources() {
    let mut pipeline = start_pipeline(test_config()).await;
    let client = reqwest::Client::new();

    deliver(
        &client,
        pipeline.url("/logs/app-a"),
        drain_body(&[
            postgres_frame("pganalyze-collector-identify: db1"),
            postgres_frame("LOG:  first"),
            postgres_frame("pganalyze-collector-identify: db2"),
            postgres_frame("LOG:  second"),
        ]),
    )
    .await;
    deliver(
        &client,
        pipeline.url("/logs/app-b"),
        drain_body(&[postgres_frame("LOG:  never routed")]),
    )
    .await;

    assert_eq!(pipeline.next_record().await.identifier, "srv-1");
    let second = pipeline.next_record().await;
    assert_eq!(second.identifier, "srv-2");
    assert_eq!(second.log_line.content, "second");
    assert!(pipeline.no_more_records().await);
}

#[tokio::test]
async fn test_large_delivery_keeps_order() {
    let mut pipeline = start_pipeline(test_config()).await;
    let client = reqwest::Client::new();

    let mut payloads = vec![postgres_frame("pganalyze-collector-identify: db2")];
    payloads.extend((0..500).map(|i| postgres_frame(&format!("LOG:  line {i}"))));
    // platform noise is filtered before correlation
    payloads.push("<158>1 2024-03-01T10:00:00+00:00 host heroku router - at=info".into());

    let status = deliver(&client, pipeline.url("/logs/app-a"), drain_body(&payloads)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    for i in 0..500 {
        let record = pipeline.next_record().await;
        assert_eq!(record.log_line.content, format!("line {i}"));
    }
    assert!(pipeline.no_more_records().await);
}

#[tokio::test]
async fn test_malformed_body_is_rejected() {
    let mut pipeline = start_pipeline(test_config()).await;
    let client = reqwest::Client::new();

    let mut body = drain_body(&[
        postgres_frame("pganalyze-collector-identify: db1"),
        postgres_frame("LOG:  before the damage"),
    ]);
    body.extend_from_slice(b"x3 abc");

    let res = client
        .post(pipeline.url("/logs/app-a"))
        .body(body)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 400);
    assert!(res.text().await.unwrap().contains("length prefix"));

    // frames decoded before the error still count
    assert_eq!(
        pipeline.next_record().await.log_line.content,
        "before the damage"
    );
    assert!(pipeline.no_more_records().await);
}

#[tokio::test]
async fn test_status_and_health() {
    let pipeline = start_pipeline(test_config()).await;
    let client = reqwest::Client::new();

    let res = client.get(pipeline.url("/health")).send().await.unwrap();
    assert_eq!(res.status().as_u16(), 200);
    assert_eq!(res.text().await.unwrap(), "ok");

    let json: serde_json::Value = client
        .get(pipeline.url("/status"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let servers = json["servers"].as_array().unwrap();
    assert_eq!(servers.len(), 2);
    assert_eq!(servers[1]["section_name"], "db2");
    assert_eq!(servers[1]["identifier"], "srv-2");
}

#[tokio::test]
async fn test_graceful_shutdown_closes_record_channel() {
    let mut pipeline = start_pipeline(test_config()).await;
    let client = reqwest::Client::new();

    deliver(
        &client,
        pipeline.url("/logs/app-a"),
        drain_body(&[
            postgres_frame("pganalyze-collector-identify: db1"),
            postgres_frame("LOG:  last words"),
        ]),
    )
    .await;
    assert_eq!(pipeline.next_record().await.log_line.content, "last words");
    drop(client);

    pipeline.shutdown.trigger();

    tokio::time::timeout(Duration::from_secs(2), &mut pipeline.correlator)
        .await
        .expect("correlator should stop")
        .unwrap();
    tokio::time::timeout(Duration::from_secs(2), &mut pipeline.server)
        .await
        .expect("server should stop")
        .unwrap()
        .unwrap();

    assert!(pipeline.records.recv().await.is_none());
}
