//! Contract Test: Cloudflare API v4 client
//!
//! Runs the client against a local mock server.
//!
//! Constraints verified:
//! - Auth headers: global key pair or bearer token, on every request
//! - Envelope decoding for zones and records
//! - Pagination follows `result_info.total_pages`
//! - `success: false` and non-200 statuses become `Error::Provider`
//! - PATCH carries only `{"content": ...}`
//! - Dry-run never sends a PATCH

use cfddns_cloudflare::CloudflareClient;
use cfddns_core::config::{Credentials, ProviderConfig};
use cfddns_core::error::{Error, ProviderErrorDetail};
use cfddns_core::traits::{DnsProvider, RecordType, Zone};
use serde_json::{Value, json};
use tokio_test::{assert_err, assert_ok};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer, credentials: Credentials, dry_run: bool) -> CloudflareClient {
    let mut config = ProviderConfig::new(credentials);
    config.api_base = server.uri();
    config.dry_run = dry_run;
    CloudflareClient::from_config(&config).expect("client builds")
}

fn global_client(server: &MockServer) -> CloudflareClient {
    client_for(server, Credentials::global_key("ops@example.com", "k3y"), false)
}

fn ok(result: Value) -> Value {
    json!({ "success": true, "errors": [], "messages": [], "result": result })
}

fn page(result: Value, page: u32, total_pages: u32) -> Value {
    json!({
        "success": true,
        "errors": [],
        "messages": [],
        "result": result,
        "result_info": { "page": page, "per_page": 50, "total_pages": total_pages, "count": 1, "total_count": total_pages }
    })
}

fn record_json(id: &str, name: &str, content: &str) -> Value {
    json!({
        "id": id,
        "zone_id": "z1",
        "zone_name": "example.com",
        "name": name,
        "type": "A",
        "content": content,
        "proxied": false,
        "ttl": 1
    })
}

#[tokio::test]
async fn global_key_headers_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/zones"))
        .and(header("X-Auth-Email", "ops@example.com"))
        .and(header("X-Auth-Key", "k3y"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(json!([]), 1, 1)))
        .expect(1)
        .mount(&server)
        .await;

    let zones = assert_ok!(global_client(&server).list_zones(None).await);
    assert!(zones.is_empty());
}

#[tokio::test]
async fn bearer_token_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/zones/z1"))
        .and(header("Authorization", "Bearer t0ken"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok(json!({"id": "z1", "name": "example.com"}))))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, Credentials::token("t0ken"), false);
    let zone = assert_ok!(client.get_zone("z1").await);
    assert_eq!(zone, Zone::new("z1", "example.com"));
}

#[tokio::test]
async fn zone_name_filter_is_query_encoded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/zones"))
        .and(query_param("name", "example.com"))
        .and(query_param("per_page", "50"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(page(json!([{"id": "z1", "name": "example.com"}]), 1, 1)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let zones = assert_ok!(global_client(&server).list_zones(Some("example.com")).await);
    assert_eq!(zones, vec![Zone::new("z1", "example.com")]);
}

#[tokio::test]
async fn zone_listing_follows_pagination() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/zones"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(json!([{"id": "z1", "name": "a.com"}]), 1, 2)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/zones"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(json!([{"id": "z2", "name": "b.com"}]), 2, 2)))
        .expect(1)
        .mount(&server)
        .await;

    let zones = assert_ok!(global_client(&server).list_zones(None).await);
    assert_eq!(zones, vec![Zone::new("z1", "a.com"), Zone::new("z2", "b.com")]);
}

#[tokio::test]
async fn records_listed_by_type() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/zones/z1/dns_records"))
        .and(query_param("type", "A"))
        .and(query_param("per_page", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            json!([record_json("r1", "home.example.com", "1.1.1.1")]),
            1,
            1,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let records = assert_ok!(global_client(&server).list_records("z1", RecordType::A).await);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, "r1");
    assert_eq!(records[0].content, "1.1.1.1");
    assert_eq!(records[0].record_type, RecordType::A);
    assert_eq!(records[0].zone_id, "z1");
}

#[tokio::test]
async fn missing_zone_id_in_record_is_filled_in() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/zones/z9/dns_records"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            json!([{"id": "r1", "name": "a.example.net", "type": "A", "content": "1.1.1.1"}]),
            1,
            1,
        )))
        .mount(&server)
        .await;

    let records = assert_ok!(global_client(&server).list_records("z9", RecordType::A).await);
    assert_eq!(records[0].zone_id, "z9");
}

#[tokio::test]
async fn patch_sends_only_content() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/zones/z1/dns_records/r1"))
        .and(body_json(json!({"content": "2.2.2.2"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok(record_json("r1", "home.example.com", "2.2.2.2"))))
        .expect(1)
        .mount(&server)
        .await;

    let record = assert_ok!(global_client(&server).update_record("z1", "r1", "2.2.2.2").await);
    assert_eq!(record.content, "2.2.2.2");
    assert_eq!(record.name, "home.example.com");
}

#[tokio::test]
async fn unsuccessful_envelope_is_provider_error() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/zones/z1/dns_records/r1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "errors": [{"code": 9005, "message": "Content for A record is invalid"}],
            "messages": [],
            "result": null
        })))
        .mount(&server)
        .await;

    let err = assert_err!(global_client(&server).update_record("z1", "r1", "nope").await);
    match err {
        Error::Provider { status, errors } => {
            assert_eq!(status, 200);
            assert_eq!(errors, vec![ProviderErrorDetail::new(9005, "Content for A record is invalid")]);
        }
        other => panic!("expected provider error, got {other:?}"),
    }
}

#[tokio::test]
async fn non_200_status_is_provider_error_with_details() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/zones"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "success": false,
            "errors": [{"code": 9109, "message": "Invalid access token"}],
            "messages": [],
            "result": null
        })))
        .mount(&server)
        .await;

    let err = assert_err!(global_client(&server).list_zones(None).await);
    assert_eq!(err.status(), Some(403));
    assert!(err.to_string().contains("[9109] Invalid access token"));
}

#[tokio::test]
async fn non_json_error_body_still_maps_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/zones/z1"))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>Bad gateway</html>"))
        .mount(&server)
        .await;

    let err = assert_err!(global_client(&server).get_zone("z1").await);
    assert!(matches!(err, Error::Provider { status: 502, ref errors } if errors.is_empty()));
}

#[tokio::test]
async fn undecodable_success_body_is_json_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/zones/z1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = assert_err!(global_client(&server).get_zone("z1").await);
    assert!(matches!(err, Error::Json(_)));
}

#[tokio::test]
async fn unreachable_server_is_transport_error() {
    let mut config = ProviderConfig::new(Credentials::token("t0ken"));
    config.api_base = "http://127.0.0.1:1".to_string();
    let client = CloudflareClient::from_config(&config).expect("client builds");

    let err = assert_err!(client.list_zones(None).await);
    assert!(matches!(err, Error::Transport(_)));
}

#[tokio::test]
async fn dry_run_reads_but_never_patches() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/zones/z1/dns_records/r1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok(record_json("r1", "home.example.com", "1.1.1.1"))))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = client_for(&server, Credentials::global_key("ops@example.com", "k3y"), true);
    let record = assert_ok!(client.update_record("z1", "r1", "2.2.2.2").await);
    assert_eq!(record.content, "2.2.2.2");
    assert_eq!(record.id, "r1");
}
