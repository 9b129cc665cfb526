//! Contract Test: HTTP IP lookup
//!
//! Constraints verified:
//! - The trimmed body is parsed as the address
//! - Non-2xx and unparsable bodies are `IpSource` errors
//! - Unreachable services are `Transport` errors
//! - The version filter rejects the other family
//! - Every failure is classified as transient

use cfddns_core::error::Error;
use cfddns_core::traits::{IpSource, IpVersion};
use cfddns_ip_http::HttpIpSource;
use std::net::IpAddr;
use tokio_test::{assert_err, assert_ok};
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn echo(status: u16, body: &str) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn body_is_trimmed_and_parsed() {
    let server = echo(200, "203.0.113.7\n").await;
    let source = HttpIpSource::new(server.uri()).unwrap();

    let ip = assert_ok!(source.current().await);
    assert_eq!(ip, "203.0.113.7".parse::<IpAddr>().unwrap());
}

#[tokio::test]
async fn ipv6_body_is_accepted() {
    let server = echo(200, "2001:db8::7").await;
    let source = HttpIpSource::new(server.uri()).unwrap();

    let ip = assert_ok!(source.current().await);
    assert!(ip.is_ipv6());
}

#[tokio::test]
async fn error_status_is_ip_source_error() {
    let server = echo(503, "try later").await;
    let source = HttpIpSource::new(server.uri()).unwrap();

    let err = assert_err!(source.current().await);
    assert!(matches!(err, Error::IpSource(_)));
    assert!(err.is_transient());
}

#[tokio::test]
async fn garbage_body_is_ip_source_error() {
    let server = echo(200, "<html>hello</html>").await;
    let source = HttpIpSource::new(server.uri()).unwrap();

    let err = assert_err!(source.current().await);
    assert!(matches!(err, Error::IpSource(_)));
}

#[tokio::test]
async fn version_filter_rejects_other_family() {
    let server = echo(200, "2001:db8::7").await;
    let source = HttpIpSource::new(server.uri()).unwrap().with_version(IpVersion::V4);

    let err = assert_err!(source.current().await);
    assert!(matches!(err, Error::IpSource(_)));
}

#[tokio::test]
async fn unreachable_service_is_transport_error() {
    let source = HttpIpSource::new("http://127.0.0.1:1").unwrap();

    let err = assert_err!(source.current().await);
    assert!(matches!(err, Error::Transport(_)));
    assert!(err.is_transient());
}
