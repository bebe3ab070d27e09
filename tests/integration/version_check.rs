use upkeep::config::ProxySettings;
use upkeep::core::UpdaterError;
use upkeep::transport::ReqwestTransport;
use upkeep::upgrade::{VersionChecker, user_agent};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{INFO_PATH, NO_UPDATE, serve_version, update_available};

#[tokio::test]
async fn test_query_and_user_agent_are_sent() {
    let server = MockServer::start().await;
    let agent = user_agent(Some("TestApp"), "8.6.2");
    Mock::given(method("GET"))
        .and(path(INFO_PATH))
        .and(query_param("version", "8.6.2"))
        .and(query_param("param", "arm64"))
        .and(header("user-agent", agent.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_string(NO_UPDATE))
        .expect(1)
        .mount(&server)
        .await;

    let transport = ReqwestTransport::new(&ProxySettings::default()).unwrap();
    let decision = VersionChecker::new(&transport, agent)
        .check(&format!("{}{INFO_PATH}", server.uri()), "8.6.2", Some("arm64"))
        .await
        .unwrap();

    assert!(!decision.needs_update);
}

#[tokio::test]
async fn test_update_decision_over_http() {
    let server = MockServer::start().await;
    let location = format!("{}/files/setup.exe", server.uri());
    serve_version(&server, update_available(&location, None)).await;

    let transport = ReqwestTransport::new(&ProxySettings::default()).unwrap();
    let decision = VersionChecker::new(&transport, "Upkeep/test")
        .check(&format!("{}{INFO_PATH}", server.uri()), "1.0", None)
        .await
        .unwrap();

    assert!(decision.needs_update);
    assert_eq!(decision.version, "2.0");
    assert_eq!(decision.download_location, location);
}

#[tokio::test]
async fn test_server_error_is_network_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(INFO_PATH))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let transport = ReqwestTransport::new(&ProxySettings::default()).unwrap();
    let err = VersionChecker::new(&transport, "Upkeep/test")
        .check(&format!("{}{INFO_PATH}", server.uri()), "1.0", None)
        .await
        .unwrap_err();

    assert!(matches!(err, UpdaterError::NetworkError { .. }));
}

#[tokio::test]
async fn test_html_answer_is_malformed() {
    let server = MockServer::start().await;
    serve_version(&server, "<html><body>Maintenance</body></html>").await;

    let transport = ReqwestTransport::new(&ProxySettings::default()).unwrap();
    let err = VersionChecker::new(&transport, "Upkeep/test")
        .check(&format!("{}{INFO_PATH}", server.uri()), "1.0", None)
        .await
        .unwrap_err();

    assert!(matches!(err, UpdaterError::MalformedResponse { .. }));
}
