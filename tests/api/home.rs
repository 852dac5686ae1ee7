use crate::helpers::{json_body, TestApp};
use std::time::Duration;
use subtrack::client::ApiClient;

#[tokio::test]
async fn home_describes_the_service() {
    // given
    let app = TestApp::spawn().await;

    // when
    let response = app.get_home().await;

    // then
    assert_eq!(response.status().as_u16(), 200);
    let body = json_body(response).await;
    assert_eq!(body["message"], "Subscription Backend API");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(body["endpoints"]["health"], "/api/health");
    assert_eq!(body["endpoints"]["subscriptions"], "/api/subscriptions");
    assert_eq!(body["endpoints"]["subscription"], "/api/subscriptions/:id");
}

#[tokio::test]
async fn api_client_reads_the_service_info() {
    // given
    let app = TestApp::spawn().await;
    let client = ApiClient::new(app.base_url(), Duration::from_secs(2)).unwrap();

    // when
    let info = client.service_info().await.unwrap();

    // then
    assert_eq!(info.message, "Subscription Backend API");
    assert_eq!(info.version, env!("CARGO_PKG_VERSION"));
    assert_eq!(info.endpoints.subscriptions, "/api/subscriptions");
}
