use crate::helpers::{json_body, TestApp};

#[tokio::test]
async fn health_check_reports_ok_with_a_timestamp() {
    // given
    let app = TestApp::spawn().await;

    // when
    let response = app.get_health().await;

    // then
    assert_eq!(response.status().as_u16(), 200);
    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["ok"], true);
    let timestamp = body["data"]["timestamp"].as_str().unwrap();
    assert!(time::OffsetDateTime::parse(
        timestamp,
        &time::format_description::well_known::Rfc3339
    )
    .is_ok());
}

#[tokio::test]
async fn responses_carry_a_request_id() {
    // given
    let app = TestApp::spawn().await;

    // when
    let response = app.get_health().await;

    // then
    let request_id = response
        .headers()
        .get("x-request-id")
        .expect("Missing x-request-id header");
    assert!(uuid::Uuid::parse_str(request_id.to_str().unwrap()).is_ok());
}
