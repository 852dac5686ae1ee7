use crate::helpers::{id_of, json_body, netflix, TestApp};
use serde_json::json;

#[tokio::test]
async fn create_returns_201_with_defaults_filled_in() {
    // given
    let app = TestApp::spawn().await;

    // when
    let response = app.post_subscriptions(&netflix()).await;

    // then
    assert_eq!(response.status().as_u16(), 201);
    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    let data = &body["data"];
    assert_eq!(data["name"], "Netflix");
    assert_eq!(data["status"], "active");
    assert_eq!(data["description"], "");
    assert_eq!(data["category"], "");
    assert_eq!(data["website"], "");
    assert_eq!(data["next_billing_date"], "2025-03-01");
    assert!(data["id"].is_string());
    assert!(data["created_at"].is_string());
}

#[tokio::test]
async fn create_returns_400_for_a_negative_price() {
    // given
    let app = TestApp::spawn().await;
    let mut body = netflix();
    body["price"] = json!(-5);

    // when
    let response = app.post_subscriptions(&body).await;

    // then
    assert_eq!(response.status().as_u16(), 400);
    let body = json_body(response).await;
    assert_eq!(body["success"], false);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("Price must be a non-negative number"));
}

#[tokio::test]
async fn create_returns_400_with_every_violation_joined() {
    // given
    let app = TestApp::spawn().await;
    let test_cases = vec![
        (
            json!({ "price": 1, "currency": "USD", "billing_cycle": "monthly" }),
            "Subscription name is required",
            "missing name",
        ),
        (
            json!({ "name": "X", "price": "free", "currency": "", "billing_cycle": "monthly" }),
            "Price must be a non-negative number, Currency is required",
            "bad price and empty currency",
        ),
        (
            json!({ "name": "X", "price": 1, "currency": "USD", "billing_cycle": "daily" }),
            "Billing cycle must be monthly or yearly",
            "unknown billing cycle",
        ),
        (
            json!({ "name": "X", "price": 1, "currency": "USD", "billing_cycle": "weekly" }),
            "Billing cycle must be monthly or yearly",
            "weekly billing while disabled",
        ),
        (
            json!({
                "name": "X", "price": 1, "currency": "USD",
                "billing_cycle": "monthly", "next_billing_date": "2025-02-30"
            }),
            "Next billing date is not a valid calendar date",
            "impossible date",
        ),
    ];

    for (body, expected, description) in test_cases {
        // when
        let response = app.post_subscriptions(&body).await;

        // then
        assert_eq!(
            response.status().as_u16(),
            400,
            "The API did not reject the payload with {description}"
        );
        let body = json_body(response).await;
        assert_eq!(body["error"], expected, "Wrong error for {description}");
    }
}

#[tokio::test]
async fn weekly_billing_is_accepted_when_enabled() {
    // given
    let app = TestApp::spawn_with(|config| config.schema.allow_weekly_billing = true).await;
    let mut body = netflix();
    body["billing_cycle"] = json!("weekly");

    // when
    let response = app.post_subscriptions(&body).await;

    // then
    assert_eq!(response.status().as_u16(), 201);
}

#[tokio::test]
async fn create_accepts_aliases_and_truncates_datetimes() {
    // given
    let app = TestApp::spawn().await;
    let body = json!({
        "name": "Spotify",
        "price": 149,
        "currency": "TWD",
        "billingCycle": "yearly",
        "renewalDate": "2025-06-15T08:30:00.000Z",
    });

    // when
    let response = app.post_subscriptions(&body).await;

    // then
    assert_eq!(response.status().as_u16(), 201);
    let body = json_body(response).await;
    assert_eq!(body["data"]["billing_cycle"], "yearly");
    assert_eq!(body["data"]["next_billing_date"], "2025-06-15");
}

#[tokio::test]
async fn create_then_get_returns_the_stored_subscription() {
    // given
    let app = TestApp::spawn().await;
    let id = app.create(&netflix()).await;

    // when
    let response = app.get_subscription(&id).await;

    // then
    assert_eq!(response.status().as_u16(), 200);
    let body = json_body(response).await;
    assert_eq!(id_of(&body["data"]), id);
    assert_eq!(body["data"]["price"], 15.99);
    assert_eq!(body["data"]["currency"], "USD");
}

#[tokio::test]
async fn list_is_ordered_by_next_billing_date() {
    // given
    let app = TestApp::spawn().await;
    for (name, date) in [
        ("Later", "2025-12-01"),
        ("Sooner", "2025-01-10"),
        ("Middle", "2025-06-01"),
    ] {
        let mut body = netflix();
        body["name"] = json!(name);
        body["next_billing_date"] = json!(date);
        app.create(&body).await;
    }

    // when
    let response = app.get_subscriptions().await;

    // then
    assert_eq!(response.status().as_u16(), 200);
    let body = json_body(response).await;
    let names: Vec<_> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|subscription| subscription["name"].as_str().unwrap().to_owned())
        .collect();
    assert_eq!(names, vec!["Sooner", "Middle", "Later"]);
}

#[tokio::test]
async fn update_overwrites_only_supplied_fields() {
    // given
    let app = TestApp::spawn().await;
    let id = app.create(&netflix()).await;

    // when
    let response = app
        .put_subscription(&id, &json!({ "price": 17.99, "nextBilling": "2025-04-01T00:00:00Z" }))
        .await;

    // then
    assert_eq!(response.status().as_u16(), 200);
    let body = json_body(response).await;
    assert_eq!(body["data"]["price"], 17.99);
    assert_eq!(body["data"]["next_billing_date"], "2025-04-01");
    assert_eq!(body["data"]["name"], "Netflix");
    assert_eq!(body["data"]["currency"], "USD");
}

#[tokio::test]
async fn empty_update_keeps_fields_and_advances_updated_at() {
    // given
    let app = TestApp::spawn().await;
    let created = json_body(app.post_subscriptions(&netflix()).await).await;
    let id = id_of(&created["data"]);

    // when
    let response = app.put_subscription(&id, &json!({})).await;

    // then
    assert_eq!(response.status().as_u16(), 200);
    let updated = json_body(response).await;
    for field in ["name", "price", "currency", "billing_cycle", "next_billing_date", "status"] {
        assert_eq!(updated["data"][field], created["data"][field], "{field} changed");
    }
    let parse = |value: &serde_json::Value| {
        time::OffsetDateTime::parse(
            value.as_str().unwrap(),
            &time::format_description::well_known::Rfc3339,
        )
        .unwrap()
    };
    assert!(parse(&updated["data"]["updated_at"]) >= parse(&created["data"]["updated_at"]));
}

#[tokio::test]
async fn update_rejects_a_blank_name_and_a_negative_price() {
    // given
    let app = TestApp::spawn().await;
    let id = app.create(&netflix()).await;

    // when
    let blank_name = app.put_subscription(&id, &json!({ "name": "  " })).await;
    let negative_price = app.put_subscription(&id, &json!({ "price": -1 })).await;

    // then
    assert_eq!(blank_name.status().as_u16(), 400);
    assert_eq!(
        json_body(blank_name).await["error"],
        "Subscription name is required"
    );
    assert_eq!(negative_price.status().as_u16(), 400);
    let stored = json_body(app.get_subscription(&id).await).await;
    assert_eq!(stored["data"]["price"], 15.99);
}

#[tokio::test]
async fn unknown_ids_are_not_found() {
    // given
    let app = TestApp::spawn().await;

    // when
    let get = app.get_subscription("doesnotexist").await;
    let put = app.put_subscription("doesnotexist", &json!({ "price": 1 })).await;
    let delete = app.delete_subscription("doesnotexist").await;

    // then
    assert_eq!(get.status().as_u16(), 404);
    assert_eq!(put.status().as_u16(), 404);
    assert_eq!(delete.status().as_u16(), 404);
    assert_eq!(json_body(delete).await["success"], false);
}

#[tokio::test]
async fn delete_removes_the_subscription() {
    // given
    let app = TestApp::spawn().await;
    let id = app.create(&netflix()).await;

    // when
    let response = app.delete_subscription(&id).await;

    // then
    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(id_of(&json_body(response).await["data"]), id);
    assert_eq!(app.get_subscription(&id).await.status().as_u16(), 404);
    assert_eq!(app.delete_subscription(&id).await.status().as_u16(), 404);
}

#[tokio::test]
async fn non_json_bodies_are_rejected_with_an_envelope() {
    // given
    let app = TestApp::spawn().await;

    // when
    let response = app.post_subscriptions(&json!(["Netflix"])).await;

    // then
    assert_eq!(response.status().as_u16(), 400);
    assert_eq!(json_body(response).await["success"], false);
}

#[tokio::test]
async fn replaying_an_idempotency_key_does_not_duplicate() {
    // given
    let app = TestApp::spawn().await;

    // when
    let first = app.post_subscriptions_with_key(&netflix(), "op-42").await;
    let second = app.post_subscriptions_with_key(&netflix(), "op-42").await;

    // then
    assert_eq!(first.status().as_u16(), 201);
    assert_eq!(second.status().as_u16(), 201);
    let first = json_body(first).await;
    let second = json_body(second).await;
    assert_eq!(first["data"]["id"], second["data"]["id"]);
    let list = json_body(app.get_subscriptions().await).await;
    assert_eq!(list["data"].as_array().unwrap().len(), 1);
}
