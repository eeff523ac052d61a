mod support;

use anyhow::Result;
use axum::body::Body;
use axum::http::header::CONTENT_TYPE;
use axum::http::{Request, StatusCode};
use common_token::{issue, Claims, SigningSecret};
use serde_json::json;
use support::{
    body_json, body_string, test_app, test_config, FakeProvider, TestApp, TEST_NOW, TEST_SECRET,
};
use token_service::error::CallbackError;
use tower::util::ServiceExt;

fn app() -> Result<TestApp> {
    test_app(test_config(), FakeProvider::failing(CallbackError::InvalidState))
}

fn secret() -> SigningSecret {
    TEST_SECRET.parse().unwrap()
}

fn verify_request(body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/verify")
        .header(CONTENT_TYPE, "application/json")
        .body(body.into())
        .unwrap()
}

async fn post_token(app: &TestApp, token: &str) -> Result<(StatusCode, serde_json::Value)> {
    let body = json!({ "token": token }).to_string();
    let response = app.router.clone().oneshot(verify_request(body)).await?;
    let status = response.status();
    Ok((status, body_json(response).await?))
}

#[tokio::test]
async fn valid_token_returns_payload() -> Result<()> {
    let app = app()?;
    let token = issue(&Claims::new(TEST_NOW - 10, TEST_NOW + 3590), &secret());

    let (status, body) = post_token(&app, &token).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({ "ok": true, "payload": { "iat": TEST_NOW - 10, "exp": TEST_NOW + 3590 } })
    );
    Ok(())
}

#[tokio::test]
async fn scenario_at_simulated_times() -> Result<()> {
    let app = app()?;
    let token = issue(&Claims::new(1000, 1100), &secret());

    app.clock.set(1050);
    let (status, body) = post_token(&app, &token).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "ok": true, "payload": { "iat": 1000, "exp": 1100 } }));

    app.clock.set(1100);
    let (status, body) = post_token(&app, &token).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "ok": false, "reason": "expired" }));
    Ok(())
}

#[tokio::test]
async fn rejection_reasons_are_reported() -> Result<()> {
    let app = app()?;
    let token = issue(&Claims::new(TEST_NOW, TEST_NOW + 60), &secret());
    let other_key: SigningSecret = "another-secret".parse().unwrap();
    let foreign = issue(&Claims::new(TEST_NOW, TEST_NOW + 60), &other_key);
    let (claims_segment, _) = token.split_once('.').unwrap();

    let cases = [
        ("not-a-token".to_string(), "format"),
        (format!("{token}.extra"), "format"),
        (foreign, "signature"),
        (format!("{claims_segment}.%%%"), "payload"),
    ];

    for (candidate, expected) in cases {
        let request = verify_request(json!({ "token": candidate }).to_string());
        let response = app.router.clone().oneshot(request).await?;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.headers().get("X-Error-Code").unwrap(), expected);
        let body = body_json(response).await?;
        assert_eq!(body, json!({ "ok": false, "reason": expected }), "{candidate}");
    }
    Ok(())
}

#[tokio::test]
async fn missing_token_and_bad_body() -> Result<()> {
    let app = app()?;

    for body in [
        r#"{}"#,
        r#"{"token":""}"#,
        r#"{"token":"   "}"#,
        r#"{"token":null}"#,
        r#"{"token":0}"#,
        r#"{"token":false}"#,
    ] {
        let response = app.router.clone().oneshot(verify_request(body)).await?;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await?, json!({ "ok": false, "reason": "no_token" }));
    }

    for body in ["not json", r#"{"token":["a.b"]}"#, r#"{"token":{"t":1}}"#] {
        let response = app.router.clone().oneshot(verify_request(body)).await?;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await?, json!({ "ok": false, "reason": "bad_request" }));
    }

    for body in [r#"{"token":42}"#, r#"{"token":true}"#] {
        let response = app.router.clone().oneshot(verify_request(body)).await?;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await?, json!({ "ok": false, "reason": "format" }));
    }

    let without_content_type = Request::builder()
        .method("POST")
        .uri("/api/verify")
        .body(Body::from(r#"{"token":"a.b"}"#))
        .unwrap();
    let response = app.router.clone().oneshot(without_content_type).await?;
    assert_eq!(body_json(response).await?, json!({ "ok": false, "reason": "bad_request" }));
    Ok(())
}

#[tokio::test]
async fn surrounding_whitespace_is_ignored() -> Result<()> {
    let app = app()?;
    let token = issue(&Claims::new(TEST_NOW, TEST_NOW + 60), &secret());

    let (status, _) = post_token(&app, &format!("  {token}\n")).await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn lifetime_ceiling_rejects_overlong_tokens() -> Result<()> {
    let mut config = test_config();
    config.token_max_lifetime_seconds = Some(3600);
    let app = test_app(config, FakeProvider::failing(CallbackError::InvalidState))?;

    let fine = issue(&Claims::new(TEST_NOW, TEST_NOW + 3600), &secret());
    let overlong = issue(&Claims::new(TEST_NOW, TEST_NOW + 86_400), &secret());

    assert_eq!(post_token(&app, &fine).await?.0, StatusCode::OK);
    let (status, body) = post_token(&app, &overlong).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["reason"], "payload");
    Ok(())
}

#[tokio::test]
async fn verifications_are_counted() -> Result<()> {
    let app = app()?;
    let token = issue(&Claims::new(TEST_NOW, TEST_NOW + 60), &secret());
    post_token(&app, &token).await?;
    post_token(&app, "garbage").await?;

    let request = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
    let response = app.router.clone().oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(CONTENT_TYPE).unwrap(),
        "text/plain; version=0.0.4"
    );
    let text = body_string(response).await?;
    assert!(text.contains(r#"token_verifications_total{outcome="ok"} 1"#));
    assert!(text.contains(r#"token_verifications_total{outcome="format"} 1"#));
    Ok(())
}
