use axum::{body::Body, http::Request, http::StatusCode};
use tower::ServiceExt;

#[tokio::test]
async fn livez_healthy_and_match_routes_require_auth() {
    let state = fm_api::test_state("test-key");
    let app = fm_api::create_router(state);

    let livez_response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/livez")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(livez_response.status(), StatusCode::OK);

    for uri in [
        "/api/match/top-jobs?candidateId=cand-react",
        "/api/match/top-talents?jobId=job-frontend",
    ] {
        let unauthorized = app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(unauthorized.status(), StatusCode::UNAUTHORIZED, "{uri}");
    }
}

#[tokio::test]
async fn responses_carry_a_request_id() {
    let app = fm_api::create_router(fm_api::test_state("test-key"));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/livez")
                .header("x-request-id", "req-abc")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.headers()["x-request-id"], "req-abc");
}
