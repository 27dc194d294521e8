//! Liveness and metrics endpoints.

mod common;

use common::TestApp;

#[tokio::test]
async fn health_check_works() {
    let app = TestApp::spawn().await;

    let response = app
        .client()
        .get(format!("{}/health", app.address))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(response.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn metrics_report_served_requests() {
    site_core::metrics::init_metrics();

    let app = TestApp::spawn().await;
    let client = app.client();

    client
        .get(format!("{}/", app.address))
        .send()
        .await
        .unwrap();

    let body = client
        .get(format!("{}/metrics", app.address))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    assert!(body.contains("http_requests_total"));
}
