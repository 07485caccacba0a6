mod common;

use std::net::Ipv4Addr;

use common::test_app;

#[tokio::test]
async fn startup_binds_and_serves_health() {
    let app = test_app(true);
    let router = app.router.clone();

    // Bind to ephemeral port
    let listener = tokio::net::TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local_addr");

    let handle = tokio::spawn(async move {
        axum::serve(listener, router.into_make_service())
            .await
            .unwrap();
    });

    let url = format!("http://{}:{}/api/health", addr.ip(), addr.port());
    let res = reqwest::get(&url).await.expect("request");
    assert!(res.status().is_success());
    let body: serde_json::Value = res.json().await.expect("json body");
    assert_eq!(body["status"], "healthy");

    handle.abort();
}
