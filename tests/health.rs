use shopmart_api::routes::health::health_check;

#[tokio::test]
async fn health_check_returns_ok() {
    let response = health_check().await;
    assert_eq!(response.0.message, "Server is running");

    let data = serde_json::to_value(response.0.data.expect("health data")).expect("json");
    assert_eq!(data["status"], "ok");
    assert!(data["timestamp"].is_string());
}
