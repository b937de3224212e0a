use crate::helpers::spawn_app;

#[tokio::test]
async fn newsletters_lists_the_catalog_by_slug() {
    // Arrange
    let app = spawn_app().await;

    // Act
    let response = app.get_newsletters().await;

    // Assert
    assert_eq!(response.status().as_u16(), 200);

    let body: serde_json::Value = response.json().await.unwrap();

    assert_eq!(body["status"], "ok");
    assert_eq!(body["newsletters"]["firefox-os"]["vendor_id"], "FIREFOX_OS");
    assert_eq!(
        body["newsletters"]["firefox-os"]["languages"],
        serde_json::json!(["en", "es", "pt-BR"])
    );
    assert_eq!(body["newsletters"]["firefox-os"]["active"], true);
    assert_eq!(body["newsletters"].as_object().unwrap().len(), 3);
}
