use crate::helpers::{CONFIRMATION_ROWS, spawn_app, store_subscriber};

#[tokio::test]
async fn confirm_records_the_token_on_the_platform() {
    // Arrange
    let app = spawn_app().await;
    store_subscriber(&app.db_pool, "ursula@example.com", "abc").await;
    app.mount_accepting_platform().await;

    // Act
    let response = app.post_confirm("abc").await;

    // Assert
    assert_eq!(response.status().as_u16(), 200);

    let writes = app.received_bodies(CONFIRMATION_ROWS).await;

    assert_eq!(writes, vec![serde_json::json!({ "fields": { "TOKEN": "abc" } })]);
}

#[tokio::test]
async fn confirm_rejects_unknown_tokens() {
    // Arrange
    let app = spawn_app().await;
    app.mount_unknown_subscriber().await;

    // Act
    let response = app.post_confirm("no-such-token").await;

    // Assert
    assert_eq!(response.status().as_u16(), 403);
    assert!(app.received_bodies(CONFIRMATION_ROWS).await.is_empty());
}
