use crate::helpers::{MASTER_ROWS, MASTER_SEARCH, spawn_app};
use newsletter_sync::models::Subscriber;
use newsletter_sync::utils::ErrorBody;
use wiremock::matchers::{any, path};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn subscribe_returns_a_200_and_a_token_for_a_new_email() {
    // Arrange
    let app = spawn_app().await;
    app.mount_unknown_subscriber().await;

    // Act
    let response = app
        .post_subscribe(&[("email", "ursula@example.com"), ("newsletters", "app-dev")])
        .await;

    // Assert
    assert_eq!(response.status().as_u16(), 200);

    let body: serde_json::Value = response.json().await.unwrap();
    let saved = Subscriber::find_by_email("ursula@example.com", &app.db_pool)
        .await
        .unwrap()
        .expect("The subscriber was not stored.");

    assert_eq!(body["status"], "ok");
    assert_eq!(body["created"], true);
    assert_eq!(body["token"], saved.token.as_str());
    assert_eq!(app.queued_updates().await, 1);
}

#[tokio::test]
async fn subscribe_reuses_the_token_of_a_known_local_subscriber() {
    // Arrange
    let app = spawn_app().await;
    app.mount_unknown_subscriber().await;
    let form = [("email", "ursula@example.com"), ("newsletters", "app-dev")];
    let first: serde_json::Value = app.post_subscribe(&form).await.json().await.unwrap();

    // Act
    let second: serde_json::Value = app.post_subscribe(&form).await.json().await.unwrap();

    // Assert
    assert_eq!(second["created"], false);
    assert_eq!(first["token"], second["token"]);
}

#[tokio::test]
async fn subscribe_adopts_the_token_the_platform_already_has() {
    // Arrange
    let app = spawn_app().await;
    app.mount_known_subscriber("ursula@example.com", "remote-token", serde_json::json!({}))
        .await;

    // Act
    let body: serde_json::Value = app
        .post_subscribe(&[("email", "ursula@example.com"), ("newsletters", "app-dev")])
        .await
        .json()
        .await
        .unwrap();

    // Assert
    assert_eq!(body["token"], "remote-token");
    assert_eq!(body["created"], false);
}

#[tokio::test]
async fn subscribe_returns_a_400_when_data_is_invalid() {
    // Arrange
    let app = spawn_app().await;
    app.mount_unknown_subscriber().await;
    let test_cases = vec![
        (vec![("email", "ursula@example.com")], 5, "missing newsletters"),
        (vec![("email", "ursula@example.com"), ("newsletters", " ")], 5, "blank newsletters"),
        (vec![("newsletters", "app-dev")], 5, "missing email"),
        (vec![("email", "not-an-email"), ("newsletters", "app-dev")], 2, "invalid email"),
        (
            vec![("email", "ursula@example.com"), ("newsletters", "app-dev,nope")],
            9,
            "unknown newsletter",
        ),
        (
            vec![("email", "ursula@example.com"), ("newsletters", "app-dev"), ("lang", "zz")],
            10,
            "unknown language",
        ),
        (
            vec![("email", "ursula@example.com"), ("newsletters", "app-dev"), ("format", "pdf")],
            5,
            "unknown format",
        ),
    ];

    for (form, code, description) in test_cases {
        // Act
        let response = app.post_subscribe(&form).await;

        // Assert
        assert_eq!(
            response.status().as_u16(),
            400,
            "The API did not fail with 400 Bad Request when the payload had {}.",
            description
        );

        let body: ErrorBody = response.json().await.unwrap();

        assert_eq!(body.status, "error");
        assert_eq!(body.code, code, "Wrong error code for {}.", description);
    }

    assert_eq!(app.queued_updates().await, 0);
}

#[tokio::test]
async fn subscribe_reports_platform_outages_as_network_failures() {
    // Arrange
    let app = spawn_app().await;

    Mock::given(path(MASTER_SEARCH))
        .respond_with(ResponseTemplate::new(503))
        .mount(&app.platform_server)
        .await;

    // Act
    let response = app
        .post_subscribe(&[("email", "ursula@example.com"), ("newsletters", "app-dev")])
        .await;

    // Assert
    assert_eq!(response.status().as_u16(), 400);

    let body: ErrorBody = response.json().await.unwrap();

    assert_eq!(body.code, 1);
    assert!(
        Subscriber::find_by_email("ursula@example.com", &app.db_pool)
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn subscribe_reports_rejected_platform_credentials() {
    // Arrange
    let app = spawn_app().await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(401))
        .mount(&app.platform_server)
        .await;

    // Act
    let response = app
        .post_subscribe(&[("email", "ursula@example.com"), ("newsletters", "app-dev")])
        .await;

    // Assert
    assert_eq!(response.status().as_u16(), 500);

    let body: ErrorBody = response.json().await.unwrap();

    assert_eq!(body.code, 6);
}

#[tokio::test]
async fn subscribe_fails_if_there_is_a_fatal_database_error() {
    // Arrange
    let app = spawn_app().await;
    app.mount_unknown_subscriber().await;

    // Sabotage the database
    sqlx::query("ALTER TABLE update_user_queue DROP COLUMN newsletters;")
        .execute(&app.db_pool)
        .await
        .unwrap();

    // Act
    let response = app
        .post_subscribe(&[("email", "ursula@example.com"), ("newsletters", "app-dev")])
        .await;

    // Assert
    assert_eq!(response.status().as_u16(), 500);
}

#[tokio::test]
async fn a_queued_subscribe_writes_the_flag_and_sends_the_welcome() {
    // Arrange
    let app = spawn_app().await;
    app.mount_unknown_subscriber().await;
    app.mount_accepting_platform().await;

    app.post_subscribe(&[
        ("email", "ursula@example.com"),
        ("newsletters", "mozilla-and-you"),
        ("lang", "en"),
        ("format", "H"),
    ])
    .await
    .error_for_status()
    .unwrap();

    // Act
    app.run_pending_updates().await;

    // Assert
    let writes = app.received_bodies(MASTER_ROWS).await;

    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0]["fields"]["MOZILLA_AND_YOU_FLG"], "Y");
    assert_eq!(writes[0]["fields"]["EMAIL_ADDRESS_"], "ursula@example.com");
    assert!(writes[0]["fields"].get("CREATED_DATE_").is_some());
    assert_eq!(app.triggered_messages().await, vec!["en_W1"]);
    assert_eq!(app.queued_updates().await, 0);
}

#[tokio::test]
async fn a_queued_subscribe_in_a_confirmation_locale_asks_for_confirmation() {
    // Arrange
    let app = spawn_app().await;
    app.mount_unknown_subscriber().await;
    app.mount_accepting_platform().await;

    app.post_subscribe(&[
        ("email", "ursula@example.com"),
        ("newsletters", "mozilla-and-you"),
        ("lang", "de"),
    ])
    .await
    .error_for_status()
    .unwrap();

    // Act
    app.run_pending_updates().await;

    // Assert
    let pending = app
        .received_bodies("/data_extensions/Double_Opt_In/rows")
        .await;

    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0]["fields"]["EmailAddress"], "ursula@example.com");
    assert!(app.received_bodies(MASTER_ROWS).await.is_empty());
    assert_eq!(app.triggered_messages().await, vec!["de_confirmation_email"]);
}

#[tokio::test]
async fn subscribing_to_both_precedence_newsletters_sends_one_welcome() {
    // Arrange
    let app = spawn_app().await;
    app.mount_unknown_subscriber().await;
    app.mount_accepting_platform().await;

    app.post_subscribe(&[
        ("email", "ursula@example.com"),
        ("newsletters", "mozilla-and-you,firefox-os"),
        ("lang", "en"),
        ("format", "T"),
    ])
    .await
    .error_for_status()
    .unwrap();

    // Act
    app.run_pending_updates().await;

    // Assert
    assert_eq!(app.triggered_messages().await, vec!["en_FXOS_T"]);
}
