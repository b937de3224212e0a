use newsletter_sync::clients::platform_client::PlatformClient;
use newsletter_sync::configuration::{DatabaseSettings, WorkerSettings, get_configuration};
use newsletter_sync::models::Newsletter;
use newsletter_sync::startup::{Application, get_connection_pool};
use newsletter_sync::telemetry::{get_subscriber, init_subscriber};
use newsletter_sync::update_user_worker::{ExecutionOutcome, try_execute_task};
use secrecy::Secret;
use sqlx::{Connection, Executor, PgConnection, PgPool};
use std::sync::LazyLock;
use uuid::Uuid;
use wiremock::matchers::{path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

// Ensure that the `tracing` stack is only initialised once
static TRACING: LazyLock<()> = LazyLock::new(|| {
    let default_filter_level = "info".to_string();
    let subscriber_name = "test".to_string();
    if std::env::var("TEST_LOG").is_ok() {
        let subscriber = get_subscriber(subscriber_name, default_filter_level, std::io::stdout);
        init_subscriber(subscriber);
    } else {
        let subscriber = get_subscriber(subscriber_name, default_filter_level, std::io::sink);
        init_subscriber(subscriber);
    };
});

pub const MASTER_SEARCH: &str = "/data_extensions/Master_Subscribers/rows/search";
pub const MASTER_ROWS: &str = "/data_extensions/Master_Subscribers/rows";
pub const CONFIRMATION_ROWS: &str = "/data_extensions/Confirmation/rows";

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub db_pool: PgPool,
    pub platform_server: MockServer,
    pub api_client: reqwest::Client,
    pub platform: PlatformClient,
    pub worker: WorkerSettings,
}

impl TestApp {
    /// Run the update queue until nothing is due.
    pub async fn run_pending_updates(&self) {
        loop {
            if let ExecutionOutcome::EmptyQueue =
                try_execute_task(&self.db_pool, &self.platform, &self.worker)
                    .await
                    .unwrap()
            {
                break;
            }
        }
    }

    pub async fn post_subscribe<Body>(&self, body: &Body) -> reqwest::Response
    where
        Body: serde::Serialize,
    {
        self.api_client
            .post(format!("{}/subscribe", &self.address))
            .form(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn post_unsubscribe<Body>(&self, token: &str, body: &Body) -> reqwest::Response
    where
        Body: serde::Serialize,
    {
        self.api_client
            .post(format!("{}/unsubscribe/{}", &self.address, token))
            .form(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn get_user(&self, token: &str) -> reqwest::Response {
        self.api_client
            .get(format!("{}/user/{}", &self.address, token))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn post_user<Body>(&self, token: &str, body: &Body) -> reqwest::Response
    where
        Body: serde::Serialize,
    {
        self.api_client
            .post(format!("{}/user/{}", &self.address, token))
            .form(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn post_confirm(&self, token: &str) -> reqwest::Response {
        self.api_client
            .post(format!("{}/confirm/{}", &self.address, token))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn get_newsletters(&self) -> reqwest::Response {
        self.api_client
            .get(format!("{}/newsletters", &self.address))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    /// Every lookup on the platform comes back empty.
    pub async fn mount_unknown_subscriber(&self) {
        Mock::given(path_regex("/rows/search$"))
            .respond_with(ResponseTemplate::new(404))
            .named("Unknown subscriber")
            .mount(&self.platform_server)
            .await;
    }

    /// The platform knows the subscriber as a confirmed master row.
    pub async fn mount_known_subscriber(&self, email: &str, token: &str, flags: serde_json::Value) {
        let mut fields = serde_json::json!({
            "EMAIL_ADDRESS_": email,
            "EMAIL_FORMAT_": "H",
            "LANGUAGE_ISO2": "en",
            "COUNTRY_": "us",
            "TOKEN": token,
        });
        fields
            .as_object_mut()
            .unwrap()
            .extend(flags.as_object().unwrap().clone());

        Mock::given(path(MASTER_SEARCH))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "fields": fields
            })))
            .named("Known subscriber")
            .mount(&self.platform_server)
            .await;
    }

    pub async fn mount_accepting_platform(&self) {
        Mock::given(path_regex("/rows$"))
            .respond_with(ResponseTemplate::new(200))
            .named("Accept writes")
            .mount(&self.platform_server)
            .await;
        Mock::given(path_regex("^/triggered_sends/"))
            .respond_with(ResponseTemplate::new(202))
            .named("Accept triggers")
            .mount(&self.platform_server)
            .await;
    }

    /// Requests the platform received on `path`, as JSON bodies.
    pub async fn received_bodies(&self, path: &str) -> Vec<serde_json::Value> {
        self.platform_server
            .received_requests()
            .await
            .unwrap()
            .iter()
            .filter(|r| r.url.path() == path)
            .map(|r| serde_json::from_slice(&r.body).unwrap())
            .collect()
    }

    pub async fn triggered_messages(&self) -> Vec<String> {
        self.platform_server
            .received_requests()
            .await
            .unwrap()
            .iter()
            .filter_map(|r| {
                r.url
                    .path()
                    .strip_prefix("/triggered_sends/")
                    .and_then(|rest| rest.strip_suffix("/deliveries"))
                    .map(String::from)
            })
            .collect()
    }

    pub async fn queued_updates(&self) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM update_user_queue")
            .fetch_one(&self.db_pool)
            .await
            .expect("Failed to count queued updates.")
    }
}

pub async fn spawn_app() -> TestApp {
    LazyLock::force(&TRACING);

    // Launch a mock server to stand in for the mailing platform
    let platform_server = MockServer::start().await;

    // Randomise configuration to ensure test isolation
    let configuration = {
        let mut c = get_configuration().expect("Failed to read configuration.");
        // Use a different database for each test case
        c.database.database_name = Uuid::new_v4().to_string();
        // Use a random OS port
        c.application.port = 0;
        c.platform.base_url = platform_server.uri();
        c.platform.timeout_milliseconds = 200;
        c
    };

    // Create and migrate the database
    configure_database(&configuration.database).await;

    // Launch the application as a background task
    let application = Application::build(configuration.clone())
        .await
        .expect("Failed to build application.");
    let application_port = application.port();
    let _ = tokio::spawn(application.run_until_stopped());

    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    let db_pool = get_connection_pool(&configuration.database);
    seed_newsletters(&db_pool).await;

    TestApp {
        address: format!("http://localhost:{}", application_port),
        port: application_port,
        db_pool,
        platform_server,
        api_client: client,
        platform: configuration.platform.clone().client(),
        worker: configuration.worker,
    }
}

async fn configure_database(config: &DatabaseSettings) -> PgPool {
    // Create database
    let maintenance_settings = DatabaseSettings {
        database_name: "postgres".to_string(),
        username: "postgres".to_string(),
        password: Secret::new("password".to_string()),
        ..config.clone()
    };
    let mut connection = PgConnection::connect_with(&maintenance_settings.connect_options())
        .await
        .expect("Failed to connect to Postgres");
    connection
        .execute(format!(r#"CREATE DATABASE "{}";"#, config.database_name).as_str())
        .await
        .expect("Failed to create database.");

    // Migrate database
    let connection_pool = PgPool::connect_with(config.connect_options())
        .await
        .expect("Failed to connect to Postgres.");
    sqlx::migrate!("./migrations")
        .run(&connection_pool)
        .await
        .expect("Failed to migrate the database");
    connection_pool
}

fn newsletter(
    slug: &str,
    vendor_id: &str,
    languages: &[&str],
    welcome: &str,
    order: i32,
) -> Newsletter {
    Newsletter {
        slug: slug.to_string(),
        title: slug.replace('-', " "),
        description: String::new(),
        show: true,
        active: true,
        order,
        vendor_id: vendor_id.to_string(),
        languages: languages.iter().map(|l| l.to_string()).collect(),
        welcome: welcome.to_string(),
    }
}

async fn seed_newsletters(pool: &PgPool) {
    let catalog = [
        newsletter("mozilla-and-you", "MOZILLA_AND_YOU", &["en", "de", "fr", "es"], "W1", 1),
        newsletter("firefox-os", "FIREFOX_OS", &["en", "es", "pt-BR"], "FXOS", 2),
        newsletter("app-dev", "APP_DEV", &["en"], "APPDEV", 3),
    ];

    for newsletter in catalog {
        newsletter
            .store(pool)
            .await
            .expect("Failed to seed the newsletter catalog.");
    }
}

/// Insert a subscriber straight into the local store.
pub async fn store_subscriber(pool: &PgPool, email: &str, token: &str) {
    sqlx::query("INSERT INTO subscribers (email, token) VALUES ($1, $2)")
        .bind(email)
        .bind(token)
        .execute(pool)
        .await
        .expect("Failed to store subscriber.");
}
