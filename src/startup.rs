use crate::clients::platform_client::PlatformClient;
use crate::configuration::{DatabaseSettings, Settings};
use crate::routes::{confirm, health_check, newsletters, subscribe, unsubscribe, user};
use actix_web::dev::Server;
use actix_web::web::Data;
use actix_web::{App, HttpServer};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::net::TcpListener;
use tracing_actix_web::TracingLogger;

pub struct Application {
    port: u16,
    server: Server,
}

impl Application {
    pub async fn build(configuration: Settings) -> Result<Self, anyhow::Error> {
        let connection_pool = get_connection_pool(&configuration.database);
        let platform = configuration.platform.client();
        let address = format!(
            "{}:{}",
            configuration.application.host, configuration.application.port
        );
        let listener = TcpListener::bind(address)?;
        let port = listener.local_addr()?.port();
        let server = run(listener, connection_pool, platform)?;

        Ok(Self { port, server })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> Result<(), std::io::Error> {
        self.server.await
    }
}

pub fn get_connection_pool(configuration: &DatabaseSettings) -> PgPool {
    PgPoolOptions::new().connect_lazy_with(configuration.connect_options())
}

fn run(
    listener: TcpListener,
    db_pool: PgPool,
    platform: PlatformClient,
) -> Result<Server, anyhow::Error> {
    let db_pool = Data::new(db_pool);
    let platform = Data::new(platform);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .service(health_check::get)
            .service(newsletters::get)
            .service(subscribe::post)
            .service(unsubscribe::post)
            .service(user::get)
            .service(user::post)
            .service(confirm::post)
            .app_data(db_pool.clone())
            .app_data(platform.clone())
    })
    .listen(listener)?
    .run();

    Ok(server)
}
