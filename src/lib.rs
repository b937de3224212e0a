pub mod clients;
pub mod configuration;
pub mod domain;
pub mod models;
pub mod reconciliation;
pub mod routes;
pub mod startup;
pub mod telemetry;
pub mod update_user_worker;
pub mod utils;
