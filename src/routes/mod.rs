pub mod confirm;
pub mod health_check;
mod lookup;
pub mod newsletters;
pub mod subscribe;
pub mod unsubscribe;
mod update;
pub mod user;

pub use lookup::{lookup_subscriber, platform_error};
pub use update::{UpdateParams, parse_change, queue_update};
