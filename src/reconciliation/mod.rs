mod field_set;
mod opt_in;
mod orchestrator;
mod snapshot;
mod welcome;

pub use field_set::{PlatformWrite, build_write, newsletter_flags, platform_timestamp};
pub use opt_in::{confirmation_required, resolve_format, resolve_lang};
pub use orchestrator::{ReconcileError, UpdateOutcome, UpdateRequest, confirm_user, update_user};
pub use snapshot::{Lookup, LookupKey, RemoteUserSnapshot, fetch_user, lookup_fields};
pub use welcome::{apply_vendor_precedence, select_welcomes, welcome_candidates, welcome_message_id};
