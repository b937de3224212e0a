mod change_type;
mod desired_change;
mod email_format;
mod language;
mod newsletter_slugs;
mod subscriber_email;
mod trigger_welcome;

pub use change_type::ChangeType;
pub use desired_change::DesiredChange;
pub use email_format::EmailFormat;
pub use language::{DEFAULT_LANGUAGE, confirmation_message_for, language_code_is_valid};
pub(crate) use language::two_letter_prefix;
pub use newsletter_slugs::NewsletterSlugs;
pub use subscriber_email::SubscriberEmail;
pub use trigger_welcome::TriggerWelcome;
