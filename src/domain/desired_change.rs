use crate::domain::{ChangeType, EmailFormat, NewsletterSlugs, TriggerWelcome};

/// A validated request to change one subscriber's state on the platform.
#[derive(Debug, Clone)]
pub struct DesiredChange {
    pub change_type: ChangeType,
    pub newsletters: NewsletterSlugs,
    pub lang: Option<String>,
    pub format: Option<EmailFormat>,
    pub country: Option<String>,
    pub source_url: Option<String>,
    pub trigger_welcome: TriggerWelcome,
    pub optin: bool,
}

impl DesiredChange {
    pub fn new(change_type: ChangeType, newsletters: NewsletterSlugs) -> Self {
        Self {
            change_type,
            newsletters,
            lang: None,
            format: None,
            country: None,
            source_url: None,
            trigger_welcome: TriggerWelcome::Default,
            optin: false,
        }
    }
}
