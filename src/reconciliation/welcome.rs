use crate::domain::{ChangeType, DesiredChange, EmailFormat, two_letter_prefix};
use crate::models::{Newsletter, NewsletterCatalog};
use crate::reconciliation::RemoteUserSnapshot;

/// Pairs of (specific, general) vendor ids. When a subscriber is welcomed to
/// both, only the specific newsletter's welcome goes out.
const VENDOR_PRECEDENCE: &[(&str, &str)] = &[("FIREFOX_OS", "MOZILLA_AND_YOU")];

/// Requested newsletters that have a welcome and that the subscriber was not
/// already on.
pub fn welcome_candidates<'a>(
    change: &DesiredChange,
    existing: Option<&RemoteUserSnapshot>,
    catalog: &'a NewsletterCatalog,
) -> Vec<&'a Newsletter> {
    if change.trigger_welcome.is_suppressed() || change.change_type != ChangeType::Subscribe {
        return vec![];
    }

    change
        .newsletters
        .iter()
        .filter_map(|slug| catalog.by_slug(slug))
        .filter(|newsletter| newsletter.welcome_id().is_some())
        .filter(|newsletter| {
            !existing.is_some_and(|snapshot| snapshot.is_subscribed(&newsletter.slug))
        })
        .collect()
}

pub fn apply_vendor_precedence(newsletters: Vec<&Newsletter>) -> Vec<&Newsletter> {
    let has_vendor = |vendor_id: &str| newsletters.iter().any(|n| n.vendor_id == vendor_id);
    let overridden: Vec<&str> = VENDOR_PRECEDENCE
        .iter()
        .filter(|(specific, general)| has_vendor(specific) && has_vendor(general))
        .map(|(_, general)| *general)
        .collect();

    newsletters
        .into_iter()
        .filter(|n| !overridden.contains(&n.vendor_id.as_str()))
        .collect()
}

pub fn welcome_message_id(lang: &str, welcome_id: &str, format: EmailFormat) -> String {
    let lang = two_letter_prefix(lang.trim()).to_lowercase();
    let mut message_id = if lang.is_empty() {
        welcome_id.to_string()
    } else {
        format!("{}_{}", lang, welcome_id)
    };

    if format == EmailFormat::Text {
        message_id.push_str("_T");
    }

    message_id
}

/// The welcome messages to trigger after a write to the master list.
pub fn select_welcomes(
    change: &DesiredChange,
    existing: Option<&RemoteUserSnapshot>,
    catalog: &NewsletterCatalog,
    lang: &str,
    format: EmailFormat,
) -> Vec<String> {
    apply_vendor_precedence(welcome_candidates(change, existing, catalog))
        .into_iter()
        .filter_map(|newsletter| newsletter.welcome_id())
        .map(|welcome_id| welcome_message_id(lang, welcome_id, format))
        .collect()
}
