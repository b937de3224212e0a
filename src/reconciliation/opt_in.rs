use crate::domain::{
    ChangeType, DEFAULT_LANGUAGE, DesiredChange, EmailFormat, confirmation_message_for,
};
use crate::models::NewsletterCatalog;
use crate::reconciliation::RemoteUserSnapshot;

/// The requested language, else the one on the platform, else English.
pub fn resolve_lang(change: &DesiredChange, existing: Option<&RemoteUserSnapshot>) -> String {
    change
        .lang
        .as_deref()
        .map(str::trim)
        .filter(|lang| !lang.is_empty())
        .or_else(|| existing.and_then(RemoteUserSnapshot::known_lang))
        .unwrap_or(DEFAULT_LANGUAGE)
        .to_string()
}

pub fn resolve_format(
    change: &DesiredChange,
    existing: Option<&RemoteUserSnapshot>,
) -> EmailFormat {
    change
        .format
        .or_else(|| existing.map(|snapshot| snapshot.format))
        .unwrap_or_default()
}

/// The confirmation message to send when this change must go through double
/// opt-in, or `None` when the subscriber can be written to the master list.
pub fn confirmation_required(
    change: &DesiredChange,
    existing: Option<&RemoteUserSnapshot>,
    catalog: &NewsletterCatalog,
    lang: &str,
) -> Option<&'static str> {
    if change.change_type != ChangeType::Subscribe || !change.optin {
        return None;
    }

    if existing.is_some_and(|snapshot| snapshot.confirmed) {
        return None;
    }

    let message_id = confirmation_message_for(lang)?;
    let offered_in_lang = change
        .newsletters
        .iter()
        .filter_map(|slug| catalog.by_slug(slug))
        .any(|newsletter| newsletter.supports_language(lang));

    offered_in_lang.then_some(message_id)
}
