/// Language used when neither the request nor the platform knows one.
pub const DEFAULT_LANGUAGE: &str = "en";

/// Languages whose subscribers must confirm by email before they are added
/// to the master list, and the confirmation message each one gets.
const CONFIRMATION_MESSAGES: &[(&str, &str)] = &[
    ("es", "es_confirmation_email"),
    ("es-ES", "es_confirmation_email"),
    ("de", "de_confirmation_email"),
    ("fr", "fr_confirmation_email"),
    ("pt", "pt_br_confirmation_email"),
    ("pt-BR", "pt_br_confirmation_email"),
];

pub fn confirmation_message_for(lang: &str) -> Option<&'static str> {
    CONFIRMATION_MESSAGES
        .iter()
        .find(|(code, _)| code.eq_ignore_ascii_case(lang))
        .map(|(_, message_id)| *message_id)
}

/// An empty code is always accepted, as is any catalog language. A 2 or 5
/// character code (`en`, `en-US`) also matches on its first two letters.
pub fn language_code_is_valid<S: AsRef<str>>(code: &str, known_languages: &[S]) -> bool {
    let code = code.trim();

    if code.is_empty()
        || known_languages
            .iter()
            .any(|known| known.as_ref().eq_ignore_ascii_case(code))
    {
        return true;
    }

    if !matches!(code.chars().count(), 2 | 5) {
        return false;
    }

    let prefix = two_letter_prefix(code);

    known_languages
        .iter()
        .any(|known| two_letter_prefix(known.as_ref()).eq_ignore_ascii_case(prefix))
}

pub(crate) fn two_letter_prefix(code: &str) -> &str {
    code.get(..2).unwrap_or(code)
}
