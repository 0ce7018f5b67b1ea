//! POSIX locale detection used to default the Link language and country.

use std::sync::LazyLock;

use regex::Regex;

static LOCALE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z]{2,3})(?:[_-]([A-Za-z]{2}))?$").expect("locale regex must compile")
});

/// Environment variables consulted in order, as the C library does.
const LOCALE_VARS: &[&str] = &["LC_ALL", "LC_MESSAGES", "LANG"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locale {
    pub language: String,
    pub country: Option<String>,
}

impl Default for Locale {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            country: Some("US".to_string()),
        }
    }
}

/// Parse a value such as `en_US.UTF-8` or `fr-CA@euro`.
///
/// Returns `None` for the `C`/`POSIX` locales and anything unparseable.
pub fn parse_locale(value: &str) -> Option<Locale> {
    let value = value.trim();
    let value = value.split('@').next().unwrap_or(value);
    let value = value.split('.').next().unwrap_or(value);
    if value.eq_ignore_ascii_case("c") || value.eq_ignore_ascii_case("posix") {
        return None;
    }
    let captures = LOCALE_RE.captures(value)?;
    let language = captures.get(1)?.as_str().to_ascii_lowercase();
    let country = captures.get(2).map(|m| m.as_str().to_ascii_uppercase());
    Some(Locale { language, country })
}

/// Detect the user's locale from the environment, defaulting to `en_US`.
pub fn detect_locale(env: impl Fn(&str) -> Option<String>) -> Locale {
    LOCALE_VARS
        .iter()
        .filter_map(|var| env(var))
        .find(|value| !value.trim().is_empty())
        .and_then(|value| parse_locale(&value))
        .unwrap_or_default()
}
