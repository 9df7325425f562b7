use std::collections::HashMap;

use fluent_templates::{
    fluent_bundle::{FluentArgs, FluentValue},
    static_loader, Loader,
};
use once_cell::sync::Lazy;
use unic_langid::{langid, LanguageIdentifier};

use crate::core::config;

static_loader! {
    static LOCALES = {
        locales: "./locales",
        fallback_language: "uk",
        // Copy is sent as HTML; bidi isolation marks would end up inside tags
        customise: |bundle| bundle.set_use_isolating(false),
    };
}

/// Supported languages (code, human-readable name).
pub static SUPPORTED_LANGS: &[(&str, &str)] = &[("uk", "Українська"), ("en", "English")];

static FALLBACK_LANG: LanguageIdentifier = langid!("uk");

/// Language configured through `DEFAULT_LANG`.
pub static DEFAULT_LANG: Lazy<LanguageIdentifier> = Lazy::new(|| lang_from_code(&config::DEFAULT_LANG));

/// Normalizes a language code into a LanguageIdentifier (falls back to Ukrainian).
pub fn lang_from_code(code: &str) -> LanguageIdentifier {
    let normalized = code.split(['-', '_']).next().unwrap_or(code).trim().to_lowercase();

    SUPPORTED_LANGS
        .iter()
        .find(|(c, _)| *c == normalized)
        .and_then(|(c, _)| c.parse().ok())
        .unwrap_or_else(|| FALLBACK_LANG.clone())
}

/// Returns a localized string for the given key.
pub fn t(lang: &LanguageIdentifier, key: &str) -> String {
    LOCALES
        .lookup(lang, key)
        .unwrap_or_else(|| LOCALES.lookup(&FALLBACK_LANG, key).unwrap_or_else(|| key.to_string()))
}

/// Returns a localized string with arguments for interpolation.
pub fn t_args(lang: &LanguageIdentifier, key: &str, args: &FluentArgs) -> String {
    let args_map: HashMap<String, FluentValue> = args.iter().map(|(k, v)| (k.to_string(), v.clone())).collect();

    LOCALES.lookup_with_args(lang, key, &args_map).unwrap_or_else(|| {
        LOCALES
            .lookup_with_args(&FALLBACK_LANG, key, &args_map)
            .unwrap_or_else(|| key.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_known_translation() {
        let uk = lang_from_code("uk");
        let en = lang_from_code("en-US");

        assert_eq!(t(&en, "button-approve"), "✅ Approve");
        assert_eq!(t(&uk, "button-approve"), "✅ Підтвердити");
    }

    #[test]
    fn unknown_language_falls_back_to_ukrainian() {
        assert_eq!(lang_from_code("de"), langid!("uk"));
        assert_eq!(lang_from_code(""), langid!("uk"));
    }

    #[test]
    fn interpolates_arguments_without_isolation_marks() {
        let en = lang_from_code("en");
        let mut args = FluentArgs::new();
        args.set("title", "123-a");
        args.set("group", "Lviv");

        assert_eq!(
            t_args(&en, "territory-added", &args),
            "✅ Territory <b>123-a</b> added to group <b>Lviv</b>."
        );
    }

    #[test]
    fn missing_key_returns_key() {
        let en = lang_from_code("en");
        assert_eq!(t(&en, "no-such-key"), "no-such-key");
    }
}
