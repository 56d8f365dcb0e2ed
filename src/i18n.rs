use std::collections::HashMap;

use axum::http::{header, HeaderMap};
use lazy_static::lazy_static;

pub const DEFAULT_LOCALE: &str = "en";

lazy_static! {
    static ref CATALOG: HashMap<(&'static str, &'static str), &'static str> = {
        let mut m = HashMap::new();
        m.insert(("en", "flash.user_created_successfully"), "User successfully created");
        m.insert(("en", "flash.user_updated_successfully"), "User successfully updated");
        m.insert(("en", "flash.user_deleted_successfully"), "User successfully deleted");
        m.insert(("en", "flash.admin_delete_denied"), "You cannot delete your own account");
        m.insert(("en", "flash.image_error"), "Image upload rejected:");
        m.insert(
            ("en", "api.show_error_image"),
            "Please upload a valid image (jpeg/jpg/gif/png, at most 1 MiB, at least 100x100)",
        );

        m.insert(("de", "flash.user_created_successfully"), "Benutzer erfolgreich angelegt");
        m.insert(("de", "flash.user_updated_successfully"), "Benutzer erfolgreich aktualisiert");
        m.insert(("de", "flash.user_deleted_successfully"), "Benutzer erfolgreich gelöscht");
        m.insert(("de", "flash.admin_delete_denied"), "Das eigene Konto kann nicht gelöscht werden");
        m.insert(("de", "flash.image_error"), "Bild-Upload abgelehnt:");
        m.insert(
            ("de", "api.show_error_image"),
            "Bitte ein gültiges Bild hochladen (jpeg/jpg/gif/png, maximal 1 MiB, mindestens 100x100)",
        );
        m
    };
}

/// Message-key lookup with English fallback for unknown locales or keys.
#[derive(Debug, Default, Clone)]
pub struct Translator;

impl Translator {
    pub fn translate(&self, key: &str, locale: &str) -> String {
        CATALOG
            .get(&(locale, key))
            .or_else(|| CATALOG.get(&(DEFAULT_LOCALE, key)))
            .map(|s| s.to_string())
            .unwrap_or_else(|| key.to_string())
    }
}

/// Primary language subtag of the `Accept-Language` header, default `en`.
pub fn locale_from_headers(headers: &HeaderMap) -> String {
    headers
        .get(header::ACCEPT_LANGUAGE)
        .and_then(|v| v.to_str().ok())
        .and_then(|raw| raw.split(',').next())
        .map(|tag| {
            tag.split(';')
                .next()
                .unwrap_or(tag)
                .trim()
                .split('-')
                .next()
                .unwrap_or(DEFAULT_LOCALE)
                .to_ascii_lowercase()
        })
        .filter(|tag| !tag.is_empty() && *tag != "*")
        .unwrap_or_else(|| DEFAULT_LOCALE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn translates_known_keys() {
        let t = Translator;
        assert_eq!(
            t.translate("flash.user_created_successfully", "en"),
            "User successfully created"
        );
        assert_eq!(
            t.translate("flash.user_created_successfully", "de"),
            "Benutzer erfolgreich angelegt"
        );
    }

    #[test]
    fn unknown_locale_falls_back_to_english() {
        let t = Translator;
        assert_eq!(
            t.translate("flash.user_deleted_successfully", "fr"),
            "User successfully deleted"
        );
    }

    #[test]
    fn unknown_key_echoes_the_key() {
        let t = Translator;
        assert_eq!(t.translate("flash.nope", "en"), "flash.nope");
    }

    #[test]
    fn locale_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(locale_from_headers(&headers), "en");

        headers.insert(
            header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("de-DE,de;q=0.9,en;q=0.8"),
        );
        assert_eq!(locale_from_headers(&headers), "de");

        headers.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static("*"));
        assert_eq!(locale_from_headers(&headers), "en");

        headers.insert(
            header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("FR;q=0.5"),
        );
        assert_eq!(locale_from_headers(&headers), "fr");
    }
}
