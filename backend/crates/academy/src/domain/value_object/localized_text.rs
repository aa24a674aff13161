//! Bilingual text
//!
//! Catalog content is authored in Russian and English and stored as JSONB
//! `{ "ru": ..., "en": ... }`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    Ru,
    En,
}

impl Locale {
    /// Lenient parse: anything unrecognized falls back to Russian
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("en") | Some("en-us") | Some("en-gb") => Locale::En,
            _ => Locale::Ru,
        }
    }

    pub const fn code(&self) -> &'static str {
        match self {
            Locale::Ru => "ru",
            Locale::En => "en",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LocalizedText {
    #[serde(default)]
    pub ru: String,
    #[serde(default)]
    pub en: String,
}

impl LocalizedText {
    pub fn new(ru: impl Into<String>, en: impl Into<String>) -> Self {
        Self {
            ru: ru.into(),
            en: en.into(),
        }
    }

    /// Text in the requested locale, or the other one if that translation is
    /// missing.
    pub fn get(&self, locale: Locale) -> &str {
        let (preferred, fallback) = match locale {
            Locale::Ru => (&self.ru, &self.en),
            Locale::En => (&self.en, &self.ru),
        };
        if preferred.trim().is_empty() {
            fallback
        } else {
            preferred
        }
    }
}
