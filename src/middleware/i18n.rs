// src/middleware/i18n.rs

use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};

// Idiomas com mensagens traduzidas. O primeiro é o padrão.
const SUPPORTED_LANGUAGES: [&str; 3] = ["es", "en", "pt"];

// Nosso extrator de idioma
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locale(pub String);

impl Locale {
    pub fn lang(&self) -> &str {
        &self.0
    }

    /// Escolhe o texto no idioma do usuário (espanhol quando não for en/pt).
    pub fn pick<'a>(&self, es: &'a str, en: &'a str, pt: &'a str) -> &'a str {
        match self.lang() {
            "en" => en,
            "pt" => pt,
            _ => es,
        }
    }

    /// Escolhe o primeiro idioma suportado do cabeçalho Accept-Language.
    pub fn from_accept_language(header_str: &str) -> Self {
        // "pt-BR" -> "pt", "en" -> "en"
        accept_language::parse(header_str)
            .iter()
            .filter_map(|tag| tag.split('-').next())
            .find_map(|lang| {
                SUPPORTED_LANGUAGES
                    .iter()
                    .find(|supported| supported.eq_ignore_ascii_case(lang))
            })
            .map(|lang| Locale(lang.to_string()))
            .unwrap_or_default()
    }
}

impl Default for Locale {
    fn default() -> Self {
        Locale(SUPPORTED_LANGUAGES[0].to_string())
    }
}

impl<S> FromRequestParts<S> for Locale
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let locale = parts
            .headers
            .get(header::ACCEPT_LANGUAGE)
            .and_then(|header_value| header_value.to_str().ok())
            .map(Locale::from_accept_language)
            .unwrap_or_default();

        Ok(locale)
    }
}
