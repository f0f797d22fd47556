/// Profanity filter for free-text form fields
///
/// Registration, news and bonus question forms run their text through a
/// [`ProfanityFilter`]. The HTTP filter asks a remote service and fails open:
/// when the service is down or answers nonsense the text is accepted and the
/// failure is logged.

use async_trait::async_trait;
use serde::Deserialize;

#[async_trait]
pub trait ProfanityFilter: Send + Sync {
    async fn is_profane(&self, text: &str) -> bool;
}

/// Accepts everything
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledProfanityFilter;

#[async_trait]
impl ProfanityFilter for DisabledProfanityFilter {
    async fn is_profane(&self, _text: &str) -> bool {
        false
    }
}

/// Queries `{url}?q=<text>` and expects `{"response": "true" | "false"}`
#[derive(Debug, Clone)]
pub struct HttpProfanityFilter {
    client: reqwest::Client,
    url: String,
}

#[derive(Debug, Deserialize)]
struct FilterResponse {
    response: String,
}

impl HttpProfanityFilter {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    async fn query(&self, text: &str) -> Result<bool, String> {
        let response = self
            .client
            .get(&self.url)
            .query(&[("q", text)])
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            return Err(format!("status {}", response.status()));
        }

        let body: FilterResponse = response.json().await.map_err(|e| e.to_string())?;

        body.response
            .trim()
            .parse::<bool>()
            .map_err(|e| format!("unexpected answer {:?}: {}", body.response, e))
    }
}

#[async_trait]
impl ProfanityFilter for HttpProfanityFilter {
    async fn is_profane(&self, text: &str) -> bool {
        let text = separate_words(text);
        if text.trim().is_empty() {
            return false;
        }

        match self.query(&text).await {
            Ok(profane) => profane,
            Err(error) => {
                tracing::error!(error = %error, "Profanity filter unavailable, accepting input");
                false
            }
        }
    }
}

/// Replaces every run of non-word characters with a single space
///
/// Keeps the service from missing words glued together by punctuation.
///
/// # Example
///
/// ```
/// use nhc_shared::profanity::separate_words;
///
/// assert_eq!(separate_words("hello,,world!!"), "hello world ");
/// ```
pub fn separate_words(text: &str) -> String {
    let mut output = String::with_capacity(text.len());
    let mut in_separator = false;

    for c in text.chars() {
        if c.is_alphanumeric() || c == '_' {
            output.push(c);
            in_separator = false;
        } else if !in_separator {
            output.push(' ');
            in_separator = true;
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_separate_words() {
        assert_eq!(separate_words("plain"), "plain");
        assert_eq!(separate_words("a.b-c"), "a b c");
        assert_eq!(separate_words("  spaced   out "), " spaced out ");
        assert_eq!(separate_words("snake_case ok"), "snake_case ok");
        assert_eq!(separate_words("..."), " ");
    }

    #[tokio::test]
    async fn test_disabled_filter_accepts_everything() {
        assert!(!DisabledProfanityFilter.is_profane("anything at all").await);
    }

    #[tokio::test]
    async fn test_unreachable_service_fails_open() {
        let filter = HttpProfanityFilter::new(reqwest::Client::new(), "http://127.0.0.1:1/profanity");
        assert!(!filter.is_profane("some words").await);
    }
}
