use std::collections::HashSet;
use std::fmt;

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use url::Url;

use crate::error::AppError;

type HmacSha256 = Hmac<Sha256>;

const DISCORD_HOSTS: &[&str] = &[
    "discord.com",
    "discordapp.com",
    "ptb.discord.com",
    "canary.discord.com",
];

const TOKEN_DOMAIN: &[u8] = b"volmon.alert-token.v1";

const ZERO_WIDTH_SPACE: char = '\u{200B}';

/// A structurally valid Discord webhook URL. `Debug` prints the id only.
#[derive(Clone, PartialEq, Eq)]
pub struct WebhookTarget {
    url: Url,
    id: String,
}

impl WebhookTarget {
    /// Accepts `https://<discord host>/api[/vN]/webhooks/<numeric id>/<token>`.
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let url = Url::parse(raw.trim())
            .map_err(|e| AppError::WebhookRejected(format!("not a URL: {}", e)))?;
        if url.scheme() != "https" {
            return Err(AppError::WebhookRejected(format!(
                "scheme must be https, got {}",
                url.scheme()
            )));
        }
        let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
        if !DISCORD_HOSTS.contains(&host.as_str()) {
            return Err(AppError::WebhookRejected(format!(
                "host {} is not a webhook host",
                host
            )));
        }

        let mut segments: Vec<&str> = url
            .path_segments()
            .map(|s| s.filter(|seg| !seg.is_empty()).collect())
            .unwrap_or_default();
        if segments.len() == 5 && is_api_version(segments[1]) {
            segments.remove(1);
        }
        let (id, token) = match segments.as_slice() {
            ["api", "webhooks", id, token] => (*id, *token),
            _ => {
                return Err(AppError::WebhookRejected(
                    "path must be /api/webhooks/<id>/<token>".to_string(),
                ))
            }
        };
        if id.is_empty() || !id.chars().all(|c| c.is_ascii_digit()) {
            return Err(AppError::WebhookRejected(
                "webhook id must be numeric".to_string(),
            ));
        }
        if token.is_empty()
            || !token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(AppError::WebhookRejected(
                "webhook token has unexpected characters".to_string(),
            ));
        }

        let id = id.to_string();
        Ok(Self { url, id })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl fmt::Debug for WebhookTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebhookTarget").field("id", &self.id).finish()
    }
}

fn is_api_version(segment: &str) -> bool {
    segment.len() > 1
        && segment.starts_with('v')
        && segment[1..].chars().all(|c| c.is_ascii_digit())
}

/// Insert a zero-width space after `@` in `@everyone` / `@here` so they are
/// shown as text instead of pinging.
pub fn neutralize_mentions(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    for (i, ch) in text.char_indices() {
        out.push(ch);
        if ch == '@' {
            let rest = &text[i + 1..];
            if starts_with_ignore_case(rest, "everyone") || starts_with_ignore_case(rest, "here") {
                out.push(ZERO_WIDTH_SPACE);
            }
        }
    }
    out
}

fn starts_with_ignore_case(text: &str, word: &str) -> bool {
    text.get(..word.len())
        .map_or(false, |prefix| prefix.eq_ignore_ascii_case(word))
}

/// Short hex fingerprint of a token for logs.
pub fn token_fingerprint(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    hex::encode(&digest[..4])
}

/// MAC over `value` under the fixed domain key. Secret and token are both
/// messages, so equal MACs mean equal bytes.
fn token_mac(value: &[u8]) -> Result<HmacSha256, AppError> {
    let mut mac = HmacSha256::new_from_slice(TOKEN_DOMAIN)
        .map_err(|e| AppError::Config(format!("invalid token domain key: {}", e)))?;
    mac.update(value);
    Ok(mac)
}

/// Constant-time comparison of a presented token against the secret.
fn token_matches(secret: &[u8], token: &[u8]) -> Result<bool, AppError> {
    let expected = token_mac(secret)?.finalize().into_bytes();
    Ok(token_mac(token)?.verify_slice(&expected).is_ok())
}

/// Checks run before every send: webhook allow-list and shared-secret token.
#[derive(Clone)]
pub struct AlertGuard {
    allowed_ids: HashSet<String>,
    secret: Option<String>,
}

impl fmt::Debug for AlertGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlertGuard")
            .field("allowed_ids", &self.allowed_ids)
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl AlertGuard {
    pub fn new<S: AsRef<str>>(allowed_ids: &[S], secret: Option<String>) -> Self {
        Self {
            allowed_ids: allowed_ids
                .iter()
                .map(|id| id.as_ref().trim().to_string())
                .filter(|id| !id.is_empty())
                .collect(),
            secret,
        }
    }

    /// Local sinks (`None`) have no identity to check.
    pub fn check_target(&self, target: Option<&WebhookTarget>) -> Result<(), AppError> {
        match target {
            None => Ok(()),
            Some(t) if self.allowed_ids.contains(t.id()) => Ok(()),
            Some(t) => Err(AppError::WebhookRejected(format!(
                "webhook id {} is not allow-listed",
                t.id()
            ))),
        }
    }

    /// With a secret configured the token must be present and equal; a token
    /// offered without a configured secret is rejected too.
    pub fn check_token(&self, token: Option<&str>) -> Result<(), AppError> {
        match (self.secret.as_deref(), token) {
            (None, None) => Ok(()),
            (Some(secret), Some(token)) => {
                if token_matches(secret.as_bytes(), token.as_bytes())? {
                    Ok(())
                } else {
                    Err(AppError::TokenRejected)
                }
            }
            _ => Err(AppError::TokenRejected),
        }
    }

    pub fn authorize(
        &self,
        target: Option<&WebhookTarget>,
        token: Option<&str>,
    ) -> Result<(), AppError> {
        self.check_target(target)?;
        self.check_token(token)
    }
}
