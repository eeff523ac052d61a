use anyhow::{anyhow, Context, Result};
use common_token::SigningSecret;
use std::env;
use std::net::{IpAddr, SocketAddr};

use crate::oidc::OidcSettings;

pub const DEFAULT_TOKEN_TTL_SECONDS: i64 = 3600;
pub const DEFAULT_ALLOWED_DOMAIN: &str = "student.chula.ac.th";
pub const OAUTH_COOKIE_TTL_SECONDS: i64 = 600;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CookieSameSite {
    Lax,
    Strict,
    None,
}

impl CookieSameSite {
    pub fn as_str(&self) -> &'static str {
        match self {
            CookieSameSite::Lax => "Lax",
            CookieSameSite::Strict => "Strict",
            CookieSameSite::None => "None",
        }
    }
}

/// Process-wide settings, read once at startup and shared through `AppState`.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub token_secret: SigningSecret,
    pub token_ttl_seconds: i64,
    pub token_max_lifetime_seconds: Option<i64>,
    pub allowed_domain: String,
    pub public_base_url: Option<String>,
    pub oidc: OidcSettings,
    pub oauth_cookie_secure: bool,
    pub oauth_cookie_same_site: CookieSameSite,
    pub bind_addr: SocketAddr,
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = lookup("TOKEN_SECRET").context("TOKEN_SECRET must be set")?;
        let token_secret = secret
            .parse::<SigningSecret>()
            .context("TOKEN_SECRET is not usable")?;

        let token_ttl_seconds = lookup("TOKEN_TTL_SECONDS")
            .and_then(|value| value.trim().parse::<i64>().ok())
            .unwrap_or(DEFAULT_TOKEN_TTL_SECONDS)
            .max(1);

        let token_max_lifetime_seconds = lookup("TOKEN_MAX_LIFETIME_SECONDS")
            .and_then(|value| normalize_optional(&value))
            .map(|value| {
                value
                    .parse::<i64>()
                    .ok()
                    .filter(|seconds| *seconds >= 1)
                    .ok_or_else(|| {
                        anyhow!("TOKEN_MAX_LIFETIME_SECONDS must be a positive integer, got '{value}'")
                    })
            })
            .transpose()?;

        let allowed_domain = lookup("ALLOWED_DOMAIN")
            .and_then(|value| normalize_optional(&value))
            .unwrap_or_else(|| DEFAULT_ALLOWED_DOMAIN.to_string())
            .trim_start_matches('@')
            .to_ascii_lowercase();

        let public_base_url = lookup("PUBLIC_BASE_URL")
            .and_then(|value| normalize_optional(&value))
            .map(|value| value.trim_end_matches('/').to_string());

        let client_id = required(&lookup, "GOOGLE_CLIENT_ID")?;
        let client_secret = required(&lookup, "GOOGLE_CLIENT_SECRET")?;
        let redirect_url = required(&lookup, "GOOGLE_REDIRECT_URL")?;
        let oidc = OidcSettings::google(client_id, client_secret, redirect_url);

        let oauth_cookie_secure = lookup("OAUTH_COOKIE_SECURE")
            .map(|value| is_truthy(&value))
            .unwrap_or(true);
        let oauth_cookie_same_site = lookup("OAUTH_COOKIE_SAMESITE")
            .map(|value| parse_same_site(&value))
            .transpose()
            .context("Failed to parse OAUTH_COOKIE_SAMESITE")?
            .unwrap_or(CookieSameSite::Lax);

        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port: u16 = lookup("PORT")
            .and_then(|value| value.parse().ok())
            .unwrap_or(8080);
        let ip: IpAddr = host
            .parse()
            .with_context(|| format!("HOST '{host}' is not an IP address"))?;

        Ok(Self {
            token_secret,
            token_ttl_seconds,
            token_max_lifetime_seconds,
            allowed_domain,
            public_base_url,
            oidc,
            oauth_cookie_secure,
            oauth_cookie_same_site,
            bind_addr: SocketAddr::from((ip, port)),
        })
    }
}

fn required<F>(lookup: &F, key: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .and_then(|value| normalize_optional(&value))
        .ok_or_else(|| anyhow!("{key} must be set"))
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn normalize_optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn parse_same_site(value: &str) -> Result<CookieSameSite> {
    match value.trim().to_ascii_lowercase().as_str() {
        "lax" => Ok(CookieSameSite::Lax),
        "strict" => Ok(CookieSameSite::Strict),
        "none" => Ok(CookieSameSite::None),
        other => Err(anyhow!(
            "Unsupported cookie same-site policy '{other}'. Use Lax, Strict, or None."
        )),
    }
}
