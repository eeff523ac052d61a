use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue};
use axum::response::Response;
use tracing::warn;

use crate::config::{CookieSameSite, ServiceConfig};

/// Attributes shared by the short-lived sign-in cookies.
#[derive(Debug, Clone, Copy)]
pub struct CookiePolicy {
    pub secure: bool,
    pub same_site: CookieSameSite,
}

impl CookiePolicy {
    pub fn from_config(config: &ServiceConfig) -> Self {
        Self {
            secure: config.oauth_cookie_secure,
            same_site: config.oauth_cookie_same_site,
        }
    }

    pub fn build(&self, name: &str, value: &str, max_age_seconds: i64) -> String {
        let mut cookie = format!(
            "{name}={value}; Path=/; Max-Age={max_age_seconds}; HttpOnly; SameSite={}",
            self.same_site.as_str()
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }

    pub fn clear(&self, name: &str) -> String {
        self.build(name, "", 0)
    }
}

pub fn append_set_cookie(response: &mut Response, cookie: &str) {
    match HeaderValue::from_str(cookie) {
        Ok(value) => {
            response.headers_mut().append(SET_COOKIE, value);
        }
        Err(err) => warn!(error = %err, "dropping cookie with invalid header value"),
    }
}

/// Look up a cookie by name across every `Cookie` header of the request.
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_sets_security_attributes() {
        let policy = CookiePolicy {
            secure: true,
            same_site: CookieSameSite::Lax,
        };
        let cookie = policy.build("oauth_state", "abc", 600);
        assert_eq!(
            cookie,
            "oauth_state=abc; Path=/; Max-Age=600; HttpOnly; SameSite=Lax; Secure"
        );
        assert_eq!(
            policy.clear("oauth_state"),
            "oauth_state=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax; Secure"
        );
    }

    #[test]
    fn insecure_policy_omits_secure_flag() {
        let policy = CookiePolicy {
            secure: false,
            same_site: CookieSameSite::Strict,
        };
        assert!(!policy.build("a", "b", 1).contains("Secure"));
        assert!(policy.build("a", "b", 1).contains("SameSite=Strict"));
    }

    #[test]
    fn read_cookie_finds_value_among_many() {
        let mut headers = HeaderMap::new();
        headers.append(COOKIE, HeaderValue::from_static("theme=dark; oauth_state=s1"));
        headers.append(COOKIE, HeaderValue::from_static("oauth_nonce=n1"));
        headers.append(COOKIE, HeaderValue::from_static("empty="));

        assert_eq!(read_cookie(&headers, "oauth_state").as_deref(), Some("s1"));
        assert_eq!(read_cookie(&headers, "oauth_nonce").as_deref(), Some("n1"));
        assert_eq!(read_cookie(&headers, "empty"), None);
        assert_eq!(read_cookie(&headers, "missing"), None);
    }
}
