//! Cookie-based session affinity.
//!
//! # Responsibilities
//! - Read the preferred server name from the request's cookies
//! - Write the actually selected server name back to the client
//!
//! # Design Decisions
//! - A missing cookie is not an error; an unreadable `Cookie` header is
//!   logged and treated as no preference, it never fails the request
//! - The response cookie is appended so a backend's own cookies survive
//! - The cookie always names the server that served the request, so a
//!   fallback away from an unhealthy preference corrects the client

use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue};

use crate::config::StickyCookieConfig;

/// Sticky session cookie settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StickyCookie {
    pub name: String,
    pub secure: bool,
    pub http_only: bool,
}

impl StickyCookie {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            secure: false,
            http_only: false,
        }
    }

    /// Preferred server name carried by the request, if any.
    pub fn preferred(&self, headers: &HeaderMap) -> Option<String> {
        for value in headers.get_all(COOKIE) {
            let raw = match value.to_str() {
                Ok(raw) => raw,
                Err(e) => {
                    tracing::warn!(cookie = %self.name, error = %e, "Error while reading cookie");
                    continue;
                }
            };
            let found = raw
                .split(';')
                .filter_map(|pair| pair.trim().split_once('='))
                .find(|(name, _)| *name == self.name)
                .map(|(_, value)| value.trim_matches('"').to_string());
            if found.is_some() {
                return found;
            }
        }
        None
    }

    /// `Set-Cookie` value binding the client to `server`.
    pub fn set_cookie_value(&self, server: &str) -> String {
        let mut cookie = format!("{}={}; Path=/", self.name, server);
        if self.http_only {
            cookie.push_str("; HttpOnly");
        }
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }

    /// Append the affinity cookie for `server` to response headers.
    ///
    /// Names that are not valid cookie values are skipped with a warning.
    pub fn apply(&self, headers: &mut HeaderMap, server: &str) {
        if !is_valid_cookie_value(server) {
            tracing::warn!(cookie = %self.name, server = %server, "Server name is not a valid cookie value");
            return;
        }
        match HeaderValue::from_str(&self.set_cookie_value(server)) {
            Ok(value) => {
                headers.append(SET_COOKIE, value);
            }
            Err(e) => {
                tracing::warn!(cookie = %self.name, server = %server, error = %e, "Cannot encode sticky cookie");
            }
        }
    }
}

/// True when `value` is made only of RFC 6265 cookie-octets, so it can be
/// sent unquoted without touching the cookie attributes.
pub fn is_valid_cookie_value(value: &str) -> bool {
    value
        .bytes()
        .all(|b| matches!(b, 0x21 | 0x23..=0x2B | 0x2D..=0x3A | 0x3C..=0x5B | 0x5D..=0x7E))
}

impl From<&StickyCookieConfig> for StickyCookie {
    fn from(config: &StickyCookieConfig) -> Self {
        Self {
            name: config.name.clone(),
            secure: config.secure,
            http_only: config.http_only,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(cookies: &[&str]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for c in cookies {
            headers.append(COOKIE, HeaderValue::from_str(c).unwrap());
        }
        headers
    }

    #[test]
    fn test_preferred_from_cookie() {
        let sticky = StickyCookie::new("lb");
        assert_eq!(sticky.preferred(&headers(&["a=1; lb=s2; b=3"])), Some("s2".into()));
        assert_eq!(sticky.preferred(&headers(&["a=1", "lb=s3"])), Some("s3".into()));
        assert_eq!(sticky.preferred(&headers(&["lb=\"s4\""])), Some("s4".into()));
    }

    #[test]
    fn test_missing_cookie() {
        let sticky = StickyCookie::new("lb");
        assert_eq!(sticky.preferred(&HeaderMap::new()), None);
        assert_eq!(sticky.preferred(&headers(&["other=s1; lbx=s2"])), None);
    }

    #[test]
    fn test_unreadable_cookie_is_ignored() {
        let sticky = StickyCookie::new("lb");
        let mut headers = HeaderMap::new();
        headers.append(COOKIE, HeaderValue::from_bytes(b"lb=\xffbad").unwrap());
        assert_eq!(sticky.preferred(&headers), None);

        headers.append(COOKIE, HeaderValue::from_static("lb=s1"));
        assert_eq!(sticky.preferred(&headers), Some("s1".into()));
    }

    #[test]
    fn test_set_cookie_flags() {
        let mut sticky = StickyCookie::new("lb");
        assert_eq!(sticky.set_cookie_value("s1"), "lb=s1; Path=/");

        sticky.http_only = true;
        sticky.secure = true;
        assert_eq!(sticky.set_cookie_value("s1"), "lb=s1; Path=/; HttpOnly; Secure");
    }

    #[test]
    fn test_apply_appends() {
        let sticky = StickyCookie::new("lb");
        let mut headers = HeaderMap::new();
        headers.append(SET_COOKIE, HeaderValue::from_static("session=abc"));
        sticky.apply(&mut headers, "s2");

        let values: Vec<_> = headers.get_all(SET_COOKIE).iter().collect();
        assert_eq!(values.len(), 2);
        assert_eq!(values[1], "lb=s2; Path=/");
    }

    #[test]
    fn test_cookie_value_charset() {
        assert!(is_valid_cookie_value("blue-1"));
        assert!(is_valid_cookie_value("svc_2.internal:8080"));
        assert!(!is_valid_cookie_value("a;b"));
        assert!(!is_valid_cookie_value("a b"));
        assert!(!is_valid_cookie_value("a,b"));
        assert!(!is_valid_cookie_value("\"quoted\""));
        assert!(!is_valid_cookie_value("caf\u{e9}"));
    }

    #[test]
    fn test_apply_skips_invalid_value() {
        let sticky = StickyCookie::new("lb");
        let mut headers = HeaderMap::new();
        sticky.apply(&mut headers, "s1; Domain=evil.example");
        assert!(headers.get(SET_COOKIE).is_none());
    }
}
