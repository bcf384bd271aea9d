//! Auth cookie helpers
//!
//! Both tokens travel as `HttpOnly`, `SameSite=Lax` cookies scoped to `/`.
//! `Secure` follows [`AuthConfig::cookie_secure`] so plain-HTTP development
//! setups can still log in.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use gatehouse_core::AuthConfig;
use time::{Duration, OffsetDateTime};

pub const ACCESS_COOKIE: &str = "access_token";
pub const REFRESH_COOKIE: &str = "refresh_token";

fn auth_cookie(name: &'static str, value: String, max_age_secs: i64, secure: bool) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(Duration::seconds(max_age_secs))
        .build()
}

/// Attach freshly minted tokens to the response jar
pub fn set_auth_cookies(
    jar: CookieJar,
    access_token: String,
    refresh_token: String,
    config: &AuthConfig,
) -> CookieJar {
    jar.add(auth_cookie(
        ACCESS_COOKIE,
        access_token,
        config.access_ttl_secs as i64,
        config.cookie_secure,
    ))
    .add(auth_cookie(
        REFRESH_COOKIE,
        refresh_token,
        config.refresh_ttl_secs as i64,
        config.cookie_secure,
    ))
}

/// Overwrite both auth cookies with empty, already-expired values
pub fn clear_auth_cookies(jar: CookieJar, config: &AuthConfig) -> CookieJar {
    let expired = OffsetDateTime::now_utc() - Duration::hours(1);

    [ACCESS_COOKIE, REFRESH_COOKIE]
        .into_iter()
        .fold(jar, |jar, name| {
            let mut cookie = auth_cookie(name, String::new(), 0, config.cookie_secure);
            cookie.set_expires(expired);
            jar.add(cookie)
        })
}

/// Value of a named cookie, if the client sent one
pub fn cookie_value(jar: &CookieJar, name: &str) -> Option<String> {
    jar.get(name).map(|c| c.value().to_string())
}
