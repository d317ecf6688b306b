use crate::modules::config::SessionLifetime;
use crate::modules::session::tokens::SessionToken;
use crate::SESSION_COOKIE;

/// Build the `Set-Cookie` value that hands a session token to the client
pub fn session_cookie(token: &SessionToken, lifetime: SessionLifetime) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax",
        SESSION_COOKIE,
        token.as_str()
    );
    if let Some(secs) = lifetime.max_age_secs() {
        cookie.push_str(&format!("; Max-Age={}", secs));
    }
    cookie
}

/// `Set-Cookie` value that removes the session cookie from this client
pub fn clear_session_cookie() -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE)
}

/// Extract the session token from a `Cookie` request header
pub fn session_from_cookie_header(header: &str) -> Option<&str> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| name.trim() == SESSION_COOKIE)
        .map(|(_, value)| value.trim().trim_matches('"'))
        .filter(|value| !value.is_empty())
}
