use axum::http::{header, HeaderMap, HeaderValue};

pub const SESSION_COOKIE: &str = "token";

/// `Set-Cookie` value carrying a session token.
pub fn session_cookie(token: &str, max_age_days: i64, secure: bool) -> HeaderValue {
    let max_age = max_age_days * 24 * 60 * 60;
    let mut cookie = format!(
        "{}={}; HttpOnly; Path=/; Max-Age={}; SameSite=Lax",
        SESSION_COOKIE, token, max_age
    );
    if secure {
        cookie.push_str("; Secure");
    }
    // JWTs are base64url with dots, always a valid header value
    HeaderValue::from_str(&cookie).unwrap_or_else(|_| clear_session_cookie(secure))
}

/// `Set-Cookie` value that expires the session cookie immediately.
pub fn clear_session_cookie(secure: bool) -> HeaderValue {
    if secure {
        HeaderValue::from_static("token=; HttpOnly; Path=/; Max-Age=0; SameSite=Lax; Secure")
    } else {
        HeaderValue::from_static("token=; HttpOnly; Path=/; Max-Age=0; SameSite=Lax")
    }
}

/// Reads the session token from the `token` cookie, falling back to a
/// `Authorization: Bearer` header.
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    let from_cookie = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty());

    from_cookie.or_else(|| {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
    })
}
