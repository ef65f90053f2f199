use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::auth::{token_from_headers, TokenService};

pub const SIGN_IN_PATH: &str = "/sign-in";

/// Paths that pass the gate without a session, together with everything
/// beneath them.
pub const PUBLIC_PATHS: &[&str] = &[
    "/sign-in",
    "/sign-up",
    "/health",
    "/api/auth/sign-in",
    "/api/auth/sign-up",
    "/api/auth/validate-token",
    "/api/auth/set-password",
];

pub fn is_public_path(path: &str) -> bool {
    PUBLIC_PATHS.iter().any(|public| {
        path == *public
            || path
                .strip_prefix(public)
                .is_some_and(|rest| rest.starts_with('/'))
    })
}

/// Lets allow-listed paths through; everything else needs a session token
/// that verifies and is not a one-time invite token, or the client is
/// redirected to sign-in. The request is
/// forwarded unchanged.
pub async fn session_gate(State(tokens): State<TokenService>, request: Request, next: Next) -> Response {
    let path = request.uri().path();
    if is_public_path(path) {
        return next.run(request).await;
    }

    let Some(token) = token_from_headers(request.headers()) else {
        tracing::debug!("No session token for {}, redirecting", path);
        return Redirect::temporary(SIGN_IN_PATH).into_response();
    };

    match tokens.verify(&token) {
        Ok(claims) if !claims.is_one_time() => {}
        Ok(_) => {
            tracing::debug!("One-time token presented as session for {}, redirecting", path);
            return Redirect::temporary(SIGN_IN_PATH).into_response();
        }
        Err(_) => {
            tracing::debug!("Invalid session token for {}, redirecting", path);
            return Redirect::temporary(SIGN_IN_PATH).into_response();
        }
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, StatusCode},
        middleware::from_fn_with_state,
        routing::get,
        Router,
    };
    use chrono::Duration;
    use tower::ServiceExt;
    use uuid::Uuid;

    fn tokens() -> TokenService {
        TokenService::new("gate-secret", Duration::hours(1), Duration::hours(1))
    }

    fn app() -> Router {
        Router::new()
            .route("/api/blog", get(|| async { "blogs" }))
            .route("/api/auth/sign-in", get(|| async { "sign in" }))
            .route("/api/auth/set-password/extra", get(|| async { "nested" }))
            .route("/api/auth/sign-inx", get(|| async { "lookalike" }))
            .layer(from_fn_with_state(tokens(), session_gate))
    }

    fn get_req(uri: &str) -> axum::http::request::Builder {
        axum::http::Request::builder().uri(uri)
    }

    fn assert_redirected(response: &Response) {
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(response.headers()[header::LOCATION], SIGN_IN_PATH);
    }

    #[test]
    fn allow_list_matches_whole_segments() {
        assert!(is_public_path("/sign-in"));
        assert!(is_public_path("/api/auth/validate-token"));
        assert!(is_public_path("/api/auth/set-password/extra"));
        assert!(!is_public_path("/api/auth/sign-inx"));
        assert!(!is_public_path("/api/auth/send-invite"));
        assert!(!is_public_path("/api/blog"));
    }

    #[tokio::test]
    async fn public_paths_pass_without_token() {
        let response = app()
            .oneshot(get_req("/api/auth/sign-in").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app()
            .oneshot(get_req("/api/auth/set-password/extra").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn missing_token_redirects() {
        let response = app()
            .oneshot(get_req("/api/blog").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_redirected(&response);

        let response = app()
            .oneshot(get_req("/api/auth/sign-inx").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_redirected(&response);
    }

    #[tokio::test]
    async fn invalid_token_redirects() {
        let foreign = TokenService::new("other", Duration::hours(1), Duration::hours(1))
            .issue_session_token(Uuid::new_v4())
            .unwrap();
        let response = app()
            .oneshot(
                get_req("/api/blog")
                    .header(header::COOKIE, format!("token={}", foreign))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_redirected(&response);
    }

    #[tokio::test]
    async fn expired_token_redirects() {
        let expired = TokenService::new("gate-secret", Duration::hours(-1), Duration::hours(-1))
            .issue_session_token(Uuid::new_v4())
            .unwrap();
        let response = app()
            .oneshot(
                get_req("/api/blog")
                    .header(header::COOKIE, format!("token={}", expired))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_redirected(&response);
    }

    #[tokio::test]
    async fn valid_cookie_or_bearer_passes() {
        let token = tokens().issue_session_token(Uuid::new_v4()).unwrap();

        let response = app()
            .oneshot(
                get_req("/api/blog")
                    .header(header::COOKIE, format!("theme=dark; token={}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app()
            .oneshot(
                get_req("/api/blog")
                    .header(header::AUTHORIZATION, format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn invite_token_is_not_a_session() {
        let invite = tokens().issue_one_time_token(Uuid::new_v4()).unwrap();

        let response = app()
            .oneshot(
                get_req("/api/blog")
                    .header(header::AUTHORIZATION, format!("Bearer {}", invite))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_redirected(&response);

        let response = app()
            .oneshot(
                get_req("/api/blog")
                    .header(header::COOKIE, format!("token={}", invite))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_redirected(&response);
    }
}
