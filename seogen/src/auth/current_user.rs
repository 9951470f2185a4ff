use crate::{
    AppState,
    api::models::users::CurrentUser,
    errors::{Error, Result},
    types::abbrev_uuid,
};
use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header, request::Parts},
};
use tracing::{debug, instrument, trace, warn};

/// Access token from the session cookie, falling back to an `Authorization: Bearer` header.
fn session_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let from_cookie = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|cookie| cookie.trim().split_once('='))
        .find(|(name, value)| *name == cookie_name && !value.is_empty())
        .map(|(_, value)| value.to_string());

    from_cookie.or_else(|| {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(str::to_string)
    })
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Error;

    #[instrument(skip_all)]
    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let Some(token) = session_token(&parts.headers, &state.config.supabase.session_cookie) else {
            trace!("No session credentials found in request");
            return Err(Error::Unauthenticated);
        };

        match state.auth.get_user(&token).await {
            Ok(Some(user)) => {
                let user = CurrentUser::from(user);
                debug!(user_id = %abbrev_uuid(&user.id), role = %user.role, "Resolved session user");
                Ok(user)
            }
            Ok(None) => {
                trace!("Session token rejected by auth service");
                Err(Error::Unauthenticated)
            }
            // An unreachable auth service is indistinguishable from no session for the caller
            Err(e) => {
                warn!("Session lookup failed: {e}");
                Err(Error::Unauthenticated)
            }
        }
    }
}

/// A caller with the `admin` role.
#[derive(Debug, Clone)]
pub struct AdminUser(pub CurrentUser);

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let user = CurrentUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            debug!(user_id = %abbrev_uuid(&user.id), role = %user.role, "Admin route refused");
            return Err(Error::Forbidden);
        }
        Ok(AdminUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(header::HeaderName, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(name.clone(), HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn test_token_from_cookie() {
        let map = headers(&[(header::COOKIE, "theme=dark; sb-access-token=abc.def; other=1")]);
        assert_eq!(session_token(&map, "sb-access-token").as_deref(), Some("abc.def"));
    }

    #[test]
    fn test_token_from_bearer_header() {
        let map = headers(&[(header::AUTHORIZATION, "Bearer xyz")]);
        assert_eq!(session_token(&map, "sb-access-token").as_deref(), Some("xyz"));
    }

    #[test]
    fn test_cookie_wins_over_header() {
        let map = headers(&[(header::COOKIE, "sb-access-token=from-cookie"), (header::AUTHORIZATION, "Bearer from-header")]);
        assert_eq!(session_token(&map, "sb-access-token").as_deref(), Some("from-cookie"));
    }

    #[test]
    fn test_no_credentials() {
        let map = headers(&[(header::COOKIE, "sb-access-token="), (header::AUTHORIZATION, "Basic abc")]);
        assert_eq!(session_token(&map, "sb-access-token"), None);
    }
}
