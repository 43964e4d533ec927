use actix_web::http::header::{HeaderMap, AUTHORIZATION};

use crate::error::{AppError, AuthError};

const API_KEY_SCHEME: &str = "ApiKey";

/// Split `Authorization` into its two whitespace-separated parts
fn authorization_parts(headers: &HeaderMap) -> Result<(&str, &str), AppError> {
    let header = headers
        .get(AUTHORIZATION)
        .ok_or(AppError::Auth(AuthError::MissingCredential))?;

    let header = header
        .to_str()
        .map_err(|_| AppError::Auth(AuthError::MalformedCredential))?;

    let parts: Vec<&str> = header.split_whitespace().collect();
    match parts.as_slice() {
        [scheme, value] => Ok((*scheme, *value)),
        _ => Err(AppError::Auth(AuthError::MalformedCredential)),
    }
}

/// Pull the presented token out of the `Authorization` header.
///
/// The header must split on whitespace into exactly two parts, scheme and
/// value. The value is returned verbatim; checking it is the caller's job.
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<String, AppError> {
    authorization_parts(headers).map(|(_, token)| token.to_string())
}

/// Pull a webhook key out of an `Authorization: ApiKey <key>` header.
///
/// Unlike bearer extraction the scheme is checked, since the header is the
/// only thing telling an API key apart from a token.
pub fn extract_api_key(headers: &HeaderMap) -> Result<String, AppError> {
    match authorization_parts(headers)? {
        (scheme, key) if scheme.eq_ignore_ascii_case(API_KEY_SCHEME) => Ok(key.to_string()),
        _ => Err(AppError::Auth(AuthError::MalformedCredential)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::header::HeaderValue;

    fn headers(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static(value));
        headers
    }

    fn kind(result: Result<String, AppError>) -> AuthError {
        result.unwrap_err().auth_kind().cloned().unwrap()
    }

    #[test]
    fn test_extracts_bearer_value() {
        assert_eq!(extract_bearer_token(&headers("Bearer abc123")).unwrap(), "abc123");
    }

    #[test]
    fn test_extra_whitespace_is_tolerated() {
        assert_eq!(extract_bearer_token(&headers("Bearer   abc123 ")).unwrap(), "abc123");
    }

    #[test]
    fn test_missing_header() {
        assert_eq!(kind(extract_bearer_token(&HeaderMap::new())), AuthError::MissingCredential);
    }

    #[test]
    fn test_missing_scheme() {
        assert_eq!(
            kind(extract_bearer_token(&headers("abc123"))),
            AuthError::MalformedCredential
        );
    }

    #[test]
    fn test_too_many_parts() {
        assert_eq!(
            kind(extract_bearer_token(&headers("Bearer abc 123"))),
            AuthError::MalformedCredential
        );
    }

    #[test]
    fn test_empty_header() {
        assert_eq!(kind(extract_bearer_token(&headers(""))), AuthError::MalformedCredential);
    }

    #[test]
    fn test_non_ascii_header() {
        let mut map = HeaderMap::new();
        map.insert(
            AUTHORIZATION,
            HeaderValue::from_bytes(b"Bearer \xfftoken").unwrap(),
        );
        assert_eq!(kind(extract_bearer_token(&map)), AuthError::MalformedCredential);
    }

    #[test]
    fn test_extracts_api_key() {
        assert_eq!(
            extract_api_key(&headers("ApiKey f271c81ff7084ee5b99a5091b42d486e")).unwrap(),
            "f271c81ff7084ee5b99a5091b42d486e"
        );
    }

    #[test]
    fn test_api_key_requires_its_scheme() {
        assert_eq!(
            kind(extract_api_key(&headers("Bearer f271c81ff7084ee5b99a5091b42d486e"))),
            AuthError::MalformedCredential
        );
        assert_eq!(
            kind(extract_api_key(&headers("f271c81ff7084ee5b99a5091b42d486e"))),
            AuthError::MalformedCredential
        );
        assert_eq!(kind(extract_api_key(&HeaderMap::new())), AuthError::MissingCredential);
    }
}
