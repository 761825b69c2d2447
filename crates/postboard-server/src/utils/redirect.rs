use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS, NON_ALPHANUMERIC};

/// Characters left literal in a `next` query value.
const NEXT_PARAM: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Characters escaped before a URI goes into a `Location` header.
const LOCATION: &AsciiSet = &CONTROLS.add(b' ').add(b'"').add(b'<').add(b'>');

/// A `302 Found` redirect.
#[derive(Debug, Clone)]
pub struct Found(HeaderValue);

impl Found {
    pub fn to(uri: &str) -> Self {
        let encoded = utf8_percent_encode(uri, LOCATION).to_string();
        let location = HeaderValue::from_str(&encoded).unwrap_or_else(|_| HeaderValue::from_static("/"));
        Self(location)
    }
}

impl IntoResponse for Found {
    fn into_response(self) -> Response {
        (StatusCode::FOUND, [(header::LOCATION, self.0)]).into_response()
    }
}

/// `<login_url>?next=<path_and_query>`
pub fn login_url_with_next(login_url: &str, next: &str) -> String {
    format!("{}?next={}", login_url, utf8_percent_encode(next, NEXT_PARAM))
}

/// Only local absolute paths are followed after login.
pub fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => path,
        _ => "/",
    }
}
