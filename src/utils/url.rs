//! Endpoint URL construction.

/// Join a base URL and an endpoint path with exactly one slash between them,
/// whatever mix of trailing and leading slashes the inputs carry.
///
/// # Examples
///
/// ```
/// use chatrelay::utils::url::construct_api_url;
///
/// assert_eq!(
///     construct_api_url("http://localhost:3000/", "api/chat"),
///     "http://localhost:3000/api/chat"
/// );
/// assert_eq!(
///     construct_api_url("http://localhost:3000", "/api/chat"),
///     "http://localhost:3000/api/chat"
/// );
/// ```
pub fn construct_api_url(base_url: &str, endpoint: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        endpoint.trim_start_matches('/')
    )
}
