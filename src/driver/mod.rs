pub mod bridge;
pub mod load;
pub mod traits;
pub mod web;

/// Join a possibly relative URL onto a base URL
///
/// Absolute `http(s)://` URLs and URLs without a base pass through unchanged.
pub fn join_url(base: Option<&str>, url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        return url.to_string();
    }
    match base {
        Some(base) if url.is_empty() => base.to_string(),
        Some(base) => format!(
            "{}/{}",
            base.trim_end_matches('/'),
            url.trim_start_matches('/')
        ),
        None => url.to_string(),
    }
}
