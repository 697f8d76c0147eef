use url::Url;

/// Extracts the network location (host and optional port) from a URL
///
/// # Arguments
///
/// * `url` - The URL string to inspect
///
/// # Returns
///
/// * `Some(String)` - The lowercase host, followed by `:port` when a
///   non-default port is present
/// * `None` - If the URL cannot be parsed or has no host
///
/// # Examples
///
/// ```
/// use webcheck::url::extract_netloc;
///
/// assert_eq!(extract_netloc("http://Example.com:8080/x"), Some("example.com:8080".to_string()));
/// assert_eq!(extract_netloc("mailto:someone@example.com"), None);
/// ```
pub fn extract_netloc(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?.to_lowercase();
    match parsed.port() {
        Some(port) => Some(format!("{}:{}", host, port)),
        None => Some(host),
    }
}

/// Returns the `scheme://netloc` part of a URL
///
/// This identifies a site for per-site state such as robots.txt.
pub fn site_location(url: &str) -> Option<String> {
    let scheme = extract_scheme(url)?;
    let netloc = extract_netloc(url)?;
    Some(format!("{}://{}", scheme, netloc))
}

/// Extracts the lowercase scheme from a URL, if it has a syntactically
/// valid one
pub fn extract_scheme(url: &str) -> Option<String> {
    let (scheme, _) = url.split_once(':')?;
    let mut chars = scheme.chars();
    let first = chars.next()?;
    if !first.is_ascii_alphabetic()
        || !chars.all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.')
    {
        return None;
    }
    Some(scheme.to_ascii_lowercase())
}
