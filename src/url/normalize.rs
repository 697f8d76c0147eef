use std::ops::Range;
use url::Url;

/// Characters with a special meaning in URLs that are never escaped
const RESERVED_CHARS: &[u8] = b";/?:@&=+$,%#";

/// Characters that never need escaping (besides ASCII alphanumerics)
const UNRESERVED_CHARS: &[u8] = b"-._~";

fn is_unreserved(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || UNRESERVED_CHARS.contains(&byte)
}

fn hex_value(byte: u8) -> Option<u8> {
    (byte as char).to_digit(16).map(|d| d as u8)
}

/// Byte range of the authority (`user@host:port`) in a URL with `//`
fn authority_range(raw: &str) -> Option<Range<usize>> {
    let (scheme, rest) = raw.split_once("://")?;
    if scheme.is_empty()
        || !scheme
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"+-.".contains(&b))
    {
        return None;
    }
    let start = scheme.len() + 3;
    let end = rest
        .find(|c: char| c == '/' || c == '?' || c == '#')
        .map_or(raw.len(), |i| start + i);
    Some(start..end)
}

/// Makes percent-escaping in a URL consistent
///
/// Escapes of unreserved characters are decoded, remaining escapes are
/// upper-cased and every raw byte that is neither unreserved nor reserved
/// is escaped. Brackets around an IPv6 host stay as they are.
fn normalize_escapes(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let authority = authority_range(raw);
    let mut result = String::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        let byte = bytes[i];
        if byte == b'%' && i + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                let decoded = hi * 16 + lo;
                if is_unreserved(decoded) {
                    result.push(decoded as char);
                } else {
                    result.push_str(&format!("%{:02X}", decoded));
                }
                i += 3;
                continue;
            }
        }

        let in_authority = authority.as_ref().map_or(false, |r| r.contains(&i));
        if is_unreserved(byte)
            || RESERVED_CHARS.contains(&byte)
            || (in_authority && (byte == b'[' || byte == b']'))
        {
            result.push(byte as char);
        } else {
            result.push_str(&format!("%{:02X}", byte));
        }
        i += 1;
    }

    result
}

/// Collapses runs of slashes in a path into a single slash
fn collapse_slashes(path: &str) -> String {
    let mut result = String::with_capacity(path.len());
    let mut previous_slash = false;
    for c in path.chars() {
        if c == '/' {
            if !previous_slash {
                result.push(c);
            }
            previous_slash = true;
        } else {
            result.push(c);
            previous_slash = false;
        }
    }
    result
}

/// Normalizes a URL so that structurally equal URLs map to one identity
///
/// # Normalization Steps
///
/// 1. Make percent-escaping consistent (decode unreserved characters,
///    upper-case remaining escapes, escape everything that is neither
///    unreserved nor reserved)
/// 2. For hierarchical URLs: lowercase the host, strip default ports,
///    drop a trailing bare colon, turn an empty path into `/` and remove
///    dot segments (userinfo is kept)
/// 3. For `file` URLs: collapse runs of slashes in the path
/// 4. Remove the fragment
///
/// URLs that cannot be parsed are returned with consistent escaping and
/// without fragment, so every input has exactly one identity.
///
/// # Arguments
///
/// * `raw` - The URL string to normalize
///
/// # Returns
///
/// The normalized URL string. The function is idempotent.
///
/// # Examples
///
/// ```
/// use webcheck::url::normalize_url;
///
/// assert_eq!(normalize_url("http://EXAMPLE.com:80"), "http://example.com/");
/// assert_eq!(normalize_url("file:///a//b"), "file:///a/b");
/// ```
pub fn normalize_url(raw: &str) -> String {
    let escaped = normalize_escapes(raw.trim());

    match Url::parse(&escaped) {
        Ok(mut url) => {
            if url.scheme() == "file" {
                let path = collapse_slashes(url.path());
                url.set_path(&path);
            }
            url.set_fragment(None);
            url.to_string()
        }
        Err(_) => match escaped.split_once('#') {
            Some((without_fragment, _)) => without_fragment.to_string(),
            None => escaped,
        },
    }
}
