//! `application/x-www-form-urlencoded` strings, as used both in query
//! components and token request bodies.

use std::collections::HashMap;

use url::form_urlencoded;

/// Build a urlencoded string from key-value pairs, preserving their order.
///
/// Keys and values are percent-encoded as UTF-8. A pair with an empty value
/// contributes only its key, without `=`.
pub fn build<'p, I>(pairs: I) -> String
where
    I: IntoIterator<Item = (&'p str, &'p str)>,
{
    let mut out = String::new();
    for (key, value) in pairs {
        if !out.is_empty() {
            out.push('&');
        }
        out.extend(form_urlencoded::byte_serialize(key.as_bytes()));
        if !value.is_empty() {
            out.push('=');
            out.extend(form_urlencoded::byte_serialize(value.as_bytes()));
        }
    }
    out
}

/// Split a raw query string into decoded key-value pairs.
///
/// Absent input yields an empty map. Empty segments are dropped; a segment
/// without `=` maps its decoded key to the empty string. Duplicate keys keep
/// the last value seen.
pub fn parse(raw: Option<&str>) -> HashMap<String, String> {
    let Some(raw) = raw else {
        return HashMap::new();
    };
    raw.split('&')
        .filter(|segment| !segment.is_empty())
        .flat_map(|segment| form_urlencoded::parse(segment.as_bytes()).into_owned())
        .collect()
}
