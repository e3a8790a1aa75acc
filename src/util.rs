//! Helpers for applications built atop the gateway: URI reconstruction and
//! path-segment traversal over the environ, plus the hop-by-hop header set
//! shared with the response validator.

use bytes::Bytes;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_encode};

use crate::gateway::environ::Environ;

pub const CRLF: &[u8] = b"\r\n";

const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailers",
    "transfer-encoding",
    "upgrade",
];

/// True if `name` is an HTTP/1.1 hop-by-hop header (case-insensitive).
pub fn is_hop_by_hop(name: &[u8]) -> bool {
    HOP_BY_HOP
        .iter()
        .any(|h| name.eq_ignore_ascii_case(h.as_bytes()))
}

/// Bytes escaped when rebuilding URIs: everything except RFC 3986 unreserved
/// characters and the path separator.
const PATH_ESCAPE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

fn quote(data: &[u8]) -> String {
    percent_encode(data, PATH_ESCAPE).to_string()
}

/// Guess whether the request scheme is `http` or `https` from the
/// transport's TLS flag.
pub fn guess_scheme(environ: &Environ) -> Bytes {
    match environ.https.as_deref() {
        Some(b"yes") | Some(b"on") | Some(b"1") => Bytes::from_static(b"https"),
        _ => Bytes::from_static(b"http"),
    }
}

/// The application's base URI: scheme, host and escaped script name, without
/// PATH_INFO or the query string.
///
/// An explicit Host header wins over SERVER_NAME/SERVER_PORT; default ports
/// are omitted.
pub fn application_uri(environ: &Environ) -> String {
    let mut url = String::from_utf8_lossy(&environ.url_scheme).into_owned();
    url.push_str("://");

    match environ.http_header("Host").filter(|host| !host.is_empty()) {
        Some(host) => url.push_str(&String::from_utf8_lossy(host)),
        None => {
            url.push_str(&String::from_utf8_lossy(&environ.server_name));
            let default_port: &[u8] = if environ.url_scheme.as_ref() == b"https" {
                b"443"
            } else {
                b"80"
            };
            if environ.server_port.as_ref() != default_port {
                url.push(':');
                url.push_str(&String::from_utf8_lossy(&environ.server_port));
            }
        }
    }

    if environ.script_name.is_empty() {
        url.push('/');
    } else {
        url.push_str(&quote(&environ.script_name));
    }
    url
}

/// The full request URI: base URI plus escaped PATH_INFO and, when requested,
/// the raw query string.
pub fn request_uri(environ: &Environ, include_query: bool) -> String {
    let mut url = application_uri(environ);
    let path_info = quote(&environ.path_info);
    if environ.script_name.is_empty() {
        // The base URI already ends in '/'; drop the duplicate
        url.push_str(path_info.get(1..).unwrap_or(""));
    } else {
        url.push_str(&path_info);
    }
    if include_query && !environ.query_string.is_empty() {
        url.push('?');
        url.push_str(&String::from_utf8_lossy(&environ.query_string));
    }
    url
}

/// Shift the first segment of PATH_INFO onto SCRIPT_NAME, mutating the
/// environ in place, and return it. Returns `None` when PATH_INFO is empty
/// or the popped segment normalizes away.
///
/// When PATH_INFO is a lone `/`, this returns an empty segment and appends a
/// trailing `/` to SCRIPT_NAME, even though empty segments are normally
/// ignored and SCRIPT_NAME normally has no trailing slash. That lets an
/// application tell `/x` from `/x/` while traversing.
pub fn shift_path_info(environ: &mut Environ) -> Option<Bytes> {
    let path_info = environ.path_info.clone();
    if path_info.is_empty() {
        return None;
    }

    let mut parts: Vec<Vec<u8>> = path_info
        .split(|&b| b == b'/')
        .map(<[u8]>::to_vec)
        .collect();
    if parts.len() < 2 {
        return None;
    }
    // Drop empty and '.' segments from the interior before popping
    if parts.len() > 2 {
        let tail = parts.len() - 1;
        let interior: Vec<Vec<u8>> = parts[1..tail]
            .iter()
            .filter(|p| !p.is_empty() && p.as_slice() != b".")
            .cloned()
            .collect();
        parts.splice(1..tail, interior);
    }
    let name = parts.remove(1);

    let mut joined = environ.script_name.to_vec();
    joined.push(b'/');
    joined.extend_from_slice(&name);
    let mut script_name = posix_normpath(&joined);
    if script_name.ends_with(b"/") {
        script_name.pop();
    }
    if name.is_empty() && !script_name.ends_with(b"/") {
        script_name.push(b'/');
    }

    environ.script_name = Bytes::from(script_name);
    environ.path_info = Bytes::from(parts.join(&b'/'));

    if name.as_slice() == b"." {
        return None;
    }
    Some(Bytes::from(name))
}

/// POSIX-style path normalization: collapses repeated slashes and `.`
/// segments and resolves `..` against preceding segments.
fn posix_normpath(path: &[u8]) -> Vec<u8> {
    if path.is_empty() {
        return b".".to_vec();
    }
    let absolute = path[0] == b'/';
    let mut stack: Vec<&[u8]> = Vec::new();
    for part in path.split(|&b| b == b'/') {
        if part.is_empty() || part == b"." {
            continue;
        }
        if part == b".." {
            match stack.last() {
                Some(last) if *last != b".." => {
                    stack.pop();
                }
                _ if absolute => {}
                _ => stack.push(part),
            }
        } else {
            stack.push(part);
        }
    }
    let mut out: Vec<u8> = if absolute { b"/".to_vec() } else { Vec::new() };
    out.extend_from_slice(&stack.join(&b'/'));
    if out.is_empty() {
        return b".".to_vec();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normpath_collapses() {
        assert_eq!(posix_normpath(b"/a//b/./c"), b"/a/b/c");
        assert_eq!(posix_normpath(b"/a/b/.."), b"/a");
        assert_eq!(posix_normpath(b"/.."), b"/");
        assert_eq!(posix_normpath(b"/"), b"/");
    }

    #[test]
    fn hop_by_hop_is_case_insensitive() {
        assert!(is_hop_by_hop(b"Transfer-Encoding"));
        assert!(is_hop_by_hop(b"CONNECTION"));
        assert!(!is_hop_by_hop(b"Content-Type"));
    }
}
