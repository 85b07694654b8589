//! Document URI helpers.
//!
//! Only the pieces needed to identify documents are implemented here: the path component of a
//! URI (percent-decoded) and its file extension. URIs are otherwise treated as opaque keys.

/// Decode `%XX` escapes. Malformed escapes are kept as written.
fn decode_escapes(path: &str) -> String {
    let mut decoded = Vec::with_capacity(path.len());
    let mut rest = path.as_bytes();
    while let Some((&byte, tail)) = rest.split_first() {
        let escaped = (byte == b'%')
            .then(|| tail.get(..2))
            .flatten()
            .filter(|hex| hex.iter().all(u8::is_ascii_hexdigit))
            .and_then(|hex| std::str::from_utf8(hex).ok())
            .and_then(|hex| u8::from_str_radix(hex, 16).ok());
        match escaped {
            Some(value) => {
                decoded.push(value);
                rest = &tail[2..];
            }
            None => {
                decoded.push(byte);
                rest = tail;
            }
        }
    }
    String::from_utf8_lossy(&decoded).into_owned()
}

/// The decoded path component of a URI (`file:///a/b.html` -> `/a/b.html`).
///
/// Works for any scheme (`untitled:Untitled-1.html`); query and fragment are dropped. A string
/// without a scheme is treated as a bare path.
pub fn uri_path(uri: &str) -> String {
    let without_fragment = uri.split('#').next().unwrap_or(uri);
    let without_query = without_fragment
        .split('?')
        .next()
        .unwrap_or(without_fragment);

    let path = match without_query.split_once(':') {
        // A single-letter "scheme" is a Windows drive (`C:/x.html`), not a scheme.
        Some((scheme, rest)) if scheme.len() > 1 => match rest.strip_prefix("//") {
            Some(authority_and_path) => authority_and_path
                .find('/')
                .map_or("", |i| &authority_and_path[i..]),
            None => rest,
        },
        _ => without_query,
    };

    decode_escapes(path)
}

/// Lower-cased file extension of the URI's path, without the dot.
pub fn uri_extension(uri: &str) -> Option<String> {
    let path = uri_path(uri);
    let file_name = path.rsplit('/').next()?;
    let (stem, ext) = file_name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_uri_path_schemes() {
        assert_eq!(uri_path("file:///tmp/a%20b.html"), "/tmp/a b.html");
        assert_eq!(uri_path("file://localhost/tmp/x.ts"), "/tmp/x.ts");
        assert_eq!(uri_path("untitled:Untitled-1.html"), "Untitled-1.html");
        assert_eq!(uri_path("file:///x/y.ts?v=1#frag"), "/x/y.ts");
        assert_eq!(uri_path("/plain/path.tsx"), "/plain/path.tsx");
    }

    #[test]
    fn test_escapes() {
        assert_eq!(uri_path("file:///a%2Bb/c%20"), "/a+b/c ");
        assert_eq!(uri_path("file:///100%/x%zz%+1%4"), "/100%/x%zz%+1%4");
        assert_eq!(uri_path("file:///%E2%9C%93.html"), "/\u{2713}.html");
    }

    #[test]
    fn test_uri_extension() {
        assert_eq!(uri_extension("file:///a/Index.HTML").as_deref(), Some("html"));
        assert_eq!(uri_extension("file:///a/el.tsx").as_deref(), Some("tsx"));
        assert_eq!(uri_extension("file:///a/.hidden"), None);
        assert_eq!(uri_extension("file:///a/Makefile"), None);
        assert_eq!(uri_extension("file:///dir.d/file"), None);
    }
}
