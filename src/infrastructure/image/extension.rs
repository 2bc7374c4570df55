//! File extension resolution for downloaded assets.

use reqwest::Url;

/// Extension used when neither the URL nor the content type decides.
pub const DEFAULT_EXTENSION: &str = ".jpg";

/// Extensions tried, in order, when a lookup has no extension hint.
pub const KNOWN_EXTENSIONS: [&str; 4] = [".jpg", ".png", ".gif", ".webp"];

const MAX_EXTENSION_LEN: usize = 8;

/// Returns the extension of the URL's last path segment, with leading dot.
///
/// Query strings and fragments are ignored. Extensions that are not short
/// ASCII alphanumerics are treated as absent.
#[must_use]
pub fn from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let segment = parsed.path_segments()?.next_back()?;
    let (stem, ext) = segment.rsplit_once('.')?;

    if stem.is_empty()
        || ext.is_empty()
        || ext.len() > MAX_EXTENSION_LEN
        || !ext.bytes().all(|b| b.is_ascii_alphanumeric())
    {
        return None;
    }

    Some(format!(".{}", ext.to_ascii_lowercase()))
}

/// Maps a `Content-Type` header value to an extension.
///
/// Unknown or missing types map to [`DEFAULT_EXTENSION`].
#[must_use]
pub fn from_content_type(content_type: Option<&str>) -> &'static str {
    let essence = content_type
        .and_then(|value| value.split(';').next())
        .map(|value| value.trim().to_ascii_lowercase());

    match essence.as_deref() {
        Some("image/png") => ".png",
        Some("image/gif") => ".gif",
        Some("image/webp") => ".webp",
        _ => DEFAULT_EXTENSION,
    }
}

/// Resolves the stored extension: URL extension first, then content type.
#[must_use]
pub fn resolve(url: &str, content_type: Option<&str>) -> String {
    from_url(url).unwrap_or_else(|| from_content_type(content_type).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("https://cdn.example.com/maps/splash.png", Some(".png") ; "png")]
    #[test_case("https://cdn.example.com/maps/splash.JPEG", Some(".jpeg") ; "uppercase")]
    #[test_case("https://cdn.example.com/maps/splash.webp?v=3#top", Some(".webp") ; "query_and_fragment")]
    #[test_case("https://cdn.example.com/maps/splash", None ; "no_extension")]
    #[test_case("https://cdn.example.com/maps.v2/splash", None ; "dot_in_directory")]
    #[test_case("https://cdn.example.com/", None ; "root")]
    #[test_case("https://cdn.example.com/.hidden", None ; "dotfile")]
    #[test_case("https://cdn.example.com/a.b%20c", None ; "encoded_garbage")]
    #[test_case("not a url", None ; "unparseable")]
    fn test_from_url(url: &str, expected: Option<&str>) {
        assert_eq!(from_url(url).as_deref(), expected);
    }

    #[test_case(Some("image/jpeg"), ".jpg" ; "jpeg")]
    #[test_case(Some("image/png"), ".png" ; "png")]
    #[test_case(Some("image/gif"), ".gif" ; "gif")]
    #[test_case(Some("image/webp"), ".webp" ; "webp")]
    #[test_case(Some("IMAGE/PNG; charset=binary"), ".png" ; "params_and_case")]
    #[test_case(Some("application/octet-stream"), ".jpg" ; "unknown")]
    #[test_case(None, ".jpg" ; "missing")]
    fn test_from_content_type(content_type: Option<&str>, expected: &str) {
        assert_eq!(from_content_type(content_type), expected);
    }

    #[test]
    fn test_resolve_prefers_url() {
        assert_eq!(
            resolve("https://cdn.example.com/icon.gif", Some("image/png")),
            ".gif"
        );
        assert_eq!(
            resolve("https://cdn.example.com/icon", Some("image/png")),
            ".png"
        );
        assert_eq!(resolve("https://cdn.example.com/icon", None), ".jpg");
    }
}
