//! Content-type negotiation from path extensions.
//!
//! When nothing has forced a content type, a dot in the last path segment
//! is read as a format request: `/report.json` routes as `/report` and asks
//! for `application/json`.

/// Known extensions and their content types.
const MIME_TYPES: &[(&str, &str)] = &[
    (".html", "text/html"),
    (".htm", "text/html"),
    (".xhtml", "application/xhtml+xml"),
    (".json", "application/json"),
    (".txt", "text/plain"),
    (".text", "text/plain"),
    (".csv", "text/csv"),
    (".xml", "text/xml"),
    (".rss", "application/rss+xml"),
    (".atom", "application/atom+xml"),
    (".js", "application/javascript"),
    (".css", "text/css"),
    (".svg", "image/svg+xml"),
    (".png", "image/png"),
    (".jpg", "image/jpeg"),
    (".jpeg", "image/jpeg"),
    (".gif", "image/gif"),
    (".ico", "image/vnd.microsoft.icon"),
    (".pdf", "application/pdf"),
    (".zip", "application/zip"),
];

/// A path split at its extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extension {
    /// The path with the extension removed.
    pub stem: String,
    /// The extension, dot included. Empty for dot-files such as `.vimrc`.
    pub extension: String,
}

/// Splits the extension off `path` if its last segment contains a dot.
///
/// Only the last extension is removed, and leading dots of a segment never
/// start an extension.
///
/// ```
/// use arbor_dispatch::negotiation::split_extension;
///
/// let split = split_extension("/gradient.js.js").unwrap();
/// assert_eq!(split.stem, "/gradient.js");
/// assert_eq!(split.extension, ".js");
///
/// let hidden = split_extension("/.vimrc").unwrap();
/// assert_eq!(hidden.stem, "/.vimrc");
/// assert_eq!(hidden.extension, "");
///
/// assert!(split_extension("/about").is_none());
/// ```
#[must_use]
pub fn split_extension(path: &str) -> Option<Extension> {
    let segment_start = path.rfind('/').map_or(0, |i| i + 1);
    let segment = &path[segment_start..];
    let dot = segment.rfind('.')?;

    if segment[..dot].chars().all(|c| c == '.') {
        return Some(Extension {
            stem: path.to_string(),
            extension: String::new(),
        });
    }

    let split = segment_start + dot;
    Some(Extension {
        stem: path[..split].to_string(),
        extension: path[split..].to_string(),
    })
}

/// Returns the content type registered for `extension`, matched
/// case-insensitively.
#[must_use]
pub fn content_type_for(extension: &str) -> Option<&'static str> {
    MIME_TYPES
        .iter()
        .find(|(ext, _)| ext.eq_ignore_ascii_case(extension))
        .map(|(_, content_type)| *content_type)
}
