use std::path::Path;

use crate::error::StreamError;

/// Resolve the `Content-Type` for a file.
///
/// A declared type always wins and is passed through without validation.
/// Otherwise the lowercase extension is looked up in a fixed table of the
/// video formats browsers can actually seek in. There is no sniffing and no
/// octet-stream fallback: an unknown extension is an error.
pub fn resolve_mime_type(declared: Option<&str>, path: &Path) -> Result<String, StreamError> {
    if let Some(mime_type) = declared {
        return Ok(mime_type.to_owned());
    }

    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .ok_or(StreamError::UnsupportedMediaType)?;

    match ext.as_str() {
        "ogv" => Ok("video/ogg".to_owned()),
        "webm" => Ok("video/webm".to_owned()),
        "mp4" | "m4v" | "mov" => Ok("video/mp4".to_owned()),
        _ => Err(StreamError::UnsupportedMediaType),
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use std::path::Path;

    use super::resolve_mime_type;
    use crate::error::StreamError;

    #[test]
    fn known_extensions_resolve() {
        let cases = [
            ("movie.ogv", "video/ogg"),
            ("movie.webm", "video/webm"),
            ("movie.mp4", "video/mp4"),
            ("movie.m4v", "video/mp4"),
            ("movie.mov", "video/mp4"),
            ("MOVIE.MP4", "video/mp4"),
            ("dir.webm/movie.ogv", "video/ogg"),
        ];

        for (path, expected) in cases {
            let resolved = resolve_mime_type(None, Path::new(path)).unwrap();
            assert_eq!(expected, resolved, "path {path:?}");
        }
    }

    #[test]
    fn declared_type_wins_unvalidated() {
        let resolved = resolve_mime_type(Some("video/x-matroska"), Path::new("movie.txt"));
        assert_eq!("video/x-matroska", resolved.unwrap());
    }

    #[test]
    fn unknown_extension_is_rejected() {
        assert_matches!(
            resolve_mime_type(None, Path::new("movie.avi")),
            Err(StreamError::UnsupportedMediaType)
        );
        assert_matches!(
            resolve_mime_type(None, Path::new("no-extension")),
            Err(StreamError::UnsupportedMediaType)
        );
    }
}
