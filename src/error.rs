use std::io;

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

/// Everything that can stop a stream before its first body byte.
///
/// Each variant is terminal for the request: the HTTP layer translates it
/// into a complete response with a short literal body and no streaming
/// takes place. Range requests are idempotent, so any retry is the
/// client's business.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// The path does not name an existing regular file. 404.
    #[error("file not found")]
    NotFound,

    /// The file exists but is zero bytes long. 204.
    #[error("file is empty")]
    EmptyFile,

    /// No MIME override was given and the extension is not in the lookup
    /// table. Surfaced as 500 to match the reference server, which never
    /// adopted 415 for this case.
    #[error("cannot resolve a media type for this file")]
    UnsupportedMediaType,

    /// The client asked for multiple disjoint ranges. 416.
    #[error("multiple byte ranges are not supported")]
    MultiRangeUnsupported { size: u64 },

    /// Malformed or out-of-bounds range. 416.
    #[error("requested range not satisfiable")]
    RangeNotSatisfiable { size: u64 },

    /// Unexpected I/O failure while opening or inspecting the file. 500.
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

impl IntoResponse for StreamError {
    fn into_response(self) -> Response {
        use StreamError::*;

        match self {
            NotFound => (StatusCode::NOT_FOUND, "Not Found").into_response(),
            EmptyFile => (StatusCode::NO_CONTENT, "No Content").into_response(),
            UnsupportedMediaType | Io(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
            }
            MultiRangeUnsupported { size } | RangeNotSatisfiable { size } => {
                // a 416 advertises the range that *would* have been
                // acceptable, which is the whole file
                let content_range = format!("bytes 0-{}/{}", size.saturating_sub(1), size);
                let headers = [(
                    header::CONTENT_RANGE,
                    HeaderValue::from_str(&content_range)
                        .expect("content range string is always a valid header value"),
                )];
                (StatusCode::RANGE_NOT_SATISFIABLE, headers, "Range Not Satisfiable")
                    .into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    use super::StreamError;

    #[test]
    fn unsatisfiable_carries_whole_file_content_range() {
        let response = StreamError::RangeNotSatisfiable { size: 500 }.into_response();
        assert_eq!(StatusCode::RANGE_NOT_SATISFIABLE, response.status());
        assert_eq!(
            "bytes 0-499/500",
            response.headers().get("Content-Range").unwrap(),
        );
    }

    #[test]
    fn multi_range_maps_to_416() {
        let response = StreamError::MultiRangeUnsupported { size: 62 }.into_response();
        assert_eq!(StatusCode::RANGE_NOT_SATISFIABLE, response.status());
        assert_eq!(
            "bytes 0-61/62",
            response.headers().get("Content-Range").unwrap(),
        );
    }

    #[test]
    fn precondition_failures_map_to_spec_statuses() {
        assert_eq!(
            StatusCode::NOT_FOUND,
            StreamError::NotFound.into_response().status(),
        );
        assert_eq!(
            StatusCode::NO_CONTENT,
            StreamError::EmptyFile.into_response().status(),
        );
        assert_eq!(
            StatusCode::INTERNAL_SERVER_ERROR,
            StreamError::UnsupportedMediaType.into_response().status(),
        );
    }
}
