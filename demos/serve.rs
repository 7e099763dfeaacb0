use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use axum_seekable::RangeStreamer;

/// Serve one video file over HTTP with seeking support.
#[derive(Parser)]
struct Args {
    /// Video file to serve
    file: PathBuf,

    /// Override the Content-Type sent to clients
    #[arg(long)]
    mime_type: Option<String>,

    /// Filename offered in the Content-Disposition header
    #[arg(long)]
    filename: Option<String>,

    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0:3000")]
    listen: String,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let mut streamer = RangeStreamer::new(&args.file);
    if let Some(mime_type) = args.mime_type {
        streamer = streamer.mime_type(mime_type);
    }
    if let Some(filename) = args.filename {
        streamer = streamer.output_filename(filename);
    }

    let app = Router::new()
        .route("/", get(serve_video))
        .with_state(Arc::new(streamer));

    let listener = tokio::net::TcpListener::bind(&args.listen).await.unwrap();
    tracing::info!(listen = %args.listen, file = %args.file.display(), "serving video");
    axum::serve(listener, app).await.unwrap();
}

async fn serve_video(
    State(streamer): State<Arc<RangeStreamer>>,
    headers: HeaderMap,
) -> Response {
    let range = headers.get(header::RANGE).and_then(|value| value.to_str().ok());
    match streamer.stream(range).await {
        Ok(response) => response.into_response(),
        Err(error) => error.into_response(),
    }
}
