//! UI Routes - HTML pages for the specview web interface

use axum::{
    extract::{Path, State},
    response::{Html, IntoResponse},
    routing::get,
    Router,
};

use specview_common::{AudioFormat, FilenamePolicy};

use crate::{ApiResult, AppState};

/// Build UI routes
pub fn ui_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(main_page))
        .route("/main", get(main_page))
        .route("/upload", get(upload_page))
        .route("/show_image/:filename", get(show_image_page))
}

const STYLE: &str = r#"
    <style>
        body {
            font-family: system-ui, -apple-system, sans-serif;
            max-width: 1100px;
            margin: 40px auto;
            padding: 20px;
            line-height: 1.6;
        }
        h1 {
            color: #333;
            border-bottom: 2px solid #0066cc;
            padding-bottom: 10px;
        }
        .button {
            display: inline-block;
            padding: 10px 20px;
            background: #0066cc;
            color: white;
            text-decoration: none;
            border: none;
            border-radius: 4px;
            margin: 10px 5px;
            cursor: pointer;
        }
        .button:hover {
            background: #0052a3;
        }
        img {
            max-width: 100%;
            border: 1px solid #ccc;
        }
    </style>
"#;

/// Landing page
async fn main_page() -> impl IntoResponse {
    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>specview - Audio Spectrograms</title>
    {STYLE}
</head>
<body>
    <h1>specview</h1>
    <p>Upload a WAV or MP3 file and get back its power spectrogram: a
    log-frequency heat map of the short-time Fourier transform, in dB relative
    to the loudest point of the clip.</p>

    <p><a href="/upload" class="button">Upload audio</a></p>

    <p><small>Module: specview-web v{version}</small></p>
</body>
</html>
"#,
        version = env!("CARGO_PKG_VERSION"),
    ))
}

/// `accept` attribute for the file input: extensions, then their MIME types
fn accept_attribute(policy: &FilenamePolicy) -> String {
    let extensions = policy.allowed_extensions().map(|ext| format!(".{ext}"));
    let mime_types = policy
        .allowed_extensions()
        .filter_map(AudioFormat::from_extension)
        .map(|format| format.mime_type().to_string());
    extensions.chain(mime_types).collect::<Vec<_>>().join(",")
}

/// Upload form, posts the `file` field to /uploader
async fn upload_page(State(state): State<AppState>) -> impl IntoResponse {
    let accept = accept_attribute(state.storage.uploads.policy());
    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>specview - Upload</title>
    {STYLE}
</head>
<body>
    <h1>Upload audio</h1>
    <form action="/uploader" method="post" enctype="multipart/form-data">
        <input type="file" name="file" accept="{accept}">
        <input type="submit" value="Upload" class="button">
    </form>
    <p><a href="/main">Back</a></p>
</body>
</html>
"#
    ))
}

/// Page showing the persisted spectrogram of an upload
async fn show_image_page(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> ApiResult<Html<String>> {
    let source = state.storage.uploads.validate(&filename)?;
    let (artifact, _) = state
        .storage
        .results
        .resolve_existing(&source.artifact_name())
        .await?;

    Ok(Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>specview - {source}</title>
    {STYLE}
</head>
<body>
    <h1>{source}</h1>
    <img src="/results/{artifact}" alt="Power spectrogram of {source}">
    <p>
        <a href="/uploads/{source}" class="button">Download audio</a>
        <a href="/upload" class="button">Upload another</a>
    </p>
</body>
</html>
"#
    )))
}
