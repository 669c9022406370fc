// Integration tests for the HTTP API
//
// Drives the router directly with `tower::ServiceExt::oneshot`.

#![cfg(unix)]

mod common;

use anyhow::Result;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use common::*;
use serde_json::Value;
use tower::ServiceExt;
use vidscribe::{create_router, AppState, Pipeline};

async fn post(pipeline: Pipeline, uri: &str) -> Result<(StatusCode, Value)> {
    let app = create_router(AppState::new(pipeline));
    let response = app
        .oneshot(Request::builder().method("POST").uri(uri).body(Body::empty())?)
        .await?;

    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await?;
    Ok((status, serde_json::from_slice(&body)?))
}

fn missing_tools_pipeline(fx: &Fixture) -> Pipeline {
    let mut extractor = sh_tool("yt-dlp", "--version", &[]);
    extractor.forms = vec![vec!["/nonexistent/bin/yt-dlp".to_string()]];
    extractor.install_hint = "Please install it with: pip install yt-dlp".to_string();
    let mut transcriber = sh_tool("whisper", "--help", &[]);
    transcriber.forms = vec![vec!["/nonexistent/bin/whisper".to_string()]];
    fx.pipeline(extractor, transcriber)
}

#[tokio::test]
async fn test_health_check() -> Result<()> {
    let fx = Fixture::new();
    let app = create_router(AppState::new(missing_tools_pipeline(&fx)));

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty())?)
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await?;
    assert_eq!(&body[..], b"OK");
    Ok(())
}

#[tokio::test]
async fn test_invalid_url_is_rejected() -> Result<()> {
    let fx = Fixture::new();

    let (status, body) = post(
        missing_tools_pipeline(&fx),
        "/transcribe?youtubeUrl=https%3A%2F%2Fvimeo.com%2F12345",
    )
    .await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Invalid YouTube URL");
    Ok(())
}

#[tokio::test]
async fn test_missing_url_is_rejected() -> Result<()> {
    let fx = Fixture::new();

    let (status, body) = post(missing_tools_pipeline(&fx), "/transcribe").await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    Ok(())
}

#[tokio::test]
async fn test_pipeline_error_is_reported() -> Result<()> {
    let fx = Fixture::new();

    let (status, body) = post(
        missing_tools_pipeline(&fx),
        "/transcribe?youtubeUrl=https%3A%2F%2Fyoutu.be%2FdQw4w9WgXcQ",
    )
    .await?;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    let error = body["error"].as_str().unwrap();
    assert!(error.starts_with("Error processing video: yt-dlp is not installed"));
    assert!(error.contains("pip install yt-dlp"));
    Ok(())
}

#[tokio::test]
async fn test_successful_transcription() -> Result<()> {
    let fx = Fixture::new();
    let extractor = extractor_script(&fx, "yt-dlp.sh", 4096);
    let transcriber = transcriber_script(&fx, "whisper.sh", "  never gonna give you up\n");
    let pipeline = fx.pipeline(
        sh_tool("yt-dlp", "--version", &[extractor]),
        sh_tool("whisper", "--help", &[transcriber]),
    );

    let (status, body) = post(
        pipeline,
        "/transcribe?youtubeUrl=https%3A%2F%2Fwww.youtube.com%2Fwatch%3Fv%3DdQw4w9WgXcQ",
    )
    .await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["transcription"], "never gonna give you up");
    assert!(body["session_id"].as_str().is_some());
    assert!(fx.work_files().is_empty());
    Ok(())
}
