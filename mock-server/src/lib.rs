use std::collections::BTreeMap;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{Multipart, Path},
    http::{HeaderMap, Method, StatusCode},
    routing::{any, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

/// Everything the server saw of a request sent to `/echo`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Echo {
    pub method: String,
    pub headers: BTreeMap<String, String>,
    pub body: String,
    pub length: usize,
}

/// One file part received by `/upload`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct UploadedFile {
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub content: String,
}

/// Summary of a multipart body received by `/upload`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Upload {
    pub fields: BTreeMap<String, String>,
    pub files: BTreeMap<String, UploadedFile>,
    pub content_length: Option<u64>,
}

pub fn app() -> Router {
    Router::new()
        .route("/echo", any(echo))
        .route("/status/{code}", any(status))
        .route("/text", get(text))
        .route("/slow/{ms}", any(slow))
        .route("/upload", post(upload))
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn echo(method: Method, headers: HeaderMap, body: Bytes) -> Json<Echo> {
    let headers = headers
        .iter()
        .map(|(k, v)| (k.as_str().to_string(), v.to_str().unwrap_or_default().to_string()))
        .collect();
    Json(Echo {
        method: method.to_string(),
        headers,
        body: String::from_utf8_lossy(&body).into_owned(),
        length: body.len(),
    })
}

async fn status(Path(code): Path<u16>) -> Result<(StatusCode, Json<serde_json::Value>), StatusCode> {
    let status = StatusCode::from_u16(code).map_err(|_| StatusCode::BAD_REQUEST)?;
    Ok((status, Json(serde_json::json!({ "error": format!("status {code}") }))))
}

async fn text() -> &'static str {
    "plain response"
}

async fn slow(Path(ms): Path<u64>) -> Json<serde_json::Value> {
    tokio::time::sleep(Duration::from_millis(ms)).await;
    Json(serde_json::json!({ "slept": ms }))
}

async fn upload(headers: HeaderMap, mut multipart: Multipart) -> Result<Json<Upload>, StatusCode> {
    let mut upload = Upload {
        content_length: headers
            .get(axum::http::header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok()),
        ..Upload::default()
    };

    while let Some(field) = multipart.next_field().await.map_err(|_| StatusCode::BAD_REQUEST)? {
        let name = field.name().unwrap_or_default().to_string();
        let filename = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await.map_err(|_| StatusCode::BAD_REQUEST)?;
        let content = String::from_utf8_lossy(&data).into_owned();

        if filename.is_some() {
            upload.files.insert(
                name,
                UploadedFile {
                    filename,
                    content_type,
                    content,
                },
            );
        } else {
            upload.fields.insert(name, content);
        }
    }

    Ok(Json(upload))
}
