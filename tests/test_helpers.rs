// In-process stand-ins for eGauge meters, served on loopback ports.
#![allow(dead_code)]

use axum::{
    body::Body,
    extract::{RawQuery, State},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderMap, StatusCode,
    },
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::time::Duration;
use tokio::net::TcpListener;

pub const DEVICE_USER: &str = "solar";
pub const DEVICE_PASSWORD: &str = "secret";
/// base64("solar:secret")
const EXPECTED_AUTH: &str = "Basic c29sYXI6c2VjcmV0";

#[derive(Clone)]
pub enum Reply {
    Xml(String),
    Status(StatusCode),
    Delayed(Duration, String),
    /// Chunked body without a Content-Length header.
    Streamed(Vec<String>),
}

pub fn gauge_xml(ts: i64, rows: &[(&str, &str)]) -> String {
    let mut body = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" ?>\n<data serial=\"0x4d2f1a\">\n<ts>{}</ts>\n",
        ts
    );
    for (i, (name, value)) in rows.iter().enumerate() {
        body.push_str(&format!(
            "<r t=\"P\" n=\"{}\" did=\"{}\"><v>{}</v><i>{}</i></r>\n",
            name,
            i,
            1000 * (i + 1),
            value
        ));
    }
    body.push_str("</data>\n");
    body
}

/// Serve `reply` at `{prefix}cgi-bin/egauge` and return the device base URL.
/// `prefix` must start and end with `/`.
pub async fn spawn_device(prefix: &str, reply: Reply) -> String {
    let path = format!("{}cgi-bin/egauge", prefix);
    let app = Router::new().route(&path, get(device)).with_state(reply);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}{}", addr, prefix)
}

async fn device(
    State(reply): State<Reply>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
) -> Response {
    let auth = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
    if auth != Some(EXPECTED_AUTH) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    if query.as_deref() != Some("inst&tot") {
        return StatusCode::BAD_REQUEST.into_response();
    }

    match reply {
        Reply::Xml(body) => ([(CONTENT_TYPE, "text/xml")], body).into_response(),
        Reply::Status(code) => code.into_response(),
        Reply::Delayed(delay, body) => {
            tokio::time::sleep(delay).await;
            ([(CONTENT_TYPE, "text/xml")], body).into_response()
        }
        Reply::Streamed(chunks) => {
            let stream = futures::stream::iter(chunks.into_iter().map(Ok::<_, std::io::Error>));
            ([(CONTENT_TYPE, "text/xml")], Body::from_stream(stream)).into_response()
        }
    }
}

/// Accepts connections and never answers.
pub async fn spawn_silent_device() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    format!("http://{}/", addr)
}

/// A loopback URL with nothing listening.
pub async fn refused_endpoint() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}/", addr)
}
