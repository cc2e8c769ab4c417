//! Minimal HTTP server for backend tests.

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;

/// Build a raw HTTP/1.1 response with a body
pub(crate) fn http_response(status: u16, body: &str) -> String {
    format!(
        "HTTP/1.1 {} Test\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    )
}

/// Spawn a server that answers one connection per response, in order.
/// Returns (port, join_handle).
pub(crate) async fn spawn_mock_server(responses: Vec<String>) -> (u16, tokio::task::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = tokio::spawn(async move {
        for resp in responses {
            let Ok((mut stream, _)) = listener.accept().await else {
                break;
            };
            let (reader, mut writer) = stream.split();
            let mut buf_reader = BufReader::new(reader);

            // Drain headers, remembering the body length
            let mut content_length = 0usize;
            let mut line = String::new();
            loop {
                line.clear();
                if buf_reader.read_line(&mut line).await.unwrap_or(0) == 0 {
                    break;
                }
                if line == "\r\n" || line == "\n" {
                    break;
                }
                let lower = line.to_ascii_lowercase();
                if let Some(value) = lower.strip_prefix("content-length:") {
                    content_length = value.trim().parse().unwrap_or(0);
                }
            }

            let mut body = vec![0u8; content_length];
            buf_reader.read_exact(&mut body).await.ok();

            writer.write_all(resp.as_bytes()).await.ok();
            writer.shutdown().await.ok();
        }
    });

    (port, handle)
}

/// A port nothing is listening on
pub(crate) async fn unused_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}
