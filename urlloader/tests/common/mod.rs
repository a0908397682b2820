//! Local HTTP servers for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use axum::extract::Path;
use axum::http::StatusCode;
use axum::response::Redirect;
use axum::routing::get;
use axum::Router;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// axum server on a random localhost port, shut down on drop.
pub struct TestHttpServer {
    addr: SocketAddr,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestHttpServer {
    pub async fn new(router: Router) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test HTTP listener");
        let addr = listener.local_addr().expect("read test listener addr");

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
        let server = axum::serve(listener, router).with_graceful_shutdown(async {
            shutdown_rx.await.ok();
        });
        tokio::spawn(async move {
            server.await.expect("run test HTTP server");
        });

        Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Server with the standard set of test routes.
    pub async fn standard() -> Self {
        Self::new(standard_router()).await
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestHttpServer {
    fn drop(&mut self) {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }
    }
}

/// Routes:
///
/// - `/bytes/:n` returns `n` bytes
/// - `/empty` returns 200 with no body
/// - `/error` returns 500 with no body
/// - `/slow` waits 5 seconds before responding
/// - `/redirect` answers 307 pointing at `/bytes/100`
pub fn standard_router() -> Router {
    Router::new()
        .route("/bytes/:n", get(|Path(n): Path<usize>| async move { vec![b'x'; n] }))
        .route("/empty", get(|| async { "" }))
        .route("/error", get(|| async { StatusCode::INTERNAL_SERVER_ERROR }))
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "late"
            }),
        )
        .route("/redirect", get(|| async { Redirect::temporary("/bytes/100") }))
}

/// Plain TCP server that writes hand-built HTTP responses.
///
/// Used where the response must break the rules an HTTP framework enforces:
/// HEAD replies without `Content-Length`, or bodies that never end.
pub struct RawHttpServer {
    addr: SocketAddr,
    task: JoinHandle<()>,
}

impl RawHttpServer {
    /// Answer every request with `response` and close the connection.
    pub async fn fixed(response: &'static str) -> Self {
        Self::spawn(move |mut stream| async move {
            let _ = stream.write_all(response.as_bytes()).await;
            let _ = stream.shutdown().await;
        })
        .await
    }

    /// Answer with a chunked body that trickles bytes until the client hangs up.
    pub async fn endless() -> Self {
        Self::spawn(|mut stream| async move {
            let head = "HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n";
            if stream.write_all(head.as_bytes()).await.is_err() {
                return;
            }
            loop {
                if stream.write_all(b"10\r\n0123456789abcdef\r\n").await.is_err() {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await
    }

    async fn spawn<H, Fut>(handler: H) -> Self
    where
        H: Fn(TcpStream) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind raw listener");
        let addr = listener.local_addr().expect("read raw listener addr");

        let handler = std::sync::Arc::new(handler);
        let task = tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                let handler = std::sync::Arc::clone(&handler);
                tokio::spawn(async move {
                    read_request_head(&mut stream).await;
                    handler(stream).await;
                });
            }
        });

        Self { addr, task }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for RawHttpServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn read_request_head(stream: &mut TcpStream) {
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(n) => head.extend_from_slice(&buf[..n]),
        }
    }
}

/// Address nothing is listening on.
pub async fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind probe listener");
    let addr = listener.local_addr().expect("read probe addr");
    drop(listener);
    format!("http://{}/", addr)
}
