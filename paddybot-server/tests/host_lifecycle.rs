//! Host ordering: resources start before the listener serves, in-flight
//! requests drain on shutdown, and resources close only after that.
//! A failed startup unwinds and says which resource broke.

use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::routing::get;
use axum::Router;
use paddybot_server::http::serve;
use paddybot_server::lifecycle::{BoxError, Lifecycle, ManagedResource, ResourceStatus};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

type Journal = Arc<Mutex<Vec<String>>>;

struct Fake {
    name: &'static str,
    journal: Journal,
}

#[async_trait]
impl ManagedResource for Fake {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn status(&self) -> ResourceStatus {
        ResourceStatus::Ready
    }

    async fn init(&self) -> Result<(), BoxError> {
        self.journal.lock().unwrap().push(format!("init {}", self.name));
        Ok(())
    }

    async fn close(&self) {
        self.journal.lock().unwrap().push(format!("close {}", self.name));
    }
}

/// Resource whose init always fails
struct Unreachable;

#[async_trait]
impl ManagedResource for Unreachable {
    fn name(&self) -> &'static str {
        "cache"
    }

    async fn status(&self) -> ResourceStatus {
        ResourceStatus::Uninitialized
    }

    async fn init(&self) -> Result<(), BoxError> {
        Err("connection refused".into())
    }

    async fn close(&self) {}
}

/// In-memory sink for the fmt subscriber
#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl LogBuffer {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

fn lifecycle(journal: &Journal) -> Lifecycle {
    Lifecycle::new()
        .with(Arc::new(Fake {
            name: "database",
            journal: journal.clone(),
        }))
        .with(Arc::new(Fake {
            name: "cache",
            journal: journal.clone(),
        }))
}

fn slow_app(journal: &Journal) -> Router {
    let journal = journal.clone();
    Router::new().route(
        "/slow",
        get(move || {
            let journal = journal.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(200)).await;
                journal.lock().unwrap().push("handled".to_string());
                "done"
            }
        }),
    )
}

#[tokio::test]
async fn in_flight_request_finishes_before_resources_close() {
    let journal = Journal::default();
    let lifecycle = lifecycle(&journal);
    lifecycle.on_startup().await.unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();

    let app = slow_app(&journal);
    let server = tokio::spawn(async move {
        serve(&lifecycle, app, listener, async move {
            let _ = stop_rx.await;
        })
        .await
    });

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET /slow HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();

    // Request is now in flight
    tokio::time::sleep(Duration::from_millis(50)).await;
    stop_tx.send(()).unwrap();

    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    assert!(response.starts_with("HTTP/1.1 200"), "{response}");
    assert!(response.ends_with("done"), "{response}");

    server.await.unwrap().unwrap();
    assert_eq!(
        *journal.lock().unwrap(),
        vec![
            "init database",
            "init cache",
            "handled",
            "close database",
            "close cache"
        ]
    );
}

#[tokio::test]
async fn shutdown_without_traffic_closes_in_registration_order() {
    let journal = Journal::default();
    let lifecycle = lifecycle(&journal);
    lifecycle.on_startup().await.unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    serve(&lifecycle, Router::new(), listener, async {})
        .await
        .unwrap();

    assert_eq!(
        *journal.lock().unwrap(),
        vec!["init database", "init cache", "close database", "close cache"]
    );
}

#[tokio::test]
async fn failed_startup_closes_started_resources_and_logs_the_cause() {
    let logs = LogBuffer::default();
    let sink = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || sink.clone())
        .with_ansi(false)
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let journal = Journal::default();
    let lifecycle = Lifecycle::new()
        .with(Arc::new(Fake {
            name: "database",
            journal: journal.clone(),
        }))
        .with(Arc::new(Unreachable));

    let err = lifecycle
        .on_startup()
        .await
        .expect_err("cache init fails");
    assert_eq!(
        err.to_string(),
        "failed to initialize cache: connection refused"
    );
    assert_eq!(
        *journal.lock().unwrap(),
        vec!["init database", "close database"]
    );

    let logs = logs.contents();
    assert!(logs.contains("Startup aborted"), "{logs}");
    assert!(logs.contains("resource=\"cache\""), "{logs}");
    assert!(logs.contains("connection refused"), "{logs}");
}
