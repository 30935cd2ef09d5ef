//! Structured logging tests.
//!
//! Captures JSON log lines emitted by the namespace and checks the events
//! operators rely on: schema bootstrap and expired-row sweeps.

use parking_lot::Mutex;
use sqlkv::{Clock, KvNamespace, ManualClock, NamespaceOptions, PutOptions, ValueType};
use sqlkv::sql::SqliteBackend;
use std::io;
use std::sync::Arc;
use tracing_subscriber::fmt::MakeWriter;

#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl Captured {
    fn lines(&self) -> Vec<serde_json::Value> {
        String::from_utf8_lossy(&self.0.lock())
            .lines()
            .map(|line| serde_json::from_str(line).expect("log line is not JSON"))
            .collect()
    }

    fn messages(&self) -> Vec<String> {
        self.lines()
            .iter()
            .filter_map(|l| l["fields"]["message"].as_str().map(str::to_string))
            .collect()
    }
}

impl io::Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for Captured {
    type Writer = Captured;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn subscriber(captured: &Captured) -> impl tracing::Subscriber + Send + Sync {
    tracing_subscriber::fmt()
        .json()
        .with_max_level(tracing::Level::DEBUG)
        .with_writer(captured.clone())
        .finish()
}

fn namespace(clock: Arc<ManualClock>) -> KvNamespace {
    let backend = Arc::new(SqliteBackend::memory().expect("Failed to open database"));
    KvNamespace::with_clock(backend, NamespaceOptions::default(), clock)
        .expect("Failed to create namespace")
}

#[tokio::test]
async fn test_schema_bootstrap_is_logged_once() {
    let captured = Captured::default();
    let _guard = tracing::subscriber::set_default(subscriber(&captured));

    let kv = namespace(Arc::new(ManualClock::new(1_700_000_000)));
    kv.get("a", ValueType::Text).await.expect("get failed");
    kv.get("b", ValueType::Text).await.expect("get failed");

    let ready: Vec<_> = captured
        .lines()
        .into_iter()
        .filter(|l| l["fields"]["message"] == "KV schema ready")
        .collect();
    assert_eq!(ready.len(), 1);
    assert_eq!(ready[0]["level"], "INFO");
    assert_eq!(ready[0]["fields"]["table"], "kv_entries");
}

#[tokio::test]
async fn test_prune_logs_removed_count() {
    let captured = Captured::default();
    let _guard = tracing::subscriber::set_default(subscriber(&captured));

    let clock = Arc::new(ManualClock::new(1_700_000_000));
    let kv = namespace(Arc::clone(&clock));
    kv.put("a", "1", PutOptions::new().expiration_ttl(1))
        .await
        .expect("put failed");
    clock.advance(5);

    assert_eq!(kv.prune_expired().await.expect("prune failed"), 1);
    assert_eq!(kv.prune_expired().await.expect("prune failed"), 0);

    let lines = captured.lines();
    let pruned: Vec<_> = lines
        .iter()
        .filter(|l| l["fields"]["message"] == "Pruned expired KV entries")
        .collect();
    assert_eq!(pruned.len(), 1);
    assert_eq!(pruned[0]["fields"]["removed"], 1);
    assert_eq!(pruned[0]["fields"]["now"], clock.now_secs());

    assert!(
        captured
            .messages()
            .iter()
            .any(|m| m == "No expired KV entries to prune")
    );
}
