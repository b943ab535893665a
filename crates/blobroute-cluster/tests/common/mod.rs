//! Scripted backend double shared by the cluster integration tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;

use blobroute_cluster::ClusterClient;
use blobroute_core::{
    BackendError, BackendResult, ByteStream, ClusterConfig, DeleteMultiOptions, GetOptions,
    HeadOptions, ListOptions, ListPage, ObjectBackend, ObjectContent, ObjectMeta, PutOptions,
    Receipt, SignatureOptions,
};

/// Outcome of one scripted call.
#[derive(Debug, Clone, Copy)]
pub enum Outcome {
    Ok,
    Status(u16),
    Transport,
}

#[derive(Default)]
struct MockState {
    /// One-shot outcomes per operation, consumed FIFO.
    queued: HashMap<&'static str, Vec<Outcome>>,
    /// Persistent outcome per operation, applied when the queue is dry.
    pinned: HashMap<&'static str, Outcome>,
    /// Ordered log of `op:key` calls.
    calls: Vec<String>,
    /// Artificial latency applied to every async operation.
    delay: Option<Duration>,
}

/// Backend double with per-operation scripting and a call log.
///
/// Unscripted calls succeed and tag their results with the backend's name
/// (as the etag), so tests can tell which node served an operation.
pub struct MockBackend {
    pub name: String,
    state: Mutex<MockState>,
}

impl MockBackend {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            state: Mutex::default(),
        })
    }

    /// Queue one-shot outcomes for `op`, consumed in order.
    pub fn script(&self, op: &'static str, outcomes: Vec<Outcome>) {
        self.state
            .lock()
            .unwrap()
            .queued
            .entry(op)
            .or_default()
            .extend(outcomes);
    }

    /// Pin a persistent outcome for `op`.
    pub fn pin(&self, op: &'static str, outcome: Outcome) {
        self.state.lock().unwrap().pinned.insert(op, outcome);
    }

    /// Delay every async operation, to hold a health cycle open.
    pub fn set_delay(&self, delay: Duration) {
        self.state.lock().unwrap().delay = Some(delay);
    }

    /// Number of calls to `op`, any key.
    pub fn calls(&self, op: &str) -> usize {
        let prefix = format!("{}:", op);
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|call| call.starts_with(&prefix))
            .count()
    }

    /// Number of calls to `op` for exactly `key`.
    pub fn calls_for(&self, op: &str, key: &str) -> usize {
        let entry = format!("{}:{}", op, key);
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|call| **call == entry)
            .count()
    }

    fn next_outcome(&self, op: &'static str, key: &str) -> (Outcome, Option<Duration>) {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("{}:{}", op, key));
        let queued = state.queued.get_mut(op).and_then(|queue| {
            if queue.is_empty() {
                None
            } else {
                Some(queue.remove(0))
            }
        });
        let outcome = match queued {
            Some(outcome) => outcome,
            None => state.pinned.get(op).copied().unwrap_or(Outcome::Ok),
        };
        (outcome, state.delay)
    }

    async fn apply(&self, op: &'static str, key: &str) -> BackendResult<()> {
        let (outcome, delay) = self.next_outcome(op, key);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match outcome {
            Outcome::Ok => Ok(()),
            Outcome::Status(status) => Err(BackendError::with_status(
                status,
                format!("{} on {} answered {}", op, self.name, status),
            )),
            Outcome::Transport => {
                Err(BackendError::transport(format!("{} unreachable", self.name)))
            }
        }
    }

    fn meta(&self) -> ObjectMeta {
        ObjectMeta {
            etag: Some(self.name.clone()),
            size: Some(3),
            ..ObjectMeta::default()
        }
    }

    fn receipt(&self, key: &str) -> Receipt {
        Receipt {
            etag: Some(self.name.clone()),
            url: Some(self.object_url(key)),
        }
    }
}

#[async_trait]
impl ObjectBackend for MockBackend {
    async fn head(&self, key: &str, _opts: &HeadOptions) -> BackendResult<ObjectMeta> {
        self.apply("head", key).await?;
        Ok(self.meta())
    }

    async fn get(&self, key: &str, _opts: &GetOptions) -> BackendResult<ObjectContent> {
        self.apply("get", key).await?;
        Ok(ObjectContent {
            meta: self.meta(),
            body: Bytes::from_static(b"abc"),
        })
    }

    async fn get_stream(&self, key: &str, _opts: &GetOptions) -> BackendResult<ByteStream> {
        self.apply("get_stream", key).await?;
        Ok(futures::stream::iter(vec![Ok(Bytes::from_static(b"abc"))]).boxed())
    }

    async fn list(&self, _opts: &ListOptions) -> BackendResult<ListPage> {
        self.apply("list", "").await?;
        Ok(ListPage::default())
    }

    async fn put(&self, key: &str, _body: Bytes, _opts: &PutOptions) -> BackendResult<Receipt> {
        self.apply("put", key).await?;
        Ok(self.receipt(key))
    }

    async fn put_stream(
        &self,
        key: &str,
        mut body: ByteStream,
        _opts: &PutOptions,
    ) -> BackendResult<Receipt> {
        while let Some(chunk) = body.next().await {
            chunk?;
        }
        self.apply("put_stream", key).await?;
        Ok(self.receipt(key))
    }

    async fn delete(&self, key: &str) -> BackendResult<Receipt> {
        self.apply("delete", key).await?;
        Ok(self.receipt(key))
    }

    async fn delete_multi(
        &self,
        keys: &[String],
        _opts: &DeleteMultiOptions,
    ) -> BackendResult<Receipt> {
        self.apply("delete_multi", &keys.join(",")).await?;
        Ok(Receipt {
            etag: Some(self.name.clone()),
            url: None,
        })
    }

    async fn copy(&self, dest: &str, _src: &str, _opts: &PutOptions) -> BackendResult<Receipt> {
        self.apply("copy", dest).await?;
        Ok(self.receipt(dest))
    }

    async fn put_meta(
        &self,
        key: &str,
        _meta: &HashMap<String, String>,
    ) -> BackendResult<Receipt> {
        self.apply("put_meta", key).await?;
        Ok(self.receipt(key))
    }

    fn signature_url(&self, key: &str, opts: &SignatureOptions) -> BackendResult<String> {
        Ok(format!(
            "mock://{}/{}?method={}&expires={}",
            self.name, key, opts.method, opts.expires_secs
        ))
    }

    fn object_url(&self, key: &str) -> String {
        format!("mock://{}/{}", self.name, key)
    }
}

/// Config with the heartbeat pushed out of the way of the test body.
pub fn test_config() -> ClusterConfig {
    ClusterConfig {
        heartbeat_interval: Duration::from_secs(3600),
        ..ClusterConfig::default()
    }
}

/// Start a client over mocks and wait until the first check completes.
pub async fn started_client(
    backends: Vec<Arc<MockBackend>>,
    config: ClusterConfig,
) -> ClusterClient {
    let handles: Vec<Arc<dyn ObjectBackend>> = backends
        .iter()
        .map(|backend| backend.clone() as Arc<dyn ObjectBackend>)
        .collect();
    let client = ClusterClient::with_backends(handles, config)
        .await
        .expect("cluster construction");
    client.ready().await;
    client
}
