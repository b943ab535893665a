//! Three in-memory nodes behind one cluster handle.
//!
//! Writes fan out to every node; reads come from the scheduled node and fail
//! over when it dies. Run with:
//!
//! ```sh
//! cargo run --example failover
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;

use blobroute_cluster::ClusterClient;
use blobroute_core::{
    BackendError, BackendResult, ByteStream, ClusterConfig, DeleteMultiOptions, GetOptions,
    HeadOptions, ListOptions, ListPage, ObjectBackend, ObjectContent, ObjectMeta, ObjectSummary,
    PutOptions, Receipt, SchedulePolicy, SignatureOptions,
};

/// Toy backend keeping objects in a map; can be switched "down" at runtime.
struct MemoryBackend {
    name: String,
    objects: Mutex<HashMap<String, Bytes>>,
    down: AtomicBool,
}

impl MemoryBackend {
    fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            objects: Mutex::new(HashMap::new()),
            down: AtomicBool::new(false),
        })
    }

    fn check_up(&self) -> BackendResult<()> {
        if self.down.load(Ordering::Relaxed) {
            Err(BackendError::transport(format!("{} is down", self.name)))
        } else {
            Ok(())
        }
    }

    fn meta(&self, body: &Bytes) -> ObjectMeta {
        ObjectMeta {
            etag: Some(self.name.clone()),
            size: Some(body.len() as u64),
            ..ObjectMeta::default()
        }
    }

    fn receipt(&self, key: &str) -> Receipt {
        Receipt {
            etag: Some(self.name.clone()),
            url: Some(self.object_url(key)),
        }
    }

    fn not_found(&self, key: &str) -> BackendError {
        BackendError::with_status(404, format!("no such key: {}", key))
    }
}

#[async_trait]
impl ObjectBackend for MemoryBackend {
    async fn head(&self, key: &str, _opts: &HeadOptions) -> BackendResult<ObjectMeta> {
        self.check_up()?;
        let objects = self.objects.lock().unwrap();
        objects
            .get(key)
            .map(|body| self.meta(body))
            .ok_or_else(|| self.not_found(key))
    }

    async fn get(&self, key: &str, _opts: &GetOptions) -> BackendResult<ObjectContent> {
        self.check_up()?;
        let objects = self.objects.lock().unwrap();
        objects
            .get(key)
            .map(|body| ObjectContent {
                meta: self.meta(body),
                body: body.clone(),
            })
            .ok_or_else(|| self.not_found(key))
    }

    async fn get_stream(&self, key: &str, opts: &GetOptions) -> BackendResult<ByteStream> {
        let content = self.get(key, opts).await?;
        Ok(futures::stream::iter(vec![Ok(content.body)]).boxed())
    }

    async fn list(&self, opts: &ListOptions) -> BackendResult<ListPage> {
        self.check_up()?;
        let objects = self.objects.lock().unwrap();
        let prefix = opts.prefix.clone().unwrap_or_default();
        let mut summaries: Vec<ObjectSummary> = objects
            .iter()
            .filter(|(key, _)| key.starts_with(&prefix))
            .map(|(key, body)| ObjectSummary {
                key: key.clone(),
                etag: Some(self.name.clone()),
                size: body.len() as u64,
                last_modified: None,
            })
            .collect();
        summaries.sort_by(|x, y| x.key.cmp(&y.key));
        Ok(ListPage {
            objects: summaries,
            ..ListPage::default()
        })
    }

    async fn put(&self, key: &str, body: Bytes, _opts: &PutOptions) -> BackendResult<Receipt> {
        self.check_up()?;
        self.objects.lock().unwrap().insert(key.to_string(), body);
        Ok(self.receipt(key))
    }

    async fn put_stream(
        &self,
        key: &str,
        mut body: ByteStream,
        opts: &PutOptions,
    ) -> BackendResult<Receipt> {
        let mut buffered = Vec::new();
        while let Some(chunk) = body.next().await {
            buffered.extend_from_slice(&chunk?);
        }
        self.put(key, Bytes::from(buffered), opts).await
    }

    async fn delete(&self, key: &str) -> BackendResult<Receipt> {
        self.check_up()?;
        self.objects.lock().unwrap().remove(key);
        Ok(self.receipt(key))
    }

    async fn delete_multi(
        &self,
        keys: &[String],
        _opts: &DeleteMultiOptions,
    ) -> BackendResult<Receipt> {
        self.check_up()?;
        let mut objects = self.objects.lock().unwrap();
        for key in keys {
            objects.remove(key);
        }
        Ok(Receipt {
            etag: Some(self.name.clone()),
            url: None,
        })
    }

    async fn copy(&self, dest: &str, src: &str, _opts: &PutOptions) -> BackendResult<Receipt> {
        self.check_up()?;
        let mut objects = self.objects.lock().unwrap();
        let body = objects.get(src).cloned().ok_or_else(|| self.not_found(src))?;
        objects.insert(dest.to_string(), body);
        Ok(self.receipt(dest))
    }

    async fn put_meta(
        &self,
        key: &str,
        _meta: &HashMap<String, String>,
    ) -> BackendResult<Receipt> {
        self.check_up()?;
        let objects = self.objects.lock().unwrap();
        if objects.contains_key(key) {
            Ok(self.receipt(key))
        } else {
            Err(self.not_found(key))
        }
    }

    fn signature_url(&self, key: &str, opts: &SignatureOptions) -> BackendResult<String> {
        Ok(format!(
            "mem://{}/{}?method={}&expires={}",
            self.name, key, opts.method, opts.expires_secs
        ))
    }

    fn object_url(&self, key: &str) -> String {
        format!("mem://{}/{}", self.name, key)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let alpha = MemoryBackend::new("alpha");
    let beta = MemoryBackend::new("beta");
    let gamma = MemoryBackend::new("gamma");

    let config = ClusterConfig {
        schedule: SchedulePolicy::MasterSlave,
        heartbeat_interval: Duration::from_secs(1),
        ..ClusterConfig::default()
    };
    let backends: Vec<Arc<dyn ObjectBackend>> =
        vec![alpha.clone(), beta.clone(), gamma.clone()];
    let client = ClusterClient::with_backends(backends, config).await?;
    client.ready().await;

    client
        .put("greeting", Bytes::from_static(b"hello"), PutOptions::default())
        .await?;
    let content = client.get("greeting", GetOptions::default()).await?;
    println!(
        "served by {:?}: {:?}",
        content.meta.etag,
        String::from_utf8_lossy(&content.body)
    );

    // Kill the master; the next read fails over transparently.
    alpha.down.store(true, Ordering::Relaxed);
    let content = client.get("greeting", GetOptions::default()).await?;
    println!(
        "after killing alpha, served by {:?}: {:?}",
        content.meta.etag,
        String::from_utf8_lossy(&content.body)
    );

    // Give the heartbeat a chance to notice and reroute at the scheduler.
    tokio::time::sleep(Duration::from_millis(1500)).await;
    println!("availability: {:?}", client.availability().await);

    client.close();
    Ok(())
}
