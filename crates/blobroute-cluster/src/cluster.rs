use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::{broadcast, watch, RwLock};
use tokio::task::JoinHandle;
use tracing::{error, info};

use blobroute_core::{
    ByteStream, ClusterConfig, ClusterError, ClusterResult, DeleteMultiOptions, EndpointConfig,
    GetOptions, HeadOptions, ListOptions, ListPage, ObjectBackend, ObjectContent, ObjectMeta,
    PutOptions, Receipt, SignatureOptions,
};

use crate::dispatch::Dispatcher;
use crate::events::{ClusterEvent, EventBus};
use crate::health_checker::HealthChecker;
use crate::node::{Availability, ClusterNode};
use crate::scheduler::Scheduler;

/// One logical handle over a cluster of object-storage endpoints.
///
/// Reads are routed to a single scheduled node and fail over across the
/// remaining nodes on transport failures; writes fan out to every node and
/// must be accepted by all of them. A background heartbeat task probes each
/// node and feeds the availability map the scheduler consults.
///
/// The client emits [`ClusterEvent`]s on a broadcast bus: a one-time
/// `Ready` after the first availability check, a diagnostic event for every
/// failing check cycle, and an initialization failure signal. None of these
/// interrupt caller operations.
pub struct ClusterClient {
    dispatcher: Arc<Dispatcher>,
    checker: Arc<HealthChecker>,
    availability: Arc<RwLock<Availability>>,
    events: Arc<EventBus>,
    ready_rx: watch::Receiver<bool>,
    heartbeat: Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl ClusterClient {
    /// Build one backend per endpoint through `factory` and start the
    /// client.
    ///
    /// Cluster-wide timeouts are merged into each endpoint config before it
    /// reaches the factory, so every node is built with identical common
    /// options.
    pub async fn new<F>(
        endpoints: Vec<EndpointConfig>,
        config: ClusterConfig,
        factory: F,
    ) -> ClusterResult<Self>
    where
        F: Fn(&EndpointConfig) -> ClusterResult<Arc<dyn ObjectBackend>>,
    {
        if endpoints.is_empty() {
            return Err(ClusterError::Config(
                "cluster requires at least one endpoint".to_string(),
            ));
        }

        let mut backends = Vec::with_capacity(endpoints.len());
        for endpoint in &endpoints {
            let mut endpoint = endpoint.clone();
            config.apply_defaults(&mut endpoint);
            backends.push(factory(&endpoint)?);
        }
        Self::with_backends(backends, config).await
    }

    /// Start the client over pre-built backends.
    pub async fn with_backends(
        backends: Vec<Arc<dyn ObjectBackend>>,
        config: ClusterConfig,
    ) -> ClusterResult<Self> {
        if backends.is_empty() {
            return Err(ClusterError::Config(
                "cluster requires at least one endpoint".to_string(),
            ));
        }

        let nodes: Arc<Vec<ClusterNode>> = Arc::new(
            backends
                .into_iter()
                .enumerate()
                .map(|(index, backend)| ClusterNode::new(index, backend))
                .collect(),
        );
        let node_count = nodes.len();

        let availability = Arc::new(RwLock::new(Availability::new(node_count)));
        let scheduler = Scheduler::new(config.schedule, node_count, availability.clone());
        let dispatcher = Arc::new(Dispatcher::new(nodes.clone(), scheduler));
        let events = Arc::new(EventBus::new(16));
        let checker = Arc::new(HealthChecker::new(
            nodes,
            availability.clone(),
            dispatcher.clone(),
            events.clone(),
            config.probe_attempts,
        ));

        let (ready_tx, ready_rx) = watch::channel(false);
        let heartbeat = Self::spawn_heartbeat(
            checker.clone(),
            events.clone(),
            ready_tx,
            config.heartbeat_interval,
        );

        info!(nodes = node_count, schedule = ?config.schedule, "cluster client started");

        Ok(Self {
            dispatcher,
            checker,
            availability,
            events,
            ready_rx,
            heartbeat: Mutex::new(Some(heartbeat)),
            closed: AtomicBool::new(false),
        })
    }

    fn spawn_heartbeat(
        checker: Arc<HealthChecker>,
        events: Arc<EventBus>,
        ready_tx: watch::Sender<bool>,
        interval: Duration,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            // First cycle also writes the probe object through the write
            // path; only its completion flips the ready latch.
            match checker.check_availability(true).await {
                Ok(()) => {
                    let _ = ready_tx.send(true);
                    events.emit(ClusterEvent::Ready);
                }
                Err(err) => {
                    error!("cluster initialization failed: {}", err);
                    events.emit(ClusterEvent::InitFailed {
                        message: err.to_string(),
                    });
                }
            }

            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await; // consume the immediate first tick
            loop {
                ticker.tick().await;
                if let Err(err) = checker.check_availability(false).await {
                    error!("availability check failed: {}", err);
                }
            }
        })
    }

    /// Resolve once the first availability check has completed.
    ///
    /// Returns immediately when the latch is already set; also unblocks if
    /// the client is closed before ever becoming ready.
    pub async fn ready(&self) {
        let mut ready_rx = self.ready_rx.clone();
        let _ = ready_rx.wait_for(|ready| *ready).await;
    }

    pub fn is_ready(&self) -> bool {
        *self.ready_rx.borrow()
    }

    /// Subscribe to lifecycle and diagnostic events.
    pub fn subscribe(&self) -> broadcast::Receiver<ClusterEvent> {
        self.events.subscribe()
    }

    pub fn node_count(&self) -> usize {
        self.dispatcher.nodes().len()
    }

    /// Current availability per node index.
    pub async fn availability(&self) -> Vec<bool> {
        self.availability.read().await.snapshot()
    }

    /// Key of the object the heartbeat probes.
    pub fn probe_key(&self) -> &str {
        self.checker.probe_key()
    }

    /// Cancel the heartbeat and make the client inert.
    ///
    /// Idempotent. In-flight operations are left to finish; new operations
    /// fail with [`ClusterError::Closed`].
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(handle) = self.heartbeat.lock().ok().and_then(|mut slot| slot.take()) {
            handle.abort();
        }
        info!("cluster client closed");
    }

    fn ensure_open(&self) -> ClusterResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ClusterError::Closed);
        }
        Ok(())
    }

    /// Fetch object metadata from one scheduled node, with failover.
    pub async fn head(&self, key: &str, opts: HeadOptions) -> ClusterResult<ObjectMeta> {
        self.ensure_open()?;
        let key = key.to_string();
        self.dispatcher
            .read(move |backend| {
                let key = key.clone();
                let opts = opts.clone();
                Box::pin(async move { backend.head(&key, &opts).await })
            })
            .await
    }

    /// Fetch an object fully buffered, with failover.
    pub async fn get(&self, key: &str, opts: GetOptions) -> ClusterResult<ObjectContent> {
        self.ensure_open()?;
        let key = key.to_string();
        self.dispatcher
            .read(move |backend| {
                let key = key.clone();
                let opts = opts.clone();
                Box::pin(async move { backend.get(&key, &opts).await })
            })
            .await
    }

    /// Open an object as a stream of chunks, with failover.
    ///
    /// Failover applies to opening the stream; once a node has started
    /// answering, its stream is the caller's.
    pub async fn get_stream(&self, key: &str, opts: GetOptions) -> ClusterResult<ByteStream> {
        self.ensure_open()?;
        let key = key.to_string();
        self.dispatcher
            .read(move |backend| {
                let key = key.clone();
                let opts = opts.clone();
                Box::pin(async move { backend.get_stream(&key, &opts).await })
            })
            .await
    }

    /// List one page of objects from one scheduled node, with failover.
    pub async fn list(&self, opts: ListOptions) -> ClusterResult<ListPage> {
        self.ensure_open()?;
        self.dispatcher
            .read(move |backend| {
                let opts = opts.clone();
                Box::pin(async move { backend.list(&opts).await })
            })
            .await
    }

    /// Store an object on every node; all nodes must accept the write.
    pub async fn put(&self, key: &str, body: Bytes, opts: PutOptions) -> ClusterResult<Receipt> {
        self.ensure_open()?;
        let key = key.to_string();
        self.dispatcher
            .write(move |backend| {
                let key = key.clone();
                let body = body.clone();
                let opts = opts.clone();
                Box::pin(async move { backend.put(&key, body, &opts).await })
            })
            .await
    }

    /// Stream an object to every node.
    ///
    /// `body` is invoked once per node: a byte stream cannot be replayed,
    /// so each node consumes its own instance.
    pub async fn put_stream<F>(
        &self,
        key: &str,
        body: F,
        opts: PutOptions,
    ) -> ClusterResult<Receipt>
    where
        F: Fn() -> ByteStream + Send + Sync + 'static,
    {
        self.ensure_open()?;
        let key = key.to_string();
        let body = Arc::new(body);
        self.dispatcher
            .write(move |backend| {
                let key = key.clone();
                let opts = opts.clone();
                let body = Arc::clone(&body);
                Box::pin(async move { backend.put_stream(&key, body(), &opts).await })
            })
            .await
    }

    /// Delete an object on every node.
    pub async fn delete(&self, key: &str) -> ClusterResult<Receipt> {
        self.ensure_open()?;
        let key = key.to_string();
        self.dispatcher
            .write(move |backend| {
                let key = key.clone();
                Box::pin(async move { backend.delete(&key).await })
            })
            .await
    }

    /// Delete several objects on every node.
    pub async fn delete_multi(
        &self,
        keys: &[String],
        opts: DeleteMultiOptions,
    ) -> ClusterResult<Receipt> {
        self.ensure_open()?;
        let keys = keys.to_vec();
        self.dispatcher
            .write(move |backend| {
                let keys = keys.clone();
                let opts = opts.clone();
                Box::pin(async move { backend.delete_multi(&keys, &opts).await })
            })
            .await
    }

    /// Copy an object on every node.
    pub async fn copy(&self, dest: &str, src: &str, opts: PutOptions) -> ClusterResult<Receipt> {
        self.ensure_open()?;
        let dest = dest.to_string();
        let src = src.to_string();
        self.dispatcher
            .write(move |backend| {
                let dest = dest.clone();
                let src = src.clone();
                let opts = opts.clone();
                Box::pin(async move { backend.copy(&dest, &src, &opts).await })
            })
            .await
    }

    /// Replace an object's user metadata on every node.
    pub async fn put_meta(
        &self,
        key: &str,
        meta: HashMap<String, String>,
    ) -> ClusterResult<Receipt> {
        self.ensure_open()?;
        let key = key.to_string();
        self.dispatcher
            .write(move |backend| {
                let key = key.clone();
                let meta = meta.clone();
                Box::pin(async move { backend.put_meta(&key, &meta).await })
            })
            .await
    }

    /// Sign a URL on one scheduled node.
    ///
    /// Signing is local computation, so there is no failover: the scheduled
    /// node answers, whatever it answers.
    pub async fn signature_url(
        &self,
        key: &str,
        opts: SignatureOptions,
    ) -> ClusterResult<String> {
        self.ensure_open()?;
        let index = self.dispatcher.scheduler().choose_available().await;
        self.dispatcher.nodes()[index]
            .backend
            .signature_url(key, &opts)
            .map_err(ClusterError::Backend)
    }
}

impl Drop for ClusterClient {
    fn drop(&mut self) {
        self.close();
    }
}
