//! Runtime wiring of the subsystems.
//!
//! ## Initialization Order
//!
//! 1. Router with the shared time source
//! 2. Dispatcher and its worker pool
//! 3. In-process sender handing routed envelopes to the pool
//! 4. Access controller installed as the router's gate (when enabled)
//! 5. Sweep tasks for the message queue and correlation table

use crate::config::{ClusterControllerConfig, ConfigError};
use cc_01_message_routing::{
    queue_sweep_task, HttpMessagingSkeleton, InProcessMessagingSkeleton, MessageSender,
    MqttMessagingSkeleton, Router, WebSocketMessagingSkeleton,
};
use cc_02_access_control::{
    AccessController, DomainAccessStore, LocalDomainAccessController, ProviderDirectory,
};
use cc_03_dispatching::{
    expiry_sweep_task, ClientQCache, DispatchPool, Dispatcher, InProcessMessagingStub,
    MessagingFacade, MessagingQos, ProxyConnector, RequestCaller,
};
use shared_types::{Address, AddressKind, TimeSource};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

/// A running cluster controller.
pub struct ClusterController {
    config: ClusterControllerConfig,
    time: Arc<dyn TimeSource>,
    router: Router,
    dispatcher: Arc<Dispatcher>,
    pool: DispatchPool,
    access_store: Arc<DomainAccessStore>,
    directory: Arc<ProviderDirectory>,
    facade: Arc<MessagingFacade>,
    cache: Arc<ClientQCache>,
    shutdown_tx: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl ClusterController {
    /// Validate `config` and start every subsystem.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(
        config: ClusterControllerConfig,
        time: Arc<dyn TimeSource>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        info!("Starting cluster controller");

        let router = Router::new(time.clone());
        let router_port: Arc<Router> = Arc::new(router.clone());

        let dispatcher = Arc::new(Dispatcher::new(router_port.clone(), time.clone()));
        let pool = DispatchPool::start(
            dispatcher.clone(),
            config.dispatcher.worker_count,
            config.dispatcher.queue_capacity,
        );
        router.register_sender(
            AddressKind::InProcess,
            Arc::new(InProcessMessagingStub::new(pool.handle())),
        );

        let access_store = Arc::new(DomainAccessStore::new());
        let directory = Arc::new(ProviderDirectory::new());
        if config.access_control.enabled {
            let controller = AccessController::new(
                Arc::new(LocalDomainAccessController::new(access_store.clone())),
                directory.clone(),
                config.access_control.trust_level,
            );
            router.set_access_gate(Arc::new(controller));
            info!(trust_level = ?config.access_control.trust_level, "access control enabled");
        } else {
            info!("access control disabled, all provider calls are permitted");
        }

        let facade = Arc::new(MessagingFacade::new(
            router_port,
            dispatcher.correlation(),
            time.clone(),
        ));
        let cache = Arc::new(ClientQCache::new(
            config.cache.client_cache_capacity,
            time.clone(),
        ));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let tasks = vec![
            spawn_until_shutdown(
                "queue-sweep",
                queue_sweep_task(router.clone(), config.routing.queue_sweep_interval),
                shutdown_rx.clone(),
            ),
            spawn_until_shutdown(
                "expiry-sweep",
                expiry_sweep_task(
                    dispatcher.clone(),
                    config.dispatcher.correlation_sweep_interval,
                ),
                shutdown_rx,
            ),
        ];

        info!(
            worker_count = config.dispatcher.worker_count,
            queue_capacity = config.dispatcher.queue_capacity,
            "cluster controller running"
        );

        Ok(Self {
            config,
            time,
            router,
            dispatcher,
            pool,
            access_store,
            directory,
            facade,
            cache,
            shutdown_tx,
            tasks,
        })
    }

    /// Make a local provider reachable and known to access control.
    pub fn register_provider(
        &self,
        participant_id: &str,
        domain: &str,
        interface_name: &str,
        caller: Arc<dyn RequestCaller>,
    ) {
        self.dispatcher.add_request_caller(participant_id, caller);
        self.directory
            .register(participant_id, domain, interface_name);
        self.router.add_next_hop(participant_id, Address::InProcess);
    }

    pub fn unregister_provider(&self, participant_id: &str) -> bool {
        let removed = self.dispatcher.remove_request_caller(participant_id);
        self.directory.unregister(participant_id);
        self.router.remove_next_hop(participant_id);
        removed
    }

    /// Make a local consumer reachable for replies and publications.
    pub fn register_consumer(&self, participant_id: &str) {
        self.router.add_next_hop(participant_id, Address::InProcess);
    }

    /// Create a proxy from a local consumer to `provider_id`.
    pub fn create_proxy(
        &self,
        proxy_id: &str,
        provider_id: &str,
        qos: MessagingQos,
        max_cache_age: Duration,
    ) -> ProxyConnector {
        self.register_consumer(proxy_id);
        ProxyConnector::new(
            self.facade.clone(),
            self.cache.clone(),
            self.time.clone(),
            proxy_id,
            provider_id,
            qos,
        )
        .with_max_cache_age(max_cache_age)
    }

    /// Install the outbound sender of a transport.
    pub fn register_transport(&self, kind: AddressKind, sender: Arc<dyn MessageSender>) {
        self.router.register_sender(kind, sender);
    }

    pub fn mqtt_skeleton(&self) -> MqttMessagingSkeleton {
        MqttMessagingSkeleton::new(self.router.clone())
    }

    pub fn http_skeleton(&self) -> HttpMessagingSkeleton {
        HttpMessagingSkeleton::new(self.router.clone())
    }

    pub fn websocket_skeleton(&self) -> WebSocketMessagingSkeleton {
        WebSocketMessagingSkeleton::new(self.router.clone())
    }

    pub fn in_process_skeleton(&self) -> InProcessMessagingSkeleton {
        InProcessMessagingSkeleton::new(self.router.clone())
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    pub fn facade(&self) -> &Arc<MessagingFacade> {
        &self.facade
    }

    pub fn access_store(&self) -> &Arc<DomainAccessStore> {
        &self.access_store
    }

    pub fn config(&self) -> &ClusterControllerConfig {
        &self.config
    }

    /// Stop the sweep tasks and drain the dispatch pool.
    pub async fn shutdown(self) {
        info!("Initiating graceful shutdown...");
        let _ = self.shutdown_tx.send(true);
        for task in self.tasks {
            let _ = task.await;
        }
        self.pool.shutdown().await;
        info!("Shutdown complete");
    }
}

fn spawn_until_shutdown(
    name: &'static str,
    task: impl Future<Output = ()> + Send + 'static,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = task => {}
            _ = shutdown.changed() => {
                info!(task = name, "Shutdown signal received");
            }
        }
    })
}
