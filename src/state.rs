use std::sync::Arc;
use std::time::Instant;

use tokio::sync::broadcast;

use crate::config::Config;
use crate::learning::{DomainEvent, LearningManager};
use crate::store::Store;

#[derive(Clone)]
pub struct AppState {
    store: Arc<Store>,
    manager: Arc<LearningManager>,
    config: Arc<Config>,
    events_tx: broadcast::Sender<DomainEvent>,
    shutdown_tx: broadcast::Sender<()>,
    started_at: Instant,
}

impl AppState {
    pub fn new(
        store: Arc<Store>,
        manager: Arc<LearningManager>,
        config: &Config,
        shutdown_tx: broadcast::Sender<()>,
    ) -> Self {
        let (events_tx, _) = broadcast::channel(config.event_channel_capacity.max(1));

        Self {
            store,
            manager,
            config: Arc::new(config.clone()),
            events_tx,
            shutdown_tx,
            started_at: Instant::now(),
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn manager(&self) -> &LearningManager {
        &self.manager
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// 发布领域事件：无订阅者时直接丢弃，不影响请求结果。
    pub fn publish(&self, events: &[DomainEvent]) {
        for event in events {
            if self.events_tx.send(event.clone()).is_err() {
                tracing::trace!(event = event.name(), "No event subscribers");
            }
        }
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<DomainEvent> {
        self.events_tx.subscribe()
    }

    pub fn shutdown_rx(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    pub fn shutdown_tx(&self) -> &broadcast::Sender<()> {
        &self.shutdown_tx
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
