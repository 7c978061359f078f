use std::sync::Arc;

use tracing::info;

use crate::Result;
use crate::climate::ThermostatEntity;
use crate::client::SmatrixClient;
use crate::config::{ConfigEntry, Settings};
use crate::coordinator::{Coordinator, CoordinatorBuilder, PollerHandle, SnapshotSource};

/// A configured hub with its poller running and one entity per thermostat.
///
/// Dropping it without [`Integration::unload`] stops polling but leaves the connection open.
pub struct Integration {
    entry: ConfigEntry,
    client: Arc<SmatrixClient>,
    coordinator: Arc<Coordinator>,
    entities: Vec<ThermostatEntity>,
    poller: PollerHandle,
}

impl Integration {
    pub async fn setup(entry: ConfigEntry, settings: &Settings) -> Result<Self> {
        Self::setup_with(entry, settings, |builder| builder).await
    }

    /// Like [`Integration::setup`], letting the caller attach coordinator callbacks.
    ///
    /// Fails when the first fetch fails; the host should retry setup later.
    pub async fn setup_with(
        entry: ConfigEntry,
        settings: &Settings,
        configure: impl FnOnce(CoordinatorBuilder) -> CoordinatorBuilder,
    ) -> Result<Self> {
        let client = Arc::new(settings.client_builder(entry.host()).build()?);
        let builder = Coordinator::builder(Arc::clone(&client)).interval(settings.scan_interval());
        let coordinator = Arc::new(configure(builder).build());

        let snapshot = match coordinator.refresh().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                client.close();
                return Err(e);
            }
        };

        let source: Arc<dyn SnapshotSource> = coordinator.clone();
        let entities: Vec<ThermostatEntity> = snapshot
            .thermostats()
            .iter()
            .map(|record| {
                ThermostatEntity::new(&entry.entry_id, record, Arc::clone(&client), Arc::clone(&source))
            })
            .collect();

        info!(host = %entry.host(), entities = entities.len(), "integration set up");
        let poller = coordinator.spawn();

        Ok(Self {
            entry,
            client,
            coordinator,
            entities,
            poller,
        })
    }

    pub fn entry(&self) -> &ConfigEntry {
        &self.entry
    }

    pub fn coordinator(&self) -> &Arc<Coordinator> {
        &self.coordinator
    }

    pub fn entities(&self) -> &[ThermostatEntity] {
        &self.entities
    }

    pub fn entity(&self, code: &str) -> Option<&ThermostatEntity> {
        self.entities.iter().find(|e| e.code() == code)
    }

    /// Stops polling, then closes the connection. Entities kept past this point fail writes
    /// with [`crate::Error::Closed`].
    pub async fn unload(self) {
        self.poller.stop().await;
        self.client.close();
        info!(host = %self.entry.host(), "integration unloaded");
    }
}
