//! # homedashd, the homedash daemon
//!
//! Composition root that wires storage, the device store and the simulator
//! together and runs until interrupted.
//!
//! ## Responsibilities
//! - Parse configuration (config file, env vars)
//! - Install the tracing subscriber
//! - Pick the storage adapter (file directory or in-memory)
//! - Load the device store, seeding the demo home when it is empty
//! - Attach observers: dashboard stats logging and low-battery alerts
//! - Run the simulator and handle graceful shutdown (SIGINT)
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer; no domain logic belongs here.

mod config;

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

use homedash_adapter_storage_file::{FileStorage, MemoryStorage};
use homedash_adapter_virtual::{Simulator, seed_demo_home};
use homedash_app::change::StoreChange;
use homedash_app::change_bus::ChangeBus;
use homedash_app::ports::StateStorage;
use homedash_app::store::DeviceStore;
use homedash_domain::connection::ConnectionStatus;
use homedash_domain::device::LOW_BATTERY_THRESHOLD;

use crate::config::Config;

type Store = DeviceStore<Arc<dyn StateStorage>>;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&config.logging.filter)?)
        .init();

    // Storage
    let storage: Arc<dyn StateStorage> = if let Some(dir) = config.storage_dir() {
        tracing::info!(dir = %dir.display(), "using file storage");
        Arc::new(FileStorage::new(dir))
    } else {
        tracing::info!("using in-memory storage");
        Arc::new(MemoryStorage::new())
    };

    // Store
    let store: Arc<Store> = Arc::new(DeviceStore::new(storage));
    if config.simulation.seed_demo && store.all_devices().is_empty() && store.all_rooms().is_empty()
    {
        seed_demo_home(&store)?;
    }
    let report = store.consistency_report();
    if !report.is_consistent() {
        tracing::warn!(
            dangling_room_refs = report.dangling_room_refs.len(),
            device_count_drift = report.device_count_drift.len(),
            "loaded store is inconsistent"
        );
    }

    // Observers
    store.subscribe(|change, snapshot| {
        if change.is_durable() {
            let stats = snapshot.stats();
            tracing::debug!(
                total = stats.total,
                online = stats.online,
                active = stats.active,
                energy_kw = stats.energy_kw,
                "dashboard stats"
            );
        }
    });
    let bus = ChangeBus::new(256);
    bus.attach(&store);
    let alerts = tokio::spawn(watch_batteries(Arc::clone(&store), bus));

    // Connection
    store.set_connection_status(ConnectionStatus::Connecting);
    store.set_connection_status(ConnectionStatus::Connected);
    tracing::info!(
        devices = store.all_devices().len(),
        rooms = store.all_rooms().len(),
        "homedashd running"
    );

    if config.simulation.enabled {
        Simulator::new(Arc::clone(&store))
            .run(config.simulation_interval(), shutdown_signal())
            .await;
    } else {
        shutdown_signal().await;
    }

    store.set_connection_status(ConnectionStatus::Disconnected);
    alerts.abort();
    tracing::info!("homedashd stopped");
    Ok(())
}

/// Warn once each time a device crosses into low battery.
async fn watch_batteries(store: Arc<Store>, bus: ChangeBus) {
    let mut changes = bus.subscribe();
    loop {
        match changes.recv().await {
            Ok(StoreChange::DeviceUpdated(id)) => {
                if let Some(device) = store.device(&id)
                    && device.battery == Some(LOW_BATTERY_THRESHOLD - 1)
                {
                    tracing::warn!(device_id = %id, name = %device.name, "battery low");
                }
            }
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "battery watcher lagged");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
