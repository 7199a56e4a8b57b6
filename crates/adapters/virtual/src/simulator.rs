//! Periodic device activity.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;

use homedash_app::ports::StateStorage;
use homedash_app::store::DeviceStore;
use homedash_domain::device::{ClimateState, Device, DevicePatch, DeviceState, Reading};
use homedash_domain::error::HomeDashError;

/// Offsets applied to sensor readings, cycled by tick number.
const TEMPERATURE_STEPS: [f64; 4] = [0.2, 0.1, -0.1, -0.2];
const HUMIDITY_STEPS: [f64; 4] = [-0.5, 1.0, 0.5, -1.0];

/// Largest temperature change of a climate device per tick, in °C.
const CLIMATE_STEP: f64 = 0.5;

/// Batteries lose one percent every this many ticks.
const BATTERY_DRAIN_EVERY: u64 = 5;

/// Drives simulated activity through store commands.
///
/// Every [`tick`](Self::tick) is deterministic: given the same store
/// contents and tick number it issues the same commands.
pub struct Simulator<S> {
    store: Arc<DeviceStore<S>>,
    ticks: u64,
}

impl<S: StateStorage> Simulator<S> {
    pub fn new(store: Arc<DeviceStore<S>>) -> Self {
        Self { store, ticks: 0 }
    }

    /// Number of completed ticks.
    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Run one update round and return how many devices were updated.
    ///
    /// Online sensors get new `temperature`/`humidity` readings, online
    /// climate devices move toward their target and, every few ticks, every
    /// device with a non-empty battery drains by one percent. Devices removed
    /// concurrently are skipped.
    ///
    /// # Errors
    ///
    /// Returns any store error other than a missing device.
    pub fn tick(&mut self) -> Result<usize, HomeDashError> {
        self.ticks += 1;
        let snapshot = self.store.snapshot();
        let mut updated = 0;

        for device in snapshot.devices.values() {
            let mut changed = false;
            if device.is_online()
                && let Some(state) = self.next_state(device)
            {
                changed |= skip_missing(self.store.set_device_state(&device.id, state))?;
            }
            if self.ticks % BATTERY_DRAIN_EVERY == 0
                && let Some(level) = device.battery.filter(|level| *level > 0)
            {
                let patch = DevicePatch::default().battery(level - 1);
                changed |= skip_missing(self.store.update_device(&device.id, patch))?;
            }
            if changed {
                updated += 1;
            }
        }

        tracing::debug!(tick = self.ticks, updated, "simulation tick");
        Ok(updated)
    }

    fn next_state(&self, device: &Device) -> Option<DeviceState> {
        let step = usize::try_from(self.ticks % 4).unwrap_or_default();
        match &device.state {
            DeviceState::Sensor(sensor) => {
                let mut sensor = sensor.clone();
                let mut touched = false;
                for (key, delta, bounds) in [
                    ("temperature", TEMPERATURE_STEPS[step], (-40.0, 60.0)),
                    ("humidity", HUMIDITY_STEPS[step], (0.0, 100.0)),
                ] {
                    if let Some(value) = sensor.get(key).and_then(Reading::as_number) {
                        let next = round1((value + delta).clamp(bounds.0, bounds.1));
                        sensor = sensor.with(key, next);
                        touched = true;
                    }
                }
                touched.then_some(DeviceState::Sensor(sensor))
            }
            DeviceState::Climate(ClimateState {
                temperature,
                target: Some(target),
            }) => {
                let diff = target - temperature;
                if diff.abs() < f64::EPSILON {
                    return None;
                }
                let moved = temperature + diff.clamp(-CLIMATE_STEP, CLIMATE_STEP);
                Some(DeviceState::Climate(ClimateState {
                    temperature: round1(moved),
                    target: Some(*target),
                }))
            }
            _ => None,
        }
    }

    /// Tick every `period` until `shutdown` resolves, then return the number
    /// of completed ticks.
    ///
    /// Tick failures are logged and do not stop the loop.
    pub async fn run<F>(mut self, period: Duration, shutdown: F) -> u64
    where
        F: Future<Output = ()>,
    {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        tracing::info!(period_ms = period.as_millis(), "simulator started");
        loop {
            tokio::select! {
                biased;
                () = &mut shutdown => break,
                _ = interval.tick() => {
                    if let Err(err) = self.tick() {
                        tracing::warn!(error = %err, "simulation tick failed");
                    }
                }
            }
        }
        tracing::info!(ticks = self.ticks, "simulator stopped");
        self.ticks
    }
}

fn skip_missing(result: Result<(), HomeDashError>) -> Result<bool, HomeDashError> {
    match result {
        Ok(()) => Ok(true),
        Err(err) if err.is_not_found() => Ok(false),
        Err(err) => Err(err),
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
