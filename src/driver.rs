//! The driver: one hub, its lights, and the saved presets behind one lock.

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::time::Duration;

use log::{debug, info, warn};

use crate::errors::Error;
use crate::hub::Hub;
use crate::light::{BrightnessControllable, Light, OnOffControllable};
use crate::presets::{Preset, Selection};
use crate::protocol::LightReport;
use crate::runtime::{self, Mutex};
use crate::state::{self, LightState, StateRequest};
use crate::store::{ConfigStore, DriverConfig};
use crate::transport::HubTransport;
use crate::types::ColorIntent;

type Result<T> = std::result::Result<T, Error>;

/// Timing knobs for the driver's own hub checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverOptions {
    pub discovery_timeout: Duration,
    pub heartbeat_timeout: Duration,
    /// Pause before each heartbeat retry; empty means a single attempt.
    pub heartbeat_retry_delays: Vec<Duration>,
}

impl Default for DriverOptions {
    fn default() -> Self {
        DriverOptions {
            discovery_timeout: Duration::from_secs(3),
            heartbeat_timeout: Duration::from_secs(3),
            heartbeat_retry_delays: vec![Duration::from_millis(750), Duration::from_millis(1500)],
        }
    }
}

/// Proof that the operator asked to delete a preset, handed back on confirm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteConfirmation {
    pub name: String,
}

#[derive(Debug, Default)]
struct DriverState {
    config: DriverConfig,
    lights: HashMap<String, Light>,
}

impl DriverState {
    fn ip(&self) -> Result<Ipv4Addr> {
        self.config.hub.ip().ok_or(Error::NoHub)
    }

    fn light_mut(&mut self, id: &str) -> Result<&mut Light> {
        self.lights
            .get_mut(id)
            .ok_or_else(|| Error::LightNotFound(id.to_string()))
    }

    /// Make the light cache match the registry, keeping cached state.
    fn sync_lights(&mut self) {
        let hub = &self.config.hub;
        self.lights.retain(|id, _| hub.contains(id));
        for id in hub.light_ids() {
            let name = hub.name(id).unwrap_or_default();
            self.lights
                .entry(id.clone())
                .and_modify(|light| light.rename(name))
                .or_insert_with(|| Light::new(id, Some(name)));
        }
    }

    fn reconcile(&mut self, reports: &[LightReport]) -> usize {
        let mut updated = 0;
        for report in reports {
            if let Some(light) = self.lights.get_mut(&report.id) {
                light.reconcile(report);
                updated += 1;
            }
        }
        updated
    }
}

/// Controls the lights behind one hub.
///
/// Registry, presets and the per-light state cache live behind a single async
/// lock, so concurrent callers are applied one at a time. Every change to the
/// registry or the presets rewrites the configuration file when the driver
/// has a [`ConfigStore`].
///
/// # Example
///
/// ```ignore
/// use sunflower_lights_rs::{ConfigStore, Driver, DriverOptions, Hub, HubOptions};
///
/// let driver = Driver::with_store(
///     Hub::new(HubOptions::default()),
///     DriverOptions::default(),
///     ConfigStore::new("sunflower.json"),
/// )?;
/// driver.start().await?;
/// for light in driver.lights().await {
///     println!("{} {}", light.id(), light.name());
/// }
/// ```
#[derive(Debug)]
pub struct Driver<T: HubTransport = Hub> {
    transport: T,
    store: Option<ConfigStore>,
    options: DriverOptions,
    state: Mutex<DriverState>,
}

impl<T: HubTransport> Driver<T> {
    /// A driver with an empty, unsaved configuration.
    pub fn new(transport: T, options: DriverOptions) -> Self {
        Driver {
            transport,
            store: None,
            options,
            state: Mutex::new(DriverState::default()),
        }
    }

    /// A driver that loads its configuration from `store` and saves it back
    /// on every change.
    pub fn with_store(transport: T, options: DriverOptions, store: ConfigStore) -> Result<Self> {
        let mut state = DriverState {
            config: store.load()?,
            lights: HashMap::new(),
        };
        state.sync_lights();
        Ok(Driver {
            transport,
            store: Some(store),
            options,
            state: Mutex::new(state),
        })
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn options(&self) -> &DriverOptions {
        &self.options
    }

    /// A copy of the current configuration document.
    pub async fn config(&self) -> DriverConfig {
        self.state.lock().await.config.clone()
    }

    /// Scan for the hub if none has been found yet.
    ///
    /// A discovery failure is returned but leaves the driver usable: the
    /// operator can still supply the address with [`Driver::set_ip`].
    pub async fn start(&self) -> Result<()> {
        if self.state.lock().await.config.hub.is_initialised() {
            debug!("hub already known, skipping scan");
            return Ok(());
        }
        self.scan().await.map(|_| ())
    }

    /// Discover the hub and add any new lights. Returns the new ids.
    pub async fn scan(&self) -> Result<Vec<String>> {
        let mut state = self.state.lock().await;
        let added = state
            .config
            .hub
            .scan_and_merge(&self.transport, self.options.discovery_timeout)
            .await?;
        state.sync_lights();
        self.persist(&state.config)?;
        Ok(added)
    }

    /// Use the hub at `ip` without discovery and add any new lights.
    ///
    /// The address is saved before the light list is queried, so it is kept
    /// even when the hub does not answer yet.
    pub async fn set_ip(&self, ip: Ipv4Addr) -> Result<Vec<String>> {
        let mut state = self.state.lock().await;
        state.config.hub.set_ip(ip);
        self.persist(&state.config)?;
        let added = state.config.hub.scan_at(&self.transport, ip).await?;
        state.sync_lights();
        self.persist(&state.config)?;
        Ok(added)
    }

    /// Heartbeat the configured hub, retrying per [`DriverOptions`].
    pub async fn check_hub(&self) -> Result<()> {
        let ip = self.state.lock().await.ip()?;
        let mut delays = self.options.heartbeat_retry_delays.iter();
        loop {
            match self
                .transport
                .heartbeat(ip, self.options.heartbeat_timeout)
                .await
            {
                Ok(()) => return Ok(()),
                Err(e) => match delays.next() {
                    Some(delay) => {
                        debug!("heartbeat to {ip} failed, retrying in {delay:?}: {e}");
                        runtime::sleep(*delay).await;
                    }
                    None => {
                        warn!("hub {ip} did not answer: {e}");
                        return Err(e);
                    }
                },
            }
        }
    }

    /// Change display names. Unknown ids are ignored; returns how many changed.
    pub async fn rename(&self, names: &HashMap<String, String>) -> Result<usize> {
        let mut state = self.state.lock().await;
        let changed = state.config.hub.rename(names);
        state.sync_lights();
        self.persist(&state.config)?;
        Ok(changed)
    }

    /// Forget the hub and every light, then scan again.
    ///
    /// The cleared configuration is saved before the scan, so a failed scan
    /// still leaves the driver reset.
    pub async fn reset(&self, keep_presets: bool) -> Result<Vec<String>> {
        {
            let mut state = self.state.lock().await;
            state.config.reset(keep_presets);
            state.sync_lights();
            self.persist(&state.config)?;
            info!("configuration reset (presets kept: {keep_presets})");
        }
        self.scan().await
    }

    /// Every known light, in discovery order.
    pub async fn lights(&self) -> Vec<Light> {
        let state = self.state.lock().await;
        state
            .config
            .hub
            .light_ids()
            .iter()
            .filter_map(|id| state.lights.get(id).cloned())
            .collect()
    }

    pub async fn light(&self, id: &str) -> Result<Light> {
        self.state
            .lock()
            .await
            .lights
            .get(id)
            .cloned()
            .ok_or_else(|| Error::LightNotFound(id.to_string()))
    }

    /// Apply a batched state change to one light.
    ///
    /// See [`state::apply`] for ordering, coupling and failure handling.
    pub async fn apply_state(&self, id: &str, request: &StateRequest) -> Result<Light> {
        self.apply_with(id, |_| *request).await
    }

    pub async fn set_on_off(&self, id: &str, on: bool) -> Result<Light> {
        self.apply_state(id, &StateRequest::on_off(on)).await
    }

    pub async fn set_brightness(&self, id: &str, brightness: f64) -> Result<Light> {
        self.apply_state(id, &StateRequest::brightness(brightness))
            .await
    }

    pub async fn set_color(&self, id: &str, color: impl Into<ColorIntent>) -> Result<Light> {
        self.apply_state(id, &StateRequest::color(color)).await
    }

    pub async fn toggle(&self, id: &str) -> Result<Light> {
        self.apply_with(id, |light| light.toggled()).await
    }

    /// Move brightness by `delta`, staying within 0-1.
    pub async fn step_brightness(&self, id: &str, delta: f64) -> Result<Light> {
        self.apply_with(id, |light| light.stepped(delta)).await
    }

    async fn apply_with<F>(&self, id: &str, request: F) -> Result<Light>
    where
        F: FnOnce(&Light) -> StateRequest,
    {
        let mut state = self.state.lock().await;
        let ip = state.ip()?;
        let light = state.light_mut(id)?;
        let request = request(&*light);
        state::apply(&self.transport, ip, light, &request).await
    }

    /// Switch every light off with one hub command.
    pub async fn all_off(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        let ip = state.ip()?;
        self.transport.all_off(ip).await?;
        for light in state.lights.values_mut() {
            light.set_state(light.state().with_level(0));
            light.mark_pending(false);
        }
        info!("all lights off");
        Ok(())
    }

    /// Ids of the lights the hub reports as lit, in discovery order.
    ///
    /// An unreadable light list counts as none lit.
    pub async fn on_lights(&self) -> Result<Vec<String>> {
        let state = self.state.lock().await;
        let reports = self.live_reports(state.ip()?).await?;
        Ok(state
            .config
            .hub
            .light_ids()
            .iter()
            .filter(|id| reports.iter().any(|r| &r.id == *id && r.is_on()))
            .cloned()
            .collect())
    }

    /// Refresh cached on/off and brightness from the hub and clear pending
    /// flags. Returns the number of lights updated.
    pub async fn reconcile(&self) -> Result<usize> {
        let mut state = self.state.lock().await;
        let reports = self.live_reports(state.ip()?).await?;
        let updated = state.reconcile(&reports);
        debug!("reconciled {updated} light(s)");
        Ok(updated)
    }

    /// Capture the selected lights as preset `name`, replacing any old one.
    pub async fn save_preset(&self, name: &str, selection: &Selection) -> Result<Preset> {
        let mut state = self.state.lock().await;
        let ip = state.ip()?;
        let DriverConfig { hub, presets } = &mut state.config;
        let preset = presets
            .save(&self.transport, ip, hub, name, selection)
            .await?;
        self.persist(&state.config)?;
        info!(
            "preset {:?} saved with {} light(s)",
            preset.name,
            preset.snapshots.len()
        );
        Ok(preset)
    }

    /// Replay a preset. Every light is attempted; see [`Preset::activate`].
    ///
    /// The driver stays locked until every command has been answered. Lights
    /// that took the preset get its level and lose their color intent, since
    /// the hub now shows the snapshot's RGB. Lights that failed are left
    /// pending for [`Driver::reconcile`].
    pub async fn activate_preset(&self, name: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        let ip = state.ip()?;
        let preset = state.config.presets.get(name)?;

        let result = preset.activate(&self.transport, ip).await;

        let failed: Vec<String> = match &result {
            Err(Error::Activation { failures, .. }) => {
                failures.iter().map(|f| f.id.clone()).collect()
            }
            _ => Vec::new(),
        };
        if result.is_err() && failed.is_empty() {
            return result;
        }
        for snapshot in &preset.snapshots {
            let Some(light) = state.lights.get_mut(&snapshot.light_id) else {
                continue;
            };
            if failed.contains(&snapshot.light_id) {
                light.mark_pending(true);
                continue;
            }
            light.set_state(LightState {
                color: None,
                ..light.state().with_level(snapshot.level)
            });
            light.mark_pending(false);
        }
        result
    }

    pub async fn preset_names(&self) -> Vec<String> {
        self.state.lock().await.config.presets.names().to_vec()
    }

    pub async fn preset(&self, name: &str) -> Result<Preset> {
        self.state.lock().await.config.presets.get(name)
    }

    /// First half of a two-step delete: checks the preset exists.
    pub async fn request_delete_preset(&self, name: &str) -> Result<DeleteConfirmation> {
        let state = self.state.lock().await;
        if !state.config.presets.contains(name) {
            return Err(Error::PresetNotFound(name.to_string()));
        }
        Ok(DeleteConfirmation {
            name: name.to_string(),
        })
    }

    pub async fn confirm_delete_preset(&self, confirmation: DeleteConfirmation) -> Result<()> {
        self.delete_preset(&confirmation.name).await
    }

    pub async fn delete_preset(&self, name: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        state.config.presets.delete(name)?;
        self.persist(&state.config)?;
        info!("preset {name:?} deleted");
        Ok(())
    }

    async fn live_reports(&self, ip: Ipv4Addr) -> Result<Vec<LightReport>> {
        match self.transport.get_lights(ip).await {
            Err(Error::Protocol(reason)) => {
                warn!("unreadable light list from {ip}: {reason}");
                Ok(Vec::new())
            }
            other => other,
        }
    }

    fn persist(&self, config: &DriverConfig) -> Result<()> {
        match &self.store {
            Some(store) => store.save(config),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeHub;
    use crate::types::{Color, HueSaturation, Kelvin};
    use tempfile::tempdir;

    fn options() -> DriverOptions {
        DriverOptions {
            discovery_timeout: Duration::from_millis(50),
            heartbeat_timeout: Duration::from_millis(50),
            heartbeat_retry_delays: vec![Duration::from_millis(1), Duration::from_millis(1)],
        }
    }

    async fn started(ids: &[&str]) -> Driver<FakeHub> {
        let driver = Driver::new(FakeHub::with_lights(ids), options());
        driver.start().await.unwrap();
        driver
    }

    #[tokio::test]
    async fn test_start_scans_once() {
        let driver = started(&["7B17", "91AC"]).await;
        let ids: Vec<_> = driver
            .lights()
            .await
            .iter()
            .map(|l| l.id().to_string())
            .collect();
        assert_eq!(ids, vec!["7B17", "91AC"]);

        driver.transport().set_lights(Vec::new());
        driver.start().await.unwrap();
        assert_eq!(driver.lights().await.len(), 2);
    }

    #[tokio::test]
    async fn test_discovery_failure_then_manual_ip() {
        let driver = Driver::new(FakeHub::default(), options());
        let err = driver.start().await.unwrap_err();
        assert!(err.is_retryable());
        assert!(!driver.config().await.hub.is_initialised());
        assert_eq!(driver.check_hub().await.unwrap_err(), Error::NoHub);

        let hub = FakeHub::with_lights(&["7B17"]);
        let driver = Driver::new(hub, options());
        let added = driver.set_ip(FakeHub::ADDRESS).await.unwrap();
        assert_eq!(added, vec!["7B17"]);
        driver.check_hub().await.unwrap();
    }

    #[tokio::test]
    async fn test_check_hub_gives_up_after_retries() {
        let driver = started(&["7B17"]).await;
        driver.transport().kill();
        let err = driver.check_hub().await.unwrap_err();
        assert!(matches!(err, Error::HubUnreachable { .. }));
        assert_eq!(driver.config().await.hub.light_ids(), ["7B17"]);
    }

    #[tokio::test]
    async fn test_apply_state_and_helpers() {
        let driver = started(&["7B17"]).await;

        let light = driver.set_brightness("7B17", 0.5).await.unwrap();
        assert!(light.is_on());

        let light = driver.toggle("7B17").await.unwrap();
        assert!(!light.is_on());

        let light = driver.step_brightness("7B17", 0.3).await.unwrap();
        assert_eq!(light.brightness().value(), 0.3);

        let hue = HueSaturation::create(0.0, 1.0).unwrap();
        driver.set_color("7B17", hue).await.unwrap();
        driver
            .set_color("7B17", Kelvin::create(2700).unwrap())
            .await
            .unwrap();
        let cached = driver.light("7B17").await.unwrap();
        assert_eq!(
            cached.state().color,
            Some(ColorIntent::from(Kelvin::create(2700).unwrap()))
        );

        assert_eq!(
            driver.set_on_off("FFFF", true).await.unwrap_err(),
            Error::LightNotFound("FFFF".into())
        );
    }

    #[tokio::test]
    async fn test_failed_apply_is_reconciled() {
        let driver = started(&["7B17"]).await;
        driver.transport().fail_light("7B17");

        assert!(driver.set_brightness("7B17", 0.9).await.is_err());
        let cached = driver.light("7B17").await.unwrap();
        assert!(cached.is_pending());
        assert_eq!(cached.brightness().value(), 0.9);

        assert_eq!(driver.reconcile().await.unwrap(), 1);
        let cached = driver.light("7B17").await.unwrap();
        assert!(!cached.is_pending());
        assert!(!cached.is_on());
    }

    #[tokio::test]
    async fn test_all_off_and_on_lights() {
        let driver = started(&["7B17", "91AC", "03FF"]).await;
        driver.set_on_off("91AC", true).await.unwrap();
        driver.set_brightness("03FF", 0.4).await.unwrap();
        assert_eq!(driver.on_lights().await.unwrap(), vec!["91AC", "03FF"]);

        driver.transport().clear_sent();
        driver.all_off().await.unwrap();
        assert_eq!(driver.transport().sent_lines(), vec!["C 0000,,,,0,\r\n"]);
        assert!(driver.on_lights().await.unwrap().is_empty());
        assert!(driver.lights().await.iter().all(|l| !l.is_on()));
    }

    #[tokio::test]
    async fn test_rename_updates_cache() {
        let driver = started(&["7B17", "91AC"]).await;
        let changed = driver
            .rename(&HashMap::from([("91AC".to_string(), "Desk".to_string())]))
            .await
            .unwrap();
        assert_eq!(changed, 1);
        assert_eq!(driver.light("91AC").await.unwrap().name(), "Desk");
        assert_eq!(driver.light("7B17").await.unwrap().name(), "Yee7B17");
    }

    #[tokio::test]
    async fn test_preset_lifecycle() {
        let driver = started(&["7B17", "91AC"]).await;
        driver
            .transport()
            .set_report("7B17", Color::rgb(255, 0, 0), 70);

        let preset = driver.save_preset("Red", &Selection::All).await.unwrap();
        assert_eq!(preset.snapshots.len(), 2);
        assert_eq!(driver.preset_names().await, vec!["Red"]);

        let cyan = HueSaturation::create(0.5, 1.0).unwrap();
        driver.set_color("7B17", cyan).await.unwrap();

        driver.transport().clear_sent();
        driver.activate_preset("Red").await.unwrap();
        assert_eq!(driver.transport().sent().len(), 2);
        let cached = driver.light("7B17").await.unwrap();
        assert_eq!(cached.brightness().value(), 0.7);
        assert_eq!(cached.state().color, None);

        let confirmation = driver.request_delete_preset("Red").await.unwrap();
        assert_eq!(confirmation.name, "Red");
        driver.confirm_delete_preset(confirmation).await.unwrap();
        assert!(driver.preset_names().await.is_empty());

        assert_eq!(
            driver.request_delete_preset("Red").await.unwrap_err(),
            Error::PresetNotFound("Red".into())
        );
        assert_eq!(
            driver.activate_preset("Red").await.unwrap_err(),
            Error::PresetNotFound("Red".into())
        );
    }

    #[tokio::test]
    async fn test_partial_activation_updates_only_successes() {
        let driver = started(&["7B17", "91AC"]).await;
        driver.transport().set_report("7B17", Color::rgb(0, 0, 255), 50);
        driver.transport().set_report("91AC", Color::rgb(0, 255, 0), 50);
        driver.save_preset("Mixed", &Selection::All).await.unwrap();

        driver.transport().fail_light("91AC");
        let err = driver.activate_preset("Mixed").await.unwrap_err();
        assert!(matches!(err, Error::Activation { ref failures, .. } if failures.len() == 1));
        let applied = driver.light("7B17").await.unwrap();
        assert!(applied.is_on());
        assert!(!applied.is_pending());
        let failed = driver.light("91AC").await.unwrap();
        assert!(!failed.is_on());
        assert!(failed.is_pending());
    }

    #[tokio::test]
    async fn test_apply_during_activation_is_not_lost() {
        let driver = started(&["7B17"]).await;
        driver.transport().set_report("7B17", Color::rgb(255, 0, 0), 80);
        driver.save_preset("Bright", &Selection::All).await.unwrap();
        driver.transport().slow_down(Duration::from_millis(50));

        let (activated, applied) = tokio::join!(driver.activate_preset("Bright"), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            driver.set_brightness("7B17", 0.3).await
        });
        activated.unwrap();
        applied.unwrap();

        let reported = driver
            .transport()
            .get_lights(FakeHub::ADDRESS)
            .await
            .unwrap();
        let cached = driver.light("7B17").await.unwrap();
        assert_eq!(reported[0].level, 30);
        assert_eq!(cached.brightness().level(), reported[0].level);
        assert!(!cached.is_pending());
    }

    #[tokio::test]
    async fn test_concurrent_applies_match_hub() {
        let driver = started(&["7B17", "91AC", "03FF"]).await;
        driver.transport().slow_down(Duration::from_millis(5));

        let (a, b, c, d) = tokio::join!(
            driver.set_brightness("7B17", 0.2),
            driver.set_brightness("91AC", 0.6),
            driver.set_on_off("03FF", true),
            driver.set_brightness("7B17", 0.9),
        );
        for result in [a, b, c, d] {
            result.unwrap();
        }

        let reports = driver
            .transport()
            .get_lights(FakeHub::ADDRESS)
            .await
            .unwrap();
        for report in reports {
            let cached = driver.light(&report.id).await.unwrap();
            assert_eq!(cached.brightness().level(), report.level, "{}", report.id);
        }
        assert_eq!(driver.light("7B17").await.unwrap().brightness().value(), 0.9);
    }

    #[tokio::test]
    async fn test_manual_ip_is_kept_when_hub_is_down() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sunflower.json");
        let hub = FakeHub::with_lights(&["7B17"]);
        hub.kill();

        let driver = Driver::with_store(hub, options(), ConfigStore::new(&path)).unwrap();
        assert!(driver.set_ip(FakeHub::ADDRESS).await.is_err());

        let config = ConfigStore::new(&path).load().unwrap();
        assert_eq!(config.hub.ip(), Some(FakeHub::ADDRESS));
        assert!(!config.hub.is_initialised());
        assert_eq!(driver.config().await.hub.ip(), Some(FakeHub::ADDRESS));
    }

    #[tokio::test]
    async fn test_reset_keeps_presets_and_rescans() {
        let driver = started(&["7B17"]).await;
        driver.save_preset("Keep", &Selection::All).await.unwrap();
        driver
            .rename(&HashMap::from([("7B17".to_string(), "Lamp".to_string())]))
            .await
            .unwrap();

        let added = driver.reset(true).await.unwrap();
        assert_eq!(added, vec!["7B17"]);
        assert_eq!(driver.light("7B17").await.unwrap().name(), "Yee7B17");
        assert_eq!(driver.preset_names().await, vec!["Keep"]);

        driver.reset(false).await.unwrap();
        assert!(driver.preset_names().await.is_empty());
    }

    #[tokio::test]
    async fn test_changes_are_persisted() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sunflower.json");

        let driver = Driver::with_store(
            FakeHub::with_lights(&["7B17", "91AC"]),
            options(),
            ConfigStore::new(&path),
        )
        .unwrap();
        driver.start().await.unwrap();
        driver
            .rename(&HashMap::from([("7B17".to_string(), "Lamp".to_string())]))
            .await
            .unwrap();
        driver.save_preset("Night", &Selection::All).await.unwrap();

        let reloaded = Driver::with_store(FakeHub::default(), options(), ConfigStore::new(&path))
            .unwrap();
        reloaded.start().await.unwrap();
        assert_eq!(reloaded.light("7B17").await.unwrap().name(), "Lamp");
        assert_eq!(reloaded.preset_names().await, vec!["Night"]);
        assert_eq!(reloaded.config().await.hub.ip(), Some(FakeHub::ADDRESS));
    }
}
