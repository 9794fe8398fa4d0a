//! Named multi-light scenes captured from the hub.

use std::collections::BTreeMap;
use std::net::Ipv4Addr;
use std::str::FromStr;

use futures::future::join_all;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};

use crate::errors::{Error, LightFailure};
use crate::protocol::LightReport;
use crate::registry::HubConfig;
use crate::transport::HubTransport;
use crate::types::Color;

type Result<T> = std::result::Result<T, Error>;

/// Color and level of one light at the moment a preset was saved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(rename = "lightID")]
    pub light_id: String,
    #[serde(flatten)]
    pub color: Color,
    pub level: u8,
}

impl From<&LightReport> for Snapshot {
    fn from(report: &LightReport) -> Self {
        Snapshot {
            light_id: report.id.clone(),
            color: report.color,
            level: report.level,
        }
    }
}

/// A saved scene.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preset {
    pub name: String,
    pub snapshots: Vec<Snapshot>,
}

impl Preset {
    /// Replay every snapshot with one combined set per light.
    ///
    /// Lights not in the preset are left alone. This is not atomic: every
    /// entry is attempted, the ones that succeeded stay applied, and all
    /// failures are reported together in [`Error::Activation`].
    pub async fn activate<T: HubTransport>(&self, transport: &T, ip: Ipv4Addr) -> Result<()> {
        let results = join_all(self.snapshots.iter().map(|snapshot| async move {
            transport
                .set_light(ip, &snapshot.light_id, snapshot.color, snapshot.level)
                .await
                .map_err(|error| LightFailure {
                    id: snapshot.light_id.clone(),
                    error,
                })
        }))
        .await;

        let failures: Vec<LightFailure> = results.into_iter().filter_map(|r| r.err()).collect();
        if failures.is_empty() {
            info!("preset {:?} applied to {} light(s)", self.name, self.snapshots.len());
            return Ok(());
        }

        let err = Error::Activation {
            preset: self.name.clone(),
            failures,
        };
        error!("{err}");
        Err(err)
    }
}

/// Which lights a preset captures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Every light in the registry at save time.
    All,
    Lights(Vec<String>),
}

impl FromStr for Selection {
    type Err = String;

    /// `all`, or a comma-separated list of light ids.
    ///
    /// ```
    /// use sunflower_lights_rs::Selection;
    ///
    /// assert_eq!("all".parse::<Selection>().unwrap(), Selection::All);
    /// assert_eq!(
    ///     "7b17, 91AC".parse::<Selection>().unwrap(),
    ///     Selection::Lights(vec!["7B17".into(), "91AC".into()])
    /// );
    /// assert!("".parse::<Selection>().is_err());
    /// ```
    fn from_str(s: &str) -> std::result::Result<Self, String> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(Selection::All);
        }
        let ids: Vec<String> = s
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_ascii_uppercase)
            .collect();
        if ids.is_empty() {
            return Err(format!("no light ids in {s:?}"));
        }
        Ok(Selection::Lights(ids))
    }
}

/// Every saved preset, listed in the order they were first saved.
///
/// `preset_names` and the keys of `presets` always hold the same names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresetStore {
    #[serde(rename = "presetNames")]
    pub(crate) preset_names: Vec<String>,
    pub(crate) presets: BTreeMap<String, Vec<Snapshot>>,
}

impl PresetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn names(&self) -> &[String] {
        &self.preset_names
    }

    pub fn len(&self) -> usize {
        self.preset_names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.preset_names.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.presets.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Result<Preset> {
        self.presets
            .get(name)
            .map(|snapshots| Preset {
                name: name.to_string(),
                snapshots: snapshots.clone(),
            })
            .ok_or_else(|| Error::PresetNotFound(name.to_string()))
    }

    /// Store `snapshots` under `name`, replacing any preset of that name.
    ///
    /// A new name goes to the end of the listing; an overwritten one keeps its
    /// place.
    pub fn record(&mut self, name: &str, snapshots: Vec<Snapshot>) -> Result<Preset> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidPresetName(name.to_string()));
        }
        if !self.presets.contains_key(name) {
            self.preset_names.push(name.to_string());
        }
        self.presets.insert(name.to_string(), snapshots.clone());
        Ok(Preset {
            name: name.to_string(),
            snapshots,
        })
    }

    /// Capture the live state of the selected lights and record it as `name`.
    ///
    /// Explicitly selected ids must be in `registry`. Selected lights that the
    /// hub does not currently report are skipped; a malformed light list
    /// counts as no lights.
    pub async fn save<T: HubTransport>(
        &mut self,
        transport: &T,
        ip: Ipv4Addr,
        registry: &HubConfig,
        name: &str,
        selection: &Selection,
    ) -> Result<Preset> {
        if name.trim().is_empty() {
            return Err(Error::InvalidPresetName(name.to_string()));
        }
        let ids = match selection {
            Selection::All => registry.light_ids().to_vec(),
            Selection::Lights(ids) => {
                if let Some(unknown) = ids.iter().find(|id| !registry.contains(id)) {
                    return Err(Error::LightNotFound(unknown.clone()));
                }
                ids.clone()
            }
        };

        let reports = match transport.get_lights(ip).await {
            Ok(reports) => reports,
            Err(Error::Protocol(reason)) => {
                warn!("unreadable light list while saving {name:?}: {reason}");
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        self.record(name, capture(&reports, &ids))
    }

    /// Remove a preset and its place in the listing.
    pub fn delete(&mut self, name: &str) -> Result<()> {
        if self.presets.remove(name).is_none() {
            return Err(Error::PresetNotFound(name.to_string()));
        }
        self.preset_names.retain(|n| n != name);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.preset_names.clear();
        self.presets.clear();
    }

    /// Make the listing and the map agree again after a hand edit.
    pub(crate) fn normalize(&mut self) {
        let mut seen = Vec::with_capacity(self.preset_names.len());
        for name in self.preset_names.drain(..) {
            if self.presets.contains_key(&name) && !seen.contains(&name) {
                seen.push(name);
            }
        }
        for name in self.presets.keys() {
            if !seen.contains(name) {
                seen.push(name.clone());
            }
        }
        self.preset_names = seen;
    }
}

/// Snapshots for `ids`, in that order, taken from a live light list.
pub fn capture(reports: &[LightReport], ids: &[String]) -> Vec<Snapshot> {
    ids.iter()
        .filter_map(|id| match reports.iter().find(|r| &r.id == id) {
            Some(report) => Some(Snapshot::from(report)),
            None => {
                warn!("light {id} not reported by the hub, leaving it out of the preset");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Control;
    use crate::testing::FakeHub;
    use std::time::Duration;

    const IP: Ipv4Addr = FakeHub::ADDRESS;

    async fn scanned(hub: &FakeHub) -> HubConfig {
        let mut registry = HubConfig::new();
        registry
            .scan_and_merge(hub, Duration::from_millis(50))
            .await
            .unwrap();
        registry
    }

    #[tokio::test]
    async fn test_save_all_then_activate_replays_capture() {
        let hub = FakeHub::with_lights(&["7B17", "91AC", "03FF"]);
        hub.set_report("7B17", Color::rgb(255, 0, 0), 80);
        hub.set_report("91AC", Color::rgb(10, 20, 30), 0);
        hub.set_report("03FF", Color::rgb(0, 0, 255), 45);
        let registry = scanned(&hub).await;

        let mut store = PresetStore::new();
        let preset = store
            .save(&hub, IP, &registry, "Evening", &Selection::All)
            .await
            .unwrap();
        assert_eq!(preset.snapshots.len(), 3);
        assert_eq!(store.names(), ["Evening"]);

        hub.set_report("7B17", Color::rgb(1, 1, 1), 10);
        store.get("Evening").unwrap().activate(&hub, IP).await.unwrap();

        let mut sent: Vec<Control> = hub.sent();
        sent.sort_by(|a, b| a.id().cmp(b.id()));
        let expected = [
            ("03FF", Color::rgb(0, 0, 255), 45),
            ("7B17", Color::rgb(255, 0, 0), 80),
            ("91AC", Color::rgb(10, 20, 30), 0),
        ];
        assert_eq!(sent.len(), expected.len());
        for (control, (id, color, level)) in sent.iter().zip(expected) {
            assert_eq!(control.id(), id);
            assert_eq!(control.color, Some(color));
            assert_eq!(control.level, Some(level));
        }
    }

    #[tokio::test]
    async fn test_save_selected_lights() {
        let hub = FakeHub::with_lights(&["7B17", "91AC"]);
        let registry = scanned(&hub).await;
        let mut store = PresetStore::new();

        let selection = Selection::Lights(vec!["91AC".into()]);
        let preset = store
            .save(&hub, IP, &registry, "Desk", &selection)
            .await
            .unwrap();
        assert_eq!(preset.snapshots.len(), 1);
        assert_eq!(preset.snapshots[0].light_id, "91AC");

        let unknown = Selection::Lights(vec!["FFFF".into()]);
        let err = store
            .save(&hub, IP, &registry, "Ghost", &unknown)
            .await
            .unwrap_err();
        assert_eq!(err, Error::LightNotFound("FFFF".into()));
        assert!(!store.contains("Ghost"));
    }

    #[tokio::test]
    async fn test_offline_light_is_skipped() {
        let hub = FakeHub::with_lights(&["7B17", "91AC"]);
        let registry = scanned(&hub).await;
        hub.set_lights(Vec::new());

        let mut store = PresetStore::new();
        let preset = store
            .save(&hub, IP, &registry, "Empty", &Selection::All)
            .await
            .unwrap();
        assert!(preset.snapshots.is_empty());
    }

    #[tokio::test]
    async fn test_partial_failure_reports_every_light() {
        let hub = FakeHub::with_lights(&["7B17", "91AC", "03FF"]);
        let registry = scanned(&hub).await;
        let mut store = PresetStore::new();
        let preset = store
            .save(&hub, IP, &registry, "Movie", &Selection::All)
            .await
            .unwrap();

        hub.fail_light("7B17");
        hub.fail_light("03FF");
        let err = preset.activate(&hub, IP).await.unwrap_err();

        let Error::Activation { preset, failures } = err else {
            panic!("expected an activation error");
        };
        assert_eq!(preset, "Movie");
        let mut ids: Vec<_> = failures.iter().map(|f| f.id.as_str()).collect();
        ids.sort();
        assert_eq!(ids, vec!["03FF", "7B17"]);
        assert_eq!(hub.sent_lines().len(), 1);
    }

    #[test]
    fn test_overwrite_keeps_position() {
        let mut store = PresetStore::new();
        store.record("A", Vec::new()).unwrap();
        store.record("B", Vec::new()).unwrap();
        let snapshot = Snapshot {
            light_id: "7B17".into(),
            color: Color::rgb(1, 2, 3),
            level: 4,
        };
        store.record("A", vec![snapshot.clone()]).unwrap();

        assert_eq!(store.names(), ["A", "B"]);
        assert_eq!(store.get("A").unwrap().snapshots, vec![snapshot]);
        assert_eq!(
            store.record("  ", Vec::new()).unwrap_err(),
            Error::InvalidPresetName(String::new())
        );
    }

    #[test]
    fn test_delete() {
        let mut store = PresetStore::new();
        store.record("A", Vec::new()).unwrap();
        store.record("B", Vec::new()).unwrap();

        store.delete("A").unwrap();
        assert_eq!(store.names(), ["B"]);
        assert!(!store.contains("A"));

        let before = store.clone();
        assert_eq!(
            store.delete("A").unwrap_err(),
            Error::PresetNotFound("A".into())
        );
        assert_eq!(store, before);
    }

    #[test]
    fn test_persisted_shape() {
        let mut store = PresetStore::new();
        store
            .record(
                "Night",
                vec![Snapshot {
                    light_id: "7B17".into(),
                    color: Color::rgb(255, 120, 0),
                    level: 20,
                }],
            )
            .unwrap();

        let json = serde_json::to_value(&store).unwrap();
        assert_eq!(json["presetNames"][0], "Night");
        assert_eq!(
            json["presets"]["Night"][0],
            serde_json::json!({"lightID": "7B17", "r": 255, "g": 120, "b": 0, "level": 20})
        );
    }

    #[test]
    fn test_normalize() {
        let mut store: PresetStore = serde_json::from_str(
            r#"{"presetNames": ["B", "Gone", "B"], "presets": {"A": [], "B": []}}"#,
        )
        .unwrap();
        store.normalize();
        assert_eq!(store.names(), ["B", "A"]);
    }
}
