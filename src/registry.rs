//! The durable list of lights behind the hub.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::net::Ipv4Addr;
use std::time::Duration;

use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_with::{NoneAsEmptyString, serde_as};

use crate::errors::Error;
use crate::light::default_name;
use crate::protocol::LightReport;
use crate::transport::HubTransport;

type Result<T> = std::result::Result<T, Error>;

/// Which hub to use and which lights it has shown us.
///
/// `light_ids` keeps first-discovery order and never holds duplicates. Every
/// id has exactly one entry in `names`.
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    pub(crate) initialised: bool,
    #[serde_as(as = "NoneAsEmptyString")]
    pub(crate) ip: Option<Ipv4Addr>,
    #[serde(rename = "lightIDs")]
    pub(crate) light_ids: Vec<String>,
    pub(crate) names: BTreeMap<String, String>,
}

impl HubConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once a hub has been scanned successfully.
    pub fn is_initialised(&self) -> bool {
        self.initialised
    }

    pub fn ip(&self) -> Option<Ipv4Addr> {
        self.ip
    }

    pub fn light_ids(&self) -> &[String] {
        &self.light_ids
    }

    pub fn contains(&self, id: &str) -> bool {
        self.names.contains_key(id)
    }

    pub fn name(&self, id: &str) -> Option<&str> {
        self.names.get(id).map(String::as_str)
    }

    pub fn names(&self) -> &BTreeMap<String, String> {
        &self.names
    }

    /// Point the registry at a hub address without touching the lights.
    pub fn set_ip(&mut self, ip: Ipv4Addr) {
        self.ip = Some(ip);
    }

    /// Add every reported light not seen before, in report order.
    ///
    /// Known lights keep their names; lights missing from the report stay.
    /// Returns the ids that were added.
    ///
    /// # Examples
    ///
    /// ```
    /// use sunflower_lights_rs::{Color, HubConfig, LightReport};
    ///
    /// let report = |id: &str| LightReport {
    ///     id: id.to_string(),
    ///     online: true,
    ///     color: Color::rgb(255, 255, 255),
    ///     level: 0,
    /// };
    ///
    /// let mut config = HubConfig::new();
    /// assert_eq!(config.merge(&[report("A1"), report("B2")]), vec!["A1", "B2"]);
    /// assert_eq!(config.merge(&[report("B2"), report("C3")]), vec!["C3"]);
    /// assert_eq!(config.light_ids(), ["A1", "B2", "C3"]);
    /// assert_eq!(config.name("C3"), Some("YeeC3"));
    /// ```
    pub fn merge(&mut self, reports: &[LightReport]) -> Vec<String> {
        let mut added = Vec::new();
        for report in reports {
            if self.contains(&report.id) {
                continue;
            }
            self.light_ids.push(report.id.clone());
            self.names
                .insert(report.id.clone(), default_name(&report.id));
            added.push(report.id.clone());
        }
        added
    }

    /// Discover the hub, then merge its light list.
    ///
    /// On a discovery failure nothing changes and the registry stays
    /// uninitialised if it was.
    pub async fn scan_and_merge<T: HubTransport>(
        &mut self,
        transport: &T,
        discovery_timeout: Duration,
    ) -> Result<Vec<String>> {
        let ip = transport.discover(discovery_timeout).await?;
        self.scan_at(transport, ip).await
    }

    /// Merge the light list of the hub at `ip`, skipping discovery.
    ///
    /// A malformed light list counts as no lights.
    pub async fn scan_at<T: HubTransport>(
        &mut self,
        transport: &T,
        ip: Ipv4Addr,
    ) -> Result<Vec<String>> {
        let reports = match transport.get_lights(ip).await {
            Ok(reports) => reports,
            Err(Error::Protocol(reason)) => {
                warn!("hub {ip} sent an unreadable light list, treating as empty: {reason}");
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        let added = self.merge(&reports);
        self.ip = Some(ip);
        self.initialised = true;
        info!(
            "hub {ip}: {} light(s) reported, {} new, {} known",
            reports.len(),
            added.len(),
            self.light_ids.len()
        );
        Ok(added)
    }

    /// Update display names for the given ids.
    ///
    /// Ids not in the registry are ignored; a blank name restores the default.
    /// Returns the number of names that changed.
    pub fn rename(&mut self, names: &HashMap<String, String>) -> usize {
        let mut changed = 0;
        for (id, name) in names {
            let Some(current) = self.names.get_mut(id) else {
                warn!("ignoring rename of unknown light {id}");
                continue;
            };
            let name = match name.trim() {
                "" => default_name(id),
                trimmed => trimmed.to_string(),
            };
            if *current != name {
                *current = name;
                changed += 1;
            }
        }
        changed
    }

    /// Forget the hub and every light.
    pub fn reset(&mut self) {
        *self = HubConfig::default();
    }

    /// Restore the invariants on a document that may have been edited by hand.
    pub(crate) fn normalize(&mut self) {
        let mut seen = HashSet::new();
        self.light_ids.retain(|id| seen.insert(id.clone()));
        for id in &self.light_ids {
            self.names
                .entry(id.clone())
                .or_insert_with(|| default_name(id));
        }
        self.names.retain(|id, _| seen.contains(id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeHub;

    const TIMEOUT: Duration = Duration::from_millis(100);

    #[tokio::test]
    async fn test_scan_twice_is_stable() {
        let hub = FakeHub::with_lights(&["7B17", "91AC", "03FF"]);
        let mut config = HubConfig::new();

        let added = config.scan_and_merge(&hub, TIMEOUT).await.unwrap();
        assert_eq!(added, vec!["7B17", "91AC", "03FF"]);
        assert!(config.is_initialised());
        assert_eq!(config.ip(), Some(FakeHub::ADDRESS));

        let before = serde_json::to_string(&config).unwrap();
        assert!(config.scan_and_merge(&hub, TIMEOUT).await.unwrap().is_empty());
        assert_eq!(serde_json::to_string(&config).unwrap(), before);
    }

    #[tokio::test]
    async fn test_offline_lights_are_kept_and_names_survive() {
        let hub = FakeHub::with_lights(&["7B17", "91AC"]);
        let mut config = HubConfig::new();
        config.scan_and_merge(&hub, TIMEOUT).await.unwrap();
        config.rename(&HashMap::from([("91AC".to_string(), "Desk".to_string())]));

        let only_new = FakeHub::with_lights(&["91AC", "55AA"]);
        let added = config.scan_and_merge(&only_new, TIMEOUT).await.unwrap();

        assert_eq!(added, vec!["55AA"]);
        assert_eq!(config.light_ids(), ["7B17", "91AC", "55AA"]);
        assert_eq!(config.name("91AC"), Some("Desk"));
        assert_eq!(config.name("7B17"), Some("Yee7B17"));
    }

    #[tokio::test]
    async fn test_discovery_failure_leaves_registry_untouched() {
        let hub = FakeHub::default();
        let mut config = HubConfig::new();
        let err = config.scan_and_merge(&hub, TIMEOUT).await.unwrap_err();
        assert!(matches!(err, Error::Discovery { .. }));
        assert_eq!(config, HubConfig::new());
    }

    #[tokio::test]
    async fn test_malformed_list_counts_as_empty() {
        let hub = FakeHub::with_lights(&["7B17"]);
        hub.send_garbage();
        let mut config = HubConfig::new();
        let added = config.scan_at(&hub, FakeHub::ADDRESS).await.unwrap();
        assert!(added.is_empty());
        assert!(config.is_initialised());
    }

    #[test]
    fn test_rename() {
        let mut config = HubConfig::new();
        config.light_ids = vec!["A1".into(), "B2".into()];
        config.normalize();

        let changed = config.rename(&HashMap::from([
            ("A1".to_string(), " Kitchen ".to_string()),
            ("ZZ".to_string(), "Ghost".to_string()),
        ]));
        assert_eq!(changed, 1);
        assert_eq!(config.name("A1"), Some("Kitchen"));
        assert_eq!(config.name("B2"), Some("YeeB2"));
        assert!(!config.contains("ZZ"));

        config.rename(&HashMap::from([("A1".to_string(), "  ".to_string())]));
        assert_eq!(config.name("A1"), Some("YeeA1"));
    }

    #[test]
    fn test_persisted_shape() {
        let mut config = HubConfig::new();
        config.set_ip(Ipv4Addr::new(10, 0, 0, 2));
        config.light_ids = vec!["A1".into()];
        config.normalize();

        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["ip"], "10.0.0.2");
        assert_eq!(json["lightIDs"][0], "A1");
        assert_eq!(json["names"]["A1"], "YeeA1");

        let empty: HubConfig = serde_json::from_str(r#"{"ip": ""}"#).unwrap();
        assert_eq!(empty.ip(), None);
        assert!(!empty.is_initialised());
    }

    #[test]
    fn test_normalize() {
        let mut config: HubConfig = serde_json::from_str(
            r#"{"initialised": true, "lightIDs": ["A1", "B2", "A1"], "names": {"A1": "Lamp", "C3": "Gone"}}"#,
        )
        .unwrap();
        config.normalize();
        assert_eq!(config.light_ids(), ["A1", "B2"]);
        assert_eq!(config.name("A1"), Some("Lamp"));
        assert_eq!(config.name("B2"), Some("YeeB2"));
        assert!(!config.contains("C3"));
    }
}
