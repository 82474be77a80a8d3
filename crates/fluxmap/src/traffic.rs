//! Traffic store: the latest snapshot plus bounded per-region history.
//!
//! History is offset-scoped: switching the replay offset wipes every
//! buffer, because timelines at different offsets are not comparable.

use std::collections::{BTreeMap, VecDeque};
use std::time::{SystemTime, UNIX_EPOCH};

use fluxmap_graph::{
    collect_region_nodes, connection_name, Connection, ConnectionSeries, Node, NodeSeries,
    TrafficSnapshot,
};

use crate::action::{Action, ActionEnvelope};
use crate::dispatch::StoreEvents;

/// Retained snapshots per node/connection key; doubles as the chart's
/// visible-window hint.
pub const MAX_HISTORY_LENGTH: usize = 30;

pub fn unix_now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}

/// Rolling buffers for one region: node name -> states, connection
/// name -> states. Entries are immutable once appended and leave only
/// through the length cap or an offset wipe.
#[derive(Debug, Clone, Default)]
pub struct RegionHistory {
    nodes: BTreeMap<String, VecDeque<Node>>,
    connections: BTreeMap<String, VecDeque<Connection>>,
}

#[derive(Debug, Default)]
pub struct TrafficStore {
    traffic: TrafficSnapshot,
    regions: BTreeMap<String, RegionHistory>,
    last_updated_server_time: u64,
    last_updated_client_time: u64,
    offset_ms: u64,
}

impl TrafficStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&mut self, envelope: &ActionEnvelope) -> StoreEvents {
        let mut events = StoreEvents::default();
        match &envelope.action {
            Action::UpdateTraffic { snapshot } => {
                if self.update_traffic(snapshot.clone()) {
                    events.traffic_changed = true;
                }
            }
            Action::UpdateTrafficOffset { offset_ms } => {
                self.offset_ms = *offset_ms;
                self.regions.clear();
                events.offset_changed = true;
            }
            Action::ClearTraffic => {
                self.traffic = TrafficSnapshot::default();
                events.traffic_changed = true;
            }
            _ => {}
        }
        events
    }

    /// Adopt a snapshot. Returns false for a duplicate (same backend
    /// stamp as the previous update): the snapshot still becomes
    /// "latest" but no history is appended and no change is reported.
    fn update_traffic(&mut self, snapshot: TrafficSnapshot) -> bool {
        self.last_updated_client_time = unix_now_ms();
        // A zero server time counts as unset.
        let stamp = match snapshot.server_update_time.filter(|seconds| *seconds > 0) {
            Some(seconds) => {
                let server_ms = seconds.saturating_mul(1000);
                if server_ms == self.last_updated_server_time {
                    self.traffic = snapshot;
                    return false;
                }
                self.last_updated_server_time = server_ms;
                server_ms
            }
            None => self.last_updated_client_time,
        };
        self.record_history(&snapshot, stamp);
        self.traffic = snapshot;
        true
    }

    fn record_history(&mut self, snapshot: &TrafficSnapshot, stamp: u64) {
        for region in collect_region_nodes(snapshot) {
            let history = self.regions.entry(region.name.clone()).or_default();
            for node in &region.nodes {
                let mut entry = node.clone();
                entry.updated = stamp;
                push_bounded(history.nodes.entry(node.name.clone()).or_default(), entry);
            }
            for connection in &region.connections {
                let mut entry = connection.clone();
                entry.updated = stamp;
                push_bounded(
                    history.connections.entry(connection.name()).or_default(),
                    entry,
                );
            }
        }
    }

    // ------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------

    pub fn traffic(&self) -> &TrafficSnapshot {
        &self.traffic
    }

    pub fn traffic_offset(&self) -> u64 {
        self.offset_ms
    }

    pub fn last_updated_server_time(&self) -> u64 {
        self.last_updated_server_time
    }

    pub fn last_updated_client_time(&self) -> u64 {
        self.last_updated_client_time
    }

    pub fn max_history_length(&self) -> usize {
        MAX_HISTORY_LENGTH
    }

    pub fn region_names(&self) -> Vec<&str> {
        self.regions.keys().map(String::as_str).collect()
    }

    /// Every node state recorded for `region`/`name`, oldest first.
    /// Unknown regions and names yield an empty history.
    pub fn node_history(&self, region: &str, name: &str) -> Vec<&Node> {
        self.node_history_range(region, name, 0, u64::MAX)
    }

    /// Every connection state recorded for `region`/`source-target`,
    /// oldest first.
    pub fn connection_history(&self, region: &str, source: &str, target: &str) -> Vec<&Connection> {
        self.connection_history_range(region, source, target, 0, u64::MAX)
    }

    /// Node states recorded for `region`/`name` with
    /// `since_ms <= updated <= until_ms`, oldest first.
    pub fn node_history_range(
        &self,
        region: &str,
        name: &str,
        since_ms: u64,
        until_ms: u64,
    ) -> Vec<&Node> {
        self.regions
            .get(region)
            .and_then(|history| history.nodes.get(name))
            .map(|entries| {
                entries
                    .iter()
                    .filter(|entry| entry.updated >= since_ms && entry.updated <= until_ms)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Connection states recorded for `region`/`source-target` with
    /// `since_ms <= updated <= until_ms`, oldest first.
    pub fn connection_history_range(
        &self,
        region: &str,
        source: &str,
        target: &str,
        since_ms: u64,
        until_ms: u64,
    ) -> Vec<&Connection> {
        let key = connection_name(source, target);
        self.regions
            .get(region)
            .and_then(|history| history.connections.get(&key))
            .map(|entries| {
                entries
                    .iter()
                    .filter(|entry| entry.updated >= since_ms && entry.updated <= until_ms)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn node_series(
        &self,
        region: &str,
        name: &str,
        since_ms: u64,
        until_ms: u64,
    ) -> NodeSeries {
        NodeSeries::from_history(
            self.node_history_range(region, name, since_ms, until_ms)
                .into_iter(),
        )
    }

    pub fn connection_series(
        &self,
        region: &str,
        source: &str,
        target: &str,
        since_ms: u64,
        until_ms: u64,
    ) -> ConnectionSeries {
        ConnectionSeries::from_history(
            self.connection_history_range(region, source, target, since_ms, until_ms)
                .into_iter(),
        )
    }
}

fn push_bounded<T>(entries: &mut VecDeque<T>, entry: T) {
    entries.push_back(entry);
    while entries.len() > MAX_HISTORY_LENGTH {
        entries.pop_front();
    }
}
