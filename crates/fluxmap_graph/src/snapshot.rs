//! Traffic snapshot types, mirroring the backend's JSON payload.

use serde::{Deserialize, Serialize};

use crate::walk::connection_name;

/// Renderer tag that marks a node as a region (history-bucket key).
pub const REGION_RENDERER: &str = "region";

pub const NOTICE_SEVERITY_INFO: i64 = 0;
pub const NOTICE_SEVERITY_WARNING: i64 = 1;
pub const NOTICE_SEVERITY_DANGER: i64 = 2;

/// Per-severity volume counts for a node or connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    #[serde(default)]
    pub normal: f64,
    #[serde(default)]
    pub warning: f64,
    #[serde(default)]
    pub danger: f64,
}

impl Metrics {
    pub fn volume_total(&self) -> f64 {
        self.normal + self.warning + self.danger
    }

    /// Fraction of total volume in the danger bucket; 0 when there is no
    /// traffic at all.
    pub fn danger_fraction(&self) -> f64 {
        let total = self.volume_total();
        if total <= 0.0 {
            return 0.0;
        }
        self.danger / total
    }
}

/// Annotation attached to a node or connection, surfaced in detail panels.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub severity: i64,
}

/// Style class advertised by the backend, consumed by the renderer as a
/// name -> color mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeClass {
    pub name: String,
    #[serde(default)]
    pub color: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub name: String,
    #[serde(default)]
    pub renderer: String,
    #[serde(default)]
    pub display_name: String,
    /// Style category; empty for classless nodes.
    #[serde(default)]
    pub class: String,
    /// Millisecond timestamp of the snapshot this state belongs to.
    #[serde(default)]
    pub updated: u64,
    #[serde(default)]
    pub max_volume: f64,
    #[serde(default)]
    pub metrics: Metrics,
    #[serde(default)]
    pub metadata: serde_json::Value,
    /// Child nodes; exclusively owned, so the structure is a tree.
    #[serde(default)]
    pub nodes: Vec<Node>,
    /// Connections between this node's children.
    #[serde(default)]
    pub connections: Vec<Connection>,
    #[serde(default)]
    pub notices: Vec<Notice>,
}

impl Node {
    pub fn is_region(&self) -> bool {
        self.renderer == REGION_RENDERER
    }

    /// Connections among this node's children that originate at `name`.
    pub fn outgoing_connections(&self, name: &str) -> Vec<&Connection> {
        self.connections
            .iter()
            .filter(|connection| connection.source == name)
            .collect()
    }

    /// Connections among this node's children that terminate at `name`.
    pub fn incoming_connections(&self, name: &str) -> Vec<&Connection> {
        self.connections
            .iter()
            .filter(|connection| connection.target == name)
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub class: String,
    /// Millisecond timestamp of the snapshot this state belongs to.
    #[serde(default)]
    pub updated: u64,
    #[serde(default)]
    pub metrics: Metrics,
    #[serde(default)]
    pub metadata: serde_json::Value,
    #[serde(default)]
    pub notices: Vec<Notice>,
}

impl Connection {
    /// Identity of the connection: `"source-target"`.
    pub fn name(&self) -> String {
        connection_name(&self.source, &self.target)
    }

    pub fn volume_total(&self) -> f64 {
        self.metrics.volume_total()
    }

    pub fn danger_fraction(&self) -> f64 {
        self.metrics.danger_fraction()
    }
}

/// One full traffic graph payload from one poll. Replaces the previous
/// snapshot wholesale; only the engine's history buffers accumulate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficSnapshot {
    #[serde(default)]
    pub renderer: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub max_volume: f64,
    /// Backend-side update time in whole seconds; absent (or zero) when
    /// the backend does not stamp its payloads.
    #[serde(default)]
    pub server_update_time: Option<u64>,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub connections: Vec<Connection>,
    #[serde(default)]
    pub classes: Vec<NodeClass>,
}

impl TrafficSnapshot {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.connections.is_empty()
    }

    /// Top-level connections that originate at `name`.
    pub fn outgoing_connections(&self, name: &str) -> Vec<&Connection> {
        self.connections
            .iter()
            .filter(|connection| connection.source == name)
            .collect()
    }

    /// Top-level connections that terminate at `name`.
    pub fn incoming_connections(&self, name: &str) -> Vec<&Connection> {
        self.connections
            .iter()
            .filter(|connection| connection.target == name)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_parses_backend_payload() {
        let payload = r##"{
            "renderer": "global",
            "name": "edge",
            "serverUpdateTime": 1503000000,
            "maxVolume": 50000,
            "nodes": [
                {
                    "renderer": "region",
                    "name": "us-east-1",
                    "displayName": "US East",
                    "updated": 1503000000000,
                    "maxVolume": 20000,
                    "nodes": [
                        { "name": "api", "class": "normal" },
                        { "name": "proxy" }
                    ],
                    "connections": [
                        {
                            "source": "api",
                            "target": "proxy",
                            "metrics": { "normal": 100.5, "warning": 0, "danger": 2.5 },
                            "notices": [
                                { "title": "elevated errors", "severity": 1 }
                            ]
                        }
                    ]
                }
            ],
            "connections": [],
            "classes": [
                { "name": "normal", "color": "#2077b4" }
            ]
        }"##;

        let snapshot: TrafficSnapshot = serde_json::from_str(payload).expect("parse payload");
        assert_eq!(snapshot.renderer, "global");
        assert_eq!(snapshot.server_update_time, Some(1503000000));
        assert_eq!(snapshot.nodes.len(), 1);

        let region = &snapshot.nodes[0];
        assert!(region.is_region());
        assert_eq!(region.display_name, "US East");
        assert_eq!(region.nodes[0].class, "normal");
        assert_eq!(region.nodes[1].class, "");

        let connection = &region.connections[0];
        assert_eq!(connection.name(), "api-proxy");
        assert_eq!(connection.volume_total(), 103.0);
        assert_eq!(connection.notices[0].severity, NOTICE_SEVERITY_WARNING);

        assert_eq!(snapshot.classes[0].color, "#2077b4");
    }

    #[test]
    fn snapshot_tolerates_minimal_payload() {
        let snapshot: TrafficSnapshot = serde_json::from_str(r#"{ "name": "edge" }"#).expect("parse");
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.server_update_time, None);
        assert_eq!(snapshot.renderer, "");
    }

    #[test]
    fn danger_fraction_handles_zero_volume() {
        let empty = Metrics::default();
        assert_eq!(empty.danger_fraction(), 0.0);

        let metrics = Metrics {
            normal: 40.0,
            warning: 0.0,
            danger: 10.0,
        };
        assert_eq!(metrics.volume_total(), 50.0);
        assert_eq!(metrics.danger_fraction(), 0.2);
    }

    #[test]
    fn connection_lookup_by_direction() {
        let region = Node {
            name: "us-east-1".to_string(),
            renderer: REGION_RENDERER.to_string(),
            connections: vec![
                Connection {
                    source: "api".to_string(),
                    target: "db".to_string(),
                    ..Connection::default()
                },
                Connection {
                    source: "proxy".to_string(),
                    target: "api".to_string(),
                    ..Connection::default()
                },
            ],
            ..Node::default()
        };

        let outgoing = region.outgoing_connections("api");
        assert_eq!(outgoing.len(), 1);
        assert_eq!(outgoing[0].target, "db");

        let incoming = region.incoming_connections("api");
        assert_eq!(incoming.len(), 1);
        assert_eq!(incoming[0].source, "proxy");
    }

    #[test]
    fn snapshot_round_trips_through_json() {
        let snapshot = TrafficSnapshot {
            renderer: "global".to_string(),
            name: "edge".to_string(),
            server_update_time: Some(42),
            nodes: vec![Node {
                name: "eu-west-1".to_string(),
                renderer: REGION_RENDERER.to_string(),
                ..Node::default()
            }],
            ..TrafficSnapshot::default()
        };
        let json = serde_json::to_string(&snapshot).expect("serialize");
        let parsed: TrafficSnapshot = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, snapshot);
    }
}
