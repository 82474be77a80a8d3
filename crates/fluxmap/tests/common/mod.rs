use fluxmap::{Connection, Metrics, Node, NodeClass, TrafficSnapshot, REGION_RENDERER};

pub fn service(name: &str, class: &str, normal: f64, danger: f64) -> Node {
    Node {
        name: name.to_string(),
        class: class.to_string(),
        metrics: Metrics {
            normal,
            danger,
            ..Metrics::default()
        },
        ..Node::default()
    }
}

pub fn connection(source: &str, target: &str, normal: f64, danger: f64) -> Connection {
    Connection {
        source: source.to_string(),
        target: target.to_string(),
        metrics: Metrics {
            normal,
            danger,
            ..Metrics::default()
        },
        ..Connection::default()
    }
}

pub fn region(name: &str, nodes: Vec<Node>, connections: Vec<Connection>) -> Node {
    Node {
        name: name.to_string(),
        renderer: REGION_RENDERER.to_string(),
        nodes,
        connections,
        ..Node::default()
    }
}

pub fn snapshot(server_secs: u64, regions: Vec<Node>) -> TrafficSnapshot {
    TrafficSnapshot {
        renderer: "global".to_string(),
        name: "edge".to_string(),
        server_update_time: Some(server_secs),
        nodes: regions,
        classes: vec![
            NodeClass {
                name: "normal".to_string(),
                color: "rgb(186, 213, 237)".to_string(),
            },
            NodeClass {
                name: "danger".to_string(),
                color: "rgb(184, 36, 36)".to_string(),
            },
        ],
        ..TrafficSnapshot::default()
    }
}
