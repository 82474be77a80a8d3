//! Wire-format data model for the fluxmap traffic dashboard.
//!
//! A traffic snapshot is one full topology payload from one poll of the
//! backend: a tree of nodes (regions at the top, services below), the
//! connections between them, and the style classes the renderer needs.
//! This crate owns the serde types plus the traversal and time-series
//! helpers the engine builds on; it knows nothing about polling, stores,
//! or view state.

pub mod series;
pub mod snapshot;
pub mod walk;

pub use series::{ConnectionSeries, NodeSeries, SeriesPoint};
pub use snapshot::{
    Connection, Metrics, Node, NodeClass, Notice, TrafficSnapshot, NOTICE_SEVERITY_DANGER,
    NOTICE_SEVERITY_INFO, NOTICE_SEVERITY_WARNING, REGION_RENDERER,
};
pub use walk::{collect_node_classes, collect_region_nodes, connection_name};
