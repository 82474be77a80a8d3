//! Time-series projections over history entries for the chart collaborator.

use serde::{Deserialize, Serialize};

use crate::snapshot::{Connection, Node};

/// One chart sample: millisecond timestamp plus a volume value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub time_ms: u64,
    pub value: f64,
}

/// Total and danger volume over a connection's history, one point per
/// retained snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectionSeries {
    pub total: Vec<SeriesPoint>,
    pub errors: Vec<SeriesPoint>,
}

impl ConnectionSeries {
    pub fn from_history<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = &'a Connection>,
    {
        let mut series = ConnectionSeries::default();
        for entry in entries {
            series.total.push(SeriesPoint {
                time_ms: entry.updated,
                value: entry.volume_total(),
            });
            series.errors.push(SeriesPoint {
                time_ms: entry.updated,
                value: entry.metrics.danger,
            });
        }
        series
    }

    pub fn is_empty(&self) -> bool {
        self.total.is_empty()
    }
}

/// Node-side equivalent of [`ConnectionSeries`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeSeries {
    pub total: Vec<SeriesPoint>,
    pub errors: Vec<SeriesPoint>,
}

impl NodeSeries {
    pub fn from_history<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = &'a Node>,
    {
        let mut series = NodeSeries::default();
        for entry in entries {
            series.total.push(SeriesPoint {
                time_ms: entry.updated,
                value: entry.metrics.volume_total(),
            });
            series.errors.push(SeriesPoint {
                time_ms: entry.updated,
                value: entry.metrics.danger,
            });
        }
        series
    }

    pub fn is_empty(&self) -> bool {
        self.total.is_empty()
    }
}
