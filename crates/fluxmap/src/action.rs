//! Dispatched action model: everything that mutates store state flows
//! through one of these, never through direct field writes.

use serde::{Deserialize, Serialize};

use fluxmap_graph::TrafficSnapshot;

use crate::filter::FilterPatch;

/// Where an action originated. Stores do not branch on this; it exists
/// for logging and for embedders that want to audit dispatch traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionSource {
    View,
    Server,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    UpdateTraffic { snapshot: TrafficSnapshot },
    ClearTraffic,
    UpdateTrafficOffset { offset_ms: u64 },
    UpdateFilters { patch: FilterPatch },
    UpdateDefaultFilters { patch: FilterPatch },
    ResetFilters,
    ClearFilters,
}

impl Action {
    /// Stable name matching the serialized `type` tag. Used in log lines
    /// where dumping the whole payload would be noise.
    pub fn kind(&self) -> &'static str {
        match self {
            Action::UpdateTraffic { .. } => "update_traffic",
            Action::ClearTraffic => "clear_traffic",
            Action::UpdateTrafficOffset { .. } => "update_traffic_offset",
            Action::UpdateFilters { .. } => "update_filters",
            Action::UpdateDefaultFilters { .. } => "update_default_filters",
            Action::ResetFilters => "reset_filters",
            Action::ClearFilters => "clear_filters",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionEnvelope {
    pub source: ActionSource,
    pub action: Action,
}

impl ActionEnvelope {
    pub fn view(action: Action) -> Self {
        Self {
            source: ActionSource::View,
            action,
        }
    }

    pub fn server(action: Action) -> Self {
        Self {
            source: ActionSource::Server,
            action,
        }
    }
}
