//! Filter store: named predicates over the live graph with
//! current/default/clear value triples.
//!
//! Thresholds use `-1` as the "all" sentinel; every volume and fraction
//! is non-negative, so a plain `>=` comparison passes everything at the
//! sentinel without a special case.

use serde::{Deserialize, Serialize};

use fluxmap_graph::{Connection, Node};

use crate::action::{Action, ActionEnvelope};
use crate::dispatch::StoreEvents;

/// Threshold sentinel meaning "show everything".
pub const FILTER_ALL: f64 = -1.0;
/// Severity sentinel meaning "show everything".
pub const NOTICE_FILTER_ALL: i64 = -1;

// ============================================================
// Values and patches
// ============================================================

/// One complete assignment of all filter values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterValues {
    /// Minimum total volume a connection must carry.
    pub rps: f64,
    /// Minimum danger fraction a connection must carry.
    pub error: f64,
    /// Allowed node classes; empty means every class passes.
    pub classes: Vec<String>,
    /// Minimum notice severity a connection must carry.
    pub notice: i64,
}

impl FilterValues {
    /// The "show everything" assignment, also the construction default
    /// until live data seeds the class universe.
    pub fn clear() -> Self {
        Self {
            rps: FILTER_ALL,
            error: FILTER_ALL,
            classes: Vec::new(),
            notice: NOTICE_FILTER_ALL,
        }
    }
}

impl Default for FilterValues {
    fn default() -> Self {
        Self::clear()
    }
}

/// Partial assignment merged into a value set; `None` fields are left
/// untouched, list values replace wholesale rather than accumulating.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterPatch {
    pub rps: Option<f64>,
    pub error: Option<f64>,
    pub classes: Option<Vec<String>>,
    pub notice: Option<i64>,
}

impl FilterPatch {
    pub fn with_classes(classes: Vec<String>) -> Self {
        Self {
            classes: Some(classes),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rps.is_none() && self.error.is_none() && self.classes.is_none() && self.notice.is_none()
    }
}

fn apply_patch(values: &mut FilterValues, patch: &FilterPatch) {
    if let Some(rps) = patch.rps {
        values.rps = rps;
    }
    if let Some(error) = patch.error {
        values.error = error;
    }
    if let Some(classes) = &patch.classes {
        values.classes = classes.clone();
    }
    if let Some(notice) = patch.notice {
        values.notice = notice;
    }
}

// ============================================================
// Names, targets, steps
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterName {
    Rps,
    Error,
    Class,
    Notice,
}

impl FilterName {
    pub const ALL: [FilterName; 4] = [
        FilterName::Rps,
        FilterName::Error,
        FilterName::Class,
        FilterName::Notice,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterName::Rps => "rps",
            FilterName::Error => "error",
            FilterName::Class => "class",
            FilterName::Notice => "notice",
        }
    }

    /// Which object kind the predicate applies to.
    pub fn target(&self) -> FilterTarget {
        match self {
            FilterName::Class => FilterTarget::Node,
            _ => FilterTarget::Connection,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterTarget {
    Node,
    Connection,
}

/// One detent of a stepped filter control.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterStep {
    pub label: &'static str,
    pub value: f64,
}

pub const RPS_STEPS: [FilterStep; 4] = [
    FilterStep { label: ">1000", value: 1000.0 },
    FilterStep { label: ">300", value: 300.0 },
    FilterStep { label: ">5", value: 5.0 },
    FilterStep { label: "all", value: -1.0 },
];

pub const ERROR_STEPS: [FilterStep; 4] = [
    FilterStep { label: ">10%", value: 0.10 },
    FilterStep { label: ">5%", value: 0.05 },
    FilterStep { label: ">1%", value: 0.01 },
    FilterStep { label: "all", value: -1.0 },
];

pub const NOTICE_STEPS: [FilterStep; 4] = [
    FilterStep { label: "danger", value: 2.0 },
    FilterStep { label: "warning", value: 1.0 },
    FilterStep { label: "info", value: 0.0 },
    FilterStep { label: "all", value: -1.0 },
];

/// Active predicate description handed to the render collaborator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterSpec {
    pub name: &'static str,
    pub target: FilterTarget,
    pub value: FilterSettingValue,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FilterSettingValue {
    Threshold(f64),
    Classes(Vec<String>),
    Severity(i64),
}

// ============================================================
// Store
// ============================================================

#[derive(Debug, Default)]
pub struct FilterStore {
    current: FilterValues,
    defaults: FilterValues,
}

impl FilterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&mut self, envelope: &ActionEnvelope) -> StoreEvents {
        let mut events = StoreEvents::default();
        match &envelope.action {
            Action::UpdateFilters { patch } => {
                apply_patch(&mut self.current, patch);
                events.filters_changed = true;
            }
            Action::UpdateDefaultFilters { patch } => {
                apply_patch(&mut self.defaults, patch);
                events.filters_changed = true;
            }
            Action::ResetFilters => {
                self.current = self.defaults.clone();
                events.filters_changed = true;
            }
            Action::ClearFilters => {
                self.current = FilterValues::clear();
                events.filters_changed = true;
            }
            _ => {}
        }
        events
    }

    pub fn current(&self) -> &FilterValues {
        &self.current
    }

    pub fn defaults(&self) -> &FilterValues {
        &self.defaults
    }

    // ------------------------------------------------------------
    // Predicates
    // ------------------------------------------------------------

    /// Logical AND of every node-targeted predicate.
    pub fn passes_node(&self, node: &Node) -> bool {
        self.passes_class(node)
    }

    /// Logical AND of every connection-targeted predicate.
    pub fn passes_connection(&self, connection: &Connection) -> bool {
        self.passes_rps(connection)
            && self.passes_error(connection)
            && self.passes_notice(connection)
    }

    fn passes_class(&self, node: &Node) -> bool {
        self.current.classes.is_empty()
            || self.current.classes.iter().any(|class| class == &node.class)
    }

    fn passes_rps(&self, connection: &Connection) -> bool {
        connection.volume_total() >= self.current.rps
    }

    fn passes_error(&self, connection: &Connection) -> bool {
        connection.danger_fraction() >= self.current.error
    }

    fn passes_notice(&self, connection: &Connection) -> bool {
        if connection.notices.is_empty() {
            return self.current.notice == NOTICE_FILTER_ALL;
        }
        connection
            .notices
            .iter()
            .any(|notice| notice.severity >= self.current.notice)
    }

    // ------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------

    pub fn is_default(&self) -> bool {
        self.current == self.defaults
    }

    pub fn is_clear(&self) -> bool {
        self.current == FilterValues::clear()
    }

    /// True iff the class filter is exactly the single-element set
    /// containing `class`. Deselecting the last visible class is
    /// forbidden on the strength of this check.
    pub fn is_last_class(&self, class: &str) -> bool {
        self.current.classes.len() == 1 && self.current.classes[0] == class
    }

    /// Names whose current value differs from the default value.
    pub fn changed_filters(&self) -> Vec<FilterName> {
        FilterName::ALL
            .into_iter()
            .filter(|name| match name {
                FilterName::Rps => self.current.rps != self.defaults.rps,
                FilterName::Error => self.current.error != self.defaults.error,
                FilterName::Class => self.current.classes != self.defaults.classes,
                FilterName::Notice => self.current.notice != self.defaults.notice,
            })
            .collect()
    }

    /// Active predicate list for the render collaborator.
    pub fn specs(&self) -> Vec<FilterSpec> {
        vec![
            FilterSpec {
                name: FilterName::Rps.as_str(),
                target: FilterTarget::Connection,
                value: FilterSettingValue::Threshold(self.current.rps),
            },
            FilterSpec {
                name: FilterName::Error.as_str(),
                target: FilterTarget::Connection,
                value: FilterSettingValue::Threshold(self.current.error),
            },
            FilterSpec {
                name: FilterName::Class.as_str(),
                target: FilterTarget::Node,
                value: FilterSettingValue::Classes(self.current.classes.clone()),
            },
            FilterSpec {
                name: FilterName::Notice.as_str(),
                target: FilterTarget::Connection,
                value: FilterSettingValue::Severity(self.current.notice),
            },
        ]
    }

    pub fn steps(name: FilterName) -> &'static [FilterStep] {
        match name {
            FilterName::Rps => &RPS_STEPS,
            FilterName::Error => &ERROR_STEPS,
            FilterName::Notice => &NOTICE_STEPS,
            FilterName::Class => &[],
        }
    }

    /// Index of the step matching the current value; falls back to the
    /// step matching the default value when the current value sits off
    /// the table. `None` for unstepped filters.
    pub fn step_index(&self, name: FilterName) -> Option<usize> {
        let steps = Self::steps(name);
        let current = self.numeric_value(&self.current, name)?;
        if let Some(index) = steps.iter().position(|step| step.value == current) {
            return Some(index);
        }
        let fallback = self.numeric_value(&self.defaults, name)?;
        steps.iter().position(|step| step.value == fallback)
    }

    fn numeric_value(&self, values: &FilterValues, name: FilterName) -> Option<f64> {
        match name {
            FilterName::Rps => Some(values.rps),
            FilterName::Error => Some(values.error),
            FilterName::Notice => Some(values.notice as f64),
            FilterName::Class => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ActionEnvelope;
    use fluxmap_graph::{Metrics, Notice};

    fn update(store: &mut FilterStore, action: Action) -> StoreEvents {
        store.handle(&ActionEnvelope::view(action))
    }

    fn connection(normal: f64, warning: f64, danger: f64) -> Connection {
        Connection {
            source: "api".to_string(),
            target: "db".to_string(),
            metrics: Metrics {
                normal,
                warning,
                danger,
            },
            ..Connection::default()
        }
    }

    fn node(class: &str) -> Node {
        Node {
            name: "api".to_string(),
            class: class.to_string(),
            ..Node::default()
        }
    }

    #[test]
    fn default_and_clear_at_construction() {
        let store = FilterStore::new();
        assert!(store.is_default());
        assert!(store.is_clear());
        assert!(store.changed_filters().is_empty());
    }

    #[test]
    fn update_filters_touches_current_only() {
        let mut store = FilterStore::new();
        let events = update(
            &mut store,
            Action::UpdateFilters {
                patch: FilterPatch {
                    rps: Some(300.0),
                    ..FilterPatch::default()
                },
            },
        );
        assert!(events.filters_changed);
        assert_eq!(store.current().rps, 300.0);
        assert_eq!(store.defaults().rps, FILTER_ALL);
        assert!(!store.is_default());
        assert_eq!(store.changed_filters(), vec![FilterName::Rps]);
    }

    #[test]
    fn reset_restores_defaults_and_is_idempotent() {
        let mut store = FilterStore::new();
        update(
            &mut store,
            Action::UpdateDefaultFilters {
                patch: FilterPatch::with_classes(vec!["normal".to_string(), "bold".to_string()]),
            },
        );
        update(
            &mut store,
            Action::UpdateFilters {
                patch: FilterPatch {
                    rps: Some(1000.0),
                    classes: Some(vec!["bold".to_string()]),
                    ..FilterPatch::default()
                },
            },
        );
        assert!(!store.is_default());

        update(&mut store, Action::ResetFilters);
        let after_once = store.current().clone();
        assert!(store.is_default());
        assert_eq!(
            after_once.classes,
            vec!["normal".to_string(), "bold".to_string()]
        );

        update(&mut store, Action::ResetFilters);
        assert_eq!(store.current(), &after_once);
    }

    #[test]
    fn reset_replaces_class_list_instead_of_accumulating() {
        let mut store = FilterStore::new();
        update(
            &mut store,
            Action::UpdateDefaultFilters {
                patch: FilterPatch::with_classes(vec!["a".to_string(), "b".to_string()]),
            },
        );
        update(
            &mut store,
            Action::UpdateFilters {
                patch: FilterPatch::with_classes(vec!["a".to_string()]),
            },
        );
        update(&mut store, Action::ResetFilters);
        assert_eq!(store.current().classes, vec!["a".to_string(), "b".to_string()]);
        update(&mut store, Action::ResetFilters);
        assert_eq!(store.current().classes, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn clear_restores_the_show_everything_state() {
        let mut store = FilterStore::new();
        update(
            &mut store,
            Action::UpdateDefaultFilters {
                patch: FilterPatch::with_classes(vec!["normal".to_string()]),
            },
        );
        update(&mut store, Action::ResetFilters);
        assert!(!store.is_clear());

        update(&mut store, Action::ClearFilters);
        assert!(store.is_clear());
        assert!(!store.is_default());
        assert!(store.passes_node(&node("anything")));
    }

    #[test]
    fn last_class_is_exactly_one_element() {
        let mut store = FilterStore::new();
        assert!(!store.is_last_class("foo"));
        update(
            &mut store,
            Action::UpdateFilters {
                patch: FilterPatch::with_classes(vec!["foo".to_string()]),
            },
        );
        assert!(store.is_last_class("foo"));
        assert!(!store.is_last_class("bar"));

        update(
            &mut store,
            Action::UpdateFilters {
                patch: FilterPatch::with_classes(vec!["foo".to_string(), "bar".to_string()]),
            },
        );
        assert!(!store.is_last_class("foo"));
    }

    #[test]
    fn rps_threshold_prunes_low_volume_connections() {
        let mut store = FilterStore::new();
        assert!(store.passes_connection(&connection(0.0, 0.0, 0.0)));

        update(
            &mut store,
            Action::UpdateFilters {
                patch: FilterPatch {
                    rps: Some(300.0),
                    ..FilterPatch::default()
                },
            },
        );
        assert!(store.passes_connection(&connection(400.0, 0.0, 0.0)));
        assert!(!store.passes_connection(&connection(100.0, 50.0, 10.0)));
    }

    #[test]
    fn error_threshold_compares_danger_fraction() {
        let mut store = FilterStore::new();
        let twenty_percent = connection(40.0, 0.0, 10.0);
        assert_eq!(twenty_percent.danger_fraction(), 0.2);

        update(
            &mut store,
            Action::UpdateFilters {
                patch: FilterPatch {
                    error: Some(0.05),
                    ..FilterPatch::default()
                },
            },
        );
        assert!(store.passes_connection(&twenty_percent));

        update(
            &mut store,
            Action::UpdateFilters {
                patch: FilterPatch {
                    error: Some(0.30),
                    ..FilterPatch::default()
                },
            },
        );
        assert!(!store.passes_connection(&twenty_percent));
    }

    #[test]
    fn error_sentinel_passes_zero_danger_connections() {
        let store = FilterStore::new();
        assert!(store.passes_connection(&connection(100.0, 0.0, 0.0)));
        assert!(store.passes_connection(&connection(0.0, 0.0, 0.0)));
    }

    #[test]
    fn class_filter_matches_allowed_set_and_classless_nodes() {
        let mut store = FilterStore::new();
        update(
            &mut store,
            Action::UpdateFilters {
                patch: FilterPatch::with_classes(vec!["normal".to_string(), "".to_string()]),
            },
        );
        assert!(store.passes_node(&node("normal")));
        assert!(store.passes_node(&node("")));
        assert!(!store.passes_node(&node("storage")));
    }

    #[test]
    fn notice_filter_requires_matching_severity() {
        let mut store = FilterStore::new();
        let mut noticed = connection(10.0, 0.0, 0.0);
        noticed.notices.push(Notice {
            title: "elevated errors".to_string(),
            severity: 1,
            ..Notice::default()
        });
        let quiet = connection(10.0, 0.0, 0.0);

        assert!(store.passes_connection(&noticed));
        assert!(store.passes_connection(&quiet));

        update(
            &mut store,
            Action::UpdateFilters {
                patch: FilterPatch {
                    notice: Some(1),
                    ..FilterPatch::default()
                },
            },
        );
        assert!(store.passes_connection(&noticed));
        assert!(!store.passes_connection(&quiet));

        update(
            &mut store,
            Action::UpdateFilters {
                patch: FilterPatch {
                    notice: Some(2),
                    ..FilterPatch::default()
                },
            },
        );
        assert!(!store.passes_connection(&noticed));
    }

    #[test]
    fn step_index_falls_back_to_the_default_step() {
        let mut store = FilterStore::new();
        assert_eq!(store.step_index(FilterName::Rps), Some(3));

        update(
            &mut store,
            Action::UpdateFilters {
                patch: FilterPatch {
                    rps: Some(300.0),
                    ..FilterPatch::default()
                },
            },
        );
        assert_eq!(store.step_index(FilterName::Rps), Some(1));

        // Off-table value: report the default's step instead.
        update(
            &mut store,
            Action::UpdateFilters {
                patch: FilterPatch {
                    rps: Some(123.0),
                    ..FilterPatch::default()
                },
            },
        );
        assert_eq!(store.step_index(FilterName::Rps), Some(3));
        assert_eq!(store.step_index(FilterName::Class), None);
    }

    #[test]
    fn specs_reflect_current_values() {
        let mut store = FilterStore::new();
        update(
            &mut store,
            Action::UpdateFilters {
                patch: FilterPatch::with_classes(vec!["normal".to_string()]),
            },
        );
        let specs = store.specs();
        assert_eq!(specs.len(), 4);
        assert_eq!(specs[0].name, "rps");
        assert_eq!(specs[2].target, FilterTarget::Node);
        assert_eq!(
            specs[2].value,
            FilterSettingValue::Classes(vec!["normal".to_string()])
        );
    }
}
