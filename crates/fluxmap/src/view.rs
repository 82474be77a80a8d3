//! View-state coordination: navigation stack, highlight, search,
//! styles, option pass-through, and browser-history reconciliation.
//!
//! The coordinator never talks to a store directly. User interactions
//! mutate its own state and, where a store must change, it hands the
//! caller actions to dispatch (or to defer until the next tick).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use fluxmap_graph::NodeClass;

use crate::action::Action;
use crate::feed::ServerStatus;
use crate::filter::{FilterPatch, FilterStore};

pub const APP_TITLE: &str = "Fluxmap";
/// Label of the root breadcrumb.
pub const ROOT_CRUMB: &str = "global";

// ============================================================
// State fragments
// ============================================================

/// Currently selected object; a node and a connection are never
/// highlighted at the same time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HighlightedObject {
    Node { name: String },
    Connection { name: String },
}

impl HighlightedObject {
    pub fn name(&self) -> &str {
        match self {
            HighlightedObject::Node { name } => name,
            HighlightedObject::Connection { name } => name,
        }
    }
}

/// Search hit counts reported by the render collaborator; `-1` means
/// "no search active".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Matches {
    pub total: i64,
    pub visible: i64,
}

impl Matches {
    pub const NONE: Matches = Matches {
        total: -1,
        visible: -1,
    };
}

impl Default for Matches {
    fn default() -> Self {
        Matches::NONE
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchState {
    pub term: String,
    #[serde(default)]
    pub matches: Matches,
}

/// Label box reported by the renderer, kept for panel placement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LabelDimensions {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayOptions {
    pub allow_dragging_of_nodes: bool,
    pub show_labels: bool,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            allow_dragging_of_nodes: false,
            show_labels: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpringOptions {
    pub rest_length: f64,
    pub spring_constant: f64,
    pub damping_constant: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticleOptions {
    pub mass: f64,
}

/// Opaque pass-through configuration for the layout engine; the
/// coordinator stores and forwards it without interpreting anything.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhysicsOptions {
    pub is_enabled: bool,
    pub viscous_drag_coefficient: f64,
    pub hooks_springs: SpringOptions,
    pub particles: ParticleOptions,
}

impl Default for PhysicsOptions {
    fn default() -> Self {
        Self {
            is_enabled: false,
            viscous_drag_coefficient: 0.2,
            hooks_springs: SpringOptions {
                rest_length: 50.0,
                spring_constant: 0.2,
                damping_constant: 0.1,
            },
            particles: ParticleOptions { mass: 1.0 },
        }
    }
}

/// Notification from the layout collaborator that it moved to a new
/// view (possibly after redirecting an unknown route).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewChange {
    pub view: Vec<String>,
    #[serde(default)]
    pub graph: Option<String>,
    #[serde(default)]
    pub redirected_from: Option<Vec<String>>,
    /// Layout preset of the graph now on screen; adopted only when the
    /// active graph actually changed.
    #[serde(default)]
    pub physics: Option<PhysicsOptions>,
}

// ============================================================
// Browser history
// ============================================================

/// Entry pushed into the embedder's history when navigation changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub title: String,
    pub url: String,
    pub selected: Vec<String>,
    pub highlighted: Option<String>,
}

/// State carried by a history entry, handed back on pop.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryState {
    #[serde(default)]
    pub selected: Vec<String>,
    #[serde(default)]
    pub highlighted: Option<String>,
}

/// Where history pushes go. The embedder owns the real browser (or
/// whatever stands in for it); the engine only decides when to push.
pub trait HistoryPort {
    fn push(&mut self, entry: HistoryEntry);
}

/// Discards every push; the default for embedders without a history.
#[derive(Debug, Default)]
pub struct NullHistory;

impl HistoryPort for NullHistory {
    fn push(&mut self, _entry: HistoryEntry) {}
}

// ============================================================
// Coordinator
// ============================================================

#[derive(Debug)]
pub struct ViewCoordinator {
    current_view: Option<Vec<String>>,
    highlighted: Option<HighlightedObject>,
    object_to_highlight: Option<String>,
    focused_node: Option<String>,
    search: SearchState,
    redirected_from: Option<Vec<String>>,
    styles: BTreeMap<String, String>,
    display: DisplayOptions,
    physics: PhysicsOptions,
    label_dimensions: LabelDimensions,
    current_graph: Option<String>,
    graph_ready: bool,
    server_status: ServerStatus,
    client_updated_time: u64,
    class_seeded: bool,
    popped: bool,
    last_synced: Option<(Vec<String>, Option<String>)>,
    pending_history: Vec<HistoryEntry>,
}

impl Default for ViewCoordinator {
    fn default() -> Self {
        Self {
            current_view: None,
            highlighted: None,
            object_to_highlight: None,
            focused_node: None,
            search: SearchState::default(),
            redirected_from: None,
            styles: BTreeMap::new(),
            display: DisplayOptions::default(),
            physics: PhysicsOptions::default(),
            label_dimensions: LabelDimensions::default(),
            current_graph: None,
            graph_ready: false,
            server_status: ServerStatus::Disconnected,
            client_updated_time: 0,
            class_seeded: false,
            popped: false,
            last_synced: None,
            pending_history: Vec::new(),
        }
    }
}

impl ViewCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------
    // Routing
    // ------------------------------------------------------------

    /// Adopt the view encoded in the initial URL: up to two path
    /// segments plus an optional `highlighted` query parameter. The
    /// resulting state is the history baseline, so no push fires.
    pub fn initial_route(&mut self, path: &str, query: &str) {
        let view: Vec<String> = path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .take(2)
            .map(str::to_string)
            .collect();
        self.object_to_highlight = query_param(query, "highlighted");
        self.current_view = Some(view.clone());
        self.last_synced = Some((view, None));
        self.popped = false;
    }

    /// Restore state handed back by a popped history entry. The next
    /// navigation change is the restore itself, so exactly one history
    /// push is suppressed.
    pub fn handle_pop(&mut self, state: HistoryState) {
        self.popped = true;
        self.current_view = Some(state.selected);
        self.highlighted = None;
        self.object_to_highlight = state.highlighted;
        self.sync_history();
    }

    /// History entries produced since the last drain, oldest first.
    pub fn take_history_entries(&mut self) -> Vec<HistoryEntry> {
        std::mem::take(&mut self.pending_history)
    }

    pub fn page_title(&self) -> String {
        let view = self.view_slice();
        let mut parts = Vec::with_capacity(view.len() + 1);
        parts.push(APP_TITLE.to_string());
        parts.extend(view.iter().cloned());
        parts.join(" / ")
    }

    // ------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------

    /// Region view: request a highlight. Node-detail view: retarget the
    /// second segment to the clicked node.
    pub fn node_clicked(&mut self, name: &str) {
        let Some(view) = self.current_view.clone() else {
            return;
        };
        match view.len() {
            1 => self.object_to_highlight = Some(name.to_string()),
            2 => self.current_view = Some(vec![view[0].clone(), name.to_string()]),
            _ => {}
        }
        self.sync_history();
    }

    /// In a region view with a focused node, zoom into its detail view;
    /// in a detail view, zoom back out. No-op elsewhere.
    pub fn zoom_toggle(&mut self) {
        let Some(mut view) = self.current_view.clone() else {
            return;
        };
        if view.len() == 1 {
            if let Some(focused) = self.focused_node.clone() {
                view.push(focused);
                self.current_view = Some(view);
            }
        } else if view.len() == 2 {
            view.pop();
            self.current_view = Some(view);
        }
        self.sync_history();
    }

    pub fn escape_pressed(&mut self) {
        if self.focused_node.is_some() {
            self.focused_node = None;
        } else if let Some(view) = &mut self.current_view {
            view.pop();
        }
        self.sync_history();
    }

    /// A node-detail panel was dismissed.
    pub fn details_closed(&mut self) {
        let view = self.view_slice().to_vec();
        if view.len() == 2 {
            self.current_view = Some(vec![view[0].clone()]);
        } else {
            self.focused_node = None;
            self.highlighted = None;
        }
        self.sync_history();
    }

    /// Crumb list including the root: `["global", region, node]`.
    pub fn breadcrumbs(&self) -> Vec<String> {
        let mut crumbs = vec![ROOT_CRUMB.to_string()];
        crumbs.extend(self.view_slice().iter().cloned());
        crumbs
    }

    /// Truncate navigation to the clicked crumb; index 0 is the root.
    pub fn breadcrumb_clicked(&mut self, index: usize) {
        let Some(view) = self.current_view.clone() else {
            return;
        };
        let keep = index.min(view.len());
        self.current_view = Some(view[..keep].to_vec());
        self.sync_history();
    }

    // ------------------------------------------------------------
    // Renderer callbacks
    // ------------------------------------------------------------

    pub fn view_changed(&mut self, change: ViewChange) {
        self.current_view = Some(change.view);
        self.redirected_from = change.redirected_from;
        self.search = SearchState::default();
        if self.current_graph != change.graph {
            self.current_graph = change.graph;
            if let Some(physics) = change.physics {
                self.physics = physics;
            }
        }
        self.graph_ready = true;
        self.sync_history();
    }

    pub fn object_highlighted(&mut self, object: Option<HighlightedObject>) {
        self.highlighted = object;
        self.object_to_highlight = None;
        self.search = SearchState::default();
        self.redirected_from = None;
        self.sync_history();
    }

    pub fn matches_found(&mut self, matches: Matches) {
        self.search.matches = matches;
        self.sync_history();
    }

    pub fn search_changed(&mut self, term: &str) {
        self.search.term = term.to_string();
        if term.is_empty() {
            self.search.matches = Matches::NONE;
        }
        self.sync_history();
    }

    pub fn set_focused_node(&mut self, name: Option<String>) {
        self.focused_node = name;
        self.sync_history();
    }

    pub fn label_dimensions_changed(&mut self, dimensions: LabelDimensions) {
        self.label_dimensions = dimensions;
        self.sync_history();
    }

    pub fn display_options_changed(&mut self, options: DisplayOptions) {
        self.display = options;
        self.sync_history();
    }

    pub fn physics_options_changed(&mut self, options: PhysicsOptions) {
        self.physics = options;
        self.sync_history();
    }

    pub fn dismiss_redirect(&mut self) {
        self.redirected_from = None;
        self.sync_history();
    }

    // ------------------------------------------------------------
    // Store interplay
    // ------------------------------------------------------------

    /// Seed the class filter universe the first time live data reveals
    /// a non-empty class set. Returns the actions to run on the *next*
    /// tick, never synchronously; re-arms only on construction.
    pub fn maybe_seed_classes(&mut self, classes: &[String]) -> Option<Vec<Action>> {
        if self.class_seeded || classes.is_empty() {
            return None;
        }
        self.class_seeded = true;
        Some(vec![
            Action::UpdateDefaultFilters {
                patch: FilterPatch::with_classes(classes.to_vec()),
            },
            Action::ResetFilters,
        ])
    }

    /// Two-stage clearing: a non-default state resets to defaults
    /// first; a default state clears outright; a clear state needs
    /// nothing.
    pub fn clear_filters_requested(&self, filters: &FilterStore) -> Option<Action> {
        if filters.is_clear() {
            None
        } else if !filters.is_default() {
            Some(Action::ResetFilters)
        } else {
            Some(Action::ClearFilters)
        }
    }

    /// Rebuild the class -> color map; reports whether anything
    /// actually changed so redundant renders can be skipped.
    pub fn apply_styles(&mut self, classes: &[NodeClass]) -> bool {
        let mut next = BTreeMap::new();
        for class in classes {
            next.insert(class.name.clone(), class.color.clone());
        }
        if next == self.styles {
            return false;
        }
        self.styles = next;
        true
    }

    /// Returns true on a transition.
    pub fn set_server_status(&mut self, status: ServerStatus) -> bool {
        if self.server_status == status {
            return false;
        }
        self.server_status = status;
        true
    }

    pub fn set_client_updated_time(&mut self, unix_ms: u64) {
        self.client_updated_time = unix_ms;
    }

    // ------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------

    pub fn current_view(&self) -> Option<&[String]> {
        self.current_view.as_deref()
    }

    pub fn highlighted(&self) -> Option<&HighlightedObject> {
        self.highlighted.as_ref()
    }

    pub fn object_to_highlight(&self) -> Option<&str> {
        self.object_to_highlight.as_deref()
    }

    pub fn focused_node(&self) -> Option<&str> {
        self.focused_node.as_deref()
    }

    pub fn search(&self) -> &SearchState {
        &self.search
    }

    pub fn redirected_from(&self) -> Option<&[String]> {
        self.redirected_from.as_deref()
    }

    pub fn styles(&self) -> &BTreeMap<String, String> {
        &self.styles
    }

    pub fn display_options(&self) -> DisplayOptions {
        self.display
    }

    pub fn physics_options(&self) -> PhysicsOptions {
        self.physics
    }

    pub fn label_dimensions(&self) -> LabelDimensions {
        self.label_dimensions
    }

    pub fn current_graph(&self) -> Option<&str> {
        self.current_graph.as_deref()
    }

    pub fn graph_ready(&self) -> bool {
        self.graph_ready
    }

    pub fn server_status(&self) -> ServerStatus {
        self.server_status
    }

    pub fn client_updated_time(&self) -> u64 {
        self.client_updated_time
    }

    // ------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------

    fn view_slice(&self) -> &[String] {
        self.current_view.as_deref().unwrap_or(&[])
    }

    /// Compare navigation-relevant state against the last synchronized
    /// state and queue a history push when it moved. A move caused by a
    /// pop is not pushed; the pop consumes the suppression flag either
    /// way.
    fn sync_history(&mut self) {
        let view = self.view_slice().to_vec();
        let highlighted = self
            .highlighted
            .as_ref()
            .map(|object| object.name().to_string());
        let changed = match &self.last_synced {
            Some((last_view, last_highlighted)) => {
                last_view.first() != view.first()
                    || last_view.get(1) != view.get(1)
                    || last_highlighted != &highlighted
            }
            None => !view.is_empty() || highlighted.is_some(),
        };
        if changed && !self.popped {
            self.pending_history.push(HistoryEntry {
                title: self.page_title(),
                url: view_url(&view, highlighted.as_deref()),
                selected: view.clone(),
                highlighted: highlighted.clone(),
            });
        }
        self.last_synced = Some((view, highlighted));
        self.popped = false;
    }
}

fn view_url(view: &[String], highlighted: Option<&str>) -> String {
    let mut url = view.join("/");
    if let Some(name) = highlighted {
        url.push_str("?highlighted=");
        url.push_str(name);
    }
    url
}

fn query_param(query: &str, key: &str) -> Option<String> {
    query
        .trim_start_matches('?')
        .split('&')
        .find_map(|pair| {
            let (candidate, value) = pair.split_once('=')?;
            (candidate == key && !value.is_empty()).then(|| value.to_string())
        })
}
