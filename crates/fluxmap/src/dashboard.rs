//! Top-level dashboard engine.
//!
//! One `Dashboard` owns the dispatcher (and through it both stores),
//! the view coordinator, the history port, and the optional poll loop
//! handle. Everything flows through [`Dashboard::dispatch`]: stores
//! react first, then store-driven view work (class seeding, history
//! pushes) is queued or flushed. Actions produced while reacting run
//! on the next [`Dashboard::tick`], never synchronously.

use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;

use log::{debug, info, warn};

use fluxmap_graph::{collect_node_classes, TrafficSnapshot};

use crate::action::{Action, ActionEnvelope, ActionSource};
use crate::config::DashboardConfig;
use crate::dispatch::{Dispatcher, StoreEvents};
use crate::feed::ServerStatus;
use crate::filter::{FilterSpec, FilterStore};
use crate::poll::{FetchEvent, FetchLoop};
use crate::replay::{format_offset, parse_replay_input, ReplayInputError};
use crate::traffic::{unix_now_ms, TrafficStore};
use crate::view::{
    DisplayOptions, HighlightedObject, HistoryPort, HistoryState, LabelDimensions, Matches,
    NullHistory, PhysicsOptions, ViewChange, ViewCoordinator,
};

pub struct Dashboard {
    config: DashboardConfig,
    dispatcher: Dispatcher,
    view: ViewCoordinator,
    history: Box<dyn HistoryPort>,
    deferred: VecDeque<ActionEnvelope>,
    poll: Option<FetchLoop>,
    last_applied_seq: u64,
}

/// Everything a renderer needs for one frame.
pub struct RenderModel<'a> {
    pub traffic: &'a TrafficSnapshot,
    pub view: &'a [String],
    pub filters: Vec<FilterSpec>,
    pub styles: &'a BTreeMap<String, String>,
    pub display: DisplayOptions,
    pub physics: PhysicsOptions,
}

impl Dashboard {
    pub fn new(config: DashboardConfig) -> Self {
        Self {
            config,
            dispatcher: Dispatcher::new(),
            view: ViewCoordinator::new(),
            history: Box::new(NullHistory),
            deferred: VecDeque::new(),
            poll: None,
            last_applied_seq: 0,
        }
    }

    pub fn with_history(mut self, history: Box<dyn HistoryPort>) -> Self {
        self.history = history;
        self
    }

    /// Hand over a running poll loop. The loop adopts the current
    /// replay offset so an offset chosen before attach still holds.
    pub fn attach_poll(&mut self, poll: FetchLoop) {
        let offset_ms = self.dispatcher.traffic().traffic_offset();
        if offset_ms > 0 {
            poll.set_offset(offset_ms);
        }
        self.poll = Some(poll);
    }

    // ============================================================
    // Action flow
    // ============================================================

    pub fn dispatch(&mut self, source: ActionSource, action: Action) -> StoreEvents {
        self.dispatch_envelope(ActionEnvelope { source, action })
    }

    fn dispatch_envelope(&mut self, envelope: ActionEnvelope) -> StoreEvents {
        let events = self.dispatcher.dispatch(&envelope);
        self.react(&events);
        events
    }

    fn react(&mut self, events: &StoreEvents) {
        if events.traffic_changed {
            let classes = collect_node_classes(self.dispatcher.traffic().traffic());
            if let Some(actions) = self.view.maybe_seed_classes(&classes) {
                debug!("seeding class filters from {} node classes", classes.len());
                for action in actions {
                    self.deferred.push_back(ActionEnvelope::view(action));
                }
            }
        }
        self.flush_history();
    }

    /// Run every action deferred so far. Actions deferred *while*
    /// draining wait for the next call.
    pub fn tick(&mut self) -> StoreEvents {
        let pending: Vec<ActionEnvelope> = self.deferred.drain(..).collect();
        let mut events = StoreEvents::default();
        for envelope in pending {
            events.merge(self.dispatch_envelope(envelope));
        }
        events
    }

    fn flush_history(&mut self) {
        for entry in self.view.take_history_entries() {
            self.history.push(entry);
        }
    }

    // ============================================================
    // Fetch results
    // ============================================================

    /// Apply one poll result. Out-of-order responses and responses
    /// issued for a replay offset the user has since left are dropped.
    pub fn apply_fetch_event(&mut self, event: FetchEvent) -> StoreEvents {
        if event.seq <= self.last_applied_seq {
            warn!(
                "dropping fetch {} arriving after fetch {}",
                event.seq, self.last_applied_seq
            );
            return StoreEvents::default();
        }
        let offset_ms = self.dispatcher.traffic().traffic_offset();
        if event.offset_ms != offset_ms {
            warn!(
                "dropping fetch {} issued for offset {}ms (offset is now {}ms)",
                event.seq, event.offset_ms, offset_ms
            );
            return StoreEvents::default();
        }

        self.last_applied_seq = event.seq;
        self.view.set_client_updated_time(unix_now_ms());
        match event.outcome {
            Ok(snapshot) => {
                if self.view.set_server_status(ServerStatus::Connected) {
                    info!("traffic feed connected");
                }
                if self.view.apply_styles(&snapshot.classes) {
                    debug!("adopted {} class styles", snapshot.classes.len());
                }
                self.dispatch_envelope(ActionEnvelope::server(Action::UpdateTraffic { snapshot }))
            }
            Err(err) => {
                if self.view.set_server_status(ServerStatus::Disconnected) {
                    warn!("traffic feed lost: {err}");
                }
                StoreEvents::default()
            }
        }
    }

    /// Drain whatever the poll loop has queued without blocking.
    pub fn pump_fetch_events(&mut self) -> StoreEvents {
        let mut events = StoreEvents::default();
        loop {
            let event = match &self.poll {
                Some(poll) => poll.try_recv_event(),
                None => None,
            };
            match event {
                Some(event) => events.merge(self.apply_fetch_event(event)),
                None => return events,
            }
        }
    }

    /// One blocking engine turn: wait up to `timeout` for a poll
    /// result, apply it, then run deferred actions.
    pub fn run_once(&mut self, timeout: Duration) -> StoreEvents {
        let event = match &self.poll {
            Some(poll) => poll.recv_event_timeout(timeout),
            None => None,
        };
        let mut events = match event {
            Some(event) => self.apply_fetch_event(event),
            None => StoreEvents::default(),
        };
        events.merge(self.tick());
        events
    }

    pub fn request_refetch(&self) {
        if let Some(poll) = &self.poll {
            poll.fetch_now();
        }
    }

    // ============================================================
    // Replay
    // ============================================================

    /// Parse a wall-clock replay target and rewind to it.
    pub fn enter_replay_offset(&mut self, input: &str) -> Result<u64, ReplayInputError> {
        let offset_ms = parse_replay_input(input, unix_now_ms(), self.config.max_replay_offset_ms())?;
        self.change_offset(offset_ms);
        Ok(offset_ms)
    }

    pub fn clear_replay_offset(&mut self) -> StoreEvents {
        self.change_offset(0)
    }

    pub fn change_offset(&mut self, offset_ms: u64) -> StoreEvents {
        info!("traffic offset set to {}", format_offset(offset_ms));
        let events =
            self.dispatch_envelope(ActionEnvelope::view(Action::UpdateTrafficOffset { offset_ms }));
        if let Some(poll) = &self.poll {
            poll.set_offset(offset_ms);
        }
        events
    }

    // ============================================================
    // View events
    // ============================================================

    pub fn initial_route(&mut self, path: &str, query: &str) {
        self.view.initial_route(path, query);
        self.flush_history();
    }

    pub fn handle_pop(&mut self, state: HistoryState) {
        self.view.handle_pop(state);
        self.flush_history();
    }

    pub fn node_clicked(&mut self, name: &str) {
        self.view.node_clicked(name);
        self.flush_history();
    }

    pub fn zoom_toggle(&mut self) {
        self.view.zoom_toggle();
        self.flush_history();
    }

    pub fn escape_pressed(&mut self) {
        self.view.escape_pressed();
        self.flush_history();
    }

    pub fn details_closed(&mut self) {
        self.view.details_closed();
        self.flush_history();
    }

    pub fn breadcrumb_clicked(&mut self, index: usize) {
        self.view.breadcrumb_clicked(index);
        self.flush_history();
    }

    pub fn view_changed(&mut self, change: ViewChange) {
        self.view.view_changed(change);
        self.flush_history();
    }

    pub fn object_highlighted(&mut self, object: Option<HighlightedObject>) {
        self.view.object_highlighted(object);
        self.flush_history();
    }

    pub fn matches_found(&mut self, matches: Matches) {
        self.view.matches_found(matches);
        self.flush_history();
    }

    pub fn search_changed(&mut self, term: &str) {
        self.view.search_changed(term);
        self.flush_history();
    }

    pub fn set_focused_node(&mut self, name: Option<String>) {
        self.view.set_focused_node(name);
        self.flush_history();
    }

    pub fn label_dimensions_changed(&mut self, dimensions: LabelDimensions) {
        self.view.label_dimensions_changed(dimensions);
        self.flush_history();
    }

    pub fn display_options_changed(&mut self, options: DisplayOptions) {
        self.view.display_options_changed(options);
        self.flush_history();
    }

    pub fn physics_options_changed(&mut self, options: PhysicsOptions) {
        self.view.physics_options_changed(options);
        self.flush_history();
    }

    pub fn dismiss_redirect(&mut self) {
        self.view.dismiss_redirect();
        self.flush_history();
    }

    /// Filter-clear button. May take two presses: the first returns a
    /// non-default state to defaults, the second clears outright.
    pub fn clear_filters_requested(&mut self) -> StoreEvents {
        match self.view.clear_filters_requested(self.dispatcher.filters()) {
            Some(action) => self.dispatch(ActionSource::View, action),
            None => StoreEvents::default(),
        }
    }

    // ============================================================
    // Queries
    // ============================================================

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn filters(&self) -> &FilterStore {
        self.dispatcher.filters()
    }

    pub fn traffic(&self) -> &TrafficStore {
        self.dispatcher.traffic()
    }

    pub fn view(&self) -> &ViewCoordinator {
        &self.view
    }

    pub fn page_title(&self) -> String {
        self.view.page_title()
    }

    pub fn breadcrumbs(&self) -> Vec<String> {
        self.view.breadcrumbs()
    }

    pub fn render_model(&self) -> RenderModel<'_> {
        RenderModel {
            traffic: self.dispatcher.traffic().traffic(),
            view: self.view.current_view().unwrap_or(&[]),
            filters: self.dispatcher.filters().specs(),
            styles: self.view.styles(),
            display: self.view.display_options(),
            physics: self.view.physics_options(),
        }
    }
}
