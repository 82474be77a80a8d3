//! Central action dispatch.
//!
//! The dispatcher owns every store as a plain field and hands each
//! envelope to all of them, in declaration order, before returning.
//! Because `dispatch` takes `&mut self`, a store can never re-enter the
//! dispatcher from inside its own handler; cross-dispatch scheduling
//! goes through the dashboard's deferred queue instead.

use log::debug;

use crate::action::ActionEnvelope;
use crate::filter::FilterStore;
use crate::traffic::TrafficStore;

/// Which change notifications an action produced. Consumers react to the
/// flags after dispatch returns; stores themselves never call out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreEvents {
    pub filters_changed: bool,
    pub traffic_changed: bool,
    pub offset_changed: bool,
}

impl StoreEvents {
    pub fn any(&self) -> bool {
        self.filters_changed || self.traffic_changed || self.offset_changed
    }

    pub fn merge(&mut self, other: StoreEvents) {
        self.filters_changed |= other.filters_changed;
        self.traffic_changed |= other.traffic_changed;
        self.offset_changed |= other.offset_changed;
    }
}

#[derive(Debug, Default)]
pub struct Dispatcher {
    filters: FilterStore,
    traffic: TrafficStore,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver the envelope to every store and report the merged change
    /// flags. Runs to completion before returning; nothing is queued.
    pub fn dispatch(&mut self, envelope: &ActionEnvelope) -> StoreEvents {
        debug!(
            "dispatch {} from {:?}",
            envelope.action.kind(),
            envelope.source
        );
        let mut events = self.filters.handle(envelope);
        events.merge(self.traffic.handle(envelope));
        events
    }

    pub fn filters(&self) -> &FilterStore {
        &self.filters
    }

    pub fn traffic(&self) -> &TrafficStore {
        &self.traffic
    }
}
