pub mod action;
pub mod config;
pub mod dashboard;
pub mod dispatch;
pub mod feed;
pub mod filter;
pub mod poll;
pub mod replay;
pub mod traffic;
pub mod view;

// Graph model, re-exported so embedders need a single dependency
pub use fluxmap_graph::{
    collect_node_classes, collect_region_nodes, connection_name, Connection, ConnectionSeries,
    Metrics, Node, NodeClass, NodeSeries, Notice, SeriesPoint, TrafficSnapshot,
    NOTICE_SEVERITY_DANGER, NOTICE_SEVERITY_INFO, NOTICE_SEVERITY_WARNING, REGION_RENDERER,
};

// Action flow (dispatch → stores → events)
pub use action::{Action, ActionEnvelope, ActionSource};
pub use dispatch::{Dispatcher, StoreEvents};

pub use filter::{
    FilterName, FilterPatch, FilterSettingValue, FilterSpec, FilterStep, FilterStore, FilterTarget,
    FilterValues, ERROR_STEPS, FILTER_ALL, NOTICE_FILTER_ALL, NOTICE_STEPS, RPS_STEPS,
};
pub use traffic::{unix_now_ms, RegionHistory, TrafficStore, MAX_HISTORY_LENGTH};

// View state and the embedder-facing ports
pub use view::{
    DisplayOptions, HighlightedObject, HistoryEntry, HistoryPort, HistoryState, LabelDimensions,
    Matches, NullHistory, ParticleOptions, PhysicsOptions, SearchState, SpringOptions, ViewChange,
    ViewCoordinator, APP_TITLE, ROOT_CRUMB,
};

// Data plane (HTTP feed + poll loop)
pub use feed::{FeedError, HttpTrafficFeed, ServerStatus, TrafficFeed};
pub use poll::{FetchCommand, FetchEvent, FetchLoop};

pub use replay::{
    format_clock, format_offset, format_time_ago, parse_replay_input, ReplayInputError,
};

pub use config::{
    ConfigError, DashboardConfig, DEFAULT_CONFIG_FILE_NAME, DEFAULT_MAX_REPLAY_OFFSET_SECS,
    DEFAULT_POLL_INTERVAL_MS, ENV_MAX_REPLAY_OFFSET_SECS, ENV_POLL_INTERVAL_MS, ENV_UPDATE_URL,
};

pub use dashboard::{Dashboard, RenderModel};
