//! Background poll loop driving the data feed.
//!
//! One thread owns the feed and nothing else; it talks to the engine
//! exclusively over channels. Every request is tagged with a monotonic
//! sequence number and the offset it was issued for, so the engine can
//! recognize and drop responses that a later offset change superseded.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, warn};

use fluxmap_graph::TrafficSnapshot;

use crate::feed::{FeedError, TrafficFeed};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchCommand {
    /// Fetch immediately instead of waiting out the interval.
    FetchNow,
    /// Adopt a new replay offset and fetch immediately.
    SetOffset { offset_ms: u64 },
    Shutdown,
}

/// One completed fetch attempt, successful or not.
#[derive(Debug)]
pub struct FetchEvent {
    pub seq: u64,
    /// Replay offset the request was issued with.
    pub offset_ms: u64,
    pub outcome: Result<TrafficSnapshot, FeedError>,
}

/// Handle to the poll thread. Dropping it (or calling [`stop`]) shuts
/// the thread down and joins it, so no timer outlives its owner.
///
/// [`stop`]: FetchLoop::stop
pub struct FetchLoop {
    commands: Sender<FetchCommand>,
    events: Receiver<FetchEvent>,
    handle: Option<JoinHandle<()>>,
}

impl FetchLoop {
    /// Start polling `feed` every `interval`, beginning with an
    /// immediate fetch.
    pub fn spawn<F>(feed: F, interval: Duration) -> Self
    where
        F: TrafficFeed + Send + 'static,
    {
        let (command_tx, command_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let handle = thread::spawn(move || run_loop(feed, interval, command_rx, event_tx));
        Self {
            commands: command_tx,
            events: event_rx,
            handle: Some(handle),
        }
    }

    pub fn fetch_now(&self) {
        let _ = self.commands.send(FetchCommand::FetchNow);
    }

    pub fn set_offset(&self, offset_ms: u64) {
        let _ = self.commands.send(FetchCommand::SetOffset { offset_ms });
    }

    pub fn try_recv_event(&self) -> Option<FetchEvent> {
        self.events.try_recv().ok()
    }

    pub fn recv_event_timeout(&self, timeout: Duration) -> Option<FetchEvent> {
        self.events.recv_timeout(timeout).ok()
    }

    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let _ = self.commands.send(FetchCommand::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for FetchLoop {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_loop<F>(
    feed: F,
    interval: Duration,
    commands: Receiver<FetchCommand>,
    events: Sender<FetchEvent>,
) where
    F: TrafficFeed,
{
    let mut offset_ms: u64 = 0;
    let mut seq: u64 = 0;
    loop {
        seq += 1;
        debug!("fetch {seq} (offset {offset_ms}ms)");
        let outcome = feed.fetch(offset_ms / 1000);
        if let Err(err) = &outcome {
            warn!("fetch {seq} failed: {err}");
        }
        if events
            .send(FetchEvent {
                seq,
                offset_ms,
                outcome,
            })
            .is_err()
        {
            // Engine side is gone; nothing left to poll for.
            return;
        }

        match commands.recv_timeout(interval) {
            Ok(FetchCommand::FetchNow) => {}
            Ok(FetchCommand::SetOffset { offset_ms: next }) => offset_ms = next,
            Ok(FetchCommand::Shutdown) | Err(RecvTimeoutError::Disconnected) => return,
            Err(RecvTimeoutError::Timeout) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    struct CountingFeed {
        calls: Arc<AtomicU64>,
    }

    impl TrafficFeed for CountingFeed {
        fn fetch(&self, offset_secs: u64) -> Result<TrafficSnapshot, FeedError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            let _ = offset_secs;
            Ok(TrafficSnapshot {
                name: "edge".to_string(),
                server_update_time: Some(call),
                ..TrafficSnapshot::default()
            })
        }
    }

    struct FailingFeed;

    impl TrafficFeed for FailingFeed {
        fn fetch(&self, _offset_secs: u64) -> Result<TrafficSnapshot, FeedError> {
            Err(FeedError::HttpStatus { code: 503 })
        }
    }

    #[test]
    fn events_carry_monotonic_sequence_numbers() {
        let calls = Arc::new(AtomicU64::new(0));
        let pool = FetchLoop::spawn(
            CountingFeed {
                calls: Arc::clone(&calls),
            },
            Duration::from_millis(10),
        );

        let first = pool
            .recv_event_timeout(Duration::from_secs(2))
            .expect("first event");
        let second = pool
            .recv_event_timeout(Duration::from_secs(2))
            .expect("second event");
        assert_eq!(first.seq, 1);
        assert_eq!(second.seq, 2);
        assert!(first.outcome.is_ok());

        pool.stop();
        assert!(calls.load(Ordering::SeqCst) >= 2);
    }

    #[test]
    fn set_offset_takes_effect_on_the_next_fetch() {
        let pool = FetchLoop::spawn(
            CountingFeed {
                calls: Arc::new(AtomicU64::new(0)),
            },
            // Long interval: further events only arrive through commands.
            Duration::from_secs(60),
        );

        let initial = pool
            .recv_event_timeout(Duration::from_secs(2))
            .expect("initial fetch");
        assert_eq!(initial.offset_ms, 0);

        pool.set_offset(3_600_000);
        let shifted = pool
            .recv_event_timeout(Duration::from_secs(2))
            .expect("fetch after offset change");
        assert_eq!(shifted.offset_ms, 3_600_000);

        pool.fetch_now();
        let repeat = pool
            .recv_event_timeout(Duration::from_secs(2))
            .expect("immediate fetch");
        assert_eq!(repeat.offset_ms, 3_600_000);
        assert_eq!(repeat.seq, 3);

        pool.stop();
    }

    #[test]
    fn failures_are_reported_not_fatal() {
        let pool = FetchLoop::spawn(FailingFeed, Duration::from_secs(60));
        let event = pool
            .recv_event_timeout(Duration::from_secs(2))
            .expect("failure event");
        assert_eq!(
            event.outcome.unwrap_err(),
            FeedError::HttpStatus { code: 503 }
        );

        // The loop keeps going after a failure.
        pool.fetch_now();
        let next = pool
            .recv_event_timeout(Duration::from_secs(2))
            .expect("second failure event");
        assert_eq!(next.seq, 2);

        pool.stop();
    }
}
