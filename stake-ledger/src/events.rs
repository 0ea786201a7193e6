//! Fire-and-forget event delivery.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use stake_shared_types::LedgerEvent;

use crate::audit_log;
use crate::constants::DEFAULT_EVENT_LOG_CAPACITY;

/// Receives ledger events after the state change they describe has committed.
pub trait EventSink: Send {
    fn emit(&mut self, event: &LedgerEvent);
}

/// Records events in memory, keeping at most `capacity` of the newest. Every event
/// keeps the absolute position it was recorded at, so positions stay valid after
/// older events are evicted. Clones share the same log.
#[derive(Debug, Clone)]
pub struct EventLog {
    inner: Arc<Mutex<Retained>>,
}

#[derive(Debug)]
struct Retained {
    capacity: usize,
    /// Absolute position of `events[0]`.
    first: usize,
    events: VecDeque<LedgerEvent>,
}

impl Retained {
    fn next_index(&self) -> usize {
        self.first + self.events.len()
    }
}

impl Default for EventLog {
    fn default() -> Self {
        EventLog::with_capacity(DEFAULT_EVENT_LOG_CAPACITY)
    }
}

impl EventLog {
    pub fn new() -> Self {
        EventLog::default()
    }

    /// A capacity of zero is raised to one.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        EventLog {
            inner: Arc::new(Mutex::new(Retained { capacity, first: 0, events: VecDeque::new() })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Retained> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn capacity(&self) -> usize {
        self.lock().capacity
    }

    /// Retained events, oldest first.
    pub fn events(&self) -> Vec<LedgerEvent> {
        self.lock().events.iter().cloned().collect()
    }

    /// Retained events recorded at or after absolute position `from`. Positions that
    /// were already evicted are skipped.
    pub fn since(&self, from: usize) -> Vec<LedgerEvent> {
        self.page(from, usize::MAX)
    }

    /// At most `limit` retained events starting at absolute position `from`.
    pub fn page(&self, from: usize, limit: usize) -> Vec<LedgerEvent> {
        let log = self.lock();
        let skip = from.saturating_sub(log.first);
        log.events.iter().skip(skip).take(limit).cloned().collect()
    }

    /// Absolute position of the oldest retained event.
    pub fn first_index(&self) -> usize {
        self.lock().first
    }

    /// Absolute position the next recorded event will get.
    pub fn next_index(&self) -> usize {
        self.lock().next_index()
    }

    pub fn last(&self) -> Option<LedgerEvent> {
        self.lock().events.back().cloned()
    }

    /// Number of retained events.
    pub fn len(&self) -> usize {
        self.lock().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().events.is_empty()
    }
}

impl EventSink for EventLog {
    fn emit(&mut self, event: &LedgerEvent) {
        let mut log = self.lock();
        if log.events.len() == log.capacity {
            log.events.pop_front();
            log.first += 1;
        }
        log.events.push_back(event.clone());
    }
}

/// Writes every event to the audit log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&mut self, event: &LedgerEvent) {
        audit_log::log_ledger_event(event);
    }
}

/// Delivers each event to several sinks in order.
#[derive(Default)]
pub struct FanOutSink {
    sinks: Vec<Box<dyn EventSink>>,
}

impl FanOutSink {
    pub fn new() -> Self {
        FanOutSink::default()
    }

    pub fn with(mut self, sink: impl EventSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }
}

impl EventSink for FanOutSink {
    fn emit(&mut self, event: &LedgerEvent) {
        for sink in self.sinks.iter_mut() {
            sink.emit(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stake_shared_types::Address;

    #[test]
    fn test_fan_out_reaches_every_sink() {
        let first = EventLog::new();
        let second = EventLog::new();
        let mut sink = FanOutSink::new().with(first.clone()).with(TracingEventSink).with(second.clone());

        let event = LedgerEvent::Unregistered { principal: Address([4u8; 20]) };
        sink.emit(&event);

        assert_eq!(first.events(), vec![event.clone()]);
        assert_eq!(second.last(), Some(event));
        assert!(first.since(1).is_empty());
    }

    fn unregistered(seed: u8) -> LedgerEvent {
        LedgerEvent::Unregistered { principal: Address([seed; 20]) }
    }

    #[test]
    fn test_full_log_evicts_oldest_and_keeps_positions() {
        let log = EventLog::with_capacity(3);
        let mut sink = log.clone();
        for seed in 0..5 {
            sink.emit(&unregistered(seed));
        }

        assert_eq!(log.len(), 3);
        assert_eq!(log.first_index(), 2);
        assert_eq!(log.next_index(), 5);
        assert_eq!(log.events(), vec![unregistered(2), unregistered(3), unregistered(4)]);

        // Evicted positions are skipped; retained ones keep their original index.
        assert_eq!(log.since(0), log.events());
        assert_eq!(log.since(3), vec![unregistered(3), unregistered(4)]);
        assert!(log.since(5).is_empty());
    }

    #[test]
    fn test_page_honours_limit() {
        let log = EventLog::with_capacity(10);
        let mut sink = log.clone();
        for seed in 0..6 {
            sink.emit(&unregistered(seed));
        }

        assert_eq!(log.page(1, 2), vec![unregistered(1), unregistered(2)]);
        assert_eq!(log.page(4, 100), vec![unregistered(4), unregistered(5)]);
        assert!(log.page(0, 0).is_empty());
        assert_eq!(EventLog::with_capacity(0).capacity(), 1);
        assert_eq!(EventLog::new().capacity(), DEFAULT_EVENT_LOG_CAPACITY);
    }
}
