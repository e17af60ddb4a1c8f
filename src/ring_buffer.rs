// src/ring_buffer.rs
//! Bounded error history with FIFO eviction.
//!
//! Feeds the "recent errors" panel and toast queue of the front-end. A burst
//! of failures (a backend outage during a ward round) must not grow memory
//! without bound, so the buffer has a fixed entry count and a per-entry byte
//! cap.
//!
//! # Design Principles
//!
//! - **Bounded memory**: fixed maximum size regardless of error volume
//! - **FIFO eviction**: oldest entries dropped first
//! - **Per-entry size caps**: no single error can dominate the buffer
//! - **RwLock-based**: concurrent readers, exclusive writers
//! - **Zeroized on eviction and clear** when the entry is no longer shared
//!
//! # Example
//!
//! ```rust
//! use carefront_errors::{ClassifiedError, ErrorDispatcher, RingBufferLogger};
//!
//! let history = RingBufferLogger::new(100, 1024);
//! let dispatcher = ErrorDispatcher::new();
//! let _l = dispatcher.add_shared_listener(history.observer("radiology"));
//!
//! dispatcher.handle(ClassifiedError::validation("Unsupported image format", None));
//!
//! let recent = history.get_recent(10);
//! assert_eq!(recent[0].code, "VALIDATION_ERROR");
//! assert_eq!(recent[0].origin.as_ref(), "radiology");
//! ```

use crate::{ClassifiedError, Observer};
use chrono::Utc;
use smallvec::SmallVec;
use std::borrow::Cow;
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use zeroize::Zeroize;

/// Byte cap on the stored message.
const MESSAGE_CAP: usize = 512;
/// Byte cap on each rendered detail value, and on the origin.
const FIELD_CAP: usize = 128;
/// Marker appended to anything cut short.
const TRUNCATED: &str = "...[TRUNC]";

/// One remembered error with bounded size.
///
/// Uses `Arc<str>` so `get_recent()` clones are refcount increments.
#[derive(Clone, Debug)]
pub struct HistoryEntry {
    /// Unix timestamp (seconds) when the error was recorded
    pub timestamp: i64,
    /// Kind code (e.g. "NOT_FOUND_ERROR")
    pub code: &'static str,
    /// Status carried by the error
    pub status: u16,
    /// Message, possibly truncated
    pub message: Arc<str>,
    /// Page or component that reported the error
    pub origin: Arc<str>,
    /// Detail entries rendered as compact JSON, values capped
    pub details: Arc<[(Arc<str>, Arc<str>)]>,
    /// Approximate size in bytes
    pub size_bytes: usize,
    /// Whether the call site can recover locally
    pub recoverable: bool,
}

impl HistoryEntry {
    /// Wipe strings this entry owns exclusively.
    fn zeroize_unshared(&mut self) {
        if let Some(message) = Arc::get_mut(&mut self.message) {
            message.zeroize();
        }
        if let Some(origin) = Arc::get_mut(&mut self.origin) {
            origin.zeroize();
        }
        if let Some(details) = Arc::get_mut(&mut self.details) {
            for (_, value) in details.iter_mut() {
                if let Some(value) = Arc::get_mut(value) {
                    value.zeroize();
                }
            }
        }
    }
}

/// Error history with bounded memory usage.
///
/// Clones share the same entries and eviction counter.
#[derive(Clone)]
pub struct RingBufferLogger {
    entries: Arc<RwLock<VecDeque<HistoryEntry>>>,
    max_entries: usize,
    max_entry_bytes: usize,
    eviction_count: Arc<AtomicU64>,
}

impl RingBufferLogger {
    /// Create a history holding at most `max_entries` (minimum 1) entries of
    /// at most `max_entry_bytes` payload bytes each.
    pub fn new(max_entries: usize, max_entry_bytes: usize) -> Self {
        let max_entries = max_entries.max(1);
        Self {
            entries: Arc::new(RwLock::new(VecDeque::with_capacity(max_entries))),
            max_entries,
            max_entry_bytes,
            eviction_count: Arc::new(AtomicU64::new(0)),
        }
    }

    // Entries are never left half-written, so a poisoned lock is still usable.
    fn entries(&self) -> RwLockReadGuard<'_, VecDeque<HistoryEntry>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn entries_mut(&self) -> RwLockWriteGuard<'_, VecDeque<HistoryEntry>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record an error, evicting the oldest entry when full.
    ///
    /// `origin` names the page or component that reported it.
    pub fn log(&self, err: &ClassifiedError, origin: &str) {
        let entry = self.entry_for(err, origin);

        let mut entries = self.entries_mut();
        while entries.len() >= self.max_entries {
            if let Some(mut evicted) = entries.pop_front() {
                evicted.zeroize_unshared();
                self.eviction_count.fetch_add(1, Ordering::Relaxed);
            }
        }
        entries.push_back(entry);
    }

    /// Spend the byte budget on the message first, then details in key
    /// order, then the origin.
    fn entry_for(&self, err: &ClassifiedError, origin: &str) -> HistoryEntry {
        let mut budget = self.max_entry_bytes;

        let message = truncate_to_bytes(err.message(), budget.min(MESSAGE_CAP));
        budget -= message.len();

        let mut details: SmallVec<[(Arc<str>, Arc<str>); 8]> = SmallVec::new();
        for (key, value) in err.details().into_iter().flatten() {
            if key.len() >= budget {
                break;
            }
            let rendered = value.to_string();
            let value = truncate_to_bytes(&rendered, (budget - key.len()).min(FIELD_CAP));
            budget -= key.len() + value.len();
            details.push((Arc::from(key.as_str()), Arc::from(value.as_ref())));
        }

        let origin = truncate_to_bytes(origin, budget.min(FIELD_CAP));
        budget -= origin.len();

        HistoryEntry {
            timestamp: Utc::now().timestamp(),
            code: err.code(),
            status: err.status_code().value(),
            message: Arc::from(message.as_ref()),
            origin: Arc::from(origin.as_ref()),
            details: Arc::from(details.into_vec()),
            size_bytes: self.max_entry_bytes - budget,
            recoverable: err.is_recoverable(),
        }
    }

    /// Dispatcher observer recording every handled error under `origin`.
    pub fn observer(&self, origin: impl Into<String>) -> Observer {
        let history = self.clone();
        let origin = origin.into();
        Arc::new(move |err: &ClassifiedError| history.log(err, &origin))
    }

    /// The `count` most recent entries, newest first.
    pub fn get_recent(&self, count: usize) -> Vec<HistoryEntry> {
        self.entries().iter().rev().take(count).cloned().collect()
    }

    /// All entries, newest first.
    pub fn get_all(&self) -> Vec<HistoryEntry> {
        self.entries().iter().rev().cloned().collect()
    }

    /// Entries matching a predicate, oldest first.
    ///
    /// ```rust
    /// # use carefront_errors::{ClassifiedError, RingBufferLogger};
    /// # let history = RingBufferLogger::new(100, 1024);
    /// # history.log(&ClassifiedError::not_found("gone"), "patients");
    /// let server_side = history.get_filtered(|e| e.status >= 500);
    /// assert!(server_side.is_empty());
    /// ```
    pub fn get_filtered<F>(&self, predicate: F) -> Vec<HistoryEntry>
    where
        F: Fn(&HistoryEntry) -> bool,
    {
        self.entries().iter().filter(|e| predicate(e)).cloned().collect()
    }

    /// Entries currently held.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    /// No entries held.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total payload bytes (lower-bound estimate).
    pub fn payload_bytes(&self) -> usize {
        self.entries().iter().map(|e| e.size_bytes).sum()
    }

    /// Evictions since creation. A high rate means sustained error volume.
    #[inline]
    pub fn eviction_count(&self) -> u64 {
        self.eviction_count.load(Ordering::Relaxed)
    }

    /// Drop every entry (after the user dismisses the panel, or in tests).
    pub fn clear(&self) {
        for mut entry in self.entries_mut().drain(..) {
            entry.zeroize_unshared();
        }
    }

    /// Maximum entries before eviction starts.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.max_entries
    }

    /// The next `log` evicts the oldest entry.
    pub fn is_full(&self) -> bool {
        self.len() >= self.max_entries
    }
}

impl fmt::Debug for RingBufferLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RingBufferLogger")
            .field("len", &self.len())
            .field("capacity", &self.max_entries)
            .field("max_entry_bytes", &self.max_entry_bytes)
            .field("evictions", &self.eviction_count())
            .finish()
    }
}

/// Cut `s` to at most `max_bytes` on a char boundary, marking the cut.
fn truncate_to_bytes(s: &str, max_bytes: usize) -> Cow<'_, str> {
    if s.len() <= max_bytes {
        return Cow::Borrowed(s);
    }
    let Some(room) = max_bytes.checked_sub(TRUNCATED.len()) else {
        return Cow::Borrowed(&TRUNCATED[..max_bytes]);
    };
    let cut = s
        .char_indices()
        .map(|(i, _)| i)
        .take_while(|&i| i <= room)
        .last()
        .unwrap_or(0);
    Cow::Owned(format!("{}{}", &s[..cut], TRUNCATED))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ErrorDispatcher, ErrorKind};
    use serde_json::json;

    #[test]
    fn oldest_error_is_evicted_first() {
        let history = RingBufferLogger::new(3, 1024);
        for page in ["patients", "diagnosis", "specialists", "emergency", "radiology"] {
            history.log(&ClassifiedError::not_found(format!("{} unavailable", page)), page);
        }

        assert_eq!(history.len(), 3);
        assert_eq!(history.eviction_count(), 2);

        let origins: Vec<String> = history.get_all().iter().map(|e| e.origin.to_string()).collect();
        assert_eq!(origins, vec!["radiology", "emergency", "specialists"]);
    }

    #[test]
    fn entry_stays_within_byte_budget() {
        let history = RingBufferLogger::new(10, 128);
        let err = ClassifiedError::validation("A".repeat(10_000), None)
            .with_detail("notes", "B".repeat(10_000));
        history.log(&err, "patients");

        let entry = &history.get_recent(1)[0];
        assert!(entry.size_bytes <= 128);
        assert!(entry.message.ends_with(TRUNCATED));
        assert_eq!(entry.size_bytes, history.payload_bytes());
    }

    #[test]
    fn detail_values_are_capped_and_overflow_is_dropped() {
        let history = RingBufferLogger::new(10, 420);
        let err = ClassifiedError::validation("Validation failed", None)
            .with_detail("address", "x".repeat(1000))
            .with_detail("fullName", "y".repeat(1000))
            .with_detail("phone", "z".repeat(1000))
            .with_detail("zz", "w".repeat(1000));
        history.log(&err, "patients");

        let entry = &history.get_recent(1)[0];
        for (_, value) in entry.details.iter() {
            assert!(value.len() <= FIELD_CAP);
        }
        let keys: Vec<&str> = entry.details.iter().map(|(k, _)| k.as_ref()).collect();
        assert_eq!(keys, vec!["address", "fullName", "phone"]);
        assert_eq!(entry.details[2].1.len(), FIELD_CAP - 1);
        assert_eq!(entry.size_bytes, 420);
        assert!(entry.origin.is_empty());
    }

    #[test]
    fn entry_copies_error_fields() {
        let history = RingBufferLogger::new(10, 1024);
        let err = ClassifiedError::validation("Invalid time format", None).with_detail("field", "time");
        history.log(&err, "specialists");

        let entry = &history.get_recent(1)[0];
        assert_eq!(entry.code, "VALIDATION_ERROR");
        assert_eq!(entry.status, 400);
        assert_eq!(entry.details.len(), 1);
        assert_eq!(entry.details[0].0.as_ref(), "field");
        assert_eq!(entry.details[0].1.as_ref(), json!("time").to_string());
    }

    #[test]
    fn recoverable_follows_the_kind() {
        let history = RingBufferLogger::new(16, 256);
        for kind in ErrorKind::ALL {
            history.log(&ClassifiedError::from_kind(kind), "dashboard");
        }

        let unrecoverable = history.get_filtered(|e| !e.recoverable);
        let codes: Vec<&str> = unrecoverable.iter().map(|e| e.code).collect();
        for kind in ErrorKind::ALL {
            assert_eq!(codes.contains(&kind.code()), !kind.is_recoverable());
        }
    }

    #[test]
    fn long_origin_is_truncated() {
        let history = RingBufferLogger::new(4, 1024);
        let origin = "ward-".repeat(100);
        history.log(&ClassifiedError::conflict("Bed already assigned"), &origin);

        let entry = &history.get_recent(1)[0];
        assert!(entry.origin.len() <= FIELD_CAP);
        assert!(entry.origin.starts_with("ward-"));
        assert!(entry.origin.ends_with(TRUNCATED));
    }

    #[test]
    fn observers_tag_entries_with_their_origin() {
        let history = RingBufferLogger::new(10, 512);
        let dispatcher = ErrorDispatcher::new();
        let _emergency = dispatcher.add_shared_listener(history.observer("emergency"));

        let _ = dispatcher.handle(ClassifiedError::authorization("Not authorized"));
        let _ = dispatcher.handle(json!({"status": "weird"}));

        let from_emergency = history.get_filtered(|e| e.origin.as_ref() == "emergency");
        assert_eq!(from_emergency.len(), 2);
        assert_eq!(from_emergency[0].status, 403);
        assert_eq!(from_emergency[1].code, "UNKNOWN_ERROR");
    }

    #[test]
    fn clones_share_entries_and_evictions() {
        let panel = RingBufferLogger::new(2, 256);
        let toasts = panel.clone();

        for i in 0..3 {
            toasts.log(&ClassifiedError::unknown(format!("outage {}", i)), "dashboard");
        }

        assert_eq!(panel.len(), 2);
        assert_eq!(panel.eviction_count(), 1);
        assert_eq!(panel.get_recent(1)[0].message.as_ref(), "outage 2");
    }

    #[test]
    fn clear_empties_history() {
        let history = RingBufferLogger::new(4, 256);
        for _ in 0..6 {
            history.log(&ClassifiedError::unknown("x"), "o");
        }
        assert!(history.is_full());
        history.clear();
        assert!(history.is_empty());
        assert_eq!(history.payload_bytes(), 0);
    }

    #[test]
    fn zero_capacity_is_bumped_to_one() {
        let history = RingBufferLogger::new(0, 256);
        assert_eq!(history.capacity(), 1);
        history.log(&ClassifiedError::unknown("a"), "o");
        history.log(&ClassifiedError::unknown("b"), "o");
        assert_eq!(history.len(), 1);
        assert_eq!(history.get_recent(1)[0].message.as_ref(), "b");
    }

    #[test]
    fn multibyte_messages_are_cut_on_char_boundaries() {
        let history = RingBufferLogger::new(4, 64);
        history.log(&ClassifiedError::unknown("患者".repeat(100)), "patients");

        let entry = &history.get_recent(1)[0];
        assert!(entry.message.len() <= 64);
        assert!(entry.message.starts_with('患'));
    }

    #[test]
    fn tiny_budget_keeps_part_of_the_marker() {
        assert_eq!(truncate_to_bytes("Patient not found", 4), "...[");
        assert_eq!(truncate_to_bytes("", 0), "");
        assert!(matches!(truncate_to_bytes("ok", 2), Cow::Borrowed("ok")));
    }

    #[test]
    fn dispatching_from_many_threads_stays_bounded() {
        use std::thread;

        let history = RingBufferLogger::new(64, 256);
        let dispatcher = ErrorDispatcher::new();
        let _l = dispatcher.add_shared_listener(history.observer("ward"));

        let handles: Vec<_> = (0..4)
            .map(|ward| {
                let dispatcher = dispatcher.clone();
                thread::spawn(move || {
                    for bed in 0..50 {
                        let _ = dispatcher.handle(ClassifiedError::conflict(format!(
                            "ward {} bed {} taken",
                            ward, bed
                        )));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("dispatch thread panicked");
        }

        assert_eq!(history.len(), 64);
        assert_eq!(history.eviction_count(), 200 - 64);
        assert!(history.get_all().iter().all(|e| e.status == 409));
    }
}
