//! Log stream consumer
//!
//! Incremental, cursor-based consumption of the engine's append-only log:
//!
//! - [`LogCursor`]: max server id seen, lower bound of the next fetch, never decreases
//! - [`LogBuffer`]: bounded FIFO of rendered lines (oldest evicted first)
//! - [`ScrollState`]: pin-to-bottom protocol for the log panel
//! - [`LogConsumer`]: ties the three together
//!
//! Applying a batch is idempotent: entries at or below the cursor are
//! dropped, so retried, overlapping or out-of-order responses never produce
//! duplicates or move the cursor backwards.

use std::collections::VecDeque;

use crate::api::types::LogEntry;
use crate::core::format::DisplayLogEntry;

/// Default number of lines kept in memory
pub const DEFAULT_LOG_CAPACITY: usize = 400;

/// Default pin threshold, in rows from the bottom
pub const DEFAULT_PIN_THRESHOLD: usize = 2;

// =============================================================================
// LogCursor
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogCursor(u64);

impl LogCursor {
    pub fn get(&self) -> u64 {
        self.0
    }

    /// `cursor = max(cursor, max(ids))`
    pub fn advance<I: IntoIterator<Item = u64>>(&mut self, ids: I) {
        if let Some(max) = ids.into_iter().max() {
            self.0 = self.0.max(max);
        }
    }
}

// =============================================================================
// LogBuffer
// =============================================================================

#[derive(Debug)]
pub struct LogBuffer {
    entries: VecDeque<DisplayLogEntry>,
    capacity: usize,
    next_seq: u64,
    evicted: u64,
}

impl LogBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            next_seq: 1,
            evicted: 0,
        }
    }

    /// Append with automatic rotation; returns the assigned sequence number
    pub fn push(&mut self, mut entry: DisplayLogEntry) -> u64 {
        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
            self.evicted += 1;
        }
        let seq = self.next_seq;
        entry.seq = seq;
        self.next_seq += 1;
        self.entries.push_back(entry);
        seq
    }

    pub fn entries(&self) -> &VecDeque<DisplayLogEntry> {
        &self.entries
    }

    /// Lines appended after `seq`, oldest first
    pub fn since(&self, seq: u64) -> impl Iterator<Item = &DisplayLogEntry> {
        self.entries.iter().filter(move |e| e.seq > seq)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn evicted(&self) -> u64 {
        self.evicted
    }
}

// =============================================================================
// ScrollState
// =============================================================================

/// Scroll position of the log panel, in rows.
///
/// `pinned` is decided at the last user scroll: within `threshold` rows of
/// the bottom. Appends keep a pinned view glued to the bottom; an unpinned
/// view keeps its offset and is flagged `paused`.
#[derive(Debug, Clone)]
pub struct ScrollState {
    offset: usize,
    viewport: usize,
    content: usize,
    threshold: usize,
    pinned: bool,
    paused: bool,
}

impl ScrollState {
    pub fn new(threshold: usize) -> Self {
        Self {
            offset: 0,
            viewport: 0,
            content: 0,
            threshold,
            pinned: true,
            paused: false,
        }
    }

    /// Index of the first visible row
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn viewport(&self) -> usize {
        self.viewport
    }

    pub fn is_pinned(&self) -> bool {
        self.pinned
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn distance_from_bottom(&self) -> usize {
        self.content.saturating_sub(self.offset + self.viewport)
    }

    fn max_offset(&self) -> usize {
        self.content.saturating_sub(self.viewport)
    }

    /// Called by the renderer when the panel height is known
    pub fn set_viewport(&mut self, rows: usize) {
        self.viewport = rows;
        if self.pinned {
            self.scroll_to_bottom();
        } else {
            self.offset = self.offset.min(self.max_offset());
        }
    }

    pub fn scroll_to_bottom(&mut self) {
        self.offset = self.max_offset();
    }

    /// User scroll: negative moves towards older lines
    pub fn scroll_by(&mut self, delta: isize) {
        let target = if delta < 0 {
            self.offset.saturating_sub(delta.unsigned_abs())
        } else {
            self.offset.saturating_add(delta as usize)
        };
        self.offset = target.min(self.max_offset());
        self.check_pin();
    }

    /// Jump back to the live tail
    pub fn repin(&mut self) {
        self.scroll_to_bottom();
        self.check_pin();
    }

    /// Recompute `pinned` from the current position; clears `paused` when pinned
    pub fn check_pin(&mut self) {
        self.pinned = self.distance_from_bottom() <= self.threshold;
        if self.pinned {
            self.paused = false;
        }
    }

    /// Content grew to `content_rows` after `evicted_rows` left the top.
    /// An unpinned view shifts up with the rotation so the same lines stay visible.
    pub fn on_append(&mut self, content_rows: usize, evicted_rows: usize) {
        self.content = content_rows;
        if self.pinned {
            self.scroll_to_bottom();
        } else {
            self.offset = self.offset.saturating_sub(evicted_rows);
            self.paused = true;
        }
    }
}

// =============================================================================
// LogConsumer
// =============================================================================

#[derive(Debug)]
pub struct LogConsumer {
    cursor: LogCursor,
    buffer: LogBuffer,
    scroll: ScrollState,
}

impl LogConsumer {
    pub fn new(capacity: usize, pin_threshold: usize) -> Self {
        Self {
            cursor: LogCursor::default(),
            buffer: LogBuffer::new(capacity),
            scroll: ScrollState::new(pin_threshold),
        }
    }

    pub fn cursor(&self) -> u64 {
        self.cursor.get()
    }

    pub fn buffer(&self) -> &LogBuffer {
        &self.buffer
    }

    pub fn scroll(&self) -> &ScrollState {
        &self.scroll
    }

    pub fn scroll_mut(&mut self) -> &mut ScrollState {
        &mut self.scroll
    }

    /// Apply a server batch; returns how many lines were appended.
    pub fn apply_remote(&mut self, mut batch: Vec<LogEntry>) -> usize {
        let floor = self.cursor.get();
        batch.retain(|e| e.id > floor);
        batch.sort_by_key(|e| e.id);
        batch.dedup_by_key(|e| e.id);

        for entry in &batch {
            self.append(DisplayLogEntry::from_log_entry(entry));
        }
        self.cursor.advance(batch.iter().map(|e| e.id));
        batch.len()
    }

    /// Client-side line; never touches the cursor
    pub fn push_local(&mut self, entry: DisplayLogEntry) -> u64 {
        self.append(entry)
    }

    fn append(&mut self, entry: DisplayLogEntry) -> u64 {
        let evicted_before = self.buffer.evicted();
        let seq = self.buffer.push(entry);
        let evicted = (self.buffer.evicted() - evicted_before) as usize;
        self.scroll.on_append(self.buffer.len(), evicted);
        seq
    }
}
