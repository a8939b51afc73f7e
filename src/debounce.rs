//! Time based switch debouncing.
//!
//! A cell reports a new state only after its raw input has disagreed with the
//! reported state for the whole debounce interval. The interval is measured with
//! timestamps, so it does not matter how often a cell is sampled.

use crate::{Duration, Instant};

/// Debounce state of one switch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DebounceCell {
    stable: bool,
    last_raw: bool,
    /// When the raw input started to disagree with `stable`.
    pending_since: Option<Instant>,
}

impl DebounceCell {
    pub const fn new() -> Self {
        Self {
            stable: false,
            last_raw: false,
            pending_since: None,
        }
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.stable
    }

    /// Most recent raw sample, before debouncing.
    #[inline]
    pub fn raw(&self) -> bool {
        self.last_raw
    }

    #[inline]
    pub fn is_pending(&self) -> bool {
        self.pending_since.is_some()
    }

    /// Feeds one raw sample. Returns `true` if the reported state flipped.
    pub fn update(&mut self, raw: bool, now: Instant, interval: Duration) -> bool {
        self.last_raw = raw;
        if raw == self.stable {
            self.pending_since = None;
            return false;
        }

        let since = *self.pending_since.get_or_insert(now);
        // A clock that went backwards counts as no time elapsed.
        let elapsed = now
            .checked_duration_since(since)
            .unwrap_or(Duration::from_ticks(0));
        if elapsed >= interval {
            self.stable = raw;
            self.pending_since = None;
            true
        } else {
            false
        }
    }
}

impl Default for DebounceCell {
    fn default() -> Self {
        Self::new()
    }
}

/// Debounce cells for a whole `ROWS` x `COLS` matrix.
pub struct Debouncer<const ROWS: usize, const COLS: usize> {
    cells: [[DebounceCell; COLS]; ROWS],
    interval: Duration,
}

impl<const ROWS: usize, const COLS: usize> Debouncer<ROWS, COLS> {
    /// All switches start inactive.
    pub const fn new(interval: Duration) -> Self {
        Self {
            cells: [[DebounceCell::new(); COLS]; ROWS],
            interval,
        }
    }

    /// Feeds the raw rows read for `col`. Returns a bitmask of the rows whose
    /// reported state flipped.
    pub fn update_column(&mut self, col: usize, raw: &[bool; ROWS], now: Instant) -> u32 {
        let mut flipped = 0;
        for (row, cells) in self.cells.iter_mut().enumerate() {
            if cells[col].update(raw[row], now, self.interval) {
                flipped |= 1 << row;
                debug!("switch ({}, {}) -> {}", row, col, raw[row]);
            }
        }
        flipped
    }

    /// Debounced state of one cell. Out of range cells read inactive.
    pub fn is_active(&self, row: usize, col: usize) -> bool {
        self.cells
            .get(row)
            .and_then(|cells| cells.get(col))
            .map_or(false, DebounceCell::is_active)
    }

    /// Debounced state of the whole matrix, row major.
    pub fn states(&self) -> [[bool; COLS]; ROWS] {
        self.cells.map(|row| row.map(|cell| cell.is_active()))
    }
}
