//! A representation of not-yet-durable log entries and state.

use std::{cmp, fmt};

use getset::CopyGetters;
use slog::Logger;

use crate::eraftpb::{Entry, Snapshot};
use crate::util::entry_approximate_size;
use crate::{Config, Error, Result};

/// The position of a log entry: its term and index.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct EntryId {
    /// The term the entry was proposed in.
    pub term: u64,
    /// The log index of the entry.
    pub index: u64,
}

impl EntryId {
    /// Creates a new entry id.
    pub fn new(term: u64, index: u64) -> EntryId {
        EntryId { term, index }
    }
}

impl From<&Entry> for EntryId {
    fn from(e: &Entry) -> EntryId {
        EntryId::new(e.term, e.index)
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.term, self.index)
    }
}

/// The `unstable.entries[i]` has raft log position `i + unstable.offset`.
/// Note that `unstable.offset` may be less than the highest log position in storage; this
/// means that the next write to storage might need to truncate the log before persisting
/// `unstable.entries`.
///
/// A prefix of the entries, and the snapshot, may already be handed to storage and are then
/// "in progress": `entries[..offset_in_progress - offset]` and, if `snapshot_in_progress`,
/// the snapshot. They leave the log once storage reports them durable through
/// [`Unstable::stable_to`] and [`Unstable::stable_snap_to`].
#[derive(Debug, CopyGetters)]
pub struct Unstable {
    /// The incoming unstable snapshot, if any.
    snapshot: Option<Snapshot>,

    /// All entries that have not yet been written to storage.
    entries: Vec<Entry>,

    /// The approximate size in bytes of all entries.
    #[getset(get_copy = "pub")]
    entries_size: usize,

    /// The log index of `entries[0]`, or the index of the next entry when there are none.
    #[getset(get_copy = "pub")]
    offset: u64,

    /// One past the index of the last entry handed to storage. Entries in
    /// `[offset, offset_in_progress)` are being persisted.
    #[getset(get_copy = "pub")]
    offset_in_progress: u64,

    /// Whether the snapshot has been handed to storage.
    #[getset(get_copy = "pub")]
    snapshot_in_progress: bool,

    shrink_multiple: usize,

    /// The logger to report ignored acknowledgments and truncations to.
    logger: Logger,
}

impl Unstable {
    /// Creates a new log of unstable entries.
    pub fn new(offset: u64, logger: Logger) -> Unstable {
        Unstable {
            snapshot: None,
            entries: vec![],
            entries_size: 0,
            offset,
            offset_in_progress: offset,
            snapshot_in_progress: false,
            shrink_multiple: Config::default().shrink_multiple,
            logger,
        }
    }

    /// Creates a new log of unstable entries from a validated config.
    pub fn with_config(c: &Config, logger: &Logger) -> Result<Unstable> {
        c.validate()?;
        let mut u = Unstable::new(c.offset, logger.clone());
        u.shrink_multiple = c.shrink_multiple;
        Ok(u)
    }

    /// All entries that have not yet been written to storage, starting at `offset`.
    #[inline]
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// The incoming unstable snapshot, if any.
    #[inline]
    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.snapshot.as_ref()
    }

    /// One past the index of the last held entry.
    #[inline]
    fn upper(&self) -> u64 {
        self.offset + self.entries.len() as u64
    }

    /// Returns the index of the first possible entry in entries
    /// if it has a snapshot.
    pub fn maybe_first_index(&self) -> Option<u64> {
        self.snapshot
            .as_ref()
            .map(|snap| snap.get_metadata().index + 1)
    }

    /// Returns the last index if it has at least one unstable entry or snapshot.
    pub fn maybe_last_index(&self) -> Option<u64> {
        match self.entries.len() {
            0 => self.snapshot.as_ref().map(|snap| snap.get_metadata().index),
            len => Some(self.offset + len as u64 - 1),
        }
    }

    /// Returns the term of the entry at index idx, if there is any.
    ///
    /// `None` means the index is unknown to the unstable log, the caller has to consult
    /// stable storage.
    pub fn maybe_term(&self, idx: u64) -> Option<u64> {
        if idx < self.offset {
            let meta = self.snapshot.as_ref()?.get_metadata();
            if idx == meta.index {
                Some(meta.term)
            } else {
                None
            }
        } else {
            usize::try_from(idx - self.offset)
                .ok()
                .and_then(|pos| self.entries.get(pos))
                .map(|e| e.term)
        }
    }

    /// Returns the entries that are not yet handed to storage, or `None` if every entry
    /// is in progress. An empty slice is never returned.
    pub fn next_entries(&self) -> Option<&[Entry]> {
        let in_progress = (self.offset_in_progress - self.offset) as usize;
        self.entries
            .get(in_progress..)
            .filter(|ents| !ents.is_empty())
    }

    /// Whether `next_entries` has anything to hand to storage.
    #[inline]
    pub fn has_next_entries(&self) -> bool {
        self.offset_in_progress < self.upper()
    }

    /// Returns the snapshot if it is not yet handed to storage.
    pub fn next_snapshot(&self) -> Option<&Snapshot> {
        if self.snapshot_in_progress {
            return None;
        }
        self.snapshot.as_ref()
    }

    /// Whether `next_snapshot` has anything to hand to storage.
    #[inline]
    pub fn has_next_snapshot(&self) -> bool {
        self.snapshot.is_some() && !self.snapshot_in_progress
    }

    /// Marks every entry and the snapshot, as of now, as handed to storage. A later
    /// `next_entries` or `next_snapshot` only returns what is added after this call.
    pub fn accept_in_progress(&mut self) {
        self.offset_in_progress = self.upper();
        if self.snapshot.is_some() {
            self.snapshot_in_progress = true;
        }
        self.debug_check_invariants();
    }

    /// Drops the entries up to and including `id` once storage reports them durable.
    ///
    /// Acknowledgments for entries that are no longer held, were never handed to storage,
    /// or were overwritten by a different term since, are ignored.
    pub fn stable_to(&mut self, id: EntryId) {
        if id.index < self.offset {
            info!(
                self.logger,
                "entry {} is below the unstable offset, ignoring", id;
                "offset" => self.offset,
            );
            return;
        }
        if id.index >= self.offset_in_progress {
            warn!(
                self.logger,
                "entry {} was never handed to storage, ignoring", id;
                "offset_in_progress" => self.offset_in_progress,
            );
            return;
        }
        // offset <= index < offset_in_progress <= upper, the position is in range.
        let pos = (id.index - self.offset) as usize;
        let term = self.entries[pos].term;
        if term != id.term {
            info!(self.logger, "entry {} was overwritten at term {}, ignoring", id, term);
            return;
        }
        if let Some(snap) = &self.snapshot {
            warn!(
                self.logger,
                "entry {} is acknowledged before the snapshot it follows, ignoring", id;
                "snapshot_index" => snap.get_metadata().index,
            );
            return;
        }

        self.entries_size -= self.entries[..=pos]
            .iter()
            .map(entry_approximate_size)
            .sum::<usize>();
        self.entries.drain(..=pos);
        self.offset = id.index + 1;
        self.offset_in_progress = cmp::max(self.offset_in_progress, self.offset);
        self.shrink_entries();
        self.debug_check_invariants();
    }

    /// Removes the snapshot once storage reports it durable, if its index matches.
    pub fn stable_snap_to(&mut self, idx: u64) {
        match &self.snapshot {
            Some(snap) if snap.get_metadata().index == idx => {
                self.snapshot = None;
                self.snapshot_in_progress = false;
            }
            Some(snap) => {
                info!(
                    self.logger,
                    "snapshot at index {} is no longer unstable, ignoring", idx;
                    "snapshot_index" => snap.get_metadata().index,
                );
            }
            None => {
                debug!(self.logger, "no unstable snapshot, ignoring snapshot at index {}", idx);
            }
        }
        self.debug_check_invariants();
    }

    /// From a given snapshot, restores the snapshot to self, but doesn't unpack.
    ///
    /// Every held entry, the previous snapshot, and all in-progress state are discarded.
    pub fn restore(&mut self, snap: Snapshot) {
        let index = snap.get_metadata().index;
        let offset = match index.checked_add(1) {
            Some(offset) => offset,
            None => {
                error!(self.logger, "snapshot index {} leaves no room for entries, ignoring", index);
                return;
            }
        };
        self.entries.clear();
        self.entries_size = 0;
        self.offset = offset;
        self.offset_in_progress = offset;
        self.snapshot = Some(snap);
        self.snapshot_in_progress = false;
        self.debug_check_invariants();
    }

    /// Append entries to unstable, truncate local block first if overlapped.
    ///
    /// `ents` must be contiguous. Entries already covered by the pending snapshot are
    /// skipped. Entries that would leave a gap after the last held entry, or that reach
    /// index `u64::MAX`, are ignored.
    pub fn truncate_and_append(&mut self, ents: &[Entry]) {
        let mut ents = ents;
        if let (Some(snap), Some(first)) = (&self.snapshot, ents.first()) {
            let snap_index = snap.get_metadata().index;
            let covered = ents.iter().take_while(|e| e.index <= snap_index).count();
            if covered > 0 {
                warn!(
                    self.logger,
                    "skipping {} entries covered by the unstable snapshot", covered;
                    "first" => first.index,
                    "snapshot_index" => snap_index,
                );
                ents = &ents[covered..];
            }
        }
        let after = match ents.first() {
            Some(e) => e.index,
            None => return,
        };
        if after.checked_add(ents.len() as u64).is_none() {
            error!(
                self.logger,
                "entries starting at {} run past the last representable index, ignoring", after;
                "count" => ents.len(),
            );
            return;
        }

        let upper = self.upper();
        if after == upper {
            // after is the next index in the self.entries, append directly
        } else if after <= self.offset {
            // The log is being truncated to before our current offset
            // portion, so set the offset and replace the entries.
            info!(self.logger, "replace the unstable entries from index {}", after);
            self.offset = after;
            self.offset_in_progress = after;
            self.entries.clear();
            self.entries_size = 0;
        } else if after < upper {
            // Truncate to after and keep the prefix. Whatever was in progress past the
            // truncation point is stale now.
            info!(self.logger, "truncate the unstable entries before index {}", after);
            let keep = (after - self.offset) as usize;
            self.entries_size -= self.entries[keep..]
                .iter()
                .map(entry_approximate_size)
                .sum::<usize>();
            self.entries.truncate(keep);
            self.offset_in_progress = cmp::min(self.offset_in_progress, after);
        } else {
            error!(
                self.logger,
                "entries starting at {} would leave a gap in the unstable log, ignoring", after;
                "next_index" => upper,
            );
            return;
        }
        self.entries_size += ents.iter().map(entry_approximate_size).sum::<usize>();
        self.entries.extend_from_slice(ents);
        self.debug_check_invariants();
    }

    /// Returns a slice of entries between the high and low.
    ///
    /// The range `[lo, hi)` must lie within `[offset, offset + entries.len()]`.
    pub fn slice(&self, lo: u64, hi: u64) -> Result<&[Entry]> {
        self.check_outofbounds(lo, hi)?;
        let off = self.offset;
        Ok(&self.entries[(lo - off) as usize..(hi - off) as usize])
    }

    /// Checks the `hi` and `lo` values against each other and against the
    /// entries themselves.
    fn check_outofbounds(&self, lo: u64, hi: u64) -> Result<()> {
        if lo > hi {
            return Err(Error::InvalidSlice { lo, hi });
        }
        let upper = self.upper();
        if lo < self.offset || hi > upper {
            return Err(Error::OutOfBounds {
                lo,
                hi,
                offset: self.offset,
                upper,
            });
        }
        Ok(())
    }

    /// Releases the memory held by entries that have been stabilized.
    fn shrink_entries(&mut self) {
        if self.shrink_multiple == 0 {
            return;
        }
        if self.entries.is_empty() {
            self.entries = Vec::new();
        } else if self.entries.len().saturating_mul(self.shrink_multiple) < self.entries.capacity()
        {
            self.entries.shrink_to_fit();
        }
    }

    /// Verifies the relations between the offsets, the entries and the snapshot.
    pub fn check_invariants(&self) -> Result<()> {
        let violated = |msg: String| Err(Error::InvariantViolated(msg));
        let upper = self.upper();
        if self.offset_in_progress < self.offset || self.offset_in_progress > upper {
            return violated(format!(
                "offset_in_progress {} out of [{}, {}]",
                self.offset_in_progress, self.offset, upper
            ));
        }
        match &self.snapshot {
            Some(snap) => {
                let index = snap.get_metadata().index;
                if index.checked_add(1) != Some(self.offset) {
                    return violated(format!(
                        "snapshot index {} does not precede offset {}",
                        index, self.offset
                    ));
                }
                if self.offset_in_progress > self.offset && !self.snapshot_in_progress {
                    return violated(format!(
                        "entries in progress up to {} ahead of the snapshot at {}",
                        self.offset_in_progress, index
                    ));
                }
            }
            None if self.snapshot_in_progress => {
                return violated("snapshot in progress without a snapshot".to_owned());
            }
            None => {}
        }
        if let Some(first) = self.entries.first() {
            if first.index != self.offset {
                return violated(format!(
                    "first entry index {} != offset {}",
                    first.index, self.offset
                ));
            }
        }
        let size: usize = self.entries.iter().map(entry_approximate_size).sum();
        if size != self.entries_size {
            return violated(format!(
                "entries size {} != tracked size {}",
                size, self.entries_size
            ));
        }
        Ok(())
    }

    #[inline]
    fn debug_check_invariants(&self) {
        if cfg!(debug_assertions) {
            if let Err(e) = self.check_invariants() {
                fatal!(self.logger, "{} [{}]", e, self);
            }
        }
    }
}

impl fmt::Display for Unstable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "offset={}, offset_in_progress={}, entries.len()={}",
            self.offset,
            self.offset_in_progress,
            self.entries.len()
        )?;
        if let Some(snap) = &self.snapshot {
            let meta = snap.get_metadata();
            write!(
                f,
                ", snapshot={}/{}, snapshot_in_progress={}",
                meta.term, meta.index, self.snapshot_in_progress
            )?;
        }
        Ok(())
    }
}
