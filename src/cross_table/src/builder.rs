use std::collections::{HashMap, hash_map};

use itertools::Itertools;
use log::{debug, info};
use thiserror::Error;

use crate::{
    key::{PositionKey, TABLE_SIZE},
    moves::{InvalidMoveError, MoveSequence, parse_joined},
    start, success,
};

/// Index cell value for a key with no recorded solution.
pub const ABSENT: i32 = -1;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TableBuildError {
    #[error("no valid rows parsed")]
    EmptyDataset,
    #[error("the solution for key {key} is too long to store: {len} bytes or moves")]
    SequenceTooLong { key: PositionKey, len: usize },
    #[error("the moves blob does not fit 32-bit offsets: {len} bytes")]
    BlobTooLarge { len: usize },
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum VerifyError {
    #[error("index cell {key} holds {value}, which is neither absent nor a slot")]
    BadIndexCell { key: usize, value: i32 },
    #[error("entries are not in key order at slot {slot}")]
    OutOfOrder { slot: usize },
    #[error("{unreferenced} entries are not referenced by the index")]
    Unreferenced { unreferenced: usize },
    #[error("entry {slot} points outside the moves blob")]
    EntryOutOfBounds { slot: usize },
    #[error("entry {slot} does not hold valid moves: {source}")]
    BadMoves {
        slot: usize,
        #[source]
        source: InvalidMoveError,
    },
    #[error("entry {slot} records {expected} moves but holds {actual}")]
    MoveCountMismatch {
        slot: usize,
        expected: u16,
        actual: usize,
    },
}

/// Where a stored solution lives in the moves blob.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Entry {
    pub offset: u32,
    pub len: u16,
    pub move_count: u16,
}

#[derive(Debug, Clone)]
struct Candidate {
    joined: String,
    move_count: usize,
}

/// What [`TableBuilder::ingest`] did with a sequence.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Ingested {
    Inserted,
    Replaced { previous_len: usize },
    Kept { existing_len: usize },
}

/// Collects the shortest known solution per key.
///
/// Fewer moves always wins; between sequences of equal length the one
/// ingested first is kept, so ingestion order must follow the input order
/// for the output to be reproducible.
#[derive(Debug, Default)]
pub struct TableBuilder {
    best: HashMap<PositionKey, Candidate>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.best.len()
    }

    pub fn is_empty(&self) -> bool {
        self.best.is_empty()
    }

    pub fn ingest(&mut self, key: PositionKey, moves: &MoveSequence) -> Ingested {
        self.offer(
            key,
            Candidate {
                joined: moves.joined(),
                move_count: moves.len(),
            },
        )
    }

    fn offer(&mut self, key: PositionKey, candidate: Candidate) -> Ingested {
        match self.best.entry(key) {
            hash_map::Entry::Vacant(vacant) => {
                vacant.insert(candidate);
                Ingested::Inserted
            }
            hash_map::Entry::Occupied(mut occupied) => {
                let existing_len = occupied.get().move_count;
                if candidate.move_count < existing_len {
                    occupied.insert(candidate);
                    Ingested::Replaced {
                        previous_len: existing_len,
                    }
                } else {
                    Ingested::Kept { existing_len }
                }
            }
        }
    }

    /// Folds in a builder filled from a later partition of the input. The
    /// same rule as [`TableBuilder::ingest`] applies, with `self` counting as
    /// seen first, so merging partitions in input order gives the same table
    /// as ingesting every row into one builder.
    pub fn merge(&mut self, later: TableBuilder) {
        for (key, candidate) in later.best {
            self.offer(key, candidate);
        }
    }

    /// Lays out the retained solutions in ascending key order.
    ///
    /// # Errors
    ///
    /// Fails if nothing was retained or if a solution does not fit the entry
    /// field widths.
    pub fn finalize(self) -> Result<CrossTable, TableBuildError> {
        if self.best.is_empty() {
            return Err(TableBuildError::EmptyDataset);
        }

        info!(start!("Laying out {} table entries"), self.best.len());

        let mut index = vec![ABSENT; TABLE_SIZE].into_boxed_slice();
        let mut entries = Vec::with_capacity(self.best.len());
        let mut blob = Vec::new();

        for (slot, (key, candidate)) in self
            .best
            .into_iter()
            .sorted_unstable_by_key(|(key, _)| *key)
            .enumerate()
        {
            let too_long = |len| TableBuildError::SequenceTooLong { key, len };
            let offset = u32::try_from(blob.len())
                .map_err(|_| TableBuildError::BlobTooLarge { len: blob.len() })?;
            let len = u16::try_from(candidate.joined.len())
                .map_err(|_| too_long(candidate.joined.len()))?;
            let move_count =
                u16::try_from(candidate.move_count).map_err(|_| too_long(candidate.move_count))?;

            // There are at most `TABLE_SIZE` slots
            #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
            let cell = slot as i32;
            index[key.index()] = cell;
            blob.extend_from_slice(candidate.joined.as_bytes());
            entries.push(Entry {
                offset,
                len,
                move_count,
            });
        }

        if u32::try_from(blob.len()).is_err() {
            return Err(TableBuildError::BlobTooLarge { len: blob.len() });
        }

        info!(
            success!("Laid out {} entries in a {} byte moves blob"),
            entries.len(),
            blob.len()
        );

        Ok(CrossTable {
            index,
            entries,
            blob,
        })
    }
}

/// A stored solution, borrowed from a [`CrossTable`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Solution<'a> {
    pub key: PositionKey,
    pub slot: usize,
    pub moves: &'a str,
    pub move_count: u16,
}

/// The finished direct-index table, its entries and the moves blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrossTable {
    index: Box<[i32]>,
    entries: Vec<Entry>,
    blob: Vec<u8>,
}

impl CrossTable {
    /// One cell per key, [`ABSENT`] or a slot in [`CrossTable::entries`].
    pub fn index(&self) -> &[i32] {
        &self.index
    }

    /// Entries in ascending key order.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn blob(&self) -> &[u8] {
        &self.blob
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn slot(&self, key: PositionKey) -> Option<usize> {
        usize::try_from(self.index[key.index()]).ok()
    }

    pub fn lookup(&self, key: PositionKey) -> Option<Solution<'_>> {
        let slot = self.slot(key)?;
        self.solution_at(key, slot)
    }

    fn solution_at(&self, key: PositionKey, slot: usize) -> Option<Solution<'_>> {
        let entry = self.entries.get(slot)?;
        let start = entry.offset as usize;
        let bytes = self.blob.get(start..start + usize::from(entry.len))?;
        Some(Solution {
            key,
            slot,
            moves: std::str::from_utf8(bytes).ok()?,
            move_count: entry.move_count,
        })
    }

    /// Every stored solution, in slot order.
    pub fn solutions(&self) -> impl Iterator<Item = Solution<'_>> + '_ {
        self.index
            .iter()
            .enumerate()
            .filter_map(|(i, &value)| {
                let key = PositionKey::from_index(i)?;
                self.solution_at(key, usize::try_from(value).ok()?)
            })
    }

    /// Checks that every index cell is absent or a valid slot, that slots are
    /// handed out in key order and referenced exactly once, and that every
    /// entry re-tokenizes to its recorded move count.
    ///
    /// # Errors
    ///
    /// Returns the first violation found.
    pub fn verify(&self) -> Result<(), VerifyError> {
        let mut next_slot = 0;
        for (key, &value) in self.index.iter().enumerate() {
            if value == ABSENT {
                continue;
            }
            let slot = usize::try_from(value)
                .ok()
                .filter(|&slot| slot < self.entries.len())
                .ok_or(VerifyError::BadIndexCell { key, value })?;
            if slot != next_slot {
                return Err(VerifyError::OutOfOrder { slot });
            }
            next_slot += 1;
        }
        if next_slot != self.entries.len() {
            return Err(VerifyError::Unreferenced {
                unreferenced: self.entries.len() - next_slot,
            });
        }

        let mut expected_offset = 0;
        for (slot, entry) in self.entries.iter().enumerate() {
            let start = entry.offset as usize;
            let bytes = (start == expected_offset)
                .then(|| self.blob.get(start..start + usize::from(entry.len)))
                .flatten()
                .ok_or(VerifyError::EntryOutOfBounds { slot })?;
            expected_offset = start + bytes.len();

            let text = String::from_utf8_lossy(bytes);
            let moves =
                parse_joined(&text).map_err(|source| VerifyError::BadMoves { slot, source })?;
            if moves.len() != usize::from(entry.move_count) {
                return Err(VerifyError::MoveCountMismatch {
                    slot,
                    expected: entry.move_count,
                    actual: moves.len(),
                });
            }
        }
        if expected_offset != self.blob.len() {
            return Err(VerifyError::EntryOutOfBounds {
                slot: self.entries.len(),
            });
        }

        debug!("Verified {} entries against the moves blob", self.entries.len());
        Ok(())
    }
}
