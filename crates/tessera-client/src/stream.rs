//! Chunk accumulation and the streaming row driver.
//!
//! [`RowAccumulator`] folds validated chunks for a single row key and tracks
//! where in the row lifecycle it stands. [`RowStream`] drives an accumulator
//! over a fallible message iterator and yields one [`Row`] per commit,
//! pulling messages only as the caller iterates.

use crate::chunk::{Chunk, ReadRowsMessage};
use crate::error::{display_key, Error, Result};
use crate::row::{Cell, FamilyMap, Row};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AccumulatorState {
    Empty,
    Accumulating,
    Committed,
}

/// Chunk fold state for one row key.
///
/// Lifecycle: `Empty` until the first cell contents arrive, `Accumulating`
/// while contents build up, `Committed` once a commit signal lands. A reset
/// signal returns to `Empty` but keeps the row key, so a retried row replays
/// under the same identity.
#[derive(Debug, Clone)]
pub struct RowAccumulator {
    row_key: Vec<u8>,
    families: FamilyMap,
    state: AccumulatorState,
}

impl RowAccumulator {
    pub fn new(row_key: impl Into<Vec<u8>>) -> Self {
        Self {
            row_key: row_key.into(),
            families: FamilyMap::new(),
            state: AccumulatorState::Empty,
        }
    }

    pub fn row_key(&self) -> &[u8] {
        &self.row_key
    }

    pub fn is_committed(&self) -> bool {
        self.state == AccumulatorState::Committed
    }

    /// True when nothing has accumulated since construction or the last
    /// reset. A committed row is not empty even if it holds no cells.
    pub fn is_empty(&self) -> bool {
        self.state == AccumulatorState::Empty
    }

    /// Folds one chunk. `index` and `last_index` locate the chunk within its
    /// message; a commit anywhere but the final position is malformed.
    pub fn apply(&mut self, chunk: Chunk, index: usize, last_index: usize) -> Result<()> {
        if self.is_committed() {
            return Err(Error::InvalidState("row already committed"));
        }
        match chunk {
            Chunk::Cells(contents) => {
                let columns = self.families.entry(contents.name).or_default();
                for column in contents.columns {
                    columns
                        .entry(column.qualifier)
                        .or_default()
                        .extend(column.cells.into_iter().map(Cell::from));
                }
                self.state = AccumulatorState::Accumulating;
            }
            Chunk::Reset => {
                self.families.clear();
                self.state = AccumulatorState::Empty;
            }
            Chunk::Commit => {
                if index != last_index {
                    return Err(Error::MalformedStream("commit must be final chunk"));
                }
                self.state = AccumulatorState::Committed;
            }
        }
        Ok(())
    }

    /// Discards accumulated contents and returns to `Empty`, keeping the row
    /// key. Unlike a reset signal this is caller-driven and also leaves the
    /// committed state.
    pub fn clear(&mut self) {
        self.families.clear();
        self.state = AccumulatorState::Empty;
    }

    /// Consumes the accumulator into a row carrying whatever has been folded
    /// so far.
    pub fn into_row(self) -> Row {
        Row::new(self.row_key, self.families)
    }
}

/// Iterator of committed rows over a streaming read response.
///
/// Yields `Ok(Row)` per committed row and at most one `Err`, after which the
/// stream is exhausted. A row left uncommitted when the underlying messages
/// end is dropped.
pub struct RowStream<M> {
    messages: M,
    current: Option<RowAccumulator>,
    done: bool,
}

impl<M> RowStream<M>
where
    M: Iterator<Item = Result<ReadRowsMessage>>,
{
    pub fn new(messages: M) -> Self {
        Self {
            messages,
            current: None,
            done: false,
        }
    }

    fn absorb(&mut self, message: ReadRowsMessage) -> Result<Option<Row>> {
        let ReadRowsMessage { row_key, chunks } = message;
        let mut acc = match self.current.take() {
            Some(acc) if acc.row_key() == row_key.as_slice() => acc,
            Some(acc) if acc.is_empty() => RowAccumulator::new(row_key),
            Some(acc) => {
                return Err(Error::RowKeyMismatch {
                    expected: display_key(acc.row_key()),
                    found: display_key(&row_key),
                });
            }
            None => RowAccumulator::new(row_key),
        };
        let last_index = chunks.len().saturating_sub(1);
        for (index, wire) in chunks.into_iter().enumerate() {
            let chunk = Chunk::parse(wire)?;
            acc.apply(chunk, index, last_index)?;
        }
        if acc.is_committed() {
            Ok(Some(acc.into_row()))
        } else {
            self.current = Some(acc);
            Ok(None)
        }
    }
}

impl<M> Iterator for RowStream<M>
where
    M: Iterator<Item = Result<ReadRowsMessage>>,
{
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            match self.messages.next() {
                Some(Ok(message)) => match self.absorb(message) {
                    Ok(Some(row)) => return Some(Ok(row)),
                    Ok(None) => continue,
                    Err(err) => {
                        self.done = true;
                        return Some(Err(err));
                    }
                },
                Some(Err(err)) => {
                    self.done = true;
                    return Some(Err(err));
                }
                None => {
                    // A row without a commit is dropped at end of stream.
                    self.current = None;
                    self.done = true;
                    return None;
                }
            }
        }
    }
}
