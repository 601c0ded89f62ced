//! Row mutations and the per-row mutation buffer.
//!
//! Mutations accumulate locally in a [`MutationBuffer`] and are sent as one
//! atomic request on [`MutationBuffer::commit`]. Nothing reaches the server
//! until commit, and a failed commit leaves the buffer intact for retry.

use std::time::Duration;

use crate::error::{Error, Result};
use crate::names::TableName;
use crate::protocol::{SERVER_TIME_MICROS, TIMESTAMP_GRANULARITY_MICROS};
use crate::service::DataService;
use crate::table::Table;

fn truncate_micros(micros: i64) -> i64 {
    micros.div_euclid(TIMESTAMP_GRANULARITY_MICROS) * TIMESTAMP_GRANULARITY_MICROS
}

/// Cell version timestamp. The server only stores millisecond granularity,
/// so explicit timestamps are truncated at construction rather than silently
/// on the server.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Timestamp {
    /// Let the server assign its current time at apply.
    #[default]
    ServerAssigned,
    /// An explicit time in microseconds since the epoch, millisecond-aligned.
    At(i64),
}

impl Timestamp {
    pub fn micros(micros: i64) -> Self {
        Self::At(truncate_micros(micros))
    }

    /// Wire form: explicit micros, or the server-time sentinel.
    pub fn to_micros(self) -> i64 {
        match self {
            Self::ServerAssigned => SERVER_TIME_MICROS,
            Self::At(micros) => micros,
        }
    }
}

/// Half-open `[start, end)` time window for column deletes. Unset bounds
/// leave the window open on that side.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TimestampRange {
    start_micros: Option<i64>,
    end_micros: Option<i64>,
}

impl TimestampRange {
    pub fn new(start_micros: Option<i64>, end_micros: Option<i64>) -> Self {
        Self {
            start_micros: start_micros.map(truncate_micros),
            end_micros: end_micros.map(truncate_micros),
        }
    }

    pub fn start_micros(&self) -> Option<i64> {
        self.start_micros
    }

    pub fn end_micros(&self) -> Option<i64> {
        self.end_micros
    }
}

/// Column qualifier accepted as text or raw bytes. Text converts to its
/// UTF-8 bytes; the distinction does not survive to the wire.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Qualifier(Vec<u8>);

impl Qualifier {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl From<&str> for Qualifier {
    fn from(text: &str) -> Self {
        Self(text.as_bytes().to_vec())
    }
}

impl From<String> for Qualifier {
    fn from(text: String) -> Self {
        Self(text.into_bytes())
    }
}

impl From<Vec<u8>> for Qualifier {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for Qualifier {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl<const N: usize> From<&[u8; N]> for Qualifier {
    fn from(bytes: &[u8; N]) -> Self {
        Self(bytes.to_vec())
    }
}

/// One buffered change to a single row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Mutation {
    SetCell {
        family: String,
        qualifier: Vec<u8>,
        value: Vec<u8>,
        timestamp: Timestamp,
    },
    DeleteColumn {
        family: String,
        qualifier: Vec<u8>,
        time_range: Option<TimestampRange>,
    },
    DeleteFamily {
        family: String,
    },
    DeleteRow,
}

/// The atomic unit handed to the data service: every buffered mutation for
/// one row, applied together or not at all.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MutateRowRequest {
    pub table_name: TableName,
    pub row_key: Vec<u8>,
    pub mutations: Vec<Mutation>,
}

/// Accumulates mutations against one row of one table.
pub struct MutationBuffer<'a, D> {
    table: &'a Table<D>,
    row_key: Vec<u8>,
    mutations: Vec<Mutation>,
    limit: usize,
}

impl<'a, D> MutationBuffer<'a, D> {
    pub(crate) fn new(table: &'a Table<D>, row_key: Vec<u8>, limit: usize) -> Self {
        Self {
            table,
            row_key,
            mutations: Vec::new(),
            limit,
        }
    }

    pub fn row_key(&self) -> &[u8] {
        &self.row_key
    }

    pub fn len(&self) -> usize {
        self.mutations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

    pub fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Buffers a cell write. Values are raw bytes; callers encoding text
    /// choose the encoding themselves.
    pub fn set_cell(
        &mut self,
        family: impl Into<String>,
        qualifier: impl Into<Qualifier>,
        value: Vec<u8>,
        timestamp: Timestamp,
    ) {
        self.mutations.push(Mutation::SetCell {
            family: family.into(),
            qualifier: qualifier.into().into_bytes(),
            value,
            timestamp,
        });
    }

    /// Buffers deletion of every cell in one column, optionally bounded to a
    /// time window.
    pub fn delete_column(
        &mut self,
        family: impl Into<String>,
        qualifier: impl Into<Qualifier>,
        time_range: Option<TimestampRange>,
    ) {
        self.mutations.push(Mutation::DeleteColumn {
            family: family.into(),
            qualifier: qualifier.into().into_bytes(),
            time_range,
        });
    }

    /// Buffers deletion of every cell in one column family.
    pub fn delete_family(&mut self, family: impl Into<String>) {
        self.mutations.push(Mutation::DeleteFamily {
            family: family.into(),
        });
    }

    /// Buffers deletion of the entire row.
    pub fn delete_row(&mut self) {
        self.mutations.push(Mutation::DeleteRow);
    }

    /// Drops all buffered mutations without sending anything.
    pub fn clear(&mut self) {
        self.mutations.clear();
    }
}

impl<D: DataService> MutationBuffer<'_, D> {
    /// Sends every buffered mutation as one atomic request, then clears the
    /// buffer. An empty buffer commits without any request. A buffer over
    /// the mutation limit is rejected before anything is sent, and a failed
    /// request leaves the buffer untouched.
    pub fn commit(&mut self, timeout: Option<Duration>) -> Result<()> {
        if self.mutations.is_empty() {
            return Ok(());
        }
        if self.mutations.len() > self.limit {
            return Err(Error::TooManyMutations {
                count: self.mutations.len(),
                limit: self.limit,
            });
        }
        let request = MutateRowRequest {
            table_name: self.table.name().clone(),
            row_key: self.row_key.clone(),
            mutations: self.mutations.clone(),
        };
        self.table.send_mutations(request, timeout)?;
        self.mutations.clear();
        Ok(())
    }
}
