//! Table data handle.
//!
//! A [`Table`] is the entry point for row data: streaming reads via
//! [`Table::read_rows`], single-row lookup via [`Table::read_row`], and
//! buffered writes via [`Table::row`].

use std::time::Duration;

use crate::config::ClientConfig;
use crate::error::Result;
use crate::mutation::{MutateRowRequest, MutationBuffer};
use crate::names::TableName;
use crate::row::Row;
use crate::service::DataService;
use crate::stream::RowStream;

/// Contiguous key range, start inclusive and end exclusive. An empty start
/// key begins at the first row; an unset end leaves the range open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowRange {
    pub start_key: Vec<u8>,
    pub end_key: Option<Vec<u8>>,
}

impl RowRange {
    pub fn new(start_key: impl Into<Vec<u8>>, end_key: Option<Vec<u8>>) -> Self {
        Self {
            start_key: start_key.into(),
            end_key,
        }
    }
}

/// Which rows a read covers. An absent target reads the whole table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadTarget {
    Key(Vec<u8>),
    Range(RowRange),
}

/// The read request handed to the data service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadRowsRequest {
    pub table_name: TableName,
    pub target: Option<ReadTarget>,
    pub rows_limit: Option<u64>,
}

/// Caller-side read options, folded into a request by [`Table::read_rows`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadOptions {
    target: Option<ReadTarget>,
    rows_limit: Option<u64>,
}

impl ReadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_row_key(mut self, row_key: impl Into<Vec<u8>>) -> Self {
        self.target = Some(ReadTarget::Key(row_key.into()));
        self
    }

    pub fn with_range(mut self, range: RowRange) -> Self {
        self.target = Some(ReadTarget::Range(range));
        self
    }

    pub fn with_rows_limit(mut self, rows_limit: u64) -> Self {
        self.rows_limit = Some(rows_limit);
        self
    }
}

/// Client-side handle for one table.
pub struct Table<D> {
    name: TableName,
    data: D,
    config: ClientConfig,
}

impl<D> Table<D> {
    pub fn new(name: TableName, data: D) -> Self {
        Self::with_config(name, data, ClientConfig::default())
    }

    pub fn with_config(name: TableName, data: D, config: ClientConfig) -> Self {
        Self { name, data, config }
    }

    pub fn name(&self) -> &TableName {
        &self.name
    }

    /// Opens a mutation buffer for one row. Nothing is sent until the
    /// buffer's commit.
    pub fn row(&self, row_key: impl Into<Vec<u8>>) -> MutationBuffer<'_, D> {
        MutationBuffer::new(self, row_key.into(), self.config.mutation_limit)
    }

    fn resolve_timeout(&self, timeout: Option<Duration>) -> Duration {
        timeout.unwrap_or(self.config.request_timeout)
    }
}

impl<D: DataService> Table<D> {
    /// Starts a streaming read and returns the lazy row iterator over it.
    /// Messages are pulled from the transport only as rows are consumed.
    pub fn read_rows(
        &self,
        options: ReadOptions,
        timeout: Option<Duration>,
    ) -> Result<RowStream<D::Messages>> {
        let request = ReadRowsRequest {
            table_name: self.name.clone(),
            target: options.target,
            rows_limit: options.rows_limit,
        };
        let messages = self.data.read_rows(request, self.resolve_timeout(timeout))?;
        Ok(RowStream::new(messages))
    }

    /// Reads one row by key. `None` means the row does not exist.
    pub fn read_row(
        &self,
        row_key: impl Into<Vec<u8>>,
        timeout: Option<Duration>,
    ) -> Result<Option<Row>> {
        let options = ReadOptions::new().with_row_key(row_key);
        let mut rows = self.read_rows(options, timeout)?;
        rows.next().transpose()
    }

    pub(crate) fn send_mutations(
        &self,
        request: MutateRowRequest,
        timeout: Option<Duration>,
    ) -> Result<()> {
        self.data.mutate_row(request, self.resolve_timeout(timeout))
    }
}

#[cfg(test)]
mod tests {
    use crate::chunk::{ColumnCells, FamilyCells, ReadRowsMessage, WireCell, WireChunk};
    use crate::names::ClusterName;
    use crate::protocol::DEFAULT_REQUEST_TIMEOUT;
    use crate::testing::MockDataService;

    use super::*;

    fn table_name() -> TableName {
        ClusterName::new("prj", "zone-a", "cluster-1")
            .unwrap()
            .table("events")
            .unwrap()
    }

    fn committed_row(row_key: &[u8]) -> ReadRowsMessage {
        ReadRowsMessage::new(
            row_key,
            vec![
                WireChunk::cells(FamilyCells::new(
                    "cf1",
                    vec![ColumnCells::new(
                        b"col".as_slice(),
                        vec![WireCell::new(100, b"v1".as_slice())],
                    )],
                )),
                WireChunk::commit(),
            ],
        )
    }

    #[test]
    fn read_rows_whole_table_expected_untargeted_request() {
        let data = MockDataService::default();
        data.script_read(vec![Ok(committed_row(b"row-1"))]);
        let table = Table::new(table_name(), data.clone());

        let rows: Vec<_> = table
            .read_rows(ReadOptions::new(), None)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(rows.len(), 1);

        let requests = data.read_requests();
        assert_eq!(requests.len(), 1);
        let (request, timeout) = &requests[0];
        assert_eq!(request.table_name, table_name());
        assert_eq!(request.target, None);
        assert_eq!(request.rows_limit, None);
        assert_eq!(*timeout, DEFAULT_REQUEST_TIMEOUT);
    }

    #[test]
    fn read_rows_range_and_limit_expected_in_request() {
        let data = MockDataService::default();
        data.script_read(vec![]);
        let table = Table::new(table_name(), data.clone());

        let options = ReadOptions::new()
            .with_range(RowRange::new(b"a".as_slice(), Some(b"m".to_vec())))
            .with_rows_limit(25);
        assert!(table.read_rows(options, None).unwrap().next().is_none());

        let (request, _) = &data.read_requests()[0];
        assert_eq!(
            request.target,
            Some(ReadTarget::Range(RowRange::new(
                b"a".as_slice(),
                Some(b"m".to_vec())
            )))
        );
        assert_eq!(request.rows_limit, Some(25));
    }

    #[test]
    fn read_rows_explicit_timeout_expected_forwarded() {
        let data = MockDataService::default();
        data.script_read(vec![]);
        let table = Table::new(table_name(), data.clone());

        table
            .read_rows(ReadOptions::new(), Some(Duration::from_secs(3)))
            .unwrap();
        assert_eq!(data.read_requests()[0].1, Duration::from_secs(3));
    }

    #[test]
    fn read_row_existing_key_expected_row() {
        let data = MockDataService::default();
        data.script_read(vec![Ok(committed_row(b"row-1"))]);
        let table = Table::new(table_name(), data.clone());

        let row = table.read_row(b"row-1".as_slice(), None).unwrap().unwrap();
        assert_eq!(row.row_key(), b"row-1");

        let (request, _) = &data.read_requests()[0];
        assert_eq!(request.target, Some(ReadTarget::Key(b"row-1".to_vec())));
    }

    #[test]
    fn read_row_absent_key_expected_none() {
        let data = MockDataService::default();
        data.script_read(vec![]);
        let table = Table::new(table_name(), data);

        assert!(table.read_row(b"missing".as_slice(), None).unwrap().is_none());
    }

    #[test]
    fn with_config_changes_row_buffer_limit() {
        let data = MockDataService::default();
        let config = ClientConfig::new().with_mutation_limit(2);
        let table = Table::with_config(table_name(), data.clone(), config);
        let mut row = table.row(b"row-1");
        row.delete_row();
        row.delete_row();
        row.delete_row();

        assert!(row.commit(None).is_err());
        assert_eq!(data.mutate_count(), 0);
    }
}
