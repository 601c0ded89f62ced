//! Synchronous client protocol layer for a replicated wide-column store.
//!
//! Covers the store's three stateful client concerns: folding streamed read
//! chunks into whole rows, buffering row mutations for one atomic commit,
//! and polling long-running admin operations to completion. Transports plug
//! in behind the traits in [`service`]; [`testing`] ships scripted doubles
//! for all of them.

pub mod chunk;
pub mod cluster;
pub mod config;
pub mod encoding;
pub mod error;
pub mod mutation;
pub mod names;
pub mod operation;
pub mod protocol;
pub mod row;
pub mod service;
pub mod stream;
pub mod table;
pub mod testing;

pub use crate::chunk::{Chunk, ColumnCells, FamilyCells, ReadRowsMessage, WireCell, WireChunk};
pub use crate::cluster::{Cluster, ClusterRecord, CreateClusterRequest, UpdateClusterRequest};
pub use crate::config::{ClientConfig, PollPolicy};
pub use crate::encoding::{decode_payload, encode_payload};
pub use crate::error::{Error, Result};
pub use crate::mutation::{
    MutateRowRequest, Mutation, MutationBuffer, Qualifier, Timestamp, TimestampRange,
};
pub use crate::names::{operation_path, parse_operation_name, ClusterName, TableName};
pub use crate::operation::{
    CreateClusterMetadata, Operation, OperationKind, OperationPayload, OperationStatus,
    OperationTracker, PayloadDecoder, PayloadRegistry, TypedPayload, UndeleteClusterMetadata,
    UpdateClusterMetadata, WireTimestamp,
};
pub use crate::row::{Cell, Row};
pub use crate::service::{ClusterService, DataService, OperationsService, Sleeper, ThreadSleeper};
pub use crate::stream::{RowAccumulator, RowStream};
pub use crate::table::{ReadOptions, ReadRowsRequest, ReadTarget, RowRange, Table};
