//! Long-running admin operations: status shapes, typed payload decoding,
//! and the bounded polling tracker.
//!
//! Admin mutations return an operation the server completes in the
//! background. [`OperationTracker::track`] polls it with exponential backoff
//! up to a fixed attempt budget and decodes the response payload through a
//! [`PayloadRegistry`]. The registry is an explicit value handed to the
//! tracker, never process-global state.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cluster::ClusterRecord;
use crate::config::PollPolicy;
use crate::encoding::decode_payload;
use crate::error::{Error, Result};
use crate::names::{parse_operation_name, ClusterName};
use crate::protocol::{
    CLUSTER_PAYLOAD_TYPE, CREATE_CLUSTER_METADATA_TYPE, UNDELETE_CLUSTER_METADATA_TYPE,
    UPDATE_CLUSTER_METADATA_TYPE,
};
use crate::service::{OperationsService, Sleeper, ThreadSleeper};

/// A type-tagged opaque payload: a declared type id plus serialized bytes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TypedPayload {
    pub type_id: String,
    #[serde(with = "serde_bytes")]
    pub value: Vec<u8>,
}

impl TypedPayload {
    pub fn new(type_id: impl Into<String>, value: Vec<u8>) -> Self {
        Self {
            type_id: type_id.into(),
            value,
        }
    }
}

/// Wall-clock instant as carried inside operation metadata.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct WireTimestamp {
    pub seconds: i64,
    pub nanos: i32,
}

impl WireTimestamp {
    pub fn new(seconds: i64, nanos: i32) -> Self {
        Self { seconds, nanos }
    }

    pub fn as_micros(&self) -> i64 {
        self.seconds * 1_000_000 + i64::from(self.nanos) / 1_000
    }
}

/// Server-side view of one long-running operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OperationStatus {
    pub name: String,
    pub done: bool,
    #[serde(default)]
    pub metadata: Option<TypedPayload>,
    #[serde(default)]
    pub response: Option<TypedPayload>,
}

/// Which admin mutation started an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Create,
    Update,
    Undelete,
}

impl OperationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Undelete => "undelete",
        }
    }

    /// Payload type the server tags this kind's operation metadata with.
    pub fn metadata_type_id(self) -> &'static str {
        match self {
            Self::Create => CREATE_CLUSTER_METADATA_TYPE,
            Self::Update => UPDATE_CLUSTER_METADATA_TYPE,
            Self::Undelete => UNDELETE_CLUSTER_METADATA_TYPE,
        }
    }
}

/// Client-side handle for one operation, parsed and validated from the admin
/// response that started it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    id: u64,
    kind: OperationKind,
    began_at_micros: i64,
    done: bool,
}

impl Operation {
    /// Builds the handle from an admin mutation's operation status. The
    /// status name must belong to `expected`, and the metadata must be
    /// present and tagged with the type for `kind`.
    pub fn from_admin_response(
        status: &OperationStatus,
        kind: OperationKind,
        expected: &ClusterName,
        registry: &PayloadRegistry,
    ) -> Result<Self> {
        let id = parse_operation_name(&status.name, expected)?;
        let metadata = status.metadata.as_ref().ok_or_else(|| {
            Error::ContractViolation(format!(
                "operation {:?} carries no metadata",
                status.name
            ))
        })?;
        if metadata.type_id != kind.metadata_type_id() {
            return Err(Error::ContractViolation(format!(
                "operation {:?} metadata type {:?} does not match {:?} expected for {}",
                status.name,
                metadata.type_id,
                kind.metadata_type_id(),
                kind.as_str()
            )));
        }
        let began_at = match registry.decode(&metadata.type_id, &metadata.value)? {
            OperationPayload::CreateMetadata(meta) => meta.request_time,
            OperationPayload::UpdateMetadata(meta) => meta.request_time,
            OperationPayload::UndeleteMetadata(meta) => meta.request_time,
            other => {
                return Err(Error::ContractViolation(format!(
                    "operation {:?} metadata decoded to payload type {:?}",
                    status.name,
                    other.type_id()
                )));
            }
        };
        Ok(Self {
            id,
            kind,
            began_at_micros: began_at.as_micros(),
            done: status.done,
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    /// Server-reported start of the operation, in epoch microseconds.
    pub fn began_at_micros(&self) -> i64 {
        self.began_at_micros
    }

    /// Completion state as of the status this handle was built from.
    pub fn is_done(&self) -> bool {
        self.done
    }
}

/// Metadata attached to a create-cluster operation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateClusterMetadata {
    pub request_time: WireTimestamp,
}

/// Metadata attached to an update-cluster operation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpdateClusterMetadata {
    pub request_time: WireTimestamp,
}

/// Metadata attached to an undelete-cluster operation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct UndeleteClusterMetadata {
    pub request_time: WireTimestamp,
}

/// Every payload the standard registry can decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationPayload {
    Cluster(ClusterRecord),
    CreateMetadata(CreateClusterMetadata),
    UpdateMetadata(UpdateClusterMetadata),
    UndeleteMetadata(UndeleteClusterMetadata),
}

impl OperationPayload {
    pub fn type_id(&self) -> &'static str {
        match self {
            Self::Cluster(_) => CLUSTER_PAYLOAD_TYPE,
            Self::CreateMetadata(_) => CREATE_CLUSTER_METADATA_TYPE,
            Self::UpdateMetadata(_) => UPDATE_CLUSTER_METADATA_TYPE,
            Self::UndeleteMetadata(_) => UNDELETE_CLUSTER_METADATA_TYPE,
        }
    }

    pub fn into_cluster(self) -> Result<ClusterRecord> {
        match self {
            Self::Cluster(record) => Ok(record),
            other => Err(Error::ContractViolation(format!(
                "expected a cluster payload, decoded {:?}",
                other.type_id()
            ))),
        }
    }
}

/// Decodes one payload type's bytes into its concrete message.
pub type PayloadDecoder = fn(&[u8]) -> Result<OperationPayload>;

/// Type id to decoder map for operation payloads. Unknown ids are rejected
/// at lookup, never decoded best-effort.
#[derive(Debug, Clone)]
pub struct PayloadRegistry {
    decoders: BTreeMap<&'static str, PayloadDecoder>,
}

impl Default for PayloadRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl PayloadRegistry {
    pub fn empty() -> Self {
        Self {
            decoders: BTreeMap::new(),
        }
    }

    /// Registry covering every payload the cluster admin surface produces.
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry.register(CLUSTER_PAYLOAD_TYPE, |bytes| {
            Ok(OperationPayload::Cluster(decode_payload(bytes)?))
        });
        registry.register(CREATE_CLUSTER_METADATA_TYPE, |bytes| {
            Ok(OperationPayload::CreateMetadata(decode_payload(bytes)?))
        });
        registry.register(UPDATE_CLUSTER_METADATA_TYPE, |bytes| {
            Ok(OperationPayload::UpdateMetadata(decode_payload(bytes)?))
        });
        registry.register(UNDELETE_CLUSTER_METADATA_TYPE, |bytes| {
            Ok(OperationPayload::UndeleteMetadata(decode_payload(bytes)?))
        });
        registry
    }

    pub fn register(&mut self, type_id: &'static str, decoder: PayloadDecoder) {
        self.decoders.insert(type_id, decoder);
    }

    pub fn contains(&self, type_id: &str) -> bool {
        self.decoders.contains_key(type_id)
    }

    pub fn decode(&self, type_id: &str, bytes: &[u8]) -> Result<OperationPayload> {
        let decoder = self.decoders.get(type_id).ok_or_else(|| {
            Error::ContractViolation(format!("no decoder registered for payload type {type_id:?}"))
        })?;
        decoder(bytes)
    }
}

/// Polls long-running operations to completion.
pub struct OperationTracker<O, S = ThreadSleeper> {
    operations: O,
    registry: PayloadRegistry,
    policy: PollPolicy,
    sleeper: S,
}

impl<O> OperationTracker<O> {
    pub fn new(operations: O) -> Self {
        Self {
            operations,
            registry: PayloadRegistry::standard(),
            policy: PollPolicy::default(),
            sleeper: ThreadSleeper,
        }
    }
}

impl<O, S> OperationTracker<O, S> {
    pub fn with_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_registry(mut self, registry: PayloadRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_sleeper<S2: Sleeper>(self, sleeper: S2) -> OperationTracker<O, S2> {
        OperationTracker {
            operations: self.operations,
            registry: self.registry,
            policy: self.policy,
            sleeper,
        }
    }

    pub fn registry(&self) -> &PayloadRegistry {
        &self.registry
    }
}

impl<O: OperationsService, S: Sleeper> OperationTracker<O, S> {
    /// One GetOperation call with no polling or validation.
    pub fn poll_once(&self, name: &str, timeout: Duration) -> Result<OperationStatus> {
        self.operations.get_operation(name, timeout)
    }

    /// Polls `operation_name` until done, then decodes its response payload.
    ///
    /// The name is validated against `expected` before the first poll; a
    /// malformed or foreign name fails without any network call. Each
    /// unfinished poll is followed by a backoff sleep, doubling per attempt.
    /// Exhausting the attempt budget fails with
    /// [`Error::OperationTimedOut`]. A done operation must carry a response
    /// tagged `expected_response_type` and decodable by the registry.
    pub fn track(
        &self,
        operation_name: &str,
        expected: &ClusterName,
        expected_response_type: &str,
        timeout: Duration,
    ) -> Result<OperationPayload> {
        parse_operation_name(operation_name, expected)?;

        let mut finished = None;
        for attempt in 0..self.policy.max_polls {
            let status = self.operations.get_operation(operation_name, timeout)?;
            if status.done {
                finished = Some(status);
                break;
            }
            self.sleeper.sleep(self.policy.delay_for_attempt(attempt));
        }
        let Some(status) = finished else {
            return Err(Error::OperationTimedOut {
                attempts: self.policy.max_polls,
            });
        };

        let response = status.response.ok_or_else(|| {
            Error::ContractViolation(format!(
                "operation {operation_name:?} completed without a response payload"
            ))
        })?;
        if response.type_id != expected_response_type {
            return Err(Error::ContractViolation(format!(
                "operation {operation_name:?} response type {:?} does not match expected {expected_response_type:?}",
                response.type_id
            )));
        }
        self.registry.decode(&response.type_id, &response.value)
    }
}
