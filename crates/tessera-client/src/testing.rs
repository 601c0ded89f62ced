//! Scripted in-memory service doubles.
//!
//! Each mock implements its service trait over shared interior state:
//! responses are scripted ahead of time and every call is recorded for
//! later assertions. Clones share the same state, so a test can hold one
//! handle while the client under test holds another.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::chunk::ReadRowsMessage;
use crate::cluster::{ClusterRecord, CreateClusterRequest, UpdateClusterRequest};
use crate::encoding::encode_payload;
use crate::error::{Error, Result};
use crate::mutation::MutateRowRequest;
use crate::operation::{
    CreateClusterMetadata, OperationKind, OperationStatus, TypedPayload, UndeleteClusterMetadata,
    UpdateClusterMetadata, WireTimestamp,
};
use crate::protocol::CLUSTER_PAYLOAD_TYPE;
use crate::service::{ClusterService, DataService, OperationsService, Sleeper};
use crate::table::ReadRowsRequest;

/// Data plane double. Reads are scripted per call; mutations succeed unless
/// a failure is queued.
#[derive(Clone, Default)]
pub struct MockDataService {
    inner: Arc<Mutex<DataState>>,
}

#[derive(Default)]
struct DataState {
    read_scripts: VecDeque<Vec<Result<ReadRowsMessage>>>,
    read_requests: Vec<(ReadRowsRequest, Duration)>,
    mutate_requests: Vec<(MutateRowRequest, Duration)>,
    mutate_failure: Option<Error>,
}

impl MockDataService {
    fn lock(&self) -> Result<MutexGuard<'_, DataState>> {
        self.inner
            .lock()
            .map_err(|_| Error::Transport("mock state mutex poisoned".to_string()))
    }

    /// Queues the message sequence the next read call streams back.
    pub fn script_read(&self, messages: Vec<Result<ReadRowsMessage>>) {
        self.inner.lock().unwrap().read_scripts.push_back(messages);
    }

    /// Makes the next mutate call fail with `error` after being recorded.
    pub fn fail_next_mutate(&self, error: Error) {
        self.inner.lock().unwrap().mutate_failure = Some(error);
    }

    pub fn read_requests(&self) -> Vec<(ReadRowsRequest, Duration)> {
        self.inner.lock().unwrap().read_requests.clone()
    }

    pub fn mutate_requests(&self) -> Vec<(MutateRowRequest, Duration)> {
        self.inner.lock().unwrap().mutate_requests.clone()
    }

    pub fn mutate_count(&self) -> usize {
        self.inner.lock().unwrap().mutate_requests.len()
    }
}

impl DataService for MockDataService {
    type Messages = std::vec::IntoIter<Result<ReadRowsMessage>>;

    fn read_rows(&self, request: ReadRowsRequest, timeout: Duration) -> Result<Self::Messages> {
        let mut state = self.lock()?;
        state.read_requests.push((request, timeout));
        let script = state
            .read_scripts
            .pop_front()
            .ok_or_else(|| Error::Transport("no scripted read response".to_string()))?;
        Ok(script.into_iter())
    }

    fn mutate_row(&self, request: MutateRowRequest, timeout: Duration) -> Result<()> {
        let mut state = self.lock()?;
        state.mutate_requests.push((request, timeout));
        match state.mutate_failure.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// One recorded admin plane call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminCall {
    GetCluster { name: String },
    CreateCluster(CreateClusterRequest),
    UpdateCluster(UpdateClusterRequest),
    DeleteCluster { name: String },
    UndeleteCluster { name: String },
    ListTables { cluster_name: String },
}

/// Admin plane double with a scripted response queue per method.
#[derive(Clone, Default)]
pub struct MockClusterService {
    inner: Arc<Mutex<ClusterState>>,
}

#[derive(Default)]
struct ClusterState {
    get_responses: VecDeque<Result<ClusterRecord>>,
    create_responses: VecDeque<Result<ClusterRecord>>,
    update_responses: VecDeque<Result<ClusterRecord>>,
    delete_responses: VecDeque<Result<()>>,
    undelete_responses: VecDeque<Result<OperationStatus>>,
    list_tables_responses: VecDeque<Result<Vec<String>>>,
    calls: Vec<AdminCall>,
}

impl MockClusterService {
    fn lock(&self) -> Result<MutexGuard<'_, ClusterState>> {
        self.inner
            .lock()
            .map_err(|_| Error::Transport("mock state mutex poisoned".to_string()))
    }

    pub fn script_get(&self, response: Result<ClusterRecord>) {
        self.inner.lock().unwrap().get_responses.push_back(response);
    }

    pub fn script_create(&self, response: Result<ClusterRecord>) {
        self.inner
            .lock()
            .unwrap()
            .create_responses
            .push_back(response);
    }

    pub fn script_update(&self, response: Result<ClusterRecord>) {
        self.inner
            .lock()
            .unwrap()
            .update_responses
            .push_back(response);
    }

    pub fn script_delete(&self, response: Result<()>) {
        self.inner
            .lock()
            .unwrap()
            .delete_responses
            .push_back(response);
    }

    pub fn script_undelete(&self, response: Result<OperationStatus>) {
        self.inner
            .lock()
            .unwrap()
            .undelete_responses
            .push_back(response);
    }

    pub fn script_list_tables(&self, response: Result<Vec<String>>) {
        self.inner
            .lock()
            .unwrap()
            .list_tables_responses
            .push_back(response);
    }

    pub fn calls(&self) -> Vec<AdminCall> {
        self.inner.lock().unwrap().calls.clone()
    }
}

impl ClusterService for MockClusterService {
    fn get_cluster(&self, name: &str, _timeout: Duration) -> Result<ClusterRecord> {
        let mut state = self.lock()?;
        state.calls.push(AdminCall::GetCluster {
            name: name.to_string(),
        });
        state
            .get_responses
            .pop_front()
            .ok_or_else(|| Error::Transport("no scripted get cluster response".to_string()))?
    }

    fn create_cluster(
        &self,
        request: &CreateClusterRequest,
        _timeout: Duration,
    ) -> Result<ClusterRecord> {
        let mut state = self.lock()?;
        state.calls.push(AdminCall::CreateCluster(request.clone()));
        state
            .create_responses
            .pop_front()
            .ok_or_else(|| Error::Transport("no scripted create cluster response".to_string()))?
    }

    fn update_cluster(
        &self,
        request: &UpdateClusterRequest,
        _timeout: Duration,
    ) -> Result<ClusterRecord> {
        let mut state = self.lock()?;
        state.calls.push(AdminCall::UpdateCluster(request.clone()));
        state
            .update_responses
            .pop_front()
            .ok_or_else(|| Error::Transport("no scripted update cluster response".to_string()))?
    }

    fn delete_cluster(&self, name: &str, _timeout: Duration) -> Result<()> {
        let mut state = self.lock()?;
        state.calls.push(AdminCall::DeleteCluster {
            name: name.to_string(),
        });
        state
            .delete_responses
            .pop_front()
            .ok_or_else(|| Error::Transport("no scripted delete cluster response".to_string()))?
    }

    fn undelete_cluster(&self, name: &str, _timeout: Duration) -> Result<OperationStatus> {
        let mut state = self.lock()?;
        state.calls.push(AdminCall::UndeleteCluster {
            name: name.to_string(),
        });
        state
            .undelete_responses
            .pop_front()
            .ok_or_else(|| Error::Transport("no scripted undelete cluster response".to_string()))?
    }

    fn list_tables(&self, cluster_name: &str, _timeout: Duration) -> Result<Vec<String>> {
        let mut state = self.lock()?;
        state.calls.push(AdminCall::ListTables {
            cluster_name: cluster_name.to_string(),
        });
        state
            .list_tables_responses
            .pop_front()
            .ok_or_else(|| Error::Transport("no scripted list tables response".to_string()))?
    }
}

/// Operations plane double: one scripted status per poll.
#[derive(Clone, Default)]
pub struct MockOperationsService {
    inner: Arc<Mutex<OperationsState>>,
}

#[derive(Default)]
struct OperationsState {
    responses: VecDeque<Result<OperationStatus>>,
    calls: Vec<(String, Duration)>,
}

impl MockOperationsService {
    fn lock(&self) -> Result<MutexGuard<'_, OperationsState>> {
        self.inner
            .lock()
            .map_err(|_| Error::Transport("mock state mutex poisoned".to_string()))
    }

    pub fn script(&self, response: Result<OperationStatus>) {
        self.inner.lock().unwrap().responses.push_back(response);
    }

    pub fn calls(&self) -> Vec<(String, Duration)> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.inner.lock().unwrap().calls.len()
    }
}

impl OperationsService for MockOperationsService {
    fn get_operation(&self, name: &str, timeout: Duration) -> Result<OperationStatus> {
        let mut state = self.lock()?;
        state.calls.push((name.to_string(), timeout));
        state
            .responses
            .pop_front()
            .ok_or_else(|| Error::Transport("no scripted operation response".to_string()))?
    }
}

/// Records requested delays instead of sleeping.
#[derive(Clone, Default)]
pub struct RecordingSleeper {
    delays: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().unwrap().clone()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.delays.lock().unwrap().push(duration);
    }
}

/// Builds an operation status with no metadata attached.
pub fn operation_status(name: &str, done: bool, response: Option<TypedPayload>) -> OperationStatus {
    OperationStatus {
        name: name.to_string(),
        done,
        metadata: None,
        response,
    }
}

/// Encodes `record` as the payload a finished cluster operation resolves to.
pub fn cluster_payload(record: &ClusterRecord) -> TypedPayload {
    TypedPayload::new(
        CLUSTER_PAYLOAD_TYPE,
        encode_payload(record).expect("cluster record encodes"),
    )
}

/// Encodes operation metadata of `kind` carrying `request_time`.
pub fn metadata_payload(kind: OperationKind, request_time: WireTimestamp) -> TypedPayload {
    let value = match kind {
        OperationKind::Create => encode_payload(&CreateClusterMetadata { request_time }),
        OperationKind::Update => encode_payload(&UpdateClusterMetadata { request_time }),
        OperationKind::Undelete => encode_payload(&UndeleteClusterMetadata { request_time }),
    }
    .expect("metadata encodes");
    TypedPayload::new(kind.metadata_type_id(), value)
}
