//! Cluster admin handle.
//!
//! A [`Cluster`] wraps one cluster's admin surface: provisioning calls that
//! start long-running operations, metadata refresh, and table listing. The
//! handle remembers at most one pending operation, the one started by its
//! own last admin mutation, and resolves it via [`Cluster::operation_finished`]
//! or [`Cluster::wait_for_operation`].

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::names::{operation_path, ClusterName, TableName};
use crate::operation::{Operation, OperationKind, OperationStatus, OperationTracker};
use crate::protocol::{CLUSTER_PAYLOAD_TYPE, DEFAULT_SERVE_NODES};
use crate::service::{ClusterService, OperationsService, Sleeper, ThreadSleeper};
use crate::table::Table;

/// A cluster resource as the server reports it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClusterRecord {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub serve_nodes: Option<u32>,
    /// The operation an admin mutation started, carried on the mutation's
    /// response.
    #[serde(default)]
    pub current_operation: Option<OperationStatus>,
}

/// Provisioning request for a new cluster inside a zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateClusterRequest {
    pub zone_path: String,
    pub cluster_id: String,
    pub display_name: String,
    pub serve_nodes: u32,
}

/// Reconfiguration request for an existing cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateClusterRequest {
    pub name: String,
    pub display_name: String,
    pub serve_nodes: u32,
}

/// Client-side handle for one cluster.
pub struct Cluster<C, O, S = ThreadSleeper> {
    name: ClusterName,
    display_name: String,
    serve_nodes: u32,
    admin: C,
    tracker: OperationTracker<O, S>,
    config: ClientConfig,
    pending: Option<Operation>,
}

impl<C, O> Cluster<C, O> {
    pub fn new(name: ClusterName, admin: C, operations: O) -> Self {
        Self::with_config(name, admin, operations, ClientConfig::default())
    }

    pub fn with_config(name: ClusterName, admin: C, operations: O, config: ClientConfig) -> Self {
        let tracker = OperationTracker::new(operations).with_policy(config.poll.clone());
        Self {
            display_name: name.cluster_id().to_string(),
            serve_nodes: DEFAULT_SERVE_NODES,
            name,
            admin,
            tracker,
            config,
            pending: None,
        }
    }
}

impl<C, O, S> Cluster<C, O, S> {
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    pub fn with_serve_nodes(mut self, serve_nodes: u32) -> Self {
        self.serve_nodes = serve_nodes;
        self
    }

    pub fn with_sleeper<S2: Sleeper>(self, sleeper: S2) -> Cluster<C, O, S2> {
        Cluster {
            name: self.name,
            display_name: self.display_name,
            serve_nodes: self.serve_nodes,
            admin: self.admin,
            tracker: self.tracker.with_sleeper(sleeper),
            config: self.config,
            pending: self.pending,
        }
    }

    pub fn name(&self) -> &ClusterName {
        &self.name
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn serve_nodes(&self) -> u32 {
        self.serve_nodes
    }

    pub fn has_pending_operation(&self) -> bool {
        self.pending.is_some()
    }

    /// The operation started by this handle's last admin mutation, if still
    /// unresolved.
    pub fn pending_operation(&self) -> Option<&Operation> {
        self.pending.as_ref()
    }

    /// Builds a data handle for one of this cluster's tables, sharing this
    /// handle's configuration.
    pub fn table<D>(&self, table_id: impl Into<String>, data: D) -> Result<Table<D>> {
        Ok(Table::with_config(
            self.name.table(table_id)?,
            data,
            self.config.clone(),
        ))
    }

    fn resolve_timeout(&self, timeout: Option<Duration>) -> Duration {
        timeout.unwrap_or(self.config.request_timeout)
    }

    /// Adopts server-reported metadata. Records missing either field are a
    /// contract bug; local state stays untouched on failure.
    fn update_from_record(&mut self, record: &ClusterRecord) -> Result<()> {
        let display_name = record
            .display_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .ok_or_else(|| {
                Error::ContractViolation(format!(
                    "cluster record {:?} carries no display name",
                    record.name
                ))
            })?;
        let serve_nodes = record.serve_nodes.filter(|&nodes| nodes != 0).ok_or_else(|| {
            Error::ContractViolation(format!(
                "cluster record {:?} carries no serve node count",
                record.name
            ))
        })?;
        self.display_name = display_name.to_string();
        self.serve_nodes = serve_nodes;
        Ok(())
    }

    fn operation_from_record(
        &self,
        record: &ClusterRecord,
        kind: OperationKind,
    ) -> Result<Operation> {
        let status = record.current_operation.as_ref().ok_or_else(|| {
            Error::ContractViolation(format!(
                "cluster record {:?} carries no current operation",
                record.name
            ))
        })?;
        Operation::from_admin_response(status, kind, &self.name, self.tracker.registry())
    }
}

impl<C, O, S> Cluster<C, O, S>
where
    C: ClusterService,
    O: OperationsService,
    S: Sleeper,
{
    /// Fetches the cluster's current metadata and adopts it locally.
    pub fn reload(&mut self, timeout: Option<Duration>) -> Result<()> {
        let record = self
            .admin
            .get_cluster(&self.name.to_string(), self.resolve_timeout(timeout))?;
        self.update_from_record(&record)
    }

    /// Provisions this cluster. The server responds immediately with a
    /// record carrying the create operation, which becomes this handle's
    /// pending operation.
    pub fn create(&mut self, timeout: Option<Duration>) -> Result<()> {
        let request = CreateClusterRequest {
            zone_path: self.name.zone_path(),
            cluster_id: self.name.cluster_id().to_string(),
            display_name: self.display_name.clone(),
            serve_nodes: self.serve_nodes,
        };
        let record = self
            .admin
            .create_cluster(&request, self.resolve_timeout(timeout))?;
        self.pending = Some(self.operation_from_record(&record, OperationKind::Create)?);
        Ok(())
    }

    /// Pushes the handle's display name and serve node count to the server.
    pub fn update(&mut self, timeout: Option<Duration>) -> Result<()> {
        let request = UpdateClusterRequest {
            name: self.name.to_string(),
            display_name: self.display_name.clone(),
            serve_nodes: self.serve_nodes,
        };
        let record = self
            .admin
            .update_cluster(&request, self.resolve_timeout(timeout))?;
        self.pending = Some(self.operation_from_record(&record, OperationKind::Update)?);
        Ok(())
    }

    pub fn delete(&self, timeout: Option<Duration>) -> Result<()> {
        self.admin
            .delete_cluster(&self.name.to_string(), self.resolve_timeout(timeout))
    }

    /// Restores a recently deleted cluster. Unlike create and update, the
    /// server answers with the operation status itself.
    pub fn undelete(&mut self, timeout: Option<Duration>) -> Result<()> {
        let status = self
            .admin
            .undelete_cluster(&self.name.to_string(), self.resolve_timeout(timeout))?;
        self.pending = Some(Operation::from_admin_response(
            &status,
            OperationKind::Undelete,
            &self.name,
            self.tracker.registry(),
        )?);
        Ok(())
    }

    /// Checks the pending operation once. Returns whether it is done and
    /// forgets it once done is observed.
    pub fn operation_finished(&mut self, timeout: Option<Duration>) -> Result<bool> {
        let Some(operation) = &self.pending else {
            return Err(Error::InvalidState("no operation is pending"));
        };
        let name = operation_path(&self.name, operation.id());
        let status = self.tracker.poll_once(&name, self.resolve_timeout(timeout))?;
        if status.done {
            self.pending = None;
        }
        Ok(status.done)
    }

    /// Polls the pending operation to completion, adopts the cluster record
    /// it resolves to, and returns that record. The pending operation
    /// survives a timeout, so a caller may wait again.
    pub fn wait_for_operation(&mut self, timeout: Option<Duration>) -> Result<ClusterRecord> {
        let Some(operation) = &self.pending else {
            return Err(Error::InvalidState("no operation is pending"));
        };
        let name = operation_path(&self.name, operation.id());
        let record = self
            .tracker
            .track(
                &name,
                &self.name,
                CLUSTER_PAYLOAD_TYPE,
                self.resolve_timeout(timeout),
            )?
            .into_cluster()?;
        self.update_from_record(&record)?;
        self.pending = None;
        Ok(record)
    }

    /// Names of the tables this cluster serves, validated to belong to it.
    pub fn list_tables(&self, timeout: Option<Duration>) -> Result<Vec<TableName>> {
        let names = self
            .admin
            .list_tables(&self.name.to_string(), self.resolve_timeout(timeout))?;
        let prefix = format!("{}/tables/", self.name);
        names
            .into_iter()
            .map(|name| {
                let table_id = name.strip_prefix(&prefix).ok_or_else(|| {
                    Error::ContractViolation(format!(
                        "table name {name:?} does not belong to cluster {}",
                        self.name
                    ))
                })?;
                self.name.table(table_id)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::names::operation_path;
    use crate::operation::WireTimestamp;
    use crate::testing::{
        cluster_payload, metadata_payload, operation_status, AdminCall, MockClusterService,
        MockOperationsService, RecordingSleeper,
    };

    use super::*;

    fn cluster_name() -> ClusterName {
        ClusterName::new("prj", "zone-a", "cluster-1").unwrap()
    }

    fn handle(
        admin: MockClusterService,
        operations: MockOperationsService,
    ) -> Cluster<MockClusterService, MockOperationsService, RecordingSleeper> {
        Cluster::new(cluster_name(), admin, operations).with_sleeper(RecordingSleeper::default())
    }

    fn created_record(operation_id: u64, kind: OperationKind) -> ClusterRecord {
        let mut status =
            operation_status(&operation_path(&cluster_name(), operation_id), false, None);
        status.metadata = Some(metadata_payload(kind, WireTimestamp::new(5, 0)));
        ClusterRecord {
            name: cluster_name().to_string(),
            display_name: Some("cluster-1".to_string()),
            serve_nodes: Some(3),
            current_operation: Some(status),
        }
    }

    #[test]
    fn new_handle_expected_defaults() {
        let cluster = handle(MockClusterService::default(), MockOperationsService::default());
        assert_eq!(cluster.display_name(), "cluster-1");
        assert_eq!(cluster.serve_nodes(), 3);
        assert!(!cluster.has_pending_operation());
    }

    #[test]
    fn builders_override_defaults() {
        let cluster = handle(MockClusterService::default(), MockOperationsService::default())
            .with_display_name("primary")
            .with_serve_nodes(9);
        assert_eq!(cluster.display_name(), "primary");
        assert_eq!(cluster.serve_nodes(), 9);
    }

    #[test]
    fn create_sends_zone_scoped_request_and_records_operation() {
        let admin = MockClusterService::default();
        admin.script_create(Ok(created_record(77, OperationKind::Create)));
        let mut cluster = handle(admin.clone(), MockOperationsService::default());

        cluster.create(None).unwrap();

        let pending = cluster.pending_operation().unwrap();
        assert_eq!(pending.id(), 77);
        assert_eq!(pending.kind(), OperationKind::Create);
        assert_eq!(pending.began_at_micros(), 5_000_000);
        assert!(!pending.is_done());
        assert_eq!(
            admin.calls(),
            vec![AdminCall::CreateCluster(CreateClusterRequest {
                zone_path: "projects/prj/zones/zone-a".to_string(),
                cluster_id: "cluster-1".to_string(),
                display_name: "cluster-1".to_string(),
                serve_nodes: 3,
            })]
        );
    }

    #[test]
    fn create_response_without_operation_expected_contract_violation() {
        let admin = MockClusterService::default();
        admin.script_create(Ok(ClusterRecord {
            name: cluster_name().to_string(),
            display_name: None,
            serve_nodes: None,
            current_operation: None,
        }));
        let mut cluster = handle(admin, MockOperationsService::default());

        let err = cluster.create(None).unwrap_err();
        assert!(matches!(err, Error::ContractViolation(_)));
        assert!(!cluster.has_pending_operation());
    }

    #[test]
    fn update_sends_current_fields_and_records_operation() {
        let admin = MockClusterService::default();
        admin.script_update(Ok(created_record(78, OperationKind::Update)));
        let mut cluster = handle(admin.clone(), MockOperationsService::default())
            .with_display_name("renamed")
            .with_serve_nodes(5);

        cluster.update(None).unwrap();

        assert!(cluster.has_pending_operation());
        assert_eq!(
            admin.calls(),
            vec![AdminCall::UpdateCluster(UpdateClusterRequest {
                name: cluster_name().to_string(),
                display_name: "renamed".to_string(),
                serve_nodes: 5,
            })]
        );
    }

    #[test]
    fn undelete_records_operation_from_direct_status() {
        let admin = MockClusterService::default();
        let mut status = operation_status(&operation_path(&cluster_name(), 79), false, None);
        status.metadata = Some(metadata_payload(
            OperationKind::Undelete,
            WireTimestamp::new(5, 0),
        ));
        admin.script_undelete(Ok(status));
        let mut cluster = handle(admin.clone(), MockOperationsService::default());

        cluster.undelete(None).unwrap();

        assert!(cluster.has_pending_operation());
        assert_eq!(
            admin.calls(),
            vec![AdminCall::UndeleteCluster {
                name: cluster_name().to_string(),
            }]
        );
    }

    #[test]
    fn delete_forwards_cluster_name() {
        let admin = MockClusterService::default();
        admin.script_delete(Ok(()));
        let cluster = handle(admin.clone(), MockOperationsService::default());

        cluster.delete(None).unwrap();
        assert_eq!(
            admin.calls(),
            vec![AdminCall::DeleteCluster {
                name: cluster_name().to_string(),
            }]
        );
    }

    #[test]
    fn reload_adopts_server_metadata() {
        let admin = MockClusterService::default();
        admin.script_get(Ok(ClusterRecord {
            name: cluster_name().to_string(),
            display_name: Some("live name".to_string()),
            serve_nodes: Some(7),
            current_operation: None,
        }));
        let mut cluster = handle(admin, MockOperationsService::default());

        cluster.reload(None).unwrap();
        assert_eq!(cluster.display_name(), "live name");
        assert_eq!(cluster.serve_nodes(), 7);
    }

    #[test]
    fn reload_incomplete_record_expected_contract_violation() {
        let admin = MockClusterService::default();
        admin.script_get(Ok(ClusterRecord {
            name: cluster_name().to_string(),
            display_name: Some(String::new()),
            serve_nodes: Some(7),
            current_operation: None,
        }));
        admin.script_get(Ok(ClusterRecord {
            name: cluster_name().to_string(),
            display_name: Some("live name".to_string()),
            serve_nodes: Some(0),
            current_operation: None,
        }));
        let mut cluster = handle(admin, MockOperationsService::default());

        assert!(matches!(
            cluster.reload(None),
            Err(Error::ContractViolation(_))
        ));
        assert!(matches!(
            cluster.reload(None),
            Err(Error::ContractViolation(_))
        ));
        assert_eq!(cluster.display_name(), "cluster-1");
        assert_eq!(cluster.serve_nodes(), 3);
    }

    #[test]
    fn operation_finished_without_pending_expected_invalid_state() {
        let mut cluster = handle(MockClusterService::default(), MockOperationsService::default());
        let err = cluster.operation_finished(None).unwrap_err();
        assert!(matches!(err, Error::InvalidState("no operation is pending")));
    }

    #[test]
    fn operation_finished_clears_pending_only_once_done() {
        let admin = MockClusterService::default();
        admin.script_create(Ok(created_record(77, OperationKind::Create)));
        let operations = MockOperationsService::default();
        let name = operation_path(&cluster_name(), 77);
        operations.script(Ok(operation_status(&name, false, None)));
        operations.script(Ok(operation_status(&name, true, None)));
        let mut cluster = handle(admin, operations.clone());
        cluster.create(None).unwrap();

        assert!(!cluster.operation_finished(None).unwrap());
        assert!(cluster.has_pending_operation());
        assert!(cluster.operation_finished(None).unwrap());
        assert!(!cluster.has_pending_operation());

        let calls = operations.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].0, name);
    }

    #[test]
    fn wait_for_operation_adopts_resolved_record() {
        let admin = MockClusterService::default();
        admin.script_create(Ok(created_record(77, OperationKind::Create)));
        let operations = MockOperationsService::default();
        let name = operation_path(&cluster_name(), 77);
        let resolved = ClusterRecord {
            name: cluster_name().to_string(),
            display_name: Some("provisioned".to_string()),
            serve_nodes: Some(11),
            current_operation: None,
        };
        operations.script(Ok(operation_status(&name, false, None)));
        operations.script(Ok(operation_status(
            &name,
            true,
            Some(cluster_payload(&resolved)),
        )));
        let mut cluster = handle(admin, operations);
        cluster.create(None).unwrap();

        let record = cluster.wait_for_operation(None).unwrap();
        assert_eq!(record, resolved);
        assert_eq!(cluster.display_name(), "provisioned");
        assert_eq!(cluster.serve_nodes(), 11);
        assert!(!cluster.has_pending_operation());
    }

    #[test]
    fn wait_for_operation_timeout_keeps_pending() {
        let admin = MockClusterService::default();
        admin.script_create(Ok(created_record(77, OperationKind::Create)));
        let operations = MockOperationsService::default();
        let name = operation_path(&cluster_name(), 77);
        for _ in 0..5 {
            operations.script(Ok(operation_status(&name, false, None)));
        }
        let mut cluster = handle(admin, operations);
        cluster.create(None).unwrap();

        let err = cluster.wait_for_operation(None).unwrap_err();
        assert!(matches!(err, Error::OperationTimedOut { attempts: 5 }));
        assert!(cluster.has_pending_operation());
    }

    #[test]
    fn list_tables_strips_cluster_prefix() {
        let admin = MockClusterService::default();
        let prefix = cluster_name().to_string();
        admin.script_list_tables(Ok(vec![
            format!("{prefix}/tables/events"),
            format!("{prefix}/tables/audit"),
        ]));
        let cluster = handle(admin, MockOperationsService::default());

        let tables = cluster.list_tables(None).unwrap();
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].table_id(), "events");
        assert_eq!(tables[1].table_id(), "audit");
        assert_eq!(tables[0].cluster(), cluster.name());
    }

    #[test]
    fn list_tables_foreign_name_expected_contract_violation() {
        let admin = MockClusterService::default();
        admin.script_list_tables(Ok(vec![
            "projects/prj/zones/zone-a/clusters/other/tables/events".to_string(),
        ]));
        let cluster = handle(admin, MockOperationsService::default());

        let err = cluster.list_tables(None).unwrap_err();
        assert!(matches!(err, Error::ContractViolation(_)));
    }
}
