//! Service traits at the transport seam.
//!
//! The client core is written against these traits rather than any concrete
//! transport. Production callers plug in their RPC stack; tests plug in the
//! mocks from [`crate::testing`]. Every call carries an explicit timeout so
//! the transport never has to guess a deadline.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::chunk::ReadRowsMessage;
use crate::cluster::{ClusterRecord, CreateClusterRequest, UpdateClusterRequest};
use crate::error::Result;
use crate::mutation::MutateRowRequest;
use crate::operation::OperationStatus;
use crate::table::ReadRowsRequest;

/// Row data plane: streaming reads and atomic single-row writes.
pub trait DataService {
    /// The message stream a read produces. Errors surfaced mid-iteration
    /// model transport failures after the call was accepted.
    type Messages: Iterator<Item = Result<ReadRowsMessage>>;

    fn read_rows(&self, request: ReadRowsRequest, timeout: Duration) -> Result<Self::Messages>;

    fn mutate_row(&self, request: MutateRowRequest, timeout: Duration) -> Result<()>;
}

/// Cluster admin plane. Mutating calls return either the updated record or
/// the long-running operation the server started for the change.
pub trait ClusterService {
    fn get_cluster(&self, name: &str, timeout: Duration) -> Result<ClusterRecord>;

    fn create_cluster(
        &self,
        request: &CreateClusterRequest,
        timeout: Duration,
    ) -> Result<ClusterRecord>;

    fn update_cluster(
        &self,
        request: &UpdateClusterRequest,
        timeout: Duration,
    ) -> Result<ClusterRecord>;

    fn delete_cluster(&self, name: &str, timeout: Duration) -> Result<()>;

    fn undelete_cluster(&self, name: &str, timeout: Duration) -> Result<OperationStatus>;

    /// Fully qualified table names owned by the cluster.
    fn list_tables(&self, cluster_name: &str, timeout: Duration) -> Result<Vec<String>>;
}

/// Long-running operation status lookups.
pub trait OperationsService {
    fn get_operation(&self, name: &str, timeout: Duration) -> Result<OperationStatus>;
}

/// Injection point for the delay between operation polls.
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

/// Blocks the calling thread. The default sleeper outside of tests.
#[derive(Clone, Copy, Debug, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

impl<T: DataService> DataService for Arc<T> {
    type Messages = T::Messages;

    fn read_rows(&self, request: ReadRowsRequest, timeout: Duration) -> Result<Self::Messages> {
        (**self).read_rows(request, timeout)
    }

    fn mutate_row(&self, request: MutateRowRequest, timeout: Duration) -> Result<()> {
        (**self).mutate_row(request, timeout)
    }
}

impl<T: ClusterService> ClusterService for Arc<T> {
    fn get_cluster(&self, name: &str, timeout: Duration) -> Result<ClusterRecord> {
        (**self).get_cluster(name, timeout)
    }

    fn create_cluster(
        &self,
        request: &CreateClusterRequest,
        timeout: Duration,
    ) -> Result<ClusterRecord> {
        (**self).create_cluster(request, timeout)
    }

    fn update_cluster(
        &self,
        request: &UpdateClusterRequest,
        timeout: Duration,
    ) -> Result<ClusterRecord> {
        (**self).update_cluster(request, timeout)
    }

    fn delete_cluster(&self, name: &str, timeout: Duration) -> Result<()> {
        (**self).delete_cluster(name, timeout)
    }

    fn undelete_cluster(&self, name: &str, timeout: Duration) -> Result<OperationStatus> {
        (**self).undelete_cluster(name, timeout)
    }

    fn list_tables(&self, cluster_name: &str, timeout: Duration) -> Result<Vec<String>> {
        (**self).list_tables(cluster_name, timeout)
    }
}

impl<T: OperationsService> OperationsService for Arc<T> {
    fn get_operation(&self, name: &str, timeout: Duration) -> Result<OperationStatus> {
        (**self).get_operation(name, timeout)
    }
}

impl<T: Sleeper> Sleeper for Arc<T> {
    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration);
    }
}
