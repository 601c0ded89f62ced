//! Wire-contract constants shared across the client.

use std::time::Duration;

/// Default timeout applied to a request when the caller passes none.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Ceiling on mutations the server accepts in one atomic row write.
pub const MAX_MUTATIONS: usize = 100_000;

/// Maximum GetOperation attempts before tracking gives up.
pub const MAX_OPERATION_POLLS: u32 = 5;

/// Base backoff interval between operation polls; doubles per attempt.
pub const OPERATION_POLL_BASE_DELAY: Duration = Duration::from_secs(1);

/// The server stores cell timestamps at millisecond granularity.
pub const TIMESTAMP_GRANULARITY_MICROS: i64 = 1_000;

/// Sentinel timestamp meaning "let the server assign the write time".
pub const SERVER_TIME_MICROS: i64 = -1;

/// Serving nodes provisioned for a cluster unless the caller overrides.
pub const DEFAULT_SERVE_NODES: u32 = 3;

/// Payload type id of a cluster resource carried by a finished operation.
pub const CLUSTER_PAYLOAD_TYPE: &str = "tessera.admin.v1.Cluster";

/// Payload type id of create-cluster operation metadata.
pub const CREATE_CLUSTER_METADATA_TYPE: &str = "tessera.admin.v1.CreateClusterMetadata";

/// Payload type id of update-cluster operation metadata.
pub const UPDATE_CLUSTER_METADATA_TYPE: &str = "tessera.admin.v1.UpdateClusterMetadata";

/// Payload type id of undelete-cluster operation metadata.
pub const UNDELETE_CLUSTER_METADATA_TYPE: &str = "tessera.admin.v1.UndeleteClusterMetadata";
