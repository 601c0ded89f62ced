//! Validated resource names.
//!
//! The server addresses every resource by a structured path. Names are
//! validated at construction so the rest of the client can treat them as
//! well-formed; any deviation is a [`Error::ContractViolation`].

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Error, Result};

static CLUSTER_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^projects/(?P<project>[^/]+)/zones/(?P<zone>[^/]+)/clusters/(?P<cluster>[a-z][-a-z0-9]*)$")
        .expect("cluster name pattern")
});

static OPERATION_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^operations/projects/(?P<project>[^/]+)/zones/(?P<zone>[^/]+)/clusters/(?P<cluster>[a-z][-a-z0-9]*)/operations/(?P<id>\d+)$",
    )
    .expect("operation name pattern")
});

static CLUSTER_ID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z][-a-z0-9]*$").expect("cluster id pattern")
});

fn valid_segment(segment: &str) -> bool {
    !segment.is_empty() && !segment.contains('/')
}

/// Identity of one cluster: `projects/{p}/zones/{z}/clusters/{c}`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ClusterName {
    project: String,
    zone: String,
    cluster_id: String,
}

impl ClusterName {
    pub fn new(
        project: impl Into<String>,
        zone: impl Into<String>,
        cluster_id: impl Into<String>,
    ) -> Result<Self> {
        let project = project.into();
        let zone = zone.into();
        let cluster_id = cluster_id.into();
        if !valid_segment(&project) {
            return Err(Error::ContractViolation(format!(
                "invalid project id {project:?}"
            )));
        }
        if !valid_segment(&zone) {
            return Err(Error::ContractViolation(format!("invalid zone {zone:?}")));
        }
        if !CLUSTER_ID_RE.is_match(&cluster_id) {
            return Err(Error::ContractViolation(format!(
                "invalid cluster id {cluster_id:?}: expected lowercase letters, digits, and hyphens, starting with a letter"
            )));
        }
        Ok(Self {
            project,
            zone,
            cluster_id,
        })
    }

    /// Parses the canonical `projects/{p}/zones/{z}/clusters/{c}` form.
    pub fn parse(name: &str) -> Result<Self> {
        let caps = CLUSTER_NAME_RE.captures(name).ok_or_else(|| {
            Error::ContractViolation(format!(
                "cluster name {name:?} is not in the expected format"
            ))
        })?;
        Ok(Self {
            project: caps["project"].to_string(),
            zone: caps["zone"].to_string(),
            cluster_id: caps["cluster"].to_string(),
        })
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn zone(&self) -> &str {
        &self.zone
    }

    pub fn cluster_id(&self) -> &str {
        &self.cluster_id
    }

    /// The owning zone path, `projects/{p}/zones/{z}`, used when creating a
    /// cluster inside the zone.
    pub fn zone_path(&self) -> String {
        format!("projects/{}/zones/{}", self.project, self.zone)
    }

    /// Names a table owned by this cluster.
    pub fn table(&self, table_id: impl Into<String>) -> Result<TableName> {
        TableName::new(self.clone(), table_id)
    }
}

impl fmt::Display for ClusterName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "projects/{}/zones/{}/clusters/{}",
            self.project, self.zone, self.cluster_id
        )
    }
}

/// Identity of one table: `{cluster name}/tables/{t}`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TableName {
    cluster: ClusterName,
    table_id: String,
}

impl TableName {
    pub fn new(cluster: ClusterName, table_id: impl Into<String>) -> Result<Self> {
        let table_id = table_id.into();
        if !valid_segment(&table_id) {
            return Err(Error::ContractViolation(format!(
                "invalid table id {table_id:?}"
            )));
        }
        Ok(Self { cluster, table_id })
    }

    pub fn parse(name: &str) -> Result<Self> {
        let (cluster_part, table_id) = name.split_once("/tables/").ok_or_else(|| {
            Error::ContractViolation(format!("table name {name:?} is not in the expected format"))
        })?;
        let cluster = ClusterName::parse(cluster_part)?;
        Self::new(cluster, table_id)
    }

    pub fn cluster(&self) -> &ClusterName {
        &self.cluster
    }

    pub fn table_id(&self) -> &str {
        &self.table_id
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/tables/{}", self.cluster, self.table_id)
    }
}

/// Renders the name of a long-running operation owned by a cluster:
/// `operations/{cluster name}/operations/{id}`.
pub fn operation_path(cluster: &ClusterName, operation_id: u64) -> String {
    format!("operations/{cluster}/operations/{operation_id}")
}

/// Extracts the numeric id from an operation name, insisting the name belongs
/// to `expected`. A wrong shape, a foreign owner, and a non-numeric id are
/// all contract violations.
pub fn parse_operation_name(name: &str, expected: &ClusterName) -> Result<u64> {
    let caps = OPERATION_NAME_RE.captures(name).ok_or_else(|| {
        Error::ContractViolation(format!(
            "operation name {name:?} is not in the expected format"
        ))
    })?;
    if &caps["project"] != expected.project()
        || &caps["zone"] != expected.zone()
        || &caps["cluster"] != expected.cluster_id()
    {
        return Err(Error::ContractViolation(format!(
            "operation name {name:?} does not belong to cluster {expected}"
        )));
    }
    caps["id"].parse().map_err(|_| {
        Error::ContractViolation(format!("operation name {name:?} has an invalid id"))
    })
}
