//! Provisioning of ephemeral virtual clusters for load testing.
//!
//! A batch of clusters is installed concurrently, each one going through installation, credential
//! extraction, endpoint resolution and registration. Clusters are later removed by the reaper,
//! which only relies on the naming and labeling conventions established while provisioning.

pub mod cluster;
pub mod credentials;
pub mod endpoint;
pub mod error;
pub mod installer;
pub mod k8s;
mod macros;
pub mod naming;
pub mod provisioner;
pub mod reaper;
pub mod registry;
pub mod retry;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod unit;
pub mod workers;
