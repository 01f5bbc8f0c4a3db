//! In-memory doubles of the external collaborators of the generator.
//!
//! Every double records the calls it receives and can be scripted to fail, so tests can assert on
//! the provisioning and cleanup policies without a cluster.

pub mod access_config;
pub mod gauge;
pub mod installer;
pub mod k8s;
pub mod registry;
