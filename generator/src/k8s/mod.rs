//! Kubernetes integration of the generator.
//!
//! Components depend on the [`K8sClient`] trait only. The default client,
//! [`http::HttpK8sClient`], is backed by the [`kube`] crate; tests use the scriptable client from
//! `test_utils`.

mod base;
pub mod http;

pub use base::*;
