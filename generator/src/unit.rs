use std::fmt;

use crate::naming::{random_name_segment, with_random_suffix};

/// Prefix shared by release names, control pod names and the namespaces the reaper sweeps.
pub const WORKLOAD_NAME_PREFIX: &str = "vcluster";

/// Lifecycle of a single provisioning attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitPhase {
    Installing,
    ExtractingCredentials,
    ResolvingEndpoint,
    Registering,
    Done,
    Failed,
}

impl UnitPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, UnitPhase::Done | UnitPhase::Failed)
    }
}

impl fmt::Display for UnitPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase = match self {
            UnitPhase::Installing => "installing",
            UnitPhase::ExtractingCredentials => "extracting_credentials",
            UnitPhase::ResolvingEndpoint => "resolving_endpoint",
            UnitPhase::Registering => "registering",
            UnitPhase::Done => "done",
            UnitPhase::Failed => "failed",
        };

        f.write_str(phase)
    }
}

/// One cluster being provisioned.
///
/// A unit lives for the duration of one attempt only; nothing about it is persisted locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisioningUnit {
    /// 1-based ordinal of the unit within its batch.
    pub index: usize,
    /// Namespace the cluster is installed into.
    pub namespace: String,
    /// Random segment identifying the release inside its namespace.
    pub release_suffix: String,
}

impl ProvisioningUnit {
    /// Creates a unit with a freshly generated namespace and release suffix.
    pub fn generate(index: usize, namespace_prefix: &str) -> ProvisioningUnit {
        ProvisioningUnit {
            index,
            namespace: with_random_suffix(namespace_prefix),
            release_suffix: random_name_segment(),
        }
    }

    pub fn release_name(&self) -> String {
        release_name(&self.release_suffix)
    }

    pub fn control_pod_name(&self) -> String {
        control_pod_name(&self.release_suffix)
    }
}

/// Name of the release installed for `release_suffix`.
pub fn release_name(release_suffix: &str) -> String {
    format!("{WORKLOAD_NAME_PREFIX}-{release_suffix}")
}

/// Name of the pod running the control plane of the release identified by `release_suffix`.
///
/// The release is deployed as a stateful set, so its only replica carries the `-0` ordinal.
pub fn control_pod_name(release_suffix: &str) -> String {
    format!("{WORKLOAD_NAME_PREFIX}-{release_suffix}-0")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_follow_release_template() {
        let unit = ProvisioningUnit {
            index: 1,
            namespace: "vcluster-ab12c".to_string(),
            release_suffix: "x9y8z".to_string(),
        };

        assert_eq!(unit.release_name(), "vcluster-x9y8z");
        assert_eq!(unit.control_pod_name(), "vcluster-x9y8z-0");
    }

    #[test]
    fn generated_unit_uses_namespace_prefix() {
        let unit = ProvisioningUnit::generate(3, "load-test");

        assert_eq!(unit.index, 3);
        assert!(unit.namespace.starts_with("load-test-"));
        assert_eq!(
            unit.namespace.len(),
            "load-test-".len() + crate::naming::NAME_SEGMENT_LEN
        );
        assert_eq!(unit.release_suffix.len(), crate::naming::NAME_SEGMENT_LEN);
    }

    #[test]
    fn only_done_and_failed_are_terminal() {
        assert!(UnitPhase::Done.is_terminal());
        assert!(UnitPhase::Failed.is_terminal());
        assert!(!UnitPhase::Registering.is_terminal());
    }
}
