// Third Party
use k8s_openapi::{
    api::networking::v1::{
        NetworkPolicy, NetworkPolicyIngressRule, NetworkPolicyPeer, NetworkPolicySpec,
    },
    apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta},
};

// Local
use crate::utils::DEFAULT_POLICY_NAME;

/// Build the policy every new namespace receives: all pods in `namespace` accept ingress only
/// from pods in the same namespace. Egress is left alone.
pub fn default_network_policy(namespace: &str) -> NetworkPolicy {
    NetworkPolicy {
        metadata: ObjectMeta {
            name: Some(DEFAULT_POLICY_NAME.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        spec: Some(NetworkPolicySpec {
            // An empty selector matches every pod in the namespace.
            pod_selector: Default::default(),
            ingress: Some(vec![NetworkPolicyIngressRule {
                from: Some(vec![NetworkPolicyPeer {
                    pod_selector: Some(LabelSelector::default()),
                    ..Default::default()
                }]),
                ..Default::default()
            }]),
            policy_types: Some(vec!["Ingress".to_string()]),
            ..Default::default()
        }),
        ..Default::default()
    }
}
