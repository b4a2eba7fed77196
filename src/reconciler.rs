// Third Party
use k8s_openapi::api::core::v1::Namespace;
use kube::ResourceExt;
use tracing::{debug, error, info};

// Local
use crate::{
    channel::EventReceiver,
    client::PolicyClient,
    error::{is_already_exists, Error},
    policy::default_network_policy,
};

/// Successful results of reconciling one namespace.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Created,
    /// The policy was already there, e.g. because the namespace was seen again after a restart.
    AlreadyExists,
}

/// Consumes added namespaces one at a time and gives each its default NetworkPolicy.
pub struct Reconciler<P> {
    policies: P,
}

impl<P: PolicyClient> Reconciler<P> {
    pub fn new(policies: P) -> Self {
        Self { policies }
    }

    /// Create the default NetworkPolicy in `namespace`.
    pub async fn reconcile(&self, namespace: &Namespace) -> Result<Outcome, Error> {
        let name = namespace.name_any();
        info!("Creating default network policy in namespace {}", name);
        let policy = default_network_policy(&name);
        match self.policies.create(&name, &policy).await {
            Ok(()) => Ok(Outcome::Created),
            // 409 Conflict
            Err(error) if is_already_exists(&error) => Ok(Outcome::AlreadyExists),
            Err(source) => Err(Error::CreatePolicy {
                namespace: name,
                source,
            }),
        }
    }

    /// Reconcile every namespace the watcher forwards, in order, until the channel closes.
    /// Failures are logged and dropped; a namespace is never retried.
    pub async fn run(&self, mut events: EventReceiver) {
        while let Some(namespace) = events.recv().await {
            match self.reconcile(&namespace).await {
                Ok(Outcome::Created) => {
                    debug!("Created default network policy in {}", namespace.name_any());
                }
                Ok(Outcome::AlreadyExists) => {
                    debug!(
                        "Default network policy already exists in {}",
                        namespace.name_any()
                    );
                }
                Err(e) => error!("{}", e),
            }
        }
        debug!("Event channel closed, reconciler stopping");
    }
}
