//! The two cluster capabilities the controller depends on, and their kube-backed implementation.

// System
use std::time::Duration;

// Third Party
use async_trait::async_trait;
use futures::{stream::BoxStream, StreamExt};
use k8s_openapi::api::{core::v1::Namespace, networking::v1::NetworkPolicy};
use kube::{
    api::{Api, ApiResource, DynamicObject, ListParams, PostParams, WatchEvent, WatchParams},
    Client,
};

// Local
use crate::utils::generate_error_response;

/// An event as delivered by a namespace watch.
pub type ResourceEvent = WatchEvent<Payload>;

/// Stream of events for one watch attempt. It ends when the server-side timeout elapses.
pub type EventStream = BoxStream<'static, Result<ResourceEvent, kube::Error>>;

/// The object carried by an added, modified or deleted event.
#[derive(Clone, Debug)]
pub enum Payload {
    /// A namespace with both a name and a resource version.
    Namespace(Namespace),
    /// Anything else the server sent, described by its kind.
    Unexpected { kind: String },
}

impl Payload {
    /// Interpret an untyped watch object. Objects that are not well-formed namespaces become
    /// `Payload::Unexpected` instead of failing the stream.
    pub fn from_object(object: DynamicObject) -> Self {
        let kind = object
            .types
            .as_ref()
            .map(|types| format!("{}/{}", types.api_version, types.kind))
            .unwrap_or_else(|| "<unknown>".to_string());
        if !object.types.as_ref().is_some_and(|t| t.kind == "Namespace") {
            return Payload::Unexpected { kind };
        }
        let namespace = serde_json::to_value(object)
            .and_then(serde_json::from_value::<Namespace>);
        match namespace {
            Ok(ns) if ns.metadata.name.is_some() && ns.metadata.resource_version.is_some() => {
                Payload::Namespace(ns)
            }
            _ => Payload::Unexpected { kind },
        }
    }
}

/// Result of listing every namespace in the cluster.
#[derive(Clone, Debug, Default)]
pub struct Listing {
    /// Namespaces that already exist. They are not reconciled; only namespaces added after the
    /// listing get the default policy.
    pub namespaces: Vec<Namespace>,
    /// Collection resource version the next watch resumes from.
    pub position: String,
}

/// List/watch access to the namespace collection.
#[async_trait]
pub trait NamespaceSource: Send + Sync {
    async fn list(&self) -> Result<Listing, kube::Error>;

    /// Open a watch that starts after `from` and is closed by the server after `timeout`.
    async fn watch(&self, from: &str, timeout: Duration) -> Result<EventStream, kube::Error>;
}

/// Create access to network policies.
#[async_trait]
pub trait PolicyClient: Send + Sync {
    async fn create(&self, namespace: &str, policy: &NetworkPolicy) -> Result<(), kube::Error>;
}

/// Implements both capabilities against a real API server.
#[derive(Clone)]
pub struct ClusterClient {
    client: Client,
    namespaces: Api<Namespace>,
    namespace_events: Api<DynamicObject>,
}

impl ClusterClient {
    pub fn new(client: &Client) -> Self {
        let resource = ApiResource::erase::<Namespace>(&());
        Self {
            client: client.clone(),
            namespaces: Api::all(client.clone()),
            namespace_events: Api::all_with(client.clone(), &resource),
        }
    }
}

#[async_trait]
impl NamespaceSource for ClusterClient {
    async fn list(&self) -> Result<Listing, kube::Error> {
        let list = self.namespaces.list(&ListParams::default()).await?;
        let position = list.metadata.resource_version.ok_or_else(|| {
            generate_error_response(
                "MissingResourceVersion",
                "namespace list response carried no resourceVersion",
                500,
            )
        })?;
        Ok(Listing {
            namespaces: list.items,
            position,
        })
    }

    async fn watch(&self, from: &str, timeout: Duration) -> Result<EventStream, kube::Error> {
        // Validated by WatchConfig to stay below MAX_WATCH_TIMEOUT_SECS.
        let timeout_secs = u32::try_from(timeout.as_secs()).unwrap_or(u32::MAX);
        let params = WatchParams::default().timeout(timeout_secs);
        let stream = self.namespace_events.watch(&params, from).await?;
        Ok(stream
            .map(|event| {
                event.map(|event| match event {
                    WatchEvent::Added(object) => WatchEvent::Added(Payload::from_object(object)),
                    WatchEvent::Modified(object) => {
                        WatchEvent::Modified(Payload::from_object(object))
                    }
                    WatchEvent::Deleted(object) => {
                        WatchEvent::Deleted(Payload::from_object(object))
                    }
                    WatchEvent::Bookmark(bookmark) => WatchEvent::Bookmark(bookmark),
                    WatchEvent::Error(status) => WatchEvent::Error(status),
                })
            })
            .boxed())
    }
}

#[async_trait]
impl PolicyClient for ClusterClient {
    async fn create(&self, namespace: &str, policy: &NetworkPolicy) -> Result<(), kube::Error> {
        let policies: Api<NetworkPolicy> = Api::namespaced(self.client.clone(), namespace);
        policies.create(&PostParams::default(), policy).await?;
        Ok(())
    }
}
