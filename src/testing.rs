//! In-memory fakes of the cluster capabilities, shared by the unit tests.

// System
use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
    time::Duration,
};

// Third Party
use async_trait::async_trait;
use futures::{stream, StreamExt};
use k8s_openapi::{
    api::{core::v1::Namespace, networking::v1::NetworkPolicy},
    apimachinery::pkg::apis::meta::v1::ObjectMeta,
};
use kube::{
    api::WatchEvent,
    core::{
        metadata::TypeMeta,
        watch::{Bookmark, BookmarkMeta},
    },
    error::ErrorResponse,
};

// Local
use crate::{
    client::{EventStream, Listing, NamespaceSource, Payload, PolicyClient, ResourceEvent},
    utils::generate_error_response,
};

pub fn namespace(name: &str, resource_version: &str) -> Namespace {
    Namespace {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            resource_version: Some(resource_version.to_string()),
            ..Default::default()
        },
        ..Default::default()
    }
}

pub fn added(name: &str, rv: &str) -> ResourceEvent {
    WatchEvent::Added(Payload::Namespace(namespace(name, rv)))
}

pub fn modified(name: &str, rv: &str) -> ResourceEvent {
    WatchEvent::Modified(Payload::Namespace(namespace(name, rv)))
}

pub fn deleted(name: &str, rv: &str) -> ResourceEvent {
    WatchEvent::Deleted(Payload::Namespace(namespace(name, rv)))
}

pub fn unexpected(kind: &str) -> ResourceEvent {
    WatchEvent::Added(Payload::Unexpected {
        kind: kind.to_string(),
    })
}

pub fn bookmark(rv: &str) -> ResourceEvent {
    WatchEvent::Bookmark(Bookmark {
        types: TypeMeta {
            api_version: "v1".to_string(),
            kind: "Namespace".to_string(),
        },
        metadata: BookmarkMeta {
            resource_version: rv.to_string(),
        },
    })
}

pub fn error_event(reason: &str, code: u16) -> ResourceEvent {
    WatchEvent::Error(ErrorResponse {
        status: "Failure".to_string(),
        message: format!("{} ({})", reason, code),
        reason: reason.to_string(),
        code,
    })
}

/// A call the controller made against the fake cluster.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    List,
    Watch { from: String, timeout: Duration },
}

/// One scripted answer to a watch call.
pub enum WatchScript {
    Events(Vec<Result<ResourceEvent, kube::Error>>),
    Fail(kube::Error),
}

#[derive(Default)]
struct FakeState {
    lists: VecDeque<Result<Listing, kube::Error>>,
    watches: VecDeque<WatchScript>,
    calls: Vec<Call>,
}

/// Scripted `NamespaceSource`. Once the scripts run out every call fails with a non-expired
/// error, which makes the watcher terminate.
#[derive(Clone, Default)]
pub struct FakeCluster {
    state: Arc<Mutex<FakeState>>,
}

impl FakeCluster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn list_returns(self, position: &str) -> Self {
        self.state.lock().unwrap().lists.push_back(Ok(Listing {
            namespaces: Vec::new(),
            position: position.to_string(),
        }));
        self
    }

    pub fn list_fails(self, error: kube::Error) -> Self {
        self.state.lock().unwrap().lists.push_back(Err(error));
        self
    }

    pub fn watch_yields(self, events: Vec<ResourceEvent>) -> Self {
        self.state
            .lock()
            .unwrap()
            .watches
            .push_back(WatchScript::Events(events.into_iter().map(Ok).collect()));
        self
    }

    pub fn watch_script(self, script: WatchScript) -> Self {
        self.state.lock().unwrap().watches.push_back(script);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }
}

pub fn exhausted() -> kube::Error {
    generate_error_response("ScriptExhausted", "no more scripted responses", 503)
}

#[async_trait]
impl NamespaceSource for FakeCluster {
    async fn list(&self) -> Result<Listing, kube::Error> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::List);
        state.lists.pop_front().unwrap_or_else(|| Err(exhausted()))
    }

    async fn watch(&self, from: &str, timeout: Duration) -> Result<EventStream, kube::Error> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Watch {
            from: from.to_string(),
            timeout,
        });
        match state.watches.pop_front() {
            Some(WatchScript::Events(events)) => Ok(stream::iter(events).boxed()),
            Some(WatchScript::Fail(error)) => Err(error),
            None => Err(exhausted()),
        }
    }
}

/// Records every create call and answers from a per-namespace table of failures.
#[derive(Clone, Default)]
pub struct FakePolicies {
    created: Arc<Mutex<Vec<NetworkPolicy>>>,
    failures: Arc<Mutex<Vec<(String, kube::Error)>>>,
}

impl FakePolicies {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next create in `namespace` fails with `error`.
    pub fn fail_in(self, namespace: &str, error: kube::Error) -> Self {
        self.failures
            .lock()
            .unwrap()
            .push((namespace.to_string(), error));
        self
    }

    /// Every create attempt, including the ones that failed.
    pub fn attempts(&self) -> Vec<NetworkPolicy> {
        self.created.lock().unwrap().clone()
    }
}

#[async_trait]
impl PolicyClient for FakePolicies {
    async fn create(&self, namespace: &str, policy: &NetworkPolicy) -> Result<(), kube::Error> {
        self.created.lock().unwrap().push(policy.clone());
        let mut failures = self.failures.lock().unwrap();
        match failures.iter().position(|(ns, _)| ns == namespace) {
            Some(index) => Err(failures.remove(index).1),
            None => Ok(()),
        }
    }
}
