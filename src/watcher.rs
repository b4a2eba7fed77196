// System
use std::{convert::Infallible, time::Duration};

// Third Party
use futures::TryStreamExt;
use k8s_openapi::api::core::v1::Namespace;
use kube::{api::WatchEvent, ResourceExt};
use rand::Rng;
use tracing::{debug, info, warn};

// Local
use crate::{
    channel::EventSender,
    client::{NamespaceSource, Payload, ResourceEvent},
    error::{Error, Recovery},
    utils::{DEFAULT_MIN_WATCH_TIMEOUT, MAX_WATCH_TIMEOUT_SECS},
};

/// Tuning for the watch loop.
#[derive(Clone, Debug)]
pub struct WatchConfig {
    /// Each watch attempt lasts between this and twice this long.
    pub min_watch_timeout: Duration,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            min_watch_timeout: DEFAULT_MIN_WATCH_TIMEOUT,
        }
    }
}

impl WatchConfig {
    pub fn validate(&self) -> Result<(), Error> {
        let secs = self.min_watch_timeout.as_secs();
        if secs == 0 {
            return Err(Error::InvalidConfig(
                "minimum watch timeout must be at least one second".to_string(),
            ));
        }
        // Watch timeouts go out in whole seconds.
        if self.min_watch_timeout.subsec_nanos() != 0 {
            return Err(Error::InvalidConfig(format!(
                "minimum watch timeout of {:?} is not a whole number of seconds",
                self.min_watch_timeout
            )));
        }
        if secs * 2 > MAX_WATCH_TIMEOUT_SECS {
            return Err(Error::InvalidConfig(format!(
                "minimum watch timeout of {}s would allow watches of {}s or more",
                secs, MAX_WATCH_TIMEOUT_SECS
            )));
        }
        Ok(())
    }

    /// Draw a timeout uniformly from `[min, 2 * min)`, in whole seconds, so that
    /// replicas do not reconnect in lockstep.
    pub fn draw_timeout<R: Rng>(&self, rng: &mut R) -> Duration {
        let min = self.min_watch_timeout.as_secs().max(1);
        Duration::from_secs(rng.gen_range(min..min * 2))
    }
}

/// Where one watch session stands: the resource version the next watch resumes after.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WatchSession {
    pub position: String,
}

impl WatchSession {
    pub fn new(position: impl Into<String>) -> Self {
        Self {
            position: position.into(),
        }
    }

    /// Fold one watch event into the session. Every event carrying a resource version moves the
    /// position, whatever its kind. Returns the namespace to forward, which is only ever the
    /// payload of an `Added` event. An `Error` event comes back as `Error::Status` for the caller
    /// to classify.
    pub fn observe(&mut self, event: ResourceEvent) -> Result<Option<Namespace>, Error> {
        let (payload, is_added) = match event {
            WatchEvent::Error(status) => return Err(Error::Status(status)),
            WatchEvent::Bookmark(bookmark) => {
                self.position = bookmark.metadata.resource_version;
                return Ok(None);
            }
            WatchEvent::Added(payload) => (payload, true),
            WatchEvent::Modified(payload) | WatchEvent::Deleted(payload) => (payload, false),
        };

        let namespace = match payload {
            Payload::Namespace(namespace) => namespace,
            Payload::Unexpected { kind } => {
                warn!("Namespace watch delivered unexpected kind {}, ignoring", kind);
                return Ok(None);
            }
        };

        if let Some(resource_version) = namespace.resource_version() {
            self.position = resource_version;
        }

        if is_added {
            Ok(Some(namespace))
        } else {
            Ok(None)
        }
    }
}

/// States of the list/watch protocol. Fatal is the error returned from `WatchController::run`.
#[derive(Debug)]
enum WatchState {
    Listing,
    Watching(WatchSession),
    Relisting,
}

/// Turns the expiring namespace watch of the API server into an ordered feed of added
/// namespaces on an [`EventSender`].
pub struct WatchController<S, R> {
    source: S,
    config: WatchConfig,
    rng: R,
}

impl<S, R> WatchController<S, R>
where
    S: NamespaceSource,
    R: Rng + Send,
{
    pub fn new(source: S, config: WatchConfig, rng: R) -> Result<Self, Error> {
        config.validate()?;
        Ok(Self {
            source,
            config,
            rng,
        })
    }

    /// List every namespace and start a new session at the collection's resource version.
    async fn list(&self) -> Result<WatchSession, Error> {
        let listing = self.source.list().await.map_err(Error::List)?;
        debug!(
            "Listed {} namespaces at resource version {}",
            listing.namespaces.len(),
            listing.position
        );
        Ok(WatchSession::new(listing.position))
    }

    /// Run one watch attempt from `session.position` until the server closes the stream, and
    /// hand back the advanced session.
    async fn watch(
        &mut self,
        mut session: WatchSession,
        sink: &EventSender,
    ) -> Result<WatchSession, Error> {
        let timeout = self.config.draw_timeout(&mut self.rng);
        info!(
            "Watching namespaces since {} for {}s",
            session.position,
            timeout.as_secs()
        );
        let mut stream = self
            .source
            .watch(&session.position, timeout)
            .await
            .map_err(Error::Watch)?;

        while let Some(event) = stream.try_next().await.map_err(Error::Stream)? {
            if let Some(namespace) = session.observe(event)? {
                debug!("Namespace added: {}", namespace.name_any());
                sink.send(namespace).await?;
            }
        }
        debug!("Watch ended at resource version {}", session.position);
        Ok(session)
    }

    /// Drive the state machine. Only returns when a fatal condition is hit.
    pub async fn run(mut self, sink: EventSender) -> Result<Infallible, Error> {
        let mut state = WatchState::Listing;
        loop {
            state = match state {
                WatchState::Listing => {
                    debug!("State: Listing");
                    WatchState::Watching(self.list().await?)
                }
                WatchState::Relisting => {
                    debug!("State: Relisting");
                    WatchState::Watching(self.list().await?)
                }
                WatchState::Watching(session) => match self.watch(session, &sink).await {
                    Ok(session) => WatchState::Watching(session),
                    Err(error) => match error.recovery() {
                        Recovery::Relist => {
                            warn!("Namespace watch: {}. Restarting watch", error);
                            WatchState::Relisting
                        }
                        Recovery::Fatal => return Err(error),
                    },
                },
            };
        }
    }
}
