//! Remote metadata lookup.
//!
//! Requests run on tokio tasks and report back through [`LookupEvent`]s on an
//! mpsc channel. Every request gets a fresh [`Ticket`]; consumers keep the
//! ticket of the request they care about and ignore events carrying any other.

mod client;
mod details;
mod scan;
mod search;

use std::{
    future::Future,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use parking_lot::Mutex;
use tokio::{
    sync::mpsc,
    task::{AbortHandle, JoinHandle},
};
use tracing::{debug, warn};

pub use client::{BggClient, CoverImage, HttpFetch, ReqwestFetch};
pub use details::{DetailsScanner, GameDetails};
pub use scan::{attribute, scan_str, scan_stream, ByteStream, XmlScanner};
pub use search::{SearchHit, SearchScanner};

use crate::{config::LookupConfig, error::LookupError};

const EVENT_BUFFER: usize = 32;

/// Identifies the request an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(u64);

/// Results delivered to the consumer.
#[derive(Debug)]
pub enum LookupEvent {
    /// A name search completed. Failures arrive as an empty list unless
    /// errors are reported.
    SearchResults {
        /// Request the results belong to.
        ticket: Ticket,
        /// Candidates in response order.
        hits: Vec<SearchHit>,
    },
    /// Detail fields of the chosen item arrived.
    Details {
        /// Request the details belong to.
        ticket: Ticket,
        /// Parsed fields; all `None` when the request failed silently.
        details: GameDetails,
    },
    /// The cover referenced by the details was downloaded and decoded.
    Cover {
        /// Request the cover belongs to.
        ticket: Ticket,
        /// Decoded cover.
        cover: CoverImage,
    },
    /// A search or detail request failed and errors are reported.
    Failed {
        /// Request that failed.
        ticket: Ticket,
        /// Human-readable cause.
        message: String,
    },
}

impl LookupEvent {
    /// Whether this event answers the request behind `handle`.
    pub fn belongs_to(&self, handle: &LookupHandle) -> bool {
        self.ticket() == handle.ticket
    }

    /// Ticket of the originating request.
    pub fn ticket(&self) -> Ticket {
        match self {
            LookupEvent::SearchResults { ticket, .. }
            | LookupEvent::Details { ticket, .. }
            | LookupEvent::Cover { ticket, .. }
            | LookupEvent::Failed { ticket, .. } => *ticket,
        }
    }
}

/// An in-flight request. Dropping the handle aborts its tasks.
#[derive(Debug)]
pub struct LookupHandle {
    ticket: Ticket,
    task: JoinHandle<()>,
    children: Arc<Mutex<ChildTasks>>,
}

impl LookupHandle {
    /// Ticket carried by this request's events.
    pub fn ticket(&self) -> Ticket {
        self.ticket
    }

    /// Abort the request and anything it spawned.
    pub fn cancel(&self) {
        self.task.abort();
        self.children.lock().cancel();
    }
}

impl Drop for LookupHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Tasks a request spawned. Once cancelled, nothing new is spawned.
#[derive(Debug, Default)]
struct ChildTasks {
    cancelled: bool,
    handles: Vec<AbortHandle>,
}

impl ChildTasks {
    fn spawn<T>(&mut self, future: T)
    where
        T: Future<Output = ()> + Send + 'static,
    {
        if self.cancelled {
            return;
        }
        self.handles.push(tokio::spawn(future).abort_handle());
    }

    fn cancel(&mut self) {
        self.cancelled = true;
        for handle in self.handles.drain(..) {
            handle.abort();
        }
    }
}

/// Starts lookups and owns the sending half of the event channel.
#[derive(Debug)]
pub struct Lookup<F = ReqwestFetch> {
    client: Arc<BggClient<F>>,
    events: mpsc::Sender<LookupEvent>,
    report_errors: bool,
    next_ticket: AtomicU64,
}

impl Lookup {
    /// Lookup service talking to the configured endpoints.
    pub fn new(config: &LookupConfig) -> Result<(Self, mpsc::Receiver<LookupEvent>), LookupError> {
        Ok(Self::with_client(BggClient::new(config)?, config))
    }
}

impl<F: HttpFetch> Lookup<F> {
    /// Lookup service around an existing client.
    pub fn with_client(
        client: BggClient<F>,
        config: &LookupConfig,
    ) -> (Self, mpsc::Receiver<LookupEvent>) {
        let (events, receiver) = mpsc::channel(EVENT_BUFFER);
        let lookup = Self {
            client: Arc::new(client),
            events,
            report_errors: config.report_errors,
            next_ticket: AtomicU64::new(1),
        };
        (lookup, receiver)
    }

    fn ticket(&self) -> Ticket {
        Ticket(self.next_ticket.fetch_add(1, Ordering::Relaxed))
    }

    /// Search by name in the background.
    pub fn search(&self, name: impl Into<String>) -> LookupHandle {
        let name = name.into();
        let ticket = self.ticket();
        let client = Arc::clone(&self.client);
        let events = self.events.clone();
        let report_errors = self.report_errors;

        let task = tokio::spawn(async move {
            let event = match client.search(&name).await {
                Ok(hits) => LookupEvent::SearchResults { ticket, hits },
                Err(err) => {
                    warn!(query = %name, error = %err, "Search failed");
                    failure(ticket, &err, report_errors, || LookupEvent::SearchResults {
                        ticket,
                        hits: Vec::new(),
                    })
                }
            };
            deliver(&events, event).await;
        });

        LookupHandle {
            ticket,
            task,
            children: Arc::default(),
        }
    }

    /// Fetch the details of `id` in the background, followed by its cover.
    pub fn details(&self, id: u64) -> LookupHandle {
        let ticket = self.ticket();
        let client = Arc::clone(&self.client);
        let events = self.events.clone();
        let report_errors = self.report_errors;
        let children: Arc<Mutex<ChildTasks>> = Arc::default();
        let spawned = Arc::clone(&children);

        let task = tokio::spawn(async move {
            let details = match client.details(id).await {
                Ok(details) => details,
                Err(err) => {
                    warn!(id, error = %err, "Item details failed");
                    let event = failure(ticket, &err, report_errors, || LookupEvent::Details {
                        ticket,
                        details: GameDetails::default(),
                    });
                    deliver(&events, event).await;
                    return;
                }
            };

            if let Some(url) = details.image_url.clone() {
                let client = Arc::clone(&client);
                let events = events.clone();
                spawned.lock().spawn(async move {
                    if let Some(cover) = client.cover(&url).await {
                        deliver(&events, LookupEvent::Cover { ticket, cover }).await;
                    }
                });
            }

            deliver(&events, LookupEvent::Details { ticket, details }).await;
        });

        LookupHandle {
            ticket,
            task,
            children,
        }
    }
}

fn failure(
    ticket: Ticket,
    err: &LookupError,
    report_errors: bool,
    silent: impl FnOnce() -> LookupEvent,
) -> LookupEvent {
    if report_errors {
        LookupEvent::Failed {
            ticket,
            message: err.to_string(),
        }
    } else {
        silent()
    }
}

async fn deliver(events: &mpsc::Sender<LookupEvent>, event: LookupEvent) {
    let ticket = event.ticket();
    if events.send(event).await.is_err() {
        debug!(?ticket, "Lookup receiver dropped");
    }
}
