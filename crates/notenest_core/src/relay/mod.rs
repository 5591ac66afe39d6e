//! Message relay between the panel and the persistent store.
//!
//! # Responsibility
//! - Serve `fetchDocumentTree` / `persistDocumentTree` and the panel width
//!   requests against the store it owns.
//! - Seed the store on first install.
//! - Forward one-way notices (`requestClose`, `panelReady`) to the host.
//!
//! # Invariants
//! - The relay keeps no document state of its own.
//! - Requests are handled strictly in arrival order, so persists land in
//!   the order the panel issued them.
//! - A missing or unreadable tree is answered with the seed tree.

use crate::model::clock::Clock;
use crate::model::tree::DocumentTree;
use crate::protocol::{RelayNotice, RelayRequest, RelayResponse};
use crate::store::{KeyValueStore, NestStore, SeedReport, StoreResult};
use log::{debug, error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

mod toggle;

pub use toggle::{Gesture, PanelToggler, Tab, TabError, TabHost, ToggleOutcome, TOGGLE_COMMAND};

/// Errors seen by relay clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayError {
    /// Relay task is gone or dropped the reply.
    Disconnected,
    /// The store rejected the operation.
    Store(String),
    /// The relay answered with a response of the wrong kind.
    UnexpectedResponse(&'static str),
}

impl Display for RelayError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "relay disconnected"),
            Self::Store(reason) => write!(f, "store failure: {reason}"),
            Self::UnexpectedResponse(expected) => {
                write!(f, "unexpected relay response; expected {expected}")
            }
        }
    }
}

impl Error for RelayError {}

/// One request plus the optional channel its reply travels back on.
#[derive(Debug)]
pub struct Envelope {
    request: RelayRequest,
    reply: Option<oneshot::Sender<RelayResponse>>,
}

impl Envelope {
    pub fn request(&self) -> &RelayRequest {
        &self.request
    }

    /// Sends `response` back to the requester; one-way requests ignore it.
    pub fn respond(self, response: RelayResponse) {
        if let Some(reply) = self.reply {
            if reply.send(response).is_err() {
                debug!("event=relay_reply module=relay status=dropped");
            }
        }
    }

    pub fn into_parts(self) -> (RelayRequest, Option<oneshot::Sender<RelayResponse>>) {
        (self.request, self.reply)
    }
}

/// Receiving end of the relay channel.
#[derive(Debug)]
pub struct RelayInbox {
    rx: mpsc::UnboundedReceiver<Envelope>,
}

impl RelayInbox {
    pub async fn recv(&mut self) -> Option<Envelope> {
        self.rx.recv().await
    }
}

/// Creates a connected handle/inbox pair.
pub fn channel() -> (RelayHandle, RelayInbox) {
    let (tx, rx) = mpsc::unbounded_channel();
    (RelayHandle { tx }, RelayInbox { rx })
}

/// Cloneable client side of the relay.
#[derive(Debug, Clone)]
pub struct RelayHandle {
    tx: mpsc::UnboundedSender<Envelope>,
}

impl RelayHandle {
    /// Enqueues `request` and returns the pending reply without waiting.
    pub fn send_request(
        &self,
        request: RelayRequest,
    ) -> Result<oneshot::Receiver<RelayResponse>, RelayError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Envelope {
                request,
                reply: Some(reply_tx),
            })
            .map_err(|_| RelayError::Disconnected)?;
        Ok(reply_rx)
    }

    /// Enqueues a one-way request.
    pub fn notify(&self, request: RelayRequest) -> Result<(), RelayError> {
        self.tx
            .send(Envelope {
                request,
                reply: None,
            })
            .map_err(|_| RelayError::Disconnected)
    }

    pub async fn fetch_document_tree(&self) -> Result<DocumentTree, RelayError> {
        match self.call(RelayRequest::FetchDocumentTree).await? {
            RelayResponse::DocumentTree { data } => Ok(data),
            _ => Err(RelayError::UnexpectedResponse("documentTree")),
        }
    }

    pub async fn persist_document_tree(&self, tree: DocumentTree) -> Result<(), RelayError> {
        let response = self
            .call(RelayRequest::PersistDocumentTree { data: tree })
            .await?;
        persisted_result(response)
    }

    pub async fn fetch_panel_width(&self) -> Result<u32, RelayError> {
        match self.call(RelayRequest::FetchPanelWidth).await? {
            RelayResponse::PanelWidth { width } => Ok(width),
            _ => Err(RelayError::UnexpectedResponse("panelWidth")),
        }
    }

    /// Returns the width actually stored after clamping.
    pub async fn persist_panel_width(&self, width: u32) -> Result<u32, RelayError> {
        match self.call(RelayRequest::PersistPanelWidth { width }).await? {
            RelayResponse::PanelWidth { width } => Ok(width),
            RelayResponse::Persisted { error, .. } => {
                Err(RelayError::Store(error.unwrap_or_default()))
            }
            _ => Err(RelayError::UnexpectedResponse("panelWidth")),
        }
    }

    pub fn request_close(&self) -> Result<(), RelayError> {
        self.notify(RelayRequest::RequestClose)
    }

    pub fn announce_ready(&self) -> Result<(), RelayError> {
        self.notify(RelayRequest::PanelReady)
    }

    async fn call(&self, request: RelayRequest) -> Result<RelayResponse, RelayError> {
        self.send_request(request)?
            .await
            .map_err(|_| RelayError::Disconnected)
    }
}

/// Interprets a `persisted` reply.
pub fn persisted_result(response: RelayResponse) -> Result<(), RelayError> {
    match response {
        RelayResponse::Persisted { success: true, .. } => Ok(()),
        RelayResponse::Persisted { error, .. } => Err(RelayError::Store(
            error.unwrap_or_else(|| "unknown store error".to_string()),
        )),
        _ => Err(RelayError::UnexpectedResponse("persisted")),
    }
}

/// Store-owning relay task.
pub struct Relay<S: KeyValueStore> {
    store: NestStore<S>,
    clock: Arc<dyn Clock>,
    notices: Option<mpsc::UnboundedSender<RelayNotice>>,
}

impl<S: KeyValueStore> Relay<S> {
    pub fn new(store: NestStore<S>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            notices: None,
        }
    }

    /// Forwards one-way notices to `notices`.
    pub fn with_notices(mut self, notices: mpsc::UnboundedSender<RelayNotice>) -> Self {
        self.notices = Some(notices);
        self
    }

    pub fn store(&self) -> &NestStore<S> {
        &self.store
    }

    /// Install-time hook: seeds the tree and panel width when absent.
    pub fn on_installed(&mut self) -> StoreResult<SeedReport> {
        let now = self.clock.now_ms();
        self.store.seed_if_missing(now).map_err(|err| {
            error!("event=relay_install module=relay status=error error={err}");
            err
        })
    }

    /// Handles one request; `None` for one-way requests.
    pub fn handle(&mut self, request: RelayRequest) -> Option<RelayResponse> {
        debug!(
            "event=relay_request module=relay status=start action={}",
            request.action()
        );
        match request {
            RelayRequest::FetchDocumentTree => Some(RelayResponse::DocumentTree {
                data: self.fetch_document_tree(),
            }),
            RelayRequest::PersistDocumentTree { data } => Some(self.persist_document_tree(&data)),
            RelayRequest::FetchPanelWidth => {
                let width = self.store.panel_width().unwrap_or_else(|err| {
                    warn!("event=width_read module=relay status=error error={err}");
                    self.store.width_bounds().default
                });
                Some(RelayResponse::PanelWidth { width })
            }
            RelayRequest::PersistPanelWidth { width } => {
                Some(match self.store.save_panel_width(width) {
                    Ok(width) => RelayResponse::PanelWidth { width },
                    Err(err) => {
                        warn!("event=width_write module=relay status=error error={err}");
                        RelayResponse::Persisted {
                            success: false,
                            error: Some(err.to_string()),
                        }
                    }
                })
            }
            RelayRequest::RequestClose => {
                self.forward(RelayNotice::CloseRequested);
                None
            }
            RelayRequest::PanelReady => {
                info!("event=panel_ready module=relay status=ok");
                self.forward(RelayNotice::PanelReady);
                None
            }
        }
    }

    /// Serves requests until every handle is dropped.
    pub async fn serve(mut self, mut inbox: RelayInbox) {
        info!("event=relay_serve module=relay status=start");
        while let Some(envelope) = inbox.recv().await {
            let (request, reply) = envelope.into_parts();
            let response = self.handle(request);
            if let (Some(reply), Some(response)) = (reply, response) {
                if reply.send(response).is_err() {
                    debug!("event=relay_reply module=relay status=dropped");
                }
            }
        }
        info!("event=relay_serve module=relay status=stopped");
    }

    /// Spawns `serve` on the current runtime.
    pub fn spawn(self) -> (RelayHandle, JoinHandle<()>)
    where
        S: 'static,
    {
        let (handle, inbox) = channel();
        let task = tokio::spawn(self.serve(inbox));
        (handle, task)
    }

    fn fetch_document_tree(&self) -> DocumentTree {
        match self.store.load_tree() {
            Ok(Some(tree)) => {
                info!(
                    "event=tree_fetch module=relay status=ok source=store folders={}",
                    tree.folders.len()
                );
                tree
            }
            Ok(None) => {
                info!("event=tree_fetch module=relay status=ok source=seed");
                DocumentTree::seed(self.clock.now_ms())
            }
            Err(err) => {
                warn!("event=tree_fetch module=relay status=error source=seed error={err}");
                DocumentTree::seed(self.clock.now_ms())
            }
        }
    }

    fn persist_document_tree(&mut self, tree: &DocumentTree) -> RelayResponse {
        match self.store.save_tree(tree) {
            Ok(()) => {
                info!(
                    "event=tree_persist module=relay status=ok folders={}",
                    tree.folders.len()
                );
                RelayResponse::Persisted {
                    success: true,
                    error: None,
                }
            }
            Err(err) => {
                error!("event=tree_persist module=relay status=error error={err}");
                RelayResponse::Persisted {
                    success: false,
                    error: Some(err.to_string()),
                }
            }
        }
    }

    fn forward(&self, notice: RelayNotice) {
        if let Some(notices) = &self.notices {
            if notices.send(notice).is_err() {
                debug!("event=relay_notice module=relay status=dropped notice={notice:?}");
            }
        }
    }
}
