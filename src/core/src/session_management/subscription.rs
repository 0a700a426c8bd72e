use futures_util::stream::{self, Stream};
use std::sync::Weak;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::session::ScanSession;
use super::types::ScanEvent;

/// A consumer's handle on a session's event feed.
///
/// Dropping it unsubscribes; other subscribers are unaffected.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    session_id: Uuid,
    rx: mpsc::UnboundedReceiver<ScanEvent>,
    session: Weak<ScanSession>,
}

impl Subscription {
    pub(super) fn new(
        id: u64,
        session_id: Uuid,
        rx: mpsc::UnboundedReceiver<ScanEvent>,
        session: Weak<ScanSession>,
    ) -> Self {
        Self {
            id,
            session_id,
            rx,
            session,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Next event, or `None` once the session closed the feed.
    pub async fn recv(&mut self) -> Option<ScanEvent> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<ScanEvent> {
        self.rx.try_recv().ok()
    }

    /// Turns the subscription into a stream that ends right after the
    /// terminal event. Dropping the stream unsubscribes.
    pub fn into_stream(self) -> impl Stream<Item = ScanEvent> + Send + 'static {
        stream::unfold((self, false), |(mut sub, finished)| async move {
            if finished {
                return None;
            }
            let event = sub.recv().await?;
            let terminal = event.is_terminal();
            Some((event, (sub, terminal)))
        })
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(session) = self.session.upgrade() {
            session.unsubscribe(self.id);
        }
    }
}
