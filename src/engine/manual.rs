use tokio::sync::mpsc::UnboundedReceiver;

use super::interface::{EngineHandle, Event, Request};

/// An engine that does nothing on its own: requests queue up until the test
/// driving it picks them out and answers them.
///
/// This is how tests hold a response back to close the panel first, or fire
/// a second intersection while a page is still loading.
pub struct ManualEngine {
    rx: UnboundedReceiver<Request>,
}

impl ManualEngine {
    pub fn new() -> (EngineHandle, Self) {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel::<Request>();
        (EngineHandle::new(tx), Self { rx })
    }

    /// The oldest unanswered request, if any.
    pub fn next_request(&mut self) -> Option<Request> {
        self.rx.try_recv().ok()
    }

    /// Every request sent so far and not yet taken.
    pub fn drain(&mut self) -> Vec<Request> {
        std::iter::from_fn(|| self.next_request()).collect()
    }

    /// Answer a request taken with [`next_request`](Self::next_request).
    pub fn reply(req: &Request, event: Event) {
        if let Some(tx) = req.reply_tx() {
            let _ = tx.send(event);
        }
    }
}
