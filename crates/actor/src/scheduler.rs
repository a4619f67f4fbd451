use std::sync::Weak;

use tokio::select;
use tokio::sync::{mpsc, watch};

use crate::mailbox::{BoxMessage, Mailbox};
use crate::Actor;

/// Runs the message loop of one actor until it is stopped or every
/// handle is gone.
///
/// Messages are handled one at a time, in the order they were sent, and
/// each handler runs to completion before the next one starts.
pub async fn run_actor<S: Send + 'static>(
    mailbox: Weak<Mailbox<S>>,
    mut state: S,
    mut msg_rx: mpsc::UnboundedReceiver<Box<dyn BoxMessage<S>>>,
    mut stop_rx: watch::Receiver<bool>,
) {
    debug!("started");
    loop {
        let msg = select! {
            biased;

            _ = stop_rx.changed() => {
                break;
            }
            msg = msg_rx.recv() => {
                let Some(msg) = msg else {
                    break;
                };
                msg
            }
        };
        trace!("received message: {msg:?}");

        let Some(mailbox) = mailbox.upgrade() else {
            warn!("last mailbox has been dropped, discard the message");
            break;
        };
        trace_span!("proc msg").in_scope(|| {
            msg.handle_box(&mut state, &Actor::from_mailbox(mailbox));
        });
    }
    debug!("will terminate");
}
