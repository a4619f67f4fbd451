use std::sync::Arc;

use tracing::Instrument;

use crate::mailbox::{Call, Mailbox, MailboxParts};
use crate::scheduler::run_actor;
use crate::{ActorDeadError, Message, Request};

/// Handle to an actor.
///
/// Cloning the handle is cheap. The actor keeps running while at least
/// one handle is alive, or until [`Actor::stop`] is called.
pub struct Actor<S> {
    mailbox: Arc<Mailbox<S>>,
}

impl<S: Send + 'static> Actor<S> {
    /// Spawns a new actor on the current tokio runtime with the specified
    /// state and an optional label used in its tracing span.
    pub fn spawn(state: S, label: Option<&str>) -> Self {
        let MailboxParts {
            mailbox,
            msg_rx,
            stop_rx,
        } = Mailbox::new();
        let mailbox = Arc::new(mailbox);
        tokio::spawn(
            run_actor(Arc::downgrade(&mailbox), state, msg_rx, stop_rx)
                .instrument(trace_span!("actor", label = label)),
        );
        Self { mailbox }
    }

    #[inline]
    pub(crate) fn from_mailbox(mailbox: Arc<Mailbox<S>>) -> Self {
        Self { mailbox }
    }

    /// Sends a message to the actor without waiting for it to be handled.
    #[inline]
    pub fn send<M: Message<S> + 'static>(
        &self,
        msg: M,
    ) -> Result<(), ActorDeadError> {
        self.mailbox.send(Box::new(msg))
    }

    /// Sends a request and waits for the actor's reply.
    ///
    /// The request is queued behind every message sent before it.
    pub async fn call<R: Request<S>>(
        &self,
        request: R,
    ) -> Result<R::Reply, ActorDeadError> {
        let (call, reply_rx) = Call::new(request);
        self.mailbox.send(Box::new(call))?;
        reply_rx.await.map_err(|_| ActorDeadError)
    }

    /// Returns `false` once the actor's loop has exited.
    #[inline]
    pub fn is_alive(&self) -> bool {
        !self.mailbox.is_closed()
    }

    /// Asks the actor to stop.
    ///
    /// The actor is not guaranteed to stop immediately, but it will not
    /// handle further messages once it notices the request.
    #[inline]
    pub fn stop(&self) {
        self.mailbox.stop();
    }
}

impl<S> Clone for Actor<S> {
    #[inline]
    fn clone(&self) -> Self {
        Self {
            mailbox: Arc::clone(&self.mailbox),
        }
    }
}
