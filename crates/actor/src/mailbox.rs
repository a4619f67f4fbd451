use std::fmt::{self, Debug};
use std::marker::PhantomData;

use tokio::sync::{mpsc, oneshot, watch};

use crate::{Actor, ActorDeadError};

/// Helper trait for handling boxed messages.
pub trait BoxMessage<S>: Send + Debug + 'static {
    fn handle_box(self: Box<Self>, state: &mut S, handle: &Actor<S>);
}

/// A fire-and-forget message that an actor can handle.
pub trait Message<S>: BoxMessage<S> {
    /// Handles the message with mutable access to the actor's state.
    fn handle(self, state: &mut S, handle: &Actor<S>);
}

impl<S, M: Message<S>> BoxMessage<S> for M {
    #[inline]
    fn handle_box(self: Box<Self>, state: &mut S, handle: &Actor<S>) {
        (*self).handle(state, handle)
    }
}

/// A message that produces a reply for the sender.
pub trait Request<S>: Send + Debug + 'static {
    /// The value sent back to the caller.
    type Reply: Send + 'static;

    /// Handles the request with mutable access to the actor's state.
    fn handle(self, state: &mut S, handle: &Actor<S>) -> Self::Reply;
}

/// Pairs a request with the channel its reply goes back on.
pub(crate) struct Call<R: Request<S>, S> {
    request: R,
    reply_tx: oneshot::Sender<R::Reply>,
    _state: PhantomData<fn(&mut S)>,
}

impl<R: Request<S>, S> Call<R, S> {
    #[inline]
    pub fn new(request: R) -> (Self, oneshot::Receiver<R::Reply>) {
        let (reply_tx, reply_rx) = oneshot::channel();
        (
            Self {
                request,
                reply_tx,
                _state: PhantomData,
            },
            reply_rx,
        )
    }
}

impl<R: Request<S>, S> Debug for Call<R, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Call").field(&self.request).finish()
    }
}

impl<R: Request<S>, S: 'static> Message<S> for Call<R, S> {
    #[inline]
    fn handle(self, state: &mut S, handle: &Actor<S>) {
        let reply = self.request.handle(state, handle);
        // The caller may have given up waiting, that's fine.
        self.reply_tx.send(reply).ok();
    }
}

pub struct MailboxParts<S> {
    pub mailbox: Mailbox<S>,
    pub msg_rx: mpsc::UnboundedReceiver<Box<dyn BoxMessage<S>>>,
    pub stop_rx: watch::Receiver<bool>,
}

pub struct Mailbox<S> {
    msg_tx: mpsc::UnboundedSender<Box<dyn BoxMessage<S>>>,
    stop_tx: watch::Sender<bool>,
}

impl<S: Send + 'static> Mailbox<S> {
    #[inline]
    pub fn new() -> MailboxParts<S> {
        let (msg_tx, msg_rx) = mpsc::unbounded_channel();
        let (stop_tx, stop_rx) = watch::channel(false);
        MailboxParts {
            mailbox: Mailbox { msg_tx, stop_tx },
            msg_rx,
            stop_rx,
        }
    }

    #[inline]
    pub fn send(
        &self,
        msg: Box<dyn BoxMessage<S>>,
    ) -> Result<(), ActorDeadError> {
        self.msg_tx.send(msg).map_err(|_| ActorDeadError)
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.msg_tx.is_closed()
    }

    #[inline]
    pub fn stop(&self) {
        self.stop_tx.send(true).ok();
    }
}
