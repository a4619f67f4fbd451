use std::collections::HashMap;

use streamchat_actor::{Actor, Message, Request};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::SessionSnapshot;
use crate::model_client::ModelClient;
use crate::transcript::{
    Generation, PendingSend, StreamFailure, SubmitError, Transcript,
};

type UpdateFn = Box<dyn Fn(&SessionSnapshot) + Send + Sync>;

/// The state owned by the session's task.
///
/// Intents are handled immediately, whatever stage the transcript is in.
/// Whether an intent is allowed is decided by the [`Transcript`]; this type
/// only runs the sends it asks for and tells observers about every change.
pub struct SessionState {
    model_client: ModelClient,
    transcript: Transcript,
    selected_model: String,
    running_tasks: HashMap<Generation, JoinHandle<()>>,
    updates_tx: watch::Sender<SessionSnapshot>,
    on_update: Vec<UpdateFn>,
}

impl SessionState {
    pub fn new(
        model_client: ModelClient,
        selected_model: String,
        on_update: Vec<UpdateFn>,
    ) -> Self {
        let transcript = Transcript::new(model_client.increment_mode());
        let initial = SessionSnapshot {
            conversation: transcript.conversation().clone(),
            status: transcript.status(),
            stage: transcript.stage(),
            selected_model: selected_model.clone(),
        };
        let (updates_tx, _) = watch::channel(initial);
        Self {
            model_client,
            transcript,
            selected_model,
            running_tasks: Default::default(),
            updates_tx,
            on_update,
        }
    }

    #[inline]
    pub fn updates(&self) -> watch::Receiver<SessionSnapshot> {
        self.updates_tx.subscribe()
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            conversation: self.transcript.conversation().clone(),
            status: self.transcript.status(),
            stage: self.transcript.stage(),
            selected_model: self.selected_model.clone(),
        }
    }

    fn publish(&self) {
        let snapshot = self.snapshot();
        for on_update in &self.on_update {
            on_update(&snapshot);
        }
        self.updates_tx.send_replace(snapshot);
    }

    fn submit(
        &mut self,
        text: String,
        handle: &Actor<Self>,
    ) -> Result<(), SubmitError> {
        let pending = self.transcript.submit(&text, &self.selected_model)?;
        debug!(
            "submitted generation {} to {}",
            pending.generation, self.selected_model
        );
        self.publish();
        self.spawn_send(pending, handle);
        Ok(())
    }

    fn spawn_send(&mut self, pending: PendingSend, handle: &Actor<Self>) {
        let PendingSend {
            generation,
            request,
        } = pending;
        let model_client = self.model_client.clone();
        let handle = handle.clone();
        let task = tokio::spawn(async move {
            let on_increment = {
                let handle = handle.clone();
                move |text: String| {
                    handle.send(IncrementArrived { generation, text }).ok();
                }
            };
            let outcome = model_client
                .send_request(request, on_increment)
                .await
                .map(|resp| {
                    trace!("generation {generation} ended: {resp:?}");
                });

            handle.send(StreamFinished { generation, outcome }).ok();
            handle.send(TaskEnded(generation)).ok();
        });
        self.running_tasks.insert(generation, task);
    }
}

impl Drop for SessionState {
    fn drop(&mut self) {
        for (_, task) in self.running_tasks.drain() {
            task.abort();
        }
    }
}

#[derive(Debug)]
pub struct Submit(pub String);

impl Request<SessionState> for Submit {
    type Reply = Result<(), SubmitError>;

    #[inline]
    fn handle(
        self,
        state: &mut SessionState,
        handle: &Actor<SessionState>,
    ) -> Self::Reply {
        state.submit(self.0, handle)
    }
}

#[derive(Debug)]
pub struct Clear;

impl Message<SessionState> for Clear {
    fn handle(self, state: &mut SessionState, _handle: &Actor<SessionState>) {
        state.transcript.clear();
        debug!("cleared, now at generation {}", state.transcript.generation());
        state.publish();
    }
}

#[derive(Debug)]
pub struct SelectModel(pub String);

impl Message<SessionState> for SelectModel {
    fn handle(self, state: &mut SessionState, _handle: &Actor<SessionState>) {
        if self.0.trim().is_empty() {
            debug!("ignoring empty model id");
            return;
        }
        if state.selected_model == self.0 {
            return;
        }
        state.selected_model = self.0;
        state.publish();
    }
}

#[derive(Debug)]
pub struct Snapshot;

impl Request<SessionState> for Snapshot {
    type Reply = SessionSnapshot;

    #[inline]
    fn handle(
        self,
        state: &mut SessionState,
        _handle: &Actor<SessionState>,
    ) -> Self::Reply {
        state.snapshot()
    }
}

#[derive(Debug)]
struct IncrementArrived {
    generation: Generation,
    text: String,
}

impl Message<SessionState> for IncrementArrived {
    fn handle(self, state: &mut SessionState, _handle: &Actor<SessionState>) {
        if state.transcript.apply_increment(self.generation, &self.text) {
            state.publish();
        }
    }
}

#[derive(Debug)]
struct StreamFinished {
    generation: Generation,
    outcome: Result<(), StreamFailure>,
}

impl Message<SessionState> for StreamFinished {
    fn handle(self, state: &mut SessionState, _handle: &Actor<SessionState>) {
        if let Err(failure) = &self.outcome {
            info!("generation {} failed: {failure}", self.generation);
        }
        if state.transcript.finish(self.generation, self.outcome) {
            state.publish();
        }
    }
}

#[derive(Debug)]
struct TaskEnded(Generation);

impl Message<SessionState> for TaskEnded {
    #[inline]
    fn handle(self, state: &mut SessionState, _handle: &Actor<SessionState>) {
        if state.running_tasks.remove(&self.0).is_none() {
            warn!("no running task for generation {}", self.0);
        }
    }
}
