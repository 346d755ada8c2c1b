//! Pending modal waiters.
//!
//! A handler that awaits a modal registers a one-shot slot keyed by the
//! modal's custom id and the invoking user. The dispatcher offers every modal
//! submission here before routing it, so a matching submission is delivered to
//! the waiting handler instead of a registered modal handler.

use std::collections::HashMap;

use cubebot_core::{Interaction, InteractionKind};
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::trace;

type WaiterKey = (String, String);

/// Pending await-modal slots.
#[derive(Default)]
pub struct ModalWaiters {
    pending: Mutex<HashMap<WaiterKey, oneshot::Sender<Interaction>>>,
}

impl ModalWaiters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a slot, replacing any earlier one for the same key.
    pub fn register(
        &self,
        custom_id: impl Into<String>,
        user_id: impl Into<String>,
    ) -> oneshot::Receiver<Interaction> {
        let (tx, rx) = oneshot::channel();
        self.pending
            .lock()
            .insert((custom_id.into(), user_id.into()), tx);
        rx
    }

    /// Removes a slot without delivering anything.
    pub fn cancel(&self, custom_id: &str, user_id: &str) {
        self.pending
            .lock()
            .remove(&(custom_id.to_string(), user_id.to_string()));
    }

    /// Delivers a modal submission to its waiter.
    ///
    /// Returns the interaction back when nobody claims it.
    pub fn offer(&self, interaction: Interaction) -> Result<(), Interaction> {
        let InteractionKind::ModalSubmit(data) = &interaction.kind else {
            return Err(interaction);
        };
        let key = (data.custom_id.clone(), interaction.user.id.clone());
        let Some(tx) = self.pending.lock().remove(&key) else {
            return Err(interaction);
        };
        trace!(custom_id = %key.0, user = %key.1, "Delivering modal submission to waiter");
        tx.send(interaction)
    }

    /// Returns the number of pending slots.
    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }
}

impl std::fmt::Debug for ModalWaiters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModalWaiters")
            .field("pending", &self.len())
            .finish()
    }
}
