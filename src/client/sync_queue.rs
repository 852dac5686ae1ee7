use crate::domain::{NewSubscription, SubscriptionId, SubscriptionPatch};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use uuid::Uuid;

/// A mutation applied locally and not yet acknowledged by the backend.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PendingOperation {
    pub operation_id: Uuid,
    pub operation: Operation,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Operation {
    Create {
        local_id: SubscriptionId,
        payload: NewSubscription,
    },
    Update {
        id: SubscriptionId,
        payload: SubscriptionPatch,
    },
    Delete {
        id: SubscriptionId,
    },
}

impl Operation {
    /// The subscription the operation acts on.
    pub fn target(&self) -> &SubscriptionId {
        match self {
            Self::Create { local_id, .. } => local_id,
            Self::Update { id, .. } | Self::Delete { id } => id,
        }
    }
}

/// FIFO of pending operations. Drained strictly in order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SyncQueue {
    operations: VecDeque<PendingOperation>,
}

impl SyncQueue {
    pub fn push(&mut self, operation: Operation) -> Uuid {
        let operation_id = Uuid::new_v4();
        self.operations.push_back(PendingOperation {
            operation_id,
            operation,
        });
        operation_id
    }

    pub fn front(&self) -> Option<&PendingOperation> {
        self.operations.front()
    }

    pub fn pop_front(&mut self) -> Option<PendingOperation> {
        self.operations.pop_front()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingOperation> {
        self.operations.iter()
    }

    pub fn has_pending_create(&self, id: &SubscriptionId) -> bool {
        self.operations.iter().any(|pending| {
            matches!(&pending.operation, Operation::Create { local_id, .. } if local_id == id)
        })
    }

    /// Points every queued operation on `from` at `to`. Called once the
    /// backend has assigned a real id to a locally created subscription.
    pub fn remap_id(&mut self, from: &SubscriptionId, to: &SubscriptionId) {
        for pending in self.operations.iter_mut() {
            match &mut pending.operation {
                Operation::Update { id, .. } | Operation::Delete { id } if *id == *from => {
                    *id = to.clone();
                }
                _ => {}
            }
        }
    }

    /// Drops every operation on `id`. Returns how many were dropped.
    pub fn discard(&mut self, id: &SubscriptionId) -> usize {
        let before = self.operations.len();
        self.operations
            .retain(|pending| pending.operation.target() != id);
        before - self.operations.len()
    }
}
