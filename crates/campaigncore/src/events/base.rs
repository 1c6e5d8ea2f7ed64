use crate::{CampaignId, ExecutionResult, ModuleId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

pub type ExecutionId = Uuid;

/// Events emitted during a campaign run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ExecutionEvent {
    RunStarted {
        execution_id: ExecutionId,
        campaign_id: CampaignId,
        modules: usize,
        timestamp: DateTime<Utc>,
    },
    RunCompleted {
        execution_id: ExecutionId,
        succeeded: usize,
        failed: usize,
        forced: usize,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
    ModuleStarted {
        execution_id: ExecutionId,
        module_id: ModuleId,
        module_type: String,
        timestamp: DateTime<Utc>,
    },
    ModuleCompleted {
        execution_id: ExecutionId,
        module_id: ModuleId,
        result: ExecutionResult,
        timestamp: DateTime<Utc>,
    },
    /// A module was promoted to complete without running, to break a
    /// scheduling deadlock
    ModuleForced {
        execution_id: ExecutionId,
        module_id: ModuleId,
        timestamp: DateTime<Utc>,
    },
}

impl ExecutionEvent {
    pub fn execution_id(&self) -> ExecutionId {
        match self {
            ExecutionEvent::RunStarted { execution_id, .. }
            | ExecutionEvent::RunCompleted { execution_id, .. }
            | ExecutionEvent::ModuleStarted { execution_id, .. }
            | ExecutionEvent::ModuleCompleted { execution_id, .. }
            | ExecutionEvent::ModuleForced { execution_id, .. } => *execution_id,
        }
    }
}

/// Process-wide broadcast of execution events
pub struct EventBus {
    sender: broadcast::Sender<ExecutionEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ExecutionEvent> {
        self.sender.subscribe()
    }

    /// Send an event to current subscribers. Having none is not an error.
    pub fn emit(&self, event: ExecutionEvent) {
        let _ = self.sender.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_events() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();
        let execution_id = Uuid::new_v4();

        bus.emit(ExecutionEvent::ModuleForced {
            execution_id,
            module_id: "a".to_string(),
            timestamp: Utc::now(),
        });

        let event = rx.recv().await.unwrap();
        assert_eq!(event.execution_id(), execution_id);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "ModuleForced");
    }

    #[test]
    fn emit_without_subscribers_is_fine() {
        let bus = EventBus::new(1);
        bus.emit(ExecutionEvent::ModuleForced {
            execution_id: Uuid::new_v4(),
            module_id: "a".to_string(),
            timestamp: Utc::now(),
        });
    }
}
