//! World events and the broadcast bus that carries them.
//!
//! Subscribers that fall behind skip ahead (`RecvError::Lagged`); publishing
//! never blocks and never fails the tick.

use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::ai::utility::Goal;
use crate::state::{VehicleRole, WorldSnapshot};
use crate::vehicle::aero::SpoilerChange;
use crate::vehicle::simulator::TickReport;

pub const DEFAULT_EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SimEvent {
    Snapshot(WorldSnapshot),
    GearShift {
        vehicle_id: Uuid,
        from: usize,
        to: usize,
    },
    Spoiler {
        vehicle_id: Uuid,
        deployed: bool,
    },
    GoalChanged {
        vehicle_id: Uuid,
        from: Option<Goal>,
        to: Goal,
    },
    Escalated {
        heat: f32,
        aggression: f32,
    },
    MissionTimedOut {
        elapsed: f32,
    },
    VehicleSpawned {
        vehicle_id: Uuid,
        role: VehicleRole,
    },
    VehicleRemoved {
        vehicle_id: Uuid,
    },
}

impl SimEvent {
    /// Shift and spoiler transitions from one simulator step.
    pub fn from_report(vehicle_id: Uuid, report: &TickReport) -> Vec<SimEvent> {
        let mut events = Vec::new();
        if let Some(shift) = report.shift {
            events.push(SimEvent::GearShift { vehicle_id, from: shift.from, to: shift.to });
        }
        if let Some(change) = report.spoiler {
            events.push(SimEvent::Spoiler {
                vehicle_id,
                deployed: change == SpoilerChange::Deployed,
            });
        }
        events
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SimEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Returns how many subscribers received the event (0 when nobody listens).
    pub fn publish(&self, event: SimEvent) -> usize {
        self.tx.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SimEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
