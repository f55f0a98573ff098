//! Simulation events
//!
//! One-way notifications for collaborators (audio, score, UI). The
//! simulation pushes events during a tick; the host drains them afterward
//! in order. No callbacks are registered with the core.

use serde::{Deserialize, Serialize};

use crate::attack::AttackId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SimEvent {
    /// An attack connected
    Hit {
        attacker: String,
        target: String,
        remaining_hp: i32,
        attack: AttackId,
        at_ms: f64,
    },
    /// A combatant was knocked down
    Knockdown { target: String },
    /// A combatant died
    Death { id: String },
    ZoneActivated { zone: u32 },
    ZoneCleared { zone: u32 },
    EnemySpawned { id: String, zone: u32 },
}
