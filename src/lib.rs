//! Railbrawl - deterministic combat core for a side-scrolling brawler
//!
//! All gameplay logic lives here. This crate must be pure and deterministic:
//! - Explicit (dt_ms, now_ms) timestep fed by the host loop
//! - Seeded RNG only
//! - Stable iteration order (array order by spawn)
//! - No rendering, audio, or platform dependencies
//!
//! Core modules:
//! - `frame`: rectangle overlap and frame-window math
//! - `attack`: attack identifiers and static frame data
//! - `combatant`: per-actor state machine (player and enemies)
//! - `combat`: hit resolution and shared hit-stop
//! - `nav`: rail-based walkable area and barrier tests
//! - `ai`: enemy decision step and attack-pressure arbitration
//! - `encounter`: zone activation, spawning, objectives
//! - `sim`: top-level simulation state and tick

pub mod ai;
pub mod attack;
pub mod combat;
pub mod combatant;
pub mod encounter;
pub mod events;
pub mod frame;
pub mod nav;
pub mod sim;

pub use attack::{AttackFrameData, AttackId};
pub use combat::{DamageEvent, HitStop};
pub use combatant::{AttackRuntime, Combatant, CombatantState, Team};
pub use events::SimEvent;
pub use sim::{Simulation, StageLayout, TickInput};

/// Simulation tuning constants
pub mod consts {
    /// Duration of one animation frame in milliseconds (60 fps frame data)
    pub const FRAME_DURATION_MS: f64 = 1000.0 / 60.0;

    /// Fixed getup duration after a knockdown expires
    pub const GETUP_DURATION_MS: f64 = 520.0;

    /// Gravity applied to the jump arc (units/s^2)
    pub const JUMP_GRAVITY: f32 = 2400.0;
    /// Initial upward jump velocity (units/s)
    pub const JUMP_VELOCITY: f32 = 760.0;

    /// Knockback horizontal decay factor per second
    pub const KNOCKBACK_DECAY: f32 = 6.0;

    /// Total attack pressure the enemy group may hold at once
    pub const ATTACK_PRESSURE_BUDGET: u32 = 3;

    /// Randomized pre-attack windup range (ms)
    pub const WINDUP_MIN_MS: f64 = 80.0;
    pub const WINDUP_MAX_MS: f64 = 120.0;

    /// Special attacks may never reduce the user below this HP
    pub const SPECIAL_MIN_HP: i32 = 1;

    /// Default standing hurtbox size
    pub const HURTBOX_WIDTH: f32 = 36.0;
    pub const HURTBOX_HEIGHT: f32 = 88.0;
    /// Prone hurtbox while knocked down
    pub const PRONE_HURTBOX_WIDTH: f32 = 52.0;
    pub const PRONE_HURTBOX_HEIGHT: f32 = 32.0;
}
