//! Attack identifiers and static frame data
//!
//! Every attack in the game is a variant of [`AttackId`] with a fixed
//! [`AttackFrameData`] record. Frame data is authored at 60 fps: an attack
//! occupies `total_frames` frames, its hitbox is live on the inclusive
//! `[active_start, active_end]` window, and a queued follow-up is accepted
//! only while the current frame sits inside the combo window.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::FRAME_DURATION_MS;
use crate::frame::{is_frame_in_combo_window, is_frame_in_window};

/// Cooldown between special attacks (ms)
pub const SPECIAL_COOLDOWN_MS: f64 = 5000.0;
/// Health cost of a special, as a ratio of max HP
pub const SPECIAL_HP_COST_RATIO: f32 = 0.06;

/// Closed set of attack identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttackId {
    /// Player ground chain, first hit
    Light1,
    /// Player ground chain, second hit
    Light2,
    /// Player ground chain, finisher
    Light3,
    /// Player air attack
    AirSlam,
    /// Player special (health cost, long cooldown)
    Special,
    /// Grunt poke
    Jab,
    /// Rusher gap-closer
    Lunge,
    /// Boss overhead, knocks down
    Slam,
}

/// Hitbox shape relative to the attacker's position. The offset mirrors
/// with facing unless `centered` is set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HitboxSpec {
    pub offset: Vec2,
    pub size: Vec2,
    pub centered: bool,
}

/// Forward self-movement applied while the attack's frame sits inside
/// the window (used by lunging attacks)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SelfMove {
    pub start_frame: u32,
    pub end_frame: u32,
    /// Horizontal speed in units/s, applied along facing
    pub speed: f32,
}

/// Static per-attack descriptor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AttackFrameData {
    pub total_frames: u32,
    pub active_start: u32,
    pub active_end: u32,
    pub recovery_start: u32,
    pub combo_window: Option<(u32, u32)>,
    pub damage: i32,
    pub knockback: f32,
    pub causes_knockdown: bool,
    pub hit_stop_ms: f64,
    /// Invulnerability granted to the struck target
    pub hit_invuln_ms: f64,
    pub hit_stun_ms: f64,
    pub knockdown_ms: f64,
    pub hitbox: HitboxSpec,
    /// Times one attack instance may hit the same target (1 = single hit)
    pub max_hits_per_target: u32,
    /// Minimum frames between repeat hits on the same target
    pub re_hit_cooldown_frames: u32,
    pub self_move: Option<SelfMove>,
}

const LIGHT_1: AttackFrameData = AttackFrameData {
    total_frames: 18,
    active_start: 5,
    active_end: 7,
    recovery_start: 10,
    combo_window: Some((8, 14)),
    damage: 8,
    knockback: 90.0,
    causes_knockdown: false,
    hit_stop_ms: 55.0,
    hit_invuln_ms: 120.0,
    hit_stun_ms: 260.0,
    knockdown_ms: 0.0,
    hitbox: HitboxSpec {
        offset: Vec2::new(34.0, -52.0),
        size: Vec2::new(44.0, 34.0),
        centered: false,
    },
    max_hits_per_target: 1,
    re_hit_cooldown_frames: 0,
    self_move: None,
};

const LIGHT_2: AttackFrameData = AttackFrameData {
    total_frames: 20,
    active_start: 6,
    active_end: 8,
    recovery_start: 11,
    combo_window: Some((9, 16)),
    damage: 10,
    knockback: 110.0,
    causes_knockdown: false,
    hit_stop_ms: 60.0,
    hit_invuln_ms: 120.0,
    hit_stun_ms: 300.0,
    knockdown_ms: 0.0,
    hitbox: HitboxSpec {
        offset: Vec2::new(38.0, -50.0),
        size: Vec2::new(48.0, 36.0),
        centered: false,
    },
    max_hits_per_target: 1,
    re_hit_cooldown_frames: 0,
    self_move: None,
};

const LIGHT_3: AttackFrameData = AttackFrameData {
    total_frames: 26,
    active_start: 8,
    active_end: 11,
    recovery_start: 15,
    combo_window: None,
    damage: 16,
    knockback: 220.0,
    causes_knockdown: true,
    hit_stop_ms: 90.0,
    hit_invuln_ms: 200.0,
    hit_stun_ms: 0.0,
    knockdown_ms: 900.0,
    hitbox: HitboxSpec {
        offset: Vec2::new(42.0, -48.0),
        size: Vec2::new(56.0, 44.0),
        centered: false,
    },
    max_hits_per_target: 1,
    re_hit_cooldown_frames: 0,
    self_move: Some(SelfMove {
        start_frame: 4,
        end_frame: 9,
        speed: 180.0,
    }),
};

const AIR_SLAM: AttackFrameData = AttackFrameData {
    total_frames: 22,
    active_start: 4,
    active_end: 12,
    recovery_start: 14,
    combo_window: None,
    damage: 12,
    knockback: 160.0,
    causes_knockdown: true,
    hit_stop_ms: 70.0,
    hit_invuln_ms: 180.0,
    hit_stun_ms: 0.0,
    knockdown_ms: 800.0,
    hitbox: HitboxSpec {
        offset: Vec2::new(24.0, -30.0),
        size: Vec2::new(52.0, 50.0),
        centered: false,
    },
    max_hits_per_target: 1,
    re_hit_cooldown_frames: 0,
    self_move: None,
};

const SPECIAL: AttackFrameData = AttackFrameData {
    total_frames: 34,
    active_start: 7,
    active_end: 18,
    recovery_start: 22,
    combo_window: None,
    damage: 6,
    knockback: 260.0,
    causes_knockdown: true,
    hit_stop_ms: 80.0,
    hit_invuln_ms: 100.0,
    hit_stun_ms: 0.0,
    knockdown_ms: 1000.0,
    hitbox: HitboxSpec {
        offset: Vec2::new(0.0, -48.0),
        size: Vec2::new(130.0, 70.0),
        centered: true,
    },
    // Spin attack: may clip the same target twice with a gap
    max_hits_per_target: 2,
    re_hit_cooldown_frames: 6,
    self_move: None,
};

const JAB: AttackFrameData = AttackFrameData {
    total_frames: 24,
    active_start: 8,
    active_end: 10,
    recovery_start: 13,
    combo_window: None,
    damage: 6,
    knockback: 80.0,
    causes_knockdown: false,
    hit_stop_ms: 50.0,
    hit_invuln_ms: 140.0,
    hit_stun_ms: 320.0,
    knockdown_ms: 0.0,
    hitbox: HitboxSpec {
        offset: Vec2::new(32.0, -50.0),
        size: Vec2::new(40.0, 32.0),
        centered: false,
    },
    max_hits_per_target: 1,
    re_hit_cooldown_frames: 0,
    self_move: None,
};

const LUNGE: AttackFrameData = AttackFrameData {
    total_frames: 30,
    active_start: 10,
    active_end: 15,
    recovery_start: 19,
    combo_window: None,
    damage: 9,
    knockback: 140.0,
    causes_knockdown: false,
    hit_stop_ms: 60.0,
    hit_invuln_ms: 150.0,
    hit_stun_ms: 360.0,
    knockdown_ms: 0.0,
    hitbox: HitboxSpec {
        offset: Vec2::new(36.0, -46.0),
        size: Vec2::new(48.0, 38.0),
        centered: false,
    },
    max_hits_per_target: 1,
    re_hit_cooldown_frames: 0,
    self_move: Some(SelfMove {
        start_frame: 6,
        end_frame: 14,
        speed: 320.0,
    }),
};

const SLAM: AttackFrameData = AttackFrameData {
    total_frames: 44,
    active_start: 18,
    active_end: 22,
    recovery_start: 28,
    combo_window: None,
    damage: 20,
    knockback: 240.0,
    causes_knockdown: true,
    hit_stop_ms: 110.0,
    hit_invuln_ms: 250.0,
    hit_stun_ms: 0.0,
    knockdown_ms: 1100.0,
    hitbox: HitboxSpec {
        offset: Vec2::new(44.0, -44.0),
        size: Vec2::new(64.0, 56.0),
        centered: false,
    },
    max_hits_per_target: 1,
    re_hit_cooldown_frames: 0,
    self_move: None,
};

impl AttackId {
    /// Static frame data for this attack
    pub fn data(&self) -> &'static AttackFrameData {
        match self {
            AttackId::Light1 => &LIGHT_1,
            AttackId::Light2 => &LIGHT_2,
            AttackId::Light3 => &LIGHT_3,
            AttackId::AirSlam => &AIR_SLAM,
            AttackId::Special => &SPECIAL,
            AttackId::Jab => &JAB,
            AttackId::Lunge => &LUNGE,
            AttackId::Slam => &SLAM,
        }
    }

    /// Attacks that may only start while airborne
    pub fn is_air(&self) -> bool {
        matches!(self, AttackId::AirSlam)
    }

    /// Next attack in the player's ground chain, if any
    pub fn follow_up(&self) -> Option<AttackId> {
        match self {
            AttackId::Light1 => Some(AttackId::Light2),
            AttackId::Light2 => Some(AttackId::Light3),
            _ => None,
        }
    }

    /// Total attack duration in milliseconds
    pub fn duration_ms(&self) -> f64 {
        self.data().total_frames as f64 * FRAME_DURATION_MS
    }

    /// True while the hitbox is live on this frame
    pub fn is_frame_active(&self, frame: u32) -> bool {
        let d = self.data();
        is_frame_in_window(frame, d.active_start, d.active_end)
    }

    /// True while a buffered follow-up may be queued on this frame
    pub fn is_frame_in_combo_window(&self, frame: u32) -> bool {
        is_frame_in_combo_window(frame, self.data().combo_window)
    }

    /// All attack identifiers, for table validation
    pub fn all() -> [AttackId; 8] {
        [
            AttackId::Light1,
            AttackId::Light2,
            AttackId::Light3,
            AttackId::AirSlam,
            AttackId::Special,
            AttackId::Jab,
            AttackId::Lunge,
            AttackId::Slam,
        ]
    }
}

/// Validate every attack record's frame-window invariants. Content bugs
/// in the static table are caught here (and in tests), not at runtime.
pub fn validate_attack_table() -> Result<(), String> {
    for id in AttackId::all() {
        let d = id.data();
        if d.active_start > d.active_end {
            return Err(format!("{id:?}: active_start > active_end"));
        }
        if d.active_end >= d.total_frames {
            return Err(format!("{id:?}: active_end >= total_frames"));
        }
        if d.recovery_start < d.active_end {
            return Err(format!("{id:?}: recovery_start < active_end"));
        }
        if let Some((start, end)) = d.combo_window {
            if start > end || end >= d.total_frames {
                return Err(format!("{id:?}: bad combo window"));
            }
        }
        if d.damage <= 0 {
            return Err(format!("{id:?}: non-positive damage"));
        }
        if d.max_hits_per_target == 0 {
            return Err(format!("{id:?}: max_hits_per_target must be >= 1"));
        }
    }
    Ok(())
}
