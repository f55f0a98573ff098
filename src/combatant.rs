//! Per-actor combat state machine
//!
//! One [`Combatant`] models either the player or an AI-controlled enemy:
//! position, health, facing, the discrete combat state, the in-progress
//! attack (an explicit `Option`, constructed on start and discarded on
//! completion), and the timestamp-based timers for hit-stun, knockdown,
//! getup and invulnerability.
//!
//! The per-tick update order is fixed and must not be rearranged:
//! timers -> jump arc -> attack frames -> movement integration.

use std::collections::HashMap;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::attack::{AttackId, SPECIAL_COOLDOWN_MS, SPECIAL_HP_COST_RATIO};
use crate::combat::DamageEvent;
use crate::consts::*;
use crate::frame::Rect;

/// Which side a combatant fights for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Team {
    Player,
    Enemy,
}

impl Team {
    pub fn opposes(&self, other: Team) -> bool {
        *self != other
    }
}

/// Discrete combat state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CombatantState {
    Idle,
    Walk,
    Attack1,
    Attack2,
    Attack3,
    Jump,
    AirAttack,
    Special,
    Hit,
    Knockdown,
    Getup,
    Dead,
}

/// Per-target bookkeeping within one attack instance
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HitRecord {
    pub hits: u32,
    pub last_hit_frame: u32,
}

/// An attack in progress. Created by `try_start_attack`, discarded when the
/// final frame elapses or the owner takes a hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttackRuntime {
    pub id: AttackId,
    pub elapsed_ms: f64,
    /// Targets already struck by this instance
    pub targets_hit: HashMap<String, HitRecord>,
    /// Follow-up queued during the combo window
    pub queued_next: Option<AttackId>,
}

impl AttackRuntime {
    pub fn new(id: AttackId) -> Self {
        Self {
            id,
            elapsed_ms: 0.0,
            targets_hit: HashMap::new(),
            queued_next: None,
        }
    }

    /// Current frame index, clamped to the last frame
    pub fn frame(&self) -> u32 {
        let frame = (self.elapsed_ms / FRAME_DURATION_MS) as u32;
        frame.min(self.id.data().total_frames - 1)
    }

    pub fn is_finished(&self) -> bool {
        self.elapsed_ms >= self.id.duration_ms()
    }

    /// Whether this instance may still hit `target_id` on the current frame.
    /// Default is one hit per instance; multi-hit attacks opt in through
    /// `max_hits_per_target` and `re_hit_cooldown_frames`.
    pub fn may_hit(&self, target_id: &str) -> bool {
        let d = self.id.data();
        match self.targets_hit.get(target_id) {
            None => true,
            Some(rec) => {
                rec.hits < d.max_hits_per_target
                    && self.frame() >= rec.last_hit_frame + d.re_hit_cooldown_frames
            }
        }
    }

    pub fn record_hit(&mut self, target_id: &str) {
        let frame = self.frame();
        let rec = self
            .targets_hit
            .entry(target_id.to_string())
            .or_insert(HitRecord {
                hits: 0,
                last_hit_frame: frame,
            });
        rec.hits += 1;
        rec.last_hit_frame = frame;
    }
}

fn attack_state(id: AttackId) -> CombatantState {
    match id {
        AttackId::Light1 | AttackId::Jab => CombatantState::Attack1,
        AttackId::Light2 | AttackId::Lunge => CombatantState::Attack2,
        AttackId::Light3 | AttackId::Slam => CombatantState::Attack3,
        AttackId::AirSlam => CombatantState::AirAttack,
        AttackId::Special => CombatantState::Special,
    }
}

/// A single combatant (player or enemy)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Combatant {
    pub id: String,
    pub team: Team,
    /// Feet position; `y` also selects the occupied rail
    pub pos: Vec2,
    /// Horizontal facing, -1.0 or 1.0
    pub facing: f32,
    pub hp: i32,
    pub max_hp: i32,
    /// Walk speed in units/s
    pub move_speed: f32,
    pub state: CombatantState,
    pub attack: Option<AttackRuntime>,
    /// Desired movement direction for this tick, set by input or AI
    pub move_intent: Vec2,
    /// Height above the rail while airborne
    pub jump_height: f32,
    /// Vertical jump velocity, positive is up
    pub jump_vel: f32,
    /// Horizontal knockback velocity, decays during hit states
    pub knockback_vel: f32,
    pub hit_stun_until: f64,
    pub knockdown_until: f64,
    pub getup_until: f64,
    pub invulnerable_until: f64,
    pub special_ready_at: f64,
}

impl Combatant {
    pub fn new(id: impl Into<String>, team: Team, pos: Vec2, max_hp: i32, move_speed: f32) -> Self {
        Self {
            id: id.into(),
            team,
            pos,
            facing: 1.0,
            hp: max_hp,
            max_hp,
            move_speed,
            state: CombatantState::Idle,
            attack: None,
            move_intent: Vec2::ZERO,
            jump_height: 0.0,
            jump_vel: 0.0,
            knockback_vel: 0.0,
            hit_stun_until: 0.0,
            knockdown_until: 0.0,
            getup_until: 0.0,
            invulnerable_until: 0.0,
            special_ready_at: 0.0,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.state != CombatantState::Dead
    }

    pub fn is_attacking(&self) -> bool {
        self.attack.is_some()
    }

    pub fn is_airborne(&self) -> bool {
        self.jump_height > 0.0 || (self.state == CombatantState::Jump && self.jump_vel > 0.0)
    }

    /// Hit, knocked down, or getting up: no voluntary actions
    pub fn is_incapacitated(&self) -> bool {
        matches!(
            self.state,
            CombatantState::Hit | CombatantState::Knockdown | CombatantState::Getup
        )
    }

    pub fn current_attack_frame(&self) -> Option<u32> {
        self.attack.as_ref().map(|rt| rt.frame())
    }

    /// Try to start an attack. Returns false (and changes nothing) if the
    /// combatant is dead, busy, or the ground/air pairing is wrong.
    pub fn try_start_attack(&mut self, id: AttackId, now_ms: f64) -> bool {
        if !self.is_alive() || self.is_attacking() || self.is_incapacitated() {
            return false;
        }
        if id.is_air() != self.is_airborne() {
            return false;
        }
        if id == AttackId::Special {
            if now_ms < self.special_ready_at {
                return false;
            }
            let cost = (self.max_hp as f32 * SPECIAL_HP_COST_RATIO).round() as i32;
            if self.hp - cost < SPECIAL_MIN_HP {
                return false;
            }
            self.hp -= cost;
            self.special_ready_at = now_ms + SPECIAL_COOLDOWN_MS;
        }
        self.attack = Some(AttackRuntime::new(id));
        self.state = attack_state(id);
        self.move_intent = Vec2::ZERO;
        true
    }

    /// Queue the chain follow-up if the current attack is inside its combo
    /// window and nothing is queued yet
    pub fn try_queue_follow_up(&mut self) -> bool {
        let Some(rt) = self.attack.as_mut() else {
            return false;
        };
        if rt.queued_next.is_some() {
            return false;
        }
        let Some(next) = rt.id.follow_up() else {
            return false;
        };
        if !rt.id.is_frame_in_combo_window(rt.frame()) {
            return false;
        }
        rt.queued_next = Some(next);
        true
    }

    /// Start the jump arc. Grounded, free combatants only.
    pub fn try_jump(&mut self) -> bool {
        if !self.is_alive()
            || self.is_attacking()
            || self.is_incapacitated()
            || self.is_airborne()
        {
            return false;
        }
        self.jump_vel = JUMP_VELOCITY;
        self.state = CombatantState::Jump;
        true
    }

    /// Hitbox of the current attack, present only on active frames.
    /// The X offset mirrors with facing unless the attack is centered.
    pub fn active_hitbox(&self) -> Option<Rect> {
        let rt = self.attack.as_ref()?;
        let frame = rt.frame();
        if !rt.id.is_frame_active(frame) {
            return None;
        }
        let hb = rt.id.data().hitbox;
        let ox = if hb.centered {
            hb.offset.x
        } else {
            hb.offset.x * self.facing
        };
        let center = Vec2::new(
            self.pos.x + ox,
            self.pos.y + hb.offset.y - self.jump_height,
        );
        Some(Rect::centered(center, hb.size))
    }

    /// Body rectangle hits are tested against. Smaller prone box while
    /// knocked down, otherwise a standing box lifted by jump height.
    pub fn hurtbox(&self) -> Rect {
        if self.state == CombatantState::Knockdown {
            Rect {
                x: self.pos.x - PRONE_HURTBOX_WIDTH / 2.0,
                y: self.pos.y - PRONE_HURTBOX_HEIGHT,
                w: PRONE_HURTBOX_WIDTH,
                h: PRONE_HURTBOX_HEIGHT,
            }
        } else {
            Rect {
                x: self.pos.x - HURTBOX_WIDTH / 2.0,
                y: self.pos.y - HURTBOX_HEIGHT - self.jump_height,
                w: HURTBOX_WIDTH,
                h: HURTBOX_HEIGHT,
            }
        }
    }

    /// Apply an incoming hit. Returns false when dead or invulnerable;
    /// callers must not record a hit or play feedback on a rejection.
    pub fn apply_damage(&mut self, ev: &DamageEvent, now_ms: f64) -> bool {
        if !self.is_alive() || now_ms < self.invulnerable_until {
            return false;
        }
        self.hp = (self.hp - ev.damage).max(0);
        self.invulnerable_until = now_ms + ev.hit_invuln_ms;
        let away = if self.pos.x >= ev.source_x { 1.0 } else { -1.0 };
        self.knockback_vel = away * ev.knockback;
        // Taking a hit cancels any attack in progress
        self.attack = None;
        self.move_intent = Vec2::ZERO;
        if self.hp == 0 {
            self.state = CombatantState::Dead;
        } else if ev.causes_knockdown {
            self.state = CombatantState::Knockdown;
            self.knockdown_until = now_ms + ev.knockdown_ms;
        } else {
            self.state = CombatantState::Hit;
            self.hit_stun_until = now_ms + ev.hit_stun_ms;
        }
        true
    }

    /// Restore HP, clamped at max. Returns the amount actually restored.
    pub fn heal(&mut self, amount: i32) -> i32 {
        if !self.is_alive() {
            return 0;
        }
        let restored = amount.min(self.max_hp - self.hp).max(0);
        self.hp += restored;
        restored
    }

    /// Advance this combatant by one tick
    pub fn update(&mut self, dt_ms: f64, now_ms: f64) {
        if self.state == CombatantState::Dead {
            return;
        }
        let dt_s = (dt_ms / 1000.0) as f32;

        // 1. State-expiry timers
        match self.state {
            CombatantState::Hit if now_ms >= self.hit_stun_until => {
                self.state = if self.is_airborne() {
                    CombatantState::Jump
                } else {
                    CombatantState::Idle
                };
            }
            CombatantState::Knockdown if now_ms >= self.knockdown_until => {
                self.state = CombatantState::Getup;
                self.getup_until = now_ms + GETUP_DURATION_MS;
            }
            CombatantState::Getup if now_ms >= self.getup_until => {
                self.state = CombatantState::Idle;
            }
            _ => {}
        }

        // 2. Jump arc
        if self.is_airborne() {
            self.jump_vel -= JUMP_GRAVITY * dt_s;
            self.jump_height += self.jump_vel * dt_s;
            if self.jump_height <= 0.0 {
                self.jump_height = 0.0;
                self.jump_vel = 0.0;
                if self.state == CombatantState::Jump {
                    self.state = CombatantState::Idle;
                }
            }
        }

        // 3. Attack frame advance
        if let Some(rt) = self.attack.as_mut() {
            rt.elapsed_ms += dt_ms;
            let frame = rt.frame();
            if let Some(mv) = rt.id.data().self_move {
                if frame >= mv.start_frame && frame <= mv.end_frame {
                    self.pos.x += self.facing * mv.speed * dt_s;
                }
            }
            if rt.is_finished() {
                let queued = rt.queued_next.take();
                self.attack = None;
                match queued {
                    Some(next) => {
                        self.attack = Some(AttackRuntime::new(next));
                        self.state = attack_state(next);
                    }
                    None => {
                        self.state = if self.is_airborne() {
                            CombatantState::Jump
                        } else {
                            CombatantState::Idle
                        };
                    }
                }
            }
        }

        // 4. Movement integration
        if self.is_incapacitated() {
            // Only knockback moves a stunned combatant
            self.pos.x += self.knockback_vel * dt_s;
            self.knockback_vel *= (1.0 - KNOCKBACK_DECAY * dt_s).max(0.0);
            return;
        }
        self.knockback_vel = 0.0;
        if self.is_attacking() {
            return;
        }
        if self.move_intent.length_squared() > 0.0001 {
            self.pos += self.move_intent * self.move_speed * dt_s;
            if self.move_intent.x.abs() > 0.01 {
                self.facing = self.move_intent.x.signum();
            }
            if self.state == CombatantState::Idle {
                self.state = CombatantState::Walk;
            }
        } else if self.state == CombatantState::Walk {
            self.state = CombatantState::Idle;
        }
    }
}
