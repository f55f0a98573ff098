//! Enemy decision step and attack-pressure arbitration
//!
//! Each enemy runs one decision per tick: align to the player's rail,
//! approach, or ask for permission to attack. Permission is a scarce
//! token drawn from a shared pressure budget so the whole group never
//! swings at once. The token map is an explicit state object owned by
//! the simulation, never a global.

use std::collections::HashMap;

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::attack::AttackId;
use crate::combatant::Combatant;
use crate::consts::{WINDUP_MAX_MS, WINDUP_MIN_MS};
use crate::nav::{Barrier, NavMesh};

/// Behavioral archetype; controllers and bosses close in more cautiously
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AiRole {
    Grunt,
    Rusher,
    Controller,
    Boss,
}

/// Static per-enemy combat tuning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CombatProfile {
    pub attack: AttackId,
    /// Horizontal reach required before attacking
    pub attack_range_x: f32,
    /// Vertical (rail) reach required before attacking
    pub attack_range_y: f32,
    pub attack_cooldown_ms: f64,
    /// Token lifetime if not renewed
    pub token_timeout_ms: f64,
    /// Pressure this enemy occupies while entitled to attack
    pub pressure_cost: u32,
    /// Rail delta below which the enemy counts as lane-aligned
    pub rail_snap_tolerance: f32,
    /// How far off the player's exact rail center this enemy aims
    pub flank_bias: f32,
    pub role: AiRole,
}

impl CombatProfile {
    pub fn grunt() -> Self {
        Self {
            attack: AttackId::Jab,
            attack_range_x: 70.0,
            attack_range_y: 24.0,
            attack_cooldown_ms: 1400.0,
            token_timeout_ms: 900.0,
            pressure_cost: 1,
            rail_snap_tolerance: 10.0,
            flank_bias: 26.0,
            role: AiRole::Grunt,
        }
    }

    pub fn rusher() -> Self {
        Self {
            attack: AttackId::Lunge,
            attack_range_x: 120.0,
            attack_range_y: 22.0,
            attack_cooldown_ms: 2000.0,
            token_timeout_ms: 1100.0,
            pressure_cost: 1,
            rail_snap_tolerance: 12.0,
            flank_bias: 34.0,
            role: AiRole::Rusher,
        }
    }

    pub fn controller() -> Self {
        Self {
            attack: AttackId::Jab,
            attack_range_x: 80.0,
            attack_range_y: 26.0,
            attack_cooldown_ms: 2600.0,
            token_timeout_ms: 1000.0,
            pressure_cost: 1,
            rail_snap_tolerance: 10.0,
            flank_bias: 48.0,
            role: AiRole::Controller,
        }
    }

    pub fn boss() -> Self {
        Self {
            attack: AttackId::Slam,
            attack_range_x: 100.0,
            attack_range_y: 30.0,
            attack_cooldown_ms: 2400.0,
            token_timeout_ms: 1400.0,
            pressure_cost: 2,
            rail_snap_tolerance: 14.0,
            flank_bias: 20.0,
            role: AiRole::Boss,
        }
    }
}

/// A granted attack entitlement
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AttackToken {
    pub cost: u32,
    pub expires_at: f64,
}

/// Shared pressure budget. At most `budget` worth of token cost may be
/// held at once, except that an empty map always grants, so some enemy can
/// always make progress.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttackArbiter {
    tokens: HashMap<String, AttackToken>,
    budget: u32,
}

impl AttackArbiter {
    pub fn new(budget: u32) -> Self {
        Self {
            tokens: HashMap::new(),
            budget,
        }
    }

    /// Drop expired tokens. Must run before any grant decision in the
    /// tick so stale entries cannot inflate the occupied sum.
    pub fn prune_expired(&mut self, now_ms: f64) {
        self.tokens.retain(|_, t| t.expires_at > now_ms);
    }

    /// Total pressure currently held
    pub fn occupied(&self) -> u32 {
        self.tokens.values().map(|t| t.cost).sum()
    }

    pub fn holds(&self, id: &str) -> bool {
        self.tokens.contains_key(id)
    }

    /// Request (or renew) a token. A renewal refreshes the expiry without
    /// re-checking the budget.
    pub fn request(&mut self, id: &str, cost: u32, timeout_ms: f64, now_ms: f64) -> bool {
        self.prune_expired(now_ms);
        let expires_at = now_ms + timeout_ms;
        if let Some(token) = self.tokens.get_mut(id) {
            token.expires_at = expires_at;
            return true;
        }
        if !self.tokens.is_empty() && self.occupied() + cost > self.budget {
            return false;
        }
        self.tokens.insert(id.to_string(), AttackToken { cost, expires_at });
        true
    }

    pub fn release(&mut self, id: &str) {
        self.tokens.remove(id);
    }
}

/// Stable per-id parity used to alternate flank direction between enemies
fn flank_sign(id: &str) -> f32 {
    let checksum: u32 = id.bytes().map(u32::from).sum();
    if checksum % 2 == 0 { 1.0 } else { -1.0 }
}

/// Per-enemy AI state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnemyAi {
    pub profile: CombatProfile,
    /// Attack cooldown gate
    pub next_attack_at: f64,
    /// Pending windup deadline once a token is granted
    pub windup_until: Option<f64>,
}

impl EnemyAi {
    pub fn new(profile: CombatProfile) -> Self {
        Self {
            profile,
            next_attack_at: 0.0,
            windup_until: None,
        }
    }

    /// One decision step. Writes `body.move_intent` and may start an attack.
    #[allow(clippy::too_many_arguments)]
    pub fn update(
        &mut self,
        body: &mut Combatant,
        player_pos: Vec2,
        nav: &NavMesh,
        barriers: &[Barrier],
        arbiter: &mut AttackArbiter,
        rng: &mut Pcg32,
        now_ms: f64,
        dt_ms: f64,
    ) {
        let p = &self.profile;

        // Dead, mid-attack, or stunned: give the budget back and stand down
        if !body.is_alive() || body.is_attacking() || body.is_incapacitated() {
            arbiter.release(&body.id);
            self.windup_until = None;
            body.move_intent = Vec2::ZERO;
            return;
        }

        // Aim for a point biased off the player's rail center so enemies
        // spread out instead of stacking
        let anchor = nav.project_to_nearest_rail(player_pos.x, player_pos.y);
        let target =
            nav.project_to_nearest_rail(anchor.x, anchor.y + flank_sign(&body.id) * p.flank_bias);
        let dx = target.x - body.pos.x;
        let rail_delta = target.y - body.pos.y;

        let in_range = dx.abs() <= p.attack_range_x && rail_delta.abs() <= p.attack_range_y;
        if in_range {
            body.move_intent = Vec2::ZERO;
            if now_ms < self.next_attack_at {
                arbiter.release(&body.id);
                self.windup_until = None;
                return;
            }
            if !arbiter.request(&body.id, p.pressure_cost, p.token_timeout_ms, now_ms) {
                self.windup_until = None;
                return;
            }
            match self.windup_until {
                None => {
                    // Brief randomized windup before committing
                    self.windup_until =
                        Some(now_ms + rng.random_range(WINDUP_MIN_MS..=WINDUP_MAX_MS));
                }
                Some(deadline) if now_ms >= deadline => {
                    body.facing = if player_pos.x >= body.pos.x { 1.0 } else { -1.0 };
                    let started = body.try_start_attack(p.attack, now_ms);
                    self.next_attack_at = now_ms + p.attack_cooldown_ms;
                    self.windup_until = None;
                    arbiter.release(&body.id);
                    if !started {
                        log::debug!("{}: attack start rejected", body.id);
                    }
                }
                Some(_) => {}
            }
            return;
        }

        // Out of range: no claim on the budget while repositioning
        arbiter.release(&body.id);
        self.windup_until = None;

        // Rail alignment first. Vertical urgency scales with how far the
        // gap sits beyond the snap tolerance.
        let gap = rail_delta.abs();
        let tol = p.rail_snap_tolerance;
        let vertical = if gap > tol * 4.0 {
            1.0
        } else if gap > tol * 2.0 {
            0.65
        } else if gap > tol {
            0.35
        } else {
            0.0
        };
        let mut intent = Vec2::new(0.0, vertical * rail_delta.signum());

        // Approach only once lane-aligned
        if gap <= tol {
            let scale = match p.role {
                AiRole::Controller | AiRole::Boss => 0.6,
                _ => 1.0,
            };
            intent.x = dx.signum() * scale;
        }

        // Veto a horizontal step that would cross an active barrier
        if intent.x != 0.0 {
            let dt_s = (dt_ms / 1000.0) as f32;
            let step = body.pos + intent * body.move_speed * dt_s;
            if nav.is_path_blocked(body.pos, step, barriers) {
                intent.x = 0.0;
            }
        }

        body.move_intent = intent;
    }
}
