//! Hit resolution and shared hit-stop
//!
//! Once per tick every living attacker with a live hitbox is tested
//! against every living opposing hurtbox, in stable array order so
//! simultaneous hits resolve identically across runs. A hit is only
//! recorded when the target accepts the damage; rejected hits (dead or
//! invulnerable targets) leave no trace and trigger no feedback.

use serde::{Deserialize, Serialize};

use crate::attack::AttackFrameData;
use crate::combatant::{Combatant, CombatantState};
use crate::events::SimEvent;
use crate::frame::rect_intersects;

/// Everything a target needs to resolve one incoming hit
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DamageEvent {
    pub damage: i32,
    /// Knockback magnitude; direction is derived from `source_x`
    pub knockback: f32,
    pub causes_knockdown: bool,
    pub hit_invuln_ms: f64,
    pub hit_stun_ms: f64,
    pub knockdown_ms: f64,
    /// Attacker X at the moment of the hit
    pub source_x: f32,
}

impl DamageEvent {
    pub fn from_attack(data: &AttackFrameData, source_x: f32) -> Self {
        Self {
            damage: data.damage,
            knockback: data.knockback,
            causes_knockdown: data.causes_knockdown,
            hit_invuln_ms: data.hit_invuln_ms,
            hit_stun_ms: data.hit_stun_ms,
            knockdown_ms: data.knockdown_ms,
            source_x,
        }
    }
}

/// Global freeze triggered by successful hits. While active the host must
/// not advance the simulation. The expiry only grows (max of current and
/// requested), so overlapping hits extend one freeze.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct HitStop {
    until_ms: f64,
}

impl HitStop {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&mut self, now_ms: f64, duration_ms: f64) {
        self.until_ms = self.until_ms.max(now_ms + duration_ms);
    }

    pub fn is_active(&self, now_ms: f64) -> bool {
        now_ms < self.until_ms
    }

    pub fn remaining_ms(&self, now_ms: f64) -> f64 {
        (self.until_ms - now_ms).max(0.0)
    }
}

/// Test one attacker against one target and apply the hit if it lands.
/// Returns true when the target accepted damage.
fn try_hit(
    attacker: &mut Combatant,
    target: &mut Combatant,
    hit_stop: &mut HitStop,
    events: &mut Vec<SimEvent>,
    now_ms: f64,
) -> bool {
    if !attacker.team.opposes(target.team) {
        return false;
    }
    if !attacker.is_alive() || !target.is_alive() {
        return false;
    }
    let Some(hitbox) = attacker.active_hitbox() else {
        return false;
    };
    let Some(rt) = attacker.attack.as_ref() else {
        return false;
    };
    if !rt.may_hit(&target.id) {
        return false;
    }
    if !rect_intersects(&hitbox, &target.hurtbox()) {
        return false;
    }

    let data = rt.id.data();
    let attack_id = rt.id;
    let ev = DamageEvent::from_attack(data, attacker.pos.x);
    if !target.apply_damage(&ev, now_ms) {
        // Invulnerable or dead: no hit is recorded, no feedback plays
        return false;
    }

    if let Some(rt) = attacker.attack.as_mut() {
        rt.record_hit(&target.id);
    }
    hit_stop.trigger(now_ms, data.hit_stop_ms);
    events.push(SimEvent::Hit {
        attacker: attacker.id.clone(),
        target: target.id.clone(),
        remaining_hp: target.hp,
        attack: attack_id,
        at_ms: now_ms,
    });
    if target.state == CombatantState::Knockdown {
        events.push(SimEvent::Knockdown {
            target: target.id.clone(),
        });
    }
    true
}

/// Resolve all hits for this tick. The player is scanned first, then each
/// enemy in array order; only opposing teams can hit each other.
pub fn resolve_hits(
    player: &mut Combatant,
    enemies: &mut [&mut Combatant],
    hit_stop: &mut HitStop,
    events: &mut Vec<SimEvent>,
    now_ms: f64,
) {
    for enemy in enemies.iter_mut() {
        try_hit(player, enemy, hit_stop, events, now_ms);
    }
    for enemy in enemies.iter_mut() {
        try_hit(enemy, player, hit_stop, events, now_ms);
    }
}
