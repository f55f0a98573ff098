//! Encounter zones and spawning
//!
//! A stage is a row of scripted zones. Each zone sleeps until the player
//! crosses its trigger X, then locks the area behind barriers, spawns its
//! enemy wave through an injected factory, and watches its objective.
//! Zones move one way through `dormant -> active -> cleared` and never
//! reactivate.

use std::collections::HashSet;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::ai::{CombatProfile, EnemyAi};
use crate::combatant::{Combatant, Team};
use crate::events::SimEvent;
use crate::nav::Barrier;

/// How hard a zone locks progression while active. `Soft` never enables
/// its barriers; `Partial` zones simply author fewer barriers than `Hard`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZoneLock {
    Hard,
    Partial,
    Soft,
}

/// What must happen for a zone to clear
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Objective {
    /// Defeat every spawned enemy
    ClearAll,
    /// Survive for the duration, then finish off the remaining enemies
    HoldLine { hold_ms: f64 },
    /// Destroy the listed cache props, then finish off the enemies
    BreakCache { cache_ids: Vec<String> },
}

/// Enemy archetypes the spawn list may reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnemyArchetype {
    Grunt,
    Rusher,
    Controller,
    Boss,
}

impl EnemyArchetype {
    pub fn profile(&self) -> CombatProfile {
        match self {
            EnemyArchetype::Grunt => CombatProfile::grunt(),
            EnemyArchetype::Rusher => CombatProfile::rusher(),
            EnemyArchetype::Controller => CombatProfile::controller(),
            EnemyArchetype::Boss => CombatProfile::boss(),
        }
    }

    pub fn max_hp(&self) -> i32 {
        match self {
            EnemyArchetype::Grunt => 30,
            EnemyArchetype::Rusher => 24,
            EnemyArchetype::Controller => 40,
            EnemyArchetype::Boss => 140,
        }
    }

    pub fn move_speed(&self) -> f32 {
        match self {
            EnemyArchetype::Grunt => 150.0,
            EnemyArchetype::Rusher => 230.0,
            EnemyArchetype::Controller => 130.0,
            EnemyArchetype::Boss => 110.0,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            EnemyArchetype::Grunt => "grunt",
            EnemyArchetype::Rusher => "rusher",
            EnemyArchetype::Controller => "controller",
            EnemyArchetype::Boss => "boss",
        }
    }
}

/// One entry in a zone's spawn list. `delay_ms` > 0 spawns mid-zone,
/// that long after activation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnPoint {
    pub pos: Vec2,
    pub archetype: EnemyArchetype,
    #[serde(default)]
    pub delay_ms: f64,
}

/// Static zone layout, frozen at stage load
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneLayout {
    pub trigger_x: f32,
    pub lock: ZoneLock,
    pub barriers: Vec<Barrier>,
    pub objective: Objective,
    pub spawns: Vec<SpawnPoint>,
}

/// A freshly spawned enemy, handed back to the simulation
#[derive(Debug, Clone)]
pub struct SpawnedEnemy {
    pub body: Combatant,
    pub ai: EnemyAi,
    pub zone: u32,
}

/// Builds enemies for zone spawn points. Injected so hosts can substitute
/// their own archetypes or stats.
pub trait EnemyFactory {
    fn spawn(&mut self, point: &SpawnPoint, zone: u32) -> SpawnedEnemy;
}

/// Stock factory: archetype stats from [`EnemyArchetype`], ids of the form
/// `grunt-2-0` (archetype, zone, running counter)
#[derive(Debug, Default)]
pub struct DefaultFactory {
    counter: u32,
}

impl EnemyFactory for DefaultFactory {
    fn spawn(&mut self, point: &SpawnPoint, zone: u32) -> SpawnedEnemy {
        let arch = point.archetype;
        let id = format!("{}-{}-{}", arch.name(), zone, self.counter);
        self.counter += 1;
        SpawnedEnemy {
            body: Combatant::new(id, Team::Enemy, point.pos, arch.max_hp(), arch.move_speed()),
            ai: EnemyAi::new(arch.profile()),
            zone,
        }
    }
}

/// Zone runtime state wrapped around its layout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Zone {
    pub layout: ZoneLayout,
    pub started: bool,
    pub active: bool,
    pub cleared: bool,
    pub activated_at: f64,
    /// Spawn points consumed so far
    pub spawned: usize,
    pub destroyed_caches: HashSet<String>,
    /// Ids of enemies spawned for this zone
    pub enemy_ids: Vec<String>,
    /// Live enemies as of the last update
    pub remaining: usize,
    /// Runtime barrier copies; `active` flags toggle with the zone
    pub barriers: Vec<Barrier>,
}

impl Zone {
    fn new(layout: ZoneLayout) -> Self {
        let barriers = layout
            .barriers
            .iter()
            .map(|b| Barrier { active: false, ..*b })
            .collect();
        Self {
            layout,
            started: false,
            active: false,
            cleared: false,
            activated_at: 0.0,
            spawned: 0,
            destroyed_caches: HashSet::new(),
            enemy_ids: Vec::new(),
            remaining: 0,
            barriers,
        }
    }

    fn set_barriers_active(&mut self, active: bool) {
        for b in &mut self.barriers {
            b.active = active;
        }
    }

    /// Objective completion fraction for UI, 0.0..=1.0
    pub fn objective_progress(&self, now_ms: f64) -> f32 {
        if self.cleared {
            return 1.0;
        }
        if !self.started {
            return 0.0;
        }
        match &self.layout.objective {
            Objective::ClearAll => {
                let total = self.layout.spawns.len();
                if total == 0 {
                    return 1.0;
                }
                let down = self.spawned.saturating_sub(self.remaining);
                down as f32 / total as f32
            }
            Objective::HoldLine { hold_ms } => {
                let elapsed = (now_ms - self.activated_at).max(0.0);
                (elapsed / hold_ms).min(1.0) as f32
            }
            Objective::BreakCache { cache_ids } => {
                if cache_ids.is_empty() {
                    return 1.0;
                }
                self.destroyed_caches.len() as f32 / cache_ids.len() as f32
            }
        }
    }

    fn objective_satisfied(&self, now_ms: f64) -> bool {
        // Every objective also requires the wave fully spawned and down
        let all_spawned = self.spawned == self.layout.spawns.len();
        if !all_spawned || self.remaining > 0 {
            return false;
        }
        match &self.layout.objective {
            Objective::ClearAll => true,
            Objective::HoldLine { hold_ms } => now_ms - self.activated_at >= *hold_ms,
            Objective::BreakCache { cache_ids } => cache_ids
                .iter()
                .all(|id| self.destroyed_caches.contains(id)),
        }
    }
}

/// Owns all zones of a stage and drives their lifecycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncounterManager {
    zones: Vec<Zone>,
}

impl EncounterManager {
    pub fn new(layouts: Vec<ZoneLayout>) -> Self {
        Self {
            zones: layouts.into_iter().map(Zone::new).collect(),
        }
    }

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    /// All currently raised barriers, for navigation queries
    pub fn active_barriers(&self) -> Vec<Barrier> {
        self.zones
            .iter()
            .flat_map(|z| z.barriers.iter().copied().filter(|b| b.active))
            .collect()
    }

    /// Live enemies across all active zones, as of the last update
    pub fn remaining_enemies(&self) -> usize {
        self.zones
            .iter()
            .filter(|z| z.active)
            .map(|z| z.remaining)
            .sum()
    }

    pub fn all_cleared(&self) -> bool {
        self.zones.iter().all(|z| z.cleared)
    }

    /// A breakable prop reported its destruction. Only zones actively
    /// hunting that cache id record it.
    pub fn report_cache_destroyed(&mut self, object_id: &str) {
        for zone in &mut self.zones {
            if !zone.active {
                continue;
            }
            if let Objective::BreakCache { cache_ids } = &zone.layout.objective {
                if cache_ids.iter().any(|id| id == object_id) {
                    zone.destroyed_caches.insert(object_id.to_string());
                }
            }
        }
    }

    /// Advance zone state for one tick: trigger activations, run delayed
    /// spawns, evaluate objectives. Newly spawned enemies are returned for
    /// the simulation to adopt.
    pub fn update(
        &mut self,
        player_x: f32,
        is_enemy_alive: impl Fn(&str) -> bool,
        factory: &mut dyn EnemyFactory,
        events: &mut Vec<SimEvent>,
        now_ms: f64,
    ) -> Vec<SpawnedEnemy> {
        let mut spawned = Vec::new();
        for (idx, zone) in self.zones.iter_mut().enumerate() {
            let zone_id = idx as u32;

            if !zone.started && player_x >= zone.layout.trigger_x {
                zone.started = true;
                zone.active = true;
                zone.activated_at = now_ms;
                zone.destroyed_caches.clear();
                if zone.layout.lock != ZoneLock::Soft {
                    zone.set_barriers_active(true);
                }
                log::info!(
                    "zone {zone_id} activated at x={:.0} ({} spawns)",
                    zone.layout.trigger_x,
                    zone.layout.spawns.len()
                );
                events.push(SimEvent::ZoneActivated { zone: zone_id });
            }

            if !zone.active {
                continue;
            }

            // Immediate spawns on the activation tick, scripted ones later
            let elapsed = now_ms - zone.activated_at;
            let mut fresh: Vec<String> = Vec::new();
            while zone.spawned < zone.layout.spawns.len() {
                let point = &zone.layout.spawns[zone.spawned];
                if point.delay_ms > elapsed {
                    break;
                }
                let enemy = factory.spawn(point, zone_id);
                log::debug!("zone {zone_id} spawned {}", enemy.body.id);
                events.push(SimEvent::EnemySpawned {
                    id: enemy.body.id.clone(),
                    zone: zone_id,
                });
                zone.enemy_ids.push(enemy.body.id.clone());
                fresh.push(enemy.body.id.clone());
                spawned.push(enemy);
                zone.spawned += 1;
            }

            // Enemies spawned this very call are not adopted by the caller
            // yet; count them alive
            zone.remaining = zone
                .enemy_ids
                .iter()
                .filter(|id| is_enemy_alive(id) || fresh.iter().any(|f| f == *id))
                .count();

            if zone.objective_satisfied(now_ms) {
                zone.active = false;
                zone.cleared = true;
                zone.set_barriers_active(false);
                log::info!("zone {zone_id} cleared");
                events.push(SimEvent::ZoneCleared { zone: zone_id });
            }
        }
        spawned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn clear_all_layout(trigger_x: f32) -> ZoneLayout {
        ZoneLayout {
            trigger_x,
            lock: ZoneLock::Hard,
            barriers: vec![Barrier {
                x: trigger_x + 400.0,
                top_y: 60.0,
                bottom_y: 260.0,
                active: false,
            }],
            objective: Objective::ClearAll,
            spawns: vec![
                SpawnPoint {
                    pos: Vec2::new(trigger_x + 200.0, 140.0),
                    archetype: EnemyArchetype::Grunt,
                    delay_ms: 0.0,
                },
                SpawnPoint {
                    pos: Vec2::new(trigger_x + 300.0, 180.0),
                    archetype: EnemyArchetype::Rusher,
                    delay_ms: 0.0,
                },
            ],
        }
    }

    struct World {
        mgr: EncounterManager,
        factory: DefaultFactory,
        alive: HashSet<String>,
        events: Vec<SimEvent>,
    }

    impl World {
        fn new(layouts: Vec<ZoneLayout>) -> Self {
            Self {
                mgr: EncounterManager::new(layouts),
                factory: DefaultFactory::default(),
                alive: HashSet::new(),
                events: Vec::new(),
            }
        }

        fn update(&mut self, player_x: f32, now_ms: f64) -> Vec<SpawnedEnemy> {
            let alive = self.alive.clone();
            let spawned = self.mgr.update(
                player_x,
                |id| alive.contains(id),
                &mut self.factory,
                &mut self.events,
                now_ms,
            );
            for e in &spawned {
                self.alive.insert(e.body.id.clone());
            }
            spawned
        }
    }

    #[test]
    fn test_dormant_until_trigger_crossed() {
        let mut w = World::new(vec![clear_all_layout(500.0)]);
        let spawned = w.update(400.0, 0.0);
        assert!(spawned.is_empty());
        assert!(!w.mgr.zones()[0].started);
        assert!(w.mgr.active_barriers().is_empty());
    }

    #[test]
    fn test_activation_spawns_and_locks() {
        let mut w = World::new(vec![clear_all_layout(500.0)]);
        let spawned = w.update(520.0, 100.0);
        assert_eq!(spawned.len(), 2);
        assert!(w.mgr.zones()[0].active);
        assert_eq!(w.mgr.active_barriers().len(), 1);
        assert_eq!(w.mgr.remaining_enemies(), 2);
        assert!(w
            .events
            .iter()
            .any(|e| matches!(e, SimEvent::ZoneActivated { zone: 0 })));
        assert_eq!(
            w.events
                .iter()
                .filter(|e| matches!(e, SimEvent::EnemySpawned { .. }))
                .count(),
            2
        );
    }

    #[test]
    fn test_soft_lock_raises_no_barriers() {
        let mut layout = clear_all_layout(500.0);
        layout.lock = ZoneLock::Soft;
        let mut w = World::new(vec![layout]);
        w.update(520.0, 100.0);
        assert!(w.mgr.active_barriers().is_empty());
    }

    #[test]
    fn test_clear_all_clears_on_last_death_and_stays_cleared() {
        let mut w = World::new(vec![clear_all_layout(500.0)]);
        let spawned = w.update(520.0, 0.0);
        let ids: Vec<String> = spawned.iter().map(|e| e.body.id.clone()).collect();

        // One enemy down: still active
        w.alive.remove(&ids[0]);
        w.update(520.0, 1000.0);
        assert!(w.mgr.zones()[0].active);
        assert!(!w.mgr.zones()[0].cleared);

        // Last enemy down: cleared, barriers drop
        w.alive.remove(&ids[1]);
        w.update(520.0, 2000.0);
        let zone = &w.mgr.zones()[0];
        assert!(zone.cleared);
        assert!(!zone.active);
        assert!(w.mgr.active_barriers().is_empty());
        assert!(w.mgr.all_cleared());
        assert!(w
            .events
            .iter()
            .any(|e| matches!(e, SimEvent::ZoneCleared { zone: 0 })));

        // Re-crossing the trigger does nothing
        let events_before = w.events.len();
        let spawned = w.update(520.0, 3000.0);
        assert!(spawned.is_empty());
        assert_eq!(w.events.len(), events_before);
        assert!(w.mgr.zones()[0].cleared);
    }

    #[test]
    fn test_hold_line_requires_duration_and_no_enemies() {
        let mut layout = clear_all_layout(500.0);
        layout.objective = Objective::HoldLine { hold_ms: 5000.0 };
        let mut w = World::new(vec![layout]);
        let spawned = w.update(520.0, 0.0);

        // Enemies dead early: the timer still gates
        for e in &spawned {
            w.alive.remove(&e.body.id);
        }
        w.update(520.0, 3000.0);
        assert!(!w.mgr.zones()[0].cleared);
        w.update(520.0, 5000.0);
        assert!(w.mgr.zones()[0].cleared);
    }

    #[test]
    fn test_break_cache_requires_all_caches() {
        let mut layout = clear_all_layout(500.0);
        layout.objective = Objective::BreakCache {
            cache_ids: vec!["crate-a".into(), "crate-b".into()],
        };
        let mut w = World::new(vec![layout]);
        let spawned = w.update(520.0, 0.0);
        for e in &spawned {
            w.alive.remove(&e.body.id);
        }

        w.mgr.report_cache_destroyed("crate-a");
        // Unknown ids are ignored
        w.mgr.report_cache_destroyed("crate-zzz");
        w.update(520.0, 1000.0);
        assert!(!w.mgr.zones()[0].cleared);

        w.mgr.report_cache_destroyed("crate-b");
        w.update(520.0, 2000.0);
        assert!(w.mgr.zones()[0].cleared);
    }

    #[test]
    fn test_delayed_spawn_arrives_later() {
        let mut layout = clear_all_layout(500.0);
        layout.spawns[1].delay_ms = 2000.0;
        let mut w = World::new(vec![layout]);

        let spawned = w.update(520.0, 0.0);
        assert_eq!(spawned.len(), 1);
        // Zone must not clear while a scripted spawn is pending
        w.alive.clear();
        w.update(520.0, 1000.0);
        assert!(!w.mgr.zones()[0].cleared);

        let spawned = w.update(520.0, 2500.0);
        assert_eq!(spawned.len(), 1);
        assert_eq!(w.mgr.zones()[0].spawned, 2);
    }

    #[test]
    fn test_objective_progress_projections() {
        let mut w = World::new(vec![clear_all_layout(500.0)]);
        assert_eq!(w.mgr.zones()[0].objective_progress(0.0), 0.0);
        let spawned = w.update(520.0, 0.0);
        assert_eq!(w.mgr.zones()[0].objective_progress(0.0), 0.0);

        w.alive.remove(&spawned[0].body.id);
        w.update(520.0, 1000.0);
        assert!((w.mgr.zones()[0].objective_progress(1000.0) - 0.5).abs() < 1e-6);

        w.alive.remove(&spawned[1].body.id);
        w.update(520.0, 2000.0);
        assert_eq!(w.mgr.zones()[0].objective_progress(2000.0), 1.0);
    }

    #[test]
    fn test_multiple_zones_activate_independently() {
        let mut w = World::new(vec![clear_all_layout(500.0), clear_all_layout(1500.0)]);
        w.update(600.0, 0.0);
        assert!(w.mgr.zones()[0].started);
        assert!(!w.mgr.zones()[1].started);
        assert!(!w.mgr.all_cleared());

        w.update(1600.0, 1000.0);
        assert!(w.mgr.zones()[1].started);
        assert_eq!(w.mgr.remaining_enemies(), 4);
    }
}
