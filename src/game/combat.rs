//! Combat system - projectiles, damage, hit detection, win condition

use glam::Vec3;
use uuid::Uuid;

use crate::util::time::{secs_to_ticks, tick_delta};

/// Health regained per second once regeneration kicks in
pub const REGEN_RATE_PER_SEC: f32 = 10.0;
/// Seconds after the last damage before regeneration starts
pub const REGEN_DELAY_SECS: f32 = 8.0;

/// Primary-fire projectile tuning
#[derive(Debug, Clone, Copy)]
pub struct ProjectileStats {
    /// Damage per hit
    pub damage: f32,
    /// Projectile speed
    pub speed: f32,
    /// Projectile lifetime (seconds)
    pub lifetime: f32,
    /// Projectile hitbox radius
    pub radius: f32,
    /// Distance from the world origin past which projectiles despawn
    pub max_distance: f32,
}

impl ProjectileStats {
    pub fn standard() -> Self {
        Self {
            damage: 10.0,
            speed: 40.0,
            lifetime: 2.0,
            radius: 0.15,
            max_distance: 200.0,
        }
    }
}

/// Active projectile in the world
#[derive(Debug, Clone)]
pub struct Projectile {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub position: Vec3,
    pub velocity: Vec3,
    pub spawn_tick: u64,
    pub lifetime_ticks: u64,
    pub damage: f32,
    pub radius: f32,
}

impl Projectile {
    /// Spawn a projectile travelling along `direction` (unit length)
    pub fn new(
        owner_id: Uuid,
        position: Vec3,
        direction: Vec3,
        spawn_tick: u64,
        stats: &ProjectileStats,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            position,
            velocity: direction * stats.speed,
            spawn_tick,
            lifetime_ticks: secs_to_ticks(stats.lifetime),
            damage: stats.damage,
            radius: stats.radius,
        }
    }

    /// Integrate position by one tick
    pub fn advance(&mut self) {
        self.position += self.velocity * tick_delta();
    }

    /// A projectile with lifetime L is alive at tick spawn+L-1 and gone at
    /// tick spawn+L
    pub fn expired(&self, now: u64) -> bool {
        now.saturating_sub(self.spawn_tick) >= self.lifetime_ticks
    }

    /// Past the generous despawn distance?
    pub fn out_of_bounds(&self, max_distance: f32) -> bool {
        self.position.length_squared() > max_distance * max_distance
    }

    /// Sphere-vs-capsule test against a player body. The capsule spans the
    /// full height with hemispherical caps: its core segment runs from
    /// feet + radius to feet + height - radius.
    pub fn check_hit(&self, target_feet: Vec3, body_radius: f32, body_height: f32) -> bool {
        let seg_bottom = target_feet.y + body_radius;
        let seg_top = target_feet.y + body_height - body_radius;
        let closest_y = self.position.y.clamp(seg_bottom, seg_top);
        let closest = Vec3::new(target_feet.x, closest_y, target_feet.z);
        let combined = self.radius + body_radius;
        self.position.distance_squared(closest) <= combined * combined
    }
}

/// Combat system for damage, regeneration and the win condition
pub struct CombatSystem;

impl CombatSystem {
    /// Apply damage to health, returns (new_health, is_dead)
    pub fn apply_damage(current_health: f32, damage: f32) -> (f32, bool) {
        let new_health = (current_health - damage).max(0.0);
        (new_health, new_health <= 0.0)
    }

    /// Has enough time passed since the last damage for regen to start?
    pub fn regen_eligible(now: u64, last_damage_tick: u64) -> bool {
        now.saturating_sub(last_damage_tick) >= secs_to_ticks(REGEN_DELAY_SECS)
    }

    /// One tick of health regeneration, clamped at max
    pub fn apply_regen(current_health: f32, max_health: f32) -> f32 {
        (current_health + REGEN_RATE_PER_SEC * tick_delta()).min(max_health)
    }

    /// Exactly one alive player wins; zero or several means no winner yet
    pub fn winner_of(mut alive_ids: impl Iterator<Item = Uuid>) -> Option<Uuid> {
        let first = alive_ids.next()?;
        match alive_ids.next() {
            None => Some(first),
            Some(_) => None,
        }
    }
}

/// Hit result from projectile resolution
#[derive(Debug, Clone)]
pub struct HitResult {
    pub projectile_id: Uuid,
    pub shooter_id: Uuid,
    pub target_id: Uuid,
    pub damage: f32,
    pub position: Vec3,
    pub target_killed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats() -> ProjectileStats {
        ProjectileStats::standard()
    }

    #[test]
    fn lifetime_is_exact_in_ticks() {
        let p = Projectile::new(Uuid::new_v4(), Vec3::ZERO, Vec3::Z, 100, &stats());
        let lifetime = p.lifetime_ticks;
        assert!(!p.expired(100 + lifetime - 1));
        assert!(p.expired(100 + lifetime));
    }

    #[test]
    fn capsule_hit_detects_body_and_misses_beside() {
        let shooter = Uuid::new_v4();
        let target_feet = Vec3::new(0.0, 0.0, 5.0);
        let mut p = Projectile::new(shooter, Vec3::new(0.0, 1.0, 0.0), Vec3::Z, 0, &stats());

        // Not touching yet
        assert!(!p.check_hit(target_feet, 0.4, 1.8));

        p.position = Vec3::new(0.0, 1.0, 4.8);
        assert!(p.check_hit(target_feet, 0.4, 1.8));

        // Passing well to the side at the same depth
        p.position = Vec3::new(2.0, 1.0, 5.0);
        assert!(!p.check_hit(target_feet, 0.4, 1.8));

        // Above the head
        p.position = Vec3::new(0.0, 3.0, 5.0);
        assert!(!p.check_hit(target_feet, 0.4, 1.8));
    }

    #[test]
    fn out_of_bounds_uses_distance_from_origin() {
        let mut p = Projectile::new(Uuid::new_v4(), Vec3::ZERO, Vec3::X, 0, &stats());
        assert!(!p.out_of_bounds(200.0));
        p.position = Vec3::new(201.0, 0.0, 0.0);
        assert!(p.out_of_bounds(200.0));
    }

    #[test]
    fn damage_clamps_at_zero_and_reports_death() {
        let (health, dead) = CombatSystem::apply_damage(30.0, 10.0);
        assert_eq!(health, 20.0);
        assert!(!dead);

        let (health, dead) = CombatSystem::apply_damage(5.0, 50.0);
        assert_eq!(health, 0.0);
        assert!(dead);
    }

    #[test]
    fn winner_requires_exactly_one_alive() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        assert_eq!(CombatSystem::winner_of([a].into_iter()), Some(a));
        assert_eq!(CombatSystem::winner_of([a, b].into_iter()), None);
        assert_eq!(CombatSystem::winner_of(std::iter::empty()), None);
    }

    #[test]
    fn regen_waits_for_the_damage_delay() {
        let delay = secs_to_ticks(REGEN_DELAY_SECS);
        let damaged_at = 500;

        assert!(!CombatSystem::regen_eligible(damaged_at + delay - 1, damaged_at));
        assert!(CombatSystem::regen_eligible(damaged_at + delay, damaged_at));
    }

    #[test]
    fn regen_rate_is_per_tick_and_clamped() {
        let per_tick = REGEN_RATE_PER_SEC * tick_delta();
        let healed = CombatSystem::apply_regen(50.0, 100.0);
        assert!((healed - (50.0 + per_tick)).abs() < 1e-5);

        assert_eq!(CombatSystem::apply_regen(99.999, 100.0), 100.0);
        assert_eq!(CombatSystem::apply_regen(100.0, 100.0), 100.0);
    }
}
