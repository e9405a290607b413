//! Special abilities: per-kind tuning, tick-based cooldowns, and the
//! area-blast / ray-blast resolvers

use glam::Vec3;
use uuid::Uuid;

use crate::util::time::{secs_to_ticks, TICK_RATE};
use crate::ws::protocol::{AbilityKind, CooldownStatus};

/// Tuning values per ability kind. Fields not meaningful for a kind are zero.
#[derive(Debug, Clone, Copy)]
pub struct AbilityStats {
    /// Cooldown between uses (seconds)
    pub cooldown: f32,
    /// Damage applied on hit
    pub damage: f32,
    /// Effect radius (area blast)
    pub radius: f32,
    /// Maximum display range (ray blast)
    pub range: f32,
    /// Primary impulse: horizontal burst (dash), vertical boost (launch jump)
    pub impulse: f32,
    /// Forward boost component (launch jump)
    pub forward_impulse: f32,
}

impl AbilityStats {
    pub fn for_kind(kind: AbilityKind) -> Self {
        match kind {
            AbilityKind::Dash => Self {
                cooldown: 2.0,
                damage: 0.0,
                radius: 0.0,
                range: 0.0,
                impulse: 18.0,
                forward_impulse: 0.0,
            },
            AbilityKind::LaunchJump => Self {
                cooldown: 5.0,
                damage: 0.0,
                radius: 0.0,
                range: 0.0,
                impulse: 11.0,
                forward_impulse: 7.0,
            },
            AbilityKind::PrimaryFire => Self {
                cooldown: 0.25,
                damage: 10.0,
                radius: 0.0,
                range: 0.0,
                impulse: 0.0,
                forward_impulse: 0.0,
            },
            AbilityKind::AreaBlast => Self {
                cooldown: 6.0,
                damage: 35.0,
                radius: 6.0,
                range: 0.0,
                impulse: 0.0,
                forward_impulse: 0.0,
            },
            AbilityKind::RayBlast => Self {
                cooldown: 8.0,
                damage: 50.0,
                radius: 0.0,
                range: 120.0,
                impulse: 0.0,
                forward_impulse: 0.0,
            },
        }
    }

    /// Cooldown expressed in whole ticks for exact per-tick comparison
    pub fn cooldown_ticks(kind: AbilityKind) -> u64 {
        secs_to_ticks(Self::for_kind(kind).cooldown)
    }
}

/// Cooldown bookkeeping for one ability.
///
/// `last_used = None` means never used, which is ready from tick 0 without
/// any subtraction on the tick counter.
#[derive(Debug, Clone)]
pub struct AbilityCooldown {
    pub ready: bool,
    /// Remaining cooldown in milliseconds (UI-facing, 0 = ready)
    pub remaining_ms: u32,
    pub last_used: Option<u64>,
}

impl AbilityCooldown {
    pub fn new() -> Self {
        Self {
            ready: true,
            remaining_ms: 0,
            last_used: None,
        }
    }

    /// Re-derive `ready` and `remaining_ms` from the tick counter
    pub fn refresh(&mut self, kind: AbilityKind, now: u64) {
        let cooldown_ticks = AbilityStats::cooldown_ticks(kind);
        match self.last_used {
            None => {
                self.ready = true;
                self.remaining_ms = 0;
            }
            Some(used) => {
                let elapsed = now.saturating_sub(used);
                if elapsed >= cooldown_ticks {
                    self.ready = true;
                    self.remaining_ms = 0;
                } else {
                    self.ready = false;
                    let remaining_ticks = cooldown_ticks - elapsed;
                    self.remaining_ms = (remaining_ticks * 1000 / TICK_RATE as u64) as u32;
                }
            }
        }
    }

    /// Consume the ability if it is ready. Returns false (no-op) on cooldown.
    pub fn try_use(&mut self, kind: AbilityKind, now: u64) -> bool {
        self.refresh(kind, now);
        if !self.ready {
            return false;
        }
        self.last_used = Some(now);
        self.refresh(kind, now);
        true
    }
}

impl Default for AbilityCooldown {
    fn default() -> Self {
        Self::new()
    }
}

/// The fixed set of ability cooldowns carried by every player, dispatched
/// through the kind rather than per-ability fields at call sites.
#[derive(Debug, Clone, Default)]
pub struct AbilitySet {
    dash: AbilityCooldown,
    launch_jump: AbilityCooldown,
    primary_fire: AbilityCooldown,
    area_blast: AbilityCooldown,
    ray_blast: AbilityCooldown,
}

impl AbilitySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, kind: AbilityKind) -> &AbilityCooldown {
        match kind {
            AbilityKind::Dash => &self.dash,
            AbilityKind::LaunchJump => &self.launch_jump,
            AbilityKind::PrimaryFire => &self.primary_fire,
            AbilityKind::AreaBlast => &self.area_blast,
            AbilityKind::RayBlast => &self.ray_blast,
        }
    }

    pub fn get_mut(&mut self, kind: AbilityKind) -> &mut AbilityCooldown {
        match kind {
            AbilityKind::Dash => &mut self.dash,
            AbilityKind::LaunchJump => &mut self.launch_jump,
            AbilityKind::PrimaryFire => &mut self.primary_fire,
            AbilityKind::AreaBlast => &mut self.area_blast,
            AbilityKind::RayBlast => &mut self.ray_blast,
        }
    }

    /// Consume the ability if ready
    pub fn try_use(&mut self, kind: AbilityKind, now: u64) -> bool {
        self.get_mut(kind).try_use(kind, now)
    }

    /// Per-tick cooldown refresh for all abilities
    pub fn refresh_all(&mut self, now: u64) {
        for kind in AbilityKind::ALL {
            self.get_mut(kind).refresh(kind, now);
        }
    }

    /// Snapshot view of every cooldown
    pub fn status(&self) -> Vec<CooldownStatus> {
        AbilityKind::ALL
            .iter()
            .map(|&kind| {
                let cd = self.get(kind);
                CooldownStatus {
                    kind,
                    ready: cd.ready,
                    remaining_ms: cd.remaining_ms,
                }
            })
            .collect()
    }
}

/// Outcome of an area blast, applied and broadcast by the room
#[derive(Debug, Clone)]
pub struct AreaBlastResult {
    pub caster_id: Uuid,
    pub position: Vec3,
    pub radius: f32,
    pub damage: f32,
    pub hits: Vec<Uuid>,
}

/// Outcome of a ray blast, applied and broadcast by the room
#[derive(Debug, Clone)]
pub struct RayBlastResult {
    pub caster_id: Uuid,
    pub origin: Vec3,
    pub endpoint: Vec3,
    pub hit: Option<Uuid>,
    pub damage: f32,
}

/// Near-vertical threshold for the horizontal-plane quadratic
const RAY_EPSILON: f32 = 1e-6;

/// Collect every other alive player within the blast radius of the caster.
/// The boundary is inclusive: a target at exactly the radius is hit.
pub fn resolve_area_blast(
    caster_id: Uuid,
    caster_position: Vec3,
    targets: &[(Uuid, Vec3)],
) -> AreaBlastResult {
    let stats = AbilityStats::for_kind(AbilityKind::AreaBlast);
    let radius_sq = stats.radius * stats.radius;

    let hits = targets
        .iter()
        .filter(|(id, _)| *id != caster_id)
        .filter(|(_, pos)| caster_position.distance_squared(*pos) <= radius_sq)
        .map(|(id, _)| *id)
        .collect();

    AreaBlastResult {
        caster_id,
        position: caster_position,
        radius: stats.radius,
        damage: stats.damage,
        hits,
    }
}

/// Cast a ray from `origin` along `direction` against every target's body
/// cylinder, returning the closest strictly-positive hit. Without a hit the
/// endpoint extends to the display range.
pub fn resolve_ray_blast(
    caster_id: Uuid,
    origin: Vec3,
    direction: Vec3,
    targets: &[(Uuid, Vec3)],
    body_radius: f32,
    body_height: f32,
) -> RayBlastResult {
    let stats = AbilityStats::for_kind(AbilityKind::RayBlast);

    let mut best: Option<(f32, Uuid)> = None;
    for &(id, feet) in targets {
        if id == caster_id {
            continue;
        }
        if let Some(t) = ray_cylinder_intersection(
            origin,
            direction,
            feet,
            body_radius,
            body_height,
        ) {
            if t > RAY_EPSILON && best.map_or(true, |(bt, _)| t < bt) {
                best = Some((t, id));
            }
        }
    }

    let (endpoint, hit) = match best {
        Some((t, id)) => (origin + direction * t, Some(id)),
        None => (origin + direction * stats.range, None),
    };

    RayBlastResult {
        caster_id,
        origin,
        endpoint,
        hit,
        damage: stats.damage,
    }
}

/// Ray vs vertical cylinder (feet at `base`, given radius and height).
/// Returns the smallest positive ray parameter, side or cap.
fn ray_cylinder_intersection(
    origin: Vec3,
    direction: Vec3,
    base: Vec3,
    radius: f32,
    height: f32,
) -> Option<f32> {
    let bottom = base.y;
    let top = base.y + height;

    let ox = origin.x - base.x;
    let oz = origin.z - base.z;

    let a = direction.x * direction.x + direction.z * direction.z;
    let mut best: Option<f32> = None;

    if a > RAY_EPSILON {
        // Quadratic in the horizontal plane
        let b = 2.0 * (ox * direction.x + oz * direction.z);
        let c = ox * ox + oz * oz - radius * radius;
        let disc = b * b - 4.0 * a * c;
        if disc >= 0.0 {
            let sqrt_disc = disc.sqrt();
            for t in [(-b - sqrt_disc) / (2.0 * a), (-b + sqrt_disc) / (2.0 * a)] {
                if t > 0.0 {
                    let y = origin.y + direction.y * t;
                    if y >= bottom && y <= top && best.map_or(true, |bt| t < bt) {
                        best = Some(t);
                    }
                }
            }
        }
    } else {
        // Near-vertical ray: no horizontal travel, so the horizontal offset
        // decides containment and the cap planes decide the distance
        if ox * ox + oz * oz > radius * radius {
            return None;
        }
        if direction.y.abs() <= RAY_EPSILON {
            return None;
        }
        if origin.y >= bottom && origin.y <= top {
            // Starting inside the vertical span counts as an immediate hit
            return Some(RAY_EPSILON * 2.0);
        }
        for plane in [bottom, top] {
            let t = (plane - origin.y) / direction.y;
            if t > 0.0 && best.map_or(true, |bt| t < bt) {
                best = Some(t);
            }
        }
        return best;
    }

    // Cap discs for rays entering through the top or bottom
    if direction.y.abs() > RAY_EPSILON {
        for plane in [bottom, top] {
            let t = (plane - origin.y) / direction.y;
            if t > 0.0 {
                let x = ox + direction.x * t;
                let z = oz + direction.z * t;
                if x * x + z * z <= radius * radius && best.map_or(true, |bt| t < bt) {
                    best = Some(t);
                }
            }
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: u64 = 1000;

    #[test]
    fn never_used_ability_is_ready_from_tick_zero() {
        let mut cd = AbilityCooldown::new();
        cd.refresh(AbilityKind::RayBlast, 0);
        assert!(cd.ready);
        assert_eq!(cd.remaining_ms, 0);
    }

    #[test]
    fn cooldown_blocks_until_exactly_elapsed() {
        let kind = AbilityKind::Dash;
        let ticks = AbilityStats::cooldown_ticks(kind);
        let mut cd = AbilityCooldown::new();

        assert!(cd.try_use(kind, NOW));
        assert!(!cd.try_use(kind, NOW));
        assert!(!cd.try_use(kind, NOW + ticks - 1));
        assert!(cd.try_use(kind, NOW + ticks));
    }

    #[test]
    fn remaining_ms_decreases_to_zero_never_negative() {
        let kind = AbilityKind::AreaBlast;
        let ticks = AbilityStats::cooldown_ticks(kind);
        let mut cd = AbilityCooldown::new();
        assert!(cd.try_use(kind, NOW));

        let mut last = u32::MAX;
        for dt in 0..=ticks {
            cd.refresh(kind, NOW + dt);
            assert!(cd.remaining_ms <= last);
            last = cd.remaining_ms;
        }
        assert_eq!(cd.remaining_ms, 0);
        assert!(cd.ready);

        // Stays ready until used again
        cd.refresh(kind, NOW + ticks * 10);
        assert!(cd.ready);
    }

    #[test]
    fn ability_set_dispatches_by_kind() {
        let mut set = AbilitySet::new();
        assert!(set.try_use(AbilityKind::PrimaryFire, 5));
        assert!(!set.get(AbilityKind::PrimaryFire).ready);
        // Other kinds unaffected
        assert!(set.get(AbilityKind::Dash).ready);
        assert_eq!(set.status().len(), AbilityKind::ALL.len());
    }

    #[test]
    fn area_blast_boundary_is_inclusive() {
        let caster = Uuid::new_v4();
        let at_radius = Uuid::new_v4();
        let beyond = Uuid::new_v4();
        let radius = AbilityStats::for_kind(AbilityKind::AreaBlast).radius;

        let targets = vec![
            (at_radius, Vec3::new(radius, 0.0, 0.0)),
            (beyond, Vec3::new(radius + 0.01, 0.0, 0.0)),
            (caster, Vec3::ZERO),
        ];

        let result = resolve_area_blast(caster, Vec3::ZERO, &targets);
        assert!(result.hits.contains(&at_radius));
        assert!(!result.hits.contains(&beyond));
        assert!(!result.hits.contains(&caster));
    }

    #[test]
    fn ray_blast_hits_nearest_of_colinear_targets() {
        let caster = Uuid::new_v4();
        let near = Uuid::new_v4();
        let far = Uuid::new_v4();

        let origin = Vec3::new(0.0, 1.6, 0.0);
        let dir = Vec3::new(0.0, 0.0, 1.0);
        let targets = vec![
            (far, Vec3::new(0.0, 0.0, 20.0)),
            (near, Vec3::new(0.0, 0.0, 8.0)),
            (caster, Vec3::ZERO),
        ];

        let result = resolve_ray_blast(caster, origin, dir, &targets, 0.4, 1.8);
        assert_eq!(result.hit, Some(near));
        assert!(result.endpoint.z < 20.0);
    }

    #[test]
    fn ray_blast_ignores_targets_behind_the_caster() {
        let caster = Uuid::new_v4();
        let behind = Uuid::new_v4();

        let origin = Vec3::new(0.0, 1.6, 0.0);
        let dir = Vec3::new(0.0, 0.0, 1.0);
        let targets = vec![(behind, Vec3::new(0.0, 0.0, -10.0))];

        let result = resolve_ray_blast(caster, origin, dir, &targets, 0.4, 1.8);
        assert_eq!(result.hit, None);
        let range = AbilityStats::for_kind(AbilityKind::RayBlast).range;
        assert!((result.endpoint.z - range).abs() < 1e-3);
    }

    #[test]
    fn vertical_ray_enters_through_the_cap() {
        let caster = Uuid::new_v4();
        let below = Uuid::new_v4();

        // Looking straight down at a target under the caster
        let origin = Vec3::new(0.0, 10.0, 0.0);
        let dir = Vec3::new(0.0, -1.0, 0.0);
        let targets = vec![(below, Vec3::new(0.1, 0.0, 0.0))];

        let result = resolve_ray_blast(caster, origin, dir, &targets, 0.4, 1.8);
        assert_eq!(result.hit, Some(below));
        // Entered through the top cap at y = 1.8
        assert!((result.endpoint.y - 1.8).abs() < 1e-3);
    }

    #[test]
    fn slanted_ray_through_top_cap_is_detected() {
        let caster = Uuid::new_v4();
        let target = Uuid::new_v4();

        // Steep but not perfectly vertical: misses the side wall within the
        // vertical span, enters through the top disc
        let origin = Vec3::new(0.05, 20.0, 0.0);
        let dir = Vec3::new(0.001, -1.0, 0.0).normalize();
        let targets = vec![(target, Vec3::new(0.0, 0.0, 0.0))];

        let result = resolve_ray_blast(caster, origin, dir, &targets, 0.4, 1.8);
        assert_eq!(result.hit, Some(target));
    }
}
