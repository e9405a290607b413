//! Player movement and arena collision resolution

use glam::Vec3;

use crate::util::time::tick_delta;

use super::arena::{Arena, FLOOR_Y};

/// Physical constants for the player body
#[derive(Debug, Clone, Copy)]
pub struct PlayerStats {
    /// Capsule height, feet to head
    pub height: f32,
    /// Capsule radius
    pub radius: f32,
    /// Eye height above the feet (ray-blast origin)
    pub eye_height: f32,
    /// Maximum health
    pub max_health: f32,
    /// Ground movement speed
    pub move_speed: f32,
    /// Fraction of control retained while airborne
    pub air_control: f32,
    /// Vertical velocity applied by a jump
    pub jump_speed: f32,
    /// Downward acceleration
    pub gravity: f32,
    /// Per-tick horizontal velocity decay while grounded
    pub ground_friction: f32,
}

impl PlayerStats {
    pub fn standard() -> Self {
        Self {
            height: 1.8,
            radius: 0.4,
            eye_height: 1.6,
            max_health: 100.0,
            move_speed: 6.0,
            air_control: 0.25,
            jump_speed: 8.0,
            gravity: 20.0,
            ground_friction: 0.82,
        }
    }
}

/// How far through a surface the feet may sink and still land on it
pub const LANDING_TOLERANCE: f32 = 0.35;
/// How far above a surface the feet may hover and still snap down
const LANDING_EPSILON: f32 = 0.05;
/// Obstacles rising less than this above the feet never block horizontally,
/// so a player settling onto a platform top is not shoved off its edge
const STEP_HEIGHT: f32 = 0.4;

/// Movement system: integrates velocity and resolves arena collisions
pub struct MovementSystem;

impl MovementSystem {
    /// Advance one player by one tick: gravity, integration, then collision
    /// resolution in fixed order (horizontal blocking, landing, ceiling,
    /// ground fallback), then ground friction.
    pub fn step(
        position: &mut Vec3,
        velocity: &mut Vec3,
        grounded: &mut bool,
        arena: &Arena,
        stats: &PlayerStats,
    ) {
        let dt = tick_delta();

        if !*grounded {
            velocity.y -= stats.gravity * dt;
        }

        *position += *velocity * dt;

        // Grounded is re-established by landing or the floor each tick
        *grounded = false;

        Self::resolve_horizontal_blocking(position, arena, stats);

        if velocity.y <= 0.0 {
            if let Some(height) = Self::pick_landing_surface(position, arena, stats) {
                position.y = height;
                velocity.y = 0.0;
                *grounded = true;
            }
        } else {
            Self::resolve_ceiling(position, velocity, arena, stats);
        }

        if !*grounded && position.y <= FLOOR_Y {
            position.y = FLOOR_Y;
            velocity.y = 0.0;
            *grounded = true;
        }

        if *grounded {
            velocity.x *= stats.ground_friction;
            velocity.z *= stats.ground_friction;
        }
    }

    /// Push the player's horizontal position out of every wall, platform and
    /// pillar whose vertical extent overlaps the body. A solid entirely
    /// overhead (bottom above the feet) is the ceiling stage's problem, and a
    /// top within step height of the feet is landable, not blocking.
    fn resolve_horizontal_blocking(position: &mut Vec3, arena: &Arena, stats: &PlayerStats) {
        let feet = position.y;
        let head = feet + stats.height;

        for solid in arena.solid_boxes() {
            if !solid.overlaps_vertical_span(feet, head)
                || solid.bottom() > feet
                || solid.top() <= feet + STEP_HEIGHT
            {
                continue;
            }
            Self::push_out_of_box(position, solid, stats.radius);
        }

        for pillar in &arena.pillars {
            if !pillar.overlaps_vertical_span(feet, head)
                || pillar.base_y > feet
                || pillar.top() <= feet + STEP_HEIGHT
            {
                continue;
            }
            let dist = pillar.horizontal_distance(position.x, position.z);
            let min_dist = pillar.radius + stats.radius;
            if dist >= min_dist {
                continue;
            }
            if dist < 0.001 {
                // Dead center, push out along +x
                position.x = pillar.center_x + min_dist;
                continue;
            }
            let nx = (position.x - pillar.center_x) / dist;
            let nz = (position.z - pillar.center_z) / dist;
            position.x = pillar.center_x + nx * min_dist;
            position.z = pillar.center_z + nz * min_dist;
        }
    }

    /// Push (x, z) out of a box footprint to the nearest non-overlapping point
    fn push_out_of_box(position: &mut Vec3, solid: &super::arena::Aabb, radius: f32) {
        if solid.contains_2d(position.x, position.z) {
            // Center inside the footprint: exit through the nearest face
            let to_min_x = position.x - solid.min.x;
            let to_max_x = solid.max.x - position.x;
            let to_min_z = position.z - solid.min.z;
            let to_max_z = solid.max.z - position.z;
            let smallest = to_min_x.min(to_max_x).min(to_min_z).min(to_max_z);

            if smallest == to_min_x {
                position.x = solid.min.x - radius;
            } else if smallest == to_max_x {
                position.x = solid.max.x + radius;
            } else if smallest == to_min_z {
                position.z = solid.min.z - radius;
            } else {
                position.z = solid.max.z + radius;
            }
            return;
        }

        let (cx, cz) = solid.closest_point_2d(position.x, position.z);
        let dx = position.x - cx;
        let dz = position.z - cz;
        let dist_sq = dx * dx + dz * dz;
        if dist_sq >= radius * radius || dist_sq == 0.0 {
            return;
        }
        let dist = dist_sq.sqrt();
        position.x = cx + dx / dist * radius;
        position.z = cz + dz / dist * radius;
    }

    /// Highest landable surface the feet are at or within tolerance through
    fn pick_landing_surface(position: &Vec3, arena: &Arena, stats: &PlayerStats) -> Option<f32> {
        let mut best: Option<f32> = None;
        for surface in arena.landing_surfaces(position.x, position.z, stats.radius) {
            let h = surface.height;
            if position.y <= h + LANDING_EPSILON && position.y >= h - LANDING_TOLERANCE {
                best = Some(best.map_or(h, |b: f32| b.max(h)));
            }
        }
        best
    }

    /// Zero upward velocity when the head crosses a platform underside
    fn resolve_ceiling(position: &Vec3, velocity: &mut Vec3, arena: &Arena, stats: &PlayerStats) {
        let head = position.y + stats.height;
        for platform in &arena.platforms {
            if platform.overlaps_circle_2d(position.x, position.z, stats.radius)
                && position.y < platform.bottom()
                && head >= platform.bottom()
            {
                velocity.y = 0.0;
                return;
            }
        }
    }

    /// Check horizontal overlap between two player bodies
    pub fn players_overlap(a: Vec3, b: Vec3, radius: f32) -> bool {
        let dx = b.x - a.x;
        let dz = b.z - a.z;
        let min_dist = radius * 2.0;
        dx * dx + dz * dz < min_dist * min_dist
    }

    /// Push two overlapping players apart symmetrically along the connecting
    /// line. Returns the corrected positions.
    pub fn separate_players(a: Vec3, b: Vec3, radius: f32) -> (Vec3, Vec3) {
        let dx = b.x - a.x;
        let dz = b.z - a.z;
        let dist = (dx * dx + dz * dz).sqrt();

        if dist < 0.001 {
            // Same spot, push apart arbitrarily
            return (
                Vec3::new(a.x - radius, a.y, a.z),
                Vec3::new(b.x + radius, b.y, b.z),
            );
        }

        let min_dist = radius * 2.0;
        let overlap = min_dist - dist;
        if overlap <= 0.0 {
            return (a, b);
        }

        let nx = dx / dist;
        let nz = dz / dist;
        let push = overlap / 2.0 + 0.1;

        (
            Vec3::new(a.x - nx * push, a.y, a.z - nz * push),
            Vec3::new(b.x + nx * push, b.y, b.z + nz * push),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::arena::{Aabb, Pillar};

    fn stats() -> PlayerStats {
        PlayerStats::standard()
    }

    fn empty_arena() -> Arena {
        Arena {
            half_extent: 30.0,
            walls: Vec::new(),
            platforms: Vec::new(),
            pillars: Vec::new(),
            spawn_points: vec![Vec3::ZERO],
        }
    }

    #[test]
    fn grounded_stationary_player_stays_put() {
        let arena = Arena::standard();
        // Standing on the center platform (top = 3.0)
        let mut position = Vec3::new(0.0, 3.0, 0.0);
        let mut velocity = Vec3::ZERO;
        let mut grounded = true;

        for _ in 0..10 {
            MovementSystem::step(&mut position, &mut velocity, &mut grounded, &arena, &stats());
            assert!((position.y - 3.0).abs() < 1e-5);
            assert_eq!(velocity.y, 0.0);
            assert!(grounded);
        }
    }

    #[test]
    fn airborne_player_falls() {
        let arena = empty_arena();
        let mut position = Vec3::new(5.0, 10.0, 5.0);
        let mut velocity = Vec3::ZERO;
        let mut grounded = false;

        MovementSystem::step(&mut position, &mut velocity, &mut grounded, &arena, &stats());
        assert!(velocity.y < 0.0);
        assert!(position.y < 10.0);
        assert!(!grounded);
    }

    #[test]
    fn falling_player_lands_on_floor() {
        let arena = empty_arena();
        let mut position = Vec3::new(0.0, 0.2, 0.0);
        let mut velocity = Vec3::new(0.0, -5.0, 0.0);
        let mut grounded = false;

        for _ in 0..5 {
            MovementSystem::step(&mut position, &mut velocity, &mut grounded, &arena, &stats());
        }
        assert_eq!(position.y, FLOOR_Y);
        assert_eq!(velocity.y, 0.0);
        assert!(grounded);
    }

    #[test]
    fn wall_blocks_horizontal_movement() {
        let arena = Arena::standard();
        // Running straight at the +x wall (inner face at x = 30)
        let mut position = Vec3::new(29.9, 0.0, 0.0);
        let mut velocity = Vec3::new(10.0, 0.0, 0.0);
        let mut grounded = true;

        MovementSystem::step(&mut position, &mut velocity, &mut grounded, &arena, &stats());
        assert!(position.x <= 30.0 - stats().radius + 1e-4);
    }

    #[test]
    fn landing_picks_the_highest_overlapping_surface() {
        let mut arena = empty_arena();
        arena.platforms = vec![
            Aabb::new(Vec3::new(-2.0, 2.3, -2.0), Vec3::new(2.0, 2.8, 2.0)),
            Aabb::new(Vec3::new(-2.0, 2.5, -2.0), Vec3::new(2.0, 3.0, 2.0)),
        ];
        // Feet within landing tolerance of both tops (2.8 and 3.0)
        let mut position = Vec3::new(0.0, 2.75, 0.0);
        let mut velocity = Vec3::new(0.0, -2.0, 0.0);
        let mut grounded = false;

        MovementSystem::step(&mut position, &mut velocity, &mut grounded, &arena, &stats());
        assert!(grounded);
        assert!((position.y - 3.0).abs() < 1e-5);
    }

    #[test]
    fn ceiling_stops_upward_velocity() {
        let mut arena = empty_arena();
        arena.platforms = vec![Aabb::new(
            Vec3::new(-2.0, 2.5, -2.0),
            Vec3::new(2.0, 3.0, 2.0),
        )];
        let mut position = Vec3::new(0.0, 0.8, 0.0);
        let mut velocity = Vec3::new(0.0, 6.0, 0.0);
        let mut grounded = false;

        MovementSystem::step(&mut position, &mut velocity, &mut grounded, &arena, &stats());
        // Head (feet + 1.8) crossed the underside at 2.5
        assert_eq!(velocity.y, 0.0);
    }

    #[test]
    fn pillar_pushes_player_out() {
        let mut arena = empty_arena();
        arena.pillars = vec![Pillar {
            center_x: 0.0,
            center_z: 0.0,
            radius: 1.0,
            base_y: 0.0,
            height: 6.0,
        }];
        let mut position = Vec3::new(1.1, 0.0, 0.0);
        let mut velocity = Vec3::ZERO;
        let mut grounded = true;

        MovementSystem::step(&mut position, &mut velocity, &mut grounded, &arena, &stats());
        let dist = (position.x * position.x + position.z * position.z).sqrt();
        assert!(dist >= 1.0 + stats().radius - 1e-4);
    }

    #[test]
    fn overlapping_players_separate_symmetrically() {
        let a = Vec3::new(0.0, 0.0, 0.0);
        let b = Vec3::new(0.5, 0.0, 0.0);
        let radius = 0.4;
        assert!(MovementSystem::players_overlap(a, b, radius));

        let (na, nb) = MovementSystem::separate_players(a, b, radius);
        let dist = (nb.x - na.x).abs();
        assert!(dist >= radius * 2.0);
        // Symmetric: midpoint unchanged
        assert!(((na.x + nb.x) / 2.0 - 0.25).abs() < 1e-5);
        assert!(!MovementSystem::players_overlap(na, nb, radius));
    }
}
