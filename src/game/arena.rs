//! Static arena geometry and spatial queries
//!
//! The arena is loaded once at room creation and never mutated. Walls and
//! landable platforms are axis-aligned boxes, pillars are vertical cylinders.
//! The world floor sits at y = 0.

use glam::Vec3;

/// World floor height
pub const FLOOR_Y: f32 = 0.0;

/// Axis-aligned box (walls, platforms)
#[derive(Debug, Clone, Copy)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Top surface height
    pub fn top(&self) -> f32 {
        self.max.y
    }

    /// Underside height
    pub fn bottom(&self) -> f32 {
        self.min.y
    }

    /// Does the vertical span [y0, y1] overlap this box?
    pub fn overlaps_vertical_span(&self, y0: f32, y1: f32) -> bool {
        y1 > self.min.y && y0 < self.max.y
    }

    /// Closest point on the box footprint to (x, z) in the horizontal plane
    pub fn closest_point_2d(&self, x: f32, z: f32) -> (f32, f32) {
        (x.clamp(self.min.x, self.max.x), z.clamp(self.min.z, self.max.z))
    }

    /// Does a circle of the given radius at (x, z) overlap the box footprint?
    pub fn overlaps_circle_2d(&self, x: f32, z: f32, radius: f32) -> bool {
        let (cx, cz) = self.closest_point_2d(x, z);
        let dx = x - cx;
        let dz = z - cz;
        dx * dx + dz * dz <= radius * radius
    }

    /// Is (x, z) strictly inside the box footprint?
    pub fn contains_2d(&self, x: f32, z: f32) -> bool {
        x > self.min.x && x < self.max.x && z > self.min.z && z < self.max.z
    }

    /// Does a sphere intersect the box?
    pub fn intersects_sphere(&self, center: Vec3, radius: f32) -> bool {
        let closest = center.clamp(self.min, self.max);
        center.distance_squared(closest) <= radius * radius
    }
}

/// Vertical cylinder (pillar)
#[derive(Debug, Clone, Copy)]
pub struct Pillar {
    pub center_x: f32,
    pub center_z: f32,
    pub radius: f32,
    pub base_y: f32,
    pub height: f32,
}

impl Pillar {
    /// Top surface height
    pub fn top(&self) -> f32 {
        self.base_y + self.height
    }

    /// Does the vertical span [y0, y1] overlap this pillar?
    pub fn overlaps_vertical_span(&self, y0: f32, y1: f32) -> bool {
        y1 > self.base_y && y0 < self.top()
    }

    /// Horizontal distance from (x, z) to the pillar axis
    pub fn horizontal_distance(&self, x: f32, z: f32) -> f32 {
        let dx = x - self.center_x;
        let dz = z - self.center_z;
        (dx * dx + dz * dz).sqrt()
    }

    /// Does a circle of the given radius at (x, z) overlap the pillar footprint?
    pub fn overlaps_circle_2d(&self, x: f32, z: f32, radius: f32) -> bool {
        self.horizontal_distance(x, z) <= self.radius + radius
    }

    /// Does a sphere intersect the cylinder body?
    pub fn intersects_sphere(&self, center: Vec3, radius: f32) -> bool {
        if center.y + radius < self.base_y || center.y - radius > self.top() {
            return false;
        }
        self.horizontal_distance(center.x, center.z) <= self.radius + radius
    }
}

/// A landable surface candidate found under a player's footprint
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Surface {
    pub height: f32,
}

/// Static arena: boundary walls, platforms, pillars and spawn points
#[derive(Debug, Clone)]
pub struct Arena {
    /// Half the side length of the square play area
    pub half_extent: f32,
    pub walls: Vec<Aabb>,
    pub platforms: Vec<Aabb>,
    pub pillars: Vec<Pillar>,
    pub spawn_points: Vec<Vec3>,
}

impl Arena {
    /// The standard arena layout: a 60x60 floor ringed by walls, a handful of
    /// platforms at different heights, and four pillars.
    pub fn standard() -> Self {
        let e = 30.0;
        let wall_h = 4.0;
        let t = 1.0;

        let walls = vec![
            // +z / -z walls
            Aabb::new(Vec3::new(-e - t, 0.0, e), Vec3::new(e + t, wall_h, e + t)),
            Aabb::new(Vec3::new(-e - t, 0.0, -e - t), Vec3::new(e + t, wall_h, -e)),
            // +x / -x walls
            Aabb::new(Vec3::new(e, 0.0, -e - t), Vec3::new(e + t, wall_h, e + t)),
            Aabb::new(Vec3::new(-e - t, 0.0, -e - t), Vec3::new(-e, wall_h, e + t)),
        ];

        let platforms = vec![
            Aabb::new(Vec3::new(-4.0, 2.5, -4.0), Vec3::new(4.0, 3.0, 4.0)),
            Aabb::new(Vec3::new(10.0, 1.2, -16.0), Vec3::new(16.0, 1.7, -10.0)),
            Aabb::new(Vec3::new(-16.0, 1.2, 10.0), Vec3::new(-10.0, 1.7, 16.0)),
            Aabb::new(Vec3::new(12.0, 3.8, 12.0), Vec3::new(18.0, 4.3, 18.0)),
            Aabb::new(Vec3::new(-18.0, 3.8, -18.0), Vec3::new(-12.0, 4.3, -12.0)),
        ];

        let pillars = vec![
            Pillar { center_x: 10.0, center_z: 10.0, radius: 1.2, base_y: 0.0, height: 6.0 },
            Pillar { center_x: -10.0, center_z: 10.0, radius: 1.2, base_y: 0.0, height: 6.0 },
            Pillar { center_x: 10.0, center_z: -10.0, radius: 1.2, base_y: 0.0, height: 6.0 },
            Pillar { center_x: -10.0, center_z: -10.0, radius: 1.2, base_y: 0.0, height: 6.0 },
        ];

        let spawn_points = vec![
            Vec3::new(24.0, 0.0, 0.0),
            Vec3::new(-24.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, 24.0),
            Vec3::new(0.0, 0.0, -24.0),
            Vec3::new(18.0, 0.0, 18.0),
            Vec3::new(-18.0, 0.0, 18.0),
            Vec3::new(18.0, 0.0, -18.0),
            Vec3::new(-18.0, 0.0, -18.0),
        ];

        Self {
            half_extent: e,
            walls,
            platforms,
            pillars,
            spawn_points,
        }
    }

    /// All boxes that block horizontal movement
    pub fn solid_boxes(&self) -> impl Iterator<Item = &Aabb> {
        self.walls.iter().chain(self.platforms.iter())
    }

    /// Collect landable surfaces (platform tops and pillar tops) under a
    /// circular footprint at (x, z)
    pub fn landing_surfaces(&self, x: f32, z: f32, radius: f32) -> Vec<Surface> {
        let mut surfaces = Vec::new();
        for platform in &self.platforms {
            if platform.overlaps_circle_2d(x, z, radius) {
                surfaces.push(Surface { height: platform.top() });
            }
        }
        for pillar in &self.pillars {
            if pillar.overlaps_circle_2d(x, z, radius) {
                surfaces.push(Surface { height: pillar.top() });
            }
        }
        surfaces
    }

    /// Does a sphere intersect any arena geometry (including the floor)?
    pub fn intersects_sphere(&self, center: Vec3, radius: f32) -> bool {
        if center.y - radius <= FLOOR_Y {
            return true;
        }
        self.solid_boxes()
            .any(|b| b.intersects_sphere(center, radius))
            || self.pillars.iter().any(|p| p.intersects_sphere(center, radius))
    }
}
