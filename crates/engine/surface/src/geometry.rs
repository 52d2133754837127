//! Surface geometry relative to one observer.
//!
//! [`SurfaceContext`] precomputes everything the quantization passes need
//! about one oriented surface plane: orientation classification, the block
//! cuboid bounding its footprint, and a ray-plane projector used to sample
//! per-column elevations. It is stateless and side-effect free.

use convoy_voxel::{block_of, BlockFace, IntCuboid};
use glam::{DQuat, DVec2, DVec3, IVec3};

use crate::TrackerConfig;

/// A surface's up-vector more than ~53 degrees from vertical makes it a wall.
const WALL_NORMAL_Y: f64 = 0.6;

/// Rays closer to parallel than this never intersect the plane.
const PARALLEL_EPSILON: f64 = 1e-6;

/// One candidate physical plane, supplied by the vehicle physics layer.
///
/// The surface is the local XZ plane of an oriented box: `half_extents.x`
/// spans local X (width), `half_extents.y` spans local Z (depth), and the
/// rotated local Y axis is the surface normal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientedSurface {
    pub position: DVec3,
    pub half_extents: DVec2,
    pub orientation: DQuat,
}

impl OrientedSurface {
    pub fn new(position: DVec3, half_extents: DVec2, orientation: DQuat) -> Self {
        Self {
            position,
            half_extents,
            orientation,
        }
    }
}

/// Information calculated about an oriented surface relative to a
/// particular observer position, with a ray-projection helper for
/// quantization.
pub struct SurfaceContext {
    position: DVec3,
    inv_orientation: DQuat,
    half_extents: DVec2,
    acceptance: f64,
    /// Surface normal (the rotated local up vector).
    pub normal: DVec3,
    /// True when the surface is too steep to walk on.
    pub is_wall: bool,
    /// True when the observer is behind the surface plane.
    pub is_back_side: bool,
    /// World-space AABB corners of the surface plane.
    pub plane_min: DVec3,
    pub plane_max: DVec3,
    /// Block cuboid bounding the surface footprint, clipped to the
    /// observer's view distance.
    pub cuboid: IntCuboid,
    /// True when view-distance clipping removed the entire footprint;
    /// such a surface contributes no tiles at all.
    pub is_fully_clipped: bool,
}

impl SurfaceContext {
    pub fn new(surface: &OrientedSurface, observer: DVec3, config: &TrackerConfig) -> Self {
        let normal = surface.orientation * DVec3::Y;
        let half = surface.half_extents;

        // World-space AABB of the four plane corners
        let mut plane_min = DVec3::splat(f64::MAX);
        let mut plane_max = DVec3::splat(f64::MIN);
        for corner in [
            DVec3::new(-half.x, 0.0, -half.y),
            DVec3::new(half.x, 0.0, -half.y),
            DVec3::new(-half.x, 0.0, half.y),
            DVec3::new(half.x, 0.0, half.y),
        ] {
            let p = surface.orientation * corner + surface.position;
            plane_min = plane_min.min(p);
            plane_max = plane_max.max(p);
        }

        let observer_block = IVec3::new(
            block_of(observer.x),
            block_of(observer.y),
            block_of(observer.z),
        );
        let cuboid = IntCuboid::enclosing(plane_min, plane_max)
            .clamped_to(&IntCuboid::around(observer_block, config.view_distance));
        let is_fully_clipped = cuboid.is_empty();

        let is_wall = normal.y.abs() < WALL_NORMAL_Y;
        let is_back_side = if is_wall {
            // Simplified because it's not a walkable surface
            (observer - surface.position).dot(normal) < 0.0
        } else if observer.y > plane_max.y - 1.0 {
            // The observer is above the highest point the surface reaches.
            // Classify by the normal alone, otherwise far-away horizontal
            // surfaces flip into ceilings and hinder movement.
            normal.y < 0.0
        } else if observer.y < plane_min.y {
            normal.y > 0.0
        } else {
            (observer - surface.position).dot(normal) < -0.5
        };

        Self {
            position: surface.position,
            inv_orientation: surface.orientation.inverse(),
            half_extents: half,
            acceptance: config.acceptance_distance,
            normal,
            is_wall,
            is_back_side,
            plane_min,
            plane_max,
            cuboid,
            is_fully_clipped,
        }
    }

    /// Projects a ray from `origin` along the `face` axis onto the surface
    /// plane.
    ///
    /// Returns the world-space intersection point, or `None` when the ray
    /// is near-parallel to the plane or the intersection falls outside the
    /// surface's half-extents (plus the acceptance slack) in local space.
    /// Negative ray parameters are allowed; this is a line-plane
    /// intersection, the face only picks the axis.
    pub fn project(&self, face: BlockFace, origin: DVec3) -> Option<DVec3> {
        let ray = face.as_dvec3();
        let denom = ray.dot(self.normal);
        if denom.abs() < PARALLEL_EPSILON {
            return None;
        }

        let t = (self.position - origin).dot(self.normal) / denom;
        let hit = origin + ray * t;

        // Back to surface-local space to verify the hit is on the plane
        let local = self.inv_orientation * (hit - self.position);
        if (local.x.abs() - self.acceptance) > self.half_extents.x {
            return None;
        }
        if (local.z.abs() - self.acceptance) > self.half_extents.y {
            return None;
        }
        Some(hit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_deck(center: DVec3, half: f64) -> OrientedSurface {
        OrientedSurface::new(center, DVec2::splat(half), DQuat::IDENTITY)
    }

    #[test]
    fn test_flat_projection_hits_plane() {
        let surface = flat_deck(DVec3::new(1.5, 64.0, 1.5), 1.5);
        let ctx = SurfaceContext::new(
            &surface,
            DVec3::new(1.5, 70.0, 1.5),
            &TrackerConfig::default(),
        );

        let hit = ctx
            .project(BlockFace::Down, DVec3::new(0.5, 65.0, 0.5))
            .expect("sample over the deck must project");
        assert_eq!(hit, DVec3::new(0.5, 64.0, 0.5));

        // A block beyond the footprint does not project
        assert!(ctx
            .project(BlockFace::Down, DVec3::new(3.5, 65.0, 3.5))
            .is_none());
    }

    #[test]
    fn test_acceptance_slack_pads_edges() {
        let surface = flat_deck(DVec3::new(1.5, 64.0, 1.5), 1.5);
        let config = TrackerConfig {
            acceptance_distance: 0.5,
            ..TrackerConfig::default()
        };
        let ctx = SurfaceContext::new(&surface, DVec3::new(1.5, 70.0, 1.5), &config);

        // Half a block outside the footprint is still accepted with slack
        assert!(ctx
            .project(BlockFace::Down, DVec3::new(3.5, 65.0, 1.5))
            .is_some());
        assert!(ctx
            .project(BlockFace::Down, DVec3::new(4.5, 65.0, 1.5))
            .is_none());
    }

    #[test]
    fn test_parallel_ray_rejected() {
        let surface = flat_deck(DVec3::new(0.0, 64.0, 0.0), 2.0);
        let ctx = SurfaceContext::new(
            &surface,
            DVec3::new(0.0, 70.0, 0.0),
            &TrackerConfig::default(),
        );
        // Horizontal ray against a horizontal plane
        assert!(ctx
            .project(BlockFace::East, DVec3::new(-5.0, 64.0, 0.0))
            .is_none());
    }

    #[test]
    fn test_wall_classification() {
        let observer = DVec3::new(0.0, 64.0, 5.0);
        let config = TrackerConfig::default();

        // Flat deck: not a wall
        let deck = flat_deck(DVec3::new(0.0, 64.0, 0.0), 2.0);
        assert!(!SurfaceContext::new(&deck, observer, &config).is_wall);

        // Surface rolled 90 degrees around X: up vector points at the
        // observer, a wall
        let wall = OrientedSurface::new(
            DVec3::new(0.0, 64.0, 0.0),
            DVec2::splat(2.0),
            DQuat::from_rotation_x(std::f64::consts::FRAC_PI_2),
        );
        let ctx = SurfaceContext::new(&wall, observer, &config);
        assert!(ctx.is_wall);
        assert!(!ctx.is_back_side);

        // Observer on the other side of the same wall
        let behind = SurfaceContext::new(&wall, DVec3::new(0.0, 64.0, -5.0), &config);
        assert!(behind.is_back_side);
    }

    #[test]
    fn test_distant_floor_does_not_flip_to_ceiling() {
        // A deck far below the observer horizontally: the observer sits
        // above plane_max.y, so the back-side decision uses the normal
        // alone even though the dot product against the offset is large.
        let deck = flat_deck(DVec3::new(100.0, 64.0, 0.0), 2.0);
        let ctx = SurfaceContext::new(
            &deck,
            DVec3::new(0.0, 66.0, 0.0),
            &TrackerConfig {
                view_distance: 256,
                ..TrackerConfig::default()
            },
        );
        assert!(!ctx.is_back_side);

        // And from far below, the floor reads as back-side (a ceiling)
        let below = SurfaceContext::new(
            &deck,
            DVec3::new(0.0, 20.0, 0.0),
            &TrackerConfig {
                view_distance: 256,
                ..TrackerConfig::default()
            },
        );
        assert!(below.is_back_side);
    }

    #[test]
    fn test_view_distance_clipping() {
        let deck = flat_deck(DVec3::new(100.0, 64.0, 100.0), 2.0);
        let near = TrackerConfig {
            view_distance: 8,
            ..TrackerConfig::default()
        };
        let ctx = SurfaceContext::new(&deck, DVec3::new(0.0, 64.0, 0.0), &near);
        assert!(ctx.is_fully_clipped);

        // Standing next to it, the footprint survives
        let ctx = SurfaceContext::new(&deck, DVec3::new(98.0, 64.0, 98.0), &near);
        assert!(!ctx.is_fully_clipped);
    }

    #[test]
    fn test_sloped_projection_interpolates() {
        // 45 degree ramp around Z: heights vary along local X
        let ramp = OrientedSurface::new(
            DVec3::new(0.0, 64.0, 0.0),
            DVec2::splat(2.0),
            DQuat::from_rotation_z(std::f64::consts::FRAC_PI_4),
        );
        let ctx = SurfaceContext::new(
            &ramp,
            DVec3::new(0.0, 70.0, 0.0),
            &TrackerConfig::default(),
        );

        let center = ctx
            .project(BlockFace::Down, DVec3::new(0.0, 70.0, 0.0))
            .expect("center projects");
        assert!((center.y - 64.0).abs() < 1e-9);

        let off = ctx
            .project(BlockFace::Down, DVec3::new(0.5, 70.0, 0.0))
            .expect("offset sample projects");
        // Rotating +45 degrees around Z lifts the +X side
        assert!((off.y - 64.5).abs() < 1e-9);
    }
}
