//! Game simulation modules

pub mod abilities;
pub mod arena;
pub mod combat;
pub mod movement;
pub mod phase;
pub mod room;
pub mod snapshot;

pub use room::{GameRoom, PlayerState, RoomHandle};

use glam::Vec3;
use uuid::Uuid;

use crate::ws::protocol::ClientMsg;

/// Player input received from WebSocket
#[derive(Debug, Clone)]
pub struct PlayerInput {
    pub player_id: Uuid,
    pub msg: ClientMsg,
    pub received_at: u64,
}

/// Input state for a single tick (processed from ClientMsg::Input)
#[derive(Debug, Clone, Default)]
pub struct InputState {
    pub seq: u32,
    pub forward: bool,
    pub back: bool,
    pub left: bool,
    pub right: bool,
    pub yaw: f32,
    pub pitch: f32,
    pub jump: bool,
    pub dash: bool,
    pub launch_jump: bool,
    pub fire: bool,
    pub area_blast: bool,
    pub ray_blast: bool,
}

impl InputState {
    /// Normalized world-space movement direction from the flags, rotated by
    /// yaw. None when no movement flag is held.
    pub fn wish_direction(&self) -> Option<Vec3> {
        let (forward, right) = yaw_axes(self.yaw);
        let mut dir = Vec3::ZERO;
        if self.forward {
            dir += forward;
        }
        if self.back {
            dir -= forward;
        }
        if self.right {
            dir += right;
        }
        if self.left {
            dir -= right;
        }
        if dir.length_squared() < 1e-6 {
            return None;
        }
        Some(dir.normalize())
    }
}

/// World-space look direction from yaw/pitch (radians), unit length
pub fn look_direction(yaw: f32, pitch: f32) -> Vec3 {
    let cos_pitch = pitch.cos();
    Vec3::new(yaw.sin() * cos_pitch, pitch.sin(), yaw.cos() * cos_pitch)
}

/// Horizontal movement axes rotated by yaw: (forward, right)
pub fn yaw_axes(yaw: f32) -> (Vec3, Vec3) {
    let forward = Vec3::new(yaw.sin(), 0.0, yaw.cos());
    let right = Vec3::new(yaw.cos(), 0.0, -yaw.sin());
    (forward, right)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn look_direction_is_unit_length() {
        for (yaw, pitch) in [(0.0, 0.0), (1.2, 0.5), (-2.0, -1.0)] {
            let dir = look_direction(yaw, pitch);
            assert!((dir.length() - 1.0).abs() < 1e-5);
        }
        // Yaw zero, level pitch looks down +z
        assert!(look_direction(0.0, 0.0).abs_diff_eq(Vec3::Z, 1e-6));
    }

    #[test]
    fn wish_direction_rotates_with_yaw() {
        let input = InputState {
            forward: true,
            ..Default::default()
        };
        assert!(input.wish_direction().unwrap().abs_diff_eq(Vec3::Z, 1e-6));

        let turned = InputState {
            forward: true,
            yaw: std::f32::consts::FRAC_PI_2,
            ..Default::default()
        };
        assert!(turned.wish_direction().unwrap().abs_diff_eq(Vec3::X, 1e-5));
    }

    #[test]
    fn opposing_flags_cancel_out() {
        let input = InputState {
            forward: true,
            back: true,
            ..Default::default()
        };
        assert!(input.wish_direction().is_none());
        assert!(InputState::default().wish_direction().is_none());
    }
}
