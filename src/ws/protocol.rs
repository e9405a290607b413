//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use glam::Vec3;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Match lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    /// Not enough players connected
    WaitingForPlayers,
    /// Countdown before the match starts
    Countdown,
    /// Match in progress
    Playing,
}

/// Abilities a player can trigger, each with its own cooldown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbilityKind {
    /// Horizontal burst of speed
    Dash,
    /// Grounded vertical + forward boost
    LaunchJump,
    /// Projectile shot
    PrimaryFire,
    /// Radial damage around the caster
    AreaBlast,
    /// Instant hitscan beam
    RayBlast,
}

impl AbilityKind {
    /// All kinds, in snapshot order
    pub const ALL: [AbilityKind; 5] = [
        AbilityKind::Dash,
        AbilityKind::LaunchJump,
        AbilityKind::PrimaryFire,
        AbilityKind::AreaBlast,
        AbilityKind::RayBlast,
    ];
}

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Join the room with a display name
    Join {
        name: String,
    },

    /// Player input for the current tick
    Input {
        /// Sequence number for client-side reconciliation bookkeeping
        seq: u32,
        /// Movement flags (local axes, rotated by yaw on the server)
        forward: bool,
        back: bool,
        left: bool,
        right: bool,
        /// Look angles in radians
        yaw: f32,
        pitch: f32,
        /// One-shot actions
        jump: bool,
        dash: bool,
        launch_jump: bool,
        fire: bool,
        area_blast: bool,
        ray_blast: bool,
    },

    /// Ping for latency measurement
    Ping {
        /// Client timestamp
        t: u64,
    },
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Welcome message after connection (unicast)
    Welcome {
        player_id: Uuid,
        tick: u64,
        tick_rate: u32,
    },

    /// Player joined the room
    PlayerJoined {
        player_id: Uuid,
        display_name: String,
    },

    /// Player left the room
    PlayerLeft {
        player_id: Uuid,
    },

    /// World-state snapshot, sent every tick regardless of phase
    Snapshot {
        tick: u64,
        /// Server timestamp in Unix milliseconds
        timestamp: u64,
        players: Vec<PlayerSnapshot>,
        projectiles: Vec<ProjectileSnapshot>,
    },

    /// A player died
    PlayerDied {
        victim_id: Uuid,
        killer_id: Option<Uuid>,
    },

    /// The match concluded
    GameOver {
        winner_id: Uuid,
        winner_name: String,
    },

    /// Phase changed (or roster changed within a phase)
    PhaseUpdate {
        phase: GamePhase,
        min_players: usize,
        player_count: usize,
    },

    /// Countdown progress, once per elapsed second
    CountdownUpdate {
        seconds_remaining: u32,
    },

    /// Visual trigger for an area blast (damage already applied server-side)
    AreaBlastTriggered {
        caster_id: Uuid,
        position: Vec3,
        radius: f32,
    },

    /// Visual trigger for a ray blast (damage already applied server-side)
    RayBlastTriggered {
        caster_id: Uuid,
        origin: Vec3,
        endpoint: Vec3,
        hit_id: Option<Uuid>,
    },

    /// Pong response (unicast)
    Pong {
        /// Echo back client timestamp
        t: u64,
        /// Server timestamp in Unix milliseconds
        server_time: u64,
    },
}

/// Per-ability cooldown status in a snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CooldownStatus {
    pub kind: AbilityKind,
    pub ready: bool,
    /// Remaining cooldown in milliseconds (0 = ready)
    pub remaining_ms: u32,
}

/// Player state in a snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub player_id: Uuid,
    pub display_name: String,
    /// Feet-center position
    pub position: Vec3,
    pub velocity: Vec3,
    /// Look angles in radians
    pub yaw: f32,
    pub pitch: f32,
    pub health: f32,
    pub alive: bool,
    pub grounded: bool,
    /// Last processed input sequence
    pub last_input_seq: u32,
    pub kills: u32,
    pub cooldowns: Vec<CooldownStatus>,
}

/// Projectile state in a snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectileSnapshot {
    pub projectile_id: Uuid,
    pub owner_id: Uuid,
    pub position: Vec3,
    pub velocity: Vec3,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_msg_round_trips() {
        let msg = ClientMsg::Input {
            seq: 7,
            forward: true,
            back: false,
            left: false,
            right: true,
            yaw: 1.25,
            pitch: -0.3,
            jump: true,
            dash: false,
            launch_jump: false,
            fire: true,
            area_blast: false,
            ray_blast: false,
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"input\""));
        let back: ClientMsg = serde_json::from_str(&json).unwrap();
        match back {
            ClientMsg::Input { seq, forward, fire, .. } => {
                assert_eq!(seq, 7);
                assert!(forward);
                assert!(fire);
            }
            other => panic!("unexpected variant: {:?}", other),
        }
    }

    #[test]
    fn phase_serializes_snake_case() {
        let json = serde_json::to_string(&GamePhase::WaitingForPlayers).unwrap();
        assert_eq!(json, "\"waiting_for_players\"");
    }

    #[test]
    fn malformed_input_is_an_error_not_a_panic() {
        let result = serde_json::from_str::<ClientMsg>("{\"type\":\"input\",\"seq\":\"nope\"}");
        assert!(result.is_err());
    }

    #[test]
    fn ray_blast_trigger_carries_optional_hit() {
        let msg = ServerMsg::RayBlastTriggered {
            caster_id: Uuid::new_v4(),
            origin: Vec3::new(0.0, 1.6, 0.0),
            endpoint: Vec3::new(0.0, 1.6, 120.0),
            hit_id: None,
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"hit_id\":null"));
    }
}
