//! Snapshot building for network transmission

use std::collections::HashMap;
use uuid::Uuid;

use crate::util::time::unix_millis;
use crate::ws::protocol::{PlayerSnapshot, ProjectileSnapshot, ServerMsg};

use super::combat::Projectile;
use super::PlayerState;

/// Builds the per-tick world snapshot. One goes out every tick regardless of
/// phase, so a frozen world is still visible.
pub struct SnapshotBuilder;

impl SnapshotBuilder {
    pub fn build(
        tick: u64,
        players: &HashMap<Uuid, PlayerState>,
        projectiles: &[Projectile],
    ) -> ServerMsg {
        let player_snapshots: Vec<PlayerSnapshot> = players
            .values()
            .map(|p| PlayerSnapshot {
                player_id: p.id,
                display_name: p.display_name.clone(),
                position: p.position,
                velocity: p.velocity,
                yaw: p.yaw,
                pitch: p.pitch,
                health: p.health,
                alive: p.alive,
                grounded: p.grounded,
                last_input_seq: p.last_input_seq,
                kills: p.kills,
                cooldowns: p.abilities.status(),
            })
            .collect();

        let projectile_snapshots: Vec<ProjectileSnapshot> = projectiles
            .iter()
            .map(|p| ProjectileSnapshot {
                projectile_id: p.id,
                owner_id: p.owner_id,
                position: p.position,
                velocity: p.velocity,
            })
            .collect();

        ServerMsg::Snapshot {
            tick,
            timestamp: unix_millis(),
            players: player_snapshots,
            projectiles: projectile_snapshots,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn snapshot_carries_all_players_and_projectiles() {
        let mut players = HashMap::new();
        let player = PlayerState::new(Uuid::new_v4(), "tester".to_string(), Vec3::ZERO);
        players.insert(player.id, player);

        let projectiles = vec![Projectile::new(
            Uuid::new_v4(),
            Vec3::new(0.0, 1.6, 0.0),
            Vec3::Z,
            0,
            &crate::game::combat::ProjectileStats::standard(),
        )];

        match SnapshotBuilder::build(42, &players, &projectiles) {
            ServerMsg::Snapshot {
                tick,
                players,
                projectiles,
                ..
            } => {
                assert_eq!(tick, 42);
                assert_eq!(players.len(), 1);
                assert_eq!(projectiles.len(), 1);
                assert_eq!(players[0].cooldowns.len(), 5);
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }
}
