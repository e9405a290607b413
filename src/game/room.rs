//! Room state and authoritative tick loop

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tokio::sync::{broadcast, mpsc};
use tokio::time::interval;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::util::time::TICK_DURATION_MICROS;
use crate::ws::protocol::{AbilityKind, ClientMsg, GamePhase, ServerMsg};

use super::abilities::{self, AbilitySet, AbilityStats};
use super::arena::Arena;
use super::combat::{CombatSystem, HitResult, Projectile, ProjectileStats};
use super::movement::{MovementSystem, PlayerStats};
use super::phase::{PhaseEvent, PhaseMachine};
use super::snapshot::SnapshotBuilder;
use super::{look_direction, yaw_axes, InputState, PlayerInput};

/// Maximum pitch magnitude accepted from clients (just short of straight up)
const PITCH_LIMIT: f32 = 1.55;
/// Display name length cap
const NAME_LIMIT: usize = 24;

/// Commands delivered to the room task over its input channel
#[derive(Debug)]
pub enum RoomCommand {
    /// A message from a connected client
    Message(PlayerInput),
    /// The client's session ended
    Disconnect { player_id: Uuid },
}

/// Player state in the room (authoritative)
#[derive(Debug, Clone)]
pub struct PlayerState {
    pub id: Uuid,
    pub display_name: String,

    // Position and movement
    pub position: Vec3,
    pub velocity: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub grounded: bool,

    // Combat
    pub health: f32,
    pub alive: bool,
    pub last_damage_tick: u64,
    pub kills: u32,
    pub abilities: AbilitySet,

    // Input tracking
    pub last_input_seq: u32,
    pub pending_inputs: Vec<InputState>,
}

impl PlayerState {
    pub fn new(id: Uuid, display_name: String, spawn: Vec3) -> Self {
        let stats = PlayerStats::standard();
        Self {
            id,
            display_name,
            position: spawn,
            velocity: Vec3::ZERO,
            yaw: 0.0,
            pitch: 0.0,
            grounded: true,
            health: stats.max_health,
            alive: true,
            last_damage_tick: 0,
            kills: 0,
            abilities: AbilitySet::new(),
            last_input_seq: 0,
            pending_inputs: Vec::new(),
        }
    }
}

/// Room state (owned by the room task)
pub struct RoomState {
    pub tick: u64,
    /// Connected roster, persists across matches
    pub roster: HashMap<Uuid, String>,
    /// Active per-match player set
    pub players: HashMap<Uuid, PlayerState>,
    pub projectiles: Vec<Projectile>,
    pub arena: Arena,
    pub player_stats: PlayerStats,
    pub projectile_stats: ProjectileStats,
    pub rng: ChaCha8Rng,
}

impl RoomState {
    fn new(seed: u64) -> Self {
        Self {
            tick: 0,
            roster: HashMap::new(),
            players: HashMap::new(),
            projectiles: Vec::new(),
            arena: Arena::standard(),
            player_stats: PlayerStats::standard(),
            projectile_stats: ProjectileStats::standard(),
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Pick a spawn point with a little jitter so respawns don't stack
    fn spawn_position(&mut self) -> Vec3 {
        let idx = self.rng.gen_range(0..self.arena.spawn_points.len());
        let base = self.arena.spawn_points[idx];
        let jitter_x = self.rng.gen_range(-1.5..1.5);
        let jitter_z = self.rng.gen_range(-1.5..1.5);
        Vec3::new(base.x + jitter_x, base.y, base.z + jitter_z)
    }

    fn alive_count(&self) -> usize {
        self.players.values().filter(|p| p.alive).count()
    }
}

/// Handle to the running room
#[derive(Clone)]
pub struct RoomHandle {
    pub input_tx: mpsc::Sender<RoomCommand>,
    pub snapshot_tx: broadcast::Sender<ServerMsg>,
    tick: Arc<AtomicU64>,
    player_count: Arc<AtomicUsize>,
}

impl RoomHandle {
    pub fn tick(&self) -> u64 {
        self.tick.load(Ordering::Relaxed)
    }

    pub fn player_count(&self) -> usize {
        self.player_count.load(Ordering::Relaxed)
    }
}

/// The authoritative game room
pub struct GameRoom {
    state: RoomState,
    phase: PhaseMachine,
    input_rx: mpsc::Receiver<RoomCommand>,
    snapshot_tx: broadcast::Sender<ServerMsg>,
    tick_counter: Arc<AtomicU64>,
    player_count: Arc<AtomicUsize>,
}

impl GameRoom {
    /// Create the room and its handle
    pub fn new(config: &Config) -> (Self, RoomHandle) {
        let (input_tx, input_rx) = mpsc::channel(256);
        let (snapshot_tx, _) = broadcast::channel(64);
        let tick_counter = Arc::new(AtomicU64::new(0));
        let player_count = Arc::new(AtomicUsize::new(0));

        let handle = RoomHandle {
            input_tx,
            snapshot_tx: snapshot_tx.clone(),
            tick: tick_counter.clone(),
            player_count: player_count.clone(),
        };

        let seed = config.game_seed.unwrap_or_else(rand::random);
        let room = Self {
            state: RoomState::new(seed),
            phase: PhaseMachine::new(config.min_players, config.countdown_secs),
            input_rx,
            snapshot_tx,
            tick_counter,
            player_count,
        };

        (room, handle)
    }

    /// Run the authoritative tick loop
    pub async fn run(mut self) {
        info!("Game room started");

        let tick_duration = Duration::from_micros(TICK_DURATION_MICROS);
        let mut tick_interval = interval(tick_duration);
        tick_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tick_interval.tick().await;
            self.process_messages();
            self.run_tick();
        }
    }

    /// Drain all pending commands from connections
    fn process_messages(&mut self) {
        while let Ok(command) = self.input_rx.try_recv() {
            match command {
                RoomCommand::Message(input) => match input.msg {
                    ClientMsg::Join { name } => self.handle_join(input.player_id, name),
                    ClientMsg::Input {
                        seq,
                        forward,
                        back,
                        left,
                        right,
                        yaw,
                        pitch,
                        jump,
                        dash,
                        launch_jump,
                        fire,
                        area_blast,
                        ray_blast,
                    } => {
                        if !yaw.is_finite() || !pitch.is_finite() {
                            warn!(player_id = %input.player_id, "Dropping input with non-finite look angles");
                            continue;
                        }
                        self.queue_input(
                            input.player_id,
                            InputState {
                                seq,
                                forward,
                                back,
                                left,
                                right,
                                yaw,
                                pitch,
                                jump,
                                dash,
                                launch_jump,
                                fire,
                                area_blast,
                                ray_blast,
                            },
                        );
                    }
                    // Pings are answered at the transport boundary
                    ClientMsg::Ping { .. } => {}
                },
                RoomCommand::Disconnect { player_id } => self.handle_leave(player_id),
            }
        }
    }

    /// Handle a join request
    fn handle_join(&mut self, player_id: Uuid, name: String) {
        if self.state.roster.contains_key(&player_id) {
            warn!(player_id = %player_id, "Player already in room");
            return;
        }

        let display_name = sanitize_name(&name, player_id);
        self.state.roster.insert(player_id, display_name.clone());
        self.player_count
            .store(self.state.roster.len(), Ordering::Relaxed);

        let _ = self.snapshot_tx.send(ServerMsg::PlayerJoined {
            player_id,
            display_name: display_name.clone(),
        });

        // Mid-match joins enter the live set immediately
        if self.phase.phase() == GamePhase::Playing {
            self.spawn_player(player_id, display_name);
        }

        info!(
            player_id = %player_id,
            player_count = self.state.roster.len(),
            "Player joined room"
        );

        let now = self.state.tick;
        let events = self.phase.on_roster_change(self.state.roster.len(), now);
        self.apply_phase_events(events);
        self.broadcast_phase_update();
    }

    /// Queue a tick input for dispatch
    fn queue_input(&mut self, player_id: Uuid, input: InputState) {
        if let Some(player) = self.state.players.get_mut(&player_id) {
            player.pending_inputs.push(input);
        }
    }

    /// Handle a disconnect
    fn handle_leave(&mut self, player_id: Uuid) {
        if self.state.roster.remove(&player_id).is_none() {
            return;
        }
        self.state.players.remove(&player_id);
        self.player_count
            .store(self.state.roster.len(), Ordering::Relaxed);

        let _ = self.snapshot_tx.send(ServerMsg::PlayerLeft { player_id });

        info!(
            player_id = %player_id,
            player_count = self.state.roster.len(),
            "Player left room"
        );

        let now = self.state.tick;
        if self.phase.phase() == GamePhase::Playing {
            self.check_win_condition();
        }
        let events = self.phase.on_roster_change(self.state.roster.len(), now);
        self.apply_phase_events(events);
        self.broadcast_phase_update();
    }

    /// Run a single simulation tick
    fn run_tick(&mut self) {
        self.state.tick += 1;
        self.tick_counter.store(self.state.tick, Ordering::Relaxed);

        let events = self.phase.on_tick(self.state.tick);
        self.apply_phase_events(events);

        if self.phase.phase() != GamePhase::Playing {
            // World frozen but visible; stale inputs are discarded
            for player in self.state.players.values_mut() {
                player.pending_inputs.clear();
            }
            self.broadcast_snapshot();
            return;
        }

        self.apply_inputs();
        self.update_movement();
        self.update_projectiles();
        self.resolve_player_overlap();
        self.refresh_cooldowns();
        self.apply_regen();
        self.check_win_condition();
        self.broadcast_snapshot();
    }

    /// Apply every queued input, per player, in arrival order
    fn apply_inputs(&mut self) {
        let ids: Vec<Uuid> = self.state.players.keys().copied().collect();
        for id in ids {
            let inputs = match self.state.players.get_mut(&id) {
                Some(player) => std::mem::take(&mut player.pending_inputs),
                None => continue,
            };
            for input in inputs {
                self.apply_input(id, input);
            }
        }
    }

    /// Apply one input: look, movement, then one dispatch per action flag
    fn apply_input(&mut self, id: Uuid, input: InputState) {
        let now = self.state.tick;
        let stats = self.state.player_stats;

        // Cross-player effects are resolved after the player borrow ends
        let mut fire_shot: Option<(Vec3, Vec3)> = None;
        let mut cast_area = false;
        let mut cast_ray = false;

        {
            let Some(player) = self.state.players.get_mut(&id) else {
                return;
            };
            if !player.alive {
                return;
            }

            player.last_input_seq = input.seq;

            // Look: authoritative snap, no smoothing
            player.yaw = input.yaw;
            player.pitch = input.pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT);

            // Movement: full control grounded, a fraction of it airborne
            if let Some(dir) = input.wish_direction() {
                let target_x = dir.x * stats.move_speed;
                let target_z = dir.z * stats.move_speed;
                if player.grounded {
                    player.velocity.x = target_x;
                    player.velocity.z = target_z;
                } else {
                    player.velocity.x += (target_x - player.velocity.x) * stats.air_control;
                    player.velocity.z += (target_z - player.velocity.z) * stats.air_control;
                }
            }

            // Jump: grounded only, airborne presses are no-ops
            if input.jump && player.grounded {
                player.velocity.y = stats.jump_speed;
                player.grounded = false;
            }

            // Dash: burst along movement direction, facing when stationary
            if input.dash && player.abilities.try_use(AbilityKind::Dash, now) {
                let dash = AbilityStats::for_kind(AbilityKind::Dash);
                let dir = input
                    .wish_direction()
                    .unwrap_or_else(|| yaw_axes(player.yaw).0);
                player.velocity.x = dir.x * dash.impulse;
                player.velocity.z = dir.z * dash.impulse;
            }

            // Launch jump: grounded only, vertical plus forward boost
            if input.launch_jump
                && player.grounded
                && player.abilities.try_use(AbilityKind::LaunchJump, now)
            {
                let launch = AbilityStats::for_kind(AbilityKind::LaunchJump);
                let (forward, _) = yaw_axes(player.yaw);
                player.velocity.y = launch.impulse;
                player.velocity.x += forward.x * launch.forward_impulse;
                player.velocity.z += forward.z * launch.forward_impulse;
                player.grounded = false;
            }

            // Primary fire: projectile from the eye along the look direction
            if input.fire && player.abilities.try_use(AbilityKind::PrimaryFire, now) {
                let dir = look_direction(player.yaw, player.pitch);
                let origin = player.position
                    + Vec3::new(0.0, stats.eye_height, 0.0)
                    + dir * (stats.radius + 0.2);
                fire_shot = Some((origin, dir));
            }

            // Blasts: cooldown is consumed by casting, hit or miss
            if input.area_blast && player.abilities.try_use(AbilityKind::AreaBlast, now) {
                cast_area = true;
            }
            if input.ray_blast && player.abilities.try_use(AbilityKind::RayBlast, now) {
                cast_ray = true;
            }
        }

        if let Some((origin, dir)) = fire_shot {
            let projectile =
                Projectile::new(id, origin, dir, now, &self.state.projectile_stats);
            self.state.projectiles.push(projectile);
        }
        if cast_area {
            self.resolve_area_blast(id);
        }
        if cast_ray {
            self.resolve_ray_blast(id);
        }
    }

    /// Alive players other than `caster_id`, as ray/blast targets
    fn blast_targets(&self, caster_id: Uuid) -> Vec<(Uuid, Vec3)> {
        self.state
            .players
            .values()
            .filter(|p| p.alive && p.id != caster_id)
            .map(|p| (p.id, p.position))
            .collect()
    }

    fn resolve_area_blast(&mut self, caster_id: Uuid) {
        let Some(caster) = self.state.players.get(&caster_id) else {
            return;
        };
        let caster_position = caster.position;
        let targets = self.blast_targets(caster_id);

        let result = abilities::resolve_area_blast(caster_id, caster_position, &targets);
        for victim_id in &result.hits {
            self.apply_damage_to(*victim_id, result.damage, Some(caster_id));
        }

        let _ = self.snapshot_tx.send(ServerMsg::AreaBlastTriggered {
            caster_id,
            position: result.position,
            radius: result.radius,
        });
    }

    fn resolve_ray_blast(&mut self, caster_id: Uuid) {
        let stats = self.state.player_stats;
        let Some(caster) = self.state.players.get(&caster_id) else {
            return;
        };
        let origin = caster.position + Vec3::new(0.0, stats.eye_height, 0.0);
        let direction = look_direction(caster.yaw, caster.pitch);
        let targets = self.blast_targets(caster_id);

        let result = abilities::resolve_ray_blast(
            caster_id,
            origin,
            direction,
            &targets,
            stats.radius,
            stats.height,
        );
        if let Some(victim_id) = result.hit {
            self.apply_damage_to(victim_id, result.damage, Some(caster_id));
        }

        let _ = self.snapshot_tx.send(ServerMsg::RayBlastTriggered {
            caster_id,
            origin: result.origin,
            endpoint: result.endpoint,
            hit_id: result.hit,
        });
    }

    /// Apply damage, handle death bookkeeping, broadcast the death
    fn apply_damage_to(&mut self, victim_id: Uuid, damage: f32, killer_id: Option<Uuid>) {
        let now = self.state.tick;
        let killed = match self.state.players.get_mut(&victim_id) {
            Some(victim) if victim.alive => {
                let (new_health, killed) = CombatSystem::apply_damage(victim.health, damage);
                victim.health = new_health;
                victim.last_damage_tick = now;
                if killed {
                    victim.alive = false;
                }
                killed
            }
            _ => return,
        };

        if killed {
            if let Some(killer) = killer_id.and_then(|k| self.state.players.get_mut(&k)) {
                killer.kills += 1;
            }
            let _ = self.snapshot_tx.send(ServerMsg::PlayerDied {
                victim_id,
                killer_id,
            });
        }
    }

    /// Advance movement and arena collision for every alive player
    fn update_movement(&mut self) {
        let RoomState {
            players,
            arena,
            player_stats,
            ..
        } = &mut self.state;

        for player in players.values_mut() {
            if !player.alive {
                continue;
            }
            MovementSystem::step(
                &mut player.position,
                &mut player.velocity,
                &mut player.grounded,
                arena,
                player_stats,
            );
        }
    }

    /// Advance projectiles, expire them, and resolve player hits
    fn update_projectiles(&mut self) {
        let now = self.state.tick;
        let stats = self.state.player_stats;
        let max_distance = self.state.projectile_stats.max_distance;

        let mut hits: Vec<HitResult> = Vec::new();
        let mut expired: Vec<usize> = Vec::new();

        {
            let RoomState {
                players,
                projectiles,
                arena,
                ..
            } = &mut self.state;

            for (idx, projectile) in projectiles.iter_mut().enumerate() {
                projectile.advance();

                if projectile.expired(now)
                    || projectile.out_of_bounds(max_distance)
                    || arena.intersects_sphere(projectile.position, projectile.radius)
                {
                    expired.push(idx);
                    continue;
                }

                // Each projectile scores at most one hit
                for player in players.values() {
                    if !player.alive || player.id == projectile.owner_id {
                        continue;
                    }
                    if projectile.check_hit(player.position, stats.radius, stats.height) {
                        hits.push(HitResult {
                            projectile_id: projectile.id,
                            shooter_id: projectile.owner_id,
                            target_id: player.id,
                            damage: projectile.damage,
                            position: projectile.position,
                            target_killed: false,
                        });
                        expired.push(idx);
                        break;
                    }
                }
            }

            // Remove in reverse order to keep indices valid
            expired.sort_unstable();
            expired.dedup();
            for idx in expired.into_iter().rev() {
                projectiles.remove(idx);
            }
        }

        for hit in hits {
            self.apply_damage_to(hit.target_id, hit.damage, Some(hit.shooter_id));
        }
    }

    /// Push apart every overlapping alive pair
    fn resolve_player_overlap(&mut self) {
        let radius = self.state.player_stats.radius;
        let positions: Vec<(Uuid, Vec3)> = self
            .state
            .players
            .values()
            .filter(|p| p.alive)
            .map(|p| (p.id, p.position))
            .collect();

        for i in 0..positions.len() {
            for j in (i + 1)..positions.len() {
                let (id_a, pos_a) = positions[i];
                let (id_b, pos_b) = positions[j];

                if MovementSystem::players_overlap(pos_a, pos_b, radius) {
                    let (new_a, new_b) = MovementSystem::separate_players(pos_a, pos_b, radius);
                    if let Some(a) = self.state.players.get_mut(&id_a) {
                        a.position = new_a;
                    }
                    if let Some(b) = self.state.players.get_mut(&id_b) {
                        b.position = new_b;
                    }
                }
            }
        }
    }

    /// Per-tick refresh of every player's cooldown records
    fn refresh_cooldowns(&mut self) {
        let now = self.state.tick;
        for player in self.state.players.values_mut() {
            player.abilities.refresh_all(now);
        }
    }

    /// Health regeneration for players past the damage delay
    fn apply_regen(&mut self) {
        let now = self.state.tick;
        let max_health = self.state.player_stats.max_health;
        for player in self.state.players.values_mut() {
            if player.alive
                && player.health < max_health
                && CombatSystem::regen_eligible(now, player.last_damage_tick)
            {
                player.health = CombatSystem::apply_regen(player.health, max_health);
            }
        }
    }

    /// End the match once at most one player is left alive
    fn check_win_condition(&mut self) {
        if self.phase.phase() != GamePhase::Playing {
            return;
        }
        if self.state.players.is_empty() || self.state.alive_count() > 1 {
            return;
        }

        let winner = CombatSystem::winner_of(
            self.state
                .players
                .values()
                .filter(|p| p.alive)
                .map(|p| p.id),
        );

        if let Some(winner_id) = winner {
            if let Some(winner) = self.state.players.get(&winner_id) {
                info!(winner_id = %winner_id, "Match over");
                let _ = self.snapshot_tx.send(ServerMsg::GameOver {
                    winner_id,
                    winner_name: winner.display_name.clone(),
                });
            }
        }

        let events = self
            .phase
            .on_match_end(self.state.roster.len(), self.state.tick);
        self.apply_phase_events(events);
        self.broadcast_phase_update();
    }

    /// Act on phase machine notifications
    fn apply_phase_events(&mut self, events: Vec<PhaseEvent>) {
        for event in events {
            match event {
                PhaseEvent::CountdownStarted { seconds } => {
                    self.broadcast_phase_update();
                    let _ = self.snapshot_tx.send(ServerMsg::CountdownUpdate {
                        seconds_remaining: seconds,
                    });
                }
                PhaseEvent::CountdownTick { seconds_remaining } => {
                    let _ = self.snapshot_tx.send(ServerMsg::CountdownUpdate {
                        seconds_remaining,
                    });
                }
                PhaseEvent::CountdownCancelled => {
                    self.broadcast_phase_update();
                }
                PhaseEvent::MatchStarted => {
                    self.start_match();
                    self.broadcast_phase_update();
                }
                PhaseEvent::ReturnedToWaiting => {
                    self.state.players.clear();
                    self.state.projectiles.clear();
                    self.broadcast_phase_update();
                }
            }
        }
    }

    /// Reset per-match state and respawn every connected player
    fn start_match(&mut self) {
        self.state.tick = 0;
        self.tick_counter.store(0, Ordering::Relaxed);
        self.state.projectiles.clear();
        self.state.players.clear();

        let roster: Vec<(Uuid, String)> = self
            .state
            .roster
            .iter()
            .map(|(id, name)| (*id, name.clone()))
            .collect();
        for (id, name) in roster {
            self.spawn_player(id, name);
        }

        info!(player_count = self.state.players.len(), "Match started");
    }

    fn spawn_player(&mut self, id: Uuid, display_name: String) {
        let spawn = self.state.spawn_position();
        self.state
            .players
            .insert(id, PlayerState::new(id, display_name, spawn));
    }

    fn broadcast_phase_update(&self) {
        let _ = self.snapshot_tx.send(ServerMsg::PhaseUpdate {
            phase: self.phase.phase(),
            min_players: self.phase.min_players(),
            player_count: self.state.roster.len(),
        });
    }

    fn broadcast_snapshot(&self) {
        let msg = SnapshotBuilder::build(
            self.state.tick,
            &self.state.players,
            &self.state.projectiles,
        );
        let _ = self.snapshot_tx.send(msg);
    }
}

/// Trim and cap a display name, falling back to a generated one
fn sanitize_name(name: &str, player_id: Uuid) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return format!("Player_{}", &player_id.to_string()[..8]);
    }
    trimmed.chars().take(NAME_LIMIT).collect()
}
