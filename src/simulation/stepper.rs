//! Per-frame traffic stepper
//!
//! Owns the live agent list. Each frame it advances the spawn timer, then
//! moves every agent according to its state: cruising (with edge-triggered
//! turn decisions), following a turn curve, or orbiting a roundabout.

use anyhow::{Context, Result};
use log::{debug, trace, warn};
use ordered_float::OrderedFloat;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};

use super::agent::{next_orbit_key, AgentState, RoundaboutState, TurnState, VehicleAgent};
use super::config::TrafficConfig;
use super::grid::Grid;
use super::host::HostView;
use super::navigation::{
    classify_turn, corner_control_point, estimate_curve_length, lane_offset_point, reverse,
    turn_left, turn_right, u_turn_control_point, TurnKind,
};
use super::persona::{Persona, PersonaKind, PersonaTable};
use super::road_network::RoadNetwork;
use super::spawner::{plan_spawn, SpawnSkip, SpawnTimer};
use super::types::{AgentId, Cell, Direction, Vec2};

/// Largest distance, as a fraction of tile size, an agent covers in one sub-step
const MAX_SUBSTEP_TILE_FRACTION: f32 = 0.5;

/// Why an agent was removed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DespawnReason {
    /// Drove past the despawn margin around the grid
    OffGrid,
    /// No forward, left, right or reverse option two cells deep
    DeadEnd,
    /// The renderer dropped the agent's visual
    HandleInactive,
    /// The cell under a cruising agent stopped being drivable
    CellNotDrivable,
}

/// Result of updating one agent for one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentUpdateResult {
    Continue,
    Despawn(DespawnReason),
}

/// Notable things that happened during a frame
#[derive(Debug, Clone, PartialEq)]
pub enum TrafficEvent {
    Spawned {
        id: AgentId,
        cell: Cell,
        direction: Direction,
        persona: PersonaKind,
    },
    Despawned {
        id: AgentId,
        reason: DespawnReason,
    },
    TurnStarted {
        id: AgentId,
        kind: TurnKind,
        /// First point of the curve
        start: Vec2,
        end: Vec2,
        to: Direction,
    },
    TurnCompleted {
        id: AgentId,
        direction: Direction,
        position: Vec2,
    },
    RoundaboutEntered {
        id: AgentId,
        anchor: Cell,
        orbit_key: Direction,
    },
    /// Orbit handed over to the next cell of a roundabout cluster
    RoundaboutTransferred {
        id: AgentId,
        from: Cell,
        to: Cell,
        laps: f32,
    },
    RoundaboutExited {
        id: AgentId,
        anchor: Cell,
        exit: Direction,
        laps: f32,
    },
}

/// Running counters for a stepper
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrafficStats {
    pub spawned: u64,
    pub skipped_spawns: u64,
    pub despawned_off_grid: u64,
    pub despawned_dead_end: u64,
    pub despawned_inactive: u64,
    pub despawned_not_drivable: u64,
    pub turns_completed: u64,
    pub roundabout_exits: u64,
    pub elapsed_time: f32,
}

impl TrafficStats {
    pub fn total_despawned(&self) -> u64 {
        self.despawned_off_grid
            + self.despawned_dead_end
            + self.despawned_inactive
            + self.despawned_not_drivable
    }

    fn record_despawn(&mut self, reason: DespawnReason) {
        match reason {
            DespawnReason::OffGrid => self.despawned_off_grid += 1,
            DespawnReason::DeadEnd => self.despawned_dead_end += 1,
            DespawnReason::HandleInactive => self.despawned_inactive += 1,
            DespawnReason::CellNotDrivable => self.despawned_not_drivable += 1,
        }
    }
}

/// What a render adapter needs to draw one agent
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgentSnapshot {
    pub id: AgentId,
    pub position: Vec2,
    pub direction: Direction,
    /// Smoothed heading in radians; follows the curve tangent while turning
    pub heading: f32,
    pub persona: PersonaKind,
}

/// Position and heading of another agent, as seen by the follow-gap governor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrafficPeer {
    pub id: AgentId,
    pub position: Vec2,
    pub direction: Direction,
}

/// Fraction of full speed kept when the vehicle ahead is `distance` away
pub fn follow_gap_factor(distance: f32, follow_gap: f32) -> f32 {
    if follow_gap <= 0.0 {
        return 1.0;
    }
    (distance / follow_gap).clamp(0.0, 1.0)
}

/// Forward distance to the nearest peer heading the same way and ahead of
/// `position`
pub fn nearest_ahead(
    id: AgentId,
    position: Vec2,
    direction: Direction,
    peers: &[TrafficPeer],
) -> Option<f32> {
    let forward = direction.unit();
    peers
        .iter()
        .filter(|peer| peer.id != id && peer.direction == direction)
        .map(|peer| (peer.position - position).dot(&forward))
        .filter(|distance| *distance > 0.0)
        .min_by_key(|distance| OrderedFloat(*distance))
}

/// Speed after applying the follow-gap governor
pub fn governed_speed(full_speed: f32, persona: &Persona, ahead: Option<f32>) -> f32 {
    match ahead {
        Some(distance) if distance < persona.follow_gap => {
            full_speed * follow_gap_factor(distance, persona.follow_gap)
        }
        _ => full_speed,
    }
}

/// Outcome of a decision at a newly entered cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decision {
    Continue,
    Turn(Direction),
    DeadEnd,
}

/// Read-only inputs shared by every agent update in a frame
struct FrameContext<'a> {
    network: &'a RoadNetwork,
    config: &'a TrafficConfig,
    peers: &'a [TrafficPeer],
}

impl FrameContext<'_> {
    fn lane_point(&self, cell: Cell, direction: Direction) -> Vec2 {
        lane_offset_point(
            cell,
            direction,
            self.network.is_roundabout(cell),
            self.network.tile_size(),
            self.config.lane_offset_fraction,
            self.config.roundabout_lane_fraction,
        )
    }

    fn speed_for(&self, agent: &VehicleAgent) -> f32 {
        let ahead = nearest_ahead(agent.id, agent.position, agent.direction, self.peers);
        governed_speed(agent.cruise_speed(self.config.base_speed), &agent.persona, ahead)
    }

    fn step_agent<R: Rng + ?Sized>(
        &self,
        agent: &mut VehicleAgent,
        delta_secs: f32,
        rng: &mut R,
        events: &mut Vec<TrafficEvent>,
    ) -> AgentUpdateResult {
        let result = match agent.state {
            AgentState::Cruising => self.step_cruising(agent, delta_secs, rng, events),
            AgentState::Turning(_) => self.step_turning(agent, delta_secs, events),
            AgentState::Orbiting(_) => self.step_orbiting(agent, delta_secs, events),
        };

        if result == AgentUpdateResult::Continue
            && self
                .network
                .is_beyond_margin(agent.position, self.config.despawn_margin)
        {
            return AgentUpdateResult::Despawn(DespawnReason::OffGrid);
        }
        result
    }

    fn step_cruising<R: Rng + ?Sized>(
        &self,
        agent: &mut VehicleAgent,
        delta_secs: f32,
        rng: &mut R,
        events: &mut Vec<TrafficEvent>,
    ) -> AgentUpdateResult {
        let cell = self.network.cell_at(agent.position);

        if self.network.is_in_bounds(cell) {
            if self.network.is_roundabout(cell) {
                if agent.enter_roundabout(cell) {
                    if let Some(orbit) = agent.roundabout() {
                        debug!("Agent {:?} entered roundabout {:?}", agent.id, cell);
                        events.push(TrafficEvent::RoundaboutEntered {
                            id: agent.id,
                            anchor: cell,
                            orbit_key: orbit.orbit_key,
                        });
                    }
                }
                return self.step_orbiting(agent, delta_secs, events);
            }

            if !self.network.is_drivable(cell) {
                return AgentUpdateResult::Despawn(DespawnReason::CellNotDrivable);
            }

            if agent.last_cell != Some(cell) {
                agent.last_cell = Some(cell);
                match self.decide(agent, cell, rng) {
                    Decision::Continue => {}
                    Decision::DeadEnd => {
                        return AgentUpdateResult::Despawn(DespawnReason::DeadEnd);
                    }
                    Decision::Turn(to) => {
                        self.begin_turn(agent, cell, to, events);
                        return self.step_turning(agent, delta_secs, events);
                    }
                }
            }
        }

        let distance = self.speed_for(agent) * delta_secs;
        agent.position = agent.position + agent.direction.unit() * distance;

        // Hold the lane: snap the cross axis back onto the lane line
        let lane = lane_offset_point(
            self.network.cell_at(agent.position),
            agent.direction,
            false,
            self.network.tile_size(),
            self.config.lane_offset_fraction,
            self.config.roundabout_lane_fraction,
        );
        if agent.direction.is_horizontal() {
            agent.position.y = lane.y;
        } else {
            agent.position.x = lane.x;
        }

        AgentUpdateResult::Continue
    }

    /// Pick where to go from a newly entered cell
    fn decide<R: Rng + ?Sized>(&self, agent: &VehicleAgent, cell: Cell, rng: &mut R) -> Decision {
        let forward = agent.direction;
        if self.network.is_exit_edge(cell, forward) {
            return Decision::Continue;
        }

        let blocked = !self.network.is_drivable(cell.step(forward, 1));
        if !blocked && rng.random::<f32>() >= self.config.exploration_probability {
            return Decision::Continue;
        }

        let weights = self.config.turn_weights;
        let mut options: Vec<(Direction, f32)> = Vec::with_capacity(3);
        if !blocked && self.network.leads_on(cell, forward) {
            options.push((forward, weights.forward));
        }
        for (turned, weight) in [
            (turn_left(forward), weights.left),
            (turn_right(forward), weights.right),
        ] {
            if self.network.leads_on(cell, turned) {
                options.push((turned, weight));
            }
        }
        if options.is_empty() && self.network.leads_on(cell, reverse(forward)) {
            options.push((reverse(forward), weights.reverse));
        }

        let chosen = options
            .choose_weighted(rng, |(_, weight)| *weight)
            .ok()
            .map(|(direction, _)| *direction);

        trace!(
            "Agent {:?} at {:?} weighed {} options, blocked={}",
            agent.id,
            cell,
            options.len(),
            blocked
        );

        match chosen {
            Some(direction) if direction == forward => Decision::Continue,
            Some(direction) => Decision::Turn(direction),
            None if blocked => Decision::DeadEnd,
            None => Decision::Continue,
        }
    }

    fn begin_turn(
        &self,
        agent: &mut VehicleAgent,
        cell: Cell,
        to: Direction,
        events: &mut Vec<TrafficEvent>,
    ) {
        let from = agent.direction;
        let kind = classify_turn(from, to);
        let start = agent.position;
        let end = self.lane_point(cell.step(to, 1), to);
        let control = match kind {
            TurnKind::UTurn => u_turn_control_point(
                start,
                end,
                from,
                self.config.lane_offset_fraction * self.network.tile_size(),
            ),
            _ => corner_control_point(start, end, from, to),
        };
        let arc_length = estimate_curve_length(start, control, end, self.config.curve_segments);

        let turn = TurnState {
            start,
            control,
            end,
            s: 0.0,
            arc_length,
            next_direction: to,
        };

        if agent.begin_turn(turn) {
            debug!(
                "Agent {:?} turning {:?} from {:?} to {:?} at {:?}",
                agent.id, kind, from, to, cell
            );
            events.push(TrafficEvent::TurnStarted {
                id: agent.id,
                kind,
                start,
                end,
                to,
            });
        }
    }

    fn step_turning(
        &self,
        agent: &mut VehicleAgent,
        delta_secs: f32,
        events: &mut Vec<TrafficEvent>,
    ) -> AgentUpdateResult {
        let distance = self.speed_for(agent) * delta_secs;
        if agent.advance_turn(distance) {
            events.push(TrafficEvent::TurnCompleted {
                id: agent.id,
                direction: agent.direction,
                position: agent.position,
            });
        }
        AgentUpdateResult::Continue
    }

    fn step_orbiting(
        &self,
        agent: &mut VehicleAgent,
        delta_secs: f32,
        events: &mut Vec<TrafficEvent>,
    ) -> AgentUpdateResult {
        let Some(orbit) = agent.roundabout().copied() else {
            return AgentUpdateResult::Continue;
        };

        let radius = self.config.roundabout_radius_fraction * self.network.tile_size();
        let waypoint = self.network.cell_center(orbit.anchor) + orbit.orbit_key.unit() * radius;
        let step = agent.cruise_speed(self.config.base_speed) * delta_secs;
        let to_waypoint = waypoint - agent.position;
        let remaining = to_waypoint.length();

        if remaining > step.max(self.config.waypoint_arrival_threshold) {
            agent.position = agent.position + to_waypoint * (step / remaining);
            return AgentUpdateResult::Continue;
        }

        agent.position = waypoint;
        let advanced = RoundaboutState {
            orbit_key: next_orbit_key(orbit.orbit_key),
            laps: orbit.laps + 0.25,
            ..orbit
        };
        agent.state = AgentState::Orbiting(advanced);

        // Exits leave along the key just advanced to, not the waypoint the agent
        // stands on, and land on that neighbour's lane point.
        let exit = advanced.orbit_key;
        let exit_cell = orbit.anchor.step(exit, 1);
        if advanced.laps < 1.0 {
            return AgentUpdateResult::Continue;
        }

        if self.network.is_roundabout(exit_cell) {
            if agent.transfer_roundabout(exit_cell, exit) {
                debug!(
                    "Agent {:?} moved from roundabout {:?} to {:?} at {} laps",
                    agent.id, orbit.anchor, exit_cell, advanced.laps
                );
                events.push(TrafficEvent::RoundaboutTransferred {
                    id: agent.id,
                    from: orbit.anchor,
                    to: exit_cell,
                    laps: advanced.laps,
                });
            }
        } else if self.network.is_drivable(exit_cell) {
            agent.exit_roundabout(exit, self.lane_point(exit_cell, exit));
            debug!(
                "Agent {:?} left roundabout {:?} heading {:?} after {} laps",
                agent.id, orbit.anchor, exit, advanced.laps
            );
            events.push(TrafficEvent::RoundaboutExited {
                id: agent.id,
                anchor: orbit.anchor,
                exit,
                laps: advanced.laps,
            });
        }

        AgentUpdateResult::Continue
    }
}

/// The traffic simulation: a road network, its live agents and a spawn clock
pub struct TrafficStepper<R: Rng = StdRng> {
    network: RoadNetwork,
    config: TrafficConfig,
    personas: PersonaTable,
    rng: R,
    agents: Vec<VehicleAgent>,
    spawn_timer: SpawnTimer,
    next_id: u64,
    stats: TrafficStats,
}

impl TrafficStepper<StdRng> {
    /// Create a stepper with a reproducible random source
    pub fn with_seed(network: RoadNetwork, config: TrafficConfig, seed: u64) -> Result<Self> {
        Self::new(network, config, StdRng::seed_from_u64(seed))
    }

    /// Create a stepper seeded from the operating system
    pub fn from_entropy(network: RoadNetwork, config: TrafficConfig) -> Result<Self> {
        Self::new(network, config, StdRng::from_os_rng())
    }
}

impl<R: Rng> TrafficStepper<R> {
    pub fn new(network: RoadNetwork, config: TrafficConfig, rng: R) -> Result<Self> {
        let personas = config.validate().context("Invalid traffic configuration")?;
        if network.tile_size() <= 0.0 {
            anyhow::bail!("Tile size must be positive, got {}", network.tile_size());
        }

        let islands = network.unreachable_islands();
        if !islands.is_empty() {
            warn!(
                "{} road islands are not reachable from any map edge ({} cells)",
                islands.len(),
                islands.iter().map(|island| island.len()).sum::<usize>()
            );
        }

        let spawn_timer = SpawnTimer::new(config.spawn_interval);
        Ok(Self {
            network,
            config,
            personas,
            rng,
            agents: Vec::new(),
            spawn_timer,
            next_id: 0,
            stats: TrafficStats::default(),
        })
    }

    pub fn network(&self) -> &RoadNetwork {
        &self.network
    }

    pub fn config(&self) -> &TrafficConfig {
        &self.config
    }

    pub fn agents(&self) -> &[VehicleAgent] {
        &self.agents
    }

    pub fn agent(&self, id: AgentId) -> Option<&VehicleAgent> {
        self.agents.iter().find(|agent| agent.id == id)
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    pub fn stats(&self) -> &TrafficStats {
        &self.stats
    }

    /// Swap in a rebuilt grid from the city builder. Agents left on cells
    /// that are no longer drivable are removed on their next update.
    pub fn replace_grid(&mut self, grid: Grid) {
        debug!("Grid replaced ({}x{})", grid.width(), grid.height());
        self.network.replace_grid(grid);
    }

    fn next_agent_id(&mut self) -> AgentId {
        let id = AgentId(self.next_id);
        self.next_id += 1;
        id
    }

    /// One spawn attempt, as fired by the spawn timer
    pub fn try_spawn(&mut self, host: &dyn HostView) -> Result<AgentId, SpawnSkip> {
        if self.spawn_timer.is_cancelled() {
            return Err(SpawnSkip::Stopped);
        }

        let id = AgentId(self.next_id);
        let planned = plan_spawn(
            id,
            self.agents.len(),
            &self.network,
            &self.config,
            &self.personas,
            host,
            &mut self.rng,
        );

        match planned {
            Ok(agent) => {
                self.next_id += 1;
                debug!(
                    "Spawned agent {:?} ({:?}) at {:?} heading {:?}",
                    id, agent.persona.kind, agent.last_cell, agent.direction
                );
                self.stats.spawned += 1;
                self.agents.push(agent);
                Ok(id)
            }
            Err(skip) => {
                trace!("Spawn skipped: {:?}", skip);
                self.stats.skipped_spawns += 1;
                Err(skip)
            }
        }
    }

    /// Place an agent at an exact position, bypassing candidate selection.
    /// Capacity still applies.
    pub fn spawn_agent_at_position(
        &mut self,
        position: Vec2,
        direction: Direction,
        persona: Persona,
    ) -> Option<AgentId> {
        if self.spawn_timer.is_cancelled() || self.agents.len() >= self.config.max_vehicles {
            return None;
        }
        let id = self.next_agent_id();
        let cell = self.network.cell_at(position);
        self.agents
            .push(VehicleAgent::new(id, position, direction, persona, cell));
        self.stats.spawned += 1;
        Some(id)
    }

    /// Place an agent on the lane point of `cell` for `direction`
    pub fn spawn_agent_at(
        &mut self,
        cell: Cell,
        direction: Direction,
        persona: Persona,
    ) -> Option<AgentId> {
        if !self.network.is_drivable(cell) {
            return None;
        }
        let position = lane_offset_point(
            cell,
            direction,
            self.network.is_roundabout(cell),
            self.network.tile_size(),
            self.config.lane_offset_fraction,
            self.config.roundabout_lane_fraction,
        );
        self.spawn_agent_at_position(position, direction, persona)
    }

    /// Positions and headings of every live agent
    pub fn peers(&self) -> Vec<TrafficPeer> {
        self.agents
            .iter()
            .map(|agent| TrafficPeer {
                id: agent.id,
                position: agent.position,
                direction: agent.direction,
            })
            .collect()
    }

    /// Current follow-gap governed speed of an agent
    pub fn governed_speed_of(&self, id: AgentId) -> Option<f32> {
        let agent = self.agent(id)?;
        let peers = self.peers();
        let ahead = nearest_ahead(agent.id, agent.position, agent.direction, &peers);
        Some(governed_speed(
            agent.cruise_speed(self.config.base_speed),
            &agent.persona,
            ahead,
        ))
    }

    /// Advance the spawn timer and every agent by one frame
    pub fn update(&mut self, delta_secs: f32, host: &dyn HostView) -> Vec<TrafficEvent> {
        let mut events = Vec::new();

        for _ in 0..self.spawn_timer.tick(delta_secs) {
            if let Ok(id) = self.try_spawn(host) {
                if let Some(agent) = self.agent(id) {
                    events.push(TrafficEvent::Spawned {
                        id,
                        cell: self.network.cell_at(agent.position),
                        direction: agent.direction,
                        persona: agent.persona.kind,
                    });
                }
            }
        }

        events.extend(self.step_agents(delta_secs, host));
        events
    }

    /// Move every agent by one frame and remove the ones that are done.
    ///
    /// Peers are read from a snapshot taken at the start of the frame, so the
    /// update order of agents does not matter. Each agent moves in sub-steps of
    /// at most half a tile.
    pub fn step_agents(&mut self, delta_secs: f32, host: &dyn HostView) -> Vec<TrafficEvent> {
        if !delta_secs.is_finite() || delta_secs < 0.0 {
            warn!("Ignoring frame with invalid delta {}", delta_secs);
            return Vec::new();
        }
        self.stats.elapsed_time += delta_secs;

        let peers = self.peers();
        let context = FrameContext {
            network: &self.network,
            config: &self.config,
            peers: &peers,
        };

        let mut events = Vec::new();
        let mut results = Vec::with_capacity(self.agents.len());

        let max_travel = self.network.tile_size() * MAX_SUBSTEP_TILE_FRACTION;

        for agent in self.agents.iter_mut() {
            if !host.is_handle_active(agent.id) {
                results.push((
                    agent.id,
                    AgentUpdateResult::Despawn(DespawnReason::HandleInactive),
                ));
                continue;
            }

            // Long frames are split so no sub-step skips over a cell
            let travel = agent.cruise_speed(self.config.base_speed) * delta_secs;
            let substeps = (travel / max_travel).ceil().max(1.0) as u32;
            let sub_delta = delta_secs / substeps as f32;

            let mut result = AgentUpdateResult::Continue;
            for _ in 0..substeps {
                result = context.step_agent(agent, sub_delta, &mut self.rng, &mut events);
                if result != AgentUpdateResult::Continue {
                    break;
                }
            }
            results.push((agent.id, result));
        }

        for (id, result) in results {
            if let AgentUpdateResult::Despawn(reason) = result {
                debug!("Despawning agent {:?}: {:?}", id, reason);
                self.stats.record_despawn(reason);
                self.agents.retain(|agent| agent.id != id);
                events.push(TrafficEvent::Despawned { id, reason });
            }
        }

        for event in &events {
            match event {
                TrafficEvent::TurnCompleted { .. } => self.stats.turns_completed += 1,
                TrafficEvent::RoundaboutExited { .. } => self.stats.roundabout_exits += 1,
                _ => {}
            }
        }

        events
    }

    /// Render-facing view of every agent
    pub fn snapshots(&self) -> Vec<AgentSnapshot> {
        self.agents
            .iter()
            .map(|agent| AgentSnapshot {
                id: agent.id,
                position: agent.position,
                direction: agent.direction,
                heading: agent.heading(),
                persona: agent.persona.kind,
            })
            .collect()
    }

    /// Stop spawning and drop every agent. Nothing runs after this returns.
    pub fn shutdown(&mut self) {
        self.spawn_timer.cancel();
        let removed = self.agents.len();
        self.agents.clear();
        debug!("Traffic stepper shut down, {} agents removed", removed);
    }

    /// Multi-line human readable status
    pub fn summary(&self) -> String {
        let stats = &self.stats;
        let turning = self.agents.iter().filter(|a| a.turn().is_some()).count();
        let orbiting = self.agents.iter().filter(|a| a.roundabout().is_some()).count();
        let mut lines = vec![
            "=== Traffic Summary ===".to_string(),
            format!("Time: {:.2}s", stats.elapsed_time),
            format!(
                "Grid: {}x{} (tile {})",
                self.network.grid().width(),
                self.network.grid().height(),
                self.network.tile_size()
            ),
            format!(
                "Active agents: {} (turning {}, orbiting {})",
                self.agents.len(),
                turning,
                orbiting
            ),
            format!(
                "Spawned: {}, skipped spawns: {}",
                stats.spawned, stats.skipped_spawns
            ),
            format!(
                "Despawned: {} (off grid {}, dead end {}, inactive {}, not drivable {})",
                stats.total_despawned(),
                stats.despawned_off_grid,
                stats.despawned_dead_end,
                stats.despawned_inactive,
                stats.despawned_not_drivable
            ),
            format!(
                "Turns completed: {}, roundabout exits: {}",
                stats.turns_completed, stats.roundabout_exits
            ),
        ];
        for agent in &self.agents {
            lines.push(format!(
                "  Agent {:?}: {:?} at ({:.1}, {:.1}) heading {}",
                agent.id.0,
                agent.persona.kind,
                agent.position.x,
                agent.position.y,
                agent.direction.letter()
            ));
        }
        lines.join("\n")
    }

    /// Draw the grid with agents as arrows
    pub fn render_ascii(&self) -> String {
        let grid = self.network.grid();
        let mut rows: Vec<Vec<char>> = (0..grid.height())
            .map(|y| {
                (0..grid.width())
                    .map(|x| grid.get(Cell::new(x, y)).symbol())
                    .collect()
            })
            .collect();

        for agent in &self.agents {
            let cell = self.network.cell_at(agent.position);
            if !self.network.is_in_bounds(cell) {
                continue;
            }
            let arrow = match agent.direction {
                Direction::North => '^',
                Direction::South => 'v',
                Direction::East => '>',
                Direction::West => '<',
            };
            rows[cell.y as usize][cell.x as usize] = arrow;
        }

        let mut out = String::from("Legend: ==Road #=Avenue O=Roundabout .=Empty ^v<>=Agent\n");
        for row in rows {
            out.extend(row);
            out.push('\n');
        }
        out
    }
}
