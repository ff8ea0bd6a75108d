//! Vehicle spawning
//!
//! Picks a spawn cell (preferring border entries that are off screen and away
//! from the player), an initial heading and a persona.

use log::trace;
use rand::seq::IndexedRandom;
use rand::Rng;

use super::agent::VehicleAgent;
use super::config::TrafficConfig;
use super::host::HostView;
use super::navigation::lane_offset_point;
use super::persona::PersonaTable;
use super::road_network::RoadNetwork;
use super::types::{AgentId, Cell};

/// Periodic spawn clock, advanced by frame time
#[derive(Debug, Clone)]
pub struct SpawnTimer {
    interval: f32,
    elapsed: f32,
    cancelled: bool,
}

impl SpawnTimer {
    pub fn new(interval: f32) -> Self {
        Self {
            interval,
            elapsed: 0.0,
            cancelled: false,
        }
    }

    /// Advance the clock and return how many times it fired
    pub fn tick(&mut self, delta_secs: f32) -> u32 {
        if self.cancelled {
            return 0;
        }
        self.elapsed += delta_secs;
        let mut fired = 0;
        while self.elapsed >= self.interval {
            self.elapsed -= self.interval;
            fired += 1;
        }
        fired
    }

    pub fn cancel(&mut self) {
        self.cancelled = true;
        self.elapsed = 0.0;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }
}

/// Why a spawn attempt produced nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnSkip {
    AtCapacity,
    NoCandidates,
    NoOpenDirection,
    /// The stepper has been shut down
    Stopped,
}

/// Cells eligible for spawning.
///
/// Border entries first; if the map has none, every drivable cell that
/// connects to at least one other drivable cell.
pub fn spawn_candidates(network: &RoadNetwork) -> Vec<Cell> {
    let mut candidates: Vec<Cell> = network
        .edge_entry_points()
        .iter()
        .map(|entry| entry.cell)
        .collect();
    candidates.dedup();

    if candidates.is_empty() {
        candidates = network.drivable_cells_with_neighbors();
    }
    candidates
}

/// Score a candidate: +2 when off screen, +1 when far from the player
pub fn score_candidate(
    network: &RoadNetwork,
    config: &TrafficConfig,
    host: &dyn HostView,
    cell: Cell,
) -> u32 {
    let center = network.cell_center(cell);
    let mut score = 0;
    if !host
        .camera_view()
        .contains_with_margin(&center, config.offscreen_margin)
    {
        score += 2;
    }
    if center.distance(&host.player_position()) > config.spawn_bias_radius {
        score += 1;
    }
    score
}

/// Build a new agent, or explain why none can be placed right now
pub fn plan_spawn<R: Rng + ?Sized>(
    id: AgentId,
    live_count: usize,
    network: &RoadNetwork,
    config: &TrafficConfig,
    personas: &PersonaTable,
    host: &dyn HostView,
    rng: &mut R,
) -> Result<VehicleAgent, SpawnSkip> {
    if live_count >= config.max_vehicles {
        return Err(SpawnSkip::AtCapacity);
    }

    let scored: Vec<(Cell, u32)> = spawn_candidates(network)
        .into_iter()
        .map(|cell| (cell, score_candidate(network, config, host, cell)))
        .collect();

    let best_score = scored
        .iter()
        .map(|(_, score)| *score)
        .max()
        .ok_or(SpawnSkip::NoCandidates)?;

    let best: Vec<Cell> = scored
        .iter()
        .filter(|(_, score)| *score == best_score)
        .map(|(cell, _)| *cell)
        .collect();

    let cell = *best.choose(rng).ok_or(SpawnSkip::NoCandidates)?;

    let open = network.neighbors(cell).open_directions();
    let direction = *open.choose(rng).ok_or(SpawnSkip::NoOpenDirection)?;

    let persona = personas.sample(rng);
    let position = lane_offset_point(
        cell,
        direction,
        network.is_roundabout(cell),
        network.tile_size(),
        config.lane_offset_fraction,
        config.roundabout_lane_fraction,
    );

    trace!(
        "Spawn candidate {:?} chosen from {} at score {}",
        cell,
        best.len(),
        best_score
    );

    Ok(VehicleAgent::new(id, position, direction, persona, cell))
}
