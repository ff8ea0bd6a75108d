//! Standalone grid traffic simulation
//!
//! Vehicle agents wander a tile grid of classified cells, making local turn
//! decisions at each new cell, curving through corners, orbiting roundabouts
//! and keeping their distance from the car ahead. Nothing here depends on a
//! renderer; hosts read [`AgentSnapshot`]s each frame.

mod agent;
mod config;
mod grid;
mod host;
mod navigation;
mod persona;
mod road_network;
mod spawner;
mod stepper;
mod types;

pub use agent::{
    entry_orbit_key, next_orbit_key, AgentState, RoundaboutState, TurnState, VehicleAgent,
};
pub use config::{TrafficConfig, TurnWeights};
pub use grid::{BuildingKind, CellType, Grid, DEMO_CITY};
pub use host::{HostView, StaticHost};
pub use navigation::{
    bezier_point, bezier_tangent, classify_turn, corner_control_point, estimate_curve_length,
    lane_offset_point, reverse, right_of, turn_left, turn_right, u_turn_control_point, TurnKind,
};
pub use persona::{default_personas, Persona, PersonaKind, PersonaTable, WeightedPersona};
pub use road_network::{EdgeEntry, Neighbors, RoadNetwork};
pub use spawner::{plan_spawn, score_candidate, spawn_candidates, SpawnSkip, SpawnTimer};
pub use stepper::{
    follow_gap_factor, governed_speed, nearest_ahead, AgentSnapshot, AgentUpdateResult,
    DespawnReason, TrafficEvent, TrafficPeer, TrafficStats, TrafficStepper,
};
pub use types::{AgentId, Cell, Direction, Vec2, ViewRect};
