//! Tunable traffic parameters
//!
//! The defaults were tuned by eye against a 32-unit tile and about ten cars on
//! screen. None of the exact values are load-bearing.

use anyhow::Result;

use super::persona::{default_personas, PersonaTable, WeightedPersona};

/// Relative weights of the options considered at a decision point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TurnWeights {
    pub forward: f32,
    pub left: f32,
    pub right: f32,
    /// Only used when nothing else is available
    pub reverse: f32,
}

impl Default for TurnWeights {
    fn default() -> Self {
        Self {
            forward: 6.0,
            left: 2.0,
            right: 2.0,
            reverse: 1.0,
        }
    }
}

/// Configuration for the traffic stepper
#[derive(Debug, Clone)]
pub struct TrafficConfig {
    /// Maximum number of live agents
    pub max_vehicles: usize,
    /// Seconds between spawn attempts
    pub spawn_interval: f32,
    /// World units per second before persona scaling
    pub base_speed: f32,
    pub personas: Vec<WeightedPersona>,
    /// Orbit ring radius as a fraction of tile size
    pub roundabout_radius_fraction: f32,
    /// Perpendicular lane offset as a fraction of tile size
    pub lane_offset_fraction: f32,
    /// Radial offset of the entry point on roundabout cells
    pub roundabout_lane_fraction: f32,
    /// Spawns farther than this from the player score higher
    pub spawn_bias_radius: f32,
    /// Margin around the camera view when scoring spawn candidates
    pub offscreen_margin: f32,
    /// Distance outside the grid at which agents are removed
    pub despawn_margin: f32,
    /// Chance of re-evaluating at a cell whose forward way is clear
    pub exploration_probability: f32,
    pub turn_weights: TurnWeights,
    /// Distance at which an orbiting agent counts as having reached a waypoint
    pub waypoint_arrival_threshold: f32,
    /// Segments used when estimating curve length
    pub curve_segments: u32,
}

impl Default for TrafficConfig {
    fn default() -> Self {
        Self {
            max_vehicles: 10,
            spawn_interval: 1.2,
            base_speed: 60.0,
            personas: default_personas(),
            roundabout_radius_fraction: 0.3,
            lane_offset_fraction: 0.2,
            roundabout_lane_fraction: 0.12,
            spawn_bias_radius: 320.0,
            offscreen_margin: 64.0,
            despawn_margin: 16.0,
            exploration_probability: 0.15,
            turn_weights: TurnWeights::default(),
            waypoint_arrival_threshold: 1.0,
            curve_segments: 10,
        }
    }
}

impl TrafficConfig {
    /// Check every option and build the persona distribution
    pub fn validate(&self) -> Result<PersonaTable> {
        if self.spawn_interval <= 0.0 {
            anyhow::bail!("spawn_interval must be positive, got {}", self.spawn_interval);
        }
        if self.base_speed <= 0.0 {
            anyhow::bail!("base_speed must be positive, got {}", self.base_speed);
        }
        for (name, fraction) in [
            ("roundabout_radius_fraction", self.roundabout_radius_fraction),
            ("lane_offset_fraction", self.lane_offset_fraction),
            ("roundabout_lane_fraction", self.roundabout_lane_fraction),
        ] {
            if fraction <= 0.0 || fraction > 0.5 {
                anyhow::bail!("{} must be in (0, 0.5], got {}", name, fraction);
            }
        }
        for (name, margin) in [
            ("spawn_bias_radius", self.spawn_bias_radius),
            ("offscreen_margin", self.offscreen_margin),
            ("despawn_margin", self.despawn_margin),
        ] {
            if margin < 0.0 {
                anyhow::bail!("{} must not be negative, got {}", name, margin);
            }
        }
        if !(0.0..=1.0).contains(&self.exploration_probability) {
            anyhow::bail!(
                "exploration_probability must be in [0, 1], got {}",
                self.exploration_probability
            );
        }
        if self.waypoint_arrival_threshold <= 0.0 {
            anyhow::bail!("waypoint_arrival_threshold must be positive");
        }
        let weights = self.turn_weights;
        if [weights.forward, weights.left, weights.right, weights.reverse]
            .iter()
            .any(|weight| *weight <= 0.0)
        {
            anyhow::bail!("turn weights must all be positive: {:?}", weights);
        }

        PersonaTable::new(self.personas.clone())
    }
}
