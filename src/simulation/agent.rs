//! Vehicle agent record and its state transitions
//!
//! An agent is always in exactly one of three states: cruising, following a
//! turn curve, or orbiting a roundabout.

use super::navigation::{bezier_point, bezier_tangent};
use super::persona::Persona;
use super::types::{AgentId, Cell, Direction, Vec2};

/// An in-progress quadratic turn
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TurnState {
    pub start: Vec2,
    pub control: Vec2,
    pub end: Vec2,
    /// Curve parameter in [0, 1]
    pub s: f32,
    pub arc_length: f32,
    /// Heading adopted when the curve completes
    pub next_direction: Direction,
}

impl TurnState {
    pub fn point(&self) -> Vec2 {
        bezier_point(self.start, self.control, self.end, self.s)
    }

    pub fn tangent(&self) -> Vec2 {
        bezier_tangent(self.start, self.control, self.end, self.s)
    }

    pub fn is_complete(&self) -> bool {
        self.s >= 1.0
    }
}

/// Orbit progress around a roundabout cell
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoundaboutState {
    pub anchor: Cell,
    /// Cardinal waypoint currently being approached
    pub orbit_key: Direction,
    /// Quarter-lap counter; exits are allowed from 1.0
    pub laps: f32,
}

/// What the agent is currently doing
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AgentState {
    Cruising,
    Turning(TurnState),
    Orbiting(RoundaboutState),
}

/// A single simulated vehicle
#[derive(Debug, Clone)]
pub struct VehicleAgent {
    pub id: AgentId,
    pub position: Vec2,
    pub direction: Direction,
    pub persona: Persona,
    /// Cell of the last decision, so decisions fire once per cell entry
    pub last_cell: Option<Cell>,
    pub state: AgentState,
}

impl VehicleAgent {
    pub fn new(
        id: AgentId,
        position: Vec2,
        direction: Direction,
        persona: Persona,
        spawn_cell: Cell,
    ) -> Self {
        Self {
            id,
            position,
            direction,
            persona,
            last_cell: Some(spawn_cell),
            state: AgentState::Cruising,
        }
    }

    pub fn is_cruising(&self) -> bool {
        matches!(self.state, AgentState::Cruising)
    }

    pub fn turn(&self) -> Option<&TurnState> {
        match &self.state {
            AgentState::Turning(turn) => Some(turn),
            _ => None,
        }
    }

    pub fn roundabout(&self) -> Option<&RoundaboutState> {
        match &self.state {
            AgentState::Orbiting(orbit) => Some(orbit),
            _ => None,
        }
    }

    /// Ungoverned speed for this agent's persona
    pub fn cruise_speed(&self, base_speed: f32) -> f32 {
        self.persona.speed_multiplier * base_speed
    }

    /// Start a turn. Only valid while cruising.
    pub fn begin_turn(&mut self, turn: TurnState) -> bool {
        if !self.is_cruising() {
            return false;
        }
        self.state = AgentState::Turning(turn);
        true
    }

    /// Move along the active curve. Returns `true` once the turn has finished,
    /// at which point the agent sits exactly on the curve end and cruises on.
    pub fn advance_turn(&mut self, distance: f32) -> bool {
        let AgentState::Turning(turn) = &mut self.state else {
            return false;
        };

        if turn.arc_length > f32::EPSILON {
            turn.s = (turn.s + distance / turn.arc_length).min(1.0);
        } else {
            turn.s = 1.0;
        }

        if turn.is_complete() {
            let end = turn.end;
            self.direction = turn.next_direction;
            self.position = end;
            self.state = AgentState::Cruising;
            true
        } else {
            self.position = turn.point();
            false
        }
    }

    /// Start orbiting `anchor`. An agent already orbiting keeps its existing
    /// anchor and orbit key.
    pub fn enter_roundabout(&mut self, anchor: Cell) -> bool {
        match self.state {
            AgentState::Orbiting(_) => false,
            AgentState::Turning(_) => false,
            AgentState::Cruising => {
                self.state = AgentState::Orbiting(RoundaboutState {
                    anchor,
                    orbit_key: entry_orbit_key(self.direction),
                    laps: 0.0,
                });
                self.last_cell = Some(anchor);
                true
            }
        }
    }

    /// Move an active orbit onto a neighbouring roundabout cell reached by
    /// travelling `heading`. Laps carry over; the orbit key restarts from the
    /// side of the new cell the agent arrives on.
    pub fn transfer_roundabout(&mut self, anchor: Cell, heading: Direction) -> bool {
        let AgentState::Orbiting(orbit) = &mut self.state else {
            return false;
        };
        orbit.anchor = anchor;
        orbit.orbit_key = entry_orbit_key(heading);
        self.last_cell = Some(anchor);
        true
    }

    /// Leave the roundabout heading `exit`, placed at `lane_point`
    pub fn exit_roundabout(&mut self, exit: Direction, lane_point: Vec2) {
        self.state = AgentState::Cruising;
        self.direction = exit;
        self.position = lane_point;
    }

    /// Smoothed heading angle for render adapters
    pub fn heading(&self) -> f32 {
        match &self.state {
            AgentState::Turning(turn) => {
                let tangent = turn.tangent();
                if tangent.length() > f32::EPSILON {
                    tangent.angle()
                } else {
                    self.direction.unit().angle()
                }
            }
            AgentState::Orbiting(orbit) => {
                let previous = super::navigation::turn_right(orbit.orbit_key);
                (orbit.orbit_key.unit() - previous.unit()).angle()
            }
            AgentState::Cruising => self.direction.unit().angle(),
        }
    }
}

/// Waypoint order around a ring: counter-clockwise, N -> W -> S -> E -> N
pub fn next_orbit_key(key: Direction) -> Direction {
    super::navigation::turn_left(key)
}

/// First waypoint approached when arriving with `heading`. Arriving northbound
/// puts the agent on the south side of the ring, so it heads for east first.
pub fn entry_orbit_key(heading: Direction) -> Direction {
    super::navigation::turn_right(heading)
}
