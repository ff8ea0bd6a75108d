//! Boundary with the host game loop
//!
//! The host supplies the camera view and player position used to bias spawns,
//! and reports whether an agent's visual handle is still alive.

use super::types::{AgentId, Vec2, ViewRect};

pub trait HostView {
    fn camera_view(&self) -> ViewRect;

    fn player_position(&self) -> Vec2;

    /// Whether the renderer still holds a live visual for `agent`
    fn is_handle_active(&self, _agent: AgentId) -> bool {
        true
    }
}

/// Fixed host state, for headless runs and tests
#[derive(Debug, Clone)]
pub struct StaticHost {
    pub camera: ViewRect,
    pub player: Vec2,
    /// Agents whose visual handle has been destroyed
    pub inactive: Vec<AgentId>,
}

impl StaticHost {
    pub fn new(camera: ViewRect, player: Vec2) -> Self {
        Self {
            camera,
            player,
            inactive: Vec::new(),
        }
    }

    /// A host whose camera sees `size` starting at the origin, with the player
    /// in the middle of it
    pub fn centered(size: Vec2) -> Self {
        Self::new(ViewRect::new(Vec2::ZERO, size), size * 0.5)
    }
}

impl HostView for StaticHost {
    fn camera_view(&self) -> ViewRect {
        self.camera
    }

    fn player_position(&self) -> Vec2 {
        self.player
    }

    fn is_handle_active(&self, agent: AgentId) -> bool {
        !self.inactive.contains(&agent)
    }
}
