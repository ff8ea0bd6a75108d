//! Grid Traffic Library
//!
//! Autonomous vehicle traffic for a tile-based city grid. The simulation core
//! is renderer-agnostic and can be driven headless or by a game host.

pub mod simulation;
