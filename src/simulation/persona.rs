//! Driver personas
//!
//! A persona is sampled once at spawn and never changes afterwards.

use anyhow::{Context, Result};
use rand::distr::weighted::WeightedIndex;
use rand::distr::Distribution;
use rand::Rng;

/// Behaviour profile of a driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PersonaKind {
    Aggressive,
    Fast,
    Neutral,
    Slow,
}

/// Immutable speed and spacing preferences
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Persona {
    pub kind: PersonaKind,
    /// Multiplier applied to the configured base speed
    pub speed_multiplier: f32,
    /// Preferred distance to the vehicle ahead, in world units
    pub follow_gap: f32,
}

impl Persona {
    pub const AGGRESSIVE: Persona = Persona {
        kind: PersonaKind::Aggressive,
        speed_multiplier: 1.35,
        follow_gap: 18.0,
    };
    pub const FAST: Persona = Persona {
        kind: PersonaKind::Fast,
        speed_multiplier: 1.2,
        follow_gap: 22.0,
    };
    pub const NEUTRAL: Persona = Persona {
        kind: PersonaKind::Neutral,
        speed_multiplier: 1.0,
        follow_gap: 28.0,
    };
    pub const SLOW: Persona = Persona {
        kind: PersonaKind::Slow,
        speed_multiplier: 0.8,
        follow_gap: 36.0,
    };
}

/// One row of the persona table
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedPersona {
    pub persona: Persona,
    pub weight: f32,
}

/// Weighted persona distribution, validated once at construction
#[derive(Debug, Clone)]
pub struct PersonaTable {
    entries: Vec<WeightedPersona>,
    index: WeightedIndex<f32>,
}

impl PersonaTable {
    pub fn new(entries: Vec<WeightedPersona>) -> Result<Self> {
        for entry in &entries {
            if entry.persona.speed_multiplier <= 0.0 {
                anyhow::bail!(
                    "Persona {:?} has non-positive speed multiplier",
                    entry.persona.kind
                );
            }
            if entry.persona.follow_gap <= 0.0 {
                anyhow::bail!("Persona {:?} has non-positive follow gap", entry.persona.kind);
            }
        }

        let index = WeightedIndex::new(entries.iter().map(|entry| entry.weight))
            .context("Persona weights must be non-negative with a positive total")?;

        Ok(Self { entries, index })
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Persona {
        self.entries[self.index.sample(rng)].persona
    }

    pub fn entries(&self) -> &[WeightedPersona] {
        &self.entries
    }
}

/// Default distribution: aggressive 10%, fast 25%, neutral 50%, slow 15%
pub fn default_personas() -> Vec<WeightedPersona> {
    vec![
        WeightedPersona {
            persona: Persona::AGGRESSIVE,
            weight: 0.10,
        },
        WeightedPersona {
            persona: Persona::FAST,
            weight: 0.25,
        },
        WeightedPersona {
            persona: Persona::NEUTRAL,
            weight: 0.50,
        },
        WeightedPersona {
            persona: Persona::SLOW,
            weight: 0.15,
        },
    ]
}
