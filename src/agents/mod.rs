//! Agent entities and the simulation state that owns them.

mod placement;
mod seeding;

pub use placement::{place_on_grid, Placement, FORCED_AFTER_ATTEMPTS, MAX_PLACEMENT_ATTEMPTS};
pub use seeding::{seed_state, PopulationPlan};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Half the side length of the square terrain centred on the origin.
pub const WORLD_HALF_EXTENT: f64 = 500.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AgentId(u64);

impl AgentId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    Predator,
    Prey,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Clamped into the terrain square.
    pub fn clamped(self) -> Self {
        Self {
            x: self.x.clamp(-WORLD_HALF_EXTENT, WORLD_HALF_EXTENT),
            y: self.y.clamp(-WORLD_HALF_EXTENT, WORLD_HALF_EXTENT),
        }
    }

    pub fn distance_to(self, other: Position) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    pub fn in_bounds(self) -> bool {
        self.x.abs() <= WORLD_HALF_EXTENT && self.y.abs() <= WORLD_HALF_EXTENT
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub kind: AgentKind,
    pub position: Position,
    /// Position at the start of the last tick, for renderers that tween.
    pub previous: Position,
    /// Facing in radians; orientation only.
    pub heading: f64,
}

impl Agent {
    pub(crate) fn move_to(&mut self, target: Position) {
        let target = target.clamped();
        let dx = target.x - self.position.x;
        let dy = target.y - self.position.y;
        self.previous = self.position;
        if dx != 0.0 || dy != 0.0 {
            self.heading = dy.atan2(dx);
        }
        self.position = target;
    }

    pub(crate) fn hold(&mut self) {
        self.previous = self.position;
    }
}

/// Live predator and prey counts, published once per tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickCounts {
    pub predator_count: usize,
    pub prey_count: usize,
}

/// Both populations, each kept in insertion order.
///
/// Ids grow monotonically and are never reused, so iterating a map in key
/// order is iterating in the order agents were added, and removing one agent
/// never shifts another.
#[derive(Debug, Clone, Default)]
pub struct SimulationState {
    next_id: u64,
    tick: u64,
    predators: BTreeMap<AgentId, Agent>,
    prey: BTreeMap<AgentId, Agent>,
}

impl SimulationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self, kind: AgentKind, position: Position) -> AgentId {
        let id = AgentId(self.next_id);
        self.next_id += 1;
        let position = position.clamped();
        let agent = Agent {
            id,
            kind,
            position,
            previous: position,
            heading: 0.0,
        };
        self.population_mut(kind).insert(id, agent);
        id
    }

    pub fn remove(&mut self, kind: AgentKind, id: AgentId) -> Option<Agent> {
        self.population_mut(kind).remove(&id)
    }

    /// Removes the most recently added agent of a kind.
    pub fn remove_newest(&mut self, kind: AgentKind) -> Option<Agent> {
        self.population_mut(kind).pop_last().map(|(_, agent)| agent)
    }

    pub fn population(&self, kind: AgentKind) -> &BTreeMap<AgentId, Agent> {
        match kind {
            AgentKind::Predator => &self.predators,
            AgentKind::Prey => &self.prey,
        }
    }

    pub(crate) fn population_mut(&mut self, kind: AgentKind) -> &mut BTreeMap<AgentId, Agent> {
        match kind {
            AgentKind::Predator => &mut self.predators,
            AgentKind::Prey => &mut self.prey,
        }
    }

    pub fn predators(&self) -> impl Iterator<Item = &Agent> {
        self.predators.values()
    }

    pub fn prey(&self) -> impl Iterator<Item = &Agent> {
        self.prey.values()
    }

    pub fn agent(&self, kind: AgentKind, id: AgentId) -> Option<&Agent> {
        self.population(kind).get(&id)
    }

    pub fn agent_mut(&mut self, kind: AgentKind, id: AgentId) -> Option<&mut Agent> {
        self.population_mut(kind).get_mut(&id)
    }

    pub fn ids(&self, kind: AgentKind) -> Vec<AgentId> {
        self.population(kind).keys().copied().collect()
    }

    pub fn predator_count(&self) -> usize {
        self.predators.len()
    }

    pub fn prey_count(&self) -> usize {
        self.prey.len()
    }

    pub fn counts(&self) -> TickCounts {
        TickCounts {
            predator_count: self.predator_count(),
            prey_count: self.prey_count(),
        }
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub(crate) fn advance_tick(&mut self) {
        self.tick += 1;
    }

    pub fn snapshot(&self) -> AgentSnapshot {
        AgentSnapshot {
            tick: self.tick,
            counts: self.counts(),
            predators: self.predators.values().cloned().collect(),
            prey: self.prey.values().cloned().collect(),
        }
    }
}

/// Owned copy of the state taken between ticks, safe to hand to readers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub tick: u64,
    pub counts: TickCounts,
    pub predators: Vec<Agent>,
    pub prey: Vec<Agent>,
}

impl AgentSnapshot {
    /// Position of an agent `alpha` of the way through its last move.
    pub fn interpolate(agent: &Agent, alpha: f64) -> Position {
        let alpha = alpha.clamp(0.0, 1.0);
        Position {
            x: agent.previous.x + (agent.position.x - agent.previous.x) * alpha,
            y: agent.previous.y + (agent.position.y - agent.previous.y) * alpha,
        }
    }
}
