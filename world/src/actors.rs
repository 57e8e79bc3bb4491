//! Actor state, identifier allocation and the occupancy lifecycle.

use std::collections::BTreeMap;

use beatgrid_core::{
    ActorHandle, ActorId, ActorKind, ActorSnapshot, CellCoord, Direction, Event, ForecastSource,
    SpawnError,
};
use tracing::debug;

use crate::{
    clock::{Notification, Subscriber},
    telegraph::{self, TelegraphState},
    World,
};

/// Authoritative state of a single actor.
#[derive(Clone, Debug)]
pub(crate) struct Actor {
    pub(crate) id: ActorId,
    /// Anchor cell; the centre of the footprint for a boss.
    pub(crate) cell: CellCoord,
    pub(crate) behavior: Behavior,
}

/// Variant-specific state.
#[derive(Clone, Debug)]
pub(crate) enum Behavior {
    Player { health: u32 },
    MeleeEnemy(EnemyState),
    RangedEnemy(EnemyState),
    Boss(EnemyState),
    PushableBox,
    Barrier { hits_remaining: u32 },
    Goal,
}

#[derive(Clone, Debug)]
pub(crate) struct EnemyState {
    pub(crate) health: u32,
    pub(crate) telegraph: TelegraphState,
}

impl Behavior {
    fn new(kind: ActorKind, health: Option<u32>) -> Self {
        let health = health
            .or(kind.default_health())
            .unwrap_or(1)
            .max(1);
        let enemy = || EnemyState {
            health,
            telegraph: TelegraphState::default(),
        };
        match kind {
            ActorKind::Player => Self::Player { health },
            ActorKind::MeleeEnemy => Self::MeleeEnemy(enemy()),
            ActorKind::RangedEnemy => Self::RangedEnemy(enemy()),
            ActorKind::Boss => Self::Boss(enemy()),
            ActorKind::PushableBox => Self::PushableBox,
            ActorKind::Barrier => Self::Barrier {
                hits_remaining: health,
            },
            ActorKind::Goal => Self::Goal,
        }
    }

    pub(crate) fn kind(&self) -> ActorKind {
        match self {
            Self::Player { .. } => ActorKind::Player,
            Self::MeleeEnemy(_) => ActorKind::MeleeEnemy,
            Self::RangedEnemy(_) => ActorKind::RangedEnemy,
            Self::Boss(_) => ActorKind::Boss,
            Self::PushableBox => ActorKind::PushableBox,
            Self::Barrier { .. } => ActorKind::Barrier,
            Self::Goal => ActorKind::Goal,
        }
    }

    pub(crate) fn health(&self) -> Option<u32> {
        match self {
            Self::Player { health } => Some(*health),
            Self::MeleeEnemy(state) | Self::RangedEnemy(state) | Self::Boss(state) => {
                Some(state.health)
            }
            Self::Barrier { hits_remaining } => Some(*hits_remaining),
            Self::PushableBox | Self::Goal => None,
        }
    }

    /// Removes one point of health; returns what remains for damageable variants.
    fn damage(&mut self) -> Option<u32> {
        let health = match self {
            Self::Player { health } => health,
            Self::MeleeEnemy(state) | Self::RangedEnemy(state) | Self::Boss(state) => {
                &mut state.health
            }
            Self::Barrier { hits_remaining } => hits_remaining,
            Self::PushableBox | Self::Goal => return None,
        };
        *health = health.saturating_sub(1);
        Some(*health)
    }

    pub(crate) fn telegraph(&self) -> Option<&TelegraphState> {
        match self {
            Self::MeleeEnemy(state) | Self::RangedEnemy(state) | Self::Boss(state) => {
                Some(&state.telegraph)
            }
            _ => None,
        }
    }

    pub(crate) fn telegraph_mut(&mut self) -> Option<&mut TelegraphState> {
        match self {
            Self::MeleeEnemy(state) | Self::RangedEnemy(state) | Self::Boss(state) => {
                Some(&mut state.telegraph)
            }
            _ => None,
        }
    }
}

impl Actor {
    pub(crate) fn handle(&self) -> ActorHandle {
        ActorHandle::new(self.id, self.behavior.kind())
    }

    pub(crate) fn snapshot(&self) -> ActorSnapshot {
        let telegraph = self.behavior.telegraph();
        ActorSnapshot {
            handle: self.handle(),
            cell: self.cell,
            health: self.behavior.health(),
            phase: telegraph.map(|state| state.phase),
            intent: telegraph.and_then(|state| state.intent),
        }
    }
}

/// Cells claimed by an actor of `kind` anchored at `cell`.
pub(crate) fn footprint(kind: ActorKind, cell: CellCoord) -> Vec<CellCoord> {
    match kind {
        ActorKind::Boss => (-1..=1)
            .flat_map(|dy| (-1..=1).map(move |dx| cell.offset(dx, dy)))
            .collect(),
        _ => vec![cell],
    }
}

/// Registry that stores actors and allocates identifiers.
#[derive(Clone, Debug)]
pub(crate) struct ActorRegistry {
    entries: BTreeMap<ActorId, Actor>,
    next_actor_id: ActorId,
}

impl ActorRegistry {
    pub(crate) fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_actor_id: ActorId::new(0),
        }
    }

    fn allocate(&mut self) -> ActorId {
        let id = self.next_actor_id;
        self.next_actor_id = ActorId::new(id.get().saturating_add(1));
        id
    }

    pub(crate) fn get(&self, id: ActorId) -> Option<&Actor> {
        self.entries.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: ActorId) -> Option<&mut Actor> {
        self.entries.get_mut(&id)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Actor> {
        self.entries.values()
    }

    /// Removes every actor; identifiers keep counting so stale handles never alias.
    pub(crate) fn clear(&mut self) -> Vec<Actor> {
        std::mem::take(&mut self.entries).into_values().collect()
    }

    fn insert(&mut self, actor: Actor) {
        let _ = self.entries.insert(actor.id, actor);
    }

    fn remove(&mut self, id: ActorId) -> Option<Actor> {
        self.entries.remove(&id)
    }
}

impl World {
    pub(crate) fn spawn_actor(
        &mut self,
        kind: ActorKind,
        cell: CellCoord,
        health: Option<u32>,
        out_events: &mut Vec<Event>,
    ) {
        if let Err(reason) = self.check_spawn(kind, cell) {
            debug!(?kind, ?cell, ?reason, "spawn rejected");
            out_events.push(Event::SpawnRejected { kind, cell, reason });
            return;
        }

        let actor = Actor {
            id: self.actors.allocate(),
            cell,
            behavior: Behavior::new(kind, health),
        };
        let handle = actor.handle();
        for claimed in footprint(kind, cell) {
            self.grid.set_occupant(claimed, Some(handle));
        }
        if kind.is_enemy() {
            let _ = self
                .clock
                .subscribe(Notification::Beat, Subscriber::Actor(actor.id));
        }
        self.actors.insert(actor);
        out_events.push(Event::ActorSpawned {
            actor: handle,
            cell,
        });
    }

    fn check_spawn(&self, kind: ActorKind, cell: CellCoord) -> Result<(), SpawnError> {
        if !self.grid.is_valid(cell) {
            return Err(SpawnError::InvalidCell);
        }
        let blocked = footprint(kind, cell)
            .into_iter()
            .any(|claimed| self.grid.occupant(claimed).is_some());
        if blocked {
            return Err(SpawnError::Occupied);
        }
        Ok(())
    }

    /// Moves `actor` one cell in `direction` using the validated move protocol.
    ///
    /// The move either relocates the actor completely, emitting
    /// [`Event::ActorMoved`] and refreshing its forecasts, or leaves the world
    /// untouched and returns `false`. Anchored variants never move.
    pub fn try_move(
        &mut self,
        actor: ActorId,
        direction: Direction,
        out_events: &mut Vec<Event>,
    ) -> bool {
        let Some(state) = self.actors.get(actor) else {
            return false;
        };
        let handle = state.handle();
        if handle.kind().is_anchored() {
            return false;
        }

        // Relocation is atomic here, so the only transition to rule out is an
        // actor that lost its registration.
        let from = state.cell;
        if self.grid.occupant(from) != Some(handle) {
            return false;
        }

        let to = from.step(direction);
        if !self.grid.is_valid(to) || self.grid.occupant(to).is_some() {
            return false;
        }

        self.grid.clear_occupant(from);
        self.grid.set_occupant(to, Some(handle));
        if let Some(state) = self.actors.get_mut(actor) {
            state.cell = to;
        }
        out_events.push(Event::ActorMoved { actor, from, to });
        self.on_moved(actor, out_events);
        true
    }

    /// Moved hook: re-aims a pending telegraph from the actor's new cell.
    fn on_moved(&mut self, actor: ActorId, out_events: &mut Vec<Event>) {
        let Some(state) = self.actors.get(actor) else {
            return;
        };
        let Some((direction, execute_at)) = state.behavior.telegraph().and_then(|t| t.pending())
        else {
            return;
        };
        if execute_at <= self.clock.beat_index() {
            return;
        }

        let kind = state.behavior.kind();
        let cells = telegraph::forecast_cells(kind, &self.grid, state.cell, direction);
        let _ = self.hazards.report(
            ForecastSource::Actor(actor),
            &cells,
            execute_at,
            self.clock.beat_index(),
            &self.grid,
        );
        debug!(actor = actor.get(), ?direction, "telegraph re-aimed after displacement");
        out_events.push(Event::Telegraphed {
            actor,
            direction: Some(direction),
            execute_at,
            cells,
        });
    }

    /// Removes one point of health from `actor`, destroying it at zero.
    pub(crate) fn damage(&mut self, actor: ActorId, out_events: &mut Vec<Event>) {
        let Some(state) = self.actors.get_mut(actor) else {
            return;
        };
        match state.behavior.damage() {
            Some(0) => self.destroy_actor(actor, out_events),
            Some(remaining) => out_events.push(Event::ActorDamaged { actor, remaining }),
            None => {}
        }
    }

    /// Clears the actor's cells and removes it from every subscriber list.
    pub(crate) fn destroy_actor(&mut self, actor: ActorId, out_events: &mut Vec<Event>) {
        let Some(state) = self.actors.remove(actor) else {
            return;
        };
        let handle = state.handle();
        for claimed in footprint(handle.kind(), state.cell) {
            if self.grid.occupant(claimed) == Some(handle) {
                self.grid.clear_occupant(claimed);
            }
        }
        self.clock.unsubscribe_all(Subscriber::Actor(actor));
        self.hazards.withdraw(ForecastSource::Actor(actor));
        debug!(actor = actor.get(), kind = ?handle.kind(), "actor destroyed");
        out_events.push(Event::ActorDestroyed {
            actor: handle,
            cell: state.cell,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boss_footprint_is_three_by_three() {
        let cells = footprint(ActorKind::Boss, CellCoord::new(5, 5));
        assert_eq!(cells.len(), 9);
        assert!(cells.contains(&CellCoord::new(4, 4)));
        assert!(cells.contains(&CellCoord::new(6, 6)));
        assert_eq!(footprint(ActorKind::Goal, CellCoord::new(1, 2)), vec![CellCoord::new(1, 2)]);
    }

    #[test]
    fn behavior_applies_default_health() {
        assert_eq!(Behavior::new(ActorKind::Barrier, None).health(), Some(3));
        assert_eq!(Behavior::new(ActorKind::Boss, Some(8)).health(), Some(8));
        assert_eq!(Behavior::new(ActorKind::MeleeEnemy, Some(0)).health(), Some(1));
        assert_eq!(Behavior::new(ActorKind::PushableBox, Some(4)).health(), None);
    }

    #[test]
    fn damage_saturates_and_skips_indestructible_variants() {
        let mut barrier = Behavior::new(ActorKind::Barrier, Some(1));
        assert_eq!(barrier.damage(), Some(0));
        assert_eq!(barrier.damage(), Some(0));
        assert_eq!(Behavior::new(ActorKind::Goal, None).damage(), None);
    }

    #[test]
    fn registry_never_reuses_identifiers() {
        let mut registry = ActorRegistry::new();
        let first = registry.allocate();
        let _ = registry.clear();
        let second = registry.allocate();
        assert_ne!(first, second);
    }
}
