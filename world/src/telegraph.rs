//! Two-phase enemy behaviour: announce an action on one beat, execute it on the next.
//!
//! On a telegraph beat an enemy picks a direction uniformly at random among
//! the directions that lead somewhere useful, reports the endangered cells to
//! the hazard aggregator for the following beat and switches to the resolve
//! phase. On the resolve beat it carries the action out and returns to the
//! telegraph phase.

use beatgrid_core::{
    ActorHandle, ActorId, ActorKind, BeatIndex, CellCoord, Direction, Event, ForecastSource,
    TelegraphPhase,
};
use rand::Rng;
use tracing::debug;

use crate::{grid::SpatialGrid, World};

/// Per-enemy state machine data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct TelegraphState {
    pub(crate) phase: TelegraphPhase,
    pub(crate) intent: Option<Direction>,
    pub(crate) execute_at: Option<BeatIndex>,
}

impl Default for TelegraphState {
    fn default() -> Self {
        Self {
            phase: TelegraphPhase::Telegraph,
            intent: None,
            execute_at: None,
        }
    }
}

impl TelegraphState {
    /// Direction and beat of an announced action that has not resolved yet.
    pub(crate) fn pending(&self) -> Option<(Direction, BeatIndex)> {
        if self.phase != TelegraphPhase::Resolve {
            return None;
        }
        Some((self.intent?, self.execute_at?))
    }
}

/// Directions an enemy of `kind` at `cell` may announce.
pub(crate) fn viable_directions(
    kind: ActorKind,
    grid: &SpatialGrid,
    cell: CellCoord,
) -> Vec<Direction> {
    let open = |target: CellCoord| {
        grid.is_valid(target)
            && grid
                .occupant(target)
                .map_or(true, |handle| handle.kind() == ActorKind::Player)
    };

    Direction::ALL
        .into_iter()
        .filter(|direction| match kind {
            ActorKind::Boss => boss_strip(cell, *direction).into_iter().any(open),
            _ => open(cell.step(*direction)),
        })
        .collect()
}

/// Cells endangered when an enemy of `kind` at `cell` acts toward `direction`.
///
/// A ranged forecast runs to the edge of the grid without stopping at
/// occupants; what the shot actually hits is only decided on resolution.
pub(crate) fn forecast_cells(
    kind: ActorKind,
    grid: &SpatialGrid,
    cell: CellCoord,
    direction: Direction,
) -> Vec<CellCoord> {
    match kind {
        ActorKind::RangedEnemy => ray(grid, cell, direction).collect(),
        ActorKind::Boss => boss_strip(cell, direction)
            .into_iter()
            .filter(|target| grid.is_valid(*target))
            .collect(),
        _ => {
            let target = cell.step(direction);
            if grid.is_valid(target) {
                vec![target]
            } else {
                Vec::new()
            }
        }
    }
}

/// Valid cells from the neighbour of `cell` toward `direction` up to the grid edge.
fn ray(
    grid: &SpatialGrid,
    cell: CellCoord,
    direction: Direction,
) -> impl Iterator<Item = CellCoord> + '_ {
    let mut current = cell;
    std::iter::from_fn(move || {
        let next = current.step(direction);
        if next == current || !grid.is_valid(next) {
            return None;
        }
        current = next;
        Some(next)
    })
}

/// Three cells bordering a boss footprint centred on `cell` on the `direction` side.
fn boss_strip(cell: CellCoord, direction: Direction) -> [CellCoord; 3] {
    let (dx, dy) = direction.delta();
    let centre = cell.offset(dx * 2, dy * 2);
    // Spread along the perpendicular axis, lowest coordinate first.
    let (px, py) = (dy.abs(), dx.abs());
    [centre.offset(-px, -py), centre, centre.offset(px, py)]
}

impl World {
    /// Runs one beat of the state machine for `actor`.
    pub(crate) fn step_enemy(
        &mut self,
        actor: ActorId,
        beat: BeatIndex,
        out_events: &mut Vec<Event>,
    ) {
        let Some(state) = self.actors.get(actor) else {
            return;
        };
        let Some(telegraph) = state.behavior.telegraph() else {
            return;
        };
        match telegraph.phase {
            TelegraphPhase::Telegraph => self.announce(actor, beat, out_events),
            TelegraphPhase::Resolve => self.resolve(actor, out_events),
        }
    }

    fn announce(&mut self, actor: ActorId, beat: BeatIndex, out_events: &mut Vec<Event>) {
        let Some(state) = self.actors.get(actor) else {
            return;
        };
        let kind = state.behavior.kind();
        let cell = state.cell;

        let candidates = viable_directions(kind, &self.grid, cell);
        let intent = if candidates.is_empty() {
            None
        } else {
            Some(candidates[self.rng.gen_range(0..candidates.len())])
        };
        let execute_at = beat.next();
        let cells = intent
            .map(|direction| forecast_cells(kind, &self.grid, cell, direction))
            .unwrap_or_default();

        let _ = self.hazards.report(
            ForecastSource::Actor(actor),
            &cells,
            execute_at,
            self.clock.beat_index(),
            &self.grid,
        );
        if let Some(telegraph) = self
            .actors
            .get_mut(actor)
            .and_then(|state| state.behavior.telegraph_mut())
        {
            *telegraph = TelegraphState {
                phase: TelegraphPhase::Resolve,
                intent,
                execute_at: Some(execute_at),
            };
        }

        debug!(actor = actor.get(), ?kind, ?intent, beat = beat.get(), "telegraphed");
        out_events.push(Event::Telegraphed {
            actor,
            direction: intent,
            execute_at,
            cells,
        });
    }

    fn resolve(&mut self, actor: ActorId, out_events: &mut Vec<Event>) {
        let Some(state) = self.actors.get_mut(actor) else {
            return;
        };
        let kind = state.behavior.kind();
        let intent = state.behavior.telegraph_mut().and_then(|telegraph| {
            let intent = telegraph.intent;
            *telegraph = TelegraphState::default();
            intent
        });
        let Some(direction) = intent else {
            return;
        };

        debug!(actor = actor.get(), ?kind, ?direction, "resolving telegraph");
        match kind {
            ActorKind::MeleeEnemy => self.resolve_melee(actor, direction, out_events),
            ActorKind::RangedEnemy => self.resolve_ranged(actor, direction, out_events),
            ActorKind::Boss => self.resolve_boss(actor, direction, out_events),
            ActorKind::Player | ActorKind::PushableBox | ActorKind::Barrier | ActorKind::Goal => {}
        }
    }

    fn resolve_melee(
        &mut self,
        actor: ActorId,
        direction: Direction,
        out_events: &mut Vec<Event>,
    ) {
        let Some(cell) = self.actors.get(actor).map(|state| state.cell) else {
            return;
        };
        let target = cell.step(direction);
        if !self.grid.is_valid(target) {
            return;
        }

        match self.grid.occupant(target) {
            None => {
                let _ = self.try_move(actor, direction, out_events);
            }
            Some(handle) if handle.kind() == ActorKind::Player => {
                self.on_hit(Some(actor), handle, direction, out_events);
            }
            Some(_) => out_events.push(Event::ActionBlocked { actor, direction }),
        }
    }

    fn resolve_ranged(
        &mut self,
        actor: ActorId,
        direction: Direction,
        out_events: &mut Vec<Event>,
    ) {
        let Some(cell) = self.actors.get(actor).map(|state| state.cell) else {
            return;
        };
        let first_occupant = ray(&self.grid, cell, direction)
            .find_map(|target| self.grid.occupant(target));

        match first_occupant {
            None => {}
            Some(handle) if handle.kind() == ActorKind::Player => {
                self.on_hit(Some(actor), handle, direction, out_events);
            }
            Some(_) => out_events.push(Event::ActionBlocked { actor, direction }),
        }
    }

    fn resolve_boss(
        &mut self,
        actor: ActorId,
        direction: Direction,
        out_events: &mut Vec<Event>,
    ) {
        let Some(cell) = self.actors.get(actor).map(|state| state.cell) else {
            return;
        };
        let players: Vec<ActorHandle> = boss_strip(cell, direction)
            .into_iter()
            .filter_map(|target| self.grid.occupant(target))
            .filter(|handle| handle.kind() == ActorKind::Player)
            .collect();

        for player in players {
            self.on_hit(Some(actor), player, direction, out_events);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beatgrid_core::GridLayout;
    use glam::Vec2;

    fn row(width: u32) -> SpatialGrid {
        let mut grid = SpatialGrid::new(1.0, Vec2::ZERO);
        grid.rebuild(&GridLayout::Rectangle { width, height: 1 });
        grid
    }

    fn handle(value: u32, kind: ActorKind) -> Option<ActorHandle> {
        Some(ActorHandle::new(ActorId::new(value), kind))
    }

    #[test]
    fn ranged_forecast_runs_to_grid_edge_through_occupants() {
        let mut grid = row(5);
        grid.set_occupant(CellCoord::new(3, 0), handle(1, ActorKind::Player));
        let origin = CellCoord::new(0, 0);
        let cells = forecast_cells(ActorKind::RangedEnemy, &grid, origin, Direction::East);
        assert_eq!(
            cells,
            (1..=4).map(|x| CellCoord::new(x, 0)).collect::<Vec<_>>()
        );
    }

    #[test]
    fn melee_forecast_is_empty_toward_invalid_cells() {
        let grid = row(3);
        let origin = CellCoord::new(0, 0);
        assert!(forecast_cells(ActorKind::MeleeEnemy, &grid, origin, Direction::West).is_empty());
        assert_eq!(
            forecast_cells(ActorKind::MeleeEnemy, &grid, origin, Direction::East),
            vec![CellCoord::new(1, 0)]
        );
    }

    #[test]
    fn viable_directions_accept_players_and_reject_other_occupants() {
        let mut grid = row(3);
        grid.set_occupant(CellCoord::new(0, 0), handle(1, ActorKind::Player));
        grid.set_occupant(CellCoord::new(2, 0), handle(2, ActorKind::PushableBox));
        let directions = viable_directions(ActorKind::MeleeEnemy, &grid, CellCoord::new(1, 0));
        assert_eq!(directions, vec![Direction::West]);
    }

    #[test]
    fn boss_strip_borders_the_footprint() {
        let strip = boss_strip(CellCoord::new(5, 5), Direction::East);
        assert_eq!(
            strip,
            [CellCoord::new(7, 4), CellCoord::new(7, 5), CellCoord::new(7, 6)]
        );
        let strip = boss_strip(CellCoord::new(5, 5), Direction::South);
        assert_eq!(
            strip,
            [CellCoord::new(4, 3), CellCoord::new(5, 3), CellCoord::new(6, 3)]
        );
    }

    #[test]
    fn boss_strip_order_does_not_depend_on_facing() {
        let centre = CellCoord::new(5, 5);
        assert_eq!(
            boss_strip(centre, Direction::West),
            [CellCoord::new(3, 4), CellCoord::new(3, 5), CellCoord::new(3, 6)]
        );
        assert_eq!(
            boss_strip(centre, Direction::North),
            [CellCoord::new(4, 7), CellCoord::new(5, 7), CellCoord::new(6, 7)]
        );
    }

    #[test]
    fn pending_requires_resolve_phase() {
        let mut state = TelegraphState {
            phase: TelegraphPhase::Telegraph,
            intent: Some(Direction::North),
            execute_at: Some(BeatIndex::new(3)),
        };
        assert_eq!(state.pending(), None);
        state.phase = TelegraphPhase::Resolve;
        assert_eq!(state.pending(), Some((Direction::North, BeatIndex::new(3))));
    }
}
