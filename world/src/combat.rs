//! Hit resolution: what happens to each actor variant when it is struck.

use beatgrid_core::{ActorHandle, ActorId, ActorKind, CellCoord, Direction, Event};
use tracing::{debug, info};

use crate::World;

/// Enemies that can be pushed around and crushed.
fn is_mobile_enemy(kind: ActorKind) -> bool {
    matches!(kind, ActorKind::MeleeEnemy | ActorKind::RangedEnemy)
}

impl World {
    /// Player action: strike whatever occupies the neighbouring cell, or step into it.
    pub(crate) fn player_act(
        &mut self,
        actor: ActorId,
        direction: Direction,
        out_events: &mut Vec<Event>,
    ) {
        let Some(state) = self.actors.get(actor) else {
            return;
        };
        if state.behavior.kind() != ActorKind::Player {
            return;
        }

        let target = state.cell.step(direction);
        match self.grid.occupant(target) {
            Some(handle) => self.on_hit(Some(actor), handle, direction, out_events),
            None => {
                let _ = self.try_move(actor, direction, out_events);
            }
        }
    }

    /// Anonymous hit on whatever occupies `cell`.
    pub(crate) fn strike(
        &mut self,
        cell: CellCoord,
        direction: Direction,
        out_events: &mut Vec<Event>,
    ) {
        if let Some(handle) = self.grid.occupant(cell) {
            self.on_hit(None, handle, direction, out_events);
        }
    }

    /// Delivers a hit travelling in `direction` to `target`.
    pub(crate) fn on_hit(
        &mut self,
        attacker: Option<ActorId>,
        target: ActorHandle,
        direction: Direction,
        out_events: &mut Vec<Event>,
    ) {
        if self.actors.get(target.id()).is_none() {
            return;
        }
        out_events.push(Event::HitLanded {
            attacker,
            target,
            direction,
        });

        match target.kind() {
            ActorKind::Player | ActorKind::Boss | ActorKind::Barrier => {
                self.damage(target.id(), out_events);
            }
            ActorKind::MeleeEnemy | ActorKind::RangedEnemy => {
                self.hit_enemy(target.id(), direction, out_events);
            }
            ActorKind::PushableBox => self.hit_box(target.id(), direction, out_events),
            ActorKind::Goal => self.enter_goal(attacker, target.id(), out_events),
        }
    }

    /// Struck enemies collide with any enemy behind them, a boss included, or
    /// get knocked back.
    fn hit_enemy(&mut self, enemy: ActorId, direction: Direction, out_events: &mut Vec<Event>) {
        let Some(cell) = self.actors.get(enemy).map(|state| state.cell) else {
            return;
        };
        let beyond = cell.step(direction);
        if !self.grid.is_valid(beyond) {
            return;
        }

        match self.grid.occupant(beyond) {
            None => {
                let _ = self.try_move(enemy, direction, out_events);
            }
            Some(other) if other.kind().is_enemy() => {
                debug!(
                    enemy = enemy.get(),
                    other = other.id().get(),
                    "enemies collided"
                );
                self.damage(enemy, out_events);
                self.damage(other.id(), out_events);
            }
            Some(_) => {}
        }
    }

    /// Boxes slide one cell, crushing a weakened enemy in the way.
    fn hit_box(&mut self, crate_id: ActorId, direction: Direction, out_events: &mut Vec<Event>) {
        let Some(cell) = self.actors.get(crate_id).map(|state| state.cell) else {
            return;
        };
        let beyond = cell.step(direction);
        if !self.grid.is_valid(beyond) {
            return;
        }

        if let Some(occupant) = self.grid.occupant(beyond) {
            let weakened = is_mobile_enemy(occupant.kind())
                && self
                    .actors
                    .get(occupant.id())
                    .and_then(|state| state.behavior.health())
                    .is_some_and(|health| health <= 1);
            if !weakened {
                return;
            }
            debug!(enemy = occupant.id().get(), "enemy crushed by box");
            self.destroy_actor(occupant.id(), out_events);
        }
        let _ = self.try_move(crate_id, direction, out_events);
    }

    fn enter_goal(
        &mut self,
        attacker: Option<ActorId>,
        goal: ActorId,
        out_events: &mut Vec<Event>,
    ) {
        let Some(player) = attacker.filter(|id| {
            self.actors
                .get(*id)
                .is_some_and(|state| state.behavior.kind() == ActorKind::Player)
        }) else {
            return;
        };

        if self.level_clear {
            info!(goal = goal.get(), player = player.get(), "level completed");
            out_events.push(Event::LevelCompleted { goal, player });
        } else {
            debug!(goal = goal.get(), "goal still locked");
            out_events.push(Event::GoalLocked { goal });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{apply, query};
    use beatgrid_core::{Command, GridLayout};

    fn corridor(width: u32) -> World {
        let mut world = World::new();
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::ConfigureGrid {
                layout: GridLayout::Rectangle { width, height: 1 },
            },
            &mut events,
        );
        world
    }

    fn spawn(world: &mut World, kind: ActorKind, x: i32, health: Option<u32>) -> ActorId {
        let mut events = Vec::new();
        apply(
            world,
            Command::SpawnActor {
                kind,
                cell: CellCoord::new(x, 0),
                health,
            },
            &mut events,
        );
        match events.as_slice() {
            [Event::ActorSpawned { actor, .. }] => actor.id(),
            other => panic!("unexpected spawn events: {other:?}"),
        }
    }

    fn strike(world: &mut World, x: i32, direction: Direction) -> Vec<Event> {
        let mut events = Vec::new();
        apply(
            world,
            Command::Strike {
                cell: CellCoord::new(x, 0),
                direction,
            },
            &mut events,
        );
        events
    }

    #[test]
    fn struck_enemy_is_knocked_into_empty_cell() {
        let mut world = corridor(4);
        let enemy = spawn(&mut world, ActorKind::MeleeEnemy, 1, None);
        let events = strike(&mut world, 1, Direction::East);
        assert!(events.contains(&Event::ActorMoved {
            actor: enemy,
            from: CellCoord::new(1, 0),
            to: CellCoord::new(2, 0),
        }));
    }

    #[test]
    fn stacked_enemies_damage_each_other() {
        let mut world = corridor(4);
        let front = spawn(&mut world, ActorKind::MeleeEnemy, 1, Some(2));
        let back = spawn(&mut world, ActorKind::RangedEnemy, 2, Some(1));
        let events = strike(&mut world, 1, Direction::East);

        assert!(events.contains(&Event::ActorDamaged {
            actor: front,
            remaining: 1,
        }));
        let destroyed = |event: &Event| {
            matches!(event, Event::ActorDestroyed { actor, .. } if actor.id() == back)
        };
        assert!(events.iter().any(destroyed));
        assert_eq!(query::occupant(&world, CellCoord::new(2, 0)), None);
    }

    #[test]
    fn enemy_struck_into_boss_damages_both() {
        let mut world = World::new();
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::ConfigureGrid {
                layout: GridLayout::Rectangle {
                    width: 7,
                    height: 3,
                },
            },
            &mut events,
        );
        apply(
            &mut world,
            Command::SpawnActor {
                kind: ActorKind::Boss,
                cell: CellCoord::new(4, 1),
                health: None,
            },
            &mut events,
        );
        apply(
            &mut world,
            Command::SpawnActor {
                kind: ActorKind::MeleeEnemy,
                cell: CellCoord::new(2, 1),
                health: Some(2),
            },
            &mut events,
        );
        let boss = ActorId::new(0);
        let melee = ActorId::new(1);

        let mut events = Vec::new();
        apply(
            &mut world,
            Command::Strike {
                cell: CellCoord::new(2, 1),
                direction: Direction::East,
            },
            &mut events,
        );

        assert!(events.contains(&Event::ActorDamaged {
            actor: melee,
            remaining: 1,
        }));
        assert!(events.contains(&Event::ActorDamaged {
            actor: boss,
            remaining: 4,
        }));
        let melee_cell = query::actor(&world, melee).map(|snapshot| snapshot.cell);
        assert_eq!(melee_cell, Some(CellCoord::new(2, 1)));
    }

    #[test]
    fn enemy_against_box_is_blocked_without_damage() {
        let mut world = corridor(4);
        let _enemy = spawn(&mut world, ActorKind::MeleeEnemy, 1, Some(2));
        let _crate = spawn(&mut world, ActorKind::PushableBox, 2, None);
        let events = strike(&mut world, 1, Direction::East);
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], Event::HitLanded { .. }));
    }

    #[test]
    fn box_crushes_weakened_enemy_and_moves_in() {
        let mut world = corridor(4);
        let crate_id = spawn(&mut world, ActorKind::PushableBox, 1, None);
        let enemy = spawn(&mut world, ActorKind::MeleeEnemy, 2, Some(1));
        let _ = strike(&mut world, 1, Direction::East);

        assert!(query::actor(&world, enemy).is_none());
        let occupant = query::occupant(&world, CellCoord::new(2, 0));
        assert_eq!(occupant.map(|handle| handle.id()), Some(crate_id));
    }

    #[test]
    fn box_is_stopped_by_healthy_enemy_and_grid_edge() {
        let mut world = corridor(3);
        let crate_id = spawn(&mut world, ActorKind::PushableBox, 1, None);
        let _enemy = spawn(&mut world, ActorKind::MeleeEnemy, 2, Some(2));
        let _ = strike(&mut world, 1, Direction::East);
        let _ = strike(&mut world, 1, Direction::North);

        let occupant = query::occupant(&world, CellCoord::new(1, 0));
        assert_eq!(occupant.map(|handle| handle.id()), Some(crate_id));
    }

    #[test]
    fn barrier_breaks_after_its_hits() {
        let mut world = corridor(2);
        let barrier = spawn(&mut world, ActorKind::Barrier, 0, Some(2));
        let first = strike(&mut world, 0, Direction::East);
        assert!(first.contains(&Event::ActorDamaged {
            actor: barrier,
            remaining: 1,
        }));
        let second = strike(&mut world, 0, Direction::East);
        assert!(second
            .iter()
            .any(|event| matches!(event, Event::ActorDestroyed { .. })));
        assert!(query::occupant(&world, CellCoord::new(0, 0)).is_none());
    }

    #[test]
    fn anonymous_strike_on_goal_does_nothing_further() {
        let mut world = corridor(2);
        let _goal = spawn(&mut world, ActorKind::Goal, 0, None);
        let events = strike(&mut world, 0, Direction::West);
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn strike_on_empty_or_invalid_cell_is_ignored() {
        let mut world = corridor(2);
        assert!(strike(&mut world, 1, Direction::East).is_empty());
        assert!(strike(&mut world, 7, Direction::East).is_empty());
    }
}
