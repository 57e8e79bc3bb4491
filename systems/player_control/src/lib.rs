#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that turns directional intents into player action commands.
//!
//! An intent becomes a [`Command::PlayerAct`] only when the player's cooldown
//! has elapsed and its presentation is not still sliding between cells. The
//! cooldown is armed once the world confirms that the action did something,
//! either a move or a landed hit; refused actions leave the player free to
//! try again immediately.

use std::{
    collections::{BTreeMap, BTreeSet},
    time::Duration,
};

use beatgrid_core::{ActorId, Command, Direction, Event};
use tracing::trace;

const DEFAULT_COOLDOWN: Duration = Duration::from_millis(200);

/// Configuration parameters required to construct the player control system.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    cooldown: Duration,
}

impl Config {
    /// Creates a new configuration with the provided per-player cooldown.
    #[must_use]
    pub const fn new(cooldown: Duration) -> Self {
        Self { cooldown }
    }

    /// Minimum time between two confirmed actions of the same player.
    #[must_use]
    pub const fn cooldown(&self) -> Duration {
        self.cooldown
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(DEFAULT_COOLDOWN)
    }
}

/// Directional input captured for a player during the current frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MoveIntent {
    /// Player the input belongs to.
    pub actor: ActorId,
    /// Requested direction.
    pub direction: Direction,
}

impl MoveIntent {
    /// Creates a new intent for `actor`.
    #[must_use]
    pub const fn new(actor: ActorId, direction: Direction) -> Self {
        Self { actor, direction }
    }
}

/// Player control system gating intents by cooldown and transition state.
#[derive(Debug)]
pub struct PlayerControl {
    cooldown: Duration,
    remaining: BTreeMap<ActorId, Duration>,
    issued: BTreeSet<ActorId>,
}

impl PlayerControl {
    /// Creates a new player control system using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            cooldown: config.cooldown(),
            remaining: BTreeMap::new(),
            issued: BTreeSet::new(),
        }
    }

    /// Reports whether `actor` is still cooling down.
    #[must_use]
    pub fn is_cooling_down(&self, actor: ActorId) -> bool {
        self.remaining.contains_key(&actor)
    }

    /// Consumes world events and this frame's intents to emit player commands.
    ///
    /// `events` must hold everything the world emitted since the previous
    /// call, including the outcome of commands this system issued then.
    pub fn handle<F>(
        &mut self,
        events: &[Event],
        intents: &[MoveIntent],
        is_in_transition: F,
        out: &mut Vec<Command>,
    ) where
        F: Fn(ActorId) -> bool,
    {
        for event in events {
            match event {
                Event::TimeAdvanced { dt } => self.elapse(*dt),
                Event::ActorMoved { actor, .. } => self.confirm(*actor),
                Event::HitLanded {
                    attacker: Some(actor),
                    ..
                } => self.confirm(*actor),
                Event::ActorDestroyed { actor, .. } => {
                    let _ = self.remaining.remove(&actor.id());
                }
                _ => {}
            }
        }
        self.issued.clear();

        for intent in intents {
            if self.is_cooling_down(intent.actor)
                || self.issued.contains(&intent.actor)
                || is_in_transition(intent.actor)
            {
                trace!(actor = intent.actor.get(), "player intent held back");
                continue;
            }
            let _ = self.issued.insert(intent.actor);
            out.push(Command::PlayerAct {
                actor: intent.actor,
                direction: intent.direction,
            });
        }
    }

    fn elapse(&mut self, dt: Duration) {
        self.remaining.retain(|_, remaining| {
            *remaining = remaining.saturating_sub(dt);
            !remaining.is_zero()
        });
    }

    fn confirm(&mut self, actor: ActorId) {
        if self.issued.contains(&actor) && !self.cooldown.is_zero() {
            let _ = self.remaining.insert(actor, self.cooldown);
        }
    }
}

impl Default for PlayerControl {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beatgrid_core::{ActorHandle, ActorKind, CellCoord};

    const PLAYER: ActorId = ActorId::new(0);

    fn act(direction: Direction) -> Command {
        Command::PlayerAct {
            actor: PLAYER,
            direction,
        }
    }

    fn moved() -> Event {
        Event::ActorMoved {
            actor: PLAYER,
            from: CellCoord::new(0, 0),
            to: CellCoord::new(1, 0),
        }
    }

    fn settled(_: ActorId) -> bool {
        false
    }

    #[test]
    fn confirmed_move_arms_the_cooldown() {
        let mut system = PlayerControl::new(Config::new(Duration::from_millis(200)));
        let intent = [MoveIntent::new(PLAYER, Direction::East)];
        let mut out = Vec::new();

        system.handle(&[], &intent, settled, &mut out);
        assert_eq!(out, vec![act(Direction::East)]);

        out.clear();
        system.handle(&[moved()], &intent, settled, &mut out);
        assert!(out.is_empty());
        assert!(system.is_cooling_down(PLAYER));

        let elapsed = [Event::TimeAdvanced {
            dt: Duration::from_millis(200),
        }];
        system.handle(&elapsed, &intent, settled, &mut out);
        assert_eq!(out, vec![act(Direction::East)]);
    }

    #[test]
    fn refused_action_does_not_cool_down() {
        let mut system = PlayerControl::default();
        let intent = [MoveIntent::new(PLAYER, Direction::West)];
        let mut out = Vec::new();

        system.handle(&[], &intent, settled, &mut out);
        system.handle(&[], &intent, settled, &mut out);
        assert_eq!(out, vec![act(Direction::West), act(Direction::West)]);
        assert!(!system.is_cooling_down(PLAYER));
    }

    #[test]
    fn landed_hit_counts_as_confirmation() {
        let mut system = PlayerControl::default();
        let mut out = Vec::new();
        system.handle(
            &[],
            &[MoveIntent::new(PLAYER, Direction::North)],
            settled,
            &mut out,
        );
        let hit = Event::HitLanded {
            attacker: Some(PLAYER),
            target: ActorHandle::new(ActorId::new(3), ActorKind::PushableBox),
            direction: Direction::North,
        };
        system.handle(&[hit], &[], settled, &mut out);
        assert!(system.is_cooling_down(PLAYER));
    }

    #[test]
    fn transitions_and_duplicate_intents_are_held_back() {
        let mut system = PlayerControl::default();
        let intents = [
            MoveIntent::new(PLAYER, Direction::East),
            MoveIntent::new(PLAYER, Direction::South),
        ];
        let mut out = Vec::new();

        system.handle(&[], &intents, |_| true, &mut out);
        assert!(out.is_empty());

        system.handle(&[], &intents, settled, &mut out);
        assert_eq!(out, vec![act(Direction::East)]);
    }

    #[test]
    fn destroyed_player_forgets_its_cooldown() {
        let mut system = PlayerControl::default();
        let mut out = Vec::new();
        system.handle(
            &[],
            &[MoveIntent::new(PLAYER, Direction::East)],
            settled,
            &mut out,
        );
        system.handle(&[moved()], &[], settled, &mut out);
        assert!(system.is_cooling_down(PLAYER));

        let destroyed = Event::ActorDestroyed {
            actor: ActorHandle::new(PLAYER, ActorKind::Player),
            cell: CellCoord::new(1, 0),
        };
        system.handle(&[destroyed], &[], settled, &mut out);
        assert!(!system.is_cooling_down(PLAYER));
    }
}
