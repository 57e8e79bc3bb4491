#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state for Beatgrid.
//!
//! The world owns one [`SpatialGrid`], one [`BeatClock`] and one
//! [`HazardAggregator`]. Adapters and systems mutate it exclusively through
//! [`apply`], which records every observable change as an
//! [`Event`](beatgrid_core::Event). Read access goes through [`query`].

mod actors;
mod clock;
mod combat;
mod config;
mod grid;
mod hazards;
mod telegraph;

use beatgrid_core::{ActorKind, BeatIndex, Command, Event, GridLayout};
use glam::Vec2;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{info, trace};

use crate::actors::ActorRegistry;

pub use crate::{
    clock::{BeatClock, Notification, Subscriber},
    config::{ConfigError, WorldConfig},
    grid::{SpatialGrid, MAX_RECTANGLE_SIDE},
    hazards::{ForecastRecord, HazardAggregator},
};

const DEFAULT_GRID_WIDTH: u32 = 8;
const DEFAULT_GRID_HEIGHT: u32 = 8;

/// Represents the authoritative Beatgrid world state.
#[derive(Debug)]
pub struct World {
    config: WorldConfig,
    grid: SpatialGrid,
    clock: BeatClock,
    hazards: HazardAggregator,
    actors: ActorRegistry,
    rng: ChaCha8Rng,
    level_clear: bool,
}

impl World {
    /// Creates a world with the default configuration and an empty 8x8 grid.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(WorldConfig::default())
    }

    /// Creates a world using the provided configuration.
    ///
    /// Invalid values are not rejected here: a bad tempo produces a clock
    /// that never fires and a bad cell size falls back to one world unit.
    /// Call [`WorldConfig::validate`] first to surface them as errors.
    #[must_use]
    pub fn with_config(config: WorldConfig) -> Self {
        let mut grid = SpatialGrid::new(config.cell_size, Vec2::from(config.origin));
        grid.rebuild(&GridLayout::Rectangle {
            width: DEFAULT_GRID_WIDTH,
            height: DEFAULT_GRID_HEIGHT,
        });

        let mut clock = BeatClock::new(config.bpm, config.beat_policy);
        let _ = clock.subscribe(Notification::BeatStart, Subscriber::Hazards);

        Self {
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            config,
            grid,
            clock,
            hazards: HazardAggregator::new(),
            actors: ActorRegistry::new(),
            level_clear: false,
        }
    }

    fn rebuild(&mut self, layout: &GridLayout, out_events: &mut Vec<Event>) {
        for actor in self.actors.clear() {
            out_events.push(Event::ActorDestroyed {
                actor: actor.handle(),
                cell: actor.cell,
            });
        }
        self.clock.unsubscribe_actors();
        self.hazards.clear();
        self.grid.rebuild(layout);
        self.level_clear = false;
        out_events.push(Event::GridRebuilt {
            cell_count: self.grid.len(),
        });
    }

    fn fire_beat(&mut self, beat: BeatIndex, out_events: &mut Vec<Event>) {
        trace!(beat = beat.get(), "beat fired");
        out_events.push(Event::BeatStarted { beat });
        self.notify(Notification::BeatStart, beat, out_events);
        out_events.push(Event::BeatFired { beat });
        self.notify(Notification::Beat, beat, out_events);
    }

    /// Delivers `notification` to the subscribers registered when it began.
    fn notify(
        &mut self,
        notification: Notification,
        beat: BeatIndex,
        out_events: &mut Vec<Event>,
    ) {
        for subscriber in self.clock.snapshot(notification) {
            match subscriber {
                Subscriber::Hazards => {
                    let _ = self.hazards.begin_beat(beat);
                }
                Subscriber::Actor(actor) => self.step_enemy(actor, beat, out_events),
            }
        }
    }

    /// Scans every valid cell for enemies and barriers; announces the unlock edge.
    fn evaluate_completion(&mut self, out_events: &mut Vec<Event>) {
        let clear = !self.grid.valid_cells().any(|cell| {
            self.grid
                .occupant(cell)
                .is_some_and(|handle| handle.kind().blocks_completion())
        });
        let unlocked = clear && !self.level_clear;
        self.level_clear = clear;
        if !unlocked {
            return;
        }

        for goal in self
            .actors
            .iter()
            .filter(|actor| actor.behavior.kind() == ActorKind::Goal)
        {
            info!(goal = goal.id.get(), "goal unlocked");
            out_events.push(Event::GoalUnlocked { goal: goal.id });
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::ConfigureGrid { layout } => world.rebuild(&layout, out_events),
        Command::Tick { dt } => {
            out_events.push(Event::TimeAdvanced { dt });
            world.clock.accumulate(dt);
            while let Some(beat) = world.clock.try_fire() {
                world.fire_beat(beat, out_events);
            }
            world.evaluate_completion(out_events);
        }
        Command::SpawnActor { kind, cell, health } => {
            world.spawn_actor(kind, cell, health, out_events);
        }
        Command::PlayerAct { actor, direction } => world.player_act(actor, direction, out_events),
        Command::Strike { cell, direction } => world.strike(cell, direction, out_events),
        Command::ReportForecast {
            source,
            cells,
            execute_at,
        } => {
            let _ = world.hazards.report(
                source,
                &cells,
                execute_at,
                world.clock.beat_index(),
                &world.grid,
            );
        }
        Command::DespawnActor { actor } => world.destroy_actor(actor, out_events),
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::collections::BTreeMap;

    use super::{
        BeatClock, ForecastRecord, HazardAggregator, Notification, SpatialGrid, Subscriber, World,
        WorldConfig,
    };
    use beatgrid_core::{ActorHandle, ActorId, ActorSnapshot, ActorView, BeatIndex, CellCoord};

    /// Configuration the world was created with.
    #[must_use]
    pub fn config(world: &World) -> &WorldConfig {
        &world.config
    }

    /// Provides read-only access to the spatial grid.
    #[must_use]
    pub fn grid(world: &World) -> &SpatialGrid {
        &world.grid
    }

    /// Provides read-only access to the beat clock.
    #[must_use]
    pub fn clock(world: &World) -> &BeatClock {
        &world.clock
    }

    /// Index of the most recently fired beat; zero before the first beat.
    #[must_use]
    pub fn beat_index(world: &World) -> BeatIndex {
        world.clock.beat_index()
    }

    /// Subscribers that will receive the next `notification`, in delivery order.
    #[must_use]
    pub fn subscribers(world: &World, notification: Notification) -> &[Subscriber] {
        world.clock.subscribers(notification)
    }

    /// Provides read-only access to the hazard aggregator.
    #[must_use]
    pub fn hazards(world: &World) -> &HazardAggregator {
        &world.hazards
    }

    /// Derived map from endangered cell to the earliest beat it is hit.
    #[must_use]
    pub fn danger_map(world: &World) -> &BTreeMap<CellCoord, BeatIndex> {
        world.hazards.danger_map()
    }

    /// Earliest beat at which `cell` is endangered.
    #[must_use]
    pub fn danger_at(world: &World, cell: CellCoord) -> Option<BeatIndex> {
        world.hazards.danger_at(cell)
    }

    /// Every live forecast record.
    #[must_use]
    pub fn forecasts(world: &World) -> &[ForecastRecord] {
        world.hazards.records()
    }

    /// Actor registered at `cell`; `None` for empty and invalid cells.
    #[must_use]
    pub fn occupant(world: &World, cell: CellCoord) -> Option<ActorHandle> {
        world.grid.occupant(cell)
    }

    /// Snapshot of a single live actor.
    #[must_use]
    pub fn actor(world: &World, actor: ActorId) -> Option<ActorSnapshot> {
        world.actors.get(actor).map(|state| state.snapshot())
    }

    /// Captures a read-only view of every live actor.
    #[must_use]
    pub fn actor_view(world: &World) -> ActorView {
        ActorView::from_snapshots(world.actors.iter().map(|state| state.snapshot()).collect())
    }

    /// Whether no enemy or barrier remained when the last tick was evaluated.
    #[must_use]
    pub fn is_level_clear(world: &World) -> bool {
        world.level_clear
    }
}
