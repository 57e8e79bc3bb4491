#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Beatgrid engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters submit [`Command`] values
//! describing desired mutations, the world executes those commands via its
//! `apply` entry point, and then broadcasts [`Event`] values for systems to
//! react to deterministically. Simulation time is measured in beats: the
//! world's clock converts accumulated [`Duration`] into [`BeatIndex`] steps.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Rebuilds the grid from the provided layout.
    ///
    /// Rebuilding discards every actor, subscription and forecast.
    ConfigureGrid {
        /// Description of the cells that become valid after the rebuild.
        layout: GridLayout,
    },
    /// Advances the simulation clock by the provided delta time.
    Tick {
        /// Duration of real time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Requests that a new actor be created and registered on the grid.
    SpawnActor {
        /// Behaviour variant of the actor.
        kind: ActorKind,
        /// Cell the actor is anchored to after spawning.
        cell: CellCoord,
        /// Health override; `None` applies [`ActorKind::default_health`].
        health: Option<u32>,
    },
    /// Requests that a player either strikes or steps in a direction.
    PlayerAct {
        /// Player performing the action.
        actor: ActorId,
        /// Direction of the strike or step.
        direction: Direction,
    },
    /// Applies an anonymous external hit to whatever occupies `cell`.
    Strike {
        /// Cell whose occupant receives the hit.
        cell: CellCoord,
        /// Direction the hit travels in.
        direction: Direction,
    },
    /// Publishes hazard forecasts on behalf of a source.
    ReportForecast {
        /// Owner of the forecast records.
        source: ForecastSource,
        /// Cells endangered by the forecast.
        cells: Vec<CellCoord>,
        /// Beat at which the hazard resolves.
        execute_at: BeatIndex,
    },
    /// Removes an actor from the world.
    DespawnActor {
        /// Identifier of the actor to remove.
        actor: ActorId,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// Confirms that the grid was rebuilt from a new layout.
    GridRebuilt {
        /// Number of valid cells in the rebuilt grid.
        cell_count: usize,
    },
    /// Indicates that real time was fed into the clock.
    TimeAdvanced {
        /// Duration of time supplied by the tick.
        dt: Duration,
    },
    /// First notification of a beat, emitted before any actor acts.
    BeatStarted {
        /// Beat that was just reached.
        beat: BeatIndex,
    },
    /// Second notification of a beat, emitted while subscribed actors act.
    BeatFired {
        /// Beat that was just reached.
        beat: BeatIndex,
    },
    /// Confirms that an actor was created and registered.
    ActorSpawned {
        /// Handle allocated for the new actor.
        actor: ActorHandle,
        /// Anchor cell occupied by the actor.
        cell: CellCoord,
    },
    /// Reports that a spawn request was rejected.
    SpawnRejected {
        /// Requested behaviour variant.
        kind: ActorKind,
        /// Requested anchor cell.
        cell: CellCoord,
        /// Reason the request failed.
        reason: SpawnError,
    },
    /// Confirms that an actor relocated between two cells.
    ActorMoved {
        /// Actor that moved.
        actor: ActorId,
        /// Cell vacated by the move.
        from: CellCoord,
        /// Cell claimed by the move.
        to: CellCoord,
    },
    /// Reports that a hit was delivered to an actor.
    HitLanded {
        /// Actor that delivered the hit, or `None` for external forces.
        attacker: Option<ActorId>,
        /// Actor that received the hit.
        target: ActorHandle,
        /// Direction the hit travelled in.
        direction: Direction,
    },
    /// Reports that an actor lost health without being destroyed.
    ActorDamaged {
        /// Actor that was damaged.
        actor: ActorId,
        /// Health remaining after the damage.
        remaining: u32,
    },
    /// Confirms that an actor was removed from the grid and every subscriber list.
    ActorDestroyed {
        /// Handle of the removed actor.
        actor: ActorHandle,
        /// Anchor cell the actor occupied.
        cell: CellCoord,
    },
    /// Announces an enemy's intended action for the next beat.
    Telegraphed {
        /// Enemy announcing the action.
        actor: ActorId,
        /// Intended direction, or `None` when the enemy intends no action.
        direction: Option<Direction>,
        /// Beat at which the action resolves.
        execute_at: BeatIndex,
        /// Cells endangered by the action.
        cells: Vec<CellCoord>,
    },
    /// Reports that an enemy's resolved action found its way blocked.
    ActionBlocked {
        /// Enemy whose action was blocked.
        actor: ActorId,
        /// Direction of the blocked action.
        direction: Direction,
    },
    /// Announces that no enemy or barrier remains, unlocking the goal.
    GoalUnlocked {
        /// Goal that became enterable.
        goal: ActorId,
    },
    /// Reports that a player reached a goal that is still locked.
    GoalLocked {
        /// Goal that refused entry.
        goal: ActorId,
    },
    /// Announces that a player entered an unlocked goal.
    LevelCompleted {
        /// Goal that was entered.
        goal: ActorId,
        /// Player that entered the goal.
        player: ActorId,
    },
}

/// Description of the cells that compose a grid build.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GridLayout {
    /// Dense rectangle anchored at the origin cell.
    Rectangle {
        /// Number of columns in the rectangle.
        width: u32,
        /// Number of rows in the rectangle.
        height: u32,
    },
    /// Explicit walkable cells derived from a tile layer.
    Mask {
        /// Cells that become valid; duplicates are ignored.
        cells: Vec<CellCoord>,
    },
}

/// Location of a single grid cell expressed as signed coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    x: i32,
    y: i32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Horizontal coordinate of the cell.
    #[must_use]
    pub const fn x(&self) -> i32 {
        self.x
    }

    /// Vertical coordinate of the cell.
    #[must_use]
    pub const fn y(&self) -> i32 {
        self.y
    }

    /// Returns the neighbouring cell one step in `direction`.
    #[must_use]
    pub const fn step(self, direction: Direction) -> Self {
        let (dx, dy) = direction.delta();
        self.offset(dx, dy)
    }

    /// Returns the cell displaced by the provided deltas.
    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
        }
    }
}

/// Cardinal directions used for movement, strikes and telegraphs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    /// Toward increasing `y`.
    North,
    /// Toward decreasing `y`.
    South,
    /// Toward decreasing `x`.
    West,
    /// Toward increasing `x`.
    East,
}

impl Direction {
    /// Every direction in the order enemies evaluate them.
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::West,
        Direction::East,
    ];

    /// Unit offset applied to a cell when stepping in this direction.
    #[must_use]
    pub const fn delta(self) -> (i32, i32) {
        match self {
            Self::North => (0, 1),
            Self::South => (0, -1),
            Self::West => (-1, 0),
            Self::East => (1, 0),
        }
    }
}

/// Unique identifier assigned to an actor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActorId(u32);

impl ActorId {
    /// Creates a new actor identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Closed set of actor behaviour variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorKind {
    /// Player-controlled actor.
    Player,
    /// Enemy that steps into or strikes an adjacent cell.
    MeleeEnemy,
    /// Enemy that fires along a straight line.
    RangedEnemy,
    /// Stationary enemy occupying a 3x3 block.
    Boss,
    /// Inert crate that slides when struck.
    PushableBox,
    /// Destructible wall that breaks after repeated hits.
    Barrier,
    /// Level exit that unlocks once the level is clear.
    Goal,
}

impl ActorKind {
    /// Health assigned when a spawn request does not override it.
    ///
    /// Boxes and goals cannot be damaged and report `None`.
    #[must_use]
    pub const fn default_health(self) -> Option<u32> {
        match self {
            Self::Player => Some(3),
            Self::MeleeEnemy | Self::RangedEnemy => Some(1),
            Self::Boss => Some(5),
            Self::Barrier => Some(3),
            Self::PushableBox | Self::Goal => None,
        }
    }

    /// Reports whether the variant runs the telegraph state machine.
    #[must_use]
    pub const fn is_enemy(self) -> bool {
        matches!(self, Self::MeleeEnemy | Self::RangedEnemy | Self::Boss)
    }

    /// Reports whether the variant keeps the goal locked while alive.
    #[must_use]
    pub const fn blocks_completion(self) -> bool {
        self.is_enemy() || matches!(self, Self::Barrier)
    }

    /// Reports whether the variant refuses every relocation.
    #[must_use]
    pub const fn is_anchored(self) -> bool {
        matches!(self, Self::Boss | Self::Barrier | Self::Goal)
    }
}

/// Reference to an actor tagged with its behaviour variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActorHandle {
    id: ActorId,
    kind: ActorKind,
}

impl ActorHandle {
    /// Creates a handle for the provided actor.
    #[must_use]
    pub const fn new(id: ActorId, kind: ActorKind) -> Self {
        Self { id, kind }
    }

    /// Identifier of the referenced actor.
    #[must_use]
    pub const fn id(&self) -> ActorId {
        self.id
    }

    /// Behaviour variant of the referenced actor.
    #[must_use]
    pub const fn kind(&self) -> ActorKind {
        self.kind
    }
}

/// Monotonic beat counter starting at zero.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct BeatIndex(u64);

impl BeatIndex {
    /// Beat index before the clock has fired.
    pub const ZERO: Self = Self(0);

    /// Creates a beat index wrapper.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Retrieves the underlying beat number.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }

    /// Beat immediately following this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

/// Owner of a hazard forecast.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ForecastSource {
    /// One-shot forecasts that accumulate and are never replaced.
    Anonymous,
    /// Forecasts owned by an actor; each report replaces the previous one.
    Actor(ActorId),
}

/// Whether the clock may fire several beats from a single tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BeatPolicy {
    /// Fires every beat covered by the accumulated time.
    #[default]
    CatchUp,
    /// Fires at most one beat per tick; surplus time stays accumulated.
    OnePerAdvance,
}

/// Phase of the enemy telegraph state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TelegraphPhase {
    /// The enemy picks and announces its next action on the coming beat.
    Telegraph,
    /// The enemy executes its announced action on the coming beat.
    Resolve,
}

/// Reasons a spawn request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpawnError {
    /// The anchor cell is not part of the grid.
    InvalidCell,
    /// A cell the actor would claim already holds another actor.
    Occupied,
}

/// Immutable representation of a single actor's state used for queries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActorSnapshot {
    /// Handle of the actor.
    pub handle: ActorHandle,
    /// Anchor cell of the actor.
    pub cell: CellCoord,
    /// Remaining health, if the variant can be damaged.
    pub health: Option<u32>,
    /// Telegraph phase for enemies.
    pub phase: Option<TelegraphPhase>,
    /// Announced direction awaiting resolution.
    pub intent: Option<Direction>,
}

/// Read-only snapshot describing every live actor.
#[derive(Clone, Debug, Default)]
pub struct ActorView {
    snapshots: Vec<ActorSnapshot>,
}

impl ActorView {
    /// Creates a new actor view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<ActorSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.handle.id());
        Self { snapshots }
    }

    /// Iterator over the captured snapshots in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = &ActorSnapshot> {
        self.snapshots.iter()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<ActorSnapshot> {
        self.snapshots
    }
}
