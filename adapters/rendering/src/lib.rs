#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Shared rendering contracts for Beatgrid adapters.
//!
//! The world relocates actors instantly. Everything here lives on the
//! presentation side: scenes describing what to draw, per-actor motion
//! tracks that ease sprites between cells, and the backend trait adapters
//! implement to put frames on screen.

use std::{collections::BTreeMap, time::Duration};

use anyhow::Result as AnyResult;
use beatgrid_core::{ActorHandle, ActorId, ActorKind, BeatIndex, CellCoord, Event};
use glam::Vec2;

/// Interpolated position of a single actor between two cells.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MotionTrack {
    from: Vec2,
    to: Vec2,
    elapsed: Duration,
    duration: Duration,
}

impl MotionTrack {
    /// Creates a settled track resting at `position`.
    #[must_use]
    pub fn at(position: Vec2) -> Self {
        Self {
            from: position,
            to: position,
            elapsed: Duration::ZERO,
            duration: Duration::ZERO,
        }
    }

    /// Starts easing from the current position toward `target` over `duration`.
    pub fn retarget(&mut self, target: Vec2, duration: Duration) {
        self.from = self.position();
        self.to = target;
        self.elapsed = Duration::ZERO;
        self.duration = duration;
    }

    /// Advances the interpolation clock by `dt`.
    pub fn advance(&mut self, dt: Duration) {
        self.elapsed = self.elapsed.saturating_add(dt).min(self.duration);
    }

    /// Current interpolated position.
    #[must_use]
    pub fn position(&self) -> Vec2 {
        self.from.lerp(self.to, self.progress())
    }

    /// Destination of the current motion.
    #[must_use]
    pub fn target(&self) -> Vec2 {
        self.to
    }

    /// Fraction of the motion completed, in `0.0..=1.0`.
    #[must_use]
    pub fn progress(&self) -> f32 {
        if self.duration.is_zero() {
            return 1.0;
        }
        (self.elapsed.as_secs_f32() / self.duration.as_secs_f32()).clamp(0.0, 1.0)
    }

    /// Whether the track has reached its destination.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.elapsed >= self.duration
    }
}

/// Single grid cell as it should be drawn.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SceneCell {
    /// Coordinate of the cell.
    pub cell: CellCoord,
    /// Actor registered at the cell.
    pub occupant: Option<ActorHandle>,
    /// Earliest beat at which the cell is endangered.
    pub danger: Option<BeatIndex>,
}

impl SceneCell {
    /// Creates a new scene cell descriptor.
    #[must_use]
    pub const fn new(
        cell: CellCoord,
        occupant: Option<ActorHandle>,
        danger: Option<BeatIndex>,
    ) -> Self {
        Self {
            cell,
            occupant,
            danger,
        }
    }

    /// Character used by text backends; occupants take precedence over warnings.
    #[must_use]
    pub fn glyph(&self) -> char {
        match (self.occupant, self.danger) {
            (Some(handle), _) => glyph_for(handle.kind()),
            (None, Some(_)) => '!',
            (None, None) => '.',
        }
    }
}

/// Character representing an actor variant.
#[must_use]
pub const fn glyph_for(kind: ActorKind) -> char {
    match kind {
        ActorKind::Player => 'P',
        ActorKind::MeleeEnemy => 'M',
        ActorKind::RangedEnemy => 'R',
        ActorKind::Boss => 'B',
        ActorKind::PushableBox => 'X',
        ActorKind::Barrier => 'F',
        ActorKind::Goal => 'G',
    }
}

/// Scene description captured from the world once per frame.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Scene {
    /// Most recently fired beat.
    pub beat: BeatIndex,
    /// Valid cells in grid order.
    pub cells: Vec<SceneCell>,
    /// Whether the goal is open.
    pub level_clear: bool,
}

impl Scene {
    /// Creates a new scene descriptor.
    #[must_use]
    pub fn new(beat: BeatIndex, cells: Vec<SceneCell>, level_clear: bool) -> Self {
        Self {
            beat,
            cells,
            level_clear,
        }
    }

    /// Looks up the descriptor of `cell`.
    #[must_use]
    pub fn cell(&self, cell: CellCoord) -> Option<&SceneCell> {
        self.cells.iter().find(|candidate| candidate.cell == cell)
    }

    /// Inclusive bounding box of every cell in the scene.
    #[must_use]
    pub fn bounds(&self) -> Option<(CellCoord, CellCoord)> {
        let first = self.cells.first()?.cell;
        Some(self.cells.iter().fold((first, first), |(min, max), entry| {
            (
                CellCoord::new(min.x().min(entry.cell.x()), min.y().min(entry.cell.y())),
                CellCoord::new(max.x().max(entry.cell.x()), max.y().max(entry.cell.y())),
            )
        }))
    }
}

/// Presentation state consumed by rendering backends.
///
/// Besides the latest [`Scene`], it tracks one [`MotionTrack`] per live actor
/// so sprites glide between cells instead of jumping.
#[derive(Clone, Debug, PartialEq)]
pub struct Presentation {
    /// Title shown by the backend.
    pub title: String,
    /// Scene content that should be displayed.
    pub scene: Scene,
    move_duration: Duration,
    tracks: BTreeMap<ActorId, MotionTrack>,
}

impl Presentation {
    /// Constructs a presentation easing every move over `move_duration`.
    #[must_use]
    pub fn new<T>(title: T, move_duration: Duration) -> Self
    where
        T: Into<String>,
    {
        Self {
            title: title.into(),
            scene: Scene::default(),
            move_duration,
            tracks: BTreeMap::new(),
        }
    }

    /// Updates motion tracks from world events.
    pub fn observe(&mut self, events: &[Event]) {
        for event in events {
            match event {
                Event::GridRebuilt { .. } => self.tracks.clear(),
                Event::ActorSpawned { actor, cell } => {
                    let _ = self
                        .tracks
                        .insert(actor.id(), MotionTrack::at(cell_position(*cell)));
                }
                Event::ActorMoved { actor, to, .. } => {
                    let duration = self.move_duration;
                    self.tracks
                        .entry(*actor)
                        .or_insert_with(|| MotionTrack::at(cell_position(*to)))
                        .retarget(cell_position(*to), duration);
                }
                Event::ActorDestroyed { actor, .. } => {
                    let _ = self.tracks.remove(&actor.id());
                }
                _ => {}
            }
        }
    }

    /// Advances every motion track by `dt`.
    pub fn advance(&mut self, dt: Duration) {
        for track in self.tracks.values_mut() {
            track.advance(dt);
        }
    }

    /// Whether `actor` is still travelling toward its cell on screen.
    #[must_use]
    pub fn is_in_transition(&self, actor: ActorId) -> bool {
        self.tracks
            .get(&actor)
            .is_some_and(|track| !track.is_settled())
    }

    /// Interpolated cell-space position of `actor`.
    #[must_use]
    pub fn position(&self, actor: ActorId) -> Option<Vec2> {
        self.tracks.get(&actor).map(MotionTrack::position)
    }
}

fn cell_position(cell: CellCoord) -> Vec2 {
    Vec2::new(cell.x() as f32, cell.y() as f32)
}

/// Whether a backend should keep running after a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameControl {
    /// Present another frame.
    Continue,
    /// Stop after presenting the current frame.
    Exit,
}

/// Rendering backend capable of presenting Beatgrid scenes.
pub trait RenderingBackend {
    /// Runs the rendering backend until the update closure asks it to exit.
    ///
    /// The `update` closure receives the frame delta and may mutate the
    /// presentation before it is drawn, allowing adapters to drive the
    /// simulation one frame at a time.
    fn run<F>(self, presentation: Presentation, update: F) -> AnyResult<()>
    where
        F: FnMut(Duration, &mut Presentation) -> AnyResult<FrameControl>;
}
