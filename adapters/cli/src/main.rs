#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that plays a Beatgrid scenario in the terminal.
//!
//! The adapter owns the frame loop: every frame it hands the events of the
//! previous frame to the presentation and the player control system, applies
//! the resulting commands followed by a tick, and captures a fresh scene.

mod scenario;
mod terminal;

use std::{io, mem, path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use beatgrid_core::{ActorId, ActorKind, BeatPolicy, Command, Direction, Event};
use beatgrid_rendering::{FrameControl, Presentation, RenderingBackend, Scene, SceneCell};
use beatgrid_system_player_control::{Config as PlayerControlConfig, MoveIntent, PlayerControl};
use beatgrid_world::{self as world, query, World, WorldConfig};
use clap::Parser;
use tracing::{info, trace, warn};
use tracing_subscriber::EnvFilter;

use crate::{
    scenario::{parse_moves, Level, Scenario, BUILTIN_SCENARIO},
    terminal::TerminalBackend,
};

#[derive(Debug, Parser)]
#[command(name = "beatgrid", about = "Plays a beat-synchronised grid scenario")]
struct CliArgs {
    /// Scenario file to load; the built-in level is used when omitted.
    #[arg(long, value_name = "PATH")]
    scenario: Option<PathBuf>,
    /// Number of beats to simulate before stopping.
    #[arg(long, default_value_t = 16, value_parser = clap::value_parser!(u64).range(1..))]
    beats: u64,
    /// Simulated time fed to the world per frame, in milliseconds.
    #[arg(long, default_value_t = 50, value_parser = clap::value_parser!(u64).range(1..))]
    frame_ms: u64,
    /// Overrides the seed enemies use to pick directions.
    #[arg(long)]
    seed: Option<u64>,
    /// Overrides the tempo in beats per minute.
    #[arg(long)]
    bpm: Option<f64>,
    /// Fires at most one beat per frame even when frames are long.
    #[arg(long)]
    one_beat_per_frame: bool,
    /// Replaces the scenario's move script (`w`, `a`, `s`, `d` or `.` per beat).
    #[arg(long)]
    moves: Option<String>,
    /// Sleeps for every frame so the run plays at wall-clock speed.
    #[arg(long)]
    realtime: bool,
    /// Prints only the final summary.
    #[arg(long)]
    quiet: bool,
}

/// Reason a run stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Outcome {
    Completed,
    PlayerLost,
    OutOfBeats,
}

/// World, player control and move script driven one frame at a time.
struct Session {
    world: World,
    control: PlayerControl,
    moves: Vec<Option<Direction>>,
    cursor: usize,
    acted: bool,
    beat_limit: u64,
    pending: Vec<Event>,
    outcome: Option<Outcome>,
}

impl Session {
    fn new(
        config: WorldConfig,
        level: Level,
        moves: Vec<Option<Direction>>,
        control: PlayerControlConfig,
        beat_limit: u64,
    ) -> Self {
        let mut world = World::with_config(config);
        let mut pending = Vec::new();
        world::apply(
            &mut world,
            Command::ConfigureGrid {
                layout: level.layout,
            },
            &mut pending,
        );
        for (kind, cell) in level.spawns {
            world::apply(
                &mut world,
                Command::SpawnActor {
                    kind,
                    cell,
                    health: None,
                },
                &mut pending,
            );
        }
        for event in &pending {
            if let Event::SpawnRejected { kind, cell, reason } = event {
                warn!(?kind, ?cell, ?reason, "scenario placement rejected");
            }
        }

        Self {
            world,
            control: PlayerControl::new(control),
            moves,
            cursor: 0,
            acted: false,
            beat_limit,
            pending,
            outcome: None,
        }
    }

    fn frame(&mut self, dt: Duration, presentation: &mut Presentation) -> FrameControl {
        let events = mem::take(&mut self.pending);
        presentation.observe(&events);
        presentation.advance(dt);
        self.observe(&events);
        if self.outcome.is_some() {
            return FrameControl::Exit;
        }

        let intents = self.intents();
        let mut commands = Vec::new();
        self.control.handle(
            &events,
            &intents,
            |actor| presentation.is_in_transition(actor),
            &mut commands,
        );
        commands.push(Command::Tick { dt });
        for command in commands {
            world::apply(&mut self.world, command, &mut self.pending);
        }

        presentation.scene = capture_scene(&self.world);
        FrameControl::Continue
    }

    fn observe(&mut self, events: &[Event]) {
        for event in events {
            trace!(?event, "world event");
            match event {
                Event::BeatFired { beat } => {
                    self.cursor = usize::try_from(beat.get()).unwrap_or(usize::MAX);
                    self.acted = false;
                    if beat.get() >= self.beat_limit {
                        self.finish(Outcome::OutOfBeats);
                    }
                }
                Event::ActorMoved { actor, .. }
                | Event::HitLanded {
                    attacker: Some(actor),
                    ..
                } if self.is_player(*actor) => self.acted = true,
                Event::ActorDestroyed { actor, .. } if actor.kind() == ActorKind::Player => {
                    if self.players().next().is_none() {
                        self.finish(Outcome::PlayerLost);
                    }
                }
                Event::LevelCompleted { .. } => self.finish(Outcome::Completed),
                _ => {}
            }
        }
    }

    fn finish(&mut self, outcome: Outcome) {
        if self.outcome.is_none() {
            info!(?outcome, "run finished");
            self.outcome = Some(outcome);
        }
    }

    fn is_player(&self, actor: ActorId) -> bool {
        query::actor(&self.world, actor)
            .is_some_and(|snapshot| snapshot.handle.kind() == ActorKind::Player)
    }

    fn players(&self) -> impl Iterator<Item = ActorId> {
        query::actor_view(&self.world)
            .into_vec()
            .into_iter()
            .filter(|snapshot| snapshot.handle.kind() == ActorKind::Player)
            .map(|snapshot| snapshot.handle.id())
    }

    /// The scripted move for the current beat, until a player acts on it.
    fn intents(&self) -> Vec<MoveIntent> {
        if self.acted {
            return Vec::new();
        }
        let Some(Some(direction)) = self.moves.get(self.cursor).copied() else {
            return Vec::new();
        };
        self.players()
            .map(|player| MoveIntent::new(player, direction))
            .collect()
    }

    fn summary(&self) -> String {
        let outcome = match self.outcome {
            Some(Outcome::Completed) => "level completed",
            Some(Outcome::PlayerLost) => "player destroyed",
            Some(Outcome::OutOfBeats) | None => "out of beats",
        };
        let health: Vec<String> = query::actor_view(&self.world)
            .iter()
            .filter(|snapshot| snapshot.handle.kind() == ActorKind::Player)
            .map(|snapshot| snapshot.health.unwrap_or_default().to_string())
            .collect();
        let health = if health.is_empty() {
            "-".to_owned()
        } else {
            health.join(", ")
        };
        format!(
            "{outcome} after {} beats; player health: {health}; goal open: {}",
            query::beat_index(&self.world).get(),
            query::is_level_clear(&self.world),
        )
    }
}

fn capture_scene(world: &World) -> Scene {
    let cells = query::grid(world)
        .valid_cells()
        .map(|cell| {
            SceneCell::new(
                cell,
                query::occupant(world, cell),
                query::danger_at(world, cell),
            )
        })
        .collect();
    Scene::new(query::beat_index(world), cells, query::is_level_clear(world))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Entry point for the Beatgrid command-line interface.
fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_tracing();

    let mut scenario = match &args.scenario {
        Some(path) => Scenario::load(path)
            .with_context(|| format!("failed to load scenario {}", path.display()))?,
        None => Scenario::parse(BUILTIN_SCENARIO).context("built-in scenario is invalid")?,
    };
    if let Some(seed) = args.seed {
        scenario.world.seed = seed;
    }
    if let Some(bpm) = args.bpm {
        scenario.world.bpm = bpm;
    }
    if args.one_beat_per_frame {
        scenario.world.beat_policy = BeatPolicy::OnePerAdvance;
    }
    scenario
        .world
        .validate()
        .context("invalid world settings on the command line")?;

    let moves = match &args.moves {
        Some(script) => parse_moves(script).context("invalid --moves script")?,
        None => scenario.moves().context("invalid move script in scenario")?,
    };
    let level = scenario.level().context("invalid scenario map")?;
    info!(
        actors = level.spawns.len(),
        moves = moves.len(),
        bpm = scenario.world.bpm,
        seed = scenario.world.seed,
        "starting run"
    );

    let mut session = Session::new(
        scenario.world.clone(),
        level,
        moves,
        PlayerControlConfig::new(Duration::from_millis(scenario.player.cooldown_ms)),
        args.beats,
    );
    let move_duration = Duration::from_millis(scenario.player.move_ms);
    let presentation = Presentation::new("Beatgrid", move_duration);
    let backend = TerminalBackend::new(
        Duration::from_millis(args.frame_ms),
        args.realtime,
        args.quiet,
    );
    backend.run(presentation, |dt, presentation| Ok(session.frame(dt, presentation)))?;

    println!("{}", session.summary());
    Ok(())
}
