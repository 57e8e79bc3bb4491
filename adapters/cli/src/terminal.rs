//! Text backend that prints one grid snapshot per beat to standard output.

use std::{
    io::{self, Write},
    thread,
    time::Duration,
};

use anyhow::{Context, Result};
use beatgrid_core::{BeatIndex, CellCoord};
use beatgrid_rendering::{FrameControl, Presentation, RenderingBackend, Scene, SceneCell};

/// Rendering backend writing ASCII frames to the terminal.
#[derive(Clone, Copy, Debug)]
pub(crate) struct TerminalBackend {
    frame: Duration,
    realtime: bool,
    quiet: bool,
}

impl TerminalBackend {
    /// Creates a backend feeding `frame` of simulated time per update.
    pub(crate) const fn new(frame: Duration, realtime: bool, quiet: bool) -> Self {
        Self {
            frame,
            realtime,
            quiet,
        }
    }
}

impl RenderingBackend for TerminalBackend {
    fn run<F>(self, presentation: Presentation, mut update: F) -> Result<()>
    where
        F: FnMut(Duration, &mut Presentation) -> Result<FrameControl>,
    {
        let mut presentation = presentation;
        let stdout = io::stdout();
        let mut out = stdout.lock();
        if !self.quiet {
            writeln!(out, "{}", presentation.title).context("failed to write title")?;
        }

        let mut drawn: Option<BeatIndex> = None;
        loop {
            let control = update(self.frame, &mut presentation)?;
            let beat = presentation.scene.beat;
            if !self.quiet && drawn != Some(beat) {
                write!(out, "{}", render(&presentation.scene)).context("failed to draw frame")?;
                drawn = Some(beat);
            }
            if control == FrameControl::Exit {
                break;
            }
            if self.realtime {
                thread::sleep(self.frame);
            }
        }

        out.flush().context("failed to flush terminal output")
    }
}

/// Formats the scene as text, top row first.
pub(crate) fn render(scene: &Scene) -> String {
    let mut text = format!("beat {}", scene.beat.get());
    if scene.level_clear {
        text.push_str(" (goal open)");
    }
    text.push('\n');

    let Some((min, max)) = scene.bounds() else {
        return text;
    };
    for y in (min.y()..=max.y()).rev() {
        let row: String = (min.x()..=max.x())
            .map(|x| {
                scene
                    .cell(CellCoord::new(x, y))
                    .map_or(' ', SceneCell::glyph)
            })
            .collect();
        text.push_str(row.trim_end());
        text.push('\n');
    }
    text
}
