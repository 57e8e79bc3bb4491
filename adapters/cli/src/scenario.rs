//! Scenario files: world settings, an ASCII map and a scripted move list.

use std::{fs, io, path::Path, path::PathBuf};

use beatgrid_core::{ActorKind, CellCoord, Direction, GridLayout};
use beatgrid_world::{ConfigError, WorldConfig};
use serde::Deserialize;
use thiserror::Error;

/// Scenario used when no file is supplied on the command line.
pub(crate) const BUILTIN_SCENARIO: &str = r##########"
moves = "dd.dd.ww.dd.d"
map = [
    "#######G#",
    "#..F....#",
    "#.M...R.#",
    "#...X...#",
    "#P......#",
    "#########",
]

[world]
bpm = 120.0
seed = 7

[player]
cooldown_ms = 200
move_ms = 120
"##########;

const DEFAULT_COOLDOWN_MS: u64 = 200;
const DEFAULT_MOVE_MS: u64 = 120;

/// Parsed scenario file.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct Scenario {
    pub(crate) world: WorldConfig,
    pub(crate) player: PlayerSection,
    pub(crate) map: Vec<String>,
    pub(crate) moves: String,
}

/// Player input tuning.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default)]
pub(crate) struct PlayerSection {
    /// Minimum delay between two confirmed player actions.
    pub(crate) cooldown_ms: u64,
    /// Duration of the on-screen slide between cells.
    pub(crate) move_ms: u64,
}

impl Default for PlayerSection {
    fn default() -> Self {
        Self {
            cooldown_ms: DEFAULT_COOLDOWN_MS,
            move_ms: DEFAULT_MOVE_MS,
        }
    }
}

/// Grid layout and initial actors extracted from a map.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Level {
    pub(crate) layout: GridLayout,
    pub(crate) spawns: Vec<(ActorKind, CellCoord)>,
}

/// Errors raised while loading a scenario.
#[derive(Debug, Error)]
pub(crate) enum ScenarioError {
    #[error("failed to read scenario {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("scenario is not valid TOML")]
    Parse(#[from] toml::de::Error),
    #[error("invalid world settings")]
    World(#[from] ConfigError),
    #[error("scenario map has no walkable cells")]
    EmptyMap,
    #[error("unknown map glyph {glyph:?} at row {row}, column {column}")]
    UnknownGlyph {
        glyph: char,
        row: usize,
        column: usize,
    },
    #[error("unknown move {glyph:?} at position {index}; expected one of w, a, s, d or .")]
    UnknownMove { glyph: char, index: usize },
}

impl Scenario {
    /// Reads and validates the scenario stored at `path`.
    pub(crate) fn load(path: &Path) -> Result<Self, ScenarioError> {
        let text = fs::read_to_string(path).map_err(|source| ScenarioError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    /// Parses and validates scenario text.
    pub(crate) fn parse(text: &str) -> Result<Self, ScenarioError> {
        let scenario: Self = toml::from_str(text)?;
        scenario.world.validate()?;
        Ok(scenario)
    }

    /// Walkable cells and actor placements described by the map.
    ///
    /// The first row is the top of the grid, so it receives the highest `y`.
    pub(crate) fn level(&self) -> Result<Level, ScenarioError> {
        let height = self.map.len();
        let mut cells = Vec::new();
        let mut spawns = Vec::new();

        for (row, line) in self.map.iter().enumerate() {
            let y = coordinate(height - 1 - row);
            for (column, glyph) in line.chars().enumerate() {
                let cell = CellCoord::new(coordinate(column), y);
                let kind = match glyph {
                    '#' | ' ' => continue,
                    '.' => None,
                    'P' => Some(ActorKind::Player),
                    'M' => Some(ActorKind::MeleeEnemy),
                    'R' => Some(ActorKind::RangedEnemy),
                    'B' => Some(ActorKind::Boss),
                    'X' => Some(ActorKind::PushableBox),
                    'F' => Some(ActorKind::Barrier),
                    'G' => Some(ActorKind::Goal),
                    glyph => return Err(ScenarioError::UnknownGlyph { glyph, row, column }),
                };
                cells.push(cell);
                if let Some(kind) = kind {
                    spawns.push((kind, cell));
                }
            }
        }

        if cells.is_empty() {
            return Err(ScenarioError::EmptyMap);
        }
        Ok(Level {
            layout: GridLayout::Mask { cells },
            spawns,
        })
    }

    /// One entry per beat; `None` waits.
    pub(crate) fn moves(&self) -> Result<Vec<Option<Direction>>, ScenarioError> {
        parse_moves(&self.moves)
    }
}

/// Parses a `w/a/s/d/.` script, ignoring whitespace.
pub(crate) fn parse_moves(script: &str) -> Result<Vec<Option<Direction>>, ScenarioError> {
    script
        .chars()
        .filter(|glyph| !glyph.is_whitespace())
        .enumerate()
        .map(|(index, glyph)| match glyph.to_ascii_lowercase() {
            'w' => Ok(Some(Direction::North)),
            's' => Ok(Some(Direction::South)),
            'a' => Ok(Some(Direction::West)),
            'd' => Ok(Some(Direction::East)),
            '.' => Ok(None),
            _ => Err(ScenarioError::UnknownMove { glyph, index }),
        })
        .collect()
}

fn coordinate(index: usize) -> i32 {
    i32::try_from(index).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_scenario_parses() {
        let scenario = Scenario::parse(BUILTIN_SCENARIO).expect("built-in scenario is valid");
        let level = scenario.level().expect("built-in map is valid");
        assert!(level
            .spawns
            .iter()
            .any(|(kind, _)| *kind == ActorKind::Player));
        assert_eq!(scenario.moves().expect("moves parse").len(), 13);
    }

    #[test]
    fn top_row_maps_to_highest_y() {
        let scenario = Scenario {
            map: vec!["G.".to_owned(), ".P".to_owned()],
            ..Scenario::default()
        };
        let level = scenario.level().expect("valid map");
        assert_eq!(
            level.spawns,
            vec![
                (ActorKind::Goal, CellCoord::new(0, 1)),
                (ActorKind::Player, CellCoord::new(1, 0)),
            ]
        );
        match level.layout {
            GridLayout::Mask { cells } => assert_eq!(cells.len(), 4),
            other => panic!("unexpected layout {other:?}"),
        }
    }

    #[test]
    fn walls_and_spaces_are_void() {
        let scenario = Scenario {
            map: vec!["# .".to_owned()],
            ..Scenario::default()
        };
        let level = scenario.level().expect("valid map");
        assert_eq!(
            level.layout,
            GridLayout::Mask {
                cells: vec![CellCoord::new(2, 0)],
            }
        );
    }

    #[test]
    fn unknown_glyphs_and_empty_maps_are_rejected() {
        let scenario = Scenario {
            map: vec!["..?".to_owned()],
            ..Scenario::default()
        };
        assert!(matches!(
            scenario.level(),
            Err(ScenarioError::UnknownGlyph {
                glyph: '?',
                row: 0,
                column: 2,
            })
        ));
        assert!(matches!(
            Scenario::default().level(),
            Err(ScenarioError::EmptyMap)
        ));
    }

    #[test]
    fn move_script_ignores_whitespace() {
        let moves = parse_moves("w a\n.D").expect("valid script");
        assert_eq!(
            moves,
            vec![
                Some(Direction::North),
                Some(Direction::West),
                None,
                Some(Direction::East),
            ]
        );
        assert!(matches!(
            parse_moves("wx"),
            Err(ScenarioError::UnknownMove {
                glyph: 'x',
                index: 1
            })
        ));
    }

    #[test]
    fn invalid_tempo_is_reported() {
        let result = Scenario::parse("[world]\nbpm = -1.0\n");
        assert!(matches!(
            result,
            Err(ScenarioError::World(ConfigError::InvalidTempo(_)))
        ));
    }
}
