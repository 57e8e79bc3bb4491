//! Hazard warning aggregator: per-source forecasts merged into a danger map.

use std::collections::BTreeMap;

use beatgrid_core::{BeatIndex, CellCoord, ForecastSource};
use tracing::trace;

use crate::grid::SpatialGrid;

/// Single forecast predicting a hazard at a cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ForecastRecord {
    /// Owner of the record.
    pub source: ForecastSource,
    /// Endangered cell.
    pub cell: CellCoord,
    /// Beat at which the hazard resolves.
    pub execute_at: BeatIndex,
}

/// Forecast records plus the derived cell to earliest-beat danger map.
#[derive(Clone, Debug, Default)]
pub struct HazardAggregator {
    records: Vec<ForecastRecord>,
    danger: BTreeMap<CellCoord, BeatIndex>,
}

impl HazardAggregator {
    /// Creates an aggregator without any forecasts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the forecasts of `source` with `cells` resolving at `execute_at`.
    ///
    /// Anonymous sources never lose earlier records. Cells outside the grid
    /// are skipped, and nothing is admitted unless `execute_at` lies strictly
    /// after `current`. Returns the number of admitted records.
    pub fn report(
        &mut self,
        source: ForecastSource,
        cells: &[CellCoord],
        execute_at: BeatIndex,
        current: BeatIndex,
        grid: &SpatialGrid,
    ) -> usize {
        if source != ForecastSource::Anonymous {
            self.records.retain(|record| record.source != source);
        }

        let before = self.records.len();
        if execute_at > current {
            self.records.extend(
                cells
                    .iter()
                    .copied()
                    .filter(|cell| grid.is_valid(*cell))
                    .map(|cell| ForecastRecord {
                        source,
                        cell,
                        execute_at,
                    }),
            );
        }
        let admitted = self.records.len() - before;

        self.rebuild();
        admitted
    }

    /// Drops every record owned by `source`.
    pub fn withdraw(&mut self, source: ForecastSource) {
        if source == ForecastSource::Anonymous {
            return;
        }
        let before = self.records.len();
        self.records.retain(|record| record.source != source);
        if self.records.len() != before {
            self.rebuild();
        }
    }

    /// Discards records due at or before `beat`; returns how many were pruned.
    pub fn begin_beat(&mut self, beat: BeatIndex) -> usize {
        let before = self.records.len();
        self.records.retain(|record| record.execute_at > beat);
        let pruned = before - self.records.len();
        self.rebuild();
        pruned
    }

    /// Removes every record.
    pub fn clear(&mut self) {
        self.records.clear();
        self.danger.clear();
    }

    /// Earliest beat at which `cell` is endangered.
    #[must_use]
    pub fn danger_at(&self, cell: CellCoord) -> Option<BeatIndex> {
        self.danger.get(&cell).copied()
    }

    /// Derived danger map keyed by cell.
    #[must_use]
    pub fn danger_map(&self) -> &BTreeMap<CellCoord, BeatIndex> {
        &self.danger
    }

    /// Every live record in admission order.
    #[must_use]
    pub fn records(&self) -> &[ForecastRecord] {
        &self.records
    }

    /// Records owned by `source`.
    pub fn records_for(&self, source: ForecastSource) -> impl Iterator<Item = &ForecastRecord> {
        self.records
            .iter()
            .filter(move |record| record.source == source)
    }

    fn rebuild(&mut self) {
        self.danger.clear();
        for record in &self.records {
            let _ = self
                .danger
                .entry(record.cell)
                .and_modify(|beat| *beat = (*beat).min(record.execute_at))
                .or_insert(record.execute_at);
        }
        trace!(
            records = self.records.len(),
            cells = self.danger.len(),
            "danger map rebuilt"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beatgrid_core::{ActorId, GridLayout};
    use glam::Vec2;

    fn grid() -> SpatialGrid {
        let mut grid = SpatialGrid::new(1.0, Vec2::ZERO);
        grid.rebuild(&GridLayout::Rectangle {
            width: 5,
            height: 5,
        });
        grid
    }

    fn beat(value: u64) -> BeatIndex {
        BeatIndex::new(value)
    }

    fn owned(value: u32) -> ForecastSource {
        ForecastSource::Actor(ActorId::new(value))
    }

    #[test]
    fn owned_reports_replace_previous_records() {
        let grid = grid();
        let mut hazards = HazardAggregator::new();
        let first = [CellCoord::new(1, 1), CellCoord::new(2, 1)];
        let second = [CellCoord::new(4, 4)];

        let _ = hazards.report(owned(1), &first, beat(2), beat(1), &grid);
        let _ = hazards.report(owned(1), &second, beat(2), beat(1), &grid);

        assert_eq!(hazards.records().len(), 1);
        assert_eq!(hazards.danger_at(CellCoord::new(1, 1)), None);
        assert_eq!(hazards.danger_at(CellCoord::new(4, 4)), Some(beat(2)));
    }

    #[test]
    fn anonymous_reports_accumulate() {
        let grid = grid();
        let mut hazards = HazardAggregator::new();
        let cell = [CellCoord::new(0, 0)];
        let anon = ForecastSource::Anonymous;
        let _ = hazards.report(anon, &cell, beat(4), beat(0), &grid);
        let _ = hazards.report(anon, &cell, beat(2), beat(0), &grid);
        assert_eq!(hazards.records().len(), 2);
        assert_eq!(hazards.danger_at(cell[0]), Some(beat(2)));

        hazards.withdraw(ForecastSource::Anonymous);
        assert_eq!(hazards.records().len(), 2);
    }

    #[test]
    fn stale_and_invalid_forecasts_are_dropped() {
        let grid = grid();
        let mut hazards = HazardAggregator::new();
        let cells = [CellCoord::new(1, 1)];

        assert_eq!(hazards.report(owned(1), &cells, beat(3), beat(3), &grid), 0);
        assert_eq!(hazards.report(owned(1), &cells, beat(2), beat(3), &grid), 0);
        let outside = [CellCoord::new(9, 9), CellCoord::new(-1, 0)];
        assert_eq!(hazards.report(owned(1), &outside, beat(4), beat(3), &grid), 0);
        assert!(hazards.danger_map().is_empty());
    }

    #[test]
    fn stale_owned_report_still_clears_previous_records() {
        let grid = grid();
        let mut hazards = HazardAggregator::new();
        let cells = [CellCoord::new(2, 2)];
        let _ = hazards.report(owned(7), &cells, beat(5), beat(4), &grid);
        let _ = hazards.report(owned(7), &cells, beat(4), beat(4), &grid);
        assert!(hazards.records().is_empty());
    }

    #[test]
    fn merged_cell_shows_earliest_beat_until_it_resolves() {
        let grid = grid();
        let mut hazards = HazardAggregator::new();
        let cell = [CellCoord::new(3, 3)];
        let _ = hazards.report(owned(1), &cell, beat(3), beat(0), &grid);
        let _ = hazards.report(owned(2), &cell, beat(5), beat(0), &grid);
        assert_eq!(hazards.danger_at(cell[0]), Some(beat(3)));

        assert_eq!(hazards.begin_beat(beat(2)), 0);
        assert_eq!(hazards.danger_at(cell[0]), Some(beat(3)));

        assert_eq!(hazards.begin_beat(beat(3)), 1);
        assert_eq!(hazards.danger_at(cell[0]), Some(beat(5)));

        assert_eq!(hazards.begin_beat(beat(5)), 1);
        assert_eq!(hazards.danger_at(cell[0]), None);
    }

    #[test]
    fn withdraw_removes_only_the_named_source() {
        let grid = grid();
        let mut hazards = HazardAggregator::new();
        let _ = hazards.report(owned(1), &[CellCoord::new(0, 1)], beat(2), beat(0), &grid);
        let _ = hazards.report(owned(2), &[CellCoord::new(0, 2)], beat(2), beat(0), &grid);
        hazards.withdraw(owned(1));
        assert_eq!(hazards.records_for(owned(1)).count(), 0);
        assert_eq!(hazards.records_for(owned(2)).count(), 1);
        assert_eq!(hazards.danger_map().len(), 1);
    }
}
