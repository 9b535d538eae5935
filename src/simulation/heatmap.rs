use std::time::Instant;

use rayon::prelude::*;
use tracing::{info, warn};

use crate::simulation::statistics::{HeatmapStatistics, compute_statistics};
use crate::simulation::{RiskModel, SimulationError};
use crate::spatial::Map;

/// A cell whose score could not be computed.
#[derive(Debug, Clone, PartialEq)]
pub struct CellFailure {
    pub i: usize,
    pub j: usize,
    pub error: SimulationError,
}

/// Need-for-action scores over a `grid_size × grid_size` grid.
///
/// `scores[i][j]` is the score of cell `(i, j)`; `None` for failed or
/// no-data cells.
#[derive(Debug, Clone)]
pub struct Heatmap {
    pub grid_size: usize,
    pub scores: Vec<Vec<Option<f64>>>,
    pub failures: Vec<CellFailure>,
    pub no_data_cells: usize,
}

impl Heatmap {
    pub fn get(&self, i: usize, j: usize) -> Option<f64> {
        self.scores.get(i).and_then(|row| row.get(j)).copied().flatten()
    }

    pub fn cell_count(&self) -> usize {
        self.grid_size * self.grid_size
    }
}

/// Result of a full heatmap computation.
#[derive(Debug)]
pub struct HeatmapResult {
    pub heatmap: Heatmap,
    pub statistics: HeatmapStatistics,
}

enum CellOutcome {
    Score(f64),
    NoData,
    Failed(SimulationError),
}

/// Evaluate every cell of the grid in parallel.
///
/// Rows are split across rayon workers; each cell runs on its own
/// simulation. Per-cell failures are collected and do not stop the run.
pub fn compute_heatmap(model: &RiskModel, map: &Map, grid_size: usize) -> HeatmapResult {
    let start = Instant::now();

    let rows: Vec<Vec<CellOutcome>> = (0..grid_size)
        .into_par_iter()
        .map(|i| {
            (0..grid_size)
                .map(|j| {
                    let location = map.cell_location(i, j, grid_size);
                    match model.score_at(location, map) {
                        Ok(Some(score)) => CellOutcome::Score(score),
                        Ok(None) => CellOutcome::NoData,
                        Err(e) => CellOutcome::Failed(e),
                    }
                })
                .collect()
        })
        .collect();

    let mut scores = Vec::with_capacity(grid_size);
    let mut failures = Vec::new();
    let mut no_data_cells = 0;
    for (i, row) in rows.into_iter().enumerate() {
        let mut score_row = Vec::with_capacity(grid_size);
        for (j, outcome) in row.into_iter().enumerate() {
            match outcome {
                CellOutcome::Score(score) => score_row.push(Some(score)),
                CellOutcome::NoData => {
                    no_data_cells += 1;
                    score_row.push(None);
                }
                CellOutcome::Failed(error) => {
                    failures.push(CellFailure { i, j, error });
                    score_row.push(None);
                }
            }
        }
        scores.push(score_row);
    }

    let heatmap = Heatmap {
        grid_size,
        scores,
        failures,
        no_data_cells,
    };

    if no_data_cells > 0 {
        warn!(no_data_cells, "Map has no data for some cells");
    }

    // Cascade detection: >10% cell failures
    let total_cells = heatmap.cell_count();
    let error_count = heatmap.failures.len();
    if total_cells > 0 && error_count > total_cells / 10 {
        warn!(
            error_count,
            total_cells,
            pct = (error_count as f64 / total_cells as f64) * 100.0,
            "Heatmap failure cascade detected"
        );
        if let Some(first) = heatmap.failures.first() {
            warn!(
                i = first.i,
                j = first.j,
                error = %first.error,
                "First error detail"
            );
        }
    }

    let duration_ms = start.elapsed().as_secs_f32() * 1000.0;
    let statistics = compute_statistics(&heatmap, model.categorizer(), duration_ms);
    info!(
        grid_size,
        scored = statistics.scored_cells,
        failed = statistics.failed_cells,
        duration_ms,
        "Heatmap computed"
    );

    HeatmapResult {
        heatmap,
        statistics,
    }
}
