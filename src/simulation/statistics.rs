use std::collections::BTreeMap;

use serde::Serialize;

use crate::fuzzy::category::Categorizer;
use crate::simulation::heatmap::Heatmap;

/// Aggregate metrics for a computed heatmap.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatmapStatistics {
    pub cells: usize,
    pub scored_cells: usize,
    pub failed_cells: usize,
    pub no_data_cells: usize,
    pub mean_score: Option<f64>,
    pub min_score: Option<f64>,
    pub max_score: Option<f64>,
    pub category_distribution: BTreeMap<String, u32>,
    pub duration_ms: f32,
}

/// Compute statistics over the scored cells of `heatmap`.
pub fn compute_statistics(
    heatmap: &Heatmap,
    categorizer: &Categorizer,
    duration_ms: f32,
) -> HeatmapStatistics {
    let mut distribution: BTreeMap<String, u32> = BTreeMap::new();
    let mut total = 0.0_f64;
    let mut scored = 0_usize;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;

    for score in heatmap.scores.iter().flatten().flatten().copied() {
        *distribution
            .entry(categorizer.categorize(score).to_string())
            .or_insert(0) += 1;
        total += score;
        scored += 1;
        min = min.min(score);
        max = max.max(score);
    }

    let (mean_score, min_score, max_score) = if scored == 0 {
        (None, None, None)
    } else {
        (Some(total / scored as f64), Some(min), Some(max))
    };

    HeatmapStatistics {
        cells: heatmap.cell_count(),
        scored_cells: scored,
        failed_cells: heatmap.failures.len(),
        no_data_cells: heatmap.no_data_cells,
        mean_score,
        min_score,
        max_score,
        category_distribution: distribution,
        duration_ms,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::SimulationError;
    use crate::simulation::heatmap::CellFailure;
    use crate::fuzzy::engine::InferenceError;

    fn make_heatmap(scores: Vec<Vec<Option<f64>>>) -> Heatmap {
        Heatmap {
            grid_size: scores.len(),
            scores,
            failures: Vec::new(),
            no_data_cells: 0,
        }
    }

    #[test]
    fn basic_aggregates() {
        let heatmap = make_heatmap(vec![vec![Some(10.0), Some(50.0)], vec![Some(90.0), Some(30.0)]]);
        let stats = compute_statistics(&heatmap, &Categorizer::default(), 12.0);

        assert_eq!(stats.cells, 4);
        assert_eq!(stats.scored_cells, 4);
        assert!((stats.mean_score.unwrap() - 45.0).abs() < 1e-12);
        assert_eq!(stats.min_score, Some(10.0));
        assert_eq!(stats.max_score, Some(90.0));
        assert!((stats.duration_ms - 12.0).abs() < 0.01);
    }

    #[test]
    fn category_distribution_counted() {
        let heatmap = make_heatmap(vec![vec![Some(10.0), Some(50.0)], vec![Some(90.0), Some(30.0)]]);
        let stats = compute_statistics(&heatmap, &Categorizer::default(), 1.0);

        assert_eq!(stats.category_distribution["Low"], 2);
        assert_eq!(stats.category_distribution["Medium"], 1);
        assert_eq!(stats.category_distribution["High"], 1);
    }

    #[test]
    fn missing_cells_are_skipped() {
        let mut heatmap = make_heatmap(vec![vec![Some(20.0), None], vec![None, Some(40.0)]]);
        heatmap.no_data_cells = 1;
        heatmap.failures.push(CellFailure {
            i: 1,
            j: 0,
            error: SimulationError::Inference(InferenceError::NoRuleFired {
                variable: "need_for_action".to_string(),
            }),
        });
        let stats = compute_statistics(&heatmap, &Categorizer::default(), 1.0);

        assert_eq!(stats.scored_cells, 2);
        assert_eq!(stats.failed_cells, 1);
        assert_eq!(stats.no_data_cells, 1);
        assert!((stats.mean_score.unwrap() - 30.0).abs() < 1e-12);
    }

    #[test]
    fn empty_heatmap_returns_no_aggregates() {
        let stats = compute_statistics(&make_heatmap(Vec::new()), &Categorizer::default(), 0.0);
        assert_eq!(stats.cells, 0);
        assert_eq!(stats.mean_score, None);
        assert!(stats.category_distribution.is_empty());
    }

    #[test]
    fn serializes_to_json() {
        let heatmap = make_heatmap(vec![vec![Some(10.0)]]);
        let stats = compute_statistics(&heatmap, &Categorizer::default(), 1.0);
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["scored_cells"], 1);
        assert_eq!(json["category_distribution"]["Low"], 1);
    }
}
