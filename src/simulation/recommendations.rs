use serde::Serialize;

/// Display labels of one assessed location.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssessmentLabels {
    pub air_pollution: String,
    pub population_density: String,
    pub vegetation_cover: String,
    pub need_for_action: String,
}

/// Standing recommendations for a score category.
pub fn recommendations_for(category: &str) -> &'static [&'static str] {
    match category {
        "Low" => &[
            "Maintain current environmental practices.",
            "Promote green spaces to sustain the low risk level.",
        ],
        "Medium" => &[
            "Increase urban green spaces (parks, trees).",
            "Implement policies to reduce air pollution sources.",
            "Encourage green roofs and vertical gardens.",
        ],
        "High" => &[
            "Urgent need to expand vegetation cover.",
            "Reduce building density where possible.",
            "Implement strict air pollution control measures.",
            "Encourage use of public transportation.",
        ],
        _ => &["No recommendations available."],
    }
}

fn is_sparse_vegetation(label: &str) -> bool {
    matches!(label, "Low" | "Very Low")
}

/// Advice driven by the need-for-action label, refined by the other three.
pub fn recommendation(labels: &AssessmentLabels) -> &'static str {
    match labels.need_for_action.as_str() {
        "High" if is_sparse_vegetation(&labels.vegetation_cover) => {
            "Need for action is high and vegetation cover is low. \
             Consider creating more green areas (planting trees, building parks) \
             to improve air quality and reduce heat islands."
        }
        "High" => {
            "Need for action is high. Vegetation cover is already moderate or high. \
             Focus on reducing pollution sources: implement traffic calming measures, \
             promote public transport, limit industrial emissions, or encourage cleaner technologies."
        }
        "Medium"
            if matches!(labels.air_pollution.as_str(), "Moderate" | "Unhealthy")
                && matches!(
                    labels.population_density.as_str(),
                    "High" | "Very High" | "Highest"
                ) =>
        {
            "Need for action is medium, and conditions suggest moderate pollution in a dense area. \
             Implement partial traffic restrictions, promote cycling and walking, or encourage telecommuting. \
             Increase green infrastructure moderately."
        }
        "Medium" if is_sparse_vegetation(&labels.vegetation_cover) => {
            "Need for action is moderate, and vegetation cover is low. \
             Consider adding more vegetation (green roofs, community gardens) \
             to improve local environmental quality."
        }
        "Medium" => {
            "Need for action is medium. Conditions are not severe, but consider incremental improvements: \
             encourage cleaner transport, add some green areas, and monitor pollution sources closely."
        }
        _ => {
            "Need for action is low. Current environmental strategies seem effective. \
             Maintain your approaches, continue monitoring air quality and population density, \
             and preserve or slightly enhance green spaces as needed."
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(ap: &str, pd: &str, vc: &str, nfa: &str) -> AssessmentLabels {
        AssessmentLabels {
            air_pollution: ap.to_string(),
            population_density: pd.to_string(),
            vegetation_cover: vc.to_string(),
            need_for_action: nfa.to_string(),
        }
    }

    #[test]
    fn category_lists() {
        assert_eq!(recommendations_for("Low").len(), 2);
        assert_eq!(recommendations_for("Medium").len(), 3);
        assert_eq!(recommendations_for("High").len(), 4);
        assert_eq!(recommendations_for("Undefined"), &["No recommendations available."]);
    }

    #[test]
    fn high_need_with_sparse_vegetation_asks_for_green_areas() {
        let text = recommendation(&labels("Unhealthy", "Very High", "Low", "High"));
        assert!(text.contains("creating more green areas"));
    }

    #[test]
    fn high_need_with_vegetation_targets_pollution() {
        let text = recommendation(&labels("Unhealthy", "Very High", "High", "High"));
        assert!(text.contains("reducing pollution sources"));
    }

    #[test]
    fn medium_need_in_dense_polluted_area() {
        let text = recommendation(&labels("Moderate", "Highest", "Low", "Medium"));
        assert!(text.contains("partial traffic restrictions"));
    }

    #[test]
    fn medium_need_with_sparse_vegetation() {
        let text = recommendation(&labels("Good", "Low", "Low", "Medium"));
        assert!(text.contains("adding more vegetation"));
    }

    #[test]
    fn medium_need_otherwise_incremental() {
        let text = recommendation(&labels("Good", "Low", "Medium", "Medium"));
        assert!(text.contains("incremental improvements"));
    }

    #[test]
    fn low_or_undefined_need_maintains() {
        assert!(recommendation(&labels("Good", "Low", "High", "Low")).contains("seem effective"));
        assert!(
            recommendation(&labels("Good", "Low", "High", "Undefined")).contains("seem effective")
        );
    }
}
