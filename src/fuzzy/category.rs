use serde::{Deserialize, Serialize};

use crate::fuzzy::variable::UNDEFINED_LABEL;

/// A score band: every score `<= upper` not claimed by an earlier band.
/// `upper = None` is the catch-all and must come last.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    #[serde(default)]
    pub upper: Option<f64>,
    pub label: String,
}

impl Category {
    pub fn new(upper: Option<f64>, label: impl Into<String>) -> Self {
        Category {
            upper,
            label: label.into(),
        }
    }
}

/// Maps crisp scores to labels through ordered thresholds.
#[derive(Debug, Clone, PartialEq)]
pub struct Categorizer {
    categories: Vec<Category>,
}

pub fn default_categories() -> Vec<Category> {
    vec![
        Category::new(Some(40.0), "Low"),
        Category::new(Some(70.0), "Medium"),
        Category::new(None, "High"),
    ]
}

impl Default for Categorizer {
    fn default() -> Self {
        Categorizer {
            categories: default_categories(),
        }
    }
}

impl Categorizer {
    pub fn new(categories: Vec<Category>) -> Result<Self, String> {
        validate_categories(&categories)?;
        Ok(Categorizer { categories })
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// Label for `score`. Scores past the last bound with no catch-all, and
    /// `NaN`, are `"Undefined"`.
    pub fn categorize(&self, score: f64) -> &str {
        if score.is_nan() {
            return UNDEFINED_LABEL;
        }
        self.categories
            .iter()
            .find(|c| c.upper.is_none_or(|upper| score <= upper))
            .map(|c| c.label.as_str())
            .unwrap_or(UNDEFINED_LABEL)
    }
}

pub fn validate_categories(categories: &[Category]) -> Result<(), String> {
    let mut errors = Vec::new();

    if categories.is_empty() {
        errors.push(
            "categories must not be empty. Example: [[categories]] upper = 40.0, label = \"Low\""
                .to_string(),
        );
    }

    let mut previous: Option<f64> = None;
    for (i, category) in categories.iter().enumerate() {
        if category.label.is_empty() {
            errors.push(format!("categories[{}].label must not be empty", i));
        }
        match category.upper {
            None if i + 1 != categories.len() => errors.push(format!(
                "categories[{}] ('{}') omits upper but is not the last entry",
                i, category.label
            )),
            None => {}
            Some(upper) if !upper.is_finite() => errors.push(format!(
                "categories[{}].upper must be finite, got {}",
                i, upper
            )),
            Some(upper) => {
                if let Some(prev) = previous {
                    if upper <= prev {
                        errors.push(format!(
                            "categories[{}].upper must be greater than {}, got {}",
                            i, prev, upper
                        ));
                    }
                }
                previous = Some(upper);
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_thresholds() {
        let c = Categorizer::default();
        assert_eq!(c.categorize(0.0), "Low");
        assert_eq!(c.categorize(40.0), "Low");
        assert_eq!(c.categorize(40.01), "Medium");
        assert_eq!(c.categorize(70.0), "Medium");
        assert_eq!(c.categorize(70.5), "High");
        assert_eq!(c.categorize(1000.0), "High");
        assert_eq!(c.categorize(f64::NAN), UNDEFINED_LABEL);
    }

    #[test]
    fn custom_thresholds_without_catch_all() {
        let c = Categorizer::new(vec![
            Category::new(Some(25.0), "Minor"),
            Category::new(Some(100.0), "Major"),
        ])
        .unwrap();
        assert_eq!(c.categorize(10.0), "Minor");
        assert_eq!(c.categorize(99.0), "Major");
        assert_eq!(c.categorize(101.0), UNDEFINED_LABEL);
    }

    #[test]
    fn non_increasing_bounds_rejected() {
        let err = Categorizer::new(vec![
            Category::new(Some(50.0), "A"),
            Category::new(Some(50.0), "B"),
        ])
        .unwrap_err();
        assert!(err.contains("categories[1].upper"), "Error: {}", err);
    }

    #[test]
    fn catch_all_must_be_last() {
        let err = Categorizer::new(vec![
            Category::new(None, "Any"),
            Category::new(Some(10.0), "Small"),
        ])
        .unwrap_err();
        assert!(err.contains("not the last entry"), "Error: {}", err);
    }

    #[test]
    fn empty_rejected() {
        assert!(Categorizer::new(Vec::new()).is_err());
    }
}
