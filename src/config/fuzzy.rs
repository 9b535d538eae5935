use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::fuzzy::membership::MembershipFunction;
use crate::fuzzy::variable::{Role, Universe};

const NEED_FOR_ACTION_TOML: &str = include_str!("../../config/need_for_action.toml");
const GREEN_AREAS_TOML: &str = include_str!("../../config/green_areas.toml");

/// Variables, terms and rules of a fuzzy inference system, as data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuzzyConfig {
    #[serde(default)]
    pub variables: Vec<VariableConfig>,
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableConfig {
    pub name: String,
    pub role: Role,
    pub min: f64,
    /// Exclusive upper bound of the sampled universe.
    pub max: f64,
    #[serde(default = "default_step")]
    pub step: f64,
    #[serde(default)]
    pub terms: Vec<TermConfig>,
}

fn default_step() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermConfig {
    pub name: String,
    #[serde(default)]
    pub label: Option<String>,
    pub shape: MembershipFunction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleConfig {
    #[serde(default)]
    pub name: Option<String>,
    pub when: String,
    pub then: String,
}

impl FuzzyConfig {
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Cannot read {}: {}", path.display(), e))?;
        Self::from_toml_str(&content, path)
    }

    pub fn from_toml_str(content: &str, source_path: &Path) -> Result<Self, String> {
        let config: FuzzyConfig =
            toml::from_str(content).map_err(|e| format!("{}: {}", source_path.display(), e))?;
        config
            .validate()
            .map_err(|e| format!("{}:\n{}", source_path.display(), e))?;
        Ok(config)
    }

    /// Built-in need-for-action system: pollution in µg/m³, density in
    /// people/km², vegetation cover in %.
    pub fn need_for_action() -> Result<Self, String> {
        Self::from_toml_str(NEED_FOR_ACTION_TOML, Path::new("config/need_for_action.toml"))
    }

    /// Variant with density in inhabitants/ha and smooth term shapes.
    pub fn green_areas() -> Result<Self, String> {
        Self::from_toml_str(GREEN_AREAS_TOML, Path::new("config/green_areas.toml"))
    }

    /// Structural checks on variables and terms. Rule expressions are
    /// resolved when the system is built.
    pub fn validate(&self) -> Result<(), String> {
        let mut errors = Vec::new();

        let mut names = HashSet::new();
        for var in &self.variables {
            if var.name.is_empty() {
                errors.push("variable name must not be empty. Example: name = \"air_pollution\"".to_string());
            }
            if !names.insert(var.name.as_str()) {
                errors.push(format!("variable '{}' is defined more than once", var.name));
            }
            if let Err(e) = Universe::new(var.min, var.max, var.step) {
                errors.push(format!("variable '{}': {}", var.name, e));
            }
            if var.terms.is_empty() {
                errors.push(format!(
                    "variable '{}' must define at least one term. Example: [[variables.terms]] name = \"low\"",
                    var.name
                ));
            }

            let mut term_names = HashSet::new();
            for term in &var.terms {
                if !term_names.insert(term.name.as_str()) {
                    errors.push(format!(
                        "variable '{}' defines term '{}' more than once",
                        var.name, term.name
                    ));
                }
                if let Err(e) = term.shape.validate() {
                    errors.push(format!("term '{}[{}]': {}", var.name, term.name, e));
                }
            }
        }

        let count = |role: Role| self.variables.iter().filter(|v| v.role == role).count();
        if count(Role::Antecedent) == 0 {
            errors.push("at least one variable must have role = \"antecedent\"".to_string());
        }
        if count(Role::Consequent) == 0 {
            errors.push("at least one variable must have role = \"consequent\"".to_string());
        }
        if self.rules.is_empty() {
            errors.push("at least one [[rules]] entry is required. Example: when = \"air_pollution[good]\", then = \"need_for_action[low]\"".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors.join("\n"))
        }
    }
}
