use std::collections::HashMap;

use tracing::{debug, warn};

use crate::config::fuzzy::FuzzyConfig;
use crate::fuzzy::rule::{Rule, TermName, TermRef, parse_expression, parse_term_name};
use crate::fuzzy::variable::{FuzzyVariable, Role, TermId, Universe};

/// Errors raised while binding inputs or running inference.
#[derive(Debug, Clone, PartialEq)]
pub enum InferenceError {
    UnknownVariable(String),
    NotAnAntecedent(String),
    NotAConsequent(String),
    NonFiniteInput { variable: String, value: f64 },
    /// Recorded as a notice when an input is clamped; never returned.
    OutOfRangeInput { variable: String, value: f64, clamped: f64 },
    MissingInput(String),
    AlreadyComputed,
    NotComputed,
    /// Every rule for this consequent fired at strength 0, so the centroid is undefined.
    NoRuleFired { variable: String },
}

impl std::fmt::Display for InferenceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InferenceError::UnknownVariable(name) => write!(f, "Unknown variable '{}'", name),
            InferenceError::NotAnAntecedent(name) => {
                write!(f, "Variable '{}' is not an antecedent", name)
            }
            InferenceError::NotAConsequent(name) => {
                write!(f, "Variable '{}' is not a consequent", name)
            }
            InferenceError::NonFiniteInput { variable, value } => {
                write!(f, "Input for '{}' is not finite: {}", variable, value)
            }
            InferenceError::OutOfRangeInput {
                variable,
                value,
                clamped,
            } => write!(
                f,
                "Input for '{}' outside universe: {} clamped to {}",
                variable, value, clamped
            ),
            InferenceError::MissingInput(name) => write!(f, "No input bound for '{}'", name),
            InferenceError::AlreadyComputed => write!(f, "Simulation has already been computed"),
            InferenceError::NotComputed => write!(f, "Simulation has not been computed"),
            InferenceError::NoRuleFired { variable } => {
                write!(f, "No rule fired for '{}'; output is undefined", variable)
            }
        }
    }
}

impl std::error::Error for InferenceError {}

/// Consequent term memberships sampled once over the universe.
#[derive(Debug, Clone)]
struct SampledConsequent {
    variable: usize,
    points: Vec<f64>,
    /// `memberships[term][i]` is the degree of `points[i]` in that term.
    memberships: Vec<Vec<f64>>,
    rules: Vec<usize>,
}

/// Immutable Mamdani inference system built from a [`FuzzyConfig`].
///
/// Shared read-only across threads; each query creates its own
/// [`Simulation`] with [`FuzzySystem::simulation`].
#[derive(Debug, Clone)]
pub struct FuzzySystem {
    variables: Vec<FuzzyVariable>,
    index: HashMap<String, usize>,
    rules: Vec<Rule>,
    consequents: Vec<SampledConsequent>,
}

impl FuzzySystem {
    /// Build and check a system. All configuration problems are reported
    /// together, one per line.
    pub fn from_config(config: &FuzzyConfig) -> Result<Self, String> {
        config.validate()?;

        let mut variables = Vec::with_capacity(config.variables.len());
        let mut index = HashMap::new();
        let mut errors = Vec::new();

        for var_config in &config.variables {
            let universe = Universe::new(var_config.min, var_config.max, var_config.step)?;
            let mut variable = FuzzyVariable::new(&var_config.name, var_config.role, universe);
            for term in &var_config.terms {
                if let Err(e) = variable.add_term(&term.name, term.label.clone(), term.shape.clone())
                {
                    errors.push(e);
                }
            }
            index.insert(variable.name.clone(), variables.len());
            variables.push(variable);
        }

        let mut rules = Vec::with_capacity(config.rules.len());
        for (i, rule_config) in config.rules.iter().enumerate() {
            let rule_name = rule_config
                .name
                .clone()
                .unwrap_or_else(|| format!("#{}", i + 1));

            let antecedent = parse_expression(&rule_config.when)
                .map_err(|e| format!("rule {} 'when': {}", rule_name, e))
                .and_then(|expr| {
                    expr.try_map(&mut |name: TermName| {
                        resolve(&variables, &index, &name, Role::Antecedent)
                            .map_err(|e| format!("rule {} 'when': {}", rule_name, e))
                    })
                });
            let consequent = parse_term_name(&rule_config.then)
                .map_err(|e| format!("rule {} 'then': {}", rule_name, e))
                .and_then(|name| {
                    resolve(&variables, &index, &name, Role::Consequent)
                        .map_err(|e| format!("rule {} 'then': {}", rule_name, e))
                });

            match (antecedent, consequent) {
                (Ok(antecedent), Ok(consequent)) => rules.push(Rule {
                    name: rule_config.name.clone(),
                    antecedent,
                    consequent,
                }),
                (antecedent, consequent) => {
                    errors.extend(antecedent.err());
                    errors.extend(consequent.err());
                }
            }
        }

        let mut consequents = Vec::new();
        for (var_index, variable) in variables.iter().enumerate() {
            if variable.role != Role::Consequent {
                continue;
            }
            let targeting: Vec<usize> = rules
                .iter()
                .enumerate()
                .filter(|(_, r)| r.consequent.variable == var_index)
                .map(|(i, _)| i)
                .collect();
            if targeting.is_empty() {
                errors.push(format!(
                    "consequent '{}' is not the target of any rule",
                    variable.name
                ));
                continue;
            }
            let points = variable.universe.points();
            let memberships = variable
                .terms()
                .iter()
                .map(|t| points.iter().map(|&x| t.function.evaluate(x)).collect())
                .collect();
            consequents.push(SampledConsequent {
                variable: var_index,
                points,
                memberships,
                rules: targeting,
            });
        }

        if !errors.is_empty() {
            return Err(errors.join("\n"));
        }

        for (var_index, variable) in variables.iter().enumerate() {
            if variable.role != Role::Antecedent {
                continue;
            }
            let used = rules.iter().any(|r| {
                r.antecedent
                    .leaves()
                    .iter()
                    .any(|leaf| leaf.variable == var_index)
            });
            if !used {
                warn!(variable = %variable.name, "Antecedent is not used by any rule");
            }
        }

        debug!(
            variables = variables.len(),
            rules = rules.len(),
            "Fuzzy system built"
        );

        Ok(FuzzySystem {
            variables,
            index,
            rules,
            consequents,
        })
    }

    pub fn variables(&self) -> &[FuzzyVariable] {
        &self.variables
    }

    pub fn variable(&self, name: &str) -> Option<&FuzzyVariable> {
        self.index.get(name).map(|&i| &self.variables[i])
    }

    pub fn antecedents(&self) -> impl Iterator<Item = &FuzzyVariable> {
        self.variables
            .iter()
            .filter(|v| v.role == Role::Antecedent)
    }

    pub fn consequents(&self) -> impl Iterator<Item = &FuzzyVariable> {
        self.variables
            .iter()
            .filter(|v| v.role == Role::Consequent)
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// A fresh per-query inference context.
    pub fn simulation(&self) -> Simulation<'_> {
        Simulation {
            system: self,
            inputs: vec![None; self.variables.len()],
            outputs: None,
            notices: Vec::new(),
        }
    }

    fn degree(&self, inputs: &[Option<f64>], leaf: &TermRef) -> f64 {
        match inputs[leaf.variable] {
            Some(x) => self.variables[leaf.variable].degree(leaf.term, x),
            None => 0.0,
        }
    }
}

fn resolve(
    variables: &[FuzzyVariable],
    index: &HashMap<String, usize>,
    name: &TermName,
    expected: Role,
) -> Result<TermRef, String> {
    let &var_index = index
        .get(&name.variable)
        .ok_or_else(|| format!("unknown variable '{}'", name.variable))?;
    let variable = &variables[var_index];
    if variable.role != expected {
        return Err(format!(
            "'{}' is declared as {}, expected {}",
            name.variable, variable.role, expected
        ));
    }
    let term: TermId = variable
        .term_id(&name.term)
        .ok_or_else(|| format!("variable '{}' has no term '{}'", name.variable, name.term))?;
    Ok(TermRef {
        variable: var_index,
        term,
    })
}

/// Lifecycle of a [`Simulation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationState {
    Idle,
    InputsBound,
    Computed,
}

/// Per-query inference context: bind every antecedent, compute once, read outputs.
#[derive(Debug)]
pub struct Simulation<'a> {
    system: &'a FuzzySystem,
    inputs: Vec<Option<f64>>,
    outputs: Option<Vec<Option<f64>>>,
    notices: Vec<InferenceError>,
}

impl<'a> Simulation<'a> {
    pub fn state(&self) -> SimulationState {
        if self.outputs.is_some() {
            return SimulationState::Computed;
        }
        let all_bound = self
            .system
            .variables
            .iter()
            .zip(&self.inputs)
            .all(|(v, input)| v.role != Role::Antecedent || input.is_some());
        if all_bound {
            SimulationState::InputsBound
        } else {
            SimulationState::Idle
        }
    }

    /// Bind `value` to antecedent `name`. Values outside the universe are
    /// clamped and recorded in [`Simulation::notices`].
    pub fn set_input(&mut self, name: &str, value: f64) -> Result<(), InferenceError> {
        if self.outputs.is_some() {
            return Err(InferenceError::AlreadyComputed);
        }
        let &var_index = self
            .system
            .index
            .get(name)
            .ok_or_else(|| InferenceError::UnknownVariable(name.to_string()))?;
        let variable = &self.system.variables[var_index];
        if variable.role != Role::Antecedent {
            return Err(InferenceError::NotAnAntecedent(name.to_string()));
        }
        if !value.is_finite() {
            return Err(InferenceError::NonFiniteInput {
                variable: name.to_string(),
                value,
            });
        }

        let clamped = variable.universe.clamp(value);
        if clamped != value {
            warn!(variable = %name, value, clamped, "Input outside universe, clamped");
            self.notices.push(InferenceError::OutOfRangeInput {
                variable: name.to_string(),
                value,
                clamped,
            });
        }
        self.inputs[var_index] = Some(clamped);
        Ok(())
    }

    /// Run max-min aggregation and centroid defuzzification for every consequent.
    ///
    /// Allowed once. On failure the simulation is still spent.
    pub fn compute(&mut self) -> Result<(), InferenceError> {
        if self.outputs.is_some() {
            return Err(InferenceError::AlreadyComputed);
        }
        if let Some(missing) = self
            .system
            .variables
            .iter()
            .zip(&self.inputs)
            .find(|(v, input)| v.role == Role::Antecedent && input.is_none())
        {
            return Err(InferenceError::MissingInput(missing.0.name.clone()));
        }

        let system = self.system;
        let inputs = &self.inputs;
        let degree = |leaf: &TermRef| system.degree(inputs, leaf);
        let strengths: Vec<f64> = system
            .rules
            .iter()
            .map(|r| r.firing_strength(&degree))
            .collect();

        let mut outputs = vec![None; system.variables.len()];
        let mut first_error = None;
        for consequent in &system.consequents {
            match defuzzify(system, consequent, &strengths) {
                Ok(value) => outputs[consequent.variable] = Some(value),
                Err(e) => {
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }
        self.outputs = Some(outputs);

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Crisp value of consequent `name`.
    pub fn output(&self, name: &str) -> Result<f64, InferenceError> {
        let &var_index = self
            .system
            .index
            .get(name)
            .ok_or_else(|| InferenceError::UnknownVariable(name.to_string()))?;
        if self.system.variables[var_index].role != Role::Consequent {
            return Err(InferenceError::NotAConsequent(name.to_string()));
        }
        let outputs = self.outputs.as_ref().ok_or(InferenceError::NotComputed)?;
        outputs[var_index].ok_or_else(|| InferenceError::NoRuleFired {
            variable: name.to_string(),
        })
    }

    /// Non-fatal conditions seen while binding inputs.
    pub fn notices(&self) -> &[InferenceError] {
        &self.notices
    }
}

fn defuzzify(
    system: &FuzzySystem,
    consequent: &SampledConsequent,
    strengths: &[f64],
) -> Result<f64, InferenceError> {
    let mut aggregate = vec![0.0_f64; consequent.points.len()];
    for &rule_index in &consequent.rules {
        let strength = strengths[rule_index];
        if strength <= 0.0 {
            continue;
        }
        let TermId(term) = system.rules[rule_index].consequent.term;
        for (agg, &mu) in aggregate.iter_mut().zip(&consequent.memberships[term]) {
            *agg = agg.max(strength.min(mu));
        }
    }

    let (weighted, total) = consequent
        .points
        .iter()
        .zip(&aggregate)
        .fold((0.0, 0.0), |(w, t), (&x, &mu)| (w + x * mu, t + mu));

    if total <= 0.0 {
        return Err(InferenceError::NoRuleFired {
            variable: system.variables[consequent.variable].name.clone(),
        });
    }
    Ok(weighted / total)
}

/// Structural view of a rule for display: `when -> then`.
pub fn describe_rule(system: &FuzzySystem, rule: &Rule) -> String {
    let name_of = |r: &TermRef| {
        let variable = &system.variables[r.variable];
        TermName {
            variable: variable.name.clone(),
            term: variable.term(r.term).name.clone(),
        }
    };
    format!("{} -> {}", rule.antecedent.map(&name_of), name_of(&rule.consequent))
}
