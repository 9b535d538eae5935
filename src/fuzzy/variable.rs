use serde::{Deserialize, Serialize};

use crate::fuzzy::membership::MembershipFunction;

/// Label returned when no term describes a value.
pub const UNDEFINED_LABEL: &str = "Undefined";

/// Whether a variable feeds rules or is produced by them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Antecedent,
    Consequent,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Antecedent => write!(f, "antecedent"),
            Role::Consequent => write!(f, "consequent"),
        }
    }
}

/// Upper limit on the number of sample points in one universe.
pub const MAX_UNIVERSE_SAMPLES: usize = 1_000_000;

/// Half-open numeric range `[min, max)` sampled every `step`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Universe {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

impl Universe {
    pub fn new(min: f64, max: f64, step: f64) -> Result<Self, String> {
        if !min.is_finite() || !max.is_finite() || !step.is_finite() {
            return Err(format!(
                "universe bounds must be finite, got min={}, max={}, step={}",
                min, max, step
            ));
        }
        if min >= max {
            return Err(format!(
                "universe min must be < max, got min={}, max={}. Example: min = 0.0, max = 101.0",
                min, max
            ));
        }
        if step <= 0.0 {
            return Err(format!(
                "universe step must be > 0, got {}. Example: step = 1.0",
                step
            ));
        }
        let samples = ((max - min) / step).ceil();
        if !(samples <= MAX_UNIVERSE_SAMPLES as f64) {
            return Err(format!(
                "universe has {} sample points, at most {} allowed; increase step. Example: min = 0.0, max = 20001.0, step = 1.0",
                samples, MAX_UNIVERSE_SAMPLES
            ));
        }
        Ok(Universe { min, max, step })
    }

    /// Sample points `min, min + step, ...` strictly below `max`.
    pub fn points(&self) -> Vec<f64> {
        (0..self.sample_count())
            .map(|i| self.min + i as f64 * self.step)
            .filter(|&x| x < self.max)
            .collect()
    }

    /// Largest sample point.
    pub fn last_point(&self) -> f64 {
        let mut i = self.sample_count().saturating_sub(1);
        let mut last = self.min + i as f64 * self.step;
        while i > 0 && last >= self.max {
            i -= 1;
            last = self.min + i as f64 * self.step;
        }
        last
    }

    fn sample_count(&self) -> usize {
        ((self.max - self.min) / self.step).ceil() as usize
    }

    /// Clamp `x` onto the sampled span `[min, last_point]`.
    pub fn clamp(&self, x: f64) -> f64 {
        x.clamp(self.min, self.last_point())
    }

    /// Whether `x` lies in the closed range `[min, max]` used for labelling.
    pub fn contains(&self, x: f64) -> bool {
        x >= self.min && x <= self.max
    }
}

/// Index of a term inside its variable, resolved once when rules are loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TermId(pub usize);

#[derive(Debug, Clone, PartialEq)]
pub struct Term {
    pub name: String,
    pub label: String,
    pub function: MembershipFunction,
}

/// A linguistic variable: a universe and its ordered, named fuzzy sets.
#[derive(Debug, Clone)]
pub struct FuzzyVariable {
    pub name: String,
    pub role: Role,
    pub universe: Universe,
    terms: Vec<Term>,
}

impl FuzzyVariable {
    pub fn new(name: impl Into<String>, role: Role, universe: Universe) -> Self {
        FuzzyVariable {
            name: name.into(),
            role,
            universe,
            terms: Vec::new(),
        }
    }

    /// Append a term. Terms keep insertion order, which also breaks label ties.
    pub fn add_term(
        &mut self,
        name: impl Into<String>,
        label: Option<String>,
        function: MembershipFunction,
    ) -> Result<TermId, String> {
        let name = name.into();
        if self.term_id(&name).is_some() {
            return Err(format!(
                "variable '{}' defines term '{}' more than once",
                self.name, name
            ));
        }
        function
            .validate()
            .map_err(|e| format!("term '{}[{}]': {}", self.name, name, e))?;
        let label = label.unwrap_or_else(|| title_case(&name));
        self.terms.push(Term { name, label, function });
        Ok(TermId(self.terms.len() - 1))
    }

    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    pub fn term(&self, id: TermId) -> &Term {
        &self.terms[id.0]
    }

    pub fn term_id(&self, name: &str) -> Option<TermId> {
        self.terms.iter().position(|t| t.name == name).map(TermId)
    }

    /// Membership of `x` in the named term, or `None` for an unknown term.
    pub fn degree_of(&self, term: &str, x: f64) -> Option<f64> {
        self.term_id(term).map(|id| self.degree(id, x))
    }

    pub fn degree(&self, id: TermId, x: f64) -> f64 {
        self.terms[id.0].function.evaluate(x)
    }

    /// The term with the highest degree at `x`.
    ///
    /// `None` when `x` is outside `[min, max]` or every degree is 0.
    /// Exact ties go to the earliest term.
    pub fn dominant_term(&self, x: f64) -> Option<&Term> {
        if !self.universe.contains(x) {
            return None;
        }
        let mut best: Option<(&Term, f64)> = None;
        for term in &self.terms {
            let degree = term.function.evaluate(x);
            match best {
                Some((_, top)) if degree <= top => {}
                _ => best = Some((term, degree)),
            }
        }
        best.filter(|&(_, degree)| degree > 0.0).map(|(term, _)| term)
    }

    /// Name of the dominant term at `x`, or `"Undefined"`.
    pub fn dominant_label(&self, x: f64) -> &str {
        self.dominant_term(x)
            .map(|t| t.name.as_str())
            .unwrap_or(UNDEFINED_LABEL)
    }

    /// Display label of the dominant term at `x`, or `"Undefined"`.
    pub fn display_label(&self, x: f64) -> &str {
        self.dominant_term(x)
            .map(|t| t.label.as_str())
            .unwrap_or(UNDEFINED_LABEL)
    }
}

/// `"very_low"` → `"Very Low"`.
pub fn title_case(name: &str) -> String {
    name.split(['_', ' '])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
