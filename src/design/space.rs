//! The factor/level universe that fixes the feature column layout.

use serde::{Deserialize, Serialize};

use crate::types::{COLOR, RESPONSE_TRANSITION, WORD};

/// Which level of a factor is dropped from the one-hot encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceLevel {
    /// The first declared level is the reference; a missing value is an error.
    First,
    /// A missing value is the reference; every declared level gets a column.
    Missing,
}

/// A categorical factor with a fixed, ordered set of levels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Factor {
    /// Factor name, matched against [`crate::types::FactorLevels::level`].
    pub name: String,
    /// Levels in canonical order.
    pub levels: Vec<String>,
    /// Reference-level rule.
    pub reference: ReferenceLevel,
}

impl Factor {
    /// Factor whose first level is the reference.
    pub fn new<S: Into<String>>(name: impl Into<String>, levels: impl IntoIterator<Item = S>) -> Self {
        Self {
            name: name.into(),
            levels: levels.into_iter().map(Into::into).collect(),
            reference: ReferenceLevel::First,
        }
    }

    /// Factor whose reference is "no value" (e.g. a transition on the first trial).
    pub fn with_missing_reference<S: Into<String>>(
        name: impl Into<String>,
        levels: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            reference: ReferenceLevel::Missing,
            ..Self::new(name, levels)
        }
    }

    /// Levels that get a feature column, in column order.
    pub fn encoded_levels(&self) -> &[String] {
        match self.reference {
            ReferenceLevel::First => self.levels.get(1..).unwrap_or(&[]),
            ReferenceLevel::Missing => &self.levels,
        }
    }

    /// Position of `level` among the declared levels.
    pub fn position(&self, level: &str) -> Option<usize> {
        self.levels.iter().position(|l| l == level)
    }
}

/// Ordered collection of factors.
///
/// The column layout is derived from this declaration alone, never from which
/// levels happen to appear in a batch, so coefficients keep their meaning from
/// round to round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesignSpace {
    factors: Vec<Factor>,
}

impl DesignSpace {
    /// Build a design space from factors in column order.
    ///
    /// # Panics
    ///
    /// Panics if two factors share a name, a factor repeats a level, or a
    /// factor has no levels.
    pub fn new(factors: Vec<Factor>) -> Self {
        for (i, factor) in factors.iter().enumerate() {
            assert!(!factor.levels.is_empty(), "factor '{}' has no levels", factor.name);
            assert!(
                factors[..i].iter().all(|f| f.name != factor.name),
                "duplicate factor '{}'",
                factor.name
            );
            for (j, level) in factor.levels.iter().enumerate() {
                assert!(
                    !factor.levels[..j].contains(level),
                    "factor '{}' repeats level '{}'",
                    factor.name,
                    level
                );
            }
        }
        Self { factors }
    }

    /// The two-color Stroop design: word x color x response transition.
    ///
    /// Levels are listed alphabetically so the dropped reference matches a
    /// dummy encoding with `drop_first`. The first trial of a sequence has no
    /// response transition; that missing value is the transition reference.
    pub fn stroop() -> Self {
        Self::new(vec![
            Factor::new(WORD, ["green", "red"]),
            Factor::new(COLOR, ["green", "red"]),
            Factor::with_missing_reference(RESPONSE_TRANSITION, ["repeat", "switch"]),
        ])
    }

    /// Factors in column order.
    pub fn factors(&self) -> &[Factor] {
        &self.factors
    }

    /// Look up a factor by name.
    pub fn factor(&self, name: &str) -> Option<&Factor> {
        self.factors.iter().find(|f| f.name == name)
    }

    /// Column names (`factor_level`) in column order.
    pub fn column_names(&self) -> Vec<String> {
        self.factors
            .iter()
            .flat_map(|f| {
                f.encoded_levels()
                    .iter()
                    .map(move |level| format!("{}_{}", f.name, level))
            })
            .collect()
    }

    /// Number of feature columns.
    pub fn n_columns(&self) -> usize {
        self.factors.iter().map(|f| f.encoded_levels().len()).sum()
    }
}

impl Default for DesignSpace {
    fn default() -> Self {
        Self::stroop()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stroop_columns() {
        let space = DesignSpace::stroop();
        assert_eq!(
            space.column_names(),
            vec![
                "word_red",
                "color_red",
                "response_transition_repeat",
                "response_transition_switch"
            ]
        );
        assert_eq!(space.n_columns(), 4);
    }

    #[test]
    fn test_single_level_factor_has_no_columns() {
        let factor = Factor::new("block", ["only"]);
        assert!(factor.encoded_levels().is_empty());
    }

    #[test]
    #[should_panic(expected = "duplicate factor 'word'")]
    fn test_duplicate_factor_panics() {
        DesignSpace::new(vec![
            Factor::new("word", ["a", "b"]),
            Factor::new("word", ["c", "d"]),
        ]);
    }

    #[test]
    #[should_panic(expected = "repeats level 'a'")]
    fn test_duplicate_level_panics() {
        DesignSpace::new(vec![Factor::new("word", ["a", "a"])]);
    }
}
