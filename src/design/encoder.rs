//! One-hot encoding of trials into a feature matrix and target vector.

use nalgebra::{DMatrix, DVector};

use crate::design::space::{DesignSpace, ReferenceLevel};
use crate::error::EncodingError;
use crate::types::{FactorLevels, FeatureMatrix, TargetVector, Trial};

/// Encodes trials against a fixed [`DesignSpace`].
///
/// Columns are laid out factor by factor in declaration order, one column per
/// non-reference level. Trial order and batch contents never change the layout.
#[derive(Debug, Clone)]
pub struct DesignEncoder {
    space: DesignSpace,
    strict_coverage: bool,
}

impl DesignEncoder {
    /// Encoder that requires every column to fire at least once in a training batch.
    pub fn new(space: DesignSpace) -> Self {
        Self {
            space,
            strict_coverage: true,
        }
    }

    /// Toggle the coverage requirement for training batches.
    pub fn strict_coverage(mut self, strict: bool) -> Self {
        self.strict_coverage = strict;
        self
    }

    /// The design space this encoder was built from.
    pub fn space(&self) -> &DesignSpace {
        &self.space
    }

    /// Number of feature columns.
    pub fn n_columns(&self) -> usize {
        self.space.n_columns()
    }

    /// Column names in column order.
    pub fn column_names(&self) -> Vec<String> {
        self.space.column_names()
    }

    /// Encode observed trials into `(X, y)` with `y` = reaction time.
    ///
    /// Fails on an empty batch, an unknown or missing level, an unobserved
    /// trial, or (with strict coverage) a column that is zero for every row.
    pub fn encode(&self, trials: &[Trial]) -> Result<(FeatureMatrix, TargetVector), EncodingError> {
        let x = self.encode_features(trials)?;

        if self.strict_coverage {
            let names = self.column_names();
            let missing: Vec<String> = (0..x.ncols())
                .filter(|&j| x.column(j).iter().all(|&v| v == 0.0))
                .map(|j| names[j].clone())
                .collect();
            if !missing.is_empty() {
                return Err(EncodingError::MissingColumns { columns: missing });
            }
        }

        let mut y = DVector::zeros(trials.len());
        for (i, trial) in trials.iter().enumerate() {
            let outcome = trial
                .outcome
                .as_ref()
                .ok_or(EncodingError::MissingOutcome { index: i })?;
            y[i] = outcome.reaction_time;
        }

        Ok((x, y))
    }

    /// Encode factor values only, without a target or coverage check.
    ///
    /// Used for scoring candidate conditions, which need the same column layout
    /// as training data but are not observed and rarely cover every level.
    pub fn encode_features<T: FactorLevels>(&self, rows: &[T]) -> Result<FeatureMatrix, EncodingError> {
        if rows.is_empty() {
            return Err(EncodingError::EmptyTrialSet);
        }

        let mut x = DMatrix::zeros(rows.len(), self.n_columns());
        for (i, row) in rows.iter().enumerate() {
            let mut offset = 0;
            for factor in self.space.factors() {
                let encoded = factor.encoded_levels();
                match (row.level(&factor.name), factor.reference) {
                    (Some(level), reference) => {
                        let pos = factor.position(level).ok_or_else(|| {
                            EncodingError::UnknownLevel {
                                factor: factor.name.clone(),
                                level: level.to_owned(),
                            }
                        })?;
                        let column = match reference {
                            ReferenceLevel::First => pos.checked_sub(1),
                            ReferenceLevel::Missing => Some(pos),
                        };
                        if let Some(c) = column {
                            x[(i, offset + c)] = 1.0;
                        }
                    }
                    (None, ReferenceLevel::Missing) => {}
                    (None, ReferenceLevel::First) => {
                        return Err(EncodingError::MissingLevel {
                            factor: factor.name.clone(),
                        });
                    }
                }
                offset += encoded.len();
            }
        }

        Ok(x)
    }
}

impl Default for DesignEncoder {
    fn default() -> Self {
        Self::new(DesignSpace::stroop())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::design::space::Factor;
    use crate::types::{Condition, Observation};

    fn observed(word: &str, color: &str, transition: Option<&str>, rt: f64) -> Trial {
        Trial::new(Condition::new(word, color, transition)).observed(Observation {
            reaction_time: rt,
            response: "f".into(),
        })
    }

    fn full_batch() -> Vec<Trial> {
        vec![
            observed("green", "green", None, 500.0),
            observed("red", "green", Some("repeat"), 640.0),
            observed("red", "red", Some("switch"), 580.0),
            observed("green", "red", Some("repeat"), 700.0),
        ]
    }

    #[test]
    fn test_encode_rows_and_target() {
        let encoder = DesignEncoder::default();
        let (x, y) = encoder.encode(&full_batch()).unwrap();

        assert_eq!(x.shape(), (4, 4));
        // word_red, color_red, transition_repeat, transition_switch
        assert_eq!(x.row(0).iter().copied().collect::<Vec<_>>(), vec![0.0, 0.0, 0.0, 0.0]);
        assert_eq!(x.row(1).iter().copied().collect::<Vec<_>>(), vec![1.0, 0.0, 1.0, 0.0]);
        assert_eq!(x.row(2).iter().copied().collect::<Vec<_>>(), vec![1.0, 1.0, 0.0, 1.0]);
        assert_eq!(x.row(3).iter().copied().collect::<Vec<_>>(), vec![0.0, 1.0, 1.0, 0.0]);
        assert_eq!(y.as_slice(), &[500.0, 640.0, 580.0, 700.0]);
    }

    #[test]
    fn test_empty_batch_fails() {
        let encoder = DesignEncoder::default();
        assert_eq!(encoder.encode(&[]).unwrap_err(), EncodingError::EmptyTrialSet);
    }

    #[test]
    fn test_unknown_level_fails() {
        let encoder = DesignEncoder::default();
        let trials = vec![observed("blue", "red", None, 500.0)];
        assert_eq!(
            encoder.encode_features(&trials).unwrap_err(),
            EncodingError::UnknownLevel {
                factor: "word".into(),
                level: "blue".into()
            }
        );
    }

    #[test]
    fn test_missing_first_reference_level_fails() {
        let space = DesignSpace::new(vec![Factor::new("word", ["green", "red"])]);
        let encoder = DesignEncoder::new(space);
        let rows = vec![Trial::new(Condition::new("red", "red", None)).with_extra("other", "x")];
        // "word" is present on the condition, so this succeeds
        assert!(encoder.encode_features(&rows).is_ok());

        let space = DesignSpace::new(vec![Factor::new("congruency", ["con", "inc"])]);
        let encoder = DesignEncoder::new(space);
        assert_eq!(
            encoder.encode_features(&rows).unwrap_err(),
            EncodingError::MissingLevel {
                factor: "congruency".into()
            }
        );
    }

    #[test]
    fn test_unobserved_trial_fails() {
        let encoder = DesignEncoder::default();
        let mut trials = full_batch();
        trials.push(Trial::new(Condition::new("red", "red", Some("repeat"))));
        assert_eq!(
            encoder.encode(&trials).unwrap_err(),
            EncodingError::MissingOutcome { index: 4 }
        );
    }

    #[test]
    fn test_strict_coverage_reports_missing_columns() {
        let encoder = DesignEncoder::default();
        let trials = vec![
            observed("green", "green", None, 500.0),
            observed("red", "green", Some("repeat"), 640.0),
        ];
        assert_eq!(
            encoder.encode(&trials).unwrap_err(),
            EncodingError::MissingColumns {
                columns: vec!["color_red".into(), "response_transition_switch".into()]
            }
        );

        let lenient = DesignEncoder::default().strict_coverage(false);
        let (x, _) = lenient.encode(&trials).unwrap();
        assert_eq!(x.ncols(), 4);
    }

    #[test]
    fn test_condition_and_trial_encode_identically() {
        let encoder = DesignEncoder::default();
        let condition = Condition::new("red", "green", Some("switch"));
        let from_condition = encoder.encode_features(&[condition.clone()]).unwrap();
        let from_trial = encoder.encode_features(&[Trial::new(condition)]).unwrap();
        assert_eq!(from_condition, from_trial);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::types::{Condition, Observation};
    use proptest::prelude::*;

    fn trial_strategy() -> impl Strategy<Value = Trial> {
        (
            prop::sample::select(vec!["green", "red"]),
            prop::sample::select(vec!["green", "red"]),
            prop::option::of(prop::sample::select(vec!["repeat", "switch"])),
            300.0f64..3000.0,
        )
            .prop_map(|(word, color, transition, rt)| {
                Trial::new(Condition::new(word, color, transition)).observed(Observation {
                    reaction_time: rt,
                    response: "j".into(),
                })
            })
    }

    /// A batch together with a permutation of its row indices.
    fn batch_and_order() -> impl Strategy<Value = (Vec<Trial>, Vec<usize>)> {
        prop::collection::vec(trial_strategy(), 1..40).prop_flat_map(|trials| {
            let order: Vec<usize> = (0..trials.len()).collect();
            (Just(trials), Just(order).prop_shuffle())
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// Shuffling a batch permutes rows but never changes the column layout.
        #[test]
        fn prop_column_layout_is_order_independent((trials, order) in batch_and_order()) {
            let encoder = DesignEncoder::default().strict_coverage(false);
            let x = encoder.encode_features(&trials).unwrap();

            let shuffled: Vec<Trial> = order.iter().map(|&i| trials[i].clone()).collect();
            let xs = encoder.encode_features(&shuffled).unwrap();

            prop_assert_eq!(x.ncols(), xs.ncols());
            prop_assert_eq!(encoder.column_names(), DesignEncoder::default().column_names());
            for (row, &src) in order.iter().enumerate() {
                prop_assert_eq!(xs.row(row), x.row(src));
            }
        }
    }
}
