//! Test suites and the score matrix

use std::io::Write;

use tracing::{info, warn};

use crate::error::{BenchError, Result};
use crate::model::Model;
use crate::score::Score;
use crate::testing::ModelTest;

/// An ordered collection of tests judged against an ordered collection of
/// models
#[derive(Default)]
pub struct TestSuite {
    tests: Vec<Box<dyn ModelTest>>,
}

impl TestSuite {
    /// Create an empty suite
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a test row
    pub fn push(&mut self, test: Box<dyn ModelTest>) {
        self.tests.push(test);
    }

    /// Builder-style `push`
    #[must_use]
    pub fn with(mut self, test: Box<dyn ModelTest>) -> Self {
        self.push(test);
        self
    }

    /// Number of test rows
    #[must_use]
    pub fn len(&self) -> usize {
        self.tests.len()
    }

    /// Whether the suite holds no tests
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }

    /// Judge every model against every test.
    ///
    /// Space violations and missing capabilities propagate immediately; any
    /// other per-cell failure is logged and recorded as an empty cell so a
    /// single failing model/test pair does not abort the suite.
    pub fn judge_all(&self, models: &mut [Box<dyn Model>]) -> Result<ScoreMatrix> {
        let test_names: Vec<String> = self.tests.iter().map(|t| t.name().to_string()).collect();
        let model_names: Vec<String> = models.iter().map(|m| m.name().to_string()).collect();
        let mut cells = Vec::with_capacity(self.tests.len());
        for test in &self.tests {
            let mut row = Vec::with_capacity(models.len());
            for model in models.iter_mut() {
                match test.judge(model.as_mut()) {
                    Ok(score) => {
                        info!(test = test.name(), model = model.name(), score = score.value, "judged");
                        row.push(Some(score));
                    }
                    Err(
                        e @ (BenchError::SpaceViolation { .. }
                        | BenchError::CapabilityMissing { .. }),
                    ) => return Err(e),
                    Err(e) => {
                        warn!(test = test.name(), model = model.name(), error = %e, "judge failed; recording empty cell");
                        row.push(None);
                    }
                }
            }
            cells.push(row);
        }
        Ok(ScoreMatrix {
            test_names,
            model_names,
            cells,
        })
    }
}

/// A test-row by model-column table of scores
#[derive(Debug, Clone)]
pub struct ScoreMatrix {
    test_names: Vec<String>,
    model_names: Vec<String>,
    cells: Vec<Vec<Option<Score>>>,
}

impl ScoreMatrix {
    /// Row (test) names, in judge order
    #[must_use]
    pub fn test_names(&self) -> &[String] {
        &self.test_names
    }

    /// Column (model) names, in judge order
    #[must_use]
    pub fn model_names(&self) -> &[String] {
        &self.model_names
    }

    /// Cell at (test row, model column); `None` marks a recovered failure
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> Option<&Score> {
        self.cells.get(row)?.get(col)?.as_ref()
    }

    /// Number of test rows
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.test_names.len()
    }

    /// Number of model columns
    #[must_use]
    pub fn n_cols(&self) -> usize {
        self.model_names.len()
    }

    /// Write the raw score values as CSV with test and model names as
    /// headers. Empty cells stay empty.
    pub fn to_csv<W: Write>(&self, writer: &mut W) -> Result<()> {
        write!(writer, "test")?;
        for name in &self.model_names {
            write!(writer, ",{name}")?;
        }
        writeln!(writer)?;
        for (name, row) in self.test_names.iter().zip(&self.cells) {
            write!(writer, "{name}")?;
            for cell in row {
                match cell {
                    Some(score) => write!(writer, ",{}", score.value)?,
                    None => write!(writer, ",")?,
                }
            }
            writeln!(writer)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::score::ScoreKind;

    fn matrix() -> ScoreMatrix {
        ScoreMatrix {
            test_names: vec!["t0".to_string(), "t1".to_string()],
            model_names: vec!["m0".to_string(), "m1".to_string()],
            cells: vec![
                vec![
                    Some(Score::new(ScoreKind::Nll, 1.5)),
                    Some(Score::new(ScoreKind::Nll, 2.5)),
                ],
                vec![Some(Score::new(ScoreKind::Nll, 3.0)), None],
            ],
        }
    }

    #[test]
    fn csv_export_writes_raw_values() {
        let mut out = Vec::new();
        matrix().to_csv(&mut out).unwrap();
        let csv = String::from_utf8(out).unwrap();
        assert_eq!(csv, "test,m0,m1\nt0,1.5,2.5\nt1,3,\n");
    }

    #[test]
    fn cell_lookup() {
        let m = matrix();
        assert_eq!(m.get(0, 1).unwrap().value, 2.5);
        assert!(m.get(1, 1).is_none());
        assert!(m.get(5, 0).is_none());
    }
}
