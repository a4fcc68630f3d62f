//! Batch worker for running many recommendations concurrently.
//!
//! Records are spread over a fixed number of background threads that share
//! one recommendation service. Results come back over a channel and are
//! returned in input order.
//!
//! JSON Lines input goes through [`BatchRunner::run_lines`], which parses and
//! range-checks every line before the pipeline and yields one [`BatchRow`] per
//! non-blank line:
//!
//! ```json
//! {"line":1,"result":{"fertilizer":"Urea","remark":"...","crop":"rice","soil":"Loamy Soil"}}
//! {"line":2,"stage":"validate","error":"Temperature 500 out of range [0, 50]"}
//! ```

use std::path::Path;
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use serde::Serialize;

use super::recommend::{checked_record, RecommendationFailed, RecommendationService};
use crate::domain::{MeasurementInput, RecommendationResult};
use crate::ports::{CategoryEncoder, FeatureScaler, RecommendationModel};
use crate::AfrigrowError;

/// Outcome for one record of a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutcome {
    /// Position of the record in the submitted batch
    pub index: usize,
    /// Recommendation or the failure for this record
    pub result: Result<RecommendationResult, RecommendationFailed>,
}

/// One output row of a JSON Lines batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchRow {
    /// 1-based line number in the input
    pub line: usize,
    #[serde(flatten)]
    pub outcome: RowOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RowOutcome {
    Recommended { result: RecommendationResult },
    Failed { stage: String, error: String },
}

impl BatchRow {
    fn failed(line: usize, err: &AfrigrowError) -> Self {
        Self {
            line,
            outcome: RowOutcome::Failed {
                stage: err.stage().to_string(),
                error: err.detail(),
            },
        }
    }

    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, RowOutcome::Failed { .. })
    }

    /// Render the row as a single JSON line.
    ///
    /// # Errors
    /// Returns `AfrigrowError::Serialization` if the row cannot be encoded.
    pub fn to_json_line(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Runs a batch of records over worker threads.
pub struct BatchRunner<E, S, M>
where
    E: CategoryEncoder,
    S: FeatureScaler,
    M: RecommendationModel,
{
    service: RecommendationService<E, S, M>,
    workers: usize,
}

impl<E, S, M> BatchRunner<E, S, M>
where
    E: CategoryEncoder + 'static,
    S: FeatureScaler + 'static,
    M: RecommendationModel + 'static,
{
    /// Create a runner. A worker count of zero is treated as one.
    pub fn new(service: RecommendationService<E, S, M>, workers: usize) -> Self {
        Self {
            service,
            workers: workers.max(1),
        }
    }

    /// Number of worker threads used per batch.
    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run every record through the pipeline.
    ///
    /// One failing record does not affect the others. Outcomes are sorted by
    /// input index.
    pub fn run(&self, inputs: Vec<MeasurementInput>) -> Vec<BatchOutcome> {
        let total = inputs.len();
        if total == 0 {
            return Vec::new();
        }

        let inputs = Arc::new(inputs);
        let workers = self.workers.min(total);
        let (tx, rx) = mpsc::channel();

        tracing::info!("Running batch of {} records on {} workers", total, workers);

        let handles: Vec<JoinHandle<()>> = (0..workers)
            .map(|worker| {
                let service = self.service.clone();
                let inputs = Arc::clone(&inputs);
                let tx = tx.clone();
                thread::spawn(move || Self::run_worker(&service, &inputs, worker, workers, &tx))
            })
            .collect();
        drop(tx);

        let mut outcomes: Vec<BatchOutcome> = rx.iter().collect();

        for handle in handles {
            if handle.join().is_err() {
                tracing::error!("Batch worker panicked");
            }
        }

        if outcomes.len() != total {
            tracing::warn!(
                "Batch returned {} of {} outcomes",
                outcomes.len(),
                total
            );
        }

        outcomes.sort_by_key(|o| o.index);
        outcomes
    }

    /// Run a JSON Lines document: one measurement object per line.
    ///
    /// Blank lines are skipped. Lines that do not parse, miss a field or hold
    /// an out-of-range value become failed rows without reaching the pipeline.
    /// Rows are sorted by line number.
    pub fn run_lines(&self, text: &str) -> Vec<BatchRow> {
        let mut rows = Vec::new();
        let mut line_numbers = Vec::new();
        let mut inputs = Vec::new();

        for (i, raw) in text.lines().enumerate() {
            let line = i + 1;
            if raw.trim().is_empty() {
                continue;
            }
            let checked = serde_json::from_str::<MeasurementInput>(raw)
                .map_err(AfrigrowError::from)
                .and_then(|input| checked_record(&input).map(|_| input));
            match checked {
                Ok(input) => {
                    line_numbers.push(line);
                    inputs.push(input);
                }
                Err(e) => {
                    tracing::debug!("Line {} rejected: {}", line, e);
                    rows.push(BatchRow::failed(line, &e));
                }
            }
        }

        for outcome in self.run(inputs) {
            let Some(&line) = line_numbers.get(outcome.index) else {
                continue;
            };
            rows.push(match outcome.result {
                Ok(result) => BatchRow {
                    line,
                    outcome: RowOutcome::Recommended { result },
                },
                Err(e) => BatchRow::failed(line, &AfrigrowError::from(e)),
            });
        }

        rows.sort_by_key(|row| row.line);
        rows
    }

    /// Read a JSON Lines file and run it with [`Self::run_lines`].
    ///
    /// # Errors
    /// Returns `AfrigrowError::Io` if the file cannot be read.
    pub fn run_file(&self, path: &Path) -> crate::Result<Vec<BatchRow>> {
        let text = std::fs::read_to_string(path)?;
        Ok(self.run_lines(&text))
    }

    /// Process every `stride`-th record starting at `worker`.
    fn run_worker(
        service: &RecommendationService<E, S, M>,
        inputs: &[MeasurementInput],
        worker: usize,
        stride: usize,
        tx: &Sender<BatchOutcome>,
    ) {
        for (index, input) in inputs.iter().enumerate().skip(worker).step_by(stride) {
            let result = service.recommend_input(input);
            if let Err(e) = &result {
                tracing::debug!("Record {} failed: {}", index, e);
            }
            // Receiver only goes away if the caller stopped collecting.
            if tx.send(BatchOutcome { index, result }).is_err() {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::recommend::{DefaultRecommender, PipelineStage};
    use std::path::Path;

    fn create_test_runner(workers: usize) -> BatchRunner<
        crate::adapters::LabelEncoders,
        crate::adapters::FittedScaler,
        crate::adapters::Classifier,
    > {
        let service =
            DefaultRecommender::load(Path::new("models"), false).expect("Bundled models should load");
        BatchRunner::new(service, workers)
    }

    fn input(soil: &str, temperature: f64) -> MeasurementInput {
        MeasurementInput {
            temperature: Some(temperature),
            moisture: Some(0.5),
            rainfall: Some(200),
            ph: Some(6.5),
            nitrogen: Some(50),
            phosphorous: Some(50),
            potassium: Some(50),
            carbon: Some(1.0),
            soil: Some(soil.into()),
            crop: Some("rice".into()),
        }
    }

    #[test]
    fn test_batch_preserves_order() {
        let runner = create_test_runner(4);
        let inputs: Vec<_> = (0..37).map(|i| input("Loamy Soil", f64::from(i))).collect();

        let outcomes = runner.run(inputs);
        assert_eq!(outcomes.len(), 37);
        for (i, outcome) in outcomes.iter().enumerate() {
            assert_eq!(outcome.index, i);
            assert!(outcome.result.is_ok());
        }
    }

    #[test]
    fn test_batch_matches_sequential() {
        let runner = create_test_runner(3);
        let service =
            DefaultRecommender::load(Path::new("models"), false).expect("Bundled models should load");
        let inputs: Vec<_> = (0..20)
            .map(|i| input("Acidic Soil", 10.0 + f64::from(i) * 1.5))
            .collect();

        let outcomes = runner.run(inputs.clone());
        for (outcome, input) in outcomes.iter().zip(&inputs) {
            assert_eq!(outcome.result, service.recommend_input(input));
        }
    }

    #[test]
    fn test_failure_is_isolated() {
        let runner = create_test_runner(2);
        let inputs = vec![
            input("Loamy Soil", 25.0),
            input("Swamp Soil", 25.0),
            MeasurementInput::default(),
            input("Peaty Soil", 25.0),
        ];

        let outcomes = runner.run(inputs);
        assert_eq!(outcomes.len(), 4);
        assert!(outcomes[0].result.is_ok());
        assert_eq!(
            outcomes[1].result.as_ref().map_err(|e| e.stage),
            Err(PipelineStage::Encode)
        );
        assert_eq!(
            outcomes[2].result.as_ref().map_err(|e| e.stage),
            Err(PipelineStage::Validate)
        );
        assert!(outcomes[3].result.is_ok());
    }

    fn json_line(input: &MeasurementInput) -> String {
        serde_json::to_string(input).expect("serialize input")
    }

    fn stage_of(row: &BatchRow) -> Option<&str> {
        match &row.outcome {
            RowOutcome::Failed { stage, .. } => Some(stage.as_str()),
            RowOutcome::Recommended { .. } => None,
        }
    }

    #[test]
    fn test_lines_are_checked_and_reported_in_order() {
        let runner = create_test_runner(3);
        let out_of_range = MeasurementInput {
            temperature: Some(500.0),
            moisture: Some(9.0),
            ..input("Loamy Soil", 25.0)
        };
        let missing = MeasurementInput {
            crop: None,
            ..input("Loamy Soil", 25.0)
        };
        let text = [
            json_line(&input("Loamy Soil", 25.0)),
            String::new(),
            "{ not json".to_string(),
            json_line(&out_of_range),
            json_line(&input("Swamp Soil", 25.0)),
            "   ".to_string(),
            json_line(&missing),
            json_line(&input("Peaty Soil", 30.0)),
        ]
        .join("\n");

        let rows = runner.run_lines(&text);
        let lines: Vec<usize> = rows.iter().map(|r| r.line).collect();
        assert_eq!(lines, vec![1, 3, 4, 5, 7, 8]);

        let stages: Vec<Option<&str>> = rows.iter().map(stage_of).collect();
        assert_eq!(
            stages,
            vec![None, Some("parse"), Some("validate"), Some("encode"), Some("validate"), None]
        );
        assert_eq!(rows.iter().filter(|r| r.is_failure()).count(), 4);

        match &rows[2].outcome {
            RowOutcome::Failed { error, .. } => {
                assert!(error.contains("Temperature"));
                assert!(error.contains("Moisture"));
            }
            other => panic!("Expected failed row, got {other:?}"),
        }
    }

    #[test]
    fn test_row_json_shape() {
        let runner = create_test_runner(1);
        let out_of_range = MeasurementInput {
            ph: Some(99.0),
            ..input("Loamy Soil", 25.0)
        };
        let text = format!(
            "{}\n{}",
            json_line(&input("Loamy Soil", 25.0)),
            json_line(&out_of_range)
        );
        let rows = runner.run_lines(&text);

        let ok: serde_json::Value =
            serde_json::from_str(&rows[0].to_json_line().expect("json")).expect("parse row");
        assert_eq!(ok["line"], 1);
        assert_eq!(ok["result"]["fertilizer"], "Balanced NPK Fertilizer");
        assert!(ok.get("error").is_none());

        let failed: serde_json::Value =
            serde_json::from_str(&rows[1].to_json_line().expect("json")).expect("parse row");
        assert_eq!(failed["line"], 2);
        assert_eq!(failed["stage"], "validate");
        assert_eq!(failed["error"], "PH 99 out of range [0, 14]");
        assert!(failed.get("result").is_none());
    }

    #[test]
    fn test_run_file() {
        let runner = create_test_runner(2);
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("batch.jsonl");
        std::fs::write(&path, json_line(&input("Neutral Soil", 20.0))).expect("write batch");

        let rows = runner.run_file(&path).expect("Should run");
        assert_eq!(rows.len(), 1);
        assert!(!rows[0].is_failure());

        let err = runner
            .run_file(&temp.path().join("missing.jsonl"))
            .expect_err("Should fail");
        assert!(matches!(err, AfrigrowError::Io(_)));
    }

    #[test]
    fn test_empty_batch_and_zero_workers() {
        let runner = create_test_runner(0);
        assert_eq!(runner.workers(), 1);
        assert!(runner.run(Vec::new()).is_empty());
    }
}
