use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};

use hljt_core::TrialResult;

/// Aggregate view of a finished (or aborted) session.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSummary {
    pub trials: usize,
    pub responses: usize,
    pub accurate: usize,
    pub mean_rt_ms: f64,
    pub min_rt_ms: f64,
    pub max_rt_ms: f64,
}

impl ResultSummary {
    pub fn response_rate(&self) -> f64 {
        self.responses as f64 / self.trials as f64 * 100.0
    }

    pub fn accuracy_rate(&self) -> f64 {
        self.accurate as f64 / self.trials as f64 * 100.0
    }
}

/// `None` when there are no rows at all. Reaction time stats cover only
/// the trials that got a response; they read as zero when none did.
pub fn summarize(results: &[TrialResult]) -> Option<ResultSummary> {
    if results.is_empty() {
        return None;
    }

    let times: Vec<f64> = results.iter().filter_map(|r| r.rt).collect();
    let accurate = results.iter().filter(|r| r.accuracy).count();

    let (mean, min, max) = if times.is_empty() {
        (0.0, 0.0, 0.0)
    } else {
        let mean = times.iter().sum::<f64>() / times.len() as f64;
        let min = times.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = times.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        (mean, min, max)
    };

    Some(ResultSummary {
        trials: results.len(),
        responses: times.len(),
        accurate,
        mean_rt_ms: mean,
        min_rt_ms: min,
        max_rt_ms: max,
    })
}

pub fn save_results(path: &Path, results: &[TrialResult]) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("cannot create result file {}", path.display()))?;
    serde_json::to_writer_pretty(file, results).context("failed to write results")?;
    Ok(())
}

pub fn print_summary(results: &[TrialResult]) {
    let Some(summary) = summarize(results) else {
        return;
    };

    println!("Task results:");
    println!(
        "Trials: {}, Response rate: {:.1}%, Accuracy: {:.1}%",
        summary.trials,
        summary.response_rate(),
        summary.accuracy_rate()
    );
    if summary.responses > 0 {
        println!(
            "Reaction times: mean {:.3} ms, min {:.3} ms, max {:.3} ms",
            summary.mean_rt_ms, summary.min_rt_ms, summary.max_rt_ms
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hljt_core::{Hand, Sex};

    fn row(trial_num: usize, judgement: Option<Hand>, rt: Option<f64>) -> TrialResult {
        TrialResult {
            block_num: 1,
            trial_num,
            hand: Hand::Left,
            sex: Sex::Female,
            angle: 90,
            rotation: 180,
            judgement,
            rt,
            accuracy: judgement == Some(Hand::Left),
        }
    }

    #[test]
    fn empty_sessions_have_no_summary() {
        assert!(summarize(&[]).is_none());
    }

    #[test]
    fn summary_counts_responses_and_accuracy() {
        let results = vec![
            row(1, Some(Hand::Left), Some(400.0)),
            row(2, Some(Hand::Right), Some(600.0)),
            row(3, None, None),
        ];
        let summary = summarize(&results).unwrap();

        assert_eq!(summary.trials, 3);
        assert_eq!(summary.responses, 2);
        assert_eq!(summary.accurate, 1);
        assert_eq!(summary.mean_rt_ms, 500.0);
        assert_eq!(summary.min_rt_ms, 400.0);
        assert_eq!(summary.max_rt_ms, 600.0);
        assert!((summary.response_rate() - 66.666).abs() < 0.01);
    }

    #[test]
    fn timeout_only_sessions_zero_the_rt_stats() {
        let results = vec![row(1, None, None)];
        let summary = summarize(&results).unwrap();

        assert_eq!(summary.responses, 0);
        assert_eq!(summary.mean_rt_ms, 0.0);
    }

    #[test]
    fn saved_rows_read_back_identically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.json");

        let results = vec![
            row(1, Some(Hand::Left), Some(412.25)),
            row(2, None, None),
        ];
        save_results(&path, &results).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        let restored: Vec<TrialResult> = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(restored, results);
    }
}
