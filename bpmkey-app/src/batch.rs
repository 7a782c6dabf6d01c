//! Parallel analysis of several files
//!
//! A fixed set of worker threads pulls paths from a queue; results are
//! put back in input order before they are returned.

use bpmkey_library::{AnalysisPipeline, AnalysisResult, PipelineError};
use crossbeam_channel::{unbounded, Receiver, Sender};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use tracing::{debug, warn};

/// Outcome for one input file
#[derive(Debug)]
pub struct Outcome {
    pub path: PathBuf,
    pub result: Result<AnalysisResult, PipelineError>,
}

impl Outcome {
    pub fn report(&self) -> Report {
        match &self.result {
            Ok(result) => Report::Analyzed(result.clone()),
            Err(e) => Report::Failed {
                path: self.path.display().to_string(),
                error: e.to_string(),
            },
        }
    }
}

/// JSON shape of one entry in the output
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Report {
    Analyzed(AnalysisResult),
    Failed { path: String, error: String },
}

type Job = (usize, PathBuf);

/// Analyze `files` on up to `jobs` threads
pub fn analyze_all(pipeline: Arc<AnalysisPipeline>, files: Vec<PathBuf>, jobs: usize) -> Vec<Outcome> {
    let file_count = files.len();
    if file_count == 0 {
        return Vec::new();
    }

    let thread_count = jobs.min(file_count).max(1);
    debug!("Analyzing {} files on {} threads", file_count, thread_count);

    let (job_tx, job_rx): (Sender<Job>, Receiver<Job>) = unbounded();
    let (done_tx, done_rx) = unbounded::<(usize, Outcome)>();

    for job in files.iter().cloned().enumerate() {
        // The receiver is alive until the workers below exit
        let _ = job_tx.send(job);
    }
    drop(job_tx);

    let mut handles = Vec::with_capacity(thread_count);
    for _ in 0..thread_count {
        let pipeline = Arc::clone(&pipeline);
        let job_rx = job_rx.clone();
        let done_tx = done_tx.clone();

        handles.push(thread::spawn(move || {
            for (index, path) in job_rx.iter() {
                let result = pipeline.analyze(&path);
                if let Err(e) = &result {
                    warn!("{}", e);
                }
                if done_tx.send((index, Outcome { path, result })).is_err() {
                    break;
                }
            }
        }));
    }
    drop(done_tx);

    let mut slots: Vec<Option<Outcome>> = (0..file_count).map(|_| None).collect();
    for (index, outcome) in done_rx.iter() {
        slots[index] = Some(outcome);
    }

    for handle in handles {
        let _ = handle.join();
    }

    // A worker that panicked leaves its file without an outcome
    slots
        .into_iter()
        .zip(files)
        .map(|(slot, path)| {
            slot.unwrap_or_else(|| Outcome {
                result: Err(PipelineError::decode(&path, "Analysis thread panicked")),
                path,
            })
        })
        .collect()
}
