//! Runs a local program against sample fixtures (`in<N>.txt` / `ans<N>.txt`).

pub mod compare;
pub mod runner;

use crate::error::Error;
use crate::submission::{format_memory, format_time};
use anyhow::anyhow;
use compare::Mismatch;
use simple_log::log::{info, warn};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    pub id: String,
    pub input: PathBuf,
    pub answer: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Passed,
    Mismatch(Mismatch),
    RuntimeFailure(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JudgeResult {
    pub sample: String,
    pub outcome: Outcome,
    pub cpu_time: Duration,
    pub peak_memory: u64,
}

impl JudgeResult {
    pub fn passed(&self) -> bool {
        self.outcome == Outcome::Passed
    }

    pub fn summary(&self) -> String {
        let state = match &self.outcome {
            Outcome::Passed => "Passed".to_string(),
            Outcome::Mismatch(_) => "Wrong Answer".to_string(),
            Outcome::RuntimeFailure(e) => format!("Runtime Error ({})", e),
        };
        format!(
            "#{} {} ... {} {}",
            self.sample,
            state,
            format_time(self.cpu_time.as_millis() as u64),
            format_memory(self.peak_memory)
        )
    }
}

fn sample_id(name: &str) -> Option<u32> {
    name.strip_prefix("in")?.strip_suffix(".txt")?.parse().ok()
}

/// Finds every `in<N>.txt` in `dir`, ordered by N. The matching answer file
/// is not checked here; a missing one fails that sample alone.
pub fn discover(dir: &Path) -> anyhow::Result<Vec<Sample>> {
    let mut found = vec![];
    for entry in std::fs::read_dir(dir).map_err(|e| anyhow!("read {}: {}", dir.display(), e))? {
        let entry = entry?;
        let name = entry.file_name();
        if let Some(n) = name.to_str().and_then(sample_id) {
            found.push(n);
        }
    }
    found.sort_unstable();
    Ok(found
        .into_iter()
        .map(|n| Sample {
            id: n.to_string(),
            input: dir.join(format!("in{}.txt", n)),
            answer: dir.join(format!("ans{}.txt", n)),
        })
        .collect())
}

/// Judges one sample. Unreadable fixtures are an error; a crashing program is
/// a [`Outcome::RuntimeFailure`] result.
pub async fn judge(command: &str, sample: &Sample) -> anyhow::Result<JudgeResult> {
    let argv = shlex::split(command)
        .filter(|a| !a.is_empty())
        .ok_or_else(|| anyhow!("cannot parse command {:?}", command))?;
    let input = tokio::fs::read_to_string(&sample.input)
        .await
        .map_err(|e| anyhow!("read {}: {}", sample.input.display(), e))?;
    let answer = tokio::fs::read_to_string(&sample.answer)
        .await
        .map_err(|e| anyhow!("read {}: {}", sample.answer.display(), e))?;

    let usage = match runner::run(&argv, &sample.input, runner::SAMPLE_EVERY).await {
        Ok(usage) => usage,
        Err(e) => match Error::of(&e).cloned() {
            Some(Error::RuntimeFailure(msg)) => {
                return Ok(JudgeResult {
                    sample: sample.id.clone(),
                    outcome: Outcome::RuntimeFailure(msg),
                    cpu_time: Duration::ZERO,
                    peak_memory: 0,
                })
            }
            _ => return Err(e),
        },
    };

    let outcome = if !usage.status.success() {
        Outcome::RuntimeFailure(usage.status.to_string())
    } else {
        let output = String::from_utf8_lossy(&usage.stdout).into_owned();
        if compare::same_output(&output, &answer) {
            Outcome::Passed
        } else {
            Outcome::Mismatch(Mismatch::new(input, output, answer))
        }
    };
    Ok(JudgeResult {
        sample: sample.id.clone(),
        outcome,
        cpu_time: usage.cpu_time,
        peak_memory: usage.peak_memory,
    })
}

/// Judges every sample in `dir`. One failing sample never stops the rest.
pub async fn judge_dir(
    command: &str,
    dir: &Path,
) -> anyhow::Result<Vec<anyhow::Result<JudgeResult>>> {
    let samples = discover(dir)?;
    if samples.is_empty() {
        return Err(anyhow!("no samples in {}", dir.display()));
    }
    let mut results = Vec::with_capacity(samples.len());
    for sample in &samples {
        let res = judge(command, sample).await;
        match &res {
            Ok(r) if r.passed() => info!("{}", r.summary()),
            Ok(r) => warn!("{}", r.summary()),
            Err(e) => warn!("#{} failed: {}", sample.id, e),
        }
        results.push(res);
    }
    Ok(results)
}
