use crate::client::{Info, ProblemType};
use crate::error::Error;
use crate::global::{verdict_marker, ExtTable};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// One code download: where to read it and where it lands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievalJob {
    pub url: String,
    pub stem: PathBuf,
    pub ext: String,
}

impl RetrievalJob {
    pub fn path(&self) -> PathBuf {
        self.path_with_suffix(None)
    }

    /// `stem_<n>.ext` for collision probing; `None` gives `stem.ext`.
    pub fn path_with_suffix(&self, n: Option<usize>) -> PathBuf {
        let name = self
            .stem
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let name = match n {
            Some(n) => format!("{}_{}.{}", name, n, self.ext),
            None => format!("{}.{}", name, self.ext),
        };
        self.stem.with_file_name(name)
    }
}

#[derive(Debug, Deserialize)]
struct HistoryProblem {
    #[serde(rename = "contestId")]
    contest_id: Option<u64>,
    index: String,
}

/// Shape of an entry in the `user.status` API result.
#[derive(Debug, Deserialize)]
struct HistoryRecord {
    id: u64,
    #[serde(rename = "contestId")]
    contest_id: Option<u64>,
    problem: HistoryProblem,
    verdict: Option<String>,
    #[serde(rename = "programmingLanguage")]
    programming_language: String,
    #[serde(rename = "passedTestCount", default)]
    passed_test_count: u32,
}

pub struct Planner<'a> {
    pub host: &'a str,
    pub root: &'a Path,
    pub ext: &'a ExtTable,
    pub ac_only: bool,
}

impl Planner<'_> {
    /// `Ok(None)` means the record is filtered out by accepted-only mode.
    pub fn plan(&self, raw: &serde_json::Value) -> anyhow::Result<Option<RetrievalJob>> {
        let record = serde_json::from_value::<HistoryRecord>(raw.clone())
            .map_err(|e| Error::Malformed(e.to_string()))?;
        let verdict = record.verdict.as_deref().unwrap_or("unknown");
        let accepted = verdict == verdict_marker::ACCEPTED;
        if self.ac_only && !accepted {
            return Ok(None);
        }
        let Some(ext) = self.ext.lookup(&record.programming_language) else {
            return Err(Error::Unsupported(record.programming_language).into());
        };

        let contest_id = record
            .contest_id
            .or(record.problem.contest_id)
            .map(|c| c.to_string());
        let problem_type = ProblemType::classify(contest_id.as_deref());
        let info = Info::new(
            problem_type,
            contest_id.as_deref().unwrap_or_default(),
            &record.problem.index,
        )
        .with_root(self.root)
        .with_submission(&record.id.to_string());

        let name = if accepted {
            record.id.to_string()
        } else {
            format!(
                "{}_{}_{}",
                record.id,
                verdict.to_lowercase(),
                record.passed_test_count
            )
        };
        Ok(Some(RetrievalJob {
            url: info.submission_url(self.host)?,
            stem: info.problem_dir().join(name),
            ext: ext.into(),
        }))
    }
}
