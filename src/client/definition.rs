use crate::global::constant;
use anyhow::anyhow;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProblemType {
    Contest,
    Gym,
    Group,
    Acmsguru,
}

impl ProblemType {
    /// Gym contests carry ids of six digits or more; acmsguru records come
    /// without a contest id at all.
    pub fn classify(contest_id: Option<&str>) -> Self {
        match contest_id.map(str::trim).filter(|c| !c.is_empty()) {
            None => ProblemType::Acmsguru,
            Some(c) if c.len() >= 6 && c.chars().all(|x| x.is_ascii_digit()) => ProblemType::Gym,
            Some(_) => ProblemType::Contest,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProblemType::Contest => "contest",
            ProblemType::Gym => "gym",
            ProblemType::Group => "group",
            ProblemType::Acmsguru => "acmsguru",
        }
    }
}

/// Locates a contest, problem or submission on the judge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Info {
    pub problem_type: ProblemType,
    pub group_id: String,
    pub contest_id: String,
    pub problem_id: String,
    pub submission_id: String,
    pub root: PathBuf,
}

impl Info {
    pub fn new(problem_type: ProblemType, contest_id: &str, problem_id: &str) -> Self {
        let contest_id = if problem_type == ProblemType::Acmsguru && contest_id.is_empty() {
            constant::ACMSGURU_CONTEST_ID
        } else {
            contest_id
        };
        Self {
            problem_type,
            group_id: String::new(),
            contest_id: contest_id.into(),
            problem_id: problem_id.to_lowercase(),
            submission_id: String::new(),
            root: PathBuf::from("."),
        }
    }

    /// Reads a contest argument: `1812`, `104279` (gym) or
    /// `<groupId>/<contestId>`.
    pub fn from_contest_arg(contest: &str, problem_id: &str) -> Self {
        match contest.split_once('/') {
            Some((group, contest_id)) => {
                Info::new(ProblemType::Group, contest_id, problem_id).with_group(group)
            }
            None => Info::new(ProblemType::classify(Some(contest)), contest, problem_id),
        }
    }

    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    pub fn with_group(mut self, group_id: &str) -> Self {
        self.group_id = group_id.into();
        self
    }

    pub fn with_submission(&self, submission_id: &str) -> Self {
        let mut info = self.clone();
        info.submission_id = submission_id.into();
        info
    }

    fn contest_prefix(&self, host: &str) -> anyhow::Result<String> {
        let host = host.trim_end_matches('/');
        if self.contest_id.is_empty() && self.problem_type != ProblemType::Acmsguru {
            return Err(anyhow!("contest id is required"));
        }
        Ok(match self.problem_type {
            ProblemType::Contest => format!("{}/contest/{}", host, self.contest_id),
            ProblemType::Gym => format!("{}/gym/{}", host, self.contest_id),
            ProblemType::Group => {
                if self.group_id.is_empty() {
                    return Err(anyhow!("group id is required"));
                }
                format!("{}/group/{}/contest/{}", host, self.group_id, self.contest_id)
            }
            ProblemType::Acmsguru => format!("{}/problemsets/acmsguru", host),
        })
    }

    fn require_problem(&self) -> anyhow::Result<&str> {
        if self.problem_id.is_empty() {
            return Err(anyhow!("problem id is required"));
        }
        Ok(&self.problem_id)
    }

    pub fn problem_url(&self, host: &str) -> anyhow::Result<String> {
        let prefix = self.contest_prefix(host)?;
        let problem = self.require_problem()?.to_uppercase();
        Ok(match self.problem_type {
            ProblemType::Acmsguru => format!("{}/problem/{}/{}", prefix, self.contest_id, problem),
            _ => format!("{}/problem/{}", prefix, problem),
        })
    }

    pub fn my_submissions_url(&self, host: &str, handle: &str) -> anyhow::Result<String> {
        Ok(match self.problem_type {
            ProblemType::Acmsguru => {
                format!("{}/submissions/{}", host.trim_end_matches('/'), handle)
            }
            _ => format!("{}/my", self.contest_prefix(host)?),
        })
    }

    pub fn submission_url(&self, host: &str) -> anyhow::Result<String> {
        if self.submission_id.is_empty() {
            return Err(anyhow!("submission id is required"));
        }
        let prefix = self.contest_prefix(host)?;
        Ok(match self.problem_type {
            ProblemType::Acmsguru => format!(
                "{}/submission/{}/{}",
                prefix, self.contest_id, self.submission_id
            ),
            _ => format!("{}/submission/{}", prefix, self.submission_id),
        })
    }

    pub fn submit_url(&self, host: &str) -> anyhow::Result<String> {
        Ok(format!("{}/submit", self.contest_prefix(host)?))
    }

    pub fn problem_dir(&self) -> PathBuf {
        let mut dir = self.root.join(self.problem_type.as_str());
        match self.problem_type {
            ProblemType::Acmsguru => {}
            ProblemType::Group => {
                dir.push(&self.group_id);
                dir.push(&self.contest_id);
            }
            _ => dir.push(&self.contest_id),
        }
        if !self.problem_id.is_empty() {
            dir.push(&self.problem_id);
        }
        dir
    }

    pub fn hint(&self) -> String {
        let mut s = format!("{} {}", self.problem_type.as_str(), self.contest_id);
        if !self.problem_id.is_empty() {
            s.push_str(&format!(" {}", self.problem_id.to_uppercase()));
        }
        if !self.submission_id.is_empty() {
            s.push_str(&format!(" #{}", self.submission_id));
        }
        s
    }
}
