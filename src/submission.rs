use crate::global::verdict_marker;
use once_cell::sync::OnceCell;
use regex::Regex;
use std::fmt;

/// Judge outcome parsed from the raw status text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    InProgress(String),
    Accepted,
    /// Points are out of 100 when the judge does not print a total.
    Partial { passed: u32, total: u32 },
    Rejected { reason: String, test: Option<u32> },
}

fn on_test_re() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"(?i)\s*on\s+test\s+(\d+)").unwrap())
}

fn ratio_re() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"(\d+)\s*(?:/\s*(\d+))?").unwrap())
}

impl Verdict {
    pub fn parse(raw: &str) -> Self {
        let text = raw.trim();
        if text.is_empty() {
            return Verdict::Rejected {
                reason: "Unknown".into(),
                test: None,
            };
        }
        let lower = text.to_lowercase();
        if lower == "null"
            || verdict_marker::IN_PROGRESS
                .iter()
                .any(|m| lower.contains(m))
        {
            return Verdict::InProgress(text.into());
        }
        if text == verdict_marker::ACCEPTED
            || lower.starts_with("accepted")
            || lower.starts_with("happy new year")
            || lower.starts_with("perfect result")
        {
            return Verdict::Accepted;
        }
        if lower.starts_with("partial") {
            if let Some(cap) = ratio_re().captures(text) {
                let passed = cap[1].parse().unwrap_or(0);
                let total = cap
                    .get(2)
                    .and_then(|m| m.as_str().parse().ok())
                    .unwrap_or(100);
                return Verdict::Partial { passed, total };
            }
        }
        match on_test_re().captures(text) {
            Some(cap) => Verdict::Rejected {
                reason: text[..cap.get(0).map(|m| m.start()).unwrap_or(text.len())]
                    .trim()
                    .into(),
                test: cap[1].parse().ok(),
            },
            None => Verdict::Rejected {
                reason: text.into(),
                test: None,
            },
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Verdict::InProgress(_))
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accepted)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::InProgress(s) => write!(f, "{}", s),
            Verdict::Accepted => write!(f, "Accepted"),
            Verdict::Partial { passed, total } => write!(f, "Partial {}/{}", passed, total),
            Verdict::Rejected {
                reason,
                test: Some(t),
            } => write!(f, "{} on test {}", reason, t),
            Verdict::Rejected { reason, test: None } => write!(f, "{}", reason),
        }
    }
}

/// One row of a submission listing. Built fresh on every fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Submission {
    pub id: u64,
    pub contest_id: String,
    pub problem_index: String,
    pub status: String,
    pub lang: String,
    pub when: String,
    pub time_ms: u64,
    pub memory_bytes: u64,
}

impl Submission {
    pub fn verdict(&self) -> Verdict {
        Verdict::parse(&self.status)
    }

    pub fn is_terminal(&self) -> bool {
        self.verdict().is_terminal()
    }

    pub fn problem(&self) -> String {
        format!("{}{}", self.contest_id, self.problem_index.to_uppercase())
    }

    pub fn render_line(&self) -> String {
        format!(
            "#{:<10} {:<8} {:<36} {:>8} {:>8}  {}",
            self.id,
            self.problem(),
            self.verdict().to_string(),
            format_time(self.time_ms),
            format_memory(self.memory_bytes),
            self.lang
        )
    }
}

pub fn format_memory(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{} KB", bytes / 1024)
    } else {
        format!("{} MB", bytes / 1024 / 1024)
    }
}

pub fn format_time(ms: u64) -> String {
    format!("{} ms", ms)
}
