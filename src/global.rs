use serde::Deserialize;
use simple_log::LogConfigBuilder;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub mod constant {
    pub const HOST: &str = "https://codeforces.com";
    pub const CONFIG_FILE: &str = "cf_config.json";
    pub const WORKERS: usize = 16;
    pub const RATE_LIMIT_COOLDOWN_SECS: u64 = 500;
    pub const POLL_FLOOR_MS: u64 = 1000;
    // codeforces keeps acmsguru submissions under this contest id
    pub const ACMSGURU_CONTEST_ID: &str = "99999";
}

pub mod verdict_marker {
    pub const ACCEPTED: &str = "OK";
    pub const IN_PROGRESS: [&str; 7] = [
        "pending",
        "testing",
        "submitted",
        "running",
        "in queue",
        "waiting",
        "compiling",
    ];
}

#[derive(Debug, Clone, Deserialize)]
pub struct Account {
    pub handle: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub host: String,
    pub root: PathBuf,
    pub accounts: Vec<Account>,
    pub workers: usize,
    pub rate_limit_cooldown_secs: u64,
    pub poll_floor_ms: u64,
    pub lang_ext: HashMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: constant::HOST.into(),
            root: PathBuf::from("."),
            accounts: vec![],
            workers: constant::WORKERS,
            rate_limit_cooldown_secs: constant::RATE_LIMIT_COOLDOWN_SECS,
            poll_floor_ms: constant::POLL_FLOOR_MS,
            lang_ext: HashMap::new(),
        }
    }
}

impl Config {
    /// Reads the JSON config at `path`; a missing file yields the defaults.
    pub async fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = tokio::fs::read(path).await?;
        let config = serde_json::from_slice::<Config>(&raw)
            .map_err(|e| anyhow::anyhow!("parse {} failed: {}", path.display(), e))?;
        Ok(config)
    }

    pub fn account(&self) -> anyhow::Result<&Account> {
        self.accounts
            .first()
            .ok_or_else(|| anyhow::anyhow!("no codeforces account configured"))
    }

    pub fn ext_table(&self) -> ExtTable {
        ExtTable::with_overrides(&self.lang_ext)
    }
}

/// Language name -> source file extension. Keys match by substring and the
/// first hit wins; configured overrides are consulted before the defaults.
#[derive(Debug, Clone)]
pub struct ExtTable {
    entries: Vec<(String, String)>,
}

const DEFAULT_LANG_EXT: [(&str, &str); 23] = [
    ("GNU C++", "cpp"),
    ("Clang++", "cpp"),
    ("C++", "cpp"),
    ("GNU C", "c"),
    ("C#", "cs"),
    ("DMD", "d"),
    ("Go", "go"),
    ("Haskell", "hs"),
    ("JavaScript", "js"),
    ("Node.js", "js"),
    ("Java", "java"),
    ("Kotlin", "kt"),
    ("OCaml", "ml"),
    ("Delphi", "pas"),
    ("Pascal", "pas"),
    ("Perl", "pl"),
    ("PHP", "php"),
    ("Python", "py"),
    ("PyPy", "py"),
    ("Ruby", "rb"),
    ("Rust", "rs"),
    ("Scala", "scala"),
    ("Tcl", "tcl"),
];

impl ExtTable {
    pub fn with_overrides(overrides: &HashMap<String, String>) -> Self {
        let mut entries: Vec<(String, String)> = overrides
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        entries.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then(a.0.cmp(&b.0)));
        entries.extend(
            DEFAULT_LANG_EXT
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string())),
        );
        Self { entries }
    }

    pub fn lookup(&self, lang: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| lang.contains(k.as_str()))
            .map(|(_, v)| v.as_str())
    }
}

impl Default for ExtTable {
    fn default() -> Self {
        Self::with_overrides(&HashMap::new())
    }
}

/// Configures the process logger. Without a path the log goes to the console.
pub fn init_logger(path: Option<&Path>, level: &str) -> anyhow::Result<()> {
    let builder = LogConfigBuilder::builder().level(level);
    let log_config = match path.and_then(|p| p.to_str()) {
        Some(p) => builder.path(p).output_file().build(),
        None => builder.output_console().build(),
    };
    simple_log::new(log_config).map_err(|e| anyhow::anyhow!("init logger failed: {}", e))
}
