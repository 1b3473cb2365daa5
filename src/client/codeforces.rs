use super::{CodeforcesPage, Extractor, HttpSession, Info, Session};
use crate::error::{is_session_expired, Error};
use crate::global::Config;
use crate::retrieval::{self, CloneOptions, CloneReport, CodeFetcher, Retriever, RetrievalJob};
use crate::submission::Submission;
use crate::watcher::{self, Renderer, SubmissionSource};

use anyhow::anyhow;
use async_trait::async_trait;
use rand::distributions::Alphanumeric;
use rand::prelude::*;
use simple_log::log::info;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

const BFAA: &str = "f1b3f18c715565b589b7823cda7448ce";

fn ftaa() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(18)
        .map(|c| (c as char).to_ascii_lowercase())
        .collect()
}

pub struct Client {
    pub config: Config,
    session: Arc<dyn Session>,
    extractor: Arc<dyn Extractor>,
}

impl Client {
    pub fn new(config: Config, session: Arc<dyn Session>, extractor: Arc<dyn Extractor>) -> Self {
        Self {
            config,
            session,
            extractor,
        }
    }

    pub fn connect(config: Config) -> anyhow::Result<Self> {
        let session = HttpSession::new(&config.host)?;
        Ok(Self::new(config, Arc::new(session), Arc::new(CodeforcesPage)))
    }

    fn host(&self) -> &str {
        self.config.host.trim_end_matches('/')
    }

    fn handle(&self) -> anyhow::Result<&str> {
        Ok(&self.config.account()?.handle)
    }

    fn floor(&self) -> Duration {
        Duration::from_millis(self.config.poll_floor_ms)
    }

    /// Logged-out pages show "Enter | Register" in the header.
    pub fn is_login(html: &str) -> bool {
        let register_after_enter = html
            .find("Enter")
            .map(|pos| html[pos..].chars().take(120).collect::<String>().contains("Register"))
            .unwrap_or(false);
        let logged_out =
            register_after_enter || (html.len() < 1000 && html.contains("Redirecting..."));
        !logged_out
    }

    fn csrf_of(&self, html: &str) -> anyhow::Result<String> {
        self.extractor.extract_csrf(html).ok_or_else(|| {
            anyhow!("page carries no X-Csrf-Token, the request may have been blocked")
        })
    }

    pub async fn login(&self) -> anyhow::Result<()> {
        let account = self.config.account()?;
        let enter = format!("{}/enter", self.host());
        let html = self.session.get(&enter).await?;
        let csrf_token = self.csrf_of(&html)?;
        let fields = [
            ("csrf_token", csrf_token),
            ("action", "enter".to_string()),
            ("ftaa", ftaa()),
            ("bfaa", BFAA.to_string()),
            ("handleOrEmail", account.handle.clone()),
            ("password", account.password.clone()),
            ("_tta", "176".to_string()),
            ("remember", "on".to_string()),
        ];
        let html = self.session.post_form(&enter, &fields).await?;
        if !Self::is_login(&html) {
            return Err(anyhow!("login as {} failed", account.handle));
        }
        info!("logged in as {}", account.handle);
        Ok(())
    }

    /// Watches the newest `count` submissions of `info` (all when `None`).
    /// An expired session is renewed once before giving up.
    pub async fn watch<R: Renderer + ?Sized>(
        &self,
        info: &Info,
        count: Option<usize>,
        renderer: &mut R,
    ) -> anyhow::Result<Vec<Submission>> {
        let url = info.my_submissions_url(self.host(), self.handle()?)?;
        match watcher::watch(self, &url, count, renderer, self.floor()).await {
            Err(e) if is_session_expired(&e) => {
                self.login().await?;
                watcher::watch(self, &url, count, renderer, self.floor()).await
            }
            res => res,
        }
    }

    async fn post_solution(&self, info: &Info, lang_id: &str, source: &str) -> anyhow::Result<()> {
        let url = info.submit_url(self.host())?;
        let html = self.session.get(&url).await?;
        let csrf_token = self.csrf_of(&html)?;
        let fields = [
            ("csrf_token", csrf_token.clone()),
            ("ftaa", ftaa()),
            ("bfaa", BFAA.to_string()),
            ("action", "submitSolutionFormSubmitted".to_string()),
            ("submittedProblemIndex", info.problem_id.to_uppercase()),
            ("contestId", info.contest_id.clone()),
            ("programTypeId", lang_id.to_string()),
            ("source", source.to_string()),
            ("tabSize", "4".to_string()),
            ("_tta", "594".to_string()),
            ("sourceCodeConfirmed", "true".to_string()),
        ];
        let html = self
            .session
            .post_form(&format!("{}?csrf_token={}", url, csrf_token), &fields)
            .await?;
        if let Some(msg) = self.extractor.extract_judge_message(&html) {
            return Err(Error::JudgeMessage(msg).into());
        }
        Ok(())
    }

    /// Submits `source` and follows it until judged. The returned locator
    /// carries the new submission id.
    pub async fn submit<R: Renderer + ?Sized>(
        &self,
        info: &Info,
        lang_id: &str,
        source: &str,
        renderer: &mut R,
    ) -> anyhow::Result<Info> {
        match self.post_solution(info, lang_id, source).await {
            Err(e) if is_session_expired(&e) => {
                self.login().await?;
                self.post_solution(info, lang_id, source).await?
            }
            res => res?,
        }
        info!("submitted {}", info.hint());
        let subs = self.watch(info, Some(1), renderer).await?;
        let latest = subs
            .first()
            .ok_or_else(|| anyhow!("cannot find the submission of {}", info.hint()))?;
        Ok(info.with_submission(&latest.id.to_string()))
    }

    /// Downloads one submission next to its problem, never overwriting.
    pub async fn pull(&self, info: &Info) -> anyhow::Result<PathBuf> {
        let id: u64 = info
            .submission_id
            .parse()
            .map_err(|_| anyhow!("bad submission id {:?}", info.submission_id))?;
        let list_url = info.my_submissions_url(self.host(), self.handle()?)?;
        let subs = self.fetch_submissions(&list_url).await?;
        let sub = subs
            .iter()
            .find(|s| s.id == id)
            .ok_or_else(|| anyhow!("submission {} is not in {}", id, list_url))?;
        let ext_table = self.config.ext_table();
        let ext = ext_table
            .lookup(&sub.lang)
            .ok_or_else(|| Error::Unsupported(sub.lang.clone()))?;

        let mut info = info.clone();
        if info.problem_id.is_empty() {
            info.problem_id = sub.problem_index.to_lowercase();
        }
        let job = RetrievalJob {
            url: info.submission_url(self.host())?,
            stem: info.problem_dir().join(&info.submission_id),
            ext: ext.into(),
        };
        let path = Retriever::new(self.session.clone(), self.extractor.clone())
            .fetch_code(&job, true)
            .await?;
        info!("{} saved to {}", info.hint(), path.display());
        Ok(path)
    }

    /// Writes the statement samples as `in<i>.txt`/`ans<i>.txt`.
    pub async fn parse_samples(&self, info: &Info) -> anyhow::Result<usize> {
        let html = self.session.get(&info.problem_url(self.host())?).await?;
        let samples = self.extractor.extract_samples(&html)?;
        if samples.is_empty() {
            return Err(anyhow!("no samples found for {}", info.hint()));
        }
        let dir = info.problem_dir();
        tokio::fs::create_dir_all(&dir).await?;
        for (i, (input, answer)) in samples.iter().enumerate() {
            tokio::fs::write(dir.join(format!("in{}.txt", i + 1)), input).await?;
            tokio::fs::write(dir.join(format!("ans{}.txt", i + 1)), answer).await?;
        }
        info!("{}: {} samples in {}", info.hint(), samples.len(), dir.display());
        Ok(samples.len())
    }

    /// Downloads the whole submission history of `handle` under
    /// `<root>/<handle>`.
    pub async fn clone_history(&self, handle: &str, ac_only: bool) -> anyhow::Result<CloneReport> {
        let url = format!("{}/api/user.status?handle={}", self.host(), handle);
        let body = self.session.get(&url).await?;
        let mut data: serde_json::Map<String, serde_json::Value> = serde_json::from_str(&body)?;
        if data.get("status").and_then(|s| s.as_str()) != Some("OK") {
            let comment = data
                .get("comment")
                .and_then(|c| c.as_str())
                .unwrap_or("unknown error");
            return Err(anyhow!("user.status for {}: {}", handle, comment));
        }
        let records = match data.remove("result") {
            Some(serde_json::Value::Array(records)) => records,
            _ => return Err(Error::Malformed("user.status result is not a list".into()).into()),
        };
        info!("{} has {} submissions", handle, records.len());

        let opts = CloneOptions {
            host: self.host().to_string(),
            root: self.config.root.join(handle),
            ext: self.config.ext_table(),
            ac_only,
            workers: self.config.workers,
            cooldown: Duration::from_secs(self.config.rate_limit_cooldown_secs),
        };
        let fetcher = Arc::new(Retriever::new(self.session.clone(), self.extractor.clone()));
        Ok(retrieval::clone_history(&records, fetcher, &opts).await)
    }
}

#[async_trait]
impl SubmissionSource for Client {
    async fn fetch_submissions(&self, url: &str) -> anyhow::Result<Vec<Submission>> {
        let html = self.session.get(url).await?;
        self.extractor.parse_submission_list(&html)
    }
}
