use super::job::RetrievalJob;
use crate::client::{Extractor, Session};
use crate::error::Error;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[async_trait]
pub trait CodeFetcher: Send + Sync {
    /// Downloads the code behind `job` and returns where it was written.
    /// Without `rename` an existing file fails with [`Error::AlreadyExists`];
    /// with it the first free `stem`, `stem_1`, `stem_2`, ... is used.
    async fn fetch_code(&self, job: &RetrievalJob, rename: bool) -> anyhow::Result<PathBuf>;
}

async fn exists(path: &Path) -> bool {
    tokio::fs::metadata(path).await.is_ok()
}

async fn free_path(job: &RetrievalJob) -> PathBuf {
    let mut path = job.path();
    let mut n = 0;
    while exists(&path).await {
        n += 1;
        path = job.path_with_suffix(Some(n));
    }
    path
}

pub struct Retriever {
    session: Arc<dyn Session>,
    extractor: Arc<dyn Extractor>,
}

impl Retriever {
    pub fn new(session: Arc<dyn Session>, extractor: Arc<dyn Extractor>) -> Self {
        Self { session, extractor }
    }
}

#[async_trait]
impl CodeFetcher for Retriever {
    async fn fetch_code(&self, job: &RetrievalJob, rename: bool) -> anyhow::Result<PathBuf> {
        let path = if rename {
            free_path(job).await
        } else {
            let path = job.path();
            if exists(&path).await {
                return Err(Error::AlreadyExists(path.display().to_string()).into());
            }
            path
        };

        let html = self.session.get(&job.url).await?;
        if let Some(msg) = self.extractor.extract_judge_message(&html) {
            return Err(Error::JudgeMessage(msg).into());
        }
        let code = self.extractor.extract_code(&html)?;

        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        tokio::fs::write(&path, code).await?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::CodeforcesPage;

    struct Canned(String);

    #[async_trait]
    impl Session for Canned {
        async fn get(&self, _url: &str) -> anyhow::Result<String> {
            Ok(self.0.clone())
        }

        async fn post_form(
            &self,
            _url: &str,
            _fields: &[(&str, String)],
        ) -> anyhow::Result<String> {
            Ok(self.0.clone())
        }
    }

    fn retriever(page: &str) -> Retriever {
        Retriever::new(Arc::new(Canned(page.into())), Arc::new(CodeforcesPage))
    }

    fn job(dir: &Path) -> RetrievalJob {
        RetrievalJob {
            url: "https://codeforces.com/contest/1/submission/5".into(),
            stem: dir.join("contest").join("1").join("a").join("5"),
            ext: "cpp".into(),
        }
    }

    const PAGE: &str = r#"<pre id="program-source-text">int main() {}</pre>"#;

    #[tokio::test]
    async fn test_writes_and_creates_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = retriever(PAGE).fetch_code(&job(dir.path()), false).await.unwrap();
        assert_eq!(path, dir.path().join("contest/1/a/5.cpp"));
        assert_eq!(std::fs::read_to_string(path).unwrap(), "int main() {}");
    }

    #[tokio::test]
    async fn test_existing_file_without_rename() {
        let dir = tempfile::tempdir().unwrap();
        let r = retriever(PAGE);
        r.fetch_code(&job(dir.path()), false).await.unwrap();
        let err = r.fetch_code(&job(dir.path()), false).await.unwrap_err();
        assert!(matches!(Error::of(&err), Some(Error::AlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_rename_probes_free_names() {
        let dir = tempfile::tempdir().unwrap();
        let r = retriever(PAGE);
        let j = job(dir.path());
        let a = r.fetch_code(&j, true).await.unwrap();
        let b = r.fetch_code(&j, true).await.unwrap();
        let c = r.fetch_code(&j, true).await.unwrap();
        assert_eq!(a, dir.path().join("contest/1/a/5.cpp"));
        assert_eq!(b, dir.path().join("contest/1/a/5_1.cpp"));
        assert_eq!(c, dir.path().join("contest/1/a/5_2.cpp"));
    }

    #[tokio::test]
    async fn test_judge_message_is_surfaced() {
        let dir = tempfile::tempdir().unwrap();
        let page = r#"<script>Codeforces.showMessage("Submission not found");</script>"#;
        let err = retriever(page).fetch_code(&job(dir.path()), false).await.unwrap_err();
        assert_eq!(
            Error::of(&err),
            Some(&Error::JudgeMessage("Submission not found".into()))
        );
        assert!(!dir.path().join("contest").exists());
    }
}
