use crate::submission::Submission;
use async_trait::async_trait;
use simple_log::log::debug;
use std::io::Write;
use std::time::Duration;
use tokio::time::Instant;

/// Supplies the current submission listing behind `url`.
#[async_trait]
pub trait SubmissionSource: Send + Sync {
    async fn fetch_submissions(&self, url: &str) -> anyhow::Result<Vec<Submission>>;
}

pub trait Renderer {
    /// `first` is set on the initial paint; later calls redraw the same region.
    fn render(&mut self, subs: &[Submission], first: bool) -> anyhow::Result<()>;
}

/// Polls `url` until every one of the newest `count` submissions (all of them
/// when `count` is `None`) has a final verdict, then returns that snapshot.
/// Consecutive fetches start at least `floor` apart. Fetch errors end the
/// watch immediately.
pub async fn watch<S, R>(
    source: &S,
    url: &str,
    count: Option<usize>,
    renderer: &mut R,
    floor: Duration,
) -> anyhow::Result<Vec<Submission>>
where
    S: SubmissionSource + ?Sized,
    R: Renderer + ?Sized,
{
    let mut first = true;
    loop {
        let started = Instant::now();
        let mut subs = source.fetch_submissions(url).await?;
        if let Some(n) = count {
            subs.truncate(n);
        }
        renderer.render(&subs, first)?;
        first = false;

        let done = subs.iter().filter(|s| s.is_terminal()).count();
        debug!("{}: {}/{} judged", url, done, subs.len());
        if done == subs.len() {
            return Ok(subs);
        }
        tokio::time::sleep_until(started + floor).await;
    }
}

/// Redraws a block of lines in place with ANSI cursor movement.
pub struct TerminalRenderer<W: Write> {
    out: W,
    height: usize,
}

impl<W: Write> TerminalRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out, height: 0 }
    }
}

impl TerminalRenderer<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> Renderer for TerminalRenderer<W> {
    fn render(&mut self, subs: &[Submission], first: bool) -> anyhow::Result<()> {
        if !first && self.height > 0 {
            write!(self.out, "\x1b[{}A", self.height)?;
        }
        for s in subs {
            writeln!(self.out, "\x1b[2K{}", s.render_line())?;
        }
        for _ in subs.len()..self.height {
            writeln!(self.out, "\x1b[2K")?;
        }
        self.height = self.height.max(subs.len());
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Scripted {
        snapshots: Mutex<Vec<anyhow::Result<Vec<Submission>>>>,
        polled_at: Mutex<Vec<Instant>>,
    }

    impl Scripted {
        fn new(snapshots: Vec<anyhow::Result<Vec<Submission>>>) -> Self {
            let mut snapshots = snapshots;
            snapshots.reverse();
            Self {
                snapshots: Mutex::new(snapshots),
                polled_at: Mutex::new(vec![]),
            }
        }
    }

    #[async_trait]
    impl SubmissionSource for Scripted {
        async fn fetch_submissions(&self, _url: &str) -> anyhow::Result<Vec<Submission>> {
            self.polled_at.lock().unwrap().push(Instant::now());
            self.snapshots
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(anyhow::anyhow!("polled past the script")))
        }
    }

    #[derive(Default)]
    struct Recorder {
        frames: Vec<(usize, bool)>,
    }

    impl Renderer for Recorder {
        fn render(&mut self, subs: &[Submission], first: bool) -> anyhow::Result<()> {
            self.frames.push((subs.len(), first));
            Ok(())
        }
    }

    fn sub(id: u64, status: &str) -> Submission {
        Submission {
            id,
            contest_id: "1".into(),
            problem_index: "A".into(),
            status: status.into(),
            ..Default::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_on_first_all_terminal_snapshot() {
        let source = Scripted::new(vec![
            Ok(vec![sub(2, "In queue"), sub(1, "Accepted")]),
            Ok(vec![sub(2, "Running on test 3"), sub(1, "Accepted")]),
            Ok(vec![sub(2, "Wrong answer on test 4"), sub(1, "Accepted")]),
        ]);
        let mut rec = Recorder::default();
        let subs = watch(&source, "u", None, &mut rec, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(subs[0].status, "Wrong answer on test 4");
        assert_eq!(rec.frames, vec![(2, true), (2, false), (2, false)]);
        assert_eq!(source.polled_at.lock().unwrap().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_no_faster_than_floor() {
        let source = Scripted::new(vec![
            Ok(vec![sub(1, "TESTING")]),
            Ok(vec![sub(1, "TESTING")]),
            Ok(vec![sub(1, "OK")]),
        ]);
        let mut rec = Recorder::default();
        watch(&source, "u", Some(1), &mut rec, Duration::from_secs(1))
            .await
            .unwrap();
        let at = source.polled_at.lock().unwrap();
        for pair in at.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_secs(1));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_count_limits_observed_rows() {
        let source = Scripted::new(vec![Ok(vec![
            sub(3, "Accepted"),
            sub(2, "Accepted"),
            sub(1, "Running on test 1"),
        ])]);
        let mut rec = Recorder::default();
        let subs = watch(&source, "u", Some(2), &mut rec, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(subs.len(), 2);

        let source = Scripted::new(vec![Ok(vec![sub(1, "Accepted")])]);
        let subs = watch(&source, "u", Some(5), &mut rec, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(subs.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_error_aborts() {
        let source = Scripted::new(vec![
            Ok(vec![sub(1, "Pending")]),
            Err(crate::error::Error::SessionExpired.into()),
        ]);
        let mut rec = Recorder::default();
        let err = watch(&source, "u", None, &mut rec, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(crate::error::is_session_expired(&err));
    }

    #[test]
    fn test_terminal_renderer_redraws_in_place() {
        let mut r = TerminalRenderer::new(Vec::<u8>::new());
        r.render(&[sub(1, "Pending")], true).unwrap();
        r.render(&[sub(1, "Accepted")], false).unwrap();
        let out = String::from_utf8(r.out).unwrap();
        assert_eq!(out.matches("\x1b[1A").count(), 1);
        assert!(out.contains("Accepted"));
    }
}
