use crate::error::Error;
use anyhow::anyhow;
use std::io::Read;
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::MissedTickBehavior;
use wait4::{ResUse, Wait4};

pub const SAMPLE_EVERY: Duration = Duration::from_millis(1);

#[derive(Debug)]
pub struct Usage {
    pub status: ExitStatus,
    pub cpu_time: Duration,
    pub peak_memory: u64,
    pub stdout: Vec<u8>,
}

/// Resident set size of `pid` in bytes, if the kernel still reports it.
pub fn read_rss(pid: u32) -> Option<u64> {
    let status = std::fs::read_to_string(format!("/proc/{}/status", pid)).ok()?;
    let line = status.lines().find(|l| l.starts_with("VmRSS:"))?;
    let kb: u64 = line
        .trim_start_matches("VmRSS:")
        .trim()
        .trim_end_matches("kB")
        .trim()
        .parse()
        .ok()?;
    Some(kb * 1024)
}

/// Runs `argv` with `input` as stdin, capturing stdout while stderr goes
/// straight to the terminal. Memory is sampled until the exit notification
/// arrives. There is no time limit: a program that never exits blocks here.
pub async fn run(argv: &[String], input: &Path, sample_every: Duration) -> anyhow::Result<Usage> {
    let Some((program, args)) = argv.split_first() else {
        return Err(anyhow!("empty command"));
    };
    let stdin = std::fs::File::open(input)
        .map_err(|e| anyhow!("open {}: {}", input.display(), e))?;

    let mut child = Command::new(program)
        .args(args)
        .stdin(stdin)
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .spawn()
        .map_err(|e| Error::RuntimeFailure(format!("cannot start {}: {}", program, e)))?;
    let pid = child.id();

    let (done_tx, mut done_rx) = oneshot::channel::<std::io::Result<(Vec<u8>, ResUse)>>();
    tokio::task::spawn_blocking(move || {
        let res = (|| -> std::io::Result<(Vec<u8>, ResUse)> {
            let mut stdout = vec![];
            if let Some(mut pipe) = child.stdout.take() {
                pipe.read_to_end(&mut stdout)?;
            }
            let usage = child.wait4()?;
            Ok((stdout, usage))
        })();
        let _ = done_tx.send(res);
    });

    let mut peak = 0u64;
    let mut ticker = tokio::time::interval(sample_every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let finished = loop {
        tokio::select! {
            res = &mut done_rx => break res,
            _ = ticker.tick() => {
                if let Some(rss) = read_rss(pid) {
                    peak = peak.max(rss);
                }
            }
        }
    };
    let (stdout, usage) = finished.map_err(|_| anyhow!("monitor of pid {} vanished", pid))??;

    if peak == 0 {
        peak = usage.rusage.maxrss;
    }
    Ok(Usage {
        status: usage.status,
        cpu_time: usage.rusage.utime + usage.rusage.stime,
        peak_memory: peak,
        stdout,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn argv(s: &str) -> Vec<String> {
        shlex::split(s).unwrap()
    }

    #[tokio::test]
    async fn test_run_captures_stdout() {
        let mut input = tempfile::NamedTempFile::new().unwrap();
        write!(input, "hello\n").unwrap();
        let usage = run(&argv("cat"), input.path(), SAMPLE_EVERY).await.unwrap();
        assert!(usage.status.success());
        assert_eq!(usage.stdout, b"hello\n");
    }

    #[tokio::test]
    async fn test_run_reports_exit_code() {
        let input = tempfile::NamedTempFile::new().unwrap();
        let usage = run(&argv("sh -c 'exit 3'"), input.path(), SAMPLE_EVERY)
            .await
            .unwrap();
        assert_eq!(usage.status.code(), Some(3));
    }

    #[tokio::test]
    async fn test_spawn_failure() {
        let input = tempfile::NamedTempFile::new().unwrap();
        let err = run(&argv("/nonexistent/binary"), input.path(), SAMPLE_EVERY)
            .await
            .unwrap_err();
        assert!(matches!(Error::of(&err), Some(Error::RuntimeFailure(_))));
    }

    #[test]
    fn test_read_rss_of_self() {
        if cfg!(target_os = "linux") {
            assert!(read_rss(std::process::id()).unwrap() > 0);
        }
    }
}
