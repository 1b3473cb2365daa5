pub mod client;
pub mod error;
pub mod global;
pub mod judge;
pub mod retrieval;
pub mod submission;
pub mod watcher;

use anyhow::anyhow;
use client::{Client, Info};
use global::{constant, Config};
use std::path::PathBuf;
use std::str::FromStr;
use watcher::TerminalRenderer;

const USAGE: &str = "usage: cf-clone <config.json> <command>
  <contestId> is a contest or gym id, or <groupId>/<contestId>
  watch  <contestId> [count|all]
  submit <contestId> <index> <programTypeId> <file>
  pull   <contestId> <submissionId>
  parse  <contestId> <index>
  clone  <handle> [ac]
  test   <dir> <command...>";

fn arg(args: &[String], i: usize) -> anyhow::Result<&str> {
    args.get(i)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("missing argument\n{}", USAGE))
}

fn locate(config: &Config, contest: &str, problem_id: &str) -> Info {
    Info::from_contest_arg(contest, problem_id).with_root(&config.root)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let config_path = args
        .get(1)
        .map(|p| PathBuf::from_str(p))
        .transpose()?
        .unwrap_or_else(|| PathBuf::from(constant::CONFIG_FILE));
    let log_path = std::env::var_os("CF_CLONE_LOG").map(PathBuf::from);
    global::init_logger(log_path.as_deref(), "info")?;

    let config = Config::load(&config_path).await?;
    let command = arg(&args, 2)?;

    if command == "test" {
        let dir = PathBuf::from(arg(&args, 3)?);
        arg(&args, 4)?;
        let command = if args.len() == 5 {
            args[4].clone()
        } else {
            shlex::try_join(args[4..].iter().map(String::as_str))?
        };
        let results = judge::judge_dir(&command, &dir).await?;
        for res in &results {
            match res {
                Ok(r) => {
                    println!("{}", r.summary());
                    if let judge::Outcome::Mismatch(m) = &r.outcome {
                        print!("{}", m);
                    }
                }
                Err(e) => println!("{}", e),
            }
        }
        return Ok(());
    }

    let client = Client::connect(config.clone())?;
    match command {
        "watch" => {
            let info = locate(&config, arg(&args, 3)?, "");
            let count = match args.get(4).map(String::as_str) {
                Some("all") => None,
                Some(n) => Some(n.parse()?),
                None => Some(10),
            };
            client.watch(&info, count, &mut TerminalRenderer::stdout()).await?;
        }
        "submit" => {
            let info = locate(&config, arg(&args, 3)?, arg(&args, 4)?);
            let source = tokio::fs::read_to_string(arg(&args, 6)?).await?;
            let done = client
                .submit(&info, arg(&args, 5)?, &source, &mut TerminalRenderer::stdout())
                .await?;
            println!("{}", done.hint());
        }
        "pull" => {
            let info = locate(&config, arg(&args, 3)?, "").with_submission(arg(&args, 4)?);
            let path = client.pull(&info).await?;
            println!("{}", path.display());
        }
        "parse" => {
            let info = locate(&config, arg(&args, 3)?, arg(&args, 4)?);
            let n = client.parse_samples(&info).await?;
            println!("{} samples in {}", n, info.problem_dir().display());
        }
        "clone" => {
            let ac_only = args.get(4).map(|a| a == "ac").unwrap_or(false);
            let report = client.clone_history(arg(&args, 3)?, ac_only).await?;
            println!("{:#?}", report);
        }
        _ => return Err(anyhow!("unknown command {:?}\n{}", command, USAGE)),
    }
    Ok(())
}
