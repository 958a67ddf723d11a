#![allow(dead_code)]
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Output, Stdio};

use anyhow::{bail, Context, Result};

pub struct Helper {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

fn command(args: &[&str]) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_slink-helper"));
    cmd.args(args)
        .env_remove("SLINK_HELPER_CONFIG")
        .env_remove("SLINK_HELPER_PASSWORD")
        .env("RUST_LOG", "warn")
        .stderr(Stdio::null());
    cmd
}

pub fn slink_helper_dev(mut fx: impl FnMut(&mut Helper) -> Result<()>) -> Result<()> {
    slink_helper(&["--dev"], |h| fx(h))
}

pub fn slink_helper(args: &[&str], mut fx: impl FnMut(&mut Helper) -> Result<()>) -> Result<()> {
    let mut child = command(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()?;
    let stdin = child.stdin.take().context("helper stdin must be piped")?;
    let stdout = BufReader::new(child.stdout.take().context("helper stdout must be piped")?);
    let mut helper = Helper {
        child,
        stdin,
        stdout,
    };

    println!("-- ready to talk to the helper --");
    let result = fx(&mut helper);
    println!("-- test teardown --");

    // Closing stdin is how the proxy asks a helper to leave
    let Helper {
        mut child,
        stdin,
        mut stdout,
    } = helper;
    drop(stdin);
    let mut rest = String::new();
    std::io::Read::read_to_string(&mut stdout, &mut rest)?;
    let status = child.wait().context("helper should exit once stdin is closed")?;

    result?;
    if !rest.is_empty() {
        bail!("helper wrote unexpected output after the last request: {:?}", rest);
    }
    if !status.success() {
        bail!("helper exited with {}", status);
    }
    Ok(())
}

impl Helper {
    /// Send one request and wait for its verdict
    pub fn request(&mut self, line: &str) -> Result<String> {
        self.stdin.write_all(line.as_bytes())?;
        self.stdin.write_all(b"\n")?;
        self.stdin.flush()?;

        let mut verdict = String::new();
        let n = self.stdout.read_line(&mut verdict)?;
        if n == 0 {
            bail!("helper closed its stdout");
        }
        Ok(verdict)
    }
}

/// Feed the whole input at once, then close stdin
pub fn transcript(args: &[&str], input: &str) -> Result<Output> {
    let mut child = command(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()?;
    child
        .stdin
        .take()
        .context("helper stdin must be piped")?
        .write_all(input.as_bytes())?;
    Ok(child.wait_with_output()?)
}

pub fn run(args: &[&str], envs: &[(&str, &str)]) -> Result<Output> {
    let mut cmd = command(args);
    for (k, v) in envs {
        cmd.env(k, v);
    }
    Ok(cmd.stdin(Stdio::null()).output()?)
}

pub fn scratch_file(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("slink-helper-{}-{}", std::process::id(), name))
}

pub fn write_file(path: &Path, content: &str) -> Result<()> {
    std::fs::write(path, content).context(format!("unable to write {:?}", path))
}
