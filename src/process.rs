use indicatif::{ProgressBar, ProgressDrawTarget};
use libc::c_int;
use std::ffi::OsString;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::os::fd::FromRawFd;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Duration;

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LineAction {
    Continue,
    Kill,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Outcome {
    Completed,
    Killed,
}

pub(crate) fn run<F>(
    program: &Path,
    args: &[OsString],
    label: &str,
    verbose: bool,
    accept: &[i32],
    mut on_line: F,
) -> Result<Outcome>
where
    F: FnMut(&str) -> LineAction,
{
    // One pipe serves as both stdout and stderr of the child so lines
    // arrive in the order the tool emitted them.
    let mut fds: [c_int; 2] = [0; 2];
    if unsafe { libc::pipe2(fds.as_mut_ptr(), libc::O_CLOEXEC) } != 0 {
        return Err(Error::Environment(
            "failed to create output pipe".to_string(),
        ));
    }
    let stderr_fd = unsafe { libc::dup(fds[1]) };
    if stderr_fd == -1 {
        unsafe {
            libc::close(fds[0]);
            libc::close(fds[1]);
        }
        return Err(Error::Environment(
            "failed to duplicate output pipe".to_string(),
        ));
    }

    let command_name = program.display().to_string();
    let spawned = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(unsafe { Stdio::from_raw_fd(fds[1]) })
        .stderr(unsafe { Stdio::from_raw_fd(stderr_fd) })
        .spawn();
    let mut child = match spawned {
        Ok(child) => child,
        Err(err) => {
            unsafe {
                libc::close(fds[0]);
            }
            return Err(Error::Environment(format!(
                "failed to launch {}: {}",
                command_name, err
            )));
        }
    };

    let reader = BufReader::new(unsafe { File::from_raw_fd(fds[0]) });
    let spinner = if verbose { None } else { Some(make_spinner(label)) };

    let mut buffered = Vec::new();
    let mut killed = false;
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(_) => break,
        };
        if verbose {
            log::debug!("{}", line);
        }
        if !killed && on_line(&line) == LineAction::Kill {
            let _ = child.kill();
            killed = true;
        }
        buffered.push(line);
    }

    let status = child
        .wait()
        .map_err(|err| Error::io(format!("failed to wait for {}", command_name), err))?;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    if killed {
        return Ok(Outcome::Killed);
    }
    match status.code() {
        Some(code) if accept.contains(&code) => Ok(Outcome::Completed),
        code => Err(Error::Process {
            command: command_name,
            code,
            output: if verbose {
                None
            } else {
                Some(buffered.join("\n"))
            },
        }),
    }
}

fn make_spinner(label: &str) -> ProgressBar {
    let pb = ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr_with_hz(10));
    pb.set_message(label.to_string());
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}
