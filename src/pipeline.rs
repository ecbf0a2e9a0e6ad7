use crate::external::{self, Argv, ChildError};
use anyhow::Result;
use nix::fcntl::OFlag;
use nix::sys::wait::WaitStatus;
use nix::unistd::{self, Pid};
use std::os::fd::{AsRawFd, OwnedFd, RawFd};

/// Runs `stages` concurrently, each one's standard output feeding the next one's
/// standard input, and waits until every stage has exited.
///
/// One anonymous pipe connects each pair of neighbouring stages. Pipes are
/// created close-on-exec: a stage only keeps the copies made on its standard
/// streams, and the interpreter closes its own ends as soon as all stages are
/// forked so the last reader sees end-of-stream when the writer exits.
///
/// Statuses are returned in stage order. If a fork fails, the stages already
/// started are still waited for before the error is returned.
pub fn run_pipeline(stages: &[Vec<&str>]) -> Result<Vec<WaitStatus>> {
    let argvs = stages
        .iter()
        .map(|argv| Argv::new(argv))
        .collect::<Result<Vec<_>>>()?;

    let mut pipes: Vec<(OwnedFd, OwnedFd)> = Vec::new();
    for _ in 1..argvs.len() {
        let pipe = unistd::pipe2(OFlag::O_CLOEXEC)
            .map_err(|errno| external::os_error("pipe", errno))?;
        pipes.push(pipe);
    }
    let pipe_fds: Vec<RawFd> = pipes
        .iter()
        .flat_map(|(read, write)| [read.as_raw_fd(), write.as_raw_fd()])
        .collect();

    let mut children: Vec<Pid> = Vec::with_capacity(argvs.len());
    let mut spawn_error = None;
    for (i, argv) in argvs.iter().enumerate() {
        let stdin = i.checked_sub(1).map(|prev| pipes[prev].0.as_raw_fd());
        let stdout = pipes.get(i).map(|(_, write)| write.as_raw_fd());
        match external::spawn(|| {
            connect_stage(stdin, stdout, &pipe_fds)?;
            external::exec(argv)
        }) {
            Ok(pid) => children.push(pid),
            Err(e) => {
                spawn_error = Some(e);
                break;
            }
        }
    }

    // the interpreter holds no end of any pipe while it waits
    drop(pipes);

    let statuses = wait_all(&children);
    match spawn_error {
        Some(e) => Err(e),
        None => statuses,
    }
}

/// Waits for every pid in `children`, even after one of the waits fails.
///
/// The first failure is returned once all of them have been waited for.
fn wait_all(children: &[Pid]) -> Result<Vec<WaitStatus>> {
    let mut statuses = Vec::with_capacity(children.len());
    let mut first_error = None;
    for &pid in children {
        match external::wait_for(pid) {
            Ok(status) => statuses.push(status),
            Err(e) => {
                first_error.get_or_insert(e);
            }
        }
    }
    match first_error {
        Some(e) => Err(e),
        None => Ok(statuses),
    }
}

/// Wires a forked stage to its pipes and closes every pipe descriptor it inherited.
fn connect_stage(
    stdin: Option<RawFd>,
    stdout: Option<RawFd>,
    pipe_fds: &[RawFd],
) -> Result<(), ChildError> {
    if let Some(fd) = stdin {
        unistd::dup2(fd, libc::STDIN_FILENO).map_err(ChildError::on("dup2"))?;
    }
    if let Some(fd) = stdout {
        unistd::dup2(fd, libc::STDOUT_FILENO).map_err(ChildError::on("dup2"))?;
    }
    for &fd in pipe_fds.iter().filter(|&&fd| fd > libc::STDERR_FILENO) {
        let _ = unistd::close(fd);
    }
    Ok(())
}
