//! Launching external programs: fork, redirect, exec, wait.
//!
//! Every child is created with [`spawn`], which runs a preparation closure in the
//! forked process and replaces the image with `execvp`. Whatever goes wrong in the
//! child is reported on its standard error and ends the child with status 1; the
//! interpreter process is never affected.

use crate::parser::Redirection;
use anyhow::{Result, anyhow};
use nix::errno::Errno;
use nix::fcntl::{self, OFlag};
use nix::sys::stat::Mode;
use nix::sys::wait::{WaitStatus, waitpid};
use nix::unistd::{self, ForkResult, Pid};
use std::convert::Infallible;
use std::ffi::{CStr, CString};
use std::io::Write;
use std::os::fd::RawFd;

/// Permission bits for files created by `>`.
const OUTPUT_MODE: libc::mode_t = 0o644;

/// Exit status of a child that could not set itself up or exec.
const CHILD_FAILURE: i32 = 1;

/// An argument vector in the form `execvp` expects.
///
/// Conversion happens in the parent so that a forked child only has to hand
/// ready-made C strings to the kernel.
#[derive(Debug)]
pub(crate) struct Argv {
    args: Vec<CString>,
}

impl Argv {
    pub(crate) fn new(argv: &[&str]) -> Result<Self> {
        if argv.is_empty() {
            return Err(anyhow!("missing command name"));
        }
        let args = argv
            .iter()
            .map(|arg| to_cstring(arg))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { args })
    }

    fn program(&self) -> &CStr {
        &self.args[0]
    }
}

fn to_cstring(s: &str) -> Result<CString> {
    CString::new(s).map_err(|_| anyhow!("{}: argument contains a NUL byte", s.escape_debug()))
}

/// An OS call that failed inside a forked child.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ChildError {
    call: &'static str,
    errno: Errno,
}

impl ChildError {
    pub(crate) fn on(call: &'static str) -> impl Fn(Errno) -> ChildError {
        move |errno| ChildError { call, errno }
    }

    /// Reports the failure like `perror` and ends the child without running any
    /// of the parent's cleanup.
    fn exit(self) -> ! {
        let _ = writeln!(std::io::stderr(), "{}: {}", self.call, self.errno.desc());
        // SAFETY: `_exit` ends the process at once and touches no Rust state.
        unsafe { libc::_exit(CHILD_FAILURE) }
    }
}

/// Error for an OS call that failed in the interpreter process.
pub(crate) fn os_error(call: &str, errno: Errno) -> anyhow::Error {
    anyhow!("{}: {}", call, errno.desc())
}

/// Retries `f` while it is interrupted by a signal.
fn syscall<T>(mut f: impl FnMut() -> nix::Result<T>) -> nix::Result<T> {
    loop {
        match f() {
            Err(Errno::EINTR) => (),
            result => return result,
        }
    }
}

/// Forks a child that runs `in_child` and never returns to the caller's code.
///
/// `in_child` is expected to end in [`exec`]; if it returns an error instead, the
/// child reports it and exits with status 1. In the parent the child's pid is
/// returned; a failed fork is reported as `fork: <reason>`.
pub(crate) fn spawn<F>(in_child: F) -> Result<Pid>
where
    F: FnOnce() -> Result<Infallible, ChildError>,
{
    // SAFETY: the child only performs async-signal-safe calls (open, dup2, close,
    // execvp) on data prepared before the fork, apart from the final error report.
    match unsafe { unistd::fork() } {
        Ok(ForkResult::Parent { child }) => Ok(child),
        Ok(ForkResult::Child) => match in_child() {
            Ok(never) => match never {},
            Err(e) => e.exit(),
        },
        Err(errno) => Err(os_error("fork", errno)),
    }
}

/// Replaces the current process image with `argv[0]`, searched for in `PATH`.
pub(crate) fn exec(argv: &Argv) -> Result<Infallible, ChildError> {
    unistd::execvp(argv.program(), &argv.args).map_err(ChildError::on("execvp"))
}

/// Makes `target` refer to what `fd` refers to and closes `fd`.
pub(crate) fn replace_fd(fd: RawFd, target: RawFd) -> Result<(), ChildError> {
    if fd == target {
        return Ok(());
    }
    unistd::dup2(fd, target).map_err(ChildError::on("dup2"))?;
    unistd::close(fd).map_err(ChildError::on("close"))
}

/// Blocks until `pid` terminates and returns how it ended.
pub(crate) fn wait_for(pid: Pid) -> Result<WaitStatus> {
    syscall(|| waitpid(pid, None)).map_err(|errno| os_error("waitpid", errno))
}

/// Short human-readable form of a wait status, used for tracing.
pub(crate) fn describe_status(status: &WaitStatus) -> String {
    match status {
        WaitStatus::Exited(pid, code) => format!("{} exited with status {}", pid, code),
        WaitStatus::Signaled(pid, signal, _) => {
            format!("{} killed by {}", pid, signal.as_str())
        }
        other => format!("{:?}", other),
    }
}

/// Redirection targets converted before forking.
struct RedirectPaths {
    input: Option<CString>,
    output: Option<CString>,
}

impl RedirectPaths {
    fn new(redirection: &Redirection<'_>) -> Result<Self> {
        Ok(Self {
            input: redirection.input.map(to_cstring).transpose()?,
            output: redirection.output.map(to_cstring).transpose()?,
        })
    }

    /// Points the child's standard streams at the redirection targets.
    ///
    /// Output goes first, then input. Both are in place before the exec.
    fn apply(&self) -> Result<(), ChildError> {
        if let Some(path) = &self.output {
            let fd = fcntl::open(
                path.as_c_str(),
                OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_TRUNC,
                Mode::from_bits_truncate(OUTPUT_MODE),
            )
            .map_err(ChildError::on("open"))?;
            replace_fd(fd, libc::STDOUT_FILENO)?;
        }
        if let Some(path) = &self.input {
            let fd = fcntl::open(path.as_c_str(), OFlag::O_RDONLY, Mode::empty())
                .map_err(ChildError::on("open"))?;
            replace_fd(fd, libc::STDIN_FILENO)?;
        }
        Ok(())
    }
}

/// Runs one external program to completion.
///
/// The child applies `redirection` and execs `argv[0]` with `argv` as its
/// arguments; the parent waits for that child only. Failures to open a
/// redirection target or to find the program end the child with status 1 and
/// still return `Ok` here: the `Err` case means nothing was launched.
pub fn run_foreground(argv: &[&str], redirection: &Redirection<'_>) -> Result<WaitStatus> {
    let argv = Argv::new(argv)?;
    let paths = RedirectPaths::new(redirection)?;
    let pid = spawn(|| {
        paths.apply()?;
        exec(&argv)
    })?;
    wait_for(pid)
}
