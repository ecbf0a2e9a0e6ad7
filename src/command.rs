use crate::session::Session;
use anyhow::Result;
use std::io::Write;

/// Object-safe trait for a command that runs inside the interpreter process.
///
/// Builtins exist for operations whose effect must be visible to the interpreter
/// itself (working directory, session state), so they are never forked. The
/// default set is returned by [`crate::default_builtins`]; embedders can add
/// their own by implementing this trait.
pub trait Builtin {
    /// Name the command is invoked by, e.g. "cd".
    fn name(&self) -> &'static str;

    /// Runs the command with `args` (the words after the name).
    ///
    /// An `Err` is a user-facing failure of the command; its message is printed
    /// on standard error by the dispatcher and the command still counts as handled.
    fn run(&self, args: &[&str], session: &mut Session, stdout: &mut dyn Write) -> Result<()>;
}

/// Runs `argv` if its first word names one of `builtins`.
///
/// Returns `true` when the command was recognized (whether or not it succeeded)
/// and `false` when it should be launched as an external program.
pub fn dispatch(
    builtins: &[Box<dyn Builtin>],
    argv: &[&str],
    session: &mut Session,
    stdout: &mut dyn Write,
    stderr: &mut dyn Write,
) -> bool {
    let Some((name, args)) = argv.split_first() else {
        return false;
    };
    let Some(builtin) = builtins.iter().find(|b| b.name() == *name) else {
        return false;
    };
    if let Err(e) = builtin.run(args, session, stdout) {
        let _ = writeln!(stderr, "{:#}", e);
    }
    let _ = stdout.flush();
    true
}
