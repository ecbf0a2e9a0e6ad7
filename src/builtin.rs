use crate::command::Builtin;
use crate::session::Session;
use anyhow::{Result, anyhow};
use argh::{EarlyExit, FromArgs};
use nix::sys::stat::Mode;
use nix::unistd;
use std::io::Write;
use std::marker::PhantomData;

/// Permission bits for directories created by `mkdir`.
const MKDIR_MODE: libc::mode_t = 0o755;

/// Usage summary printed by `help`.
const HELP_TEXT: &str = "\
Available commands:
 help - Show this help message
 exit - Exit the shell
 cd <dir> - Change directory
 mkdir <dir> - Create directory
 !! - Repeat last command
";

/// Built-in commands known to the shell at compile time.
///
/// Builtins are parsed using the [`argh`] crate (`FromArgs`) and executed directly
/// in-process without spawning a child process.
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Canonical name of the command, e.g. "mkdir" or "cd".
    fn name() -> &'static str;

    /// Executes the command against the session, writing output to `stdout`.
    fn execute(self, stdout: &mut dyn Write, session: &mut Session) -> Result<()>;
}

/// Adapts a [`BuiltinCommand`] type to the object-safe [`Builtin`] trait.
pub(crate) struct Factory<T> {
    _phantom: PhantomData<T>,
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Self {
            _phantom: PhantomData,
        }
    }
}

impl<T: BuiltinCommand> Builtin for Factory<T> {
    fn name(&self) -> &'static str {
        T::name()
    }

    fn run(&self, args: &[&str], session: &mut Session, stdout: &mut dyn Write) -> Result<()> {
        // only a lone `--help` is an option; any other word is an operand as given
        let parsed = if args == ["--help"] {
            T::from_args(&[T::name()], args)
        } else {
            let operands: Vec<&str> = std::iter::once("--")
                .chain(args.iter().copied())
                .collect();
            T::from_args(&[T::name()], &operands)
        };
        match parsed {
            Ok(cmd) => cmd.execute(stdout, session),
            // `--help` lands here with a successful status
            Err(EarlyExit {
                output,
                status: Ok(()),
            }) => {
                stdout.write_all(output.as_bytes())?;
                Ok(())
            }
            Err(EarlyExit {
                output,
                status: Err(()),
            }) => Err(anyhow!("{}: {}", T::name(), output.trim_end())),
        }
    }
}

/// The builtins every interpreter starts with: `exit`, `help`, `cd` and `mkdir`.
pub fn default_builtins() -> Vec<Box<dyn Builtin>> {
    vec![
        Box::new(Factory::<Exit>::default()),
        Box::new(Factory::<Help>::default()),
        Box::new(Factory::<Cd>::default()),
        Box::new(Factory::<Mkdir>::default()),
    ]
}

#[derive(FromArgs)]
/// Exit the shell with status 0.
pub struct Exit {
    #[argh(positional, greedy)]
    /// ignored
    pub _args: Vec<String>,
}

impl BuiltinCommand for Exit {
    fn name() -> &'static str {
        "exit"
    }

    fn execute(self, _stdout: &mut dyn Write, session: &mut Session) -> Result<()> {
        session.request_exit();
        Ok(())
    }
}

#[derive(FromArgs)]
/// Show the list of available commands.
pub struct Help {
    #[argh(positional, greedy)]
    /// ignored
    pub _args: Vec<String>,
}

impl BuiltinCommand for Help {
    fn name() -> &'static str {
        "help"
    }

    fn execute(self, stdout: &mut dyn Write, _session: &mut Session) -> Result<()> {
        stdout.write_all(HELP_TEXT.as_bytes())?;
        Ok(())
    }
}

#[derive(FromArgs)]
/// Change the current working directory of the shell.
pub struct Cd {
    #[argh(positional, greedy)]
    /// directory to switch to; words after the first are ignored.
    pub args: Vec<String>,
}

impl BuiltinCommand for Cd {
    fn name() -> &'static str {
        "cd"
    }

    fn execute(self, _stdout: &mut dyn Write, _session: &mut Session) -> Result<()> {
        let target = self
            .args
            .first()
            .ok_or_else(|| anyhow!("cd: missing argument"))?;
        unistd::chdir(target.as_str()).map_err(|errno| anyhow!("cd: {}", errno.desc()))
    }
}

#[derive(FromArgs)]
/// Create a directory with mode 0755.
pub struct Mkdir {
    #[argh(positional, greedy)]
    /// directory to create; words after the first are ignored.
    pub args: Vec<String>,
}

impl BuiltinCommand for Mkdir {
    fn name() -> &'static str {
        "mkdir"
    }

    fn execute(self, _stdout: &mut dyn Write, _session: &mut Session) -> Result<()> {
        let target = self
            .args
            .first()
            .ok_or_else(|| anyhow!("mkdir: missing argument"))?;
        unistd::mkdir(target.as_str(), Mode::from_bits_truncate(MKDIR_MODE))
            .map_err(|errno| anyhow!("mkdir: {}", errno.desc()))
    }
}
