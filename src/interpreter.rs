use crate::builtin::default_builtins;
use crate::command::{self, Builtin};
use crate::config::Config;
use crate::external::{self, describe_status};
use crate::io_adapters::LineSource;
use crate::lexer;
use crate::parser::{self, CommandLine, Redirection};
use crate::session::Session;
use nix::sys::wait::WaitStatus;
use std::fmt::Display;
use std::io::Write;

/// A minimal shell-like interpreter: builtins run in-process, everything else
/// is forked and exec'd, optionally with redirections or as a pipeline.
///
/// The interpreter owns the [`Session`] and a table of [`Builtin`]s. Builtin
/// output and all diagnostics go to the interpreter's own writers (standard
/// output and standard error unless replaced with [`Interpreter::with_output`]);
/// external programs inherit the process's real standard streams.
///
/// Example
/// ```
/// use minish::Interpreter;
/// let mut sh = Interpreter::default();
/// sh.execute_line("mkdir");
/// assert_eq!(sh.session().last_command(), Some("mkdir"));
/// ```
pub struct Interpreter {
    config: Config,
    session: Session,
    builtins: Vec<Box<dyn Builtin>>,
    stdout: Box<dyn Write>,
    stderr: Box<dyn Write>,
}

impl Interpreter {
    /// Create a new interpreter with a custom set of builtins.
    pub fn new(config: Config, builtins: Vec<Box<dyn Builtin>>) -> Self {
        Self {
            config,
            session: Session::new(),
            builtins,
            stdout: Box::new(std::io::stdout()),
            stderr: Box::new(std::io::stderr()),
        }
    }

    /// Replace the writers used for builtin output and diagnostics.
    pub fn with_output(mut self, stdout: Box<dyn Write>, stderr: Box<dyn Write>) -> Self {
        self.stdout = stdout;
        self.stderr = stderr;
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Reads and executes lines from `source` until it runs dry or `exit` is run.
    ///
    /// At end of input a farewell is printed. Errors from individual commands
    /// never end the loop; only a failing `source` does.
    pub fn repl(&mut self, source: &mut dyn LineSource) -> anyhow::Result<()> {
        while !self.session.should_exit() {
            match source.read_line(&self.config.prompt)? {
                Some(line) => self.execute_line(&line),
                None => {
                    writeln!(self.stdout, "\nGoodbye!")?;
                    self.stdout.flush()?;
                    break;
                }
            }
        }
        Ok(())
    }

    /// Executes one input line.
    ///
    /// Blank lines are ignored. Any other line is recorded as the session's last
    /// command, then run as a pipeline (if it contains `|`), a builtin, or an
    /// external program. Every failure is reported on the error writer.
    pub fn execute_line(&mut self, line: &str) {
        let line = lexer::truncate_line(line, self.config.max_line);
        if lexer::is_blank(line) {
            return;
        }
        self.session.record(line);

        match parser::parse_line(line, self.config.max_args) {
            Ok(CommandLine::Empty) => {}
            Ok(CommandLine::Simple { argv, redirection }) => self.run_simple(&argv, &redirection),
            Ok(CommandLine::Pipeline(stages)) => self.run_stages(&stages),
            Err(e) => self.report(e),
        }
    }

    fn run_simple(&mut self, argv: &[&str], redirection: &Redirection<'_>) {
        if self.config.trace {
            self.trace(format_simple(argv, redirection));
        }
        if command::dispatch(
            &self.builtins,
            argv,
            &mut self.session,
            &mut *self.stdout,
            &mut *self.stderr,
        ) {
            return;
        }

        let _ = self.stdout.flush();
        match external::run_foreground(argv, redirection) {
            Ok(status) => self.trace_statuses(&[status]),
            Err(e) => self.report(e),
        }
    }

    fn run_stages(&mut self, stages: &[Vec<&str>]) {
        if self.config.trace {
            self.trace(format_pipeline(stages));
        }
        let _ = self.stdout.flush();
        match crate::pipeline::run_pipeline(stages) {
            Ok(statuses) => self.trace_statuses(&statuses),
            Err(e) => self.report(e),
        }
    }

    fn report(&mut self, error: impl Display) {
        let _ = writeln!(self.stderr, "{:#}", error);
    }

    fn trace(&mut self, message: impl Display) {
        let _ = writeln!(self.stderr, "+ {}", message);
    }

    fn trace_statuses(&mut self, statuses: &[WaitStatus]) {
        if !self.config.trace {
            return;
        }
        for status in statuses {
            self.trace(format_args!("[{}]", describe_status(status)));
        }
    }
}

impl Default for Interpreter {
    /// Create an interpreter with the default configuration and the builtins
    /// `exit`, `help`, `cd` and `mkdir`.
    fn default() -> Self {
        Self::new(Config::default(), default_builtins())
    }
}

fn format_simple(argv: &[&str], redirection: &Redirection<'_>) -> String {
    let mut text = argv.join(" ");
    if let Some(input) = redirection.input {
        text.push_str(" < ");
        text.push_str(input);
    }
    if let Some(output) = redirection.output {
        text.push_str(" > ");
        text.push_str(output);
    }
    text
}

fn format_pipeline(stages: &[Vec<&str>]) -> String {
    stages
        .iter()
        .map(|argv| argv.join(" "))
        .collect::<Vec<_>>()
        .join(" | ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io_adapters::PlainSource;
    use crate::test_util::{SharedBuffer, lock_current_dir};
    use std::env as stdenv;
    use std::fs;
    use std::io::Cursor;

    fn interpreter_with(config: Config) -> (Interpreter, SharedBuffer, SharedBuffer) {
        let out = SharedBuffer::default();
        let err = SharedBuffer::default();
        let sh = Interpreter::new(config, default_builtins())
            .with_output(Box::new(out.clone()), Box::new(err.clone()));
        (sh, out, err)
    }

    fn interpreter() -> (Interpreter, SharedBuffer, SharedBuffer) {
        interpreter_with(Config::default())
    }

    #[test]
    fn test_blank_lines_are_not_recorded() {
        let (mut sh, out, err) = interpreter();
        sh.execute_line("");
        sh.execute_line("   \t  ");
        assert_eq!(sh.session().last_command(), None);
        assert!(out.contents().is_empty());
        assert!(err.contents().is_empty());
    }

    #[test]
    fn test_line_is_recorded_verbatim() {
        let (mut sh, _, _) = interpreter();
        sh.execute_line("  help   me ");
        assert_eq!(sh.session().last_command(), Some("  help   me "));
        sh.execute_line("help");
        assert_eq!(sh.session().last_command(), Some("help"));
    }

    #[test]
    fn test_help_builtin() {
        let (mut sh, out, _) = interpreter();
        sh.execute_line("help");
        assert!(out.contents().starts_with("Available commands:\n"));
    }

    #[test]
    fn test_output_redirection_end_to_end() {
        let temp = tempfile::tempdir().unwrap();
        let out_file = temp.path().join("out.txt");
        let (mut sh, _, err) = interpreter();

        sh.execute_line(&format!("echo hello > {}", out_file.display()));

        assert_eq!(fs::read_to_string(&out_file).unwrap(), "hello\n");
        assert!(err.contents().is_empty());
    }

    #[test]
    fn test_input_redirection_end_to_end() {
        let temp = tempfile::tempdir().unwrap();
        let input = temp.path().join("in.txt");
        let output = temp.path().join("out.txt");
        fs::write(&input, "3\n1\n2\n").unwrap();
        let (mut sh, _, _) = interpreter();

        sh.execute_line(&format!(
            "sort < {} > {}",
            input.display(),
            output.display()
        ));

        assert_eq!(fs::read_to_string(&output).unwrap(), "1\n2\n3\n");
    }

    #[test]
    fn test_pipeline_end_to_end() {
        let temp = tempfile::tempdir().unwrap();
        let output = temp.path().join("piped.txt");
        let (mut sh, _, err) = interpreter();

        sh.execute_line(&format!(
            "echo a b c | dd of={} status=none",
            output.display()
        ));

        assert_eq!(fs::read_to_string(&output).unwrap(), "a b c\n");
        assert!(err.contents().is_empty());
    }

    #[test]
    fn test_only_two_stages_run() {
        let temp = tempfile::tempdir().unwrap();
        let second = temp.path().join("second.txt");
        let third = temp.path().join("third.txt");
        let (mut sh, _, _) = interpreter();

        sh.execute_line(&format!(
            "echo x | dd of={} status=none | dd of={} status=none",
            second.display(),
            third.display()
        ));

        assert_eq!(fs::read_to_string(&second).unwrap(), "x\n");
        assert!(!third.exists());
    }

    #[test]
    fn test_invalid_pipeline_is_reported() {
        let (mut sh, out, err) = interpreter();
        sh.execute_line("ls |");
        assert_eq!(err.contents(), "Invalid pipe command\n");
        assert!(out.contents().is_empty());
        assert_eq!(sh.session().last_command(), Some("ls |"));
    }

    #[test]
    fn test_redirection_without_command_runs_nothing() {
        let temp = tempfile::tempdir().unwrap();
        let target = temp.path().join("never.txt");
        let (mut sh, _, err) = interpreter();

        sh.execute_line(&format!("> {}", target.display()));

        assert!(!target.exists());
        assert!(err.contents().is_empty());
    }

    #[test]
    fn test_builtin_ignores_redirection() {
        let temp = tempfile::tempdir().unwrap();
        let target = temp.path().join("help.txt");
        let (mut sh, out, _) = interpreter();

        sh.execute_line(&format!("help > {}", target.display()));

        assert!(!target.exists());
        assert!(out.contents().starts_with("Available commands:"));
    }

    #[test]
    fn test_cd_errors_leave_cwd_alone() {
        let _lock = lock_current_dir();
        let orig = stdenv::current_dir().unwrap();
        let (mut sh, _, err) = interpreter();

        sh.execute_line("cd");
        sh.execute_line("cd /nonexistent/minish/dir");

        assert_eq!(
            err.contents(),
            "cd: missing argument\ncd: No such file or directory\n"
        );
        assert_eq!(stdenv::current_dir().unwrap(), orig);
    }

    #[test]
    fn test_cd_affects_later_commands() {
        let _lock = lock_current_dir();
        let orig = stdenv::current_dir().unwrap();
        let temp = tempfile::tempdir().unwrap();
        let (mut sh, _, err) = interpreter();

        sh.execute_line(&format!("cd {}", temp.path().display()));
        sh.execute_line("mkdir made_here");
        sh.execute_line("echo relative > made_here/file.txt");

        stdenv::set_current_dir(&orig).expect("failed to restore cwd");

        assert!(err.contents().is_empty());
        assert_eq!(
            fs::read_to_string(temp.path().join("made_here/file.txt")).unwrap(),
            "relative\n"
        );
    }

    #[test]
    fn test_missing_program_does_not_stop_interpreter() {
        let temp = tempfile::tempdir().unwrap();
        let output = temp.path().join("after.txt");
        let (mut sh, _, _) = interpreter();

        sh.execute_line("minish-test-no-such-program --flag");
        sh.execute_line(&format!("echo still here > {}", output.display()));

        assert_eq!(fs::read_to_string(&output).unwrap(), "still here\n");
    }

    #[test]
    fn test_overlong_line_is_truncated() {
        let config = Config {
            max_line: 8,
            ..Config::default()
        };
        let (mut sh, out, _) = interpreter_with(config);

        sh.execute_line("help me please");

        assert_eq!(sh.session().last_command(), Some("help me"));
        assert!(out.contents().starts_with("Available commands:"));
    }

    #[test]
    fn test_trace_reports_commands_and_statuses() {
        let config = Config {
            trace: true,
            ..Config::default()
        };
        let (mut sh, _, err) = interpreter_with(config);

        sh.execute_line("true");
        sh.execute_line("sh -c exit");

        let trace = err.contents();
        assert!(trace.contains("+ true\n"), "trace was {:?}", trace);
        assert!(trace.contains("exited with status 0]"), "trace was {:?}", trace);
        assert!(trace.contains("+ sh -c exit\n"), "trace was {:?}", trace);
    }

    #[test]
    fn test_exit_with_arguments_still_exits() {
        let (mut sh, _, err) = interpreter();
        sh.execute_line("exit -f 3");
        assert!(sh.session().should_exit());
        assert!(err.contents().is_empty());
    }

    #[test]
    fn test_repl_stops_at_exit() {
        let temp = tempfile::tempdir().unwrap();
        let never = temp.path().join("never.txt");
        let script = format!("help\nexit\necho late > {}\n", never.display());
        let (mut sh, out, _) = interpreter();
        let mut prompts = Vec::new();
        let mut source = PlainSource::new(Cursor::new(script), &mut prompts);

        sh.repl(&mut source).unwrap();

        assert!(sh.session().should_exit());
        assert!(!never.exists());
        assert!(!out.contents().contains("Goodbye!"));
        drop(source);
        assert_eq!(String::from_utf8(prompts).unwrap(), "$ $ ");
    }

    #[test]
    fn test_repl_says_goodbye_at_end_of_input() {
        let (mut sh, out, _) = interpreter();
        let mut source = PlainSource::new(Cursor::new("\n  \n"), Vec::new());

        sh.repl(&mut source).unwrap();

        assert_eq!(out.contents(), "\nGoodbye!\n");
        assert_eq!(sh.session().last_command(), None);
    }
}
