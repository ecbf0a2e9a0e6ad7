use argh::FromArgs;
use minish::{Config, EditorSource, Interpreter, LineSource, PlainSource, default_builtins};
use std::io::IsTerminal;
use std::process::ExitCode;

#[derive(FromArgs)]
/// A minimal interactive command interpreter.
struct ShellArgs {
    #[argh(option, default = "minish::config::DEFAULT_PROMPT.to_string()")]
    /// text written before every input line
    prompt: String,

    #[argh(option, default = "minish::config::DEFAULT_MAX_LINE")]
    /// input line buffer size; longer lines are truncated
    max_line: usize,

    #[argh(option, default = "minish::config::DEFAULT_MAX_ARGS")]
    /// argument vector size; extra words are dropped
    max_args: usize,

    #[argh(switch)]
    /// print each command and how its processes ended to stderr
    trace: bool,

    #[argh(switch)]
    /// read plain lines even when stdin is a terminal
    no_editor: bool,
}

impl ShellArgs {
    fn config(&self) -> Config {
        Config {
            prompt: self.prompt.clone(),
            max_line: self.max_line,
            max_args: self.max_args,
            trace: self.trace,
        }
    }
}

fn line_source(no_editor: bool) -> anyhow::Result<Box<dyn LineSource>> {
    if !no_editor && std::io::stdin().is_terminal() {
        return Ok(Box::new(EditorSource::new()?));
    }
    Ok(Box::new(PlainSource::new(
        std::io::stdin().lock(),
        std::io::stdout(),
    )))
}

fn main() -> ExitCode {
    let args: ShellArgs = argh::from_env();
    let mut sh = Interpreter::new(args.config(), default_builtins());

    let result = line_source(args.no_editor).and_then(|mut source| sh.repl(source.as_mut()));
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("minish: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
