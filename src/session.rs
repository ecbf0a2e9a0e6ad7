/// Interpreter state that outlives a single command line.
///
/// The session holds:
/// - `last_command`: the most recently accepted non-empty line, overwritten on
///   every iteration of the read loop.
/// - `should_exit`: set by the `exit` builtin; the read loop stops once it sees it.
///
/// Only the interpreter records lines; builtins may request an exit.
#[derive(Debug, Clone, Default)]
pub struct Session {
    last_command: Option<String>,
    should_exit: bool,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `line` as the last accepted command, replacing any previous one.
    pub fn record(&mut self, line: &str) {
        match &mut self.last_command {
            Some(last) => {
                last.clear();
                last.push_str(line);
            }
            None => self.last_command = Some(line.to_owned()),
        }
    }

    /// The most recently accepted line, if any.
    pub fn last_command(&self) -> Option<&str> {
        self.last_command.as_deref()
    }

    /// Ask the read loop to stop after the current line.
    pub fn request_exit(&mut self) {
        self.should_exit = true;
    }

    pub fn should_exit(&self) -> bool {
        self.should_exit
    }
}
