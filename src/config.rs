//! Tunables of the interpreter.

/// Prompt written before every read.
pub const DEFAULT_PROMPT: &str = "$ ";
/// Size of the line buffer; lines keep at most `DEFAULT_MAX_LINE - 1` bytes.
pub const DEFAULT_MAX_LINE: usize = 1024;
/// Size of the argument vector; commands keep at most `DEFAULT_MAX_ARGS - 1` words.
pub const DEFAULT_MAX_ARGS: usize = 64;

/// Settings shared by the read loop and the line parser.
///
/// Both limits are enforced silently: excess bytes and excess words are dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub prompt: String,
    pub max_line: usize,
    pub max_args: usize,
    /// Print every launched command and the status it was reaped with to stderr.
    pub trace: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            prompt: DEFAULT_PROMPT.to_string(),
            max_line: DEFAULT_MAX_LINE,
            max_args: DEFAULT_MAX_ARGS,
            trace: false,
        }
    }
}
