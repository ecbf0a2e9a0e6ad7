use anyhow::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::io::{BufRead, Write};

/// Where the read loop gets its lines from.
pub trait LineSource {
    /// Shows `prompt` and reads one line without its trailing newline.
    ///
    /// Returns `Ok(None)` once the input is exhausted.
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>>;
}

/// Interactive source backed by rustyline, with in-memory history.
pub struct EditorSource {
    editor: DefaultEditor,
}

impl EditorSource {
    pub fn new() -> Result<Self> {
        Ok(Self {
            editor: DefaultEditor::new()?,
        })
    }
}

impl LineSource for EditorSource {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        match self.editor.readline(prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    self.editor.add_history_entry(line.as_str())?;
                }
                Ok(Some(line))
            }
            // Ctrl-C drops the line being edited
            Err(ReadlineError::Interrupted) => Ok(Some(String::new())),
            Err(ReadlineError::Eof) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

/// Non-interactive source: any buffered reader, with prompts written to `prompt_out`.
///
/// Used when standard input is not a terminal, and in tests.
pub struct PlainSource<R, W> {
    reader: R,
    prompt_out: W,
}

impl<R: BufRead, W: Write> PlainSource<R, W> {
    pub fn new(reader: R, prompt_out: W) -> Self {
        Self { reader, prompt_out }
    }
}

impl<R: BufRead, W: Write> LineSource for PlainSource<R, W> {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        self.prompt_out.write_all(prompt.as_bytes())?;
        self.prompt_out.flush()?;

        let mut buf = Vec::new();
        if self.reader.read_until(b'\n', &mut buf)? == 0 {
            return Ok(None);
        }
        if buf.last() == Some(&b'\n') {
            buf.pop();
        }
        Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
    }
}
