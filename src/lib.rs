//! A minimal interactive command interpreter.
//!
//! Each input line is split on whitespace and then either run by a builtin inside
//! the interpreter process (`exit`, `help`, `cd`, `mkdir`) or handed to an
//! external program through fork and exec. A simple command may redirect its
//! standard input (`< file`) and output (`> file`); a line containing `|` runs
//! two programs connected by a pipe. There is no quoting, globbing or variable
//! expansion.
//!
//! The main entry point is [`Interpreter`], which drives the read-execute loop
//! over any [`LineSource`]. The public modules [`command`], [`parser`] and
//! [`session`] expose the pieces for embedding or extending it.

mod builtin;
pub mod command;
pub mod config;
mod external;
mod interpreter;
mod io_adapters;
pub mod lexer;
pub mod parser;
mod pipeline;
pub mod session;
#[cfg(test)]
mod test_util;

pub use builtin::default_builtins;
pub use config::Config;
pub use external::run_foreground;
pub use interpreter::Interpreter;
pub use io_adapters::{EditorSource, LineSource, PlainSource};
pub use pipeline::run_pipeline;
