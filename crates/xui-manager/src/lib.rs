//! Command-line and interactive front end for xui-bulk.
//!
//! The [`cli`] module parses arguments and runs one-shot commands; the
//! [`shell`] module drives the interactive menu. Both plan passes with
//! `xui-engine` and show previews through [`render`] before anything is
//! written.

pub mod cli;
mod logging;
pub mod prompt;
pub mod render;
pub mod restart;
pub mod shell;

pub use cli::{ManagerArgs, run};
pub use logging::{filter_directive, init_tracing};
pub use prompt::Prompt;
pub use restart::{PanelRestarter, RestartError, SystemRestarter};
pub use shell::{Shell, ShellError, ShellSettings, ShellState, Transition};
