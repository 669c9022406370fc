use std::fmt;

use crate::config::ToolConfig;
use crate::process::CommandSpec;

/// One way of invoking a tool: a program plus fixed leading arguments
/// (`yt-dlp`, `python3 -m yt_dlp`, `/usr/local/bin/yt-dlp`, ...)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationForm {
    pub program: String,
    pub prefix_args: Vec<String>,
}

impl InvocationForm {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            prefix_args: Vec::new(),
        }
    }

    /// `<interpreter> -m <module>`
    pub fn module(interpreter: impl Into<String>, module: impl Into<String>) -> Self {
        Self {
            program: interpreter.into(),
            prefix_args: vec!["-m".to_string(), module.into()],
        }
    }

    /// Parse a configured form; `~` and `$VARS` in the program are expanded.
    /// Returns `None` for an empty entry.
    pub fn from_parts(parts: &[String]) -> Option<Self> {
        let (program, rest) = parts.split_first()?;
        let program = shellexpand::full(program)
            .map(|p| p.into_owned())
            .unwrap_or_else(|_| shellexpand::tilde(program).into_owned());
        Some(Self {
            program,
            prefix_args: rest.to_vec(),
        })
    }

    /// Build the full command: this form followed by `args`
    pub fn command<I, S>(&self, label: &str, args: I) -> CommandSpec
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CommandSpec::new(self.program.clone(), label)
            .args(self.prefix_args.iter().cloned())
            .args(args)
    }
}

impl fmt::Display for InvocationForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.prefix_args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Everything the locator needs to know about one logical tool
#[derive(Debug, Clone)]
pub struct ToolSpec {
    pub name: String,
    pub probe_args: Vec<String>,
    /// Candidates in priority order
    pub forms: Vec<InvocationForm>,
    /// Importable module accepted as a last resort, with the interpreters to try
    pub library_module: Option<String>,
    pub interpreters: Vec<String>,
    pub install_hint: String,
}

impl From<&ToolConfig> for ToolSpec {
    fn from(cfg: &ToolConfig) -> Self {
        Self {
            name: cfg.name.clone(),
            probe_args: cfg.probe_args.clone(),
            forms: cfg
                .forms
                .iter()
                .filter_map(|parts| InvocationForm::from_parts(parts))
                .collect(),
            library_module: cfg.library_module.clone(),
            interpreters: cfg.interpreters.clone(),
            install_hint: cfg.install_hint.clone(),
        }
    }
}
