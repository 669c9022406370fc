use std::time::Duration;

use tracing::{debug, info};

use super::form::{InvocationForm, ToolSpec};
use crate::error::{Attempts, FailureKind, FormFailure, PipelineError};
use crate::process::{self, ProcessOutcome};

/// A tool that passed its probe.
///
/// Remembers the winning form so the invocation stage starts from the exact
/// form that was found to work, falling back to the candidates listed after it.
#[derive(Debug, Clone)]
pub struct LocatedTool {
    pub name: String,
    order: Vec<InvocationForm>,
}

impl LocatedTool {
    pub fn new(name: impl Into<String>, order: Vec<InvocationForm>) -> Self {
        Self {
            name: name.into(),
            order,
        }
    }

    /// The form whose probe succeeded
    pub fn form(&self) -> &InvocationForm {
        &self.order[0]
    }

    /// Forms to try when running the tool, winner first
    pub fn invocation_order(&self) -> &[InvocationForm] {
        &self.order
    }
}

/// Probes invocation forms until one answers
#[derive(Debug, Clone)]
pub struct ToolLocator {
    probe_timeout: Duration,
}

impl ToolLocator {
    pub fn new(probe_timeout: Duration) -> Self {
        Self { probe_timeout }
    }

    /// Find the first working form of `tool`.
    ///
    /// Forms are probed strictly in order and the search stops at the first
    /// success. Tools with a library module are also checked as an importable
    /// module once every form has failed. Nothing outside the configured
    /// candidates is ever tried.
    pub async fn locate(&self, tool: &ToolSpec) -> Result<LocatedTool, PipelineError> {
        let mut failures = Vec::new();

        for (index, form) in tool.forms.iter().enumerate() {
            let cmd = form.command(&tool.name, tool.probe_args.iter().cloned());
            match self.probe(&cmd).await {
                Ok(()) => {
                    info!("Found {} at: {}", tool.name, form);
                    return Ok(LocatedTool::new(
                        tool.name.clone(),
                        tool.forms[index..].to_vec(),
                    ));
                }
                Err(kind) => {
                    debug!("{} not usable via `{}`", tool.name, form);
                    failures.push(FormFailure::new(form, kind));
                }
            }
        }

        if let Some(module) = &tool.library_module {
            let script = format!("import {}", module);
            for interpreter in &tool.interpreters {
                let cmd = process::CommandSpec::new(interpreter.clone(), tool.name.clone())
                    .args(["-c", script.as_str()]);
                match self.probe(&cmd).await {
                    Ok(()) => {
                        info!("Found {} as {} module", tool.name, interpreter);
                        return Ok(LocatedTool::new(
                            tool.name.clone(),
                            vec![InvocationForm::module(interpreter.clone(), module.clone())],
                        ));
                    }
                    Err(kind) => failures.push(FormFailure::new(&cmd, kind)),
                }
            }
        }

        Err(PipelineError::ToolUnavailable {
            tool: tool.name.clone(),
            hint: tool.install_hint.clone(),
            attempts: Attempts(failures),
        })
    }

    async fn probe(&self, cmd: &process::CommandSpec) -> Result<(), FailureKind> {
        let result = process::run(cmd, self.probe_timeout)
            .await
            .map_err(|e| FailureKind::Spawn(e.to_string()))?;

        match result.outcome() {
            ProcessOutcome::Success => Ok(()),
            ProcessOutcome::Failed { code } => Err(FailureKind::Exit {
                code,
                output: result.output,
            }),
            ProcessOutcome::TimedOut => Err(FailureKind::TimedOut {
                output: result.output,
            }),
        }
    }
}
