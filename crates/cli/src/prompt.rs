use crate::config::ExecMode;
use anyhow::{Context as AnyhowContext, Result};
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Select};
use std::io::IsTerminal;

/// Answer to the pre-run trust prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustChoice {
    Run,
    Abort,
    View,
}

/// Interactive questions asked during a run.
pub trait Prompter: Send + Sync {
    /// Yes/no question; defaults to "no".
    fn confirm(&self, prompt: &str) -> Result<bool>;

    fn trust_choice(&self) -> Result<TrustChoice>;

    fn exec_mode(&self) -> Result<ExecMode>;
}

/// dialoguer prompts on the controlling terminal.
///
/// Without a terminal on both stdin and stdout every question takes its
/// safe default: no, abort, isolate.
pub struct TerminalPrompter;

impl TerminalPrompter {
    fn interactive() -> bool {
        std::io::stdin().is_terminal() && std::io::stdout().is_terminal()
    }
}

impl Prompter for TerminalPrompter {
    fn confirm(&self, prompt: &str) -> Result<bool> {
        if !Self::interactive() {
            log::warn!("{prompt} (no terminal; answering no)");
            return Ok(false);
        }
        Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(prompt)
            .default(false)
            .interact()
            .context("Failed to read confirmation")
    }

    fn trust_choice(&self) -> Result<TrustChoice> {
        if !Self::interactive() {
            log::warn!("gist is not trusted and no terminal is attached; aborting");
            return Ok(TrustChoice::Abort);
        }
        let choices = ["Abort", "Run", "View files"];
        let selection = Select::with_theme(&ColorfulTheme::default())
            .with_prompt("Proceed?")
            .items(&choices)
            .default(0)
            .interact_opt()
            .context("Failed to read trust choice")?;
        Ok(match selection {
            Some(1) => TrustChoice::Run,
            Some(2) => TrustChoice::View,
            _ => TrustChoice::Abort,
        })
    }

    fn exec_mode(&self) -> Result<ExecMode> {
        if !Self::interactive() {
            return Ok(ExecMode::Isolate);
        }
        let choices = [
            "isolate (run from the gist's temp/cache dir; safer default)",
            "cwd     (run in the current directory; can modify your files)",
        ];
        let selection = Select::with_theme(&ColorfulTheme::default())
            .with_prompt("Choose execution directory")
            .items(&choices)
            .default(0)
            .interact_opt()
            .context("Failed to read execution mode")?;
        Ok(match selection {
            Some(1) => ExecMode::Cwd,
            _ => ExecMode::Isolate,
        })
    }
}
