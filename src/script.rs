use std::fmt;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::controller::{MemoryHistory, Outcome, PanelController};
use crate::error::Rejected;
use crate::events::{Interaction, RowAction};
use crate::surface::MemorySurface;
use crate::types::{FormFields, PanelMode, RowId};

/// A replay script: a list of `[[step]]` tables, applied in order.
///
/// ```toml
/// [[step]]
/// action = "click"
/// id = 2
///
/// [[step]]
/// action = "key"
/// key = "j"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Script {
    #[serde(default, rename = "step")]
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    Click {
        id: RowId,
    },
    Key {
        key: String,
    },
    Close,
    New,
    Edit {
        id: RowId,
    },
    Submit {
        #[serde(default)]
        fields: FormFields,
    },
    Delete {
        id: RowId,
        /// Answer given to the confirmation prompt.
        #[serde(default = "default_confirm")]
        confirm: bool,
    },
    Scroll,
    Back,
    Forward,
    Menu {
        id: RowId,
    },
    Outside,
}

fn default_confirm() -> bool {
    true
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Click { id } => write!(f, "click {id}"),
            Self::Key { key } => write!(f, "key {key}"),
            Self::Close => f.write_str("close"),
            Self::New => f.write_str("new"),
            Self::Edit { id } => write!(f, "edit {id}"),
            Self::Submit { fields } => write!(f, "submit ({} fields)", fields.len()),
            Self::Delete { id, confirm: true } => write!(f, "delete {id}"),
            Self::Delete { id, confirm: false } => write!(f, "delete {id} (declined)"),
            Self::Scroll => f.write_str("scroll"),
            Self::Back => f.write_str("back"),
            Self::Forward => f.write_str("forward"),
            Self::Menu { id } => write!(f, "menu {id}"),
            Self::Outside => f.write_str("outside"),
        }
    }
}

impl Script {
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("failed to parse replay script")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read script: {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("in {}", path.display()))
    }
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

/// State observed after one step has settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub step: String,
    pub result: Result<Outcome, Rejected>,
    pub mode: PanelMode,
    pub loading: bool,
    pub rows: usize,
    pub url: Option<String>,
}

impl fmt::Display for StepReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let result = match &self.result {
            Ok(outcome) => format!("{outcome:?}").to_lowercase(),
            Err(rejected) => format!("rejected: {rejected}"),
        };
        write!(
            f,
            "{:<24} {:<28} mode={} rows={}",
            self.step, result, self.mode, self.rows
        )?;
        if self.loading {
            f.write_str(" (loading)")?;
        }
        if let Some(url) = &self.url {
            write!(f, " url={url}")?;
        }
        Ok(())
    }
}

/// The controller the replay and interactive harnesses drive.
pub type ReplayController = PanelController<MemorySurface, MemoryHistory>;

/// Apply one step, then wait up to `settle` for the engine to answer.
pub fn run_step(controller: &mut ReplayController, step: &Step, settle: Duration) -> StepReport {
    let result = match step {
        Step::Click { id } => controller.dispatch(Interaction::RowClicked(*id)),
        Step::Key { key } => controller.dispatch(Interaction::KeyPressed(key.clone())),
        Step::Close => controller.dispatch(Interaction::CloseRequested),
        Step::New => controller.dispatch(Interaction::CreateRequested),
        Step::Edit { id } => controller.dispatch(Interaction::ActionInvoked {
            action: RowAction::Edit,
            id: *id,
        }),
        Step::Submit { fields } => controller.dispatch(Interaction::FormSubmitted(fields.clone())),
        Step::Delete { id, confirm } => {
            controller.surface_mut().set_confirm_answer(*confirm);
            controller.dispatch(Interaction::ActionInvoked {
                action: RowAction::Delete,
                id: *id,
            })
        }
        Step::Scroll => controller.dispatch(Interaction::SentinelVisible),
        Step::Back => match controller.history_mut().back() {
            Some(payload) => controller.dispatch(Interaction::HistoryPopped(payload)),
            None => Ok(Outcome::Noop),
        },
        Step::Forward => match controller.history_mut().forward() {
            Some(payload) => controller.dispatch(Interaction::HistoryPopped(payload)),
            None => Ok(Outcome::Noop),
        },
        Step::Menu { id } => controller.dispatch(Interaction::ActionInvoked {
            action: RowAction::ToggleMenu,
            id: *id,
        }),
        Step::Outside => controller.dispatch(Interaction::OutsideClicked),
    };

    if !controller.wait_idle(settle) {
        tracing::warn!("replay: step `{step}` did not settle within {settle:?}");
    }

    StepReport {
        step: step.to_string(),
        result,
        mode: controller.mode(),
        loading: controller.is_loading(),
        rows: controller.rows().len(),
        url: controller.history().current().map(|e| e.url.clone()),
    }
}

pub fn run(controller: &mut ReplayController, script: &Script, settle: Duration) -> Vec<StepReport> {
    script
        .steps
        .iter()
        .map(|step| run_step(controller, step, settle))
        .collect()
}
