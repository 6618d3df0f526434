// SPDX-License-Identifier: MIT OR Apache-2.0
//! Empty the graph.

use crate::app::EngineContext;
use crate::command::Command;
use crate::error::CommandError;
use crate::schema::MProject;
use serde::{Deserialize, Serialize};

/// Options of [`ClearGraphCmd`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearGraphOptions {
    /// Project as it was, captured on execute
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<MProject>,
}

/// Clears project and renderer; undo reloads the captured project.
/// History is left alone.
#[derive(Debug, Default)]
pub struct ClearGraphCmd {
    options: ClearGraphOptions,
}

impl ClearGraphCmd {
    /// Command clearing the graph
    pub fn new() -> Self {
        Self::default()
    }
}

impl Command for ClearGraphCmd {
    const NAME: &'static str = "ClearGraphCmd";
    type Options = ClearGraphOptions;

    fn from_options(options: Self::Options) -> Result<Self, CommandError> {
        Ok(Self { options })
    }

    fn options(&self) -> &Self::Options {
        &self.options
    }

    fn execute(&mut self, ctx: &mut EngineContext) -> Result<(), CommandError> {
        self.options.project = Some(ctx.project().to_json());
        ctx.clear_graph();
        Ok(())
    }

    fn undo(&mut self, ctx: &mut EngineContext) -> Result<(), CommandError> {
        if let Some(project) = &self.options.project {
            ctx.reset_project(project)?;
        }
        Ok(())
    }
}
