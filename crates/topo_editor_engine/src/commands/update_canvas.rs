// SPDX-License-Identifier: MIT OR Apache-2.0
//! Change the canvas grid.

use crate::app::EngineContext;
use crate::command::Command;
use crate::error::CommandError;
use crate::schema::GridSettings;
use serde::{Deserialize, Serialize};

/// Options of [`UpdateCanvasCmd`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCanvasOptions {
    /// Grid to apply
    #[serde(flatten)]
    pub grid: GridSettings,
    /// Grid replaced, captured on execute
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_grid: Option<GridSettings>,
}

/// Applies grid settings; undo restores the previous ones
#[derive(Debug)]
pub struct UpdateCanvasCmd {
    options: UpdateCanvasOptions,
}

impl UpdateCanvasCmd {
    /// Command applying `grid`
    pub fn new(grid: GridSettings) -> Self {
        Self {
            options: UpdateCanvasOptions { grid, old_grid: None },
        }
    }
}

impl Command for UpdateCanvasCmd {
    const NAME: &'static str = "UpdateCanvasCmd";
    type Options = UpdateCanvasOptions;

    fn from_options(options: Self::Options) -> Result<Self, CommandError> {
        Ok(Self { options })
    }

    fn options(&self) -> &Self::Options {
        &self.options
    }

    fn execute(&mut self, ctx: &mut EngineContext) -> Result<(), CommandError> {
        self.options.old_grid = Some(ctx.grid());
        ctx.update_grid(&self.options.grid);
        Ok(())
    }

    fn undo(&mut self, ctx: &mut EngineContext) -> Result<(), CommandError> {
        let old = self.options.old_grid.clone().unwrap_or_default();
        ctx.update_grid(&old);
        Ok(())
    }
}
