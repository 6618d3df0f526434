// SPDX-License-Identifier: MIT OR Apache-2.0
//! Update one vertex in place.

use crate::app::EngineContext;
use crate::command::Command;
use crate::error::{CommandError, GraphError};
use crate::schema::MVertex;
use serde::{Deserialize, Serialize};

/// Options of [`UpdateVertexCmd`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateVertexOptions {
    /// State to apply
    pub new_vertex: MVertex,
    /// State replaced, captured on execute
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_vertex: Option<MVertex>,
}

/// Updates a vertex; undo applies the captured old state
#[derive(Debug)]
pub struct UpdateVertexCmd {
    options: UpdateVertexOptions,
}

impl UpdateVertexCmd {
    /// Command applying `new_vertex`
    pub fn new(new_vertex: MVertex) -> Self {
        Self {
            options: UpdateVertexOptions {
                new_vertex,
                old_vertex: None,
            },
        }
    }
}

impl Command for UpdateVertexCmd {
    const NAME: &'static str = "UpdateVertexCmd";
    type Options = UpdateVertexOptions;

    fn from_options(options: Self::Options) -> Result<Self, CommandError> {
        Ok(Self { options })
    }

    fn options(&self) -> &Self::Options {
        &self.options
    }

    fn execute(&mut self, ctx: &mut EngineContext) -> Result<(), CommandError> {
        let id = self.options.new_vertex.id();
        let old = ctx
            .project()
            .vertex_config(id)
            .ok_or_else(|| GraphError::VertexNotExist(id.clone()))?;
        ctx.update_vertex(&self.options.new_vertex)?;
        self.options.old_vertex = Some(old);
        Ok(())
    }

    fn undo(&mut self, ctx: &mut EngineContext) -> Result<(), CommandError> {
        match &self.options.old_vertex {
            Some(old) => {
                ctx.update_vertex(old)?;
                Ok(())
            }
            None => Err(CommandError::InvalidOperation(
                "UpdateVertexCmd has no captured state to restore".to_string(),
            )),
        }
    }
}
