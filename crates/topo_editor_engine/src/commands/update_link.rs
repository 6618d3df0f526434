// SPDX-License-Identifier: MIT OR Apache-2.0
//! Update one link in place.

use crate::app::EngineContext;
use crate::command::Command;
use crate::error::{CommandError, GraphError};
use crate::schema::MLink;
use serde::{Deserialize, Serialize};

/// Options of [`UpdateLinkCmd`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLinkOptions {
    /// State to apply
    pub new_link: MLink,
    /// State replaced, captured on execute
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_link: Option<MLink>,
}

/// Updates a link; undo applies the captured old state
#[derive(Debug)]
pub struct UpdateLinkCmd {
    options: UpdateLinkOptions,
}

impl UpdateLinkCmd {
    /// Command applying `new_link`
    pub fn new(new_link: MLink) -> Self {
        Self {
            options: UpdateLinkOptions {
                new_link,
                old_link: None,
            },
        }
    }
}

impl Command for UpdateLinkCmd {
    const NAME: &'static str = "UpdateLinkCmd";
    type Options = UpdateLinkOptions;

    fn from_options(options: Self::Options) -> Result<Self, CommandError> {
        Ok(Self { options })
    }

    fn options(&self) -> &Self::Options {
        &self.options
    }

    fn execute(&mut self, ctx: &mut EngineContext) -> Result<(), CommandError> {
        let id = self.options.new_link.id();
        let old = ctx
            .project()
            .link_config(id)
            .ok_or_else(|| GraphError::VertexNotExist(id.clone()))?;
        ctx.update_link(&self.options.new_link)?;
        self.options.old_link = Some(old);
        Ok(())
    }

    fn undo(&mut self, ctx: &mut EngineContext) -> Result<(), CommandError> {
        match &self.options.old_link {
            Some(old) => {
                ctx.update_link(old)?;
                Ok(())
            }
            None => Err(CommandError::InvalidOperation(
                "UpdateLinkCmd has no captured state to restore".to_string(),
            )),
        }
    }
}
