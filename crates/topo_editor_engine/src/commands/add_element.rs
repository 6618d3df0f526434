// SPDX-License-Identifier: MIT OR Apache-2.0
//! Add one vertex subtree or one link.

use crate::app::EngineContext;
use crate::command::Command;
use crate::element::ElementId;
use crate::error::CommandError;
use crate::schema::ElementConfig;
use serde::{Deserialize, Serialize};

/// Options of [`AddElementCmd`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddElementOptions {
    /// Element to add; an empty id is replaced by a generated one
    pub element: ElementConfig,
}

/// Adds an element; undo removes it again
#[derive(Debug)]
pub struct AddElementCmd {
    options: AddElementOptions,
}

impl AddElementCmd {
    /// Command adding `element`
    pub fn new(element: impl Into<ElementConfig>) -> Self {
        let mut options = AddElementOptions {
            element: element.into(),
        };
        if options.element.id().is_empty() {
            *options.element.id_mut() = ElementId::generate();
        }
        Self { options }
    }

    /// Id of the element being added
    pub fn element_id(&self) -> &ElementId {
        self.options.element.id()
    }
}

impl Command for AddElementCmd {
    const NAME: &'static str = "AddElementCmd";
    type Options = AddElementOptions;

    fn from_options(options: Self::Options) -> Result<Self, CommandError> {
        Ok(Self::new(options.element))
    }

    fn options(&self) -> &Self::Options {
        &self.options
    }

    fn execute(&mut self, ctx: &mut EngineContext) -> Result<(), CommandError> {
        match &self.options.element {
            ElementConfig::Vertex(vertex) => ctx.add_vertex(vertex)?,
            ElementConfig::Link(link) => ctx.add_link(link)?,
        };
        Ok(())
    }

    fn undo(&mut self, ctx: &mut EngineContext) -> Result<(), CommandError> {
        match &self.options.element {
            ElementConfig::Vertex(vertex) => {
                ctx.remove_vertex(vertex.id());
            }
            ElementConfig::Link(link) => {
                ctx.remove_link(link.id());
            }
        }
        Ok(())
    }
}
