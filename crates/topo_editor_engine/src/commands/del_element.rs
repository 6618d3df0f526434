// SPDX-License-Identifier: MIT OR Apache-2.0
//! Delete vertices and links.

use crate::app::EngineContext;
use crate::command::Command;
use crate::element::ElementId;
use crate::error::CommandError;
use crate::schema::{ElementConfig, MLink, MVertex};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

/// Options of [`DelElementCmd`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelElementOptions {
    /// Elements to delete; rewritten with full snapshots on execute
    pub element: Vec<ElementConfig>,
    /// Links removed along with the vertices, captured on execute
    #[serde(default)]
    pub links: Vec<MLink>,
}

/// Deletes elements; undo restores vertices, then every removed link
#[derive(Debug)]
pub struct DelElementCmd {
    options: DelElementOptions,
}

impl DelElementCmd {
    /// Command deleting `elements`
    pub fn new(elements: Vec<ElementConfig>) -> Self {
        Self {
            options: DelElementOptions {
                element: elements,
                links: Vec::new(),
            },
        }
    }
}

impl Command for DelElementCmd {
    const NAME: &'static str = "DelElementCmd";
    type Options = DelElementOptions;

    fn from_options(options: Self::Options) -> Result<Self, CommandError> {
        Ok(Self { options })
    }

    fn options(&self) -> &Self::Options {
        &self.options
    }

    fn execute(&mut self, ctx: &mut EngineContext) -> Result<(), CommandError> {
        // Snapshot everything first so a group keeps the children listed before it
        let mut vertexes: IndexMap<ElementId, MVertex> = IndexMap::new();
        let mut explicit: IndexMap<ElementId, MLink> = IndexMap::new();
        for element in &self.options.element {
            match element {
                ElementConfig::Vertex(vertex) => match ctx.project().vertex_config(vertex.id()) {
                    Some(snapshot) => {
                        vertexes.insert(snapshot.id().clone(), snapshot);
                    }
                    None => tracing::warn!(vertex = %vertex.id(), "Vertex to delete does not exist"),
                },
                ElementConfig::Link(link) => match ctx.project().link_config(link.id()) {
                    Some(snapshot) => {
                        explicit.insert(snapshot.id().clone(), snapshot);
                    }
                    None => tracing::warn!(link = %link.id(), "Link to delete does not exist"),
                },
            }
        }

        let nested: IndexSet<ElementId> = vertexes
            .values()
            .flat_map(|vertex| vertex.subtree_ids().into_iter().skip(1).cloned())
            .collect();
        vertexes.retain(|id, _| !nested.contains(id));

        let mut cascaded: IndexMap<ElementId, MLink> = IndexMap::new();
        for vertex in vertexes.values() {
            for subtree_id in vertex.subtree_ids() {
                for link in ctx.project().get_vertex_relations(subtree_id) {
                    if explicit.contains_key(&link) {
                        continue;
                    }
                    if let Some(config) = ctx.project().link_config(&link) {
                        cascaded.insert(link, config);
                    }
                }
            }
        }

        for id in vertexes.keys() {
            ctx.remove_vertex(id);
        }
        for id in explicit.keys() {
            ctx.remove_link(id);
        }

        self.options.element = vertexes
            .into_values()
            .map(ElementConfig::Vertex)
            .chain(explicit.into_values().map(ElementConfig::Link))
            .collect();
        self.options.links = cascaded.into_values().collect();
        Ok(())
    }

    fn undo(&mut self, ctx: &mut EngineContext) -> Result<(), CommandError> {
        let mut restored = Restored::default();
        let result = restore(&self.options, ctx, &mut restored);
        if result.is_err() {
            for link in restored.links.iter().rev() {
                ctx.remove_link(link);
            }
            for vertex in restored.vertexes.iter().rev() {
                ctx.remove_vertex(vertex);
            }
        }
        result
    }
}

/// Elements re-added so far by an undo
#[derive(Default)]
struct Restored {
    vertexes: Vec<ElementId>,
    links: Vec<ElementId>,
}

fn restore(
    options: &DelElementOptions,
    ctx: &mut EngineContext,
    restored: &mut Restored,
) -> Result<(), CommandError> {
    for element in &options.element {
        if let ElementConfig::Vertex(vertex) = element {
            restored.vertexes.push(ctx.add_vertex(vertex)?);
        }
    }
    let explicit = options.element.iter().filter_map(|element| match element {
        ElementConfig::Link(link) => Some(link),
        ElementConfig::Vertex(_) => None,
    });
    for link in explicit.chain(&options.links) {
        if !ctx.project().has_link(link.id()) {
            restored.links.push(ctx.add_link(link)?);
        }
    }
    Ok(())
}
