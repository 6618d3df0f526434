// SPDX-License-Identifier: MIT OR Apache-2.0
//! Concrete graph commands.
//!
//! Every command takes camelCase JSON options and writes the state it
//! replaces back into those options, so a serialized history can still
//! be undone.

mod add_element;
mod clear_graph;
mod del_element;
mod update_canvas;
mod update_link;
mod update_vertex;

pub use add_element::{AddElementCmd, AddElementOptions};
pub use clear_graph::{ClearGraphCmd, ClearGraphOptions};
pub use del_element::{DelElementCmd, DelElementOptions};
pub use update_canvas::{UpdateCanvasCmd, UpdateCanvasOptions};
pub use update_link::{UpdateLinkCmd, UpdateLinkOptions};
pub use update_vertex::{UpdateVertexCmd, UpdateVertexOptions};
