// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shared plumbing for the Topo Editor crates.
//!
//! - [`EventBus`]: a typed publish/subscribe bus composed into the project,
//!   the command service and the runtime app
//! - [`path`]: lodash-style dot-path access over `serde_json::Value`

pub mod event;
pub mod path;

pub use event::{EventArgs, EventBus, Listener, ListenerId};
pub use path::{get_path, get_path_mut, paths_overlap, segments, set_path, unset_path};
