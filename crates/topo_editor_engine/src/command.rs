// SPDX-License-Identifier: MIT OR Apache-2.0
//! Undo/redo command engine.
//!
//! Commands are registered by type, created by name from JSON options and
//! kept on a bounded undo stack. Each command records whatever it needs to
//! revert itself in its own options during `execute`, so the serialized
//! history is enough to undo after a reload.

use crate::app::EngineContext;
use crate::config::DEFAULT_MAX_STACK_SIZE;
use crate::error::CommandError;
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;
use std::time::{SystemTime, UNIX_EPOCH};
use topo_editor_utils::{EventArgs, EventBus, ListenerId};

/// A reversible graph operation
pub trait Command: Send + 'static {
    /// Registry name, also written to the history
    const NAME: &'static str;

    /// Serializable options, updated in place with the "before" state
    type Options: Serialize + DeserializeOwned + Send;

    /// Build from options
    fn from_options(options: Self::Options) -> Result<Self, CommandError>
    where
        Self: Sized;

    /// Current options
    fn options(&self) -> &Self::Options;

    /// Apply the operation
    fn execute(&mut self, ctx: &mut EngineContext) -> Result<(), CommandError>;

    /// Revert the operation
    fn undo(&mut self, ctx: &mut EngineContext) -> Result<(), CommandError>;
}

/// Object-safe view of a [`Command`] held on the stacks
trait DynCommand: Send {
    fn name(&self) -> &'static str;
    fn options_json(&self) -> Result<Value, CommandError>;
    fn execute(&mut self, ctx: &mut EngineContext) -> Result<(), CommandError>;
    fn undo(&mut self, ctx: &mut EngineContext) -> Result<(), CommandError>;
}

impl<C: Command> DynCommand for C {
    fn name(&self) -> &'static str {
        C::NAME
    }

    fn options_json(&self) -> Result<Value, CommandError> {
        Ok(serde_json::to_value(self.options())?)
    }

    fn execute(&mut self, ctx: &mut EngineContext) -> Result<(), CommandError> {
        Command::execute(self, ctx)
    }

    fn undo(&mut self, ctx: &mut EngineContext) -> Result<(), CommandError> {
        Command::undo(self, ctx)
    }
}

type Factory = fn(Value) -> Result<Box<dyn DynCommand>, CommandError>;

fn build<C: Command>(options: Value) -> Result<Box<dyn DynCommand>, CommandError> {
    if options.is_null() {
        return Err(CommandError::NotOptions(C::NAME.to_string()));
    }
    let options: C::Options = serde_json::from_value(options)?;
    Ok(Box::new(C::from_options(options)?))
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// A command on one of the stacks
struct CommandRecord {
    id: u64,
    executed: bool,
    execute_time: u64,
    command: Box<dyn DynCommand>,
}

impl CommandRecord {
    fn to_json(&self) -> Result<CommandJson, CommandError> {
        Ok(CommandJson {
            id: self.id,
            name: self.command.name().to_string(),
            options: self.command.options_json()?,
            executed: self.executed,
            execute_time: self.execute_time,
        })
    }
}

/// Serialized command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandJson {
    /// Monotonic id
    pub id: u64,
    /// Registry name
    pub name: String,
    /// Options including captured "before" state
    pub options: Value,
    /// Whether it ran
    pub executed: bool,
    /// Milliseconds since the epoch
    pub execute_time: u64,
}

/// Serialized undo and redo stacks
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct History {
    /// Oldest first
    pub undo_stack: Vec<CommandJson>,
    /// Next redo last
    pub redo_stack: Vec<CommandJson>,
}

/// Command stack notifications
#[derive(Debug, Clone, PartialEq)]
pub enum CommandEvent {
    /// A command was executed, undone or redone, or the history was loaded
    Changed {
        /// Id of the command involved
        command: Option<u64>,
        /// Its registry name
        name: Option<String>,
        /// Undo stack is not empty
        can_undo: bool,
        /// Redo stack is not empty
        can_redo: bool,
    },
    /// Both stacks were emptied
    Cleaned {
        /// Always false
        can_undo: bool,
        /// Always false
        can_redo: bool,
    },
}

impl EventArgs for CommandEvent {
    fn event_name(&self) -> &str {
        match self {
            Self::Changed { .. } => "command:changed",
            Self::Cleaned { .. } => "command:cleaned",
        }
    }
}

/// Registry plus undo/redo stacks
pub struct CommandService {
    registry: IndexMap<&'static str, Factory>,
    undo_stack: VecDeque<CommandRecord>,
    redo_stack: Vec<CommandRecord>,
    id_counter: u64,
    max_stack_size: usize,
    /// Undo, redo and jump do nothing while set
    pub disabled: bool,
    events: EventBus<CommandEvent>,
}

impl std::fmt::Debug for CommandService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandService")
            .field("registered", &self.registry.keys().collect::<Vec<_>>())
            .field("undo", &self.undo_stack.len())
            .field("redo", &self.redo_stack.len())
            .field("id_counter", &self.id_counter)
            .field("max_stack_size", &self.max_stack_size)
            .field("disabled", &self.disabled)
            .finish()
    }
}

impl CommandService {
    /// Create a service with the given undo depth
    pub fn new(max_stack_size: usize, disabled: bool) -> Self {
        Self {
            registry: IndexMap::new(),
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            id_counter: 0,
            max_stack_size,
            disabled,
            events: EventBus::new(),
        }
    }

    /// Register a command type under its name
    pub fn register<C: Command>(&mut self) {
        self.registry.insert(C::NAME, build::<C>);
    }

    /// Whether a name is registered
    pub fn is_registered(&self, name: &str) -> bool {
        self.registry.contains_key(name)
    }

    /// Subscribe to `command:changed` or `command:cleaned`
    pub fn on(&mut self, name: &str, listener: impl Fn(&CommandEvent) + Send + Sync + 'static) -> ListenerId {
        self.events.on(name, listener)
    }

    /// Unsubscribe a listener
    pub fn off(&mut self, id: ListenerId) -> bool {
        self.events.off(id)
    }

    fn emit_changed(&mut self, id: Option<u64>, name: Option<&str>) {
        let event = CommandEvent::Changed {
            command: id,
            name: name.map(str::to_string),
            can_undo: self.can_undo(),
            can_redo: self.can_redo(),
        };
        self.events.emit(&event);
    }

    /// Create a registered command from JSON options and execute it
    pub fn execute(&mut self, ctx: &mut EngineContext, name: &str, options: Value) -> Result<u64, CommandError> {
        let factory = self
            .registry
            .get(name)
            .ok_or_else(|| CommandError::NotRegistered(name.to_string()))?;
        let command = factory(options)?;
        self.run(ctx, command)
    }

    /// Execute an already built command
    pub fn execute_command<C: Command>(&mut self, ctx: &mut EngineContext, command: C) -> Result<u64, CommandError> {
        if !self.is_registered(C::NAME) {
            return Err(CommandError::NotRegistered(C::NAME.to_string()));
        }
        self.run(ctx, Box::new(command))
    }

    fn run(&mut self, ctx: &mut EngineContext, mut command: Box<dyn DynCommand>) -> Result<u64, CommandError> {
        self.id_counter += 1;
        let id = self.id_counter;
        let name = command.name();

        if let Err(err) = command.execute(ctx) {
            tracing::warn!(command = name, id, error = %err, "Command failed");
            return Err(err);
        }

        self.undo_stack.push_back(CommandRecord {
            id,
            executed: true,
            execute_time: now_millis(),
            command,
        });
        while self.undo_stack.len() > self.max_stack_size {
            self.undo_stack.pop_front();
        }
        self.redo_stack.clear();

        tracing::debug!(command = name, id, "Command executed");
        self.emit_changed(Some(id), Some(name));
        Ok(id)
    }

    /// Undo up to `steps` commands. Returns the id of the last one undone.
    pub fn undo(&mut self, ctx: &mut EngineContext, steps: usize) -> Result<Option<u64>, CommandError> {
        if self.disabled {
            return Ok(None);
        }
        let mut last = None;
        for _ in 0..steps {
            let Some(mut record) = self.undo_stack.pop_back() else {
                break;
            };
            if let Err(err) = record.command.undo(ctx) {
                tracing::warn!(command = record.command.name(), id = record.id, error = %err, "Undo failed");
                self.undo_stack.push_back(record);
                return Err(err);
            }
            let (id, name) = (record.id, record.command.name());
            self.redo_stack.push(record);
            last = Some(id);
            self.emit_changed(Some(id), Some(name));
        }
        Ok(last)
    }

    /// Redo up to `steps` commands. Returns the id of the last one redone.
    pub fn redo(&mut self, ctx: &mut EngineContext, steps: usize) -> Result<Option<u64>, CommandError> {
        if self.disabled {
            return Ok(None);
        }
        let mut last = None;
        for _ in 0..steps {
            let Some(mut record) = self.redo_stack.pop() else {
                break;
            };
            if let Err(err) = record.command.execute(ctx) {
                tracing::warn!(command = record.command.name(), id = record.id, error = %err, "Redo failed");
                self.redo_stack.push(record);
                return Err(err);
            }
            record.executed = true;
            let (id, name) = (record.id, record.command.name());
            self.undo_stack.push_back(record);
            last = Some(id);
            self.emit_changed(Some(id), Some(name));
        }
        Ok(last)
    }

    /// Move through the history until the command with `id` is the latest
    /// applied one.
    pub fn jump(&mut self, ctx: &mut EngineContext, id: u64) -> Result<(), CommandError> {
        if self.disabled {
            return Ok(());
        }
        let top = self.undo_stack.back().map(|record| record.id);
        if top.map_or(true, |top| id > top) {
            while let Some(redone) = self.redo(ctx, 1)? {
                if redone >= id {
                    break;
                }
            }
        } else {
            while let Some(top) = self.undo_stack.back().map(|record| record.id) {
                if top == id {
                    break;
                }
                self.undo(ctx, 1)?;
            }
        }

        let (top, name) = match self.undo_stack.back() {
            Some(record) => (Some(record.id), Some(record.command.name())),
            None => (None, None),
        };
        self.emit_changed(top, name);
        Ok(())
    }

    /// Undo stack is not empty
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Redo stack is not empty
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Number of undoable commands
    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    /// Number of redoable commands
    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    /// Ids on the undo stack, oldest first
    pub fn undo_ids(&self) -> Vec<u64> {
        self.undo_stack.iter().map(|record| record.id).collect()
    }

    /// Empty both stacks
    pub fn clean(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.events.emit(&CommandEvent::Cleaned {
            can_undo: false,
            can_redo: false,
        });
    }

    /// Empty both stacks and drop every listener
    pub fn destroy(&mut self) {
        self.clean();
        self.events.remove_all_listeners();
    }

    /// Serialize both stacks
    pub fn to_json(&self) -> Result<History, CommandError> {
        Ok(History {
            undo_stack: self
                .undo_stack
                .iter()
                .map(CommandRecord::to_json)
                .collect::<Result<_, _>>()?,
            redo_stack: self
                .redo_stack
                .iter()
                .map(CommandRecord::to_json)
                .collect::<Result<_, _>>()?,
        })
    }

    fn restore(&mut self, json: &CommandJson) -> Result<Option<CommandRecord>, CommandError> {
        let Some(factory) = self.registry.get(json.name.as_str()) else {
            tracing::warn!(command = %json.name, id = json.id, "Skipping unregistered command in history");
            return Ok(None);
        };
        let command = factory(json.options.clone())?;
        self.id_counter = self.id_counter.max(json.id);
        Ok(Some(CommandRecord {
            id: json.id,
            executed: json.executed,
            execute_time: json.execute_time,
            command,
        }))
    }

    /// Replace both stacks from serialized history. Commands whose name is
    /// not registered are skipped. Nothing is executed.
    pub fn from_json(&mut self, history: &History) -> Result<(), CommandError> {
        let mut undo_stack = VecDeque::new();
        for json in &history.undo_stack {
            if let Some(record) = self.restore(json)? {
                undo_stack.push_back(record);
            }
        }
        let mut redo_stack = Vec::new();
        for json in &history.redo_stack {
            if let Some(record) = self.restore(json)? {
                redo_stack.push(record);
            }
        }
        self.undo_stack = undo_stack;
        self.redo_stack = redo_stack;

        let (top, name) = match self.undo_stack.back() {
            Some(record) => (Some(record.id), Some(record.command.name())),
            None => (None, None),
        };
        self.emit_changed(top, name);
        Ok(())
    }
}

impl Default for CommandService {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_STACK_SIZE, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::MemoryRenderer;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    /// Appends a name to the project store key `log`
    #[derive(Debug)]
    struct Mark {
        options: MarkOptions,
    }

    #[derive(Debug, Serialize, Deserialize)]
    struct MarkOptions {
        label: String,
    }

    fn log(ctx: &EngineContext) -> Vec<Value> {
        ctx.project()
            .store()
            .get("log")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default()
    }

    impl Command for Mark {
        const NAME: &'static str = "Mark";
        type Options = MarkOptions;

        fn from_options(options: Self::Options) -> Result<Self, CommandError> {
            Ok(Self { options })
        }

        fn options(&self) -> &Self::Options {
            &self.options
        }

        fn execute(&mut self, ctx: &mut EngineContext) -> Result<(), CommandError> {
            if self.options.label == "fail" {
                return Err(CommandError::InvalidOperation("fail".into()));
            }
            let mut entries = log(ctx);
            entries.push(json!(self.options.label));
            let mut store = ctx.project().store().clone();
            store.insert("log".into(), Value::Array(entries));
            ctx.set_store(store);
            Ok(())
        }

        fn undo(&mut self, ctx: &mut EngineContext) -> Result<(), CommandError> {
            let mut entries = log(ctx);
            entries.pop();
            let mut store = ctx.project().store().clone();
            store.insert("log".into(), Value::Array(entries));
            ctx.set_store(store);
            Ok(())
        }
    }

    fn setup(max: usize) -> (CommandService, EngineContext) {
        let mut service = CommandService::new(max, false);
        service.register::<Mark>();
        (service, EngineContext::new(Box::new(MemoryRenderer::new())))
    }

    fn mark(service: &mut CommandService, ctx: &mut EngineContext, label: &str) -> u64 {
        service.execute(ctx, "Mark", json!({ "label": label })).unwrap()
    }

    #[test]
    fn test_unknown_and_null_options() {
        let (mut service, mut ctx) = setup(10);
        assert!(matches!(
            service.execute(&mut ctx, "Nope", json!({})),
            Err(CommandError::NotRegistered(name)) if name == "Nope"
        ));
        assert!(matches!(
            service.execute(&mut ctx, "Mark", Value::Null),
            Err(CommandError::NotOptions(_))
        ));
        assert!(!service.can_undo());
    }

    #[test]
    fn test_undo_redo_and_redo_cleared() {
        let (mut service, mut ctx) = setup(10);
        mark(&mut service, &mut ctx, "a");
        mark(&mut service, &mut ctx, "b");
        assert_eq!(log(&ctx), vec![json!("a"), json!("b")]);

        assert_eq!(service.undo(&mut ctx, 1).unwrap(), Some(2));
        assert_eq!(log(&ctx), vec![json!("a")]);
        assert!(service.can_redo());

        assert_eq!(service.redo(&mut ctx, 1).unwrap(), Some(2));
        assert_eq!(log(&ctx), vec![json!("a"), json!("b")]);

        service.undo(&mut ctx, 1).unwrap();
        mark(&mut service, &mut ctx, "c");
        assert!(!service.can_redo());
        assert_eq!(service.undo_ids(), vec![1, 3]);
    }

    #[test]
    fn test_failed_execute_keeps_stacks() {
        let (mut service, mut ctx) = setup(10);
        mark(&mut service, &mut ctx, "a");
        service.undo(&mut ctx, 1).unwrap();
        assert!(service.execute(&mut ctx, "Mark", json!({ "label": "fail" })).is_err());
        assert!(service.can_redo());
        assert!(!service.can_undo());
    }

    #[test]
    fn test_bounded_history() {
        let (mut service, mut ctx) = setup(3);
        for label in ["a", "b", "c", "d", "e"] {
            mark(&mut service, &mut ctx, label);
        }
        assert_eq!(service.undo_ids(), vec![3, 4, 5]);
        assert_eq!(service.undo(&mut ctx, 10).unwrap(), Some(3));
        assert_eq!(log(&ctx), vec![json!("a"), json!("b")]);
    }

    #[test]
    fn test_jump_both_directions() {
        let (mut service, mut ctx) = setup(10);
        for label in ["a", "b", "c", "d"] {
            mark(&mut service, &mut ctx, label);
        }
        service.jump(&mut ctx, 2).unwrap();
        assert_eq!(service.undo_ids(), vec![1, 2]);
        service.jump(&mut ctx, 4).unwrap();
        assert_eq!(service.undo_ids(), vec![1, 2, 3, 4]);
        assert_eq!(log(&ctx).len(), 4);
    }

    #[test]
    fn test_disabled_ignores_undo() {
        let (mut service, mut ctx) = setup(10);
        mark(&mut service, &mut ctx, "a");
        service.disabled = true;
        assert_eq!(service.undo(&mut ctx, 1).unwrap(), None);
        assert!(service.can_undo());
    }

    #[test]
    fn test_history_round_trip() {
        let (mut service, mut ctx) = setup(10);
        mark(&mut service, &mut ctx, "a");
        mark(&mut service, &mut ctx, "b");
        service.undo(&mut ctx, 1).unwrap();

        let mut history = service.to_json().unwrap();
        assert_eq!(history.undo_stack[0].options, json!({ "label": "a" }));
        history.undo_stack.push(CommandJson {
            id: 9,
            name: "Gone".into(),
            options: json!({}),
            executed: true,
            execute_time: 0,
        });

        let (mut restored, mut ctx2) = setup(10);
        restored.from_json(&history).unwrap();
        assert_eq!(restored.undo_ids(), vec![1]);
        assert!(restored.can_redo());
        let next = restored.execute(&mut ctx2, "Mark", json!({ "label": "z" })).unwrap();
        assert_eq!(next, 3);
    }

    #[test]
    fn test_events() {
        let (mut service, mut ctx) = setup(10);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        service.on("command:changed", move |event| {
            if let CommandEvent::Changed { command, can_undo, can_redo, .. } = event {
                sink.lock().unwrap().push((*command, *can_undo, *can_redo));
            }
        });
        mark(&mut service, &mut ctx, "a");
        service.undo(&mut ctx, 1).unwrap();
        assert_eq!(
            *seen.lock().unwrap(),
            vec![(Some(1), true, false), (Some(1), false, true)]
        );
    }
}
