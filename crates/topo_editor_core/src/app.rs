// SPDX-License-Identifier: MIT OR Apache-2.0
//! Page runtime.
//!
//! [`App`] owns the pages of one [`MApp`], the reactive state store, the
//! effect bindings of every component and the executors. Components report
//! their render lifecycle through `node_*` calls; events fired with
//! [`App::emit`] run the effects bound under `"{event}_{component}"`.

use crate::effect::{EffectQueue, HostBindings};
use crate::error::EffectError;
use crate::executor::{ExecutorHandler, ExecutorManager};
use crate::node::{Node, NodeInstance, EVENT_MOUNTED, EVENT_UPDATE};
use crate::page::Page;
use crate::schema::{EffectConfig, MApp, MComponent, MExecutorConfig};
use crate::state::StateManager;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use topo_editor_expression::{
    ComputedExpression, Expression, ExpressionParser, ExpressionResult, ReactiveContext, Unsubscribe,
};
use topo_editor_utils::event::{EventArgs, EventBus, ListenerId};

/// Default design width in pixels
pub const DEFAULT_DESIGN_WIDTH: f64 = 375.0;

/// Runtime environment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Env {
    /// Editing and previews
    #[default]
    Development,
    /// Published pages
    Production,
}

/// Options for [`App::new`]
#[derive(Debug, Clone)]
pub struct AppOptions {
    /// Runtime environment
    pub env: Env,
    /// Width the pages were designed for
    pub design_width: f64,
    /// App to load
    pub config: Option<MApp>,
    /// Page to open first
    pub cur_page: Option<String>,
    /// Host callbacks
    pub host: HostBindings,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            env: Env::default(),
            design_width: DEFAULT_DESIGN_WIDTH,
            config: None,
            cur_page: None,
            host: HostBindings::default(),
        }
    }
}

/// Event delivered to plain listeners
#[derive(Debug, Clone, PartialEq)]
pub struct AppEvent {
    /// Full event name (e.g. `click_btn1`)
    pub name: String,
    /// Payload passed to [`App::emit`]
    pub payload: Value,
}

impl EventArgs for AppEvent {
    fn event_name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone)]
struct BoundEffect {
    node: String,
    effect: EffectConfig,
}

/// Runtime for one app
#[derive(Debug)]
pub struct App {
    /// Runtime environment
    pub env: Env,
    /// Width the pages were designed for
    pub design_width: f64,
    config: Option<MApp>,
    pages: IndexMap<String, Page>,
    page: Option<String>,
    state: StateManager,
    bindings: IndexMap<String, Vec<BoundEffect>>,
    events: EventBus<AppEvent>,
    pub(crate) executors: ExecutorManager,
    pub(crate) effect_queue: EffectQueue,
    pub(crate) host: HostBindings,
}

impl App {
    /// Create the runtime and load `options.config` if given
    pub fn new(options: AppOptions) -> Self {
        let state = StateManager::new();
        let executors = ExecutorManager::new(state.context().clone());
        let mut app = Self {
            env: options.env,
            design_width: options.design_width,
            config: None,
            pages: IndexMap::new(),
            page: None,
            state,
            bindings: IndexMap::new(),
            events: EventBus::new(),
            executors,
            effect_queue: EffectQueue::new(),
            host: options.host,
        };
        if let Some(config) = options.config {
            app.set_config(config, options.cur_page.as_deref());
        }
        app
    }

    /// Replace host callbacks
    pub fn set_host(&mut self, host: HostBindings) {
        self.host = host;
    }

    /// Loaded app description
    pub fn config(&self) -> Option<&MApp> {
        self.config.as_ref()
    }

    /// Load an app: drops listeners and bindings, builds pages, seeds
    /// component state and executor records, then opens `cur_page` (or the
    /// page already open, or the first one).
    pub fn set_config(&mut self, config: MApp, cur_page: Option<&str>) {
        self.events.remove_all_listeners();
        self.bindings.clear();
        self.pages = IndexMap::new();

        for page_config in &config.items {
            self.init_node(page_config);
            let page = Page::new(page_config);
            tracing::debug!(page = %page.id, nodes = page.len(), "Page loaded");
            self.pages.insert(page.id.clone(), page);
        }
        for executor in &config.executors {
            self.executors.init_executor(executor);
        }

        let current = cur_page.map(str::to_string).or_else(|| self.page.clone());
        tracing::info!(app = %config.id, pages = self.pages.len(), "App config loaded");
        self.config = Some(config);
        self.set_page(current.as_deref());
    }

    fn init_node(&mut self, config: &MComponent) {
        for (event, effects) in &config.event {
            for effect in effects {
                self.bind_event(event, &config.id, effect.clone());
            }
        }
        self.state
            .set_state(&config.id, Value::Object(config.property.clone()));
        self.state
            .set_state(&format!("{}.style", config.id), Value::Object(config.style.clone()));

        for item in &config.items {
            self.init_node(item);
        }
    }

    /// Open a page; unknown or missing ids fall back to the first page
    pub fn set_page(&mut self, id: Option<&str>) {
        self.page = id
            .filter(|id| self.pages.contains_key(*id))
            .map(str::to_string)
            .or_else(|| self.pages.keys().next().cloned());
    }

    /// Page currently open
    pub fn current_page(&self) -> Option<&Page> {
        self.page.as_ref().and_then(|id| self.pages.get(id))
    }

    /// Look up a page
    pub fn get_page(&self, id: &str) -> Option<&Page> {
        self.pages.get(id)
    }

    /// All pages in declaration order
    pub fn pages(&self) -> impl Iterator<Item = &Page> {
        self.pages.values()
    }

    /// Find a component, preferring the open page
    pub fn get_node(&self, id: &str) -> Option<&Node> {
        self.current_page()
            .and_then(|page| page.get_node(id))
            .or_else(|| self.pages.values().find_map(|page| page.get_node(id)))
    }

    fn get_node_mut(&mut self, id: &str) -> Result<&mut Node, EffectError> {
        let in_current = self
            .current_page()
            .is_some_and(|page| page.get_node(id).is_some());
        let page_id = if in_current {
            self.page.clone()
        } else {
            self.pages
                .iter()
                .find(|(_, page)| page.get_node(id).is_some())
                .map(|(page_id, _)| page_id.clone())
        };

        page_id
            .and_then(|page_id| self.pages.get_mut(&page_id))
            .and_then(|page| page.get_node_mut(id))
            .ok_or_else(|| EffectError::NodeNotFound(id.to_string()))
    }

    // State

    /// Shared state context
    pub fn state(&self) -> &ReactiveContext {
        self.state.context()
    }

    /// Read state
    pub fn get_state(&self, path: &str) -> Option<Value> {
        self.state.get_state(path)
    }

    /// Write state; expression objects stay bound
    pub fn set_state(&mut self, path: &str, value: Value) -> Value {
        self.state.set_state(path, value)
    }

    /// Remove state
    pub fn delete_state(&mut self, path: &str) -> bool {
        self.state.delete_state(path)
    }

    /// Re-evaluate bindings after a batch of writes
    pub fn flush(&self) -> usize {
        self.state.flush()
    }

    /// Async variant of [`Self::flush`]
    pub async fn flush_async(&self) -> usize {
        self.state.flush_async().await
    }

    /// Expression parser over the state
    pub fn parser(&self) -> &ExpressionParser {
        self.state.parser()
    }

    /// Evaluate an expression against the state
    pub fn parse_expression(&self, expression: &str) -> ExpressionResult<Value> {
        self.parser().eval_sync(expression)
    }

    /// Evaluate with async functions available
    pub async fn parse_expression_async(&self, expression: &str) -> ExpressionResult<Value> {
        self.parser().eval(expression).await
    }

    /// Bind an expression to a callback
    pub fn bind_expression(
        &self,
        expression: impl Into<Expression>,
        callback: impl FnMut(Value) + Send + 'static,
    ) -> Unsubscribe {
        self.state.binding().bind_expression(expression, callback)
    }

    /// Lazily evaluated expression
    pub fn computed_expression(&self, expression: impl Into<Expression>) -> ComputedExpression {
        self.state.binding().computed_expression(expression)
    }

    // Events

    /// Bind an effect to `{name}_{node}`
    pub fn bind_event(&mut self, name: &str, node: &str, effect: EffectConfig) {
        self.bindings
            .entry(format!("{name}_{node}"))
            .or_default()
            .push(BoundEffect {
                node: node.to_string(),
                effect,
            });
    }

    /// Listen to an event name
    pub fn on(&mut self, name: impl Into<String>, listener: impl Fn(&AppEvent) + Send + Sync + 'static) -> ListenerId {
        self.events.on(name, listener)
    }

    /// Listen for one delivery
    pub fn once(&mut self, name: impl Into<String>, listener: impl Fn(&AppEvent) + Send + Sync + 'static) -> ListenerId {
        self.events.once(name, listener)
    }

    /// Stop listening
    pub fn off(&mut self, id: ListenerId) -> bool {
        self.events.off(id)
    }

    /// Fire an event: bound effects first, then listeners. Effect failures
    /// are logged. Returns whether anything handled the event.
    pub fn emit(&mut self, name: &str, payload: Value) -> bool {
        let bound = self.bindings.get(name).cloned().unwrap_or_default();
        for BoundEffect { node, effect } in &bound {
            if let Err(error) = self.handle_effect(node, effect, &payload) {
                tracing::error!(event = name, node = %node, %error, "Effect failed");
            }
        }

        let listened = self.events.emit(&AppEvent {
            name: name.to_string(),
            payload,
        });
        !bound.is_empty() || listened > 0
    }

    // Lifecycle

    /// Component instance created
    pub fn node_created(&mut self, id: &str, instance: NodeInstance) -> Result<(), EffectError> {
        self.get_node_mut(id)?.created(instance);
        Ok(())
    }

    /// Component mounted: fires `mounted_{id}` and delivers queued effects.
    /// Returns how many queued effects were delivered.
    pub fn node_mounted(&mut self, id: &str, instance: NodeInstance) -> Result<usize, EffectError> {
        self.get_node_mut(id)?.mounted(instance);
        tracing::debug!(node = id, queued = self.queued_effects(id), "Component mounted");
        self.emit(&format!("{EVENT_MOUNTED}_{id}"), Value::Null);
        Ok(self.flush_effect_queue(id))
    }

    /// Component re-rendered: fires `update_{id}`
    pub fn node_updated(&mut self, id: &str, instance: Option<NodeInstance>) -> Result<(), EffectError> {
        self.get_node_mut(id)?.updated(instance);
        self.emit(&format!("{EVENT_UPDATE}_{id}"), Value::Null);
        Ok(())
    }

    /// Component torn down
    pub fn node_destroyed(&mut self, id: &str) -> Result<(), EffectError> {
        self.get_node_mut(id)?.destroyed();
        Ok(())
    }

    // Executors

    /// Executor records and handlers
    pub fn executors(&self) -> &ExecutorManager {
        &self.executors
    }

    /// Register the handler for an executor type
    pub fn register_executor_handler(&mut self, kind: impl Into<String>, handler: Arc<dyn ExecutorHandler>) {
        self.executors.register_handler(kind, handler);
    }

    /// Add an executor outside the app description
    pub fn init_executor(&mut self, config: &MExecutorConfig) {
        self.executors.init_executor(config);
    }

    /// Run executors scheduled by effects. Returns how many succeeded.
    pub async fn run_executors(&mut self) -> usize {
        self.executors.run_pending().await
    }

    /// Drop listeners, bindings, queues, pages and state
    pub fn destroy(&mut self) {
        self.events.remove_all_listeners();
        self.bindings.clear();
        self.effect_queue.clear();
        self.executors.clear_pending();
        self.pages.clear();
        self.page = None;
        self.config = None;
        self.state.clear();
        tracing::debug!("App destroyed");
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new(AppOptions::default())
    }
}
