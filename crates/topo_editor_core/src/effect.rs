// SPDX-License-Identifier: MIT OR Apache-2.0
//! Effect dispatch.
//!
//! Control effects aimed at a component without a live instance wait in a
//! per-target FIFO queue until that component mounts. The queue is drained
//! completely on each mount and every queued effect is delivered at most
//! once.

use crate::app::App;
use crate::error::EffectError;
use crate::schema::{AlertKind, EffectConfig, EffectKind, MappingStruct, NavigateTarget};
use crate::state::as_expression;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use topo_editor_expression::value::truthy;

/// A control effect waiting for its target to mount
#[derive(Debug, Clone, PartialEq)]
pub struct EffectCache {
    /// Component whose event produced the effect
    pub from: String,
    /// The effect
    pub effect: EffectConfig,
    /// Event payload
    pub payload: Value,
}

/// Pending control effects keyed by target component
#[derive(Debug, Default)]
pub struct EffectQueue {
    queues: IndexMap<String, VecDeque<EffectCache>>,
}

impl EffectQueue {
    /// Empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an effect for its target; non-control effects are ignored
    pub fn push(&mut self, cache: EffectCache) -> bool {
        let Some(target) = cache.effect.target_component().map(str::to_string) else {
            return false;
        };
        self.queues.entry(target).or_default().push_back(cache);
        true
    }

    /// Take every effect waiting for `target`, oldest first
    pub fn take(&mut self, target: &str) -> VecDeque<EffectCache> {
        self.queues.shift_remove(target).unwrap_or_default()
    }

    /// Effects waiting for `target`
    pub fn len(&self, target: &str) -> usize {
        self.queues.get(target).map_or(0, VecDeque::len)
    }

    /// Whether nothing is waiting
    pub fn is_empty(&self) -> bool {
        self.queues.values().all(VecDeque::is_empty)
    }

    /// Drop everything
    pub fn clear(&mut self) {
        self.queues.clear();
    }
}

/// Navigation request handed to the host
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NavigationTarget {
    /// Page id
    pub page: String,
    /// Window to open in
    pub target: NavigateTarget,
    /// Query parameters, `page` included
    pub query: Map<String, Value>,
}

/// Toast callback
pub type ToastFn = Arc<dyn Fn(&str, AlertKind) + Send + Sync>;
/// `postMessage` callback receiving data and target origin
pub type PostMessageFn = Arc<dyn Fn(&str, &str) + Send + Sync>;
/// Navigation callback
pub type NavigateFn = Arc<dyn Fn(&NavigationTarget) + Send + Sync>;

/// Side effects the embedding host performs
#[derive(Clone, Default)]
pub struct HostBindings {
    /// Shows alerts
    pub toast: Option<ToastFn>,
    /// Posts messages to the parent window
    pub post_message: Option<PostMessageFn>,
    /// Opens pages
    pub navigate: Option<NavigateFn>,
}

impl HostBindings {
    /// Set the toast callback
    pub fn with_toast(mut self, toast: impl Fn(&str, AlertKind) + Send + Sync + 'static) -> Self {
        self.toast = Some(Arc::new(toast));
        self
    }

    /// Set the `postMessage` callback
    pub fn with_post_message(mut self, post: impl Fn(&str, &str) + Send + Sync + 'static) -> Self {
        self.post_message = Some(Arc::new(post));
        self
    }

    /// Set the navigation callback
    pub fn with_navigate(mut self, navigate: impl Fn(&NavigationTarget) + Send + Sync + 'static) -> Self {
        self.navigate = Some(Arc::new(navigate));
        self
    }
}

impl fmt::Debug for HostBindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostBindings")
            .field("toast", &self.toast.is_some())
            .field("post_message", &self.post_message.is_some())
            .field("navigate", &self.navigate.is_some())
            .finish()
    }
}

/// What handling one effect did
#[derive(Debug, Clone, PartialEq)]
pub enum EffectOutcome {
    /// Condition was falsy or no host callback was set
    Skipped,
    /// Target method ran and returned this
    Invoked(Value),
    /// Target not mounted; effect queued
    Queued,
    /// Navigation requested
    Navigated(NavigationTarget),
    /// Executor marked loading and queued
    ExecutorScheduled,
    /// Toast shown
    Alerted,
    /// Message posted
    Posted,
}

impl App {
    /// Dispatch one effect fired by component `from`
    pub fn handle_effect(
        &mut self,
        from: &str,
        effect: &EffectConfig,
        payload: &Value,
    ) -> Result<EffectOutcome, EffectError> {
        if self.current_page().is_none() {
            return Err(EffectError::NoActivePage);
        }

        if let Some(condition) = &effect.condition {
            match self.parse_expression(condition) {
                Ok(value) if truthy(&value) => {}
                Ok(_) => return Ok(EffectOutcome::Skipped),
                Err(error) => {
                    tracing::warn!(from, %condition, %error, "Effect condition failed, skipping");
                    return Ok(EffectOutcome::Skipped);
                }
            }
        }

        match &effect.kind {
            EffectKind::ControlComponent {
                component,
                method,
                mappings,
            } => self.control_component(from, effect, component, method, mappings, payload),
            EffectKind::Navigate { page, params, target } => {
                let mut query = Map::new();
                query.insert("page".into(), Value::String(page.clone()));
                query.extend(self.calculate_props(params)?);
                let navigation = NavigationTarget {
                    page: page.clone(),
                    target: target.unwrap_or_default(),
                    query,
                };
                if let Some(navigate) = &self.host.navigate {
                    navigate(&navigation);
                }
                Ok(EffectOutcome::Navigated(navigation))
            }
            EffectKind::Executor { executor, mappings } => {
                let mut props = payload.as_object().cloned().unwrap_or_default();
                props.extend(self.calculate_props(mappings)?);
                if !self.executors.schedule(executor, Value::Object(props)) {
                    return Err(EffectError::ExecutorNotFound(executor.clone()));
                }
                Ok(EffectOutcome::ExecutorScheduled)
            }
            EffectKind::ShowAlert { message, message_type } => match &self.host.toast {
                Some(toast) => {
                    toast(message, message_type.unwrap_or_default());
                    Ok(EffectOutcome::Alerted)
                }
                None => {
                    tracing::debug!(%message, "No toast host, alert dropped");
                    Ok(EffectOutcome::Skipped)
                }
            },
            EffectKind::PostMessage { data, origins } => match &self.host.post_message {
                Some(post) => {
                    post(data, origins);
                    Ok(EffectOutcome::Posted)
                }
                None => Ok(EffectOutcome::Skipped),
            },
        }
    }

    fn control_component(
        &mut self,
        from: &str,
        effect: &EffectConfig,
        component: &str,
        method: &str,
        mappings: &[Value],
        payload: &Value,
    ) -> Result<EffectOutcome, EffectError> {
        let node = self
            .current_page()
            .and_then(|page| page.get_node(component))
            .ok_or_else(|| EffectError::NodeNotFound(component.to_string()))?;

        let Some(instance) = node.instance() else {
            tracing::debug!(from, target = component, method, "Target not mounted, queueing effect");
            self.effect_queue.push(EffectCache {
                from: from.to_string(),
                effect: effect.clone(),
                payload: payload.clone(),
            });
            return Ok(EffectOutcome::Queued);
        };

        let callable = instance.method(method).ok_or_else(|| EffectError::MethodNotFound {
            node: component.to_string(),
            method: method.to_string(),
        })?;

        let args = mappings
            .iter()
            .map(|mapping| match as_expression(mapping) {
                Some(expression) => self.parse_expression(&expression.expression),
                None => Ok(mapping.clone()),
            })
            .collect::<Result<Vec<_>, _>>()?;

        let result = callable(&args).map_err(|source| EffectError::Method {
            node: component.to_string(),
            method: method.to_string(),
            source,
        })?;
        Ok(EffectOutcome::Invoked(result))
    }

    /// Deliver effects queued for `target`. Failures are logged and the
    /// rest of the queue is still delivered. Returns how many succeeded.
    pub fn flush_effect_queue(&mut self, target: &str) -> usize {
        let queue = self.effect_queue.take(target);
        let mut delivered = 0;
        for cache in queue {
            match self.handle_effect(&cache.from, &cache.effect, &cache.payload) {
                Ok(_) => delivered += 1,
                Err(error) => {
                    tracing::error!(from = %cache.from, target, %error, "Queued effect failed");
                }
            }
        }
        delivered
    }

    /// Effects waiting for `target` to mount
    pub fn queued_effects(&self, target: &str) -> usize {
        self.effect_queue.len(target)
    }

    /// Evaluate mappings into a `target -> value` object
    pub fn calculate_props(
        &self,
        mappings: &[MappingStruct],
    ) -> Result<Map<String, Value>, topo_editor_expression::ExpressionError> {
        mappings
            .iter()
            .map(|mapping| {
                let value = match mapping.expression.as_deref() {
                    Some(expression) if !expression.trim().is_empty() => self.parse_expression(expression)?,
                    _ => Value::Null,
                };
                Ok((mapping.target.clone(), value))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cache(target: &str, n: i64) -> EffectCache {
        EffectCache {
            from: "src".into(),
            effect: EffectConfig::control(target, "m", vec![json!(n)]),
            payload: Value::Null,
        }
    }

    #[test]
    fn test_queue_is_fifo_per_target() {
        let mut queue = EffectQueue::new();
        queue.push(cache("a", 1));
        queue.push(cache("b", 2));
        queue.push(cache("a", 3));

        assert_eq!(queue.len("a"), 2);
        let taken: Vec<_> = queue.take("a").into_iter().map(|c| c.effect).collect();
        assert_eq!(
            taken,
            vec![
                EffectConfig::control("a", "m", vec![json!(1)]),
                EffectConfig::control("a", "m", vec![json!(3)]),
            ]
        );
        assert_eq!(queue.len("a"), 0);
        assert!(!queue.is_empty());
    }

    #[test]
    fn test_queue_rejects_non_control_effects() {
        let mut queue = EffectQueue::new();
        let accepted = queue.push(EffectCache {
            from: "src".into(),
            effect: EffectConfig::new(EffectKind::PostMessage {
                data: "x".into(),
                origins: "*".into(),
            }),
            payload: Value::Null,
        });
        assert!(!accepted);
        assert!(queue.is_empty());
    }
}
