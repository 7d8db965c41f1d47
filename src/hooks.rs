//! Pre and post lifecycle hooks.
//!
//! Pre hooks run after validation and before anything is written; any of them
//! can veto the operation. Post hooks run after the operation has completed
//! and can only observe it.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    TemplateCreate,
    TemplateUpdate,
    TemplateDelete,
    FieldCreate,
    FieldUpdate,
    FieldDelete,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::TemplateCreate => "template_create",
            Self::TemplateUpdate => "template_update",
            Self::TemplateDelete => "template_delete",
            Self::FieldCreate => "field_create",
            Self::FieldUpdate => "field_update",
            Self::FieldDelete => "field_delete",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LifecycleEvent {
    pub kind: EventKind,
    /// `None` for a template that has not been inserted yet.
    pub template_id: Option<i64>,
    pub tenant_id: String,
    pub project_id: String,
    pub entity_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_name: Option<String>,
}

pub trait LifecycleHook: Send + Sync {
    fn name(&self) -> &str;

    /// Return `Err(reason)` to veto the operation.
    fn before(&self, _event: &LifecycleEvent) -> std::result::Result<(), String> {
        Ok(())
    }

    fn after(&self, _event: &LifecycleEvent) {}
}

/// Hooks in registration order.
#[derive(Default, Clone)]
pub struct HookRegistry {
    hooks: Vec<Arc<dyn LifecycleHook>>,
}

impl HookRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, hook: Arc<dyn LifecycleHook>) {
        debug!("Registered lifecycle hook '{}'", hook.name());
        self.hooks.push(hook);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Runs every pre hook until one vetoes.
    pub fn before(&self, event: &LifecycleEvent) -> Result<()> {
        for hook in &self.hooks {
            if let Err(reason) = hook.before(event) {
                warn!(
                    "Hook '{}' vetoed {} of '{}': {}",
                    hook.name(),
                    event.kind,
                    event.entity_name,
                    reason
                );
                return Err(Error::Vetoed(format!("{}: {reason}", hook.name())));
            }
        }
        Ok(())
    }

    pub fn after(&self, event: &LifecycleEvent) {
        for hook in &self.hooks {
            hook.after(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Recorder {
        seen: Mutex<Vec<String>>,
        veto: bool,
    }

    impl LifecycleHook for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }

        fn before(&self, event: &LifecycleEvent) -> std::result::Result<(), String> {
            self.seen.lock().unwrap().push(format!("before:{}", event.kind));
            if self.veto {
                Err("not today".to_string())
            } else {
                Ok(())
            }
        }

        fn after(&self, event: &LifecycleEvent) {
            self.seen.lock().unwrap().push(format!("after:{}", event.kind));
        }
    }

    fn event() -> LifecycleEvent {
        LifecycleEvent {
            kind: EventKind::TemplateCreate,
            template_id: None,
            tenant_id: "t1".to_string(),
            project_id: "p1".to_string(),
            entity_name: "orders".to_string(),
            field_name: None,
        }
    }

    #[test]
    fn test_hooks_run_in_order() {
        let first = Arc::new(Recorder { seen: Mutex::default(), veto: false });
        let second = Arc::new(Recorder { seen: Mutex::default(), veto: false });
        let mut hooks = HookRegistry::new();
        hooks.register(first.clone());
        hooks.register(second.clone());

        hooks.before(&event()).unwrap();
        hooks.after(&event());
        assert_eq!(
            *first.seen.lock().unwrap(),
            vec!["before:template_create", "after:template_create"]
        );
        assert_eq!(second.seen.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_veto_stops_later_hooks() {
        let vetoing = Arc::new(Recorder { seen: Mutex::default(), veto: true });
        let later = Arc::new(Recorder { seen: Mutex::default(), veto: false });
        let mut hooks = HookRegistry::new();
        hooks.register(vetoing);
        hooks.register(later.clone());

        let result = hooks.before(&event());
        assert!(matches!(result, Err(Error::Vetoed(reason)) if reason.contains("not today")));
        assert!(later.seen.lock().unwrap().is_empty());
    }
}
