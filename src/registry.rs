//! The type registry other subsystems resolve entity types from.

use std::sync::Mutex;

use tracing::info;

use crate::artifacts::BindingDescriptor;

/// Receives type changes from the lifecycle manager. The engine only ever
/// writes to the registry.
pub trait TypeRegistry: Send + Sync {
    /// Drops any cached definition for `type_id`.
    fn invalidate(&self, type_id: &str) -> std::result::Result<(), String>;

    /// Makes a freshly computed descriptor available.
    fn publish(&self, _descriptor: &BindingDescriptor) -> std::result::Result<(), String> {
        Ok(())
    }
}

pub struct NoopRegistry;

impl TypeRegistry for NoopRegistry {
    fn invalidate(&self, _type_id: &str) -> std::result::Result<(), String> {
        Ok(())
    }
}

/// Logs every call. Used by the command line.
pub struct LoggingRegistry;

impl TypeRegistry for LoggingRegistry {
    fn invalidate(&self, type_id: &str) -> std::result::Result<(), String> {
        info!("Invalidated type {}", type_id);
        Ok(())
    }

    fn publish(&self, descriptor: &BindingDescriptor) -> std::result::Result<(), String> {
        info!(
            "Published type {} ({} field(s))",
            descriptor.type_id,
            descriptor.fields.len()
        );
        Ok(())
    }
}

/// Records calls in memory, for embedding applications that poll for
/// changed types.
#[derive(Default)]
pub struct RecordingRegistry {
    invalidated: Mutex<Vec<String>>,
    published: Mutex<Vec<BindingDescriptor>>,
}

impl RecordingRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Type ids invalidated since the last call, oldest first.
    pub fn take_invalidated(&self) -> Vec<String> {
        std::mem::take(&mut *self.invalidated.lock().unwrap_or_else(|e| e.into_inner()))
    }

    /// Descriptors published since the last call, oldest first.
    pub fn take_published(&self) -> Vec<BindingDescriptor> {
        std::mem::take(&mut *self.published.lock().unwrap_or_else(|e| e.into_inner()))
    }
}

impl TypeRegistry for RecordingRegistry {
    fn invalidate(&self, type_id: &str) -> std::result::Result<(), String> {
        self.invalidated
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(type_id.to_string());
        Ok(())
    }

    fn publish(&self, descriptor: &BindingDescriptor) -> std::result::Result<(), String> {
        self.published
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(descriptor.clone());
        Ok(())
    }
}
