//! Structural payload schemas for capability inputs and outputs.
//!
//! A [`PayloadSchema`] wraps a compiled JSON Schema so the execution engine can
//! validate raw payloads without knowing concrete capability types.

use crate::error::RegistryError;
use jsonschema::JSONSchema;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct PayloadSchema {
    source: Option<Value>,
    compiled: Option<Arc<JSONSchema>>,
}

impl PayloadSchema {
    /// Schema that accepts every payload.
    pub fn any() -> Self {
        Self::default()
    }

    /// Compile a JSON Schema document.
    pub fn from_json(schema: Value) -> Result<Self, RegistryError> {
        let compiled = JSONSchema::compile(&schema)
            .map_err(|e| RegistryError::InvalidSchema(e.to_string()))?;
        Ok(Self {
            source: Some(schema),
            compiled: Some(Arc::new(compiled)),
        })
    }

    pub fn is_any(&self) -> bool {
        self.compiled.is_none()
    }

    /// Validate a payload, joining every violation into one message.
    pub fn validate(&self, payload: &Value) -> Result<(), String> {
        let Some(compiled) = &self.compiled else {
            return Ok(());
        };
        compiled.validate(payload).map_err(|errors| {
            errors
                .map(|e| {
                    let path = e.instance_path.to_string();
                    if path.is_empty() {
                        e.to_string()
                    } else {
                        format!("{}: {}", path, e)
                    }
                })
                .collect::<Vec<_>>()
                .join("; ")
        })
    }
}

impl fmt::Debug for PayloadSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PayloadSchema")
            .field("source", &self.source)
            .finish()
    }
}
