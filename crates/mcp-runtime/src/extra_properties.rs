// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Parameters that travel alongside a message without being part of it.
//!
//! An extra property is advertised as a top-level string property of a tool's input schema. At
//! call time its value is moved out of the arguments into the [`CallContext`], so that neither the
//! reconciler nor the decoder ever sees it.

use std::collections::HashSet;

use schema_introspection::JsonSchemaInline;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::trace;
use type_graph::{MessageType, SchemaGenerationError};

use crate::{call_context::CallContext, error::ExtraPropertyError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtraProperty {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub required: bool,
    pub context_key: String,
}

impl ExtraProperty {
    /// An optional property stored in the context under its own name.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            context_key: name.clone(),
            name,
            description: description.into(),
            required: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_context_key(mut self, context_key: impl Into<String>) -> Self {
        self.context_key = context_key.into();
        self
    }
}

/// Fails if two extra properties share a name or a context key, or if an extra property shares a
/// name (proto or JSON) with a field of `message`.
pub fn check_collisions(
    message_name: &str,
    message: &MessageType,
    extras: &[ExtraProperty],
) -> Result<(), SchemaGenerationError> {
    let mut names = HashSet::new();
    let mut context_keys = HashSet::new();
    for extra in extras {
        if !names.insert(extra.name.as_str()) {
            return Err(SchemaGenerationError::DuplicateExtraProperty {
                what: "name",
                value: extra.name.clone(),
            });
        }
        if !context_keys.insert(extra.context_key.as_str()) {
            return Err(SchemaGenerationError::DuplicateExtraProperty {
                what: "context key",
                value: extra.context_key.clone(),
            });
        }
    }

    match extras.iter().find(|extra| message.field(&extra.name).is_some()) {
        Some(extra) => Err(SchemaGenerationError::ExtraPropertyCollision {
            message: message_name.to_string(),
            property: extra.name.clone(),
        }),
        None => Ok(()),
    }
}

/// Adds the extra properties to the top level of `schema`. Nested schemas are left alone.
pub fn augment_schema(schema: &mut JsonSchemaInline, extras: &[ExtraProperty]) {
    for extra in extras {
        let property = JsonSchemaInline::string().with_description(&extra.description);
        let mut augmented = std::mem::take(schema).with_property(&extra.name, property.into());
        if extra.required {
            augmented = augmented.with_required(&extra.name);
        }
        *schema = augmented;
    }
}

/// Moves the extra properties present at the top level of `arguments` into a new context.
///
/// Values are moved as-is. A missing required property is reported before anything is removed,
/// so `arguments` is untouched on error.
pub fn extract(
    extras: &[ExtraProperty],
    arguments: &mut Value,
) -> Result<CallContext, ExtraPropertyError> {
    let object = arguments.as_object_mut();

    let is_present = |name: &str| object.as_ref().is_some_and(|o| o.contains_key(name));
    if let Some(missing) = extras
        .iter()
        .find(|extra| extra.required && !is_present(&extra.name))
    {
        return Err(ExtraPropertyError::MissingRequired {
            name: missing.name.clone(),
        });
    }

    let mut context = CallContext::new();
    if let Some(object) = object {
        for extra in extras {
            if let Some(value) = object.remove(&extra.name) {
                trace!(property = %extra.name, context_key = %extra.context_key, "Extracted extra property");
                context.insert(extra.context_key.clone(), value);
            }
        }
    }
    Ok(context)
}
