// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Converts between the restricted and canonical JSON shapes of a message.
//!
//! Both directions walk the value in lockstep with the [`TypeGraph`]. A transform is chosen only
//! by the declared kind of the field being visited, never by the shape of the value itself, and
//! keys of an object that are not declared fields of its message are never visited. That is what
//! keeps side-band keys (extra properties, unknown fields) byte-identical across reconciliation.
//!
//! | Declared kind        | restricted                         | canonical              |
//! |----------------------|------------------------------------|------------------------|
//! | map                  | `[{"key": k, "value": v}, ...]`    | `{k: v, ...}`          |
//! | Struct/Value/List    | JSON-encoded string                | the JSON value         |
//! | Any                  | `{"@type": t, "value": "<json>"}`  | `{"@type": t, ...}`    |
//! | anything else        | unchanged                          | unchanged              |

use serde_json::{Map, Value};
use tracing::{debug, trace};
use type_graph::{
    FieldNode, MapType, MessageType, TypeGraph, TypeIndex, TypeKind, WellKnownType,
    well_known::type_name_from_url,
};

use crate::error::ReconcileError;

const ANY_TYPE_KEY: &str = "@type";
const ANY_VALUE_KEY: &str = "value";
const MAP_KEY: &str = "key";
const MAP_VALUE: &str = "value";

pub struct Reconciler<'g> {
    graph: &'g TypeGraph,
}

impl<'g> Reconciler<'g> {
    pub fn new(graph: &'g TypeGraph) -> Self {
        Self { graph }
    }

    /// Rewrites a restricted-dialect value of type `root` into canonical shape, in place.
    ///
    /// Malformed map entries are dropped and unparsable embedded JSON is left as a string. The
    /// only error is more than one member of a oneof being set.
    pub fn reconcile(&self, root: TypeIndex, value: &mut Value) -> Result<(), ReconcileError> {
        self.to_canonical(root, value)
    }

    /// Rewrites a canonical value of type `root` into restricted shape, in place.
    pub fn restrict(&self, root: TypeIndex, value: &mut Value) {
        self.to_restricted(root, value)
    }

    fn to_canonical(&self, id: TypeIndex, value: &mut Value) -> Result<(), ReconcileError> {
        let node = &self.graph[id];

        match &node.kind {
            TypeKind::Message(message) => self.message_to_canonical(&node.name, message, value),
            TypeKind::Map(map) => self.map_to_canonical(&node.name, map, value),
            TypeKind::WellKnown(wkt) => {
                well_known_to_canonical(*wkt, value);
                Ok(())
            }
            TypeKind::Scalar(_) | TypeKind::Enum(_) | TypeKind::OneofGroup(_) => Ok(()),
        }
    }

    fn message_to_canonical(
        &self,
        name: &str,
        message: &MessageType,
        value: &mut Value,
    ) -> Result<(), ReconcileError> {
        let Value::Object(object) = value else {
            return Ok(());
        };

        self.check_oneofs(message, object)?;

        for field in &message.fields {
            let Some(field_value) = declared_field_mut(object, field) else {
                continue;
            };
            trace!(message = name, field = %field.name, "Reconciling field");
            self.field_to_canonical(field, field_value)?;
        }
        Ok(())
    }

    fn field_to_canonical(&self, field: &FieldNode, value: &mut Value) -> Result<(), ReconcileError> {
        if value.is_null() {
            return Ok(());
        }

        if field.flags.repeated {
            if let Value::Array(items) = value {
                for item in items {
                    self.to_canonical(field.type_id, item)?;
                }
            }
            return Ok(());
        }

        self.to_canonical(field.type_id, value)
    }

    fn map_to_canonical(
        &self,
        name: &str,
        map: &MapType,
        value: &mut Value,
    ) -> Result<(), ReconcileError> {
        let Value::Array(entries) = value else {
            return Ok(());
        };

        let mut result = Map::new();
        for entry in std::mem::take(entries) {
            let Some((key, mut entry_value)) = split_entry(entry) else {
                debug!(map = name, "Dropping malformed map entry");
                continue;
            };
            if !entry_value.is_null() {
                self.to_canonical(map.value, &mut entry_value)?;
            }
            result.insert(key, entry_value);
        }

        *value = Value::Object(result);
        Ok(())
    }

    fn check_oneofs(&self, message: &MessageType, object: &Map<String, Value>) -> Result<(), ReconcileError> {
        for group in message
            .oneofs
            .iter()
            .filter_map(|id| self.graph.oneof_group(*id))
        {
            let present: Vec<String> = group
                .members
                .iter()
                .filter(|member| {
                    [&member.name, &member.json_name]
                        .into_iter()
                        .any(|key| object.get(key).is_some_and(|v| !v.is_null()))
                })
                .map(|member| member.name.clone())
                .collect();

            if present.len() > 1 {
                return Err(ReconcileError::ConflictingOneofMembers {
                    group: group.name.clone(),
                    members: present,
                });
            }
        }
        Ok(())
    }

    fn to_restricted(&self, id: TypeIndex, value: &mut Value) {
        let node = &self.graph[id];

        match &node.kind {
            TypeKind::Message(message) => self.message_to_restricted(message, value),
            TypeKind::Map(map) => self.map_to_restricted(map, value),
            TypeKind::WellKnown(wkt) => well_known_to_restricted(*wkt, value),
            TypeKind::Scalar(_) | TypeKind::Enum(_) | TypeKind::OneofGroup(_) => {}
        }
    }

    fn message_to_restricted(&self, message: &MessageType, value: &mut Value) {
        let Value::Object(object) = value else {
            return;
        };

        for field in &message.fields {
            let Some(field_value) = declared_field_mut(object, field) else {
                continue;
            };
            if field_value.is_null() {
                continue;
            }
            match field_value {
                Value::Array(items) if field.flags.repeated => {
                    for item in items {
                        self.to_restricted(field.type_id, item);
                    }
                }
                _ if field.flags.repeated => {}
                other => self.to_restricted(field.type_id, other),
            }
        }
    }

    fn map_to_restricted(&self, map: &MapType, value: &mut Value) {
        let Value::Object(object) = value else {
            return;
        };

        let entries = std::mem::take(object)
            .into_iter()
            .map(|(key, mut entry_value)| {
                if !entry_value.is_null() {
                    self.to_restricted(map.value, &mut entry_value);
                }
                let mut entry = Map::new();
                entry.insert(MAP_KEY.to_string(), Value::String(key));
                entry.insert(MAP_VALUE.to_string(), entry_value);
                Value::Object(entry)
            })
            .collect();

        *value = Value::Array(entries);
    }
}

/// The value of `field`, looked up by proto name first and JSON name second.
fn declared_field_mut<'a>(object: &'a mut Map<String, Value>, field: &FieldNode) -> Option<&'a mut Value> {
    let key = if object.contains_key(&field.name) {
        &field.name
    } else {
        &field.json_name
    };
    object.get_mut(key)
}

/// Splits `{"key": k, "value": v}`. Scalar keys are accepted in their string form.
fn split_entry(entry: Value) -> Option<(String, Value)> {
    let Value::Object(mut entry) = entry else {
        return None;
    };

    let key = match entry.remove(MAP_KEY)? {
        Value::String(key) => key,
        Value::Number(key) => key.to_string(),
        Value::Bool(key) => key.to_string(),
        _ => return None,
    };
    let value = entry.remove(MAP_VALUE)?;

    Some((key, value))
}

fn well_known_to_canonical(wkt: WellKnownType, value: &mut Value) {
    match wkt {
        wkt if wkt.is_opaque() => parse_embedded_json(value),
        WellKnownType::Any => any_to_canonical(value),
        _ => {}
    }
}

/// Replaces a JSON-encoded string with the value it encodes. Anything else is left as it is.
fn parse_embedded_json(value: &mut Value) {
    let Value::String(encoded) = value else {
        return;
    };

    match serde_json::from_str::<Value>(encoded) {
        Ok(parsed) => *value = parsed,
        Err(e) => debug!(error = %e, "Keeping unparsable embedded JSON as a string"),
    }
}

fn any_to_canonical(value: &mut Value) {
    let Value::Object(object) = value else {
        return;
    };
    let Some(type_url) = object.get(ANY_TYPE_KEY).and_then(Value::as_str) else {
        return;
    };
    let embeds_value = WellKnownType::from_full_name(type_name_from_url(type_url)).is_some();

    let Some(payload) = object.get_mut(ANY_VALUE_KEY) else {
        return;
    };
    parse_embedded_json(payload);

    if embeds_value {
        return;
    }

    // Regular messages are inlined next to `@type`
    if payload.is_object() {
        if let Some(Value::Object(fields)) = object.remove(ANY_VALUE_KEY) {
            for (key, field) in fields {
                if key != ANY_TYPE_KEY {
                    object.insert(key, field);
                }
            }
        }
    }
}

fn well_known_to_restricted(wkt: WellKnownType, value: &mut Value) {
    match wkt {
        wkt if wkt.is_opaque() => *value = Value::String(value.to_string()),
        WellKnownType::Any => any_to_restricted(value),
        _ => {}
    }
}

fn any_to_restricted(value: &mut Value) {
    let Value::Object(object) = value else {
        return;
    };
    let Some(type_url) = object.get(ANY_TYPE_KEY).cloned() else {
        return;
    };
    let embeds_value = type_url
        .as_str()
        .is_some_and(|url| WellKnownType::from_full_name(type_name_from_url(url)).is_some());

    let payload = if embeds_value {
        object.remove(ANY_VALUE_KEY).unwrap_or(Value::Null)
    } else {
        let mut fields = std::mem::take(object);
        fields.remove(ANY_TYPE_KEY);
        Value::Object(fields)
    };

    object.clear();
    object.insert(ANY_TYPE_KEY.to_string(), type_url);
    object.insert(ANY_VALUE_KEY.to_string(), Value::String(payload.to_string()));
}
