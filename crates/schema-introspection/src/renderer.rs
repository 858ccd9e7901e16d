// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Projects a [`TypeGraph`] into JSON Schema.
//!
//! Every message other than the root is rendered once into `$defs` (keyed by its qualified name)
//! and referenced from each use site, so the schema has the same sharing and cycle structure as
//! the graph. The root is rendered inline; if the root is reachable from itself it is also copied
//! into `$defs` so the recursive `$ref` resolves.

use indexmap::IndexMap;
use tracing::trace;
use type_graph::{
    FieldNode, MapType, MessageType, OneofGroup, ScalarKind, TypeGraph, TypeIndex, TypeKind,
    WellKnownType,
};

use crate::{
    dialect::SchemaDialect,
    json_schema::{AdditionalProperties, JsonSchema, JsonSchemaInline, JsonSchemaRef},
};

const SIGNED_INTEGER_PATTERN: &str = r"^-?(0|[1-9]\d*)$";
const UNSIGNED_INTEGER_PATTERN: &str = r"^(0|[1-9]\d*)$";
const BOOL_KEY_PATTERN: &str = "^(true|false)$";
const DURATION_PATTERN: &str = r"^-?\d+(\.\d{1,9})?s$";

/// The input schema of one message in both dialects.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedSchemas {
    pub canonical: JsonSchemaInline,
    pub restricted: JsonSchemaInline,
}

impl RenderedSchemas {
    pub fn render(graph: &TypeGraph, root: TypeIndex) -> Self {
        Self {
            canonical: SchemaRenderer::new(graph, SchemaDialect::Canonical).render(root),
            restricted: SchemaRenderer::new(graph, SchemaDialect::Restricted).render(root),
        }
    }

    pub fn get(&self, dialect: SchemaDialect) -> &JsonSchemaInline {
        match dialect {
            SchemaDialect::Canonical => &self.canonical,
            SchemaDialect::Restricted => &self.restricted,
        }
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut JsonSchemaInline> {
        [&mut self.canonical, &mut self.restricted].into_iter()
    }
}

pub struct SchemaRenderer<'g> {
    graph: &'g TypeGraph,
    dialect: SchemaDialect,
}

struct Definitions<'g> {
    root: &'g str,
    root_referenced: bool,
    schemas: IndexMap<String, JsonSchema>,
}

impl<'g> SchemaRenderer<'g> {
    pub fn new(graph: &'g TypeGraph, dialect: SchemaDialect) -> Self {
        Self { graph, dialect }
    }

    pub fn render(&self, root: TypeIndex) -> JsonSchemaInline {
        let mut defs = Definitions {
            root: &self.graph[root].name,
            root_referenced: false,
            schemas: IndexMap::new(),
        };

        let mut schema = match self.graph.message(root) {
            Some(message) => self.message_schema(message, &mut defs),
            None => match self.type_schema(root, &mut defs) {
                JsonSchema::Inline(inline) => inline,
                JsonSchema::Ref(_) => JsonSchemaInline::default(),
            },
        };

        if defs.root_referenced {
            trace!(root = defs.root, "Root message is recursive");
            defs.schemas
                .insert(defs.root.to_string(), schema.clone().into());
        }
        if !defs.schemas.is_empty() {
            schema.defs = Some(defs.schemas);
        }
        schema
    }

    fn is_canonical(&self) -> bool {
        self.dialect == SchemaDialect::Canonical
    }

    fn message_schema(&self, message: &MessageType, defs: &mut Definitions<'g>) -> JsonSchemaInline {
        let mut schema = JsonSchemaInline::object();
        schema.properties = Some(IndexMap::new());

        for field in &message.fields {
            schema = schema.with_property(&field.name, self.field_schema(field, defs));
            if field.flags.required {
                schema = schema.with_required(&field.name);
            }
        }

        if self.is_canonical() {
            let mut constraints: Vec<_> = message
                .oneofs
                .iter()
                .filter_map(|group| self.graph.oneof_group(*group))
                .map(|group| self.oneof_constraint(group, defs))
                .collect();

            if constraints.len() == 1 {
                let constraint = constraints.remove(0);
                schema.comment = constraint.comment;
                schema.one_of = constraint.one_of;
            } else if !constraints.is_empty() {
                schema = schema.with_all_of(constraints.into_iter().map(Into::into).collect());
            }
        }

        schema
    }

    /// Exactly one of the group's members, each alternative being a single-member object.
    fn oneof_constraint(&self, group: &OneofGroup, defs: &mut Definitions<'g>) -> JsonSchemaInline {
        let alternatives = group
            .members
            .iter()
            .map(|member| {
                JsonSchemaInline::default()
                    .with_property(&member.name, self.field_schema(member, defs))
                    .with_required(&member.name)
                    .into()
            })
            .collect();

        JsonSchemaInline::default()
            .with_comment(format!(
                "Members of oneof `{}` are mutually exclusive",
                group.name
            ))
            .with_one_of(alternatives)
    }

    fn field_schema(&self, field: &FieldNode, defs: &mut Definitions<'g>) -> JsonSchema {
        let mut schema = self.type_schema(field.type_id, defs);

        if field.flags.proto3_optional && self.is_canonical() {
            schema = JsonSchemaInline::nullable(schema).into();
        }

        if field.flags.repeated {
            JsonSchemaInline::array(schema).into()
        } else {
            schema
        }
    }

    fn type_schema(&self, id: TypeIndex, defs: &mut Definitions<'g>) -> JsonSchema {
        let node = &self.graph[id];

        match &node.kind {
            TypeKind::Scalar(scalar) => self.scalar_schema(*scalar).into(),
            TypeKind::Enum(enum_type) => JsonSchemaInline::string()
                .with_enum_values(enum_type.values.clone())
                .into(),
            TypeKind::Message(message) => self.message_ref(&node.name, message, defs).into(),
            TypeKind::Map(map) => self.map_schema(map, defs).into(),
            TypeKind::WellKnown(wkt) => self.well_known_schema(*wkt).into(),
            // Groups are never the target of a field
            TypeKind::OneofGroup(_) => JsonSchemaInline::default().into(),
        }
    }

    fn message_ref(
        &self,
        name: &'g str,
        message: &'g MessageType,
        defs: &mut Definitions<'g>,
    ) -> JsonSchemaRef {
        if name == defs.root {
            defs.root_referenced = true;
        } else if !defs.schemas.contains_key(name) {
            // Reserve the slot first so a recursive reference finds it
            defs.schemas
                .insert(name.to_string(), JsonSchemaInline::default().into());
            let schema = self.message_schema(message, defs);
            defs.schemas.insert(name.to_string(), schema.into());
        }

        JsonSchemaRef::definition(name)
    }

    fn map_schema(&self, map: &MapType, defs: &mut Definitions<'g>) -> JsonSchemaInline {
        let key = map_key_schema(map.key);
        let value = self.type_schema(map.value, defs);

        match self.dialect {
            SchemaDialect::Canonical => JsonSchemaInline::object()
                .with_property_names(key.into())
                .with_additional_properties(AdditionalProperties::Schema(Box::new(value))),
            SchemaDialect::Restricted => JsonSchemaInline::array(
                JsonSchemaInline::object()
                    .with_property("key", key.into())
                    .with_property("value", value)
                    .with_required("key")
                    .with_required("value")
                    .into(),
            ),
        }
    }

    fn scalar_schema(&self, scalar: ScalarKind) -> JsonSchemaInline {
        match scalar {
            ScalarKind::Double | ScalarKind::Float => JsonSchemaInline::number(),
            ScalarKind::Bool => JsonSchemaInline::boolean(),
            ScalarKind::String => JsonSchemaInline::string(),
            ScalarKind::Bytes if self.is_canonical() => {
                JsonSchemaInline::string().with_content_encoding("base64")
            }
            ScalarKind::Bytes => JsonSchemaInline::string().with_description("Base64-encoded bytes"),
            ScalarKind::Uint64 | ScalarKind::Fixed64 => {
                JsonSchemaInline::string().with_pattern(UNSIGNED_INTEGER_PATTERN)
            }
            integer if integer.is_64_bit_integer() => {
                JsonSchemaInline::string().with_pattern(SIGNED_INTEGER_PATTERN)
            }
            _ => JsonSchemaInline::integer(),
        }
    }

    fn well_known_schema(&self, wkt: WellKnownType) -> JsonSchemaInline {
        match wkt {
            WellKnownType::Struct | WellKnownType::Value | WellKnownType::ListValue
                if self.is_canonical() =>
            {
                JsonSchemaInline::union(&["object", "array", "string", "number", "boolean", "null"])
            }
            WellKnownType::Struct => {
                JsonSchemaInline::string().with_description("A JSON object, encoded as a string")
            }
            WellKnownType::ListValue => {
                JsonSchemaInline::string().with_description("A JSON array, encoded as a string")
            }
            WellKnownType::Value => {
                JsonSchemaInline::string().with_description("Any JSON value, encoded as a string")
            }
            WellKnownType::NullValue => JsonSchemaInline::null(),
            WellKnownType::Wrapper(scalar) if self.is_canonical() => {
                self.scalar_schema(scalar).with_nullable()
            }
            WellKnownType::Wrapper(scalar) => self.scalar_schema(scalar),
            WellKnownType::Timestamp => JsonSchemaInline::string().with_format("date-time"),
            WellKnownType::Duration => JsonSchemaInline::string().with_pattern(DURATION_PATTERN),
            WellKnownType::FieldMask => {
                JsonSchemaInline::string().with_description("Comma-separated list of field paths")
            }
            WellKnownType::Any if self.is_canonical() => JsonSchemaInline::object()
                .with_property("@type", JsonSchemaInline::string().into())
                .with_required("@type")
                .with_additional_properties(AdditionalProperties::Allowed(true)),
            WellKnownType::Any => JsonSchemaInline::object()
                .with_property("@type", JsonSchemaInline::string().into())
                .with_property(
                    "value",
                    JsonSchemaInline::string()
                        .with_description("The JSON representation of the message, encoded as a string")
                        .into(),
                )
                .with_required("@type")
                .with_required("value"),
        }
    }
}

fn map_key_schema(key: ScalarKind) -> JsonSchemaInline {
    match key {
        ScalarKind::Bool => JsonSchemaInline::string().with_pattern(BOOL_KEY_PATTERN),
        ScalarKind::Uint32 | ScalarKind::Uint64 | ScalarKind::Fixed32 | ScalarKind::Fixed64 => {
            JsonSchemaInline::string().with_pattern(UNSIGNED_INTEGER_PATTERN)
        }
        integer if integer.is_integer() => {
            JsonSchemaInline::string().with_pattern(SIGNED_INTEGER_PATTERN)
        }
        _ => JsonSchemaInline::string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};
    use type_graph::{
        TypeGraphBuilder,
        test_support::{message, test_pool},
    };

    use super::*;

    fn render(name: &str) -> (Value, Value) {
        let pool = test_pool();
        let mut builder = TypeGraphBuilder::new();
        let root = builder.add_message(&message(&pool, name)).unwrap();
        let graph = builder.finish();

        let schemas = RenderedSchemas::render(&graph, root);
        (
            schemas.canonical.to_value().unwrap(),
            schemas.restricted.to_value().unwrap(),
        )
    }

    fn assert_restricted_vocabulary(path: &str, schema: &Value) {
        match schema {
            Value::Object(object) => {
                for forbidden in ["additionalProperties", "oneOf", "allOf", "anyOf"] {
                    assert!(
                        !object.contains_key(forbidden),
                        "`{forbidden}` at {path}"
                    );
                }
                if let Some(typ) = object.get("type") {
                    assert!(typ.is_string(), "type union at {path}: {typ}");
                }
                for (key, value) in object {
                    assert_restricted_vocabulary(&format!("{path}/{key}"), value);
                }
            }
            Value::Array(items) => {
                for (index, item) in items.iter().enumerate() {
                    assert_restricted_vocabulary(&format!("{path}/{index}"), item);
                }
            }
            _ => {}
        }
    }

    fn is_valid(schema: &Value, instance: &Value) -> bool {
        jsonschema::validator_for(schema)
            .expect("rendered schema should compile")
            .is_valid(instance)
    }

    #[test_log::test]
    fn canonical_scalars_and_well_known_types() {
        let (canonical, _) = render("testdata.CreateItemRequest");
        let properties = &canonical["properties"];

        assert_eq!(canonical["type"], "object");
        assert_eq!(properties["name"], json!({"type": "string"}));
        assert_eq!(properties["tags"], json!({"type": "array", "items": {"type": "string"}}));
        assert_eq!(properties["priority"], json!({"type": "integer"}));
        assert_eq!(properties["enabled"], json!({"type": "boolean"}));
        assert_eq!(
            properties["size_bytes"],
            json!({"type": "string", "pattern": UNSIGNED_INTEGER_PATTERN})
        );
        assert_eq!(
            properties["quota"],
            json!({"type": ["string", "null"], "pattern": SIGNED_INTEGER_PATTERN})
        );
        assert_eq!(properties["nickname"], json!({"type": ["string", "null"]}));
        assert_eq!(
            properties["attributes"],
            json!({"type": ["object", "array", "string", "number", "boolean", "null"]})
        );
        assert_eq!(
            properties["created_at"],
            json!({"type": "string", "format": "date-time"})
        );
        assert_eq!(
            properties["checksum"],
            json!({"type": "string", "contentEncoding": "base64"})
        );
        assert_eq!(
            properties["component_type"]["enum"],
            json!(["COMPONENT_TYPE_UNSPECIFIED", "COMPONENT_TYPE_PROCESSOR", "COMPONENT_TYPE_INPUT"])
        );
    }

    #[test_log::test]
    fn required_fields_in_both_dialects() {
        for (name, required) in [
            ("testdata.LegacyRecord", json!(["id"])),
            ("testdata.AnnotatedRequest", json!(["name"])),
        ] {
            let (canonical, restricted) = render(name);
            assert_eq!(canonical["required"], required, "{name}");
            assert_eq!(restricted["required"], required, "{name}");
        }

        let (canonical, _) = render("testdata.CreateItemRequest");
        assert!(canonical.get("required").is_none());
    }

    #[test_log::test]
    fn canonical_optional_enums_and_messages_accept_null() {
        let (canonical, restricted) = render("testdata.CreateItemRequest");
        let properties = &canonical["properties"];

        assert_eq!(
            properties["fallback_type"]["enum"],
            json!(["COMPONENT_TYPE_UNSPECIFIED", "COMPONENT_TYPE_PROCESSOR", "COMPONENT_TYPE_INPUT", null])
        );
        assert_eq!(
            properties["featured"],
            json!({"anyOf": [{"$ref": "#/$defs/testdata.Product"}, {"type": "null"}]})
        );

        let featured = json!({"product": {}, "fallback_type": "COMPONENT_TYPE_INPUT", "featured": {"sku": "F"}});
        let nulls = json!({"product": {}, "fallback_type": null, "featured": null});
        assert!(is_valid(&canonical, &featured));
        assert!(is_valid(&canonical, &nulls));
        assert!(!is_valid(&canonical, &json!({"product": {}, "fallback_type": "OTHER"})));
        assert!(!is_valid(&canonical, &json!({"product": {}, "featured": "F"})));

        // Nullability collapses in the restricted dialect
        assert_eq!(restricted["properties"]["fallback_type"]["type"], "string");
        assert_eq!(
            restricted["properties"]["featured"],
            json!({"$ref": "#/$defs/testdata.Product"})
        );
        assert!(!is_valid(&restricted, &json!({"featured": null})));
    }

    #[test_log::test]
    fn canonical_maps_are_open_objects() {
        let (canonical, _) = render("testdata.CreateItemRequest");
        let properties = &canonical["properties"];

        assert_eq!(
            properties["labels"],
            json!({
                "type": "object",
                "propertyNames": {"type": "string"},
                "additionalProperties": {"type": "string"}
            })
        );
        assert_eq!(
            properties["products_by_slot"],
            json!({
                "type": "object",
                "propertyNames": {"type": "string", "pattern": SIGNED_INTEGER_PATTERN},
                "additionalProperties": {"$ref": "#/$defs/testdata.Product"}
            })
        );
    }

    #[test_log::test]
    fn canonical_oneof_is_exactly_one_of() {
        let (canonical, _) = render("testdata.CreateItemRequest");

        assert_eq!(
            canonical["oneOf"],
            json!([
                {"properties": {"product": {"$ref": "#/$defs/testdata.Product"}}, "required": ["product"]},
                {"properties": {"service": {"$ref": "#/$defs/testdata.Service"}}, "required": ["service"]}
            ])
        );
        assert!(canonical["$comment"].as_str().unwrap().contains("item_type"));
        // Members are still listed as plain siblings
        assert!(canonical["properties"]["product"].is_object());
    }

    #[test_log::test]
    fn several_oneof_groups_combine_with_all_of() {
        let (canonical, restricted) = render("testdata.Shape");

        let groups = canonical["allOf"].as_array().unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0]["oneOf"].as_array().unwrap().len(), 2);
        assert!(groups[1]["$comment"].as_str().unwrap().contains("color"));

        assert!(is_valid(&canonical, &json!({"radius": 1.0, "rgb": "ff0000"})));
        assert!(!is_valid(&canonical, &json!({"radius": 1.0, "side": 2.0, "rgb": "ff0000"})));

        // Exclusivity cannot be expressed in the restricted dialect
        assert!(is_valid(&restricted, &json!({"radius": 1.0, "side": 2.0})));
    }

    #[test_log::test]
    fn restricted_vocabulary() {
        for name in [
            "testdata.CreateItemRequest",
            "testdata.UpdateMCPServerRequest",
            "testdata.TreeNode",
            "testdata.Shape",
        ] {
            let (_, restricted) = render(name);
            assert_restricted_vocabulary(name, &restricted);
        }
    }

    #[test_log::test]
    fn restricted_maps_are_entry_arrays() {
        let (_, restricted) = render("testdata.CreateItemRequest");
        let properties = &restricted["properties"];

        assert_eq!(
            properties["labels"],
            json!({
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {"key": {"type": "string"}, "value": {"type": "string"}},
                    "required": ["key", "value"]
                }
            })
        );
        assert_eq!(properties["nickname"], json!({"type": "string"}));
        assert_eq!(properties["attributes"]["type"], "string");
        assert_eq!(
            properties["details"]["required"],
            json!(["@type", "value"])
        );
    }

    #[test_log::test]
    fn shared_messages_render_once() {
        let (canonical, _) = render("testdata.CreateItemResponse");

        assert_eq!(
            canonical["properties"]["item"],
            json!({"$ref": "#/$defs/testdata.CreateItemRequest"})
        );
        let defs = canonical["$defs"].as_object().unwrap();
        let mut names: Vec<_> = defs.keys().cloned().collect();
        names.sort();
        assert_eq!(
            names,
            vec!["testdata.CreateItemRequest", "testdata.Product", "testdata.Service"]
        );
    }

    #[test_log::test]
    fn self_recursive_root() {
        let (canonical, restricted) = render("testdata.TreeNode");

        for schema in [&canonical, &restricted] {
            assert_eq!(
                schema["properties"]["children"]["items"],
                json!({"$ref": "#/$defs/testdata.TreeNode"})
            );
            assert_eq!(
                schema["$defs"]["testdata.TreeNode"]["properties"]["value"],
                json!({"type": "string"})
            );
        }

        let instance = json!({"value": "root", "children": [{"value": "leaf", "children": []}]});
        assert!(is_valid(&canonical, &instance));
        assert!(!is_valid(&canonical, &json!({"children": [{"value": 7}]})));
    }

    #[test_log::test]
    fn mutually_recursive_messages() {
        let (canonical, _) = render("testdata.Ping");

        assert_eq!(
            canonical["properties"]["pong"],
            json!({"$ref": "#/$defs/testdata.Pong"})
        );
        assert_eq!(
            canonical["$defs"]["testdata.Pong"]["properties"]["ping"],
            json!({"$ref": "#/$defs/testdata.Ping"})
        );
        assert!(canonical["$defs"]["testdata.Ping"].is_object());
    }

    #[test_log::test]
    fn dialects_accept_their_own_shapes() {
        let (canonical, restricted) = render("testdata.CreateItemRequest");

        let canonical_instance = json!({
            "name": "widget",
            "labels": {"env": "prod"},
            "tags": ["a"],
            "product": {"sku": "W-1", "price": 9.5},
            "attributes": {"a": 1},
            "created_at": "2024-01-01T00:00:00Z",
            "nickname": null,
            "quota": "42",
            "products_by_slot": {"1": {"sku": "S"}},
            "component_type": "COMPONENT_TYPE_INPUT"
        });
        let restricted_instance = json!({
            "name": "widget",
            "labels": [{"key": "env", "value": "prod"}],
            "tags": ["a"],
            "product": {"sku": "W-1", "price": 9.5},
            "attributes": "{\"a\":1}",
            "created_at": "2024-01-01T00:00:00Z",
            "quota": "42",
            "products_by_slot": [{"key": "1", "value": {"sku": "S"}}],
            "component_type": "COMPONENT_TYPE_INPUT"
        });

        assert!(is_valid(&canonical, &canonical_instance));
        assert!(is_valid(&restricted, &restricted_instance));
        assert!(!is_valid(&canonical, &restricted_instance));
        assert!(!is_valid(&restricted, &canonical_instance));
    }
}
