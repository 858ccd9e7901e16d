// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! JSON Schema document types.
//!
//! Covers the vocabulary both dialects draw from. Fields left as `None` are not serialized, so a
//! restricted schema never mentions a keyword the restricted dialect forbids.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const DEFS_PREFIX: &str = "#/$defs/";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
#[allow(clippy::large_enum_variant)]
pub enum JsonSchema {
    /// A reference to a shared definition
    Ref(JsonSchemaRef),
    /// An inline schema definition
    Inline(JsonSchemaInline),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonSchemaRef {
    #[serde(rename = "$ref")]
    pub ref_path: String,
}

impl JsonSchemaRef {
    /// Create a reference to a schema in the `$defs` section
    pub fn definition(name: impl AsRef<str>) -> Self {
        Self {
            ref_path: format!("{DEFS_PREFIX}{}", name.as_ref()),
        }
    }

    /// The definition name, if this refers into `$defs`
    pub fn definition_name(&self) -> Option<&str> {
        self.ref_path.strip_prefix(DEFS_PREFIX)
    }
}

/// `"type": "string"` or `"type": ["string", "null"]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SchemaType {
    Single(String),
    Union(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AdditionalProperties {
    Allowed(bool),
    Schema(Box<JsonSchema>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct JsonSchemaInline {
    #[serde(rename = "$comment", skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,

    /// The type of the schema
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<SchemaType>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Allowed values: symbolic names, plus `null` once made nullable
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    #[serde(rename = "contentEncoding", skip_serializing_if = "Option::is_none")]
    pub content_encoding: Option<String>,

    /// For array types, the schema of items
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<JsonSchema>>,

    /// For object types, property schemas in declaration order
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<IndexMap<String, JsonSchema>>,

    /// Required properties for objects
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,

    #[serde(rename = "propertyNames", skip_serializing_if = "Option::is_none")]
    pub property_names: Option<Box<JsonSchema>>,

    #[serde(
        rename = "additionalProperties",
        skip_serializing_if = "Option::is_none"
    )]
    pub additional_properties: Option<AdditionalProperties>,

    #[serde(rename = "oneOf", skip_serializing_if = "Option::is_none")]
    pub one_of: Option<Vec<JsonSchema>>,

    #[serde(rename = "allOf", skip_serializing_if = "Option::is_none")]
    pub all_of: Option<Vec<JsonSchema>>,

    #[serde(rename = "anyOf", skip_serializing_if = "Option::is_none")]
    pub any_of: Option<Vec<JsonSchema>>,

    #[serde(rename = "$defs", skip_serializing_if = "Option::is_none")]
    pub defs: Option<IndexMap<String, JsonSchema>>,
}

impl JsonSchemaInline {
    pub fn new(schema_type: impl Into<String>) -> Self {
        Self {
            schema_type: Some(SchemaType::Single(schema_type.into())),
            ..Default::default()
        }
    }

    pub fn union(types: &[&str]) -> Self {
        Self {
            schema_type: Some(SchemaType::Union(
                types.iter().map(|t| t.to_string()).collect(),
            )),
            ..Default::default()
        }
    }

    pub fn integer() -> Self {
        Self::new("integer")
    }

    pub fn number() -> Self {
        Self::new("number")
    }

    pub fn string() -> Self {
        Self::new("string")
    }

    pub fn boolean() -> Self {
        Self::new("boolean")
    }

    pub fn null() -> Self {
        Self::new("null")
    }

    pub fn array(items: JsonSchema) -> Self {
        Self {
            schema_type: Some(SchemaType::Single("array".to_string())),
            items: Some(Box::new(items)),
            ..Default::default()
        }
    }

    pub fn object() -> Self {
        Self::new("object")
    }

    /// Adds `null` to the type, and to the allowed values of an enumeration. A schema without a
    /// type (or already nullable) is unchanged.
    pub fn with_nullable(mut self) -> Self {
        if let Some(values) = self.enum_values.as_mut() {
            if !values.contains(&Value::Null) {
                values.push(Value::Null);
            }
        }

        self.schema_type = match self.schema_type {
            Some(SchemaType::Single(single)) if single != "null" => {
                Some(SchemaType::Union(vec![single, "null".to_string()]))
            }
            Some(SchemaType::Union(mut union)) => {
                if !union.iter().any(|t| t == "null") {
                    union.push("null".to_string());
                }
                Some(SchemaType::Union(union))
            }
            other => other,
        };
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_enum_values(mut self, values: Vec<String>) -> Self {
        self.enum_values = Some(values.into_iter().map(Value::String).collect());
        self
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    pub fn with_content_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.content_encoding = Some(encoding.into());
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, schema: JsonSchema) -> Self {
        self.properties
            .get_or_insert_with(IndexMap::new)
            .insert(name.into(), schema);
        self
    }

    pub fn with_required(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        let required = self.required.get_or_insert_with(Vec::new);
        if !required.contains(&name) {
            required.push(name);
        }
        self
    }

    pub fn with_property_names(mut self, schema: JsonSchema) -> Self {
        self.property_names = Some(Box::new(schema));
        self
    }

    pub fn with_additional_properties(mut self, additional: AdditionalProperties) -> Self {
        self.additional_properties = Some(additional);
        self
    }

    pub fn with_one_of(mut self, alternatives: Vec<JsonSchema>) -> Self {
        self.one_of = Some(alternatives);
        self
    }

    pub fn with_all_of(mut self, schemas: Vec<JsonSchema>) -> Self {
        self.all_of = Some(schemas);
        self
    }

    pub fn with_any_of(mut self, schemas: Vec<JsonSchema>) -> Self {
        self.any_of = Some(schemas);
        self
    }

    /// `schema` or `null`, for a schema that cannot carry a type union itself (a `$ref`).
    pub fn nullable(schema: JsonSchema) -> Self {
        match schema {
            JsonSchema::Inline(inline) => inline.with_nullable(),
            reference => Self::default().with_any_of(vec![reference, Self::null().into()]),
        }
    }

    pub fn property(&self, name: &str) -> Option<&JsonSchema> {
        self.properties.as_ref().and_then(|p| p.get(name))
    }

    pub fn definition(&self, name: &str) -> Option<&JsonSchema> {
        self.defs.as_ref().and_then(|d| d.get(name))
    }

    pub fn is_required(&self, name: &str) -> bool {
        self.required
            .as_ref()
            .is_some_and(|required| required.iter().any(|r| r == name))
    }

    pub fn to_value(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

impl JsonSchema {
    pub fn as_inline(&self) -> Option<&JsonSchemaInline> {
        match self {
            JsonSchema::Inline(inline) => Some(inline),
            JsonSchema::Ref(_) => None,
        }
    }

    pub fn as_ref_schema(&self) -> Option<&JsonSchemaRef> {
        match self {
            JsonSchema::Ref(ref_schema) => Some(ref_schema),
            JsonSchema::Inline(_) => None,
        }
    }
}

impl From<JsonSchemaInline> for JsonSchema {
    fn from(inline: JsonSchemaInline) -> Self {
        JsonSchema::Inline(inline)
    }
}

impl From<JsonSchemaRef> for JsonSchema {
    fn from(ref_schema: JsonSchemaRef) -> Self {
        JsonSchema::Ref(ref_schema)
    }
}
