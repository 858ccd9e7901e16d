// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Builds a [`TypeGraph`] from prost-reflect descriptors.
//!
//! Messages are built in two steps: a shallow node (no fields) is inserted under the message's
//! qualified name, then its fields are expanded. A reference to a name that is already in the
//! arena, including one still being expanded further up the stack, resolves to the existing node.
//! That is how self and mutual recursion terminate.

use std::collections::HashMap;
use std::ops;

use prost_reflect::{
    Cardinality, EnumDescriptor, FieldDescriptor, Kind, MessageDescriptor, Value,
};
use tracing::{debug, trace};

use crate::{
    error::SchemaGenerationError,
    mapped_arena::MappedArena,
    types::{
        EnumType, FieldFlags, FieldNode, MapType, MessageType, OneofGroup, ScalarKind, TypeIndex,
        TypeKind, TypeNode,
    },
    well_known::WellKnownType,
};

const FIELD_BEHAVIOR_EXTENSION: &str = "google.api.field_behavior";
const FIELD_BEHAVIOR_REQUIRED: i32 = 2;

/// The finished, read-only graph.
#[derive(Debug, Clone)]
pub struct TypeGraph {
    types: MappedArena<TypeNode>,
}

impl TypeGraph {
    pub fn get_id(&self, name: &str) -> Option<TypeIndex> {
        self.types.get_id(name)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&TypeNode> {
        self.types.get_by_key(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn message(&self, id: TypeIndex) -> Option<&MessageType> {
        self[id].as_message()
    }

    pub fn oneof_group(&self, id: TypeIndex) -> Option<&OneofGroup> {
        match &self[id].kind {
            TypeKind::OneofGroup(group) => Some(group),
            _ => None,
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.types.keys()
    }
}

impl ops::Index<TypeIndex> for TypeGraph {
    type Output = TypeNode;

    fn index(&self, id: TypeIndex) -> &TypeNode {
        &self.types[id]
    }
}

#[derive(Debug, Default)]
pub struct TypeGraphBuilder {
    types: MappedArena<TypeNode>,
    /// Messages whose fields are being expanded, innermost last.
    expanding: Vec<String>,
}

impl TypeGraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `descriptor` and everything reachable from it.
    ///
    /// On failure the builder is left exactly as it was before the call, so a message that
    /// cannot be represented does not leave half-built nodes behind for later roots.
    pub fn add_message(
        &mut self,
        descriptor: &MessageDescriptor,
    ) -> Result<TypeIndex, SchemaGenerationError> {
        let checkpoint = self.types.clone();

        match self.message_node(descriptor) {
            Ok(id) => Ok(id),
            Err(e) => {
                debug!(message = descriptor.full_name(), error = %e, "Discarding partially built message");
                self.types = checkpoint;
                self.expanding.clear();
                Err(e)
            }
        }
    }

    pub fn finish(self) -> TypeGraph {
        TypeGraph { types: self.types }
    }

    fn message_node(
        &mut self,
        descriptor: &MessageDescriptor,
    ) -> Result<TypeIndex, SchemaGenerationError> {
        let name = descriptor.full_name();

        if let Some(existing) = self.types.get_id(name) {
            if self.expanding.iter().any(|expanding| expanding == name) {
                trace!(message = name, "Resolved recursive reference");
            }
            return Ok(existing);
        }

        if let Some(wkt) = WellKnownType::from_full_name(name) {
            return Ok(self.types.add(name, TypeNode::well_known(name, wkt)));
        }

        let id = self.types.add(
            name,
            TypeNode {
                name: name.to_string(),
                kind: TypeKind::Message(MessageType::default()),
            },
        );

        self.expanding.push(name.to_string());
        let expanded = self.expand_message(descriptor);
        self.expanding.pop();

        self.types[id].kind = TypeKind::Message(expanded?);
        Ok(id)
    }

    fn expand_message(
        &mut self,
        descriptor: &MessageDescriptor,
    ) -> Result<MessageType, SchemaGenerationError> {
        let mut fields = descriptor
            .fields()
            .map(|field| self.field_node(descriptor, &field))
            .collect::<Result<Vec<_>, _>>()?;

        let mut oneofs = vec![];
        let mut group_ids = HashMap::new();

        for oneof in descriptor.oneofs() {
            // Synthetic groups only carry proto3 `optional` presence
            let synthetic = oneof
                .fields()
                .all(|field| field.field_descriptor_proto().proto3_optional());
            if synthetic {
                continue;
            }

            let member_names: Vec<_> = oneof.fields().map(|f| f.name().to_string()).collect();
            let members = fields
                .iter()
                .filter(|field| member_names.contains(&field.name))
                .cloned()
                .collect();

            let group_id = self.types.add(
                oneof.full_name(),
                TypeNode {
                    name: oneof.full_name().to_string(),
                    kind: TypeKind::OneofGroup(OneofGroup {
                        name: oneof.name().to_string(),
                        members,
                    }),
                },
            );
            for member in member_names {
                group_ids.insert(member, group_id);
            }
            oneofs.push(group_id);
        }

        for field in fields.iter_mut() {
            field.oneof = group_ids.get(&field.name).copied();
        }

        for group_id in &oneofs {
            if let TypeKind::OneofGroup(group) = &mut self.types[*group_id].kind {
                for member in group.members.iter_mut() {
                    member.oneof = Some(*group_id);
                }
            }
        }

        Ok(MessageType { fields, oneofs })
    }

    fn field_node(
        &mut self,
        message: &MessageDescriptor,
        field: &FieldDescriptor,
    ) -> Result<FieldNode, SchemaGenerationError> {
        if field.is_group() {
            return Err(SchemaGenerationError::UnsupportedFieldKind {
                message: message.full_name().to_string(),
                field: field.name().to_string(),
                kind: "group".to_string(),
            });
        }

        let type_id = if field.is_map() {
            self.map_node(message, field)?
        } else {
            self.kind_node(message, field, &field.kind())?
        };

        Ok(FieldNode {
            name: field.name().to_string(),
            json_name: field.json_name().to_string(),
            number: field.number(),
            type_id,
            flags: FieldFlags {
                repeated: field.is_list(),
                proto3_optional: field.field_descriptor_proto().proto3_optional(),
                required: is_required(field),
            },
            oneof: None,
        })
    }

    fn kind_node(
        &mut self,
        message: &MessageDescriptor,
        field: &FieldDescriptor,
        kind: &Kind,
    ) -> Result<TypeIndex, SchemaGenerationError> {
        match kind {
            Kind::Message(target) => self.message_node(target),
            Kind::Enum(target) => Ok(self.enum_node(target)),
            scalar => ScalarKind::from_kind(scalar)
                .map(|scalar| self.scalar_node(scalar))
                .ok_or_else(|| SchemaGenerationError::UnsupportedFieldKind {
                    message: message.full_name().to_string(),
                    field: field.name().to_string(),
                    kind: format!("{scalar:?}"),
                }),
        }
    }

    fn map_node(
        &mut self,
        message: &MessageDescriptor,
        field: &FieldDescriptor,
    ) -> Result<TypeIndex, SchemaGenerationError> {
        let Kind::Message(entry) = field.kind() else {
            return Err(SchemaGenerationError::UnsupportedFieldKind {
                message: message.full_name().to_string(),
                field: field.name().to_string(),
                kind: "map without entry message".to_string(),
            });
        };

        if let Some(existing) = self.types.get_id(entry.full_name()) {
            return Ok(existing);
        }

        let key_kind = entry.map_entry_key_field().kind();
        let key = ScalarKind::from_kind(&key_kind)
            .filter(ScalarKind::is_valid_map_key)
            .ok_or_else(|| SchemaGenerationError::UnsupportedMapKey {
                message: message.full_name().to_string(),
                field: field.name().to_string(),
                key: format!("{key_kind:?}"),
            })?;

        let value = self.kind_node(message, field, &entry.map_entry_value_field().kind())?;

        Ok(self.types.add(
            entry.full_name(),
            TypeNode {
                name: entry.full_name().to_string(),
                kind: TypeKind::Map(MapType { key, value }),
            },
        ))
    }

    fn enum_node(&mut self, descriptor: &EnumDescriptor) -> TypeIndex {
        let name = descriptor.full_name();

        if let Some(wkt) = WellKnownType::from_full_name(name) {
            return self.types.add(name, TypeNode::well_known(name, wkt));
        }

        self.types.add(
            name,
            TypeNode {
                name: name.to_string(),
                kind: TypeKind::Enum(EnumType {
                    values: descriptor.values().map(|v| v.name().to_string()).collect(),
                }),
            },
        )
    }

    fn scalar_node(&mut self, scalar: ScalarKind) -> TypeIndex {
        let name = scalar.proto_name();
        self.types.add(
            name,
            TypeNode {
                name: name.to_string(),
                kind: TypeKind::Scalar(scalar),
            },
        )
    }
}

impl TypeNode {
    fn well_known(name: &str, wkt: WellKnownType) -> Self {
        TypeNode {
            name: name.to_string(),
            kind: TypeKind::WellKnown(wkt),
        }
    }
}

fn is_required(field: &FieldDescriptor) -> bool {
    if field.cardinality() == Cardinality::Required {
        return true;
    }

    // The annotation is only visible when `google/api/field_behavior.proto` is in the pool
    let Some(extension) = field
        .parent_pool()
        .get_extension_by_name(FIELD_BEHAVIOR_EXTENSION)
    else {
        return false;
    };

    let options = field.options();
    if !options.has_extension(&extension) {
        return false;
    }

    match options.get_extension(&extension).as_ref() {
        Value::List(behaviors) => behaviors
            .iter()
            .any(|behavior| behavior.as_enum_number() == Some(FIELD_BEHAVIOR_REQUIRED)),
        Value::EnumNumber(behavior) => *behavior == FIELD_BEHAVIOR_REQUIRED,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{message, test_pool};

    fn build(names: &[&str]) -> (TypeGraph, Vec<TypeIndex>) {
        let pool = test_pool();
        let mut builder = TypeGraphBuilder::new();
        let roots = names
            .iter()
            .map(|name| builder.add_message(&message(&pool, name)).unwrap())
            .collect();
        (builder.finish(), roots)
    }

    fn field<'a>(graph: &'a TypeGraph, message: &str, field: &str) -> &'a FieldNode {
        graph
            .get_by_name(message)
            .and_then(TypeNode::as_message)
            .and_then(|m| m.field(field))
            .unwrap()
    }

    #[test_log::test]
    fn one_node_per_qualified_name() {
        let (graph, _) = build(&["testdata.CreateItemRequest", "testdata.CreateItemResponse"]);

        let request = graph.get_by_name("testdata.CreateItemRequest").unwrap();
        let response = graph.get_by_name("testdata.CreateItemResponse").unwrap();
        let item = response.as_message().unwrap().field("item").unwrap();
        assert_eq!(graph[item.type_id].name, request.name);

        let labels = &graph[field(&graph, "testdata.CreateItemRequest", "labels").type_id];
        assert_eq!(labels.name, "testdata.CreateItemRequest.LabelsEntry");
        assert!(matches!(
            &labels.kind,
            TypeKind::Map(MapType { key: ScalarKind::String, .. })
        ));
    }

    #[test_log::test]
    fn self_recursion_terminates() {
        let (graph, roots) = build(&["testdata.TreeNode"]);
        let tree = graph.message(roots[0]).unwrap();

        let children = tree.field("children").unwrap();
        assert!(children.flags.repeated);
        assert_eq!(graph[children.type_id].name, "testdata.TreeNode");

        let named = &graph[tree.field("named").unwrap().type_id];
        let TypeKind::Map(map) = &named.kind else {
            panic!("expected a map, got {:?}", named.kind);
        };
        assert_eq!(graph[map.value].name, "testdata.TreeNode");
    }

    #[test_log::test]
    fn mutual_recursion_terminates() {
        let (graph, roots) = build(&["testdata.Ping"]);

        let pong_id = graph.message(roots[0]).unwrap().field("pong").unwrap().type_id;
        let pong = graph.message(pong_id).unwrap();
        assert_eq!(graph[pong.field("ping").unwrap().type_id].name, "testdata.Ping");
        assert_eq!(
            graph.names().filter(|n| n.starts_with("testdata.P")).count(),
            2
        );
    }

    #[test_log::test]
    fn oneof_groups_skip_synthetic_optional() {
        let (graph, roots) = build(&["testdata.CreateItemRequest"]);
        let request = graph.message(roots[0]).unwrap();

        assert_eq!(request.oneofs.len(), 1);
        let group = graph.oneof_group(request.oneofs[0]).unwrap();
        assert_eq!(group.name, "item_type");
        let members: Vec<_> = group.members.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(members, vec!["product", "service"]);

        let product = request.field("product").unwrap();
        assert!(product.oneof.is_some());

        let quota = request.field("quota").unwrap();
        assert!(quota.flags.proto3_optional);
        assert!(quota.oneof.is_none());
    }

    #[test_log::test]
    fn well_known_types_are_leaves() {
        let (graph, _) = build(&["testdata.CreateItemRequest"]);

        let nickname = &graph[field(&graph, "testdata.CreateItemRequest", "nickname").type_id];
        assert!(matches!(
            nickname.kind,
            TypeKind::WellKnown(WellKnownType::Wrapper(ScalarKind::String))
        ));

        let attributes = &graph[field(&graph, "testdata.CreateItemRequest", "attributes").type_id];
        assert!(matches!(attributes.kind, TypeKind::WellKnown(WellKnownType::Struct)));

        // Struct's own fields are never expanded
        assert!(!graph.contains("google.protobuf.Struct.FieldsEntry"));
    }

    #[test_log::test]
    fn proto2_required_fields() {
        let (graph, _) = build(&["testdata.LegacyRecord"]);

        assert!(field(&graph, "testdata.LegacyRecord", "id").flags.required);
        assert!(!field(&graph, "testdata.LegacyRecord", "note").flags.required);
    }

    #[test_log::test]
    fn field_behavior_annotation_marks_required() {
        let (graph, _) = build(&["testdata.AnnotatedRequest"]);

        assert!(field(&graph, "testdata.AnnotatedRequest", "name").flags.required);
        assert!(!field(&graph, "testdata.AnnotatedRequest", "note").flags.required);
    }

    #[test_log::test]
    fn failed_message_leaves_no_partial_nodes() {
        let pool = test_pool();
        let mut builder = TypeGraphBuilder::new();

        builder
            .add_message(&message(&pool, "testdata.GetMCPServerRequest"))
            .unwrap();

        let err = builder
            .add_message(&message(&pool, "testdata.LegacyEnvelope"))
            .unwrap_err();
        assert!(matches!(
            err,
            SchemaGenerationError::UnsupportedFieldKind { ref field, .. } if field == "extra"
        ));

        let record = builder
            .add_message(&message(&pool, "testdata.LegacyRecord"))
            .unwrap();

        let graph = builder.finish();
        assert!(!graph.contains("testdata.LegacyEnvelope"));
        assert!(graph.contains("testdata.GetMCPServerRequest"));
        assert_eq!(graph[record].name, "testdata.LegacyRecord");
    }

    #[test_log::test]
    fn integer_map_keys() {
        let (graph, _) = build(&["testdata.CreateItemRequest"]);

        let slots = &graph[field(&graph, "testdata.CreateItemRequest", "products_by_slot").type_id];
        let TypeKind::Map(map) = &slots.kind else {
            panic!("expected a map, got {:?}", slots.kind);
        };
        assert_eq!(map.key, ScalarKind::Int32);
        assert_eq!(graph[map.value].name, "testdata.Product");
    }
}
