// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use prost_reflect::Kind;
use serde::{Deserialize, Serialize};

use crate::{mapped_arena::SerializableSlabIndex, well_known::WellKnownType};

pub type TypeIndex = SerializableSlabIndex<TypeNode>;

/// One type reachable from a root message, identified by its qualified name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeNode {
    pub name: String,
    pub kind: TypeKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TypeKind {
    Scalar(ScalarKind),
    Enum(EnumType),
    Message(MessageType),
    Map(MapType),
    OneofGroup(OneofGroup),
    WellKnown(WellKnownType),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnumType {
    /// Value names in declaration order.
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageType {
    /// Fields in declaration order.
    pub fields: Vec<FieldNode>,
    /// Real (non-synthetic) oneof groups declared by this message.
    pub oneofs: Vec<TypeIndex>,
}

impl MessageType {
    /// Looks a field up by its proto name or its JSON name.
    pub fn field(&self, name: &str) -> Option<&FieldNode> {
        self.fields
            .iter()
            .find(|field| field.name == name || field.json_name == name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapType {
    pub key: ScalarKind,
    pub value: TypeIndex,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OneofGroup {
    /// The unqualified name of the group, as declared.
    pub name: String,
    pub members: Vec<FieldNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldNode {
    pub name: String,
    pub json_name: String,
    pub number: u32,
    pub type_id: TypeIndex,
    pub flags: FieldFlags,
    pub oneof: Option<TypeIndex>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldFlags {
    pub repeated: bool,
    pub proto3_optional: bool,
    /// Proto2 `required`, or annotated with `google.api.field_behavior = REQUIRED`.
    pub required: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarKind {
    Double,
    Float,
    Int32,
    Int64,
    Uint32,
    Uint64,
    Sint32,
    Sint64,
    Fixed32,
    Fixed64,
    Sfixed32,
    Sfixed64,
    Bool,
    String,
    Bytes,
}

impl ScalarKind {
    /// Maps a field kind to a scalar, or `None` for messages and enums.
    pub fn from_kind(kind: &Kind) -> Option<Self> {
        let scalar = match kind {
            Kind::Double => ScalarKind::Double,
            Kind::Float => ScalarKind::Float,
            Kind::Int32 => ScalarKind::Int32,
            Kind::Int64 => ScalarKind::Int64,
            Kind::Uint32 => ScalarKind::Uint32,
            Kind::Uint64 => ScalarKind::Uint64,
            Kind::Sint32 => ScalarKind::Sint32,
            Kind::Sint64 => ScalarKind::Sint64,
            Kind::Fixed32 => ScalarKind::Fixed32,
            Kind::Fixed64 => ScalarKind::Fixed64,
            Kind::Sfixed32 => ScalarKind::Sfixed32,
            Kind::Sfixed64 => ScalarKind::Sfixed64,
            Kind::Bool => ScalarKind::Bool,
            Kind::String => ScalarKind::String,
            Kind::Bytes => ScalarKind::Bytes,
            Kind::Message(_) | Kind::Enum(_) => return None,
        };
        Some(scalar)
    }

    /// The proto keyword, which doubles as the node name in the graph.
    pub fn proto_name(&self) -> &'static str {
        match self {
            ScalarKind::Double => "double",
            ScalarKind::Float => "float",
            ScalarKind::Int32 => "int32",
            ScalarKind::Int64 => "int64",
            ScalarKind::Uint32 => "uint32",
            ScalarKind::Uint64 => "uint64",
            ScalarKind::Sint32 => "sint32",
            ScalarKind::Sint64 => "sint64",
            ScalarKind::Fixed32 => "fixed32",
            ScalarKind::Fixed64 => "fixed64",
            ScalarKind::Sfixed32 => "sfixed32",
            ScalarKind::Sfixed64 => "sfixed64",
            ScalarKind::Bool => "bool",
            ScalarKind::String => "string",
            ScalarKind::Bytes => "bytes",
        }
    }

    /// 64-bit integers travel as JSON strings in the canonical mapping.
    pub fn is_64_bit_integer(&self) -> bool {
        matches!(
            self,
            ScalarKind::Int64
                | ScalarKind::Uint64
                | ScalarKind::Sint64
                | ScalarKind::Fixed64
                | ScalarKind::Sfixed64
        )
    }

    pub fn is_integer(&self) -> bool {
        !matches!(
            self,
            ScalarKind::Double | ScalarKind::Float | ScalarKind::Bool | ScalarKind::String | ScalarKind::Bytes
        )
    }

    /// Whether protobuf allows this scalar as a map key.
    pub fn is_valid_map_key(&self) -> bool {
        self.is_integer() || matches!(self, ScalarKind::Bool | ScalarKind::String)
    }
}

impl TypeNode {
    pub fn as_message(&self) -> Option<&MessageType> {
        match &self.kind {
            TypeKind::Message(message) => Some(message),
            _ => None,
        }
    }
}
