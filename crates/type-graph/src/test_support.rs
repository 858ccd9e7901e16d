// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Descriptor fixtures shared by the tests of this workspace.
//!
//! The `testdata` package is assembled from `prost_types` descriptor protos on top of the global
//! pool (which already carries the `google.protobuf` well-known types), so tests need neither
//! `protoc` nor a build script. The equivalent `.proto` source is:
//!
//! ```text
//! enum ComponentType { COMPONENT_TYPE_UNSPECIFIED = 0; COMPONENT_TYPE_PROCESSOR = 1; COMPONENT_TYPE_INPUT = 2; }
//! message Product { string sku = 1; double price = 2; }
//! message Service { string endpoint = 1; }
//! message CreateItemRequest {
//!   string name = 1; string description = 2; map<string, string> labels = 3; repeated string tags = 4;
//!   oneof item_type { Product product = 5; Service service = 6; }
//!   google.protobuf.Struct attributes = 7; google.protobuf.Value payload = 8;
//!   google.protobuf.ListValue history = 9; google.protobuf.Timestamp created_at = 10;
//!   google.protobuf.Duration ttl = 11; google.protobuf.StringValue nickname = 12;
//!   google.protobuf.Int64Value version = 13; optional int64 quota = 14;
//!   map<int32, Product> products_by_slot = 15; google.protobuf.Any details = 16; bytes checksum = 17;
//!   ComponentType component_type = 18; uint64 size_bytes = 19; bool enabled = 20; int32 priority = 21;
//!   optional ComponentType fallback_type = 22; optional Product featured = 23;
//! }
//! message CreateItemResponse { string id = 1; CreateItemRequest item = 2; map<string, string> labels = 3; google.protobuf.Struct attributes = 4; }
//! message MCPServer {
//!   message Tool { ComponentType component_type = 1; string config_yaml = 2; }
//!   message Resources { string memory_shares = 1; string cpu_shares = 2; }
//!   string display_name = 1; string description = 2; map<string, Tool> tools = 3;
//!   Resources resources = 4; map<string, string> tags = 5;
//! }
//! message UpdateMCPServerRequest { string id = 1; MCPServer mcp_server = 2; google.protobuf.FieldMask update_mask = 3; }
//! message UpdateMCPServerResponse { MCPServer mcp_server = 1; }
//! message GetMCPServerRequest { string id = 1; }
//! message ListMCPServersRequest { int32 page_size = 1; string page_token = 2; }
//! message ListMCPServersResponse { repeated MCPServer mcp_servers = 1; string next_page_token = 2; }
//! message TreeNode { string value = 1; repeated TreeNode children = 2; map<string, TreeNode> named = 3; }
//! message Ping { string label = 1; Pong pong = 2; }
//! message Pong { int32 count = 1; Ping ping = 2; }
//! message Shape { oneof kind { double radius = 1; double side = 2; } oneof color { string rgb = 3; string named_color = 4; } }
//! service ItemService {
//!   rpc CreateItem(CreateItemRequest) returns (CreateItemResponse);
//!   rpc WatchItems(GetMCPServerRequest) returns (stream CreateItemResponse);
//! }
//! service MCPServerService {
//!   rpc UpdateMCPServer(UpdateMCPServerRequest) returns (UpdateMCPServerResponse);
//!   rpc GetMCPServer(GetMCPServerRequest) returns (MCPServer);
//!   rpc ListMCPServers(ListMCPServersRequest) returns (ListMCPServersResponse);
//! }
//!
//! // testdata/legacy.proto, proto2
//! message LegacyRecord { required string id = 1; optional string note = 2; }
//! message LegacyEnvelope { optional LegacyRecord record = 1; optional group Extra = 2 { optional string text = 3; } }
//! service LegacyService { rpc Archive(LegacyEnvelope) returns (LegacyRecord); }
//!
//! // testdata/annotated.proto, with the FieldBehavior extension of google/api/field_behavior.proto
//! message AnnotatedRequest {
//!   string name = 1 [(google.api.field_behavior) = REQUIRED];
//!   string note = 2 [(google.api.field_behavior) = OPTIONAL];
//! }
//! ```
//!
//! `prost_types` drops extension options, so the annotated file is encoded by hand and added with
//! `DescriptorPool::decode_file_descriptor_proto`, which keeps them.

use prost::{Message, encoding};
use prost_reflect::{DescriptorPool, MessageDescriptor};
use prost_types::{
    DescriptorProto, EnumDescriptorProto, EnumValueDescriptorProto, FieldDescriptorProto,
    FileDescriptorProto, MessageOptions, MethodDescriptorProto, OneofDescriptorProto,
    ServiceDescriptorProto,
    field_descriptor_proto::{Label, Type},
};

pub const PACKAGE: &str = "testdata";

/// The global pool extended with the `testdata` files.
pub fn test_pool() -> DescriptorPool {
    let mut pool = DescriptorPool::global();
    pool.add_file_descriptor_proto(testdata_file())
        .expect("testdata.proto should be valid");
    pool.add_file_descriptor_proto(legacy_file())
        .expect("legacy.proto should be valid");
    pool.add_file_descriptor_proto(field_behavior_file())
        .expect("field_behavior.proto should be valid");
    pool.decode_file_descriptor_proto(annotated_file().as_slice())
        .expect("annotated.proto should be valid");
    pool
}

pub fn message(pool: &DescriptorPool, name: &str) -> MessageDescriptor {
    pool.get_message_by_name(name)
        .unwrap_or_else(|| panic!("message `{name}` should be in the test pool"))
}

fn testdata_file() -> FileDescriptorProto {
    FileDescriptorProto {
        name: Some("testdata/testdata.proto".to_string()),
        package: Some(PACKAGE.to_string()),
        dependency: [
            "google/protobuf/any.proto",
            "google/protobuf/duration.proto",
            "google/protobuf/field_mask.proto",
            "google/protobuf/struct.proto",
            "google/protobuf/timestamp.proto",
            "google/protobuf/wrappers.proto",
        ]
        .map(String::from)
        .to_vec(),
        enum_type: vec![enumeration(
            "ComponentType",
            &[
                "COMPONENT_TYPE_UNSPECIFIED",
                "COMPONENT_TYPE_PROCESSOR",
                "COMPONENT_TYPE_INPUT",
            ],
        )],
        message_type: vec![
            message_type("Product", vec![
                scalar("sku", 1, Type::String),
                scalar("price", 2, Type::Double),
            ]),
            message_type("Service", vec![scalar("endpoint", 1, Type::String)]),
            create_item_request(),
            DescriptorProto {
                nested_type: vec![map_entry("LabelsEntry", Type::String, scalar("value", 2, Type::String))],
                ..message_type("CreateItemResponse", vec![
                    scalar("id", 1, Type::String),
                    message_field("item", 2, "testdata.CreateItemRequest"),
                    map_field("labels", 3, "testdata.CreateItemResponse.LabelsEntry"),
                    message_field("attributes", 4, "google.protobuf.Struct"),
                ])
            },
            mcp_server(),
            message_type("UpdateMCPServerRequest", vec![
                scalar("id", 1, Type::String),
                message_field("mcp_server", 2, "testdata.MCPServer"),
                message_field("update_mask", 3, "google.protobuf.FieldMask"),
            ]),
            message_type("UpdateMCPServerResponse", vec![message_field(
                "mcp_server",
                1,
                "testdata.MCPServer",
            )]),
            message_type("GetMCPServerRequest", vec![scalar("id", 1, Type::String)]),
            message_type("ListMCPServersRequest", vec![
                scalar("page_size", 1, Type::Int32),
                scalar("page_token", 2, Type::String),
            ]),
            message_type("ListMCPServersResponse", vec![
                repeated(message_field("mcp_servers", 1, "testdata.MCPServer")),
                scalar("next_page_token", 2, Type::String),
            ]),
            DescriptorProto {
                nested_type: vec![map_entry(
                    "NamedEntry",
                    Type::String,
                    message_field("value", 2, "testdata.TreeNode"),
                )],
                ..message_type("TreeNode", vec![
                    scalar("value", 1, Type::String),
                    repeated(message_field("children", 2, "testdata.TreeNode")),
                    map_field("named", 3, "testdata.TreeNode.NamedEntry"),
                ])
            },
            message_type("Ping", vec![
                scalar("label", 1, Type::String),
                message_field("pong", 2, "testdata.Pong"),
            ]),
            message_type("Pong", vec![
                scalar("count", 1, Type::Int32),
                message_field("ping", 2, "testdata.Ping"),
            ]),
            DescriptorProto {
                oneof_decl: vec![oneof("kind"), oneof("color")],
                ..message_type("Shape", vec![
                    in_oneof(scalar("radius", 1, Type::Double), 0),
                    in_oneof(scalar("side", 2, Type::Double), 0),
                    in_oneof(scalar("rgb", 3, Type::String), 1),
                    in_oneof(scalar("named_color", 4, Type::String), 1),
                ])
            },
        ],
        service: vec![
            ServiceDescriptorProto {
                name: Some("ItemService".to_string()),
                method: vec![
                    method("CreateItem", "CreateItemRequest", "CreateItemResponse"),
                    MethodDescriptorProto {
                        server_streaming: Some(true),
                        ..method("WatchItems", "GetMCPServerRequest", "CreateItemResponse")
                    },
                ],
                ..Default::default()
            },
            ServiceDescriptorProto {
                name: Some("MCPServerService".to_string()),
                method: vec![
                    method("UpdateMCPServer", "UpdateMCPServerRequest", "UpdateMCPServerResponse"),
                    method("GetMCPServer", "GetMCPServerRequest", "MCPServer"),
                    method("ListMCPServers", "ListMCPServersRequest", "ListMCPServersResponse"),
                ],
                ..Default::default()
            },
        ],
        syntax: Some("proto3".to_string()),
        ..Default::default()
    }
}

fn create_item_request() -> DescriptorProto {
    DescriptorProto {
        nested_type: vec![
            map_entry("LabelsEntry", Type::String, scalar("value", 2, Type::String)),
            map_entry(
                "ProductsBySlotEntry",
                Type::Int32,
                message_field("value", 2, "testdata.Product"),
            ),
        ],
        oneof_decl: vec![
            oneof("item_type"),
            oneof("_quota"),
            oneof("_fallback_type"),
            oneof("_featured"),
        ],
        ..message_type("CreateItemRequest", vec![
            scalar("name", 1, Type::String),
            scalar("description", 2, Type::String),
            map_field("labels", 3, "testdata.CreateItemRequest.LabelsEntry"),
            repeated(scalar("tags", 4, Type::String)),
            in_oneof(message_field("product", 5, "testdata.Product"), 0),
            in_oneof(message_field("service", 6, "testdata.Service"), 0),
            message_field("attributes", 7, "google.protobuf.Struct"),
            message_field("payload", 8, "google.protobuf.Value"),
            message_field("history", 9, "google.protobuf.ListValue"),
            message_field("created_at", 10, "google.protobuf.Timestamp"),
            message_field("ttl", 11, "google.protobuf.Duration"),
            message_field("nickname", 12, "google.protobuf.StringValue"),
            message_field("version", 13, "google.protobuf.Int64Value"),
            proto3_optional(scalar("quota", 14, Type::Int64), 1),
            map_field("products_by_slot", 15, "testdata.CreateItemRequest.ProductsBySlotEntry"),
            message_field("details", 16, "google.protobuf.Any"),
            scalar("checksum", 17, Type::Bytes),
            enum_field("component_type", 18, "testdata.ComponentType"),
            scalar("size_bytes", 19, Type::Uint64),
            scalar("enabled", 20, Type::Bool),
            scalar("priority", 21, Type::Int32),
            proto3_optional(enum_field("fallback_type", 22, "testdata.ComponentType"), 2),
            proto3_optional(message_field("featured", 23, "testdata.Product"), 3),
        ])
    }
}

fn mcp_server() -> DescriptorProto {
    DescriptorProto {
        nested_type: vec![
            message_type("Tool", vec![
                enum_field("component_type", 1, "testdata.ComponentType"),
                scalar("config_yaml", 2, Type::String),
            ]),
            message_type("Resources", vec![
                scalar("memory_shares", 1, Type::String),
                scalar("cpu_shares", 2, Type::String),
            ]),
            map_entry(
                "ToolsEntry",
                Type::String,
                message_field("value", 2, "testdata.MCPServer.Tool"),
            ),
            map_entry("TagsEntry", Type::String, scalar("value", 2, Type::String)),
        ],
        ..message_type("MCPServer", vec![
            scalar("display_name", 1, Type::String),
            scalar("description", 2, Type::String),
            map_field("tools", 3, "testdata.MCPServer.ToolsEntry"),
            message_field("resources", 4, "testdata.MCPServer.Resources"),
            map_field("tags", 5, "testdata.MCPServer.TagsEntry"),
        ])
    }
}

fn legacy_file() -> FileDescriptorProto {
    FileDescriptorProto {
        name: Some("testdata/legacy.proto".to_string()),
        package: Some(PACKAGE.to_string()),
        message_type: vec![
            message_type("LegacyRecord", vec![
                with_label(scalar("id", 1, Type::String), Label::Required),
                scalar("note", 2, Type::String),
            ]),
            DescriptorProto {
                nested_type: vec![message_type("Extra", vec![scalar("text", 3, Type::String)])],
                ..message_type("LegacyEnvelope", vec![
                    message_field("record", 1, "testdata.LegacyRecord"),
                    FieldDescriptorProto {
                        r#type: Some(Type::Group as i32),
                        type_name: Some(".testdata.LegacyEnvelope.Extra".to_string()),
                        ..scalar("extra", 2, Type::Group)
                    },
                ])
            },
        ],
        service: vec![ServiceDescriptorProto {
            name: Some("LegacyService".to_string()),
            method: vec![method("Archive", "LegacyEnvelope", "LegacyRecord")],
            ..Default::default()
        }],
        syntax: Some("proto2".to_string()),
        ..Default::default()
    }
}

const FIELD_BEHAVIOR_NUMBER: u32 = 1052;
const FIELD_BEHAVIOR_OPTIONAL: i32 = 1;
const FIELD_BEHAVIOR_REQUIRED: i32 = 2;

fn field_behavior_file() -> FileDescriptorProto {
    FileDescriptorProto {
        name: Some("google/api/field_behavior.proto".to_string()),
        package: Some("google.api".to_string()),
        dependency: vec!["google/protobuf/descriptor.proto".to_string()],
        enum_type: vec![enumeration(
            "FieldBehavior",
            &[
                "FIELD_BEHAVIOR_UNSPECIFIED",
                "OPTIONAL",
                "REQUIRED",
                "OUTPUT_ONLY",
                "INPUT_ONLY",
                "IMMUTABLE",
                "UNORDERED_LIST",
                "NON_EMPTY_DEFAULT",
                "IDENTIFIER",
            ],
        )],
        extension: vec![FieldDescriptorProto {
            extendee: Some(".google.protobuf.FieldOptions".to_string()),
            type_name: Some(".google.api.FieldBehavior".to_string()),
            ..repeated(scalar("field_behavior", FIELD_BEHAVIOR_NUMBER as i32, Type::Enum))
        }],
        syntax: Some("proto3".to_string()),
        ..Default::default()
    }
}

/// The encoded `testdata/annotated.proto`.
fn annotated_file() -> Vec<u8> {
    let file = FileDescriptorProto {
        name: Some("testdata/annotated.proto".to_string()),
        package: Some(PACKAGE.to_string()),
        dependency: vec!["google/api/field_behavior.proto".to_string()],
        syntax: Some("proto3".to_string()),
        ..Default::default()
    };

    let mut message = message_type("AnnotatedRequest", vec![]).encode_to_vec();
    for field in [
        with_field_behavior(scalar("name", 1, Type::String), FIELD_BEHAVIOR_REQUIRED),
        with_field_behavior(scalar("note", 2, Type::String), FIELD_BEHAVIOR_OPTIONAL),
    ] {
        // DescriptorProto.field
        encoding::bytes::encode(2, &field, &mut message);
    }

    let mut bytes = file.encode_to_vec();
    // FileDescriptorProto.message_type
    encoding::bytes::encode(4, &message, &mut bytes);
    bytes
}

/// The encoded field with `FieldOptions` carrying a single `google.api.field_behavior` value.
fn with_field_behavior(field: FieldDescriptorProto, behavior: i32) -> Vec<u8> {
    let mut options = vec![];
    encoding::int32::encode(FIELD_BEHAVIOR_NUMBER, &behavior, &mut options);

    let mut bytes = field.encode_to_vec();
    // FieldDescriptorProto.options
    encoding::bytes::encode(8, &options, &mut bytes);
    bytes
}

fn message_type(name: &str, field: Vec<FieldDescriptorProto>) -> DescriptorProto {
    DescriptorProto {
        name: Some(name.to_string()),
        field,
        ..Default::default()
    }
}

fn map_entry(name: &str, key: Type, value: FieldDescriptorProto) -> DescriptorProto {
    DescriptorProto {
        options: Some(MessageOptions {
            map_entry: Some(true),
            ..Default::default()
        }),
        ..message_type(name, vec![scalar("key", 1, key), value])
    }
}

fn enumeration(name: &str, values: &[&str]) -> EnumDescriptorProto {
    EnumDescriptorProto {
        name: Some(name.to_string()),
        value: values
            .iter()
            .enumerate()
            .map(|(number, value)| EnumValueDescriptorProto {
                name: Some(value.to_string()),
                number: Some(number as i32),
                ..Default::default()
            })
            .collect(),
        ..Default::default()
    }
}

fn oneof(name: &str) -> OneofDescriptorProto {
    OneofDescriptorProto {
        name: Some(name.to_string()),
        ..Default::default()
    }
}

fn method(name: &str, input: &str, output: &str) -> MethodDescriptorProto {
    MethodDescriptorProto {
        name: Some(name.to_string()),
        input_type: Some(format!(".{PACKAGE}.{input}")),
        output_type: Some(format!(".{PACKAGE}.{output}")),
        ..Default::default()
    }
}

fn scalar(name: &str, number: i32, typ: Type) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_string()),
        number: Some(number),
        label: Some(Label::Optional as i32),
        r#type: Some(typ as i32),
        json_name: Some(json_name(name)),
        ..Default::default()
    }
}

fn message_field(name: &str, number: i32, type_name: &str) -> FieldDescriptorProto {
    FieldDescriptorProto {
        type_name: Some(format!(".{type_name}")),
        ..scalar(name, number, Type::Message)
    }
}

fn enum_field(name: &str, number: i32, type_name: &str) -> FieldDescriptorProto {
    FieldDescriptorProto {
        type_name: Some(format!(".{type_name}")),
        ..scalar(name, number, Type::Enum)
    }
}

fn map_field(name: &str, number: i32, entry: &str) -> FieldDescriptorProto {
    repeated(message_field(name, number, entry))
}

fn repeated(field: FieldDescriptorProto) -> FieldDescriptorProto {
    with_label(field, Label::Repeated)
}

fn with_label(field: FieldDescriptorProto, label: Label) -> FieldDescriptorProto {
    FieldDescriptorProto {
        label: Some(label as i32),
        ..field
    }
}

fn proto3_optional(field: FieldDescriptorProto, synthetic_oneof: i32) -> FieldDescriptorProto {
    FieldDescriptorProto {
        proto3_optional: Some(true),
        ..in_oneof(field, synthetic_oneof)
    }
}

fn in_oneof(field: FieldDescriptorProto, index: i32) -> FieldDescriptorProto {
    FieldDescriptorProto {
        oneof_index: Some(index),
        ..field
    }
}

fn json_name(name: &str) -> String {
    let mut result = String::with_capacity(name.len());
    let mut upper = false;
    for c in name.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            result.extend(c.to_uppercase());
            upper = false;
        } else {
            result.push(c);
        }
    }
    result
}
