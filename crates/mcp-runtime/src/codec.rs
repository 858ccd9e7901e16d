// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Canonical protobuf JSON in and out of `DynamicMessage`.

use prost_reflect::{
    DeserializeOptions, DynamicMessage, MessageDescriptor, ReflectMessage, SerializeOptions,
};
use serde_json::Value;

use crate::error::{DecodeError, EncodeError};

/// Decodes canonical JSON. Unknown fields are discarded.
pub fn decode_canonical(
    descriptor: &MessageDescriptor,
    value: Value,
) -> Result<DynamicMessage, DecodeError> {
    let options = DeserializeOptions::new().deny_unknown_fields(false);

    DynamicMessage::deserialize_with_options(descriptor.clone(), value, &options).map_err(|source| {
        DecodeError::Rejected {
            message: descriptor.full_name().to_string(),
            source,
        }
    })
}

/// Encodes canonical JSON keyed by proto field names.
pub fn encode_canonical(message: &DynamicMessage, emit_defaults: bool) -> Result<Value, EncodeError> {
    let options = SerializeOptions::new()
        .use_proto_field_name(true)
        .skip_default_fields(!emit_defaults);

    message
        .serialize_with_options(serde_json::value::Serializer, &options)
        .map_err(|source| EncodeError::Serialization {
            message: message.descriptor().full_name().to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use type_graph::test_support::{message, test_pool};

    use super::*;

    #[test]
    fn decode_accepts_proto_and_json_names() {
        let pool = test_pool();
        let descriptor = message(&pool, "testdata.ListMCPServersRequest");

        let by_proto_name = decode_canonical(&descriptor, json!({"page_size": 10, "page_token": "t"})).unwrap();
        let by_json_name = decode_canonical(&descriptor, json!({"pageSize": 10, "pageToken": "t"})).unwrap();

        assert_eq!(by_proto_name, by_json_name);
    }

    #[test]
    fn decode_discards_unknown_fields() {
        let pool = test_pool();
        let descriptor = message(&pool, "testdata.GetMCPServerRequest");

        let decoded = decode_canonical(&descriptor, json!({"id": "a", "not_a_field": [1]})).unwrap();
        assert_eq!(decoded.descriptor().full_name(), "testdata.GetMCPServerRequest");
        assert_eq!(encode_canonical(&decoded, false).unwrap(), json!({"id": "a"}));
    }

    #[test]
    fn decode_rejects_restricted_map_shape() {
        let pool = test_pool();
        let descriptor = message(&pool, "testdata.CreateItemRequest");

        let err = decode_canonical(&descriptor, json!({"labels": [{"key": "a", "value": "b"}]})).unwrap_err();
        assert!(matches!(err, DecodeError::Rejected { ref message, .. } if message == "testdata.CreateItemRequest"));
    }

    #[test]
    fn encode_emits_defaults_on_request() {
        let pool = test_pool();
        let descriptor = message(&pool, "testdata.ListMCPServersRequest");
        let decoded = decode_canonical(&descriptor, json!({"page_token": "next"})).unwrap();

        assert_eq!(
            encode_canonical(&decoded, true).unwrap(),
            json!({"page_size": 0, "page_token": "next"})
        );
        assert_eq!(
            encode_canonical(&decoded, false).unwrap(),
            json!({"page_token": "next"})
        );
    }
}
