// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use serde::{Deserialize, Serialize};

use crate::types::ScalarKind;

/// `google.protobuf` types whose canonical JSON form differs from their message structure.
///
/// These are never expanded into their fields; the graph records them as leaves and both the
/// renderer and the reconciler special-case them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WellKnownType {
    /// `Struct`: any JSON object.
    Struct,
    /// `Value`: any JSON value.
    Value,
    /// `ListValue`: any JSON array.
    ListValue,
    /// `NullValue`: the JSON `null`.
    NullValue,
    /// One of the nine wrapper messages, which render as their nullable primitive.
    Wrapper(ScalarKind),
    Timestamp,
    Duration,
    FieldMask,
    Any,
}

impl WellKnownType {
    pub fn from_full_name(name: &str) -> Option<Self> {
        let wkt = match name {
            "google.protobuf.Struct" => WellKnownType::Struct,
            "google.protobuf.Value" => WellKnownType::Value,
            "google.protobuf.ListValue" => WellKnownType::ListValue,
            "google.protobuf.NullValue" => WellKnownType::NullValue,
            "google.protobuf.Timestamp" => WellKnownType::Timestamp,
            "google.protobuf.Duration" => WellKnownType::Duration,
            "google.protobuf.FieldMask" => WellKnownType::FieldMask,
            "google.protobuf.Any" => WellKnownType::Any,
            "google.protobuf.DoubleValue" => WellKnownType::Wrapper(ScalarKind::Double),
            "google.protobuf.FloatValue" => WellKnownType::Wrapper(ScalarKind::Float),
            "google.protobuf.Int64Value" => WellKnownType::Wrapper(ScalarKind::Int64),
            "google.protobuf.UInt64Value" => WellKnownType::Wrapper(ScalarKind::Uint64),
            "google.protobuf.Int32Value" => WellKnownType::Wrapper(ScalarKind::Int32),
            "google.protobuf.UInt32Value" => WellKnownType::Wrapper(ScalarKind::Uint32),
            "google.protobuf.BoolValue" => WellKnownType::Wrapper(ScalarKind::Bool),
            "google.protobuf.StringValue" => WellKnownType::Wrapper(ScalarKind::String),
            "google.protobuf.BytesValue" => WellKnownType::Wrapper(ScalarKind::Bytes),
            _ => return None,
        };
        Some(wkt)
    }

    /// Types whose value is arbitrary JSON and so cannot be described by a restricted schema.
    pub fn is_opaque(&self) -> bool {
        matches!(
            self,
            WellKnownType::Struct | WellKnownType::Value | WellKnownType::ListValue
        )
    }
}

/// The type name from an `Any` type URL (`type.googleapis.com/pkg.Msg` is `pkg.Msg`).
pub fn type_name_from_url(type_url: &str) -> &str {
    type_url
        .rsplit_once('/')
        .map(|(_, name)| name)
        .unwrap_or(type_url)
}
