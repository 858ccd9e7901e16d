// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use thiserror::Error;

/// Fatal for the message (or method) being processed; other messages are unaffected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaGenerationError {
    #[error("Message `{0}` not found in the descriptor pool")]
    MessageNotFound(String),

    #[error("Field `{field}` of `{message}` has unsupported kind `{kind}`")]
    UnsupportedFieldKind {
        message: String,
        field: String,
        kind: String,
    },

    #[error("Map field `{field}` of `{message}` has unsupported key type `{key}`")]
    UnsupportedMapKey {
        message: String,
        field: String,
        key: String,
    },

    #[error("Extra property `{property}` collides with a field of `{message}`")]
    ExtraPropertyCollision { message: String, property: String },

    #[error("Extra property {what} `{value}` is declared more than once")]
    DuplicateExtraProperty { what: &'static str, value: String },

    #[error("Method `{0}` is streaming, only unary methods can be exposed as tools")]
    StreamingMethod(String),
}
