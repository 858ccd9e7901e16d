// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! JSON Schema rendering of a [`type_graph::TypeGraph`].

pub mod dialect;
pub mod json_schema;
pub mod renderer;

pub use dialect::{SchemaDialect, UnknownDialectError};
pub use json_schema::{AdditionalProperties, JsonSchema, JsonSchemaInline, JsonSchemaRef, SchemaType};
pub use renderer::{RenderedSchemas, SchemaRenderer};
