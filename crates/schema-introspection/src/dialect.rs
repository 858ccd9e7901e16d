// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which JSON Schema vocabulary a schema is rendered in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaDialect {
    /// Mirrors the protobuf JSON mapping: open-ended maps, `oneOf`, nullable unions.
    #[default]
    Canonical,
    /// The subset accepted by strict function-calling clients: no open-ended objects, no
    /// unions. Maps become `{key, value}` entry arrays.
    Restricted,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown schema dialect `{0}` (expected `canonical` or `restricted`)")]
pub struct UnknownDialectError(pub String);

impl FromStr for SchemaDialect {
    type Err = UnknownDialectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "canonical" | "standard" => Ok(SchemaDialect::Canonical),
            "restricted" | "openai" => Ok(SchemaDialect::Restricted),
            _ => Err(UnknownDialectError(s.to_string())),
        }
    }
}

impl fmt::Display for SchemaDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaDialect::Canonical => write!(f, "canonical"),
            SchemaDialect::Restricted => write!(f, "restricted"),
        }
    }
}
