// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use common::{
    EnvError, Environment,
    env_const::{PROTO_MCP_EMIT_DEFAULTS, PROTO_MCP_SCHEMA_DIALECT},
};
use schema_introspection::SchemaDialect;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// The dialect tools advertise, and therefore the one inbound arguments arrive in.
    pub dialect: SchemaDialect,
    /// Whether responses include fields that hold their default value.
    pub emit_defaults: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            dialect: SchemaDialect::Canonical,
            emit_defaults: true,
        }
    }
}

impl RuntimeConfig {
    pub fn from_env(env: &dyn Environment) -> Result<Self, EnvError> {
        let dialect = match env.get(PROTO_MCP_SCHEMA_DIALECT) {
            Some(value) => value.parse().map_err(|e: schema_introspection::UnknownDialectError| {
                EnvError::InvalidEnum {
                    env_key: PROTO_MCP_SCHEMA_DIALECT,
                    env_value: value.clone(),
                    message: e.to_string(),
                }
            })?,
            None => SchemaDialect::default(),
        };

        Ok(Self {
            dialect,
            emit_defaults: env.enabled(PROTO_MCP_EMIT_DEFAULTS, true)?,
        })
    }

    pub fn with_dialect(mut self, dialect: SchemaDialect) -> Self {
        self.dialect = dialect;
        self
    }
}
