// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

/// Which JSON dialect tools advertise and accept: "canonical" (default) or "restricted".
pub const PROTO_MCP_SCHEMA_DIALECT: &str = "PROTO_MCP_SCHEMA_DIALECT";

/// Whether responses include fields holding their default value (default: true).
pub const PROTO_MCP_EMIT_DEFAULTS: &str = "PROTO_MCP_EMIT_DEFAULTS";

/// Log filter, following `RUST_LOG` conventions.
pub const PROTO_MCP_LOG: &str = "PROTO_MCP_LOG";
