// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Exposes unary protobuf methods as MCP tools.
//!
//! A [`ToolSet`] is built once from a descriptor pool. Each [`ProtoTool`] carries its input schema
//! in both dialects and runs the call pipeline: extra properties are extracted into a
//! [`CallContext`], restricted-dialect arguments are reconciled into canonical JSON, and the
//! result is decoded into a `DynamicMessage` for a [`MethodHandler`].

pub mod call_context;
pub mod codec;
pub mod config;
pub mod error;
pub mod extra_properties;
pub mod reconciler;
pub mod tool;
pub mod tool_set;

pub use call_context::CallContext;
pub use codec::{decode_canonical, encode_canonical};
pub use config::RuntimeConfig;
pub use error::{DecodeError, EncodeError, ExtraPropertyError, ReconcileError, ToolCallError};
pub use extra_properties::ExtraProperty;
pub use reconciler::Reconciler;
pub use tool::{HandlerError, MethodHandler, PreparedCall, ProtoTool, error_result, tool_name};
pub use tool_set::{SkippedMethod, ToolSet};
