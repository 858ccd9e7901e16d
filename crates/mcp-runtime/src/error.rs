// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use thiserror::Error;

use crate::tool::HandlerError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    #[error("Only one of {members:?} (oneof `{group}`) may be set")]
    ConflictingOneofMembers { group: String, members: Vec<String> },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtraPropertyError {
    #[error("Missing required parameter `{name}`")]
    MissingRequired { name: String },
}

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Invalid arguments for `{message}`: {source}")]
    Rejected {
        message: String,
        source: serde_json::Error,
    },
}

#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("Failed to encode `{message}`: {source}")]
    Serialization {
        message: String,
        source: serde_json::Error,
    },

    #[error("Handler returned `{actual}` where `{expected}` was expected")]
    UnexpectedResponseType { expected: String, actual: String },
}

#[derive(Error, Debug)]
pub enum ToolCallError {
    #[error(transparent)]
    ExtraProperty(#[from] ExtraPropertyError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error("Tool `{0}` not found")]
    ToolNotFound(String),

    #[error("Handler failed")]
    Handler(#[source] HandlerError),
}

impl ToolCallError {
    pub fn user_error_message(&self) -> String {
        match self {
            ToolCallError::ExtraProperty(e) => e.to_string(),
            ToolCallError::Reconcile(e) => e.to_string(),
            ToolCallError::Decode(e) => e.to_string(),
            ToolCallError::ToolNotFound(name) => format!("Tool {name} not found"),
            // Internal failures are not shown to the caller
            ToolCallError::Encode(_) | ToolCallError::Handler(_) => "Internal error".to_string(),
        }
    }

    pub fn error_code_string(&self) -> &'static str {
        match self {
            ToolCallError::ExtraProperty(_)
            | ToolCallError::Reconcile(_)
            | ToolCallError::Decode(_) => "-32602",
            ToolCallError::ToolNotFound(_) => "-32601",
            ToolCallError::Encode(_) | ToolCallError::Handler(_) => "-32603",
        }
    }

    /// Caller errors, as opposed to failures of this process or the backend.
    pub fn is_invalid_params(&self) -> bool {
        self.error_code_string() == "-32602"
    }
}
