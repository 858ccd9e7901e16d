// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::sync::Arc;

use async_trait::async_trait;
use prost_reflect::{DynamicMessage, MethodDescriptor, ReflectMessage};
use schema_introspection::{JsonSchemaInline, RenderedSchemas, SchemaDialect};
use serde_json::{Map, Value, json};
use tracing::{debug, warn};
use type_graph::{SchemaGenerationError, TypeGraph, TypeIndex};

use crate::{
    call_context::CallContext,
    codec::{decode_canonical, encode_canonical},
    config::RuntimeConfig,
    error::{EncodeError, ToolCallError},
    extra_properties::{self, ExtraProperty},
    reconciler::Reconciler,
};

pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Executes a decoded request, typically by forwarding it to a gRPC backend.
#[async_trait]
pub trait MethodHandler: Send + Sync {
    async fn call(
        &self,
        method: &MethodDescriptor,
        request: DynamicMessage,
        context: &CallContext,
    ) -> Result<DynamicMessage, HandlerError>;
}

/// `example.v1.ExampleService.CreateExample` becomes `example_v1_ExampleService_CreateExample`.
pub fn tool_name(method: &MethodDescriptor) -> String {
    method.full_name().replace('.', "_")
}

/// A decoded request and the side-band values stripped from its arguments.
#[derive(Debug, Clone)]
pub struct PreparedCall {
    pub request: DynamicMessage,
    pub context: CallContext,
}

/// One unary method exposed as a tool. Immutable once built.
#[derive(Debug)]
pub struct ProtoTool {
    name: String,
    description: String,
    method: MethodDescriptor,
    graph: Arc<TypeGraph>,
    input: TypeIndex,
    output: TypeIndex,
    schemas: RenderedSchemas,
    extra_properties: Arc<[ExtraProperty]>,
    config: RuntimeConfig,
}

impl ProtoTool {
    /// `input` and `output` must be the graph nodes of the method's input and output messages.
    pub fn new(
        method: MethodDescriptor,
        graph: Arc<TypeGraph>,
        input: TypeIndex,
        output: TypeIndex,
        extra_properties: Arc<[ExtraProperty]>,
        config: RuntimeConfig,
    ) -> Result<Self, SchemaGenerationError> {
        let input_name = method.input().full_name().to_string();
        let input_message = graph
            .message(input)
            .ok_or_else(|| SchemaGenerationError::MessageNotFound(input_name.clone()))?;
        extra_properties::check_collisions(&input_name, input_message, &extra_properties)?;

        let mut schemas = RenderedSchemas::render(&graph, input);
        for schema in schemas.iter_mut() {
            extra_properties::augment_schema(schema, &extra_properties);
        }

        Ok(Self {
            name: tool_name(&method),
            description: format!("Calls the {} method", method.full_name()),
            method,
            graph,
            input,
            output,
            schemas,
            extra_properties,
            config,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn method(&self) -> &MethodDescriptor {
        &self.method
    }

    pub fn extra_properties(&self) -> &[ExtraProperty] {
        &self.extra_properties
    }

    /// The schema advertised under the configured dialect.
    pub fn input_schema(&self) -> &JsonSchemaInline {
        self.schemas.get(self.config.dialect)
    }

    pub fn input_schema_for(&self, dialect: SchemaDialect) -> &JsonSchemaInline {
        self.schemas.get(dialect)
    }

    /// The `tools/list` entry for this tool.
    pub fn definition(&self) -> Result<Value, serde_json::Error> {
        Ok(json!({
            "name": self.name,
            "description": self.description,
            "inputSchema": self.input_schema().to_value()?,
        }))
    }

    /// Turns tool arguments into a request message.
    ///
    /// Extra properties are extracted first, so the reconciler and the decoder never see them.
    /// Reconciliation only runs when the restricted dialect is advertised.
    pub fn prepare(&self, arguments: Value) -> Result<PreparedCall, ToolCallError> {
        let mut arguments = match arguments {
            Value::Null => Value::Object(Map::new()),
            arguments => arguments,
        };

        let context = extra_properties::extract(&self.extra_properties, &mut arguments)?;

        if self.config.dialect == SchemaDialect::Restricted {
            Reconciler::new(&self.graph).reconcile(self.input, &mut arguments)?;
        }

        let request = decode_canonical(&self.method.input(), arguments)?;
        Ok(PreparedCall { request, context })
    }

    /// Encodes a response in the configured dialect.
    pub fn render_response(&self, response: &DynamicMessage) -> Result<Value, ToolCallError> {
        let expected = self.method.output();
        if response.descriptor().full_name() != expected.full_name() {
            return Err(EncodeError::UnexpectedResponseType {
                expected: expected.full_name().to_string(),
                actual: response.descriptor().full_name().to_string(),
            }
            .into());
        }

        let mut value = encode_canonical(response, self.config.emit_defaults)?;
        if self.config.dialect == SchemaDialect::Restricted {
            Reconciler::new(&self.graph).restrict(self.output, &mut value);
        }
        Ok(value)
    }

    /// Runs the whole call: prepare, hand off to `handler`, render the response as a tool result.
    ///
    /// Dropping the returned future drops the handler's future with it.
    pub async fn invoke(
        &self,
        handler: &dyn MethodHandler,
        arguments: Value,
    ) -> Result<Value, ToolCallError> {
        let PreparedCall { request, context } = self.prepare(arguments).inspect_err(|e| {
            warn!(tool = %self.name, error = %e, "Rejected tool call");
        })?;

        debug!(
            tool = %self.name,
            context_keys = ?context.iter().map(|(key, _)| key).collect::<Vec<_>>(),
            "Invoking method"
        );
        let response = handler
            .call(&self.method, request, &context)
            .await
            .map_err(ToolCallError::Handler)?;

        let value = self.render_response(&response)?;
        Ok(json!({
            "content": [{
                "type": "text",
                "text": value.to_string(),
            }],
            "isError": false,
        }))
    }
}

/// The tool result reported for a failed call.
pub fn error_result(error: &ToolCallError) -> Value {
    json!({
        "content": [{
            "text": error.user_error_message(),
            "type": "text",
        }],
        "isError": true,
    })
}
