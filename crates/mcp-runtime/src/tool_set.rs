// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::sync::Arc;

use prost_reflect::{DescriptorPool, MethodDescriptor, ServiceDescriptor};
use serde_json::Value;
use tracing::{debug, warn};
use type_graph::{SchemaGenerationError, TypeGraph, TypeGraphBuilder, TypeIndex};

use crate::{
    config::RuntimeConfig,
    error::ToolCallError,
    extra_properties::ExtraProperty,
    tool::{MethodHandler, ProtoTool},
};

/// A method that could not be exposed, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedMethod {
    pub method: String,
    pub error: SchemaGenerationError,
}

/// Every exposable method of a set of services, built once at startup.
///
/// All tools share one [`TypeGraph`]. The set is immutable after [`ToolSet::build`] returns and
/// can be shared across concurrent calls without locking.
#[derive(Debug)]
pub struct ToolSet {
    tools: Vec<Arc<ProtoTool>>,
    skipped: Vec<SkippedMethod>,
    graph: Arc<TypeGraph>,
    config: RuntimeConfig,
}

impl ToolSet {
    pub fn build(pool: &DescriptorPool, config: RuntimeConfig, extras: Vec<ExtraProperty>) -> Self {
        Self::build_for_services(pool.services(), config, extras)
    }

    /// Methods that cannot be exposed are skipped (and reported by [`ToolSet::skipped`]) without
    /// affecting the others.
    pub fn build_for_services(
        services: impl IntoIterator<Item = ServiceDescriptor>,
        config: RuntimeConfig,
        extras: Vec<ExtraProperty>,
    ) -> Self {
        let extras: Arc<[ExtraProperty]> = extras.into();
        let mut builder = TypeGraphBuilder::new();
        let mut skipped = vec![];
        let mut methods = vec![];

        for service in services {
            for method in service.methods() {
                match add_method(&mut builder, &method) {
                    Ok((input, output)) => methods.push((method, input, output)),
                    Err(error) => skipped.push(skip(&method, error)),
                }
            }
        }

        let graph = Arc::new(builder.finish());

        let mut tools = vec![];
        for (method, input, output) in methods {
            match ProtoTool::new(
                method.clone(),
                graph.clone(),
                input,
                output,
                extras.clone(),
                config,
            ) {
                Ok(tool) => tools.push(Arc::new(tool)),
                Err(error) => skipped.push(skip(&method, error)),
            }
        }

        debug!(
            tools = tools.len(),
            skipped = skipped.len(),
            types = graph.len(),
            dialect = %config.dialect,
            "Built tool set"
        );

        Self {
            tools,
            skipped,
            graph,
            config,
        }
    }

    pub fn tools(&self) -> &[Arc<ProtoTool>] {
        &self.tools
    }

    pub fn get(&self, name: &str) -> Option<&Arc<ProtoTool>> {
        self.tools.iter().find(|tool| tool.name() == name)
    }

    pub fn skipped(&self) -> &[SkippedMethod] {
        &self.skipped
    }

    pub fn graph(&self) -> &TypeGraph {
        &self.graph
    }

    pub fn config(&self) -> RuntimeConfig {
        self.config
    }

    /// The `tools/list` entries, in service and method declaration order.
    pub fn definitions(&self) -> Result<Vec<Value>, serde_json::Error> {
        self.tools.iter().map(|tool| tool.definition()).collect()
    }

    pub async fn call(
        &self,
        handler: &dyn MethodHandler,
        name: &str,
        arguments: Value,
    ) -> Result<Value, ToolCallError> {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolCallError::ToolNotFound(name.to_string()))?;
        tool.invoke(handler, arguments).await
    }
}

fn add_method(
    builder: &mut TypeGraphBuilder,
    method: &MethodDescriptor,
) -> Result<(TypeIndex, TypeIndex), SchemaGenerationError> {
    if method.is_client_streaming() || method.is_server_streaming() {
        return Err(SchemaGenerationError::StreamingMethod(
            method.full_name().to_string(),
        ));
    }

    let input = builder.add_message(&method.input())?;
    let output = builder.add_message(&method.output())?;
    Ok((input, output))
}

fn skip(method: &MethodDescriptor, error: SchemaGenerationError) -> SkippedMethod {
    warn!(method = method.full_name(), error = %error, "Skipping method");
    SkippedMethod {
        method: method.full_name().to_string(),
        error,
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use prost_reflect::DynamicMessage;
    use schema_introspection::SchemaDialect;
    use serde_json::json;
    use type_graph::test_support::test_pool;

    use super::*;
    use crate::{call_context::CallContext, tool::HandlerError};

    fn names(tools: &ToolSet) -> Vec<&str> {
        tools.tools().iter().map(|tool| tool.name()).collect()
    }

    #[test_log::test]
    fn builds_unary_methods_and_skips_the_rest() {
        let tools = ToolSet::build(&test_pool(), RuntimeConfig::default(), vec![]);

        let mut built = names(&tools);
        built.sort();
        assert_eq!(
            built,
            vec![
                "testdata_ItemService_CreateItem",
                "testdata_MCPServerService_GetMCPServer",
                "testdata_MCPServerService_ListMCPServers",
                "testdata_MCPServerService_UpdateMCPServer",
            ]
        );

        let mut skipped: Vec<_> = tools.skipped().iter().map(|s| s.method.as_str()).collect();
        skipped.sort();
        assert_eq!(
            skipped,
            vec!["testdata.ItemService.WatchItems", "testdata.LegacyService.Archive"]
        );
        assert!(tools.skipped().iter().any(|s| matches!(
            s.error,
            SchemaGenerationError::StreamingMethod(_)
        )));
        assert!(tools.skipped().iter().any(|s| matches!(
            s.error,
            SchemaGenerationError::UnsupportedFieldKind { .. }
        )));
        assert!(!tools.graph().contains("testdata.LegacyEnvelope"));
    }

    #[test_log::test]
    fn colliding_extra_property_skips_only_affected_methods() {
        let extras = vec![ExtraProperty::new("id", "Request id")];
        let tools = ToolSet::build(&test_pool(), RuntimeConfig::default(), extras);

        assert!(tools.get("testdata_ItemService_CreateItem").is_some());
        assert!(tools.get("testdata_MCPServerService_ListMCPServers").is_some());
        assert!(tools.get("testdata_MCPServerService_GetMCPServer").is_none());

        let collision = tools
            .skipped()
            .iter()
            .find(|s| s.method == "testdata.MCPServerService.UpdateMCPServer")
            .unwrap();
        assert_eq!(
            collision.error,
            SchemaGenerationError::ExtraPropertyCollision {
                message: "testdata.UpdateMCPServerRequest".to_string(),
                property: "id".to_string(),
            }
        );
    }

    #[test_log::test]
    fn duplicate_extra_properties_skip_every_method() {
        fn create_item_error(extras: Vec<ExtraProperty>) -> SchemaGenerationError {
            let tools = ToolSet::build(&test_pool(), RuntimeConfig::default(), extras);
            assert!(tools.tools().is_empty());
            tools
                .skipped()
                .iter()
                .find(|s| s.method == "testdata.ItemService.CreateItem")
                .unwrap()
                .error
                .clone()
        }

        let same_name = vec![
            ExtraProperty::new("trace_id", "Trace to join"),
            ExtraProperty::new("trace_id", "Trace to join").with_context_key("trace"),
        ];
        assert_eq!(
            create_item_error(same_name),
            SchemaGenerationError::DuplicateExtraProperty {
                what: "name",
                value: "trace_id".to_string(),
            }
        );

        let same_context_key = vec![
            ExtraProperty::new("trace_id", "Trace to join").with_context_key("trace"),
            ExtraProperty::new("span_id", "Span to join").with_context_key("trace"),
        ];
        assert_eq!(
            create_item_error(same_context_key),
            SchemaGenerationError::DuplicateExtraProperty {
                what: "context key",
                value: "trace".to_string(),
            }
        );
    }

    #[test_log::test]
    fn json_name_collisions_are_detected() {
        let extras = vec![ExtraProperty::new("pageSize", "Shadowing a JSON name")];
        let tools = ToolSet::build(&test_pool(), RuntimeConfig::default(), extras);

        assert!(tools.get("testdata_MCPServerService_ListMCPServers").is_none());
        assert!(tools.get("testdata_MCPServerService_GetMCPServer").is_some());
    }

    #[test_log::test]
    fn definitions_follow_the_dialect() {
        let pool = test_pool();
        let canonical = ToolSet::build(&pool, RuntimeConfig::default(), vec![]);
        let restricted = ToolSet::build(
            &pool,
            RuntimeConfig::default().with_dialect(SchemaDialect::Restricted),
            vec![],
        );

        let labels = |tools: &ToolSet| {
            tools
                .definitions()
                .unwrap()
                .into_iter()
                .find(|d| d["name"] == "testdata_ItemService_CreateItem")
                .unwrap()["inputSchema"]["properties"]["labels"]["type"]
                .clone()
        };

        assert_eq!(labels(&canonical), json!("object"));
        assert_eq!(labels(&restricted), json!("array"));
        assert_eq!(restricted.config().dialect, SchemaDialect::Restricted);
    }

    struct EchoHandler;

    #[async_trait]
    impl MethodHandler for EchoHandler {
        async fn call(
            &self,
            method: &MethodDescriptor,
            request: DynamicMessage,
            _context: &CallContext,
        ) -> Result<DynamicMessage, HandlerError> {
            let mut response = DynamicMessage::new(method.output());
            response.set_field_by_name(
                "display_name",
                request.get_field_by_name("id").unwrap().into_owned(),
            );
            Ok(response)
        }
    }

    #[tokio::test]
    async fn call_dispatches_by_name() {
        let tools = ToolSet::build(&test_pool(), RuntimeConfig::default(), vec![]);

        let result = tools
            .call(&EchoHandler, "testdata_MCPServerService_GetMCPServer", json!({"id": "srv"}))
            .await
            .unwrap();
        let payload: Value = serde_json::from_str(result["content"][0]["text"].as_str().unwrap()).unwrap();
        assert_eq!(payload["display_name"], "srv");

        let err = tools
            .call(&EchoHandler, "testdata_Missing", json!({}))
            .await
            .unwrap_err();
        assert_eq!(err.error_code_string(), "-32601");
    }
}
