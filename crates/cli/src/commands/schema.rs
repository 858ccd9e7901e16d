// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Arg, ArgMatches, Command};
use schema_introspection::SchemaRenderer;
use type_graph::{SchemaGenerationError, TypeGraphBuilder};

use super::{
    command::{CommandDefinition, descriptor_set_arg, dialect_arg, get_required, output_arg},
    util::{load_pool, runtime_config, write_output},
};

pub(crate) struct SchemaCommandDefinition {}

impl CommandDefinition for SchemaCommandDefinition {
    fn command(&self) -> Command {
        Command::new("schema")
            .about("Render the JSON Schema of a message")
            .arg(descriptor_set_arg())
            .arg(
                Arg::new("message")
                    .help("The fully-qualified message name, such as `example.v1.CreateItemRequest`.")
                    .long("message")
                    .short('m')
                    .required(true)
                    .num_args(1),
            )
            .arg(dialect_arg())
            .arg(output_arg())
    }

    fn execute(&self, matches: &ArgMatches) -> Result<()> {
        let descriptor_set: PathBuf = get_required(matches, "descriptor-set")?;
        let message_name: String = get_required(matches, "message")?;
        let config = runtime_config(matches)?;

        let pool = load_pool(&descriptor_set)?;
        let descriptor = pool
            .get_message_by_name(&message_name)
            .ok_or_else(|| SchemaGenerationError::MessageNotFound(message_name.clone()))?;

        let mut builder = TypeGraphBuilder::new();
        let root = builder.add_message(&descriptor)?;
        let graph = builder.finish();

        let schema = SchemaRenderer::new(&graph, config.dialect).render(root);
        write_output(matches, &schema.to_value()?)
    }
}
