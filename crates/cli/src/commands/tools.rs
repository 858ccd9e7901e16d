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
use clap::{Arg, ArgAction, ArgMatches, Command};
use mcp_runtime::{ExtraProperty, ToolSet};
use serde_json::json;

use super::{
    command::{CommandDefinition, descriptor_set_arg, dialect_arg, get_required, output_arg},
    util::{load_pool, runtime_config, write_output},
};

pub(crate) struct ToolsCommandDefinition {}

impl CommandDefinition for ToolsCommandDefinition {
    fn command(&self) -> Command {
        Command::new("tools")
            .about("List the MCP tools for every unary method in a descriptor set")
            .arg(descriptor_set_arg())
            .arg(dialect_arg())
            .arg(
                Arg::new("extra-property")
                    .help("An optional side-band parameter, as `name=description`.")
                    .long("extra-property")
                    .action(ArgAction::Append)
                    .value_parser(parse_extra_property),
            )
            .arg(
                Arg::new("required-extra-property")
                    .help("A required side-band parameter, as `name=description`.")
                    .long("required-extra-property")
                    .action(ArgAction::Append)
                    .value_parser(parse_extra_property),
            )
            .arg(output_arg())
    }

    fn execute(&self, matches: &ArgMatches) -> Result<()> {
        let descriptor_set: PathBuf = get_required(matches, "descriptor-set")?;
        let config = runtime_config(matches)?;

        let optional = matches
            .get_many::<ExtraProperty>("extra-property")
            .into_iter()
            .flatten()
            .cloned();
        let required = matches
            .get_many::<ExtraProperty>("required-extra-property")
            .into_iter()
            .flatten()
            .map(|extra| extra.clone().required());
        let extras = optional.chain(required).collect();

        let pool = load_pool(&descriptor_set)?;
        let tools = ToolSet::build(&pool, config, extras);

        let skipped: Vec<_> = tools
            .skipped()
            .iter()
            .map(|skipped| json!({"method": skipped.method, "reason": skipped.error.to_string()}))
            .collect();

        write_output(
            matches,
            &json!({
                "tools": tools.definitions()?,
                "skipped": skipped,
            }),
        )
    }
}

fn parse_extra_property(value: &str) -> Result<ExtraProperty, String> {
    match value.split_once('=') {
        Some((name, description)) if !name.trim().is_empty() => {
            Ok(ExtraProperty::new(name.trim(), description.trim()))
        }
        _ => Err(format!("expected `name=description`, got `{value}`")),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::*;
    use crate::commands::util::test_util::write_descriptor_set;

    #[test]
    fn extra_property_syntax() {
        let extra = parse_extra_property("dataplane_api_url = URL of the data plane").unwrap();
        assert_eq!(extra.name, "dataplane_api_url");
        assert_eq!(extra.description, "URL of the data plane");
        assert_eq!(extra.context_key, "dataplane_api_url");

        assert!(parse_extra_property("no-description").is_err());
        assert!(parse_extra_property("=only description").is_err());
    }

    #[test]
    fn lists_tools_with_extra_properties() {
        let dir = tempfile::tempdir().unwrap();
        let descriptor_set = write_descriptor_set(&dir);
        let output = dir.path().join("tools.json");

        let definition = ToolsCommandDefinition {};
        let matches = definition
            .command()
            .try_get_matches_from([
                "tools".to_string(),
                descriptor_set.display().to_string(),
                "--dialect".to_string(),
                "restricted".to_string(),
                "--required-extra-property".to_string(),
                "dataplane_api_url=URL of the data plane".to_string(),
                "-o".to_string(),
                output.display().to_string(),
            ])
            .unwrap();
        definition.execute(&matches).unwrap();

        let listed: Value = serde_json::from_str(&std::fs::read_to_string(output).unwrap()).unwrap();
        let tools = listed["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 4);

        let create = tools
            .iter()
            .find(|tool| tool["name"] == "testdata_ItemService_CreateItem")
            .unwrap();
        assert_eq!(create["inputSchema"]["properties"]["labels"]["type"], "array");
        assert!(
            create["inputSchema"]["required"]
                .as_array()
                .unwrap()
                .contains(&Value::from("dataplane_api_url"))
        );
        assert_eq!(listed["skipped"].as_array().unwrap().len(), 2);
    }
}
