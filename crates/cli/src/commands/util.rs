// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::ArgMatches;
use common::SystemEnvironment;
use mcp_runtime::RuntimeConfig;
use prost_reflect::DescriptorPool;
use schema_introspection::SchemaDialect;
use serde_json::Value;
use tracing::debug;

use super::command::get;

pub(crate) fn load_pool(path: &Path) -> Result<DescriptorPool> {
    let bytes = fs::read(path)
        .with_context(|| format!("Failed to read descriptor set {}", path.display()))?;

    let pool = DescriptorPool::decode(bytes.as_slice())
        .with_context(|| format!("Invalid descriptor set {}", path.display()))?;

    debug!(path = %path.display(), files = pool.files().len(), "Loaded descriptor set");
    Ok(pool)
}

/// The configuration from the environment, with `--dialect` taking precedence.
pub(crate) fn runtime_config(matches: &ArgMatches) -> Result<RuntimeConfig> {
    let config = RuntimeConfig::from_env(&SystemEnvironment)?;

    Ok(match get::<SchemaDialect>(matches, "dialect") {
        Some(dialect) => config.with_dialect(dialect),
        None => config,
    })
}

pub(crate) fn write_output(matches: &ArgMatches, value: &Value) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value)?;

    match get::<PathBuf>(matches, "output") {
        Some(path) => fs::write(&path, rendered)
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => println!("{rendered}"),
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_util {
    use std::path::PathBuf;

    use prost::Message;
    use prost_types::FileDescriptorSet;
    use tempfile::TempDir;
    use type_graph::test_support::test_pool;

    /// Writes the test pool as a descriptor set, returning its path.
    pub(crate) fn write_descriptor_set(dir: &TempDir) -> PathBuf {
        let set = FileDescriptorSet {
            file: test_pool().file_descriptor_protos().cloned().collect(),
        };
        let path = dir.path().join("testdata.binpb");
        std::fs::write(&path, set.encode_to_vec()).unwrap();
        path
    }
}

#[cfg(test)]
mod tests {
    use super::{test_util::write_descriptor_set, *};

    #[test]
    fn loads_descriptor_set() {
        let dir = tempfile::tempdir().unwrap();
        let pool = load_pool(&write_descriptor_set(&dir)).unwrap();

        assert!(pool.get_message_by_name("testdata.CreateItemRequest").is_some());
        assert!(pool.get_message_by_name("google.protobuf.Struct").is_some());
    }

    #[test]
    fn reports_unreadable_file() {
        let err = load_pool(Path::new("/nonexistent/descriptor.binpb")).unwrap_err();
        assert!(err.to_string().contains("Failed to read descriptor set"));
    }
}
