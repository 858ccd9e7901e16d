// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Descriptor-driven type graph.
//!
//! A [`TypeGraph`] holds exactly one [`TypeNode`] per qualified type name reachable from the
//! messages added to a [`TypeGraphBuilder`]. Recursive message families are resolved to shared
//! nodes, so every walk over the graph (schema rendering, value reconciliation) can follow
//! `TypeIndex` references without tracking its own recursion path.
//!
//! The graph is built once and is read-only afterwards: [`TypeGraphBuilder::finish`] consumes the
//! builder and [`TypeGraph`] exposes no mutation API.

pub mod builder;
pub mod error;
pub mod mapped_arena;
pub mod types;
pub mod well_known;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use builder::{TypeGraph, TypeGraphBuilder};
pub use error::SchemaGenerationError;
pub use types::{
    EnumType, FieldFlags, FieldNode, MapType, MessageType, OneofGroup, ScalarKind, TypeIndex,
    TypeKind, TypeNode,
};
pub use well_known::WellKnownType;
