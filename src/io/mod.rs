// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! I/O module - STL export and import

mod compare;
mod exporter;
mod importer;

pub use compare::{compare_meshes, MeshComparison};
pub use exporter::{export_stl, export_stl_with_format, write_mesh_asset, MeshAsset, StlFormat};
pub use importer::import_stl;
