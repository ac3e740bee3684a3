// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Pipemesh
//!
//! Parametric generator for hollow circle-to-rectangle ventilation ducts,
//! exported as STL and served through a content-addressed result cache that
//! builds every distinct parameter set at most once.

pub mod cache;
pub mod config;
pub mod duct;
pub mod error;
pub mod geometry;
pub mod io;
pub mod kernel;
pub mod key;
pub mod params;
pub mod utils;

pub use cache::{BuildOutput, CacheStats, CachedResult, JsonIndexFile, MemoryIndex, ResultStore};
pub use config::PipemeshConfig;
pub use duct::{build_duct, duct_builder, generate_duct, DuctMetadata};
pub use error::{PipeError, PipeResult};
pub use geometry::{Mesh, Solid};
pub use io::{export_stl, import_stl};
pub use kernel::{BuildHandle, Kernel};
pub use key::{CacheKey, CanonicalParameters, ProductParameters};
pub use params::{DuctParameters, RackParameters};

/// Build and tessellate a duct without exporting it
pub fn render_duct(params: &DuctParameters) -> PipeResult<Mesh> {
    let solid = build_duct(params)?;
    geometry::tessellate(&solid)
}
