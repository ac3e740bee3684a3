// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Geometry module - profiles, lofts, solids and their triangle meshes

pub mod analytics;
mod bbox;
mod boolean;
mod loft;
mod mesh;
mod profile;
mod solid;
pub mod tessellate;

pub use analytics::{analyze, GeometryStats};
pub use bbox::BoundingBox;
pub use boolean::subtract;
pub use loft::Loft;
pub use mesh::{Mesh, Triangle, Vertex};
pub use profile::{Profile, ProfileShape};
pub use solid::Solid;
pub use tessellate::tessellate;
