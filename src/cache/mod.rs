// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Content-addressed result cache

mod entry;
pub mod index;
mod store;

pub use entry::{BuildOutput, CachedResult};
pub use index::{IndexBackend, IndexEntries, JsonIndexFile, MemoryIndex};
pub use store::{CacheStats, ResultStore};
