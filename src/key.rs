// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Canonical cache keys for product parameter sets
//!
//! A key is `<namespace>/v<version>` followed by `;name=value` for every
//! field in declared order. Floats are written as the hex of their IEEE-754
//! bits, so two keys are equal exactly when the parameter values are equal.

use crate::params::{DuctParameters, RackParameters};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Canonical, namespaced encoding of a parameter set
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Content-addressed identifier used as the result directory name
    pub fn result_id(&self) -> String {
        format!("{:x}", Sha256::digest(self.as_bytes()))
    }

    /// Namespace prefix, e.g. `duct` for `duct/v1;...`
    pub fn namespace(&self) -> &str {
        self.0.split('/').next().unwrap_or_default()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Field-by-field writer producing a [`CacheKey`]
pub struct KeyEncoder {
    buf: String,
}

impl KeyEncoder {
    fn new(namespace: &str, version: u32) -> Self {
        Self {
            buf: format!("{namespace}/v{version}"),
        }
    }

    pub fn float(&mut self, name: &str, value: f64) -> &mut Self {
        // -0.0 and 0.0 compare equal, so they must encode equally
        let value = if value == 0.0 { 0.0 } else { value };
        self.field(name, format_args!("{:016x}", value.to_bits()))
    }

    pub fn uint(&mut self, name: &str, value: u64) -> &mut Self {
        self.field(name, format_args!("{value}"))
    }

    fn field(&mut self, name: &str, value: fmt::Arguments<'_>) -> &mut Self {
        use std::fmt::Write;
        // Writing into a String cannot fail
        let _ = write!(self.buf, ";{name}={value}");
        self
    }

    fn finish(self) -> CacheKey {
        CacheKey(self.buf)
    }
}

/// A parameter set with a fixed, declared field order
pub trait CanonicalParameters {
    /// Product namespace, unique per parameter type
    const NAMESPACE: &'static str;
    /// Bumped whenever the meaning of a generated artifact changes
    const VERSION: u32;

    fn encode_fields(&self, encoder: &mut KeyEncoder);

    fn cache_key(&self) -> CacheKey {
        let mut encoder = KeyEncoder::new(Self::NAMESPACE, Self::VERSION);
        self.encode_fields(&mut encoder);
        encoder.finish()
    }
}

impl CanonicalParameters for DuctParameters {
    const NAMESPACE: &'static str = "duct";
    const VERSION: u32 = 1;

    fn encode_fields(&self, encoder: &mut KeyEncoder) {
        encoder
            .float("wall_thickness", self.wall_thickness)
            .float("circular_radius", self.circular_radius)
            .float("square_width", self.square_width)
            .float("square_height", self.square_height)
            .float("length", self.length);
    }
}

impl CanonicalParameters for RackParameters {
    const NAMESPACE: &'static str = "rack";
    const VERSION: u32 = 1;

    fn encode_fields(&self, encoder: &mut KeyEncoder) {
        encoder.uint("servers", u64::from(self.servers));
    }
}

/// Every product type the cache knows how to key
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "product", rename_all = "snake_case")]
pub enum ProductParameters {
    Duct(DuctParameters),
    ServerRack(RackParameters),
}

impl ProductParameters {
    pub fn cache_key(&self) -> CacheKey {
        match self {
            Self::Duct(params) => params.cache_key(),
            Self::ServerRack(params) => params.cache_key(),
        }
    }
}

impl From<DuctParameters> for ProductParameters {
    fn from(params: DuctParameters) -> Self {
        Self::Duct(params)
    }
}

impl From<RackParameters> for ProductParameters {
    fn from(params: RackParameters) -> Self {
        Self::ServerRack(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_deterministic() {
        let a = DuctParameters::new(1.0, 10.0, 50.0, 30.0, 60.0);
        let b = DuctParameters {
            length: 60.0,
            square_height: 30.0,
            square_width: 50.0,
            circular_radius: 10.0,
            wall_thickness: 1.0,
        };
        assert_eq!(a.cache_key(), b.cache_key());
        assert_eq!(a.cache_key().as_bytes(), a.cache_key().as_bytes());
    }

    #[test]
    fn key_layout() {
        let key = DuctParameters::default().cache_key();
        assert_eq!(
            key.as_str(),
            "duct/v1;wall_thickness=3ff0000000000000;circular_radius=4024000000000000;\
             square_width=4049000000000000;square_height=403e000000000000;length=404e000000000000"
        );
        assert_eq!(key.namespace(), "duct");
    }

    #[test]
    fn nearby_floats_do_not_alias() {
        let a = DuctParameters {
            wall_thickness: 0.1 + 0.2,
            ..Default::default()
        };
        let b = DuctParameters {
            wall_thickness: 0.3,
            ..Default::default()
        };
        assert_ne!(a.cache_key(), b.cache_key());
    }

    #[test]
    fn negative_zero_matches_zero() {
        let a = DuctParameters {
            wall_thickness: 0.0,
            ..Default::default()
        };
        let b = DuctParameters {
            wall_thickness: -0.0,
            ..Default::default()
        };
        assert_eq!(a.cache_key(), b.cache_key());
    }

    #[test]
    fn products_are_namespaced() {
        let duct = ProductParameters::from(DuctParameters::default()).cache_key();
        let rack = ProductParameters::from(RackParameters { servers: 10 }).cache_key();
        assert_ne!(duct, rack);
        assert_eq!(rack.as_str(), "rack/v1;servers=10");
        assert_ne!(duct.result_id(), rack.result_id());
    }

    #[test]
    fn result_id_is_sha256_hex() {
        let id = DuctParameters::default().cache_key().result_id();
        assert_eq!(id.len(), 64);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }
}
