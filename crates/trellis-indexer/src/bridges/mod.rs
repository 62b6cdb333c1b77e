//! Cross-language bridges.
//!
//! Bridges connect references that name-based resolution cannot reach: a
//! frontend `fetch("/api/users/3")` to the backend route `/api/users/:id`,
//! a template interpolation to its binding, an `env::var` read to the
//! `.env` key that defines it. The registry is a fixed ordered list; the
//! first bridge that applies and finds a target wins.

pub mod config_env;
pub mod rest_api;
pub mod template;

use trellis_core::{EdgeKind, SymbolId};

use crate::extractor::RawReference;
use crate::resolver::SymbolTable;

pub use config_env::ConfigBridge;
pub use rest_api::RestApiBridge;
pub use template::TemplateBridge;

/// What a bridge resolved a reference to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BridgeTarget {
    pub target: SymbolId,
    pub kind: EdgeKind,
    pub confidence: f64,
}

pub trait Bridge: Send + Sync {
    /// Cheap filter on the reference shape; `resolve` is only called when
    /// this returns true.
    fn applies(&self, raw: &RawReference) -> bool;

    fn resolve(&self, raw: &RawReference, table: &SymbolTable) -> Option<BridgeTarget>;
}

pub struct BridgeRegistry {
    bridges: Vec<Box<dyn Bridge>>,
}

impl Default for BridgeRegistry {
    fn default() -> Self {
        BridgeRegistry {
            bridges: vec![
                Box::new(RestApiBridge),
                Box::new(TemplateBridge),
                Box::new(ConfigBridge),
            ],
        }
    }
}

impl BridgeRegistry {
    pub fn resolve(&self, raw: &RawReference, table: &SymbolTable) -> Option<BridgeTarget> {
        self.bridges
            .iter()
            .filter(|bridge| bridge.applies(raw))
            .find_map(|bridge| bridge.resolve(raw, table))
    }
}
