//! Environment reads to the config keys that define them.

use trellis_core::{EdgeKind, SymbolKind};

use super::{Bridge, BridgeTarget};
use crate::extractor::{RawReference, RawReferenceKind};
use crate::resolver::SymbolTable;

pub struct ConfigBridge;

impl Bridge for ConfigBridge {
    fn applies(&self, raw: &RawReference) -> bool {
        raw.kind == RawReferenceKind::EnvRead
    }

    fn resolve(&self, raw: &RawReference, table: &SymbolTable) -> Option<BridgeTarget> {
        // Exact dotenv key.
        let env_vars = table.of_kind(SymbolKind::EnvVariable);
        let exact: Vec<_> = env_vars.iter().filter(|v| v.name == raw.name).collect();
        if let [var] = exact.as_slice() {
            return Some(BridgeTarget {
                target: var.id,
                kind: EdgeKind::ConfigBinding,
                confidence: 0.7,
            });
        }
        if exact.len() >= 2 {
            return None;
        }

        // `DATABASE_URL` falls through to the YAML key `database.url`.
        let dotted = raw.name.to_ascii_lowercase().replace('_', ".");
        let config_keys = table.of_kind(SymbolKind::ConfigKey);
        let matches: Vec<_> = config_keys
            .iter()
            .filter(|k| k.qualified_name == dotted)
            .collect();
        if let [key] = matches.as_slice() {
            return Some(BridgeTarget {
                target: key.id,
                kind: EdgeKind::ConfigBinding,
                confidence: 0.6,
            });
        }
        None
    }
}
