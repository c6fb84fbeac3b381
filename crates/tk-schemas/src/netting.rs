//! Settlement signature record.
//!
//! The store keeps netting as one flat JSON object: signer address to
//! signature, plus two reserved keys for the computed balances and the
//! oracle's own signature. [`NettingRecord`] splits that object into typed
//! parts on decode and joins it back on encode, so nothing downstream has to
//! subtract the reserved keys from a map length.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Reserved wire key carrying the computed final balances.
pub const FINAL_BALANCES_KEY: &str = "newBalances";
/// Reserved wire key carrying the oracle signature over the balances.
pub const ORACLE_SIGNATURE_KEY: &str = "nettingSig";

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct NettingRecord {
    /// Signer address -> settlement signature.
    pub signatures: BTreeMap<String, String>,
    pub final_balances: Option<Value>,
    pub oracle_signature: Option<String>,
}

impl NettingRecord {
    pub fn new(final_balances: Value, oracle_signature: impl Into<String>) -> Self {
        Self {
            signatures: BTreeMap::new(),
            final_balances: Some(final_balances),
            oracle_signature: Some(oracle_signature.into()),
        }
    }

    pub fn with_signature(mut self, signer: impl Into<String>, sig: impl Into<String>) -> Self {
        self.signatures.insert(signer.into(), sig.into());
        self
    }

    pub fn signer_count(&self) -> usize {
        self.signatures.len()
    }

    /// Every active seat has signed.
    pub fn is_complete(&self, active_count: usize) -> bool {
        self.signer_count() >= active_count
    }
}

/// A netting wire object that cannot be split into a [`NettingRecord`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NettingWireError {
    pub key: String,
}

impl fmt::Display for NettingWireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "netting signature for '{}' is not a string", self.key)
    }
}

impl std::error::Error for NettingWireError {}

impl TryFrom<Map<String, Value>> for NettingRecord {
    type Error = NettingWireError;

    fn try_from(map: Map<String, Value>) -> Result<Self, Self::Error> {
        let mut rec = NettingRecord::default();
        for (key, val) in map {
            match key.as_str() {
                FINAL_BALANCES_KEY => rec.final_balances = Some(val),
                ORACLE_SIGNATURE_KEY => match val {
                    Value::String(sig) => rec.oracle_signature = Some(sig),
                    Value::Null => {}
                    _ => return Err(NettingWireError { key }),
                },
                _ => match val {
                    Value::String(sig) => {
                        rec.signatures.insert(key, sig);
                    }
                    _ => return Err(NettingWireError { key }),
                },
            }
        }
        Ok(rec)
    }
}

impl From<NettingRecord> for Map<String, Value> {
    fn from(rec: NettingRecord) -> Self {
        let mut map = Map::new();
        for (signer, sig) in rec.signatures {
            map.insert(signer, Value::String(sig));
        }
        if let Some(balances) = rec.final_balances {
            map.insert(FINAL_BALANCES_KEY.to_string(), balances);
        }
        if let Some(sig) = rec.oracle_signature {
            map.insert(ORACLE_SIGNATURE_KEY.to_string(), Value::String(sig));
        }
        map
    }
}
