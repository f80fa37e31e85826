//! Loads a contract ABI from any of the three JSON container shapes
//! toolchains commonly emit it in.
//!
//! `abi_adapter.py` detected the shape by probing `isinstance` and
//! dict-key membership at each branch — effectively duck typing. Here
//! the three shapes are an explicit tagged union decoded by serde's
//! untagged enum support, so an unrecognised shape is a deserialization
//! error instead of falling through every `isinstance` check.

use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{OracleError, Result};

/// The three ABI container shapes this loader recognises.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AbiContainer {
    /// A bare JSON array: the ABI itself.
    Raw(Vec<Value>),
    /// An object carrying the ABI under an `abi` key — Foundry's
    /// `{"abi": [...], "bytecode": {...}, ...}` and Hardhat/Truffle's
    /// `{"contractName": ..., "abi": [...], ...}` both match this arm;
    /// neither shape needs special-casing once only `abi` is read.
    Wrapped { abi: Vec<Value> },
}

/// Loads and returns the raw ABI array from `path`, accepting a bare
/// array, a Foundry artifact, or a Hardhat/Truffle artifact.
pub async fn load_abi_from_file(path: &Path) -> Result<Vec<Value>> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| OracleError::Config(format!("cannot read ABI file {}: {e}", path.display())))?;
    let container: AbiContainer = serde_json::from_slice(&bytes).map_err(|e| {
        OracleError::Config(format!(
            "unrecognized ABI format in {}: {e}",
            path.display()
        ))
    })?;
    Ok(match container {
        AbiContainer::Raw(abi) => abi,
        AbiContainer::Wrapped { abi } => abi,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn loads_bare_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("abi.json");
        tokio::fs::write(&path, r#"[{"type":"function","name":"foo"}]"#)
            .await
            .unwrap();
        let abi = load_abi_from_file(&path).await.unwrap();
        assert_eq!(abi.len(), 1);
    }

    #[tokio::test]
    async fn loads_foundry_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("abi.json");
        tokio::fs::write(
            &path,
            r#"{"abi": [{"type":"function","name":"foo"}], "bytecode": "0x"}"#,
        )
        .await
        .unwrap();
        let abi = load_abi_from_file(&path).await.unwrap();
        assert_eq!(abi.len(), 1);
    }

    #[tokio::test]
    async fn loads_hardhat_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("abi.json");
        tokio::fs::write(
            &path,
            r#"{"contractName": "BondOracle", "abi": [{"type":"function","name":"foo"}]}"#,
        )
        .await
        .unwrap();
        let abi = load_abi_from_file(&path).await.unwrap();
        assert_eq!(abi.len(), 1);
    }

    #[tokio::test]
    async fn rejects_unrecognized_shape() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("abi.json");
        tokio::fs::write(&path, r#"{"foo": "bar"}"#).await.unwrap();
        assert!(load_abi_from_file(&path).await.is_err());
    }
}
