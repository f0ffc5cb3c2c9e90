//! Curriculum loading.
//!
//! A curriculum file lists units, each with its ordered tasks, pass rule and
//! advance route. TOML and JSON are accepted, chosen by file extension.
//! Every unit is validated on load; a file with one bad unit is rejected.

use std::collections::HashSet;
use std::path::Path;

use mastery_store::UnitKey;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::domain::{DomainError, Result, Unit, UnitConfig};

/// Curriculum as written on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CurriculumFile {
    #[serde(default)]
    pub name: Option<String>,
    pub units: Vec<UnitConfig>,
}

/// A validated set of units.
#[derive(Debug, Clone)]
pub struct Curriculum {
    name: Option<String>,
    units: Vec<Unit>,
    digest: String,
}

impl Curriculum {
    /// Load and validate a `.toml` or `.json` curriculum file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml_str(&text),
            Some("json") => Self::from_json_str(&text),
            other => Err(DomainError::UnsupportedFormat(
                other.unwrap_or("<none>").to_string(),
            )),
        }
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        Self::build(toml::from_str(text)?)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        Self::build(serde_json::from_str(text)?)
    }

    /// Validate every unit and reject duplicate unit keys.
    pub fn build(file: CurriculumFile) -> Result<Self> {
        let digest = {
            let canonical = serde_json::to_vec(&file)?;
            hex::encode(Sha256::digest(&canonical))
        };

        let mut seen = HashSet::new();
        let mut units = Vec::with_capacity(file.units.len());
        for config in file.units {
            let unit = config.build()?;
            if !seen.insert(unit.key().clone()) {
                return Err(DomainError::InvalidUnit {
                    unit: unit.key().to_string(),
                    reason: "unit defined twice".to_string(),
                });
            }
            units.push(unit);
        }

        Ok(Self {
            name: file.name,
            units,
            digest,
        })
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    pub fn unit(&self, key: &UnitKey) -> Result<&Unit> {
        self.units
            .iter()
            .find(|u| u.key() == key)
            .ok_or_else(|| DomainError::UnitNotFound(key.to_string()))
    }

    /// SHA-256 of the canonical JSON form, for tagging logs and records.
    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// Short form (first 12 hex chars).
    pub fn short_digest(&self) -> &str {
        &self.digest[..12.min(self.digest.len())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        name = "Marketing vocabulary"

        [[units]]
        phase = "phase4"
        step = "step2"
        level = "C1"
        pass_threshold = 16
        advance_route = "/phase4/step3/C1"

        [[units.tasks]]
        id = "taskA"
        order = 0
        max_score = 4

        [[units.tasks]]
        id = "taskB"
        order = 1
        max_score = 8

        [[units.tasks]]
        id = "taskC"
        order = 2
        max_score = 6
    "#;

    #[test]
    fn test_parse_toml() {
        let curriculum = Curriculum::from_toml_str(SAMPLE).unwrap();
        assert_eq!(curriculum.name(), Some("Marketing vocabulary"));
        let key = UnitKey::new("phase4", "step2", "C1").unwrap();
        let unit = curriculum.unit(&key).unwrap();
        assert_eq!(unit.policy().max_total(), 18);
        assert_eq!(curriculum.digest().len(), 64);
    }

    #[test]
    fn test_unknown_unit() {
        let curriculum = Curriculum::from_toml_str(SAMPLE).unwrap();
        let key = UnitKey::new("phase9", "step9", "C1").unwrap();
        assert!(matches!(
            curriculum.unit(&key),
            Err(DomainError::UnitNotFound(_))
        ));
    }

    #[test]
    fn test_digest_is_stable() {
        let a = Curriculum::from_toml_str(SAMPLE).unwrap();
        let b = Curriculum::from_toml_str(SAMPLE).unwrap();
        assert_eq!(a.digest(), b.digest());
        assert_eq!(a.short_digest().len(), 12);
    }
}
