//! # File I/O Module
//!
//! Rule-set file operations:
//! - **Atomic saves**: write to `.tmp`, sync, rename to prevent corruption
//! - **Version validation**: ensure schema compatibility on load
//! - **Plain rule files**: one `NAME = EXPRESSION` per line
//!
//! ## Example
//!
//! ```rust,no_run
//! use combo_core::file_io::{load_rule_set, save_rule_set};
//! use combo_core::rule_set::RuleSet;
//! use std::path::Path;
//!
//! let rule_set = RuleSet::from_rule_text("ULS = 1.35*g + 1.5*q");
//! let path = Path::new("combinations.json");
//!
//! save_rule_set(&rule_set, path).unwrap();
//! let loaded = load_rule_set(path).unwrap();
//! assert_eq!(loaded.rules, rule_set.rules);
//! ```

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::errors::{ComboError, ComboResult};
use crate::rule_set::{RuleSet, SCHEMA_VERSION};

fn tmp_path_for(path: &Path) -> PathBuf {
    let extension = path
        .extension()
        .map(|e| format!("{}.tmp", e.to_string_lossy()))
        .unwrap_or_else(|| "tmp".to_string());
    path.with_extension(extension)
}

/// Save a rule set with atomic write semantics.
///
/// The save process:
/// 1. Serialize to pretty JSON
/// 2. Write to a temporary file next to the target
/// 3. Sync to disk (fsync)
/// 4. Rename over the target (atomic on most filesystems)
pub fn save_rule_set(rule_set: &RuleSet, path: &Path) -> ComboResult<()> {
    let json = serde_json::to_string_pretty(rule_set).map_err(|e| ComboError::serialization(e.to_string()))?;

    let tmp_path = tmp_path_for(path);

    let mut tmp_file = File::create(&tmp_path).map_err(|e| {
        ComboError::file_error("create temp file", tmp_path.display().to_string(), e.to_string())
    })?;

    tmp_file.write_all(json.as_bytes()).map_err(|e| {
        ComboError::file_error("write temp file", tmp_path.display().to_string(), e.to_string())
    })?;

    tmp_file.sync_all().map_err(|e| {
        ComboError::file_error("sync temp file", tmp_path.display().to_string(), e.to_string())
    })?;

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        ComboError::file_error("rename to final", path.display().to_string(), e.to_string())
    })?;

    debug!(path = %path.display(), rules = rule_set.rules.len(), "saved rule set");
    Ok(())
}

/// Load a rule-set document.
///
/// # Returns
///
/// * `Ok(RuleSet)` - Successfully loaded
/// * `Err(ComboError::VersionMismatch)` - File version is incompatible
/// * `Err(ComboError::SerializationError)` - Invalid JSON
/// * `Err(ComboError::FileError)` - I/O error
pub fn load_rule_set(path: &Path) -> ComboResult<RuleSet> {
    let contents = read_file(path)?;

    let rule_set: RuleSet = serde_json::from_str(&contents)
        .map_err(|e| ComboError::serialization(format!("Invalid JSON in {}: {}", path.display(), e)))?;

    validate_version(&rule_set.meta.version)?;

    debug!(path = %path.display(), rules = rule_set.rules.len(), "loaded rule set");
    Ok(rule_set)
}

/// Read a plain-text rule file into lines.
///
/// Comment and blank lines are kept; the parser skips them.
pub fn read_rule_lines(path: &Path) -> ComboResult<Vec<String>> {
    let contents = read_file(path)?;
    Ok(contents.lines().map(str::to_string).collect())
}

fn read_file(path: &Path) -> ComboResult<String> {
    fs::read_to_string(path).map_err(|e| ComboError::file_error("read", path.display().to_string(), e.to_string()))
}

/// Validate that a file version is compatible with the current schema.
fn validate_version(file_version: &str) -> ComboResult<()> {
    let mismatch = || ComboError::VersionMismatch {
        file_version: file_version.to_string(),
        expected_version: SCHEMA_VERSION.to_string(),
    };

    let parse = |version: &str| -> Option<Vec<u32>> { version.split('.').map(|p| p.parse::<u32>().ok()).collect() };
    let (Some(file_parts), Some(current_parts)) = (parse(file_version), parse(SCHEMA_VERSION)) else {
        return Err(mismatch());
    };
    if file_parts.is_empty() || current_parts.is_empty() {
        return Err(mismatch());
    }

    // Major version must match
    if file_parts[0] != current_parts[0] {
        return Err(mismatch());
    }

    // For 0.x versions, a newer minor may carry breaking changes
    if current_parts[0] == 0 && file_parts.len() > 1 && current_parts.len() > 1 && file_parts[1] > current_parts[1] {
        return Err(mismatch());
    }

    Ok(())
}
