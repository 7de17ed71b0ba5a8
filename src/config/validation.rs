//! Config validation: unknown-key detection with Levenshtein suggestions
//! and range checks.
//!
//! Two-pass parse approach: first deserialize raw TOML into `toml::Value`,
//! walk the key tree, compare against known field names, and emit warnings
//! with "did you mean?" suggestions. Then proceed with normal serde
//! deserialization. Warnings never break existing configs.

use std::collections::HashSet;

use super::defaults::MAX_TABLE_NAME_LEN;

/// A non-fatal config warning (typo, suspicious value).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, "; did you mean '{s}'?")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

/// Returns the complete set of valid dotted key paths for PipelineConfig.
///
/// Any new field added to PipelineConfig must be added here too.
pub fn known_config_keys() -> HashSet<&'static str> {
    let keys: &[&str] = &[
        // [database]
        "database",
        "database.dbname",
        "database.user",
        "database.host",
        "database.port",
        "database.table",
        // [training]
        "training",
        "training.test_fraction",
        "training.seed",
        "training.min_rows",
        // [correction]
        "correction",
        "correction.enabled",
        "correction.threshold",
        // [output]
        "output",
        "output.dir",
        "output.plot_file",
        "output.results_file",
        "output.plot",
    ];
    keys.iter().copied().collect()
}

// ============================================================================
// TOML Key Walking
// ============================================================================

/// Recursively walks a `toml::Value` tree and collects all dotted key paths.
///
/// For example, a table `{ a = { b = 1, c = 2 } }` yields:
/// `["a", "a.b", "a.c"]`
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            if v.is_table() {
                keys.extend(walk_toml_keys(v, &path));
            }
        }
    }
    keys
}

// ============================================================================
// Levenshtein Distance
// ============================================================================

/// Compute the Levenshtein edit distance between two strings.
fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Suggest the closest known key for an unknown key, if within edit distance 3.
pub fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    let mut best: Option<(&str, usize)> = None;
    for &k in known {
        let dist = levenshtein(unknown, k);
        if dist > 3 {
            continue;
        }
        // Ties resolve alphabetically so the suggestion is stable across runs.
        let better = match best {
            None => true,
            Some((best_key, best_dist)) => dist < best_dist || (dist == best_dist && k < best_key),
        };
        if better {
            best = Some((k, dist));
        }
    }
    best.map(|(k, _)| k.to_string())
}

// ============================================================================
// Unknown Key Validation (entry point)
// ============================================================================

/// Parse a raw TOML string and return warnings for any unknown config keys.
///
/// This does NOT fail on unknown keys; it only warns. A `database.password`
/// key gets a dedicated message because secrets are read from the
/// environment only.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let value: toml::Value = match raw_toml.parse() {
        Ok(v) => v,
        Err(_) => return Vec::new(), // parse errors are handled by serde later
    };

    let known = known_config_keys();
    let mut warnings = Vec::new();

    for key in walk_toml_keys(&value, "") {
        if known.contains(key.as_str()) {
            continue;
        }
        if key == "database.password" {
            warnings.push(ValidationWarning {
                field: key,
                message: "database.password is ignored; set REVENUE_DB_PASSWORD instead"
                    .to_string(),
                suggestion: None,
            });
            continue;
        }
        let suggestion = suggest_correction(&key, &known);
        let message = format!("Unknown config key '{key}'");
        warnings.push(ValidationWarning {
            field: key,
            message,
            suggestion,
        });
    }

    warnings
}

// ============================================================================
// Table Names
// ============================================================================

/// True if `name` can be spliced into SQL as an unquoted identifier.
pub fn is_valid_table_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    name.len() <= MAX_TABLE_NAME_LEN
        && (first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

// ============================================================================
// Range Validation
// ============================================================================

/// Validate value ranges on a parsed PipelineConfig.
///
/// Returns (errors, warnings): errors are impossible values that must
/// prevent startup; warnings are suspicious but not fatal.
pub fn validate_ranges(config: &super::PipelineConfig) -> (Vec<String>, Vec<ValidationWarning>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let t = &config.training;
    if !(t.test_fraction > 0.0 && t.test_fraction < 1.0) {
        errors.push(format!(
            "training.test_fraction = {} must be strictly between 0 and 1",
            t.test_fraction
        ));
    } else if t.test_fraction > 0.5 {
        warnings.push(ValidationWarning {
            field: "training.test_fraction".to_string(),
            message: format!(
                "training.test_fraction = {:.2} holds out more rows than it trains on",
                t.test_fraction
            ),
            suggestion: None,
        });
    }

    if t.min_rows < 2 {
        errors.push(format!(
            "training.min_rows = {} must be >= 2 (one training and one test row)",
            t.min_rows
        ));
    }

    let threshold = config.correction.threshold;
    if !threshold.is_finite() || threshold <= 0.0 {
        errors.push(format!(
            "correction.threshold = {threshold} must be a finite value > 0"
        ));
    } else if threshold >= 1.0 {
        warnings.push(ValidationWarning {
            field: "correction.threshold".to_string(),
            message: format!(
                "correction.threshold = {threshold:.2} only corrects values off by more than 100%"
            ),
            suggestion: None,
        });
    }

    if config.database.port == 0 {
        errors.push("database.port must be non-zero".to_string());
    }

    if !is_valid_table_name(&config.database.table) {
        errors.push(format!(
            "database.table = '{}' is not a plain SQL identifier ([A-Za-z_][A-Za-z0-9_]*, max {} chars)",
            config.database.table, MAX_TABLE_NAME_LEN
        ));
    }

    if config.output.plot_file.is_empty() || config.output.results_file.is_empty() {
        errors.push("output.plot_file and output.results_file must not be empty".to_string());
    }

    (errors, warnings)
}

// ============================================================================
// Tests
// ============================================================================
