//! Operator vars file
//!
//! Hub and cloud credentials live in a YAML vars file checked by the
//! operator into the automation project (`vars/user_vars.yml`). The
//! server never defaults a missing credential; it reports exactly which
//! required fields are absent or empty.

use std::collections::HashMap;
use std::path::Path;

use serde::Serialize;
use thiserror::Error;

/// Required fields and their human descriptions, in display order.
pub const REQUIRED_FIELDS: &[(&str, &str)] = &[
    ("OCP_HUB_API_URL", "OpenShift Hub API URL"),
    ("OCP_HUB_CLUSTER_USER", "OpenShift Hub Username"),
    ("OCP_HUB_CLUSTER_PASSWORD", "OpenShift Hub Password"),
    ("AWS_REGION", "AWS Region"),
    ("AWS_ACCESS_KEY_ID", "AWS Access Key ID"),
    ("AWS_SECRET_ACCESS_KEY", "AWS Secret Access Key"),
    ("OCM_CLIENT_ID", "Cluster Manager Client ID"),
    ("OCM_CLIENT_SECRET", "Cluster Manager Client Secret"),
];

#[derive(Debug, Error)]
pub enum VarsError {
    #[error("vars file not found: {0}")]
    Missing(String),
    #[error("invalid YAML in vars file: {0}")]
    InvalidYaml(String),
    #[error("failed reading vars file: {0}")]
    Io(#[from] std::io::Error),
}

/// Parsed vars file contents.
#[derive(Debug)]
pub struct UserVars {
    values: HashMap<String, serde_yaml::Value>,
}

impl UserVars {
    pub fn load(path: &Path) -> Result<Self, VarsError> {
        if !path.exists() {
            return Err(VarsError::Missing(path.display().to_string()));
        }
        let raw = std::fs::read_to_string(path)?;
        let values: HashMap<String, serde_yaml::Value> = match raw.trim().is_empty() {
            true => HashMap::new(),
            false => serde_yaml::from_str(&raw).map_err(|e| VarsError::InvalidYaml(e.to_string()))?,
        };
        Ok(Self { values })
    }

    /// A field's trimmed string value; None when absent or empty.
    pub fn get_str(&self, key: &str) -> Option<String> {
        let value = self.values.get(key)?;
        let rendered = match value {
            serde_yaml::Value::String(s) => s.clone(),
            serde_yaml::Value::Number(n) => n.to_string(),
            serde_yaml::Value::Bool(b) => b.to_string(),
            _ => return None,
        };
        let trimmed = rendered.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }

    /// Completeness report over [`REQUIRED_FIELDS`].
    pub fn report(&self) -> ConfigReport {
        let mut configured = Vec::new();
        let mut missing = Vec::new();
        let mut empty = Vec::new();

        for (field, description) in REQUIRED_FIELDS {
            let entry = FieldEntry {
                field: (*field).to_string(),
                description: (*description).to_string(),
            };
            match self.values.get(*field) {
                None => missing.push(entry),
                Some(_) if self.get_str(field).is_none() => empty.push(entry),
                Some(_) => configured.push(entry),
            }
        }

        let total_required = REQUIRED_FIELDS.len();
        let total_configured = configured.len();
        let (status, message) = if total_configured == total_required {
            (
                "fully_configured",
                "All required credentials are configured".to_string(),
            )
        } else if total_configured > 0 {
            (
                "partially_configured",
                format!("{total_configured}/{total_required} credentials configured"),
            )
        } else {
            (
                "not_configured",
                "No credentials have been configured".to_string(),
            )
        };

        ConfigReport {
            configured: total_configured == total_required,
            status: status.to_string(),
            message,
            total_required,
            total_configured,
            configured_fields: configured,
            missing_fields: missing,
            empty_fields: empty,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FieldEntry {
    pub field: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfigReport {
    pub configured: bool,
    pub status: String,
    pub message: String,
    pub total_required: usize,
    pub total_configured: usize,
    pub configured_fields: Vec<FieldEntry>,
    pub missing_fields: Vec<FieldEntry>,
    pub empty_fields: Vec<FieldEntry>,
}
