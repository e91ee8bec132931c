use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::routing::normalize_number;

use super::types::Config;

impl Config {
    /// Load configuration from a YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        debug!(path = %path.display(), "loading configuration");

        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        Self::from_yaml(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Parse configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)
            .context("failed to parse YAML configuration")?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.carrier.shared_number.trim().is_empty() {
            anyhow::bail!("carrier.shared_number must be set");
        }
        if normalize_number(&self.carrier.shared_number).is_none() {
            anyhow::bail!(
                "carrier.shared_number is not a phone number: {}",
                self.carrier.shared_number
            );
        }
        if self.carrier.webhook_base_url.trim().is_empty() {
            anyhow::bail!("carrier.webhook_base_url must be set");
        }

        // Actor ids must be positive and unique per kind
        for (kind, entries) in [
            ("operator", &self.directory.operators),
            ("sales rep", &self.directory.sales_reps),
        ] {
            let mut ids = HashSet::new();
            for entry in entries {
                if entry.id == 0 {
                    anyhow::bail!("{} id must be positive: {}", kind, entry.name);
                }
                if !ids.insert(entry.id) {
                    anyhow::bail!("duplicate {} id: {}", kind, entry.id);
                }
            }
        }

        // Assigned numbers route inbound calls: exactly one actor per number
        let mut assigned = HashSet::new();
        for entry in self
            .directory
            .operators
            .iter()
            .chain(self.directory.sales_reps.iter())
        {
            if let Some(number) = entry.phone_number.as_deref() {
                let Some(normalized) = normalize_number(number) else {
                    anyhow::bail!(
                        "assigned phone number for {} is not a phone number: {}",
                        entry.name,
                        number
                    );
                };
                if !assigned.insert(normalized) {
                    anyhow::bail!("phone number assigned to more than one actor: {}", number);
                }
            }
        }

        info!("configuration validated successfully");
        Ok(())
    }
}
