use anyhow::{Result, anyhow};
use config::{Case, Config};

#[derive(Clone, Debug)]
pub struct Settings {
    pub seed_hex: String,
}

impl Settings {
    /// Resolve the key seed: an explicit value wins over `SEED_HEX` from the environment or `.env`.
    pub fn load(seed_override: Option<&str>) -> Result<Self> {
        if let Some(seed_hex) = seed_override.filter(|seed| !seed.trim().is_empty()) {
            return Ok(Self {
                seed_hex: seed_hex.trim().to_string(),
            });
        }

        let cfg = Config::builder()
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .convert_case(Case::ScreamingSnake),
            )
            .build()?;

        let seed_hex = cfg
            .get_string("SEED_HEX")
            .map_err(|_| anyhow!("SEED_HEX not set in environment or .env"))?;

        Ok(Self { seed_hex })
    }
}
