use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ServiceConfig {
    pub bind_addr: String,
    pub default_search_radius_km: f64,
    pub route_buffer_km: f64,
    /// Synthetic hazards generated at startup, 0 for an empty store
    pub seed_hazards: usize,
    /// Fixed seed for the generator and simulators; entropy when absent
    pub rng_seed: Option<u64>,
    pub sim_tick_ms: u64,
    pub sim_max_ticks: u32,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:5000".to_string(),
            default_search_radius_km: 1.0,
            route_buffer_km: 0.5,
            seed_hazards: 0,
            rng_seed: None,
            sim_tick_ms: 1000,
            sim_max_ticks: 600,
        }
    }
}

impl ServiceConfig {
    pub fn load(path: &str) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read config at {}", path))?;
        serde_json::from_str(&data).with_context(|| format!("invalid config JSON in {}", path))
    }

    /// `CONFIG_PATH` file (or defaults), then env overrides.
    pub fn from_env() -> Result<Self> {
        let mut cfg = match std::env::var("CONFIG_PATH") {
            Ok(path) => Self::load(&path)?,
            Err(_) => Self::default(),
        };
        cfg.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(cfg)
    }

    fn apply_overrides<F>(&mut self, get: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = get("BIND_ADDR") {
            self.bind_addr = addr;
        }
        if let Some(port) = get("PORT") {
            let port: u16 = port.parse().with_context(|| format!("PORT={} is not a port", port))?;
            let host = self
                .bind_addr
                .rsplit_once(':')
                .map_or("0.0.0.0", |(host, _)| host);
            self.bind_addr = format!("{}:{}", host, port);
        }
        if let Some(n) = get("SEED_HAZARDS") {
            self.seed_hazards = n
                .parse()
                .with_context(|| format!("SEED_HAZARDS={} is not a count", n))?;
        }
        if let Some(seed) = get("RNG_SEED") {
            self.rng_seed = Some(
                seed.parse()
                    .with_context(|| format!("RNG_SEED={} is not a u64", seed))?,
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let cfg: ServiceConfig =
            serde_json::from_str(r#"{"seed_hazards": 250, "rng_seed": 7}"#).unwrap();
        assert_eq!(cfg.seed_hazards, 250);
        assert_eq!(cfg.rng_seed, Some(7));
        assert_eq!(cfg.bind_addr, "0.0.0.0:5000");
        assert_eq!(cfg.default_search_radius_km, 1.0);
        assert_eq!(cfg.route_buffer_km, 0.5);
    }

    #[test]
    fn test_env_overrides() {
        let mut cfg = ServiceConfig::default();
        cfg.apply_overrides(env(&[("PORT", "8080"), ("SEED_HAZARDS", "40")]))
            .unwrap();
        assert_eq!(cfg.bind_addr, "0.0.0.0:8080");
        assert_eq!(cfg.seed_hazards, 40);

        let mut cfg = ServiceConfig::default();
        cfg.apply_overrides(env(&[("BIND_ADDR", "127.0.0.1:9000"), ("RNG_SEED", "3")]))
            .unwrap();
        assert_eq!(cfg.bind_addr, "127.0.0.1:9000");
        assert_eq!(cfg.rng_seed, Some(3));
    }

    #[test]
    fn test_bad_override_is_an_error() {
        let mut cfg = ServiceConfig::default();
        assert!(cfg.apply_overrides(env(&[("PORT", "http")])).is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = ServiceConfig::load("does/not/exist.json").unwrap_err();
        assert!(err.to_string().contains("does/not/exist.json"));
    }
}
