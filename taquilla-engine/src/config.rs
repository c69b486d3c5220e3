use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub business_rules: BusinessRules,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct BusinessRules {
    /// Seconds a reservation hold stays alive before seats are released.
    #[serde(default = "default_hold_seconds")]
    pub hold_seconds: u64,
    /// Identical concurrent requests per logical search; the first success
    /// wins and the rest are discarded.
    #[serde(default = "default_search_redundancy")]
    pub search_redundancy: usize,
    /// Upper bound on tickets per order, matching the server's own cap.
    #[serde(default = "default_max_tickets")]
    pub max_tickets: u32,
    /// Category names in server index order.
    #[serde(default = "default_categories")]
    pub categories: Vec<String>,
}

fn default_hold_seconds() -> u64 {
    120
}

fn default_search_redundancy() -> usize {
    3
}

fn default_max_tickets() -> u32 {
    10
}

fn default_categories() -> Vec<String> {
    ["Platea Este", "Platea Oeste", "General Norte", "General Sur"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Default for BusinessRules {
    fn default() -> Self {
        Self {
            hold_seconds: default_hold_seconds(),
            search_redundancy: default_search_redundancy(),
            max_tickets: default_max_tickets(),
            categories: default_categories(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            .add_source(config::File::with_name("config/local").required(false))
            // Eg. `TAQUILLA__SERVER__PORT=7879` overrides the file value.
            .add_source(config::Environment::with_prefix("TAQUILLA").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn business_rule_defaults_match_the_reservation_contract() {
        let rules = BusinessRules::default();
        assert_eq!(rules.hold_seconds, 120);
        assert_eq!(rules.search_redundancy, 3);
        assert_eq!(rules.max_tickets, 10);
        assert_eq!(rules.categories.len(), 4);
        assert_eq!(rules.categories[0], "Platea Este");
    }
}
