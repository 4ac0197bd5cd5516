use std::env;

/// Application configuration parsed from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bus_type: String,
    pub nats_url: String,
    pub host: String,
    pub port: u16,
    pub outbox_topic: String,
    pub outbox_poll_interval_secs: u64,
    pub outbox_lease_limit: i64,
    pub outbox_stale_after_secs: i64,
    pub audit_batch_size: usize,
    pub audit_flush_interval_ms: u64,
    pub audit_buffer_size: usize,
    pub audit_filter_word: Option<String>,
    pub refund_window_days: i64,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let database_url =
            env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set".to_string())?;

        let bus_type = env::var("BUS_TYPE").unwrap_or_else(|_| "inmemory".to_string());

        let nats_url =
            env::var("NATS_URL").unwrap_or_else(|_| "nats://localhost:4222".to_string());

        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let port: u16 = env::var("PORT")
            .unwrap_or_else(|_| "9000".to_string())
            .parse()
            .map_err(|_| "PORT must be a valid u16".to_string())?;

        let outbox_topic =
            env::var("OUTBOX_TOPIC").unwrap_or_else(|_| "orders.audit.tasks".to_string());

        let outbox_poll_interval_secs: u64 = env::var("OUTBOX_POLL_INTERVAL_SECS")
            .unwrap_or_else(|_| "5".to_string())
            .parse()
            .map_err(|_| "OUTBOX_POLL_INTERVAL_SECS must be a valid u64".to_string())?;

        let outbox_lease_limit: i64 = env::var("OUTBOX_LEASE_LIMIT")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .map_err(|_| "OUTBOX_LEASE_LIMIT must be a valid i64".to_string())?;

        let outbox_stale_after_secs: i64 = env::var("OUTBOX_STALE_AFTER_SECS")
            .unwrap_or_else(|_| "60".to_string())
            .parse()
            .map_err(|_| "OUTBOX_STALE_AFTER_SECS must be a valid i64".to_string())?;

        let audit_batch_size: usize = env::var("AUDIT_BATCH_SIZE")
            .unwrap_or_else(|_| "5".to_string())
            .parse()
            .map_err(|_| "AUDIT_BATCH_SIZE must be a valid usize".to_string())?;

        let audit_flush_interval_ms: u64 = env::var("AUDIT_FLUSH_INTERVAL_MS")
            .unwrap_or_else(|_| "500".to_string())
            .parse()
            .map_err(|_| "AUDIT_FLUSH_INTERVAL_MS must be a valid u64".to_string())?;

        let audit_buffer_size: usize = env::var("AUDIT_BUFFER_SIZE")
            .unwrap_or_else(|_| "5".to_string())
            .parse()
            .map_err(|_| "AUDIT_BUFFER_SIZE must be a valid usize".to_string())?;

        let audit_filter_word = env::var("AUDIT_FILTER_WORD")
            .ok()
            .filter(|w| !w.is_empty());

        let refund_window_days: i64 = env::var("REFUND_WINDOW_DAYS")
            .unwrap_or_else(|_| "2".to_string())
            .parse()
            .map_err(|_| "REFUND_WINDOW_DAYS must be a valid i64".to_string())?;

        Ok(Config {
            database_url,
            bus_type,
            nats_url,
            host,
            port,
            outbox_topic,
            outbox_poll_interval_secs,
            outbox_lease_limit,
            outbox_stale_after_secs,
            audit_batch_size,
            audit_flush_interval_ms,
            audit_buffer_size,
            audit_filter_word,
            refund_window_days,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const KEYS: &[&str] = &[
        "DATABASE_URL",
        "BUS_TYPE",
        "NATS_URL",
        "HOST",
        "PORT",
        "OUTBOX_TOPIC",
        "OUTBOX_POLL_INTERVAL_SECS",
        "OUTBOX_LEASE_LIMIT",
        "OUTBOX_STALE_AFTER_SECS",
        "AUDIT_BATCH_SIZE",
        "AUDIT_FLUSH_INTERVAL_MS",
        "AUDIT_BUFFER_SIZE",
        "AUDIT_FILTER_WORD",
        "REFUND_WINDOW_DAYS",
    ];

    fn clear_env() {
        for key in KEYS {
            env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn defaults_apply_when_only_database_url_is_set() {
        clear_env();
        env::set_var("DATABASE_URL", "postgres://localhost/orders");

        let config = Config::from_env().unwrap();
        assert_eq!(config.bus_type, "inmemory");
        assert_eq!(config.port, 9000);
        assert_eq!(config.outbox_topic, "orders.audit.tasks");
        assert_eq!(config.outbox_poll_interval_secs, 5);
        assert_eq!(config.outbox_lease_limit, 10);
        assert_eq!(config.audit_batch_size, 5);
        assert_eq!(config.audit_flush_interval_ms, 500);
        assert_eq!(config.audit_buffer_size, 5);
        assert_eq!(config.audit_filter_word, None);
        assert_eq!(config.refund_window_days, 2);
    }

    #[test]
    #[serial]
    fn missing_database_url_is_an_error() {
        clear_env();
        assert!(Config::from_env().is_err());
    }

    #[test]
    #[serial]
    fn empty_filter_word_is_treated_as_unset() {
        clear_env();
        env::set_var("DATABASE_URL", "postgres://localhost/orders");
        env::set_var("AUDIT_FILTER_WORD", "");

        let config = Config::from_env().unwrap();
        assert_eq!(config.audit_filter_word, None);

        env::set_var("AUDIT_FILTER_WORD", "secret");
        let config = Config::from_env().unwrap();
        assert_eq!(config.audit_filter_word, Some("secret".to_string()));
    }

    #[test]
    #[serial]
    fn invalid_numeric_values_are_rejected() {
        clear_env();
        env::set_var("DATABASE_URL", "postgres://localhost/orders");
        env::set_var("PORT", "not-a-port");

        assert!(Config::from_env().is_err());
    }
}
