pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8004;
pub const DEFAULT_SERVICE_NAME: &str = "process";
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_CALL_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_STATUS_QUEUE_CAPACITY: usize = 64;
pub const DEFAULT_STEP_INTERVAL_MS: u64 = 500;

pub const DEFAULT_CONFIG_LOCATIONS: [&str; 3] =
    ["mcs.toml", "config/mcs.toml", "config/process.toml"];
