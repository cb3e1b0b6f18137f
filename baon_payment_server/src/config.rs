use std::env;

use baon_common::{helpers::parse_positive_int, Secret};
use chrono::Duration;
use log::*;
use rand::{distributions::Alphanumeric, Rng};

const DEFAULT_BAON_HOST: &str = "127.0.0.1";
const DEFAULT_BAON_PORT: u16 = 8480;
const DEFAULT_CASH_PAYMENT_WINDOW_MINUTES: i64 = 15;
const DEFAULT_SWEEP_INTERVAL_SECS: i64 = 60;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// HS256 secret used to validate the bearer tokens issued by the school's auth provider.
    pub jwt_secret: Secret<String>,
    /// How long a cash order reserves its stock before the sweeper cancels it.
    pub cash_payment_window: Duration,
    /// How often the unpaid-order sweep runs.
    pub sweep_interval_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_BAON_HOST.to_string(),
            port: DEFAULT_BAON_PORT,
            database_url: String::default(),
            jwt_secret: Secret::default(),
            cash_payment_window: Duration::minutes(DEFAULT_CASH_PAYMENT_WINDOW_MINUTES),
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS as u64,
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("BAON_HOST").ok().unwrap_or_else(|| DEFAULT_BAON_HOST.into());
        let port = env::var("BAON_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!("🪛️ {s} is not a valid port for BAON_PORT. {e} Using the default, {DEFAULT_BAON_PORT}, instead.");
                    DEFAULT_BAON_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_BAON_PORT);
        let database_url = env::var("BAON_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ BAON_DATABASE_URL is not set. Please set it to the URL for the Baon database.");
            String::default()
        });
        let jwt_secret = env::var("BAON_JWT_SECRET").map(Secret::new).unwrap_or_else(|_| {
            warn!(
                "🪛️ BAON_JWT_SECRET is not set. Generating a random secret; all existing access tokens will be \
                 invalid. Set BAON_JWT_SECRET to a stable value in production."
            );
            random_secret()
        });
        let cash_payment_window = Duration::minutes(parse_positive_int(
            env::var("BAON_CASH_PAYMENT_WINDOW_MINUTES").ok(),
            DEFAULT_CASH_PAYMENT_WINDOW_MINUTES,
        ));
        let sweep_interval_secs =
            parse_positive_int(env::var("BAON_SWEEP_INTERVAL_SECS").ok(), DEFAULT_SWEEP_INTERVAL_SECS) as u64;
        Self { host, port, database_url, jwt_secret, cash_payment_window, sweep_interval_secs }
    }
}

fn random_secret() -> Secret<String> {
    let secret: String = rand::thread_rng().sample_iter(&Alphanumeric).take(48).map(char::from).collect();
    Secret::new(secret)
}
