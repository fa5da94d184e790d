use std::{env, fmt::Display, str::FromStr, time::Duration as StdDuration};

use chrono::Duration;
use log::*;
use rand::{distributions::Alphanumeric, thread_rng, Rng};
use takeout_common::{parse_boolean_flag, Secret};
use takeout_engine::order_objects::PaymentMode;
use wxpay_tools::WxPayConfig;

const DEFAULT_TKO_HOST: &str = "127.0.0.1";
const DEFAULT_TKO_PORT: u16 = 8360;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/takeout.db";
const DEFAULT_MAX_CONNECTIONS: u32 = 25;
const DEFAULT_USER_HEADER: &str = "authentication";
const DEFAULT_ADMIN_HEADER: &str = "token";
const DEFAULT_TOKEN_TTL: Duration = Duration::minutes(120);
const DEFAULT_PENDING_PAYMENT_TIMEOUT: Duration = Duration::minutes(15);
const DEFAULT_STUCK_DELIVERY_TIMEOUT: Duration = Duration::minutes(60);
const DEFAULT_TIMEOUT_SWEEP_INTERVAL: StdDuration = StdDuration::from_secs(60);
const DEFAULT_DELIVERY_SWEEP_HOUR: u32 = 1;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub max_connections: u32,
    /// Apply outstanding schema migrations before the server starts
    pub run_migrations: bool,
    pub auth: AuthConfig,
    pub payment_mode: PaymentMode,
    pub sweeps: SweepConfig,
    pub wxpay: WxPayConfig,
}

#[derive(Clone, Debug)]
pub struct SweepConfig {
    /// `PendingPayment` orders older than this are cancelled.
    pub pending_payment_timeout: Duration,
    /// `DeliveryInProgress` orders older than this are completed.
    pub stuck_delivery_timeout: Duration,
    pub timeout_sweep_interval: StdDuration,
    /// The UTC hour (0-23) at which the daily delivery sweep runs
    pub delivery_sweep_hour: u32,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            pending_payment_timeout: DEFAULT_PENDING_PAYMENT_TIMEOUT,
            stuck_delivery_timeout: DEFAULT_STUCK_DELIVERY_TIMEOUT,
            timeout_sweep_interval: DEFAULT_TIMEOUT_SWEEP_INTERVAL,
            delivery_sweep_hour: DEFAULT_DELIVERY_SWEEP_HOUR,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_TKO_HOST.to_string(),
            port: DEFAULT_TKO_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            run_migrations: true,
            auth: AuthConfig::default(),
            payment_mode: PaymentMode::default(),
            sweeps: SweepConfig::default(),
            wxpay: WxPayConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("TKO_HOST").ok().unwrap_or_else(|| DEFAULT_TKO_HOST.into());
        let port = parse_env("TKO_PORT", DEFAULT_TKO_PORT);
        let database_url = env::var("TKO_DATABASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ TKO_DATABASE_URL is not set. Using {DEFAULT_DATABASE_URL}.");
            DEFAULT_DATABASE_URL.to_string()
        });
        let max_connections = parse_env("TKO_DB_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS);
        let run_migrations = parse_boolean_flag(env::var("TKO_RUN_MIGRATIONS").ok(), true);
        let auth = AuthConfig::from_env_or_default();
        let payment_mode = payment_mode_from_env();
        let sweeps = SweepConfig::from_env_or_default();
        let wxpay = match payment_mode {
            PaymentMode::Gateway => WxPayConfig::new_from_env_or_default(),
            PaymentMode::Bypass => {
                info!("🪛️ The payment gateway is bypassed. Orders are marked as paid as soon as payment is requested.");
                WxPayConfig::default()
            },
        };
        Self { host, port, database_url, max_connections, run_migrations, auth, payment_mode, sweeps, wxpay }
    }
}

impl SweepConfig {
    pub fn from_env_or_default() -> Self {
        let pending_payment_timeout = Duration::minutes(parse_env(
            "TKO_PENDING_PAYMENT_TIMEOUT_MINS",
            DEFAULT_PENDING_PAYMENT_TIMEOUT.num_minutes(),
        ));
        let stuck_delivery_timeout = Duration::minutes(parse_env(
            "TKO_STUCK_DELIVERY_TIMEOUT_MINS",
            DEFAULT_STUCK_DELIVERY_TIMEOUT.num_minutes(),
        ));
        let timeout_sweep_interval = StdDuration::from_secs(
            parse_env("TKO_TIMEOUT_SWEEP_INTERVAL_SECS", DEFAULT_TIMEOUT_SWEEP_INTERVAL.as_secs()).max(1),
        );
        let mut delivery_sweep_hour = parse_env("TKO_DELIVERY_SWEEP_HOUR", DEFAULT_DELIVERY_SWEEP_HOUR);
        if delivery_sweep_hour > 23 {
            warn!("🪛️ TKO_DELIVERY_SWEEP_HOUR must be between 0 and 23. Using {DEFAULT_DELIVERY_SWEEP_HOUR}.");
            delivery_sweep_hour = DEFAULT_DELIVERY_SWEEP_HOUR;
        }
        Self { pending_payment_timeout, stuck_delivery_timeout, timeout_sweep_interval, delivery_sweep_hour }
    }
}

fn payment_mode_from_env() -> PaymentMode {
    match env::var("TKO_PAYMENT_MODE").map(|s| s.trim().to_lowercase()) {
        Ok(s) if s == "gateway" => PaymentMode::Gateway,
        Ok(s) if s == "bypass" => PaymentMode::Bypass,
        Ok(s) => {
            warn!("🪛️ {s} is not a valid value for TKO_PAYMENT_MODE. Expected 'bypass' or 'gateway'. Using 'bypass'.");
            PaymentMode::Bypass
        },
        Err(_) => {
            info!("🪛️ TKO_PAYMENT_MODE is not set. Using 'bypass'.");
            PaymentMode::Bypass
        },
    }
}

/// Reads and parses `name`, falling back to `default` if it is missing or invalid.
fn parse_env<T>(name: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match env::var(name) {
        Ok(s) => s.trim().parse::<T>().unwrap_or_else(|e| {
            warn!("🪛️ {s} is not a valid value for {name}. {e} Using the default, {default}, instead.");
            default
        }),
        Err(_) => {
            debug!("🪛️ {name} is not set. Using the default, {default}.");
            default
        },
    }
}

//-------------------------------------------------  AuthConfig  -------------------------------------------------------
#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// The HS256 key that access tokens are signed with
    pub jwt_secret: Secret<String>,
    /// The request header that carries customer tokens
    pub user_header: String,
    /// The request header that carries employee tokens
    pub admin_header: String,
    pub token_ttl: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        warn!(
            "🚨️🚨️🚨️ The JWT secret has not been set. I'm using a random value for this session. Every token issued \
             will stop working when the server restarts. Set TKO_JWT_SECRET to fix this. 🚨️🚨️🚨️"
        );
        let secret = thread_rng().sample_iter(&Alphanumeric).take(48).map(char::from).collect::<String>();
        Self {
            jwt_secret: Secret::new(secret),
            user_header: DEFAULT_USER_HEADER.to_string(),
            admin_header: DEFAULT_ADMIN_HEADER.to_string(),
            token_ttl: DEFAULT_TOKEN_TTL,
        }
    }
}

impl AuthConfig {
    pub fn new<S: Into<String>>(jwt_secret: S) -> Self {
        Self {
            jwt_secret: Secret::new(jwt_secret.into()),
            user_header: DEFAULT_USER_HEADER.to_string(),
            admin_header: DEFAULT_ADMIN_HEADER.to_string(),
            token_ttl: DEFAULT_TOKEN_TTL,
        }
    }

    pub fn from_env_or_default() -> Self {
        let mut config = match env::var("TKO_JWT_SECRET") {
            Ok(secret) if !secret.trim().is_empty() => Self::new(secret.trim()),
            _ => Self::default(),
        };
        if let Ok(header) = env::var("TKO_JWT_USER_HEADER") {
            config.user_header = header.trim().to_lowercase();
        }
        if let Ok(header) = env::var("TKO_JWT_ADMIN_HEADER") {
            config.admin_header = header.trim().to_lowercase();
        }
        config.token_ttl = Duration::minutes(parse_env("TKO_JWT_TTL_MINS", DEFAULT_TOKEN_TTL.num_minutes()));
        config
    }
}
