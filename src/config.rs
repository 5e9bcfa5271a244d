use std::env;
use std::fmt::Display;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::str::FromStr;

use tracing::{info, warn};

use crate::chargeable::{ChargeableConfig, TransportMode};
use crate::engine::PackingConfig;
use crate::optimizer::LoadingConfig;
use crate::utilization::UtilizationConfig;

/// Complete application configuration, loaded from environment variables or default values.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub loading: LoadingConfig,
}

impl AppConfig {
    /// Creates a configuration from the currently available environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(env_string)
    }

    /// Creates a configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            api: ApiConfig::from_lookup(&lookup),
            loading: LoadingConfig {
                packing: packing_from_lookup(&lookup),
                chargeable: chargeable_from_lookup(&lookup),
                utilization: utilization_from_lookup(&lookup),
            },
        }
    }
}

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    bind_ip: IpAddr,
    display_host: String,
    port: u16,
}

impl ApiConfig {
    const DEFAULT_HOST: &'static str = "0.0.0.0";
    const DEFAULT_BIND_IP: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);
    const DEFAULT_PORT: u16 = 8080;

    const HOST_VAR: &'static str = "LOAD_PLANNER_API_HOST";
    const PORT_VAR: &'static str = "LOAD_PLANNER_API_PORT";

    fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Self {
        let host_value = lookup(Self::HOST_VAR).unwrap_or_else(|| Self::DEFAULT_HOST.to_string());
        let (bind_ip, display_host) = match host_value.parse::<IpAddr>() {
            Ok(ip) => (ip, host_value),
            Err(err) => {
                warn!(
                    "Could not parse {} ('{}'): {}. Using {}.",
                    Self::HOST_VAR,
                    host_value,
                    err,
                    Self::DEFAULT_HOST
                );
                (Self::DEFAULT_BIND_IP, Self::DEFAULT_HOST.to_string())
            }
        };

        let port = match lookup(Self::PORT_VAR) {
            Some(raw) => match raw.parse::<u16>() {
                Ok(value) if value != 0 => value,
                Ok(_) => {
                    warn!("{} must not be 0. Using {}.", Self::PORT_VAR, Self::DEFAULT_PORT);
                    Self::DEFAULT_PORT
                }
                Err(err) => {
                    warn!(
                        "Could not parse {} ('{}'): {}. Using {}.",
                        Self::PORT_VAR,
                        raw,
                        err,
                        Self::DEFAULT_PORT
                    );
                    Self::DEFAULT_PORT
                }
            },
            None => Self::DEFAULT_PORT,
        };

        Self {
            bind_ip,
            display_host,
            port,
        }
    }

    /// Socket address to bind the server to.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_ip, self.port)
    }

    /// Visible hostname for logging and hints.
    pub fn display_host(&self) -> &str {
        &self.display_host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Indicates whether binding to all interfaces.
    pub fn binds_to_all_interfaces(&self) -> bool {
        match self.bind_ip {
            IpAddr::V4(addr) => addr == Ipv4Addr::UNSPECIFIED,
            IpAddr::V6(addr) => addr == Ipv6Addr::UNSPECIFIED,
        }
    }
}

const SUPPORT_FRACTION_VAR: &str = "LOAD_PLANNER_SUPPORT_FRACTION";
const SEARCH_BUDGET_VAR: &str = "LOAD_PLANNER_SEARCH_BUDGET";
const MAX_CANDIDATE_POINTS_VAR: &str = "LOAD_PLANNER_MAX_CANDIDATE_POINTS";
const ROUNDING_GRANULARITY_VAR: &str = "LOAD_PLANNER_ROUNDING_GRANULARITY";
const DIVISOR_AIR_VAR: &str = "LOAD_PLANNER_DIVISOR_AIR";
const DIVISOR_ROAD_VAR: &str = "LOAD_PLANNER_DIVISOR_ROAD";
const DIVISOR_SEA_VAR: &str = "LOAD_PLANNER_DIVISOR_SEA";
const DEFAULT_MODE_VAR: &str = "LOAD_PLANNER_DEFAULT_MODE";
const CONSOLIDATION_THRESHOLD_VAR: &str = "LOAD_PLANNER_CONSOLIDATION_THRESHOLD";

fn packing_from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> PackingConfig {
    let support_fraction = load_with_warning(
        lookup,
        SUPPORT_FRACTION_VAR,
        PackingConfig::DEFAULT_SUPPORT_FRACTION,
        |value: f64| value > 0.0 && value <= 1.0,
        "must be in (0, 1]",
        "Adjusted minimum support may lead to unstable stacks",
    );

    let max_placement_attempts = load_with_warning(
        lookup,
        SEARCH_BUDGET_VAR,
        PackingConfig::DEFAULT_MAX_PLACEMENT_ATTEMPTS,
        |_: u64| true,
        "",
        "Adjusted search budget changes how many items are tried per container",
    );

    let max_candidate_points = load_with_warning(
        lookup,
        MAX_CANDIDATE_POINTS_VAR,
        PackingConfig::DEFAULT_MAX_CANDIDATE_POINTS,
        |value: usize| value > 0,
        "must be greater than 0",
        "Adjusted candidate point cap may leave space unused",
    );

    PackingConfig::builder()
        .support_fraction(support_fraction)
        .max_placement_attempts(max_placement_attempts)
        .max_candidate_points(max_candidate_points)
        .build()
}

fn chargeable_from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> ChargeableConfig {
    let positive = |value: f64| value > 0.0 && value.is_finite();
    let divisor_note = "Non-standard volumetric divisor changes billed weights";

    let default_mode = match lookup(DEFAULT_MODE_VAR) {
        Some(raw) => TransportMode::parse(&raw).unwrap_or_else(|| {
            warn!(
                "Unknown transport mode in {} ('{}'). Using {}.",
                DEFAULT_MODE_VAR,
                raw,
                TransportMode::default()
            );
            TransportMode::default()
        }),
        None => TransportMode::default(),
    };

    ChargeableConfig {
        air_divisor: load_with_warning(
            lookup,
            DIVISOR_AIR_VAR,
            ChargeableConfig::DEFAULT_AIR_DIVISOR,
            positive,
            "must be greater than 0",
            divisor_note,
        ),
        road_divisor: load_with_warning(
            lookup,
            DIVISOR_ROAD_VAR,
            ChargeableConfig::DEFAULT_ROAD_DIVISOR,
            positive,
            "must be greater than 0",
            divisor_note,
        ),
        sea_divisor: load_with_warning(
            lookup,
            DIVISOR_SEA_VAR,
            ChargeableConfig::DEFAULT_SEA_DIVISOR,
            positive,
            "must be greater than 0",
            divisor_note,
        ),
        rounding_granularity: load_with_warning(
            lookup,
            ROUNDING_GRANULARITY_VAR,
            ChargeableConfig::DEFAULT_ROUNDING_GRANULARITY,
            positive,
            "must be greater than 0",
            "Adjusted rounding granularity changes billed weights",
        ),
        default_mode,
    }
}

fn utilization_from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> UtilizationConfig {
    UtilizationConfig {
        consolidation_threshold: load_with_warning(
            lookup,
            CONSOLIDATION_THRESHOLD_VAR,
            UtilizationConfig::DEFAULT_CONSOLIDATION_THRESHOLD,
            |value: f64| (0.0..=1.0).contains(&value),
            "must be between 0 and 1",
            "Adjusted consolidation threshold",
        ),
    }
}

fn env_string(name: &str) -> Option<String> {
    match env::var(name) {
        Ok(value) => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_owned())
            }
        }
        Err(env::VarError::NotPresent) => None,
        Err(err) => {
            warn!("Access to {} failed: {}. Using default value.", name, err);
            None
        }
    }
}

fn load_with_warning<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    var_name: &str,
    default: T,
    validator: impl Fn(T) -> bool,
    invalid_hint: &str,
    note: &str,
) -> T
where
    T: FromStr + PartialEq + Display + Copy,
    T::Err: Display,
{
    match lookup(var_name) {
        Some(raw) => match raw.trim().parse::<T>() {
            Ok(value) => {
                if !validator(value) {
                    warn!(
                        "{} contains invalid value '{}': {}. Using {}.",
                        var_name, raw, invalid_hint, default
                    );
                    default
                } else {
                    if value != default {
                        info!("{} ({} = {}).", note, var_name, value);
                    }
                    value
                }
            }
            Err(err) => {
                warn!(
                    "Could not parse {} ('{}'): {}. Using {}.",
                    var_name, raw, err, default
                );
                default
            }
        },
        None => default,
    }
}
