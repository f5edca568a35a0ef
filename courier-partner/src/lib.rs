pub mod client;
pub mod dto;
pub mod registry;
pub mod shiprocket;
pub mod status;
pub mod strategy;
pub mod token;

pub use client::{ShiprocketClient, ShiprocketSettings};
pub use registry::StrategyRegistry;
pub use shiprocket::ShiprocketStrategy;
pub use status::StatusMapper;
pub use strategy::PartnerStrategy;
pub use token::{AuthToken, TokenCache};

/// Partner name carried on every Shiprocket error.
pub const SHIPROCKET: &str = "SHIPROCKET";
