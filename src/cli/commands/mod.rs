pub mod tiers;
pub mod token;
