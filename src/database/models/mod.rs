pub mod waterfall_tier;

pub use waterfall_tier::{NewTier, TierPatch, WaterfallTier};
