//! Waterfall tiers: the ordered LP/GP split rules of a structure's distributions.

pub mod defaults;
pub mod error;
pub mod service;
pub mod validator;

pub use defaults::default_tier_set;
pub use error::WaterfallError;
pub use service::{TierEdit, WaterfallService};
pub use validator::{validate_tier, TierDraft, TierValidation};
