// handlers/mod.rs - two tiers of routes
//
// public    - no authentication (/, /health)
// waterfall - JWT required (/api/*), access level checked per handler
pub mod public;
pub mod waterfall;
