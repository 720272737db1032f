pub mod backends;
pub mod runners;
