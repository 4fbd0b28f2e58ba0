mod cache;
mod patterns;

pub use cache::CacheCommands;
pub use patterns::PatternsCommands;
