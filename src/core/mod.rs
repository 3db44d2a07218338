pub mod assistant;
pub mod services;
pub mod traits;
