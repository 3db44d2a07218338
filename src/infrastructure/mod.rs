pub mod entities;
pub mod repositories;
pub mod settings;
pub mod storage;
pub mod traits;
