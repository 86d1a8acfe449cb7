pub mod error;
pub mod flood_damage_repository;
pub mod models;
pub mod report_repository;

pub use error::DbError;
pub use flood_damage_repository::FloodDamageRepository;
pub use models::*;
pub use report_repository::ReportRepository;
