pub mod flood_damage_service;
pub mod flood_import_service;
pub mod report_service;

pub use flood_damage_service::FloodDamageService;
pub use flood_import_service::FloodImportService;
pub use report_service::ReportService;
