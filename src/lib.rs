pub mod api;
pub mod app;
pub mod classification;
pub mod config;
pub mod db;
pub mod geocode_error;
pub mod geocoder;
pub mod services;
pub mod spatial;
pub mod uploads;
pub mod utils;
