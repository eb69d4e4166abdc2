pub mod api;
pub mod gis;
pub mod pages;
