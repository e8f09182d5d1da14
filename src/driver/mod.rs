pub mod driver_model;
pub mod session;
pub mod static_page;
