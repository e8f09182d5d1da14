pub mod engine;
pub mod heal_model;
pub mod page_element;
