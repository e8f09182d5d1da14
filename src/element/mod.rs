pub mod dom;
pub mod element_model;
pub mod fingerprint;
pub mod normalize;
pub mod xpath;
