pub mod corpus;
pub mod element_row;
pub mod error;
