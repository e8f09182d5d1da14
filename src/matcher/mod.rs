pub mod ball_tree;
pub mod neighbors;
