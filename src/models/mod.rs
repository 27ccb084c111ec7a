pub mod block;
pub mod matrix;
pub mod point;

pub use block::Block;
pub use matrix::{BLACK, BinaryImage, WHITE};
pub use point::Point;
