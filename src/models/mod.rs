pub mod price;
pub mod product;

pub use product::*;
