pub mod sizing;

pub use sizing::{OrderSizer, SizingConfig};
