pub mod utils;

pub use utils::{format_time, measure_time};
