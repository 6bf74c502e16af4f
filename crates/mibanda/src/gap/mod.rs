pub mod advertising;
pub mod constants;
pub mod types;

pub use advertising::{local_name, parse_advertising_data};
pub use constants::*;
pub use types::*;
