pub mod io;
pub mod logging;
pub mod time;

pub use logging::{init_logging, log_auth_event, log_data_operation};
pub use time::get_current_timestamp;
