pub mod keys;
mod signing;

pub use keys::{derive_key_from_password, generate_random_salt};
pub use signing::{constant_time_eq, Signer};
