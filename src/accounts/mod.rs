//! Game accounts and their rotation order.

pub mod account;
pub mod rotator;

pub use account::Account;
pub use rotator::AccountRotator;
