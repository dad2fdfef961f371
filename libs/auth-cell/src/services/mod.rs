pub mod account;
pub mod seed;
