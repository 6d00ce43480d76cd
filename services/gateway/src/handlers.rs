//! Route handlers, one module per router

pub mod admin;
pub mod cex;
pub mod dex;
pub mod exchange;
pub mod graphsense;
pub mod health;
pub mod kyc;
pub mod margin;
pub mod quant;
pub mod security;
pub mod token_sale;
pub mod wallet;
