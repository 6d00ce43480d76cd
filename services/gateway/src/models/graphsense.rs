use serde::Deserialize;

use crate::validation::{Validate, ValidationResult, alphanumeric};

#[derive(Debug, Clone, Deserialize)]
pub struct ScreeningRequest {
    pub currency: String,
    pub address: String,
}

impl Validate for ScreeningRequest {
    fn validate(&self) -> ValidationResult {
        alphanumeric("currency", &self.currency, 2, 10)?;
        alphanumeric("address", &self.address, 1, 128)
    }
}
