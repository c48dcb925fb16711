pub mod progress;
pub mod validation;
