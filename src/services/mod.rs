pub mod relay;
pub mod token;
