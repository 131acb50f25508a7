pub mod errors;
pub mod models;
pub mod services;
pub mod traits;

#[cfg(test)]
pub(crate) mod test_support;
