use anyhow::Result;

use crate::domain::Address;

/// Resolves a batch of addresses to one name per address, in order
pub trait SymbolSource {
    /// # Errors
    /// Returns an error if the underlying lookup yields nothing
    fn resolve(&self, addresses: &[Address]) -> Result<Vec<String>>;
}

impl<F> SymbolSource for F
where
    F: Fn(&[Address]) -> Result<Vec<String>>,
{
    fn resolve(&self, addresses: &[Address]) -> Result<Vec<String>> {
        self(addresses)
    }
}

/// Names every address by its hex value
#[derive(Debug, Default, Clone, Copy)]
pub struct HexSymbolSource;

impl SymbolSource for HexSymbolSource {
    fn resolve(&self, addresses: &[Address]) -> Result<Vec<String>> {
        Ok(addresses.iter().map(ToString::to_string).collect())
    }
}
