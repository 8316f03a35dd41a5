//! Address → display location

use crate::providers::SymbolProvider;

/// Rendered for any location that is not known.
pub const UNKNOWN_LOCATION: &str = "-";

/// Display string for `addr`: the resolved function name, or
/// [`UNKNOWN_LOCATION`] when there is no address or no symbol provider.
///
/// File and line are not part of the display string. Whatever fallback the
/// provider returns for an unresolvable address is passed through unchanged.
#[must_use]
pub fn resolve_location(addr: u64, symbols: Option<&dyn SymbolProvider>) -> String {
    match symbols {
        Some(symbols) if addr != 0 => symbols.resolve(addr).function,
        _ => UNKNOWN_LOCATION.to_string(),
    }
}
