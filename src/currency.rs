//! Currency code persisted with the ledger plus display-only formatting.
//! Nothing here feeds back into ledger arithmetic.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// ISO 4217 currency representation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct CurrencyCode(pub String);

impl CurrencyCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn symbol(&self) -> Option<&'static str> {
        SYMBOLS.get(self.0.as_str()).copied()
    }
}

impl Default for CurrencyCode {
    fn default() -> Self {
        Self::new("USD")
    }
}

static SYMBOLS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("USD", "$"),
        ("EUR", "€"),
        ("GBP", "£"),
        ("JPY", "¥"),
        ("RUB", "₽"),
        ("UAH", "₴"),
        ("INR", "₹"),
        ("BRL", "R$"),
        ("KRW", "₩"),
        ("TRY", "₺"),
    ])
});

/// Renders an amount with its currency symbol, falling back to the code
/// when the symbol is unknown. Amounts display at two decimal places.
pub fn format_amount(value: Decimal, currency: &CurrencyCode) -> String {
    let rounded = value.round_dp(2);
    match currency.symbol() {
        Some(symbol) => format!("{}{:.2}", symbol, rounded),
        None => format!("{:.2} {}", rounded, currency.as_str()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn codes_are_uppercased() {
        assert_eq!(CurrencyCode::new("usd").as_str(), "USD");
    }

    #[test]
    fn known_symbol_prefixes_the_amount() {
        let formatted = format_amount(dec!(1234.5), &CurrencyCode::new("EUR"));
        assert_eq!(formatted, "€1234.50");
    }

    #[test]
    fn unknown_code_falls_back_to_suffix() {
        let formatted = format_amount(dec!(10), &CurrencyCode::new("CHF"));
        assert_eq!(formatted, "10.00 CHF");
    }

    #[test]
    fn negative_amounts_keep_their_sign() {
        let formatted = format_amount(dec!(-3.333), &CurrencyCode::new("USD"));
        assert_eq!(formatted, "$-3.33");
    }
}
