use alloy::primitives::{utils::format_units, U256};
use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

const TOKEN_DECIMALS: u32 = 18;
const MAX_FRACTIONAL_DIGITS: usize = 6;

// Validate an EVM address: 0x followed by 40 hex characters
pub fn is_valid_address(address: &str) -> bool {
    lazy_static! {
        static ref RE: Regex = Regex::new(r"^0x[a-fA-F0-9]{40}$").unwrap();
    }

    RE.is_match(address)
}

// Validate a user-entered decimal amount
pub fn is_valid_amount(amount: &str) -> bool {
    matches!(Decimal::from_str(amount.trim()), Ok(value) if value > Decimal::ZERO)
}

// Keep the longest prefix that is numeric with a single decimal point and
// at most six fractional digits
pub fn sanitize_amount(input: &str) -> String {
    let mut sanitized = String::new();
    let mut fractional_digits: Option<usize> = None;

    for c in input.chars() {
        match c {
            '0'..='9' => {
                if let Some(count) = fractional_digits {
                    if count == MAX_FRACTIONAL_DIGITS {
                        break;
                    }
                    fractional_digits = Some(count + 1);
                }
                sanitized.push(c);
            }
            '.' if fractional_digits.is_none() => {
                fractional_digits = Some(0);
                sanitized.push(c);
            }
            _ => break,
        }
    }

    sanitized
}

// Convert a decimal token amount to base units (18 decimals), truncating.
// Anything unparseable yields zero.
pub fn to_wei(amount: &str) -> U256 {
    let Ok(value) = Decimal::from_str(amount.trim()) else {
        return U256::ZERO;
    };
    if value.is_sign_negative() {
        return U256::ZERO;
    }

    let Some(scaled) = value.checked_mul(Decimal::from(10u64.pow(TOKEN_DECIMALS))) else {
        return U256::ZERO;
    };

    scaled.trunc().to_u128().map(U256::from).unwrap_or(U256::ZERO)
}

// Render a base-unit balance as a decimal token amount
pub fn from_wei(value: U256) -> String {
    format_units(value, 18u8).unwrap_or_else(|_| "0".to_string())
}

// Format an amount with at most six and at least two fraction digits
pub fn format_amount(amount: &str, symbol: &str) -> String {
    let value = Decimal::from_str(amount.trim()).unwrap_or(Decimal::ZERO);
    let value = value
        .round_dp_with_strategy(MAX_FRACTIONAL_DIGITS as u32, RoundingStrategy::ToZero)
        .normalize();

    let rendered = if value.scale() < 2 {
        format!("{value:.2}")
    } else {
        value.to_string()
    };

    if symbol.is_empty() {
        rendered
    } else {
        format!("{rendered} {symbol}")
    }
}

// Shorten an address for display
pub fn truncate_address(address: &str) -> String {
    if address.len() < 10 {
        return address.to_string();
    }

    format!("{}...{}", &address[..6], &address[address.len() - 4..])
}

// Shorten a transaction hash for display
pub fn format_tx_hash(hash: &str) -> String {
    if hash.len() < 10 {
        return hash.to_string();
    }

    format!("{}...{}", &hash[..10], &hash[hash.len() - 8..])
}

// Pull a trailing help URL out of an error message, if present
pub fn extract_help_url(message: &str) -> Option<String> {
    message.find("https://").map(|start| message[start..].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_addresses() {
        assert!(is_valid_address(
            "0x1234567890123456789012345678901234567890"
        ));
        assert!(is_valid_address(
            "0x874069Fa1Eb16D44d622F2e0Ca25eeA172369bC1"
        ));
    }

    #[test]
    fn invalid_addresses() {
        assert!(!is_valid_address(""));
        assert!(!is_valid_address("1234567890123456789012345678901234567890"));
        assert!(!is_valid_address("0x12345678901234567890123456789012345678"));
        assert!(!is_valid_address(
            "0x12345678901234567890123456789012345678zz"
        ));
        assert!(!is_valid_address(
            "0x12345678901234567890123456789012345678901"
        ));
    }

    #[test]
    fn amount_validation() {
        assert!(is_valid_amount("1.5"));
        assert!(is_valid_amount("0.000001"));
        assert!(!is_valid_amount("0"));
        assert!(!is_valid_amount("-3"));
        assert!(!is_valid_amount("abc"));
        assert!(!is_valid_amount(""));
    }

    #[test]
    fn sanitize_keeps_valid_input() {
        assert_eq!(sanitize_amount("1.5"), "1.5");
        assert_eq!(sanitize_amount("100"), "100");
        assert_eq!(sanitize_amount("0.123456"), "0.123456");
        assert_eq!(sanitize_amount(""), "");
    }

    #[test]
    fn sanitize_stops_at_second_decimal_point() {
        assert_eq!(sanitize_amount("1.2.3"), "1.2");
        assert_eq!(sanitize_amount("..5"), ".");
    }

    #[test]
    fn sanitize_stops_after_six_fractional_digits() {
        assert_eq!(sanitize_amount("1.23456789"), "1.234567");
        assert_eq!(sanitize_amount("0.0000001"), "0.000000");
    }

    #[test]
    fn sanitize_stops_at_non_numeric_input() {
        assert_eq!(sanitize_amount("12a5"), "12");
        assert_eq!(sanitize_amount("abc"), "");
        assert_eq!(sanitize_amount("1,5"), "1");
    }

    #[test]
    fn to_wei_scales_by_token_decimals() {
        assert_eq!(to_wei("1.5"), U256::from(1_500_000_000_000_000_000u64));
        assert_eq!(to_wei("2"), U256::from(2_000_000_000_000_000_000u64));
    }

    #[test]
    fn to_wei_is_exact_for_fractions() {
        // 0.1 has no exact binary representation; the conversion must not
        // go through floating point.
        assert_eq!(to_wei("0.1"), U256::from(100_000_000_000_000_000u64));
        assert_eq!(to_wei("0.000001"), U256::from(1_000_000_000_000u64));
    }

    #[test]
    fn to_wei_rejects_garbage() {
        assert_eq!(to_wei("abc"), U256::ZERO);
        assert_eq!(to_wei(""), U256::ZERO);
        assert_eq!(to_wei("-3"), U256::ZERO);
    }

    #[test]
    fn truncate_address_for_display() {
        assert_eq!(
            truncate_address("0x1234567890123456789012345678901234567890"),
            "0x1234...7890"
        );
        assert_eq!(truncate_address("0x1234"), "0x1234");
        assert_eq!(truncate_address(""), "");
    }

    #[test]
    fn format_tx_hash_for_display() {
        let hash = "0xabcdef0123456789abcdef0123456789abcdef0123456789abcdef0123456789";
        assert_eq!(format_tx_hash(hash), "0xabcdef01...23456789");
        assert_eq!(format_tx_hash("0xabc"), "0xabc");
    }

    #[test]
    fn help_url_extraction() {
        assert_eq!(
            extract_help_url("Insufficient balance. See https://developers.celo.org/tools/faucet"),
            Some("https://developers.celo.org/tools/faucet".to_string())
        );
        assert_eq!(extract_help_url("execution reverted"), None);
    }

    #[test]
    fn amount_formatting() {
        assert_eq!(format_amount("1.5", "cUSD"), "1.50 cUSD");
        assert_eq!(format_amount("1.23456789", ""), "1.234567");
        assert_eq!(format_amount("100", "cKES"), "100.00 cKES");
        assert_eq!(format_amount("abc", "cKES"), "0.00 cKES");
    }

    #[test]
    fn wei_round_trip_display() {
        let wei = to_wei("1.5");
        assert_eq!(format_amount(&from_wei(wei), "cUSD"), "1.50 cUSD");
    }
}
