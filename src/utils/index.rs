/// Render a base-unit amount (wei, lamports) as a decimal string.
///
/// The conversion is exact: trailing fractional zeros are trimmed and whole
/// amounts carry no decimal point, so `1_500_000_000` lamports at 9 decimals
/// renders as `"1.5"`.
pub fn format_token_amount(amount: u128, decimals: u32) -> String {
	if decimals == 0 {
		return amount.to_string();
	}

	let Some(unit) = 10u128.checked_pow(decimals) else {
		// More decimals than u128 can hold: every representable amount is below one unit.
		let digits = amount.to_string();
		let padded = format!("{:0>width$}", digits, width = decimals as usize);
		let fraction = padded.trim_end_matches('0');
		return if fraction.is_empty() {
			"0".to_string()
		} else {
			format!("0.{}", fraction)
		};
	};

	let whole = amount / unit;
	let fraction = amount % unit;
	if fraction == 0 {
		return whole.to_string();
	}

	let fraction = format!("{:0>width$}", fraction, width = decimals as usize);
	format!("{}.{}", whole, fraction.trim_end_matches('0'))
}

/// Parse an EIP-1193 hex quantity (`"0x1bc16d674ec80000"`).
///
/// `"0x"` and `"0x0"` both parse to zero. Returns `None` for a missing prefix,
/// non-hex digits or a value wider than 128 bits.
pub fn parse_hex_quantity(value: &str) -> Option<u128> {
	let digits = value
		.strip_prefix("0x")
		.or_else(|| value.strip_prefix("0X"))?;
	if digits.is_empty() {
		return Some(0);
	}
	u128::from_str_radix(digits, 16).ok()
}
