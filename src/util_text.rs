use serde::Serializer;

/// 1 STX = 1,000,000 µSTX. On-chain amounts are always integers in µSTX.
pub const MICRO_PER_STX: u128 = 1_000_000;
const MICRO_DIGITS: usize = 6;

/// Format a µSTX amount as STX without rounding.
/// Examples: 1_500_000 → "1.5", 1 → "0.000001", 25_000_000 → "25"
pub fn format_stx(micro: u128) -> String {
    let whole = micro / MICRO_PER_STX;
    let frac = micro % MICRO_PER_STX;
    if frac == 0 {
        return whole.to_string();
    }
    let digits = format!("{frac:06}");
    format!("{whole}.{}", digits.trim_end_matches('0'))
}

/// Parse a user-entered STX amount into µSTX.
///
/// The decimal is read exactly and anything past the sixth fractional digit
/// is dropped, which is `floor(amount × 1_000_000)` without float error
/// (`"4.35"` is 4_350_000, not 4_349_999).
pub fn parse_stx_amount(input: &str) -> Result<u128, String> {
    let s = input.trim();
    let s = s.strip_prefix('+').unwrap_or(s);
    if s.is_empty() {
        return Err("amount is empty".into());
    }
    if s.starts_with('-') {
        return Err("amount must be positive".into());
    }

    let (whole, frac) = match s.split_once('.') {
        Some((w, f)) => (w, f),
        None => (s, ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return Err(format!("'{input}' is not a number"));
    }
    if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("'{input}' is not a number"));
    }

    let whole: u128 = if whole.is_empty() {
        0
    } else {
        whole
            .parse()
            .map_err(|_| format!("'{input}' is too large"))?
    };
    let kept = &frac[..frac.len().min(MICRO_DIGITS)];
    let frac_micro: u128 = if kept.is_empty() {
        0
    } else {
        let padded = format!("{kept:0<width$}", width = MICRO_DIGITS);
        padded
            .parse()
            .map_err(|_| format!("'{input}' is not a number"))?
    };

    whole
        .checked_mul(MICRO_PER_STX)
        .and_then(|m| m.checked_add(frac_micro))
        .ok_or_else(|| format!("'{input}' is too large"))
}

/// Shorten a principal for display: "SP3E0D...XXWY".
pub fn truncate_address(addr: &str) -> String {
    if addr.chars().count() <= 12 {
        return addr.to_string();
    }
    let head: String = addr.chars().take(6).collect();
    let tail: String = addr
        .chars()
        .rev()
        .take(4)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    format!("{head}...{tail}")
}

/// u128 does not survive JSON number round-trips in most consumers.
pub fn serialize_u128_as_string<S>(v: &u128, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    s.serialize_str(&v.to_string())
}

pub fn serialize_option_u128_as_string<S>(v: &Option<u128>, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match v {
        Some(v) => s.serialize_str(&v.to_string()),
        None => s.serialize_none(),
    }
}
