use regex::Regex;
use std::sync::OnceLock;

// Minimum chargeable amount in KES.
pub const MIN_AMOUNT: f64 = 1.0;

// Safaricom MSISDN in international format: 254 followed by 9 digits.
fn phone_pattern() -> &'static Regex {
    static PHONE: OnceLock<Regex> = OnceLock::new();
    PHONE.get_or_init(|| Regex::new(r"^254[0-9]{9}$").expect("phone pattern"))
}

// Shape of an M-Pesa receipt code after upper-casing. The gateway does not
// publish a grammar for these, so only length and alphabet are enforced.
fn receipt_code_pattern() -> &'static Regex {
    static CODE: OnceLock<Regex> = OnceLock::new();
    CODE.get_or_init(|| Regex::new(r"^[A-Z0-9]{6,15}$").expect("receipt code pattern"))
}

pub fn is_valid_phone(phone: &str) -> bool {
    phone_pattern().is_match(phone)
}

pub fn is_valid_amount(amount: f64) -> bool {
    amount.is_finite() && amount >= MIN_AMOUNT
}

// The trimmed, upper-cased form is what gets stored and echoed back.
pub fn normalize_receipt_code(raw: &str) -> Option<String> {
    let code = raw.trim().to_ascii_uppercase();
    if receipt_code_pattern().is_match(&code) {
        Some(code)
    } else {
        None
    }
}

// Whitespace-only field values count as missing.
pub fn non_empty(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|v| !v.is_empty())
}
