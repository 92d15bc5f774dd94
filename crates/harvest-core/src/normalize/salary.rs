//! Salary text parsing: first number, optional `K` multiplier, currency hint.

use std::sync::LazyLock;

use regex::Regex;

static AMOUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+(?:[.,]\d+)?)\s*(k)?").unwrap());

/// A digit group separated by a (narrow) space, e.g. `45 000`.
static THOUSANDS_GAP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d)[ \u{a0}\u{202f}](\d{3})\b").unwrap());

/// Parse the first amount in a salary string.
///
/// `"45K€"` → `45000`, `"45.5k"` → `45500`, `"45 000 €"` → `45000`.
/// Returns `None` when the text has no digits.
pub fn parse_salary(raw: &str) -> Option<i64> {
    let mut text = raw.to_string();
    loop {
        let joined = THOUSANDS_GAP.replace_all(&text, "${1}${2}").into_owned();
        if joined == text {
            break;
        }
        text = joined;
    }

    let caps = AMOUNT.captures(&text)?;
    let number: f64 = caps.get(1)?.as_str().replace(',', ".").parse().ok()?;
    let value = if caps.get(2).is_some() {
        number * 1000.0
    } else {
        number
    };
    Some(value.trunc() as i64)
}

/// Guess an ISO currency code from symbols or codes in the salary text.
pub fn infer_currency(raw: &str) -> Option<String> {
    let upper = raw.to_uppercase();
    let code = if raw.contains('€') || upper.contains("EUR") {
        "EUR"
    } else if raw.contains('£') || upper.contains("GBP") {
        "GBP"
    } else if raw.contains('$') || upper.contains("USD") {
        "USD"
    } else {
        return None;
    };
    Some(code.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn k_suffix_multiplies() {
        assert_eq!(parse_salary("45K€"), Some(45000));
        assert_eq!(parse_salary("45.5k"), Some(45500));
        assert_eq!(parse_salary("45,5 K"), Some(45500));
    }

    #[test]
    fn plain_numbers_are_truncated() {
        assert_eq!(parse_salary("Salaire : 52000 € par an"), Some(52000));
        assert_eq!(parse_salary("12.99"), Some(12));
    }

    #[test]
    fn first_number_wins() {
        assert_eq!(parse_salary("40K à 50K €"), Some(40000));
    }

    #[test]
    fn spaced_thousands_are_joined() {
        assert_eq!(parse_salary("45 000 €"), Some(45000));
        assert_eq!(parse_salary("1 200 000"), Some(1_200_000));
    }

    #[test]
    fn no_digits_is_none() {
        assert_eq!(parse_salary("Non spécifié"), None);
        assert_eq!(parse_salary(""), None);
    }

    #[test]
    fn currency_is_inferred() {
        assert_eq!(infer_currency("45K€").as_deref(), Some("EUR"));
        assert_eq!(infer_currency("$120k").as_deref(), Some("USD"));
        assert_eq!(infer_currency("£40,000").as_deref(), Some("GBP"));
        assert_eq!(infer_currency("45000"), None);
    }
}
