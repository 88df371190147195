//! Pure per-value and per-row cleaning functions.

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::Value;
use std::str::FromStr;

use crate::validation::MONEY_SCALE;

/// Characters dropped from currency text before parsing: any currency
/// symbol, thousands separators and the closing accounting paren.
static CURRENCY_NOISE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\p{Sc},)]").expect("Invalid currency regex"));

/// Leading or trailing ISO 4217 code, as in `USD 1,000.50` or `1,000.50 EUR`.
static CURRENCY_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]{3}\s*|\s*[A-Z]{3}$").expect("Invalid currency code regex"));

/// Clean a spreadsheet currency cell into a 2-place decimal.
///
/// Currency symbols (`$`, `£`, `€`, ...), a leading or trailing three-letter
/// currency code, `,` and `)` are removed and the first `(` becomes a minus
/// sign, so accounting negatives like `(500.00)` parse. Values are rounded half away
/// from zero. Returns `None` when the cell has no numeric content (null,
/// blank, `#DIV/0!`, free text).
///
/// ```ignore
/// assert_eq!(clean_currency(&json!("$1,000.50")), Some(Decimal::new(100050, 2)));
/// assert_eq!(clean_currency(&json!("(500.00)")), Some(Decimal::new(-50000, 2)));
/// ```
pub fn clean_currency(value: &Value) -> Option<Decimal> {
    let parsed = match value {
        Value::Number(n) => parse_decimal(&n.to_string()),
        Value::String(s) => {
            let uncoded = CURRENCY_CODE.replace_all(s.trim(), "");
            let stripped = CURRENCY_NOISE.replace_all(&uncoded, "");
            let signed = stripped.replacen('(', "-", 1);
            parse_decimal(signed.trim())
        }
        _ => None,
    }?;

    let mut rounded = parsed.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(MONEY_SCALE);
    Some(rounded)
}

fn parse_decimal(text: &str) -> Option<Decimal> {
    if text.is_empty() {
        return None;
    }
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()
}

/// Whether a cell holds something that is neither absent nor blank.
pub fn has_content(value: Option<&Value>) -> bool {
    value_to_text(value).is_some()
}

/// Render a cell as trimmed text. Null and blank cells are `None`.
pub fn value_to_text(value: Option<&Value>) -> Option<String> {
    let text = match value? {
        Value::Null => return None,
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    };

    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Whether an id cell marks a spreadsheet totals row.
pub fn is_totals_id(id: Option<&str>) -> bool {
    matches!(
        id.map(|s| s.trim().to_lowercase()).as_deref(),
        Some("totals") | Some("total")
    )
}

/// Officer code and name after ordering has been decided for one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCounterparty {
    pub code: Option<String>,
    pub name: Option<String>,
    /// The code and name columns were swapped in the source row.
    pub swapped: bool,
}

/// Decide which of the two officer cells is the code.
///
/// Officer codes are numeric, so a code cell containing a letter means the
/// two columns are swapped for this row.
pub fn resolve_counterparty(code: Option<&str>, name: Option<&str>) -> ResolvedCounterparty {
    let code = code.map(str::trim).filter(|s| !s.is_empty());
    let name = name.map(str::trim).filter(|s| !s.is_empty());

    let swapped = code.is_some_and(|c| c.chars().any(|ch| ch.is_ascii_alphabetic()));
    let (code, name) = if swapped { (name, code) } else { (code, name) };

    ResolvedCounterparty {
        code: code.map(String::from),
        name: name.map(String::from),
        swapped,
    }
}
