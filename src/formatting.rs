//! Display formatting of report values: currency at fixed precisions and digit grouping.
use indexmap::IndexMap;
use serde_json::Value;

/// Fields shown as currency, with the number of decimal places each is shown at.
pub const CURRENCY_PRECISION: [(&str, usize); 12] = [
    // electricity cost / rebate
    ("EC", 3),
    // natural gas, demand and panel costs
    ("NGC", 2),
    ("DC", 2),
    ("PPW", 2),
    ("LR", 0),
    ("MIC", 0),
    ("IC", 0),
    ("ITC", 0),
    ("AMV", 0),
    ("ACSel", 0),
    ("ACSsu", 0),
    ("ACS", 0),
];

pub fn currency_precision(code: &str) -> Option<usize> {
    CURRENCY_PRECISION
        .iter()
        .find(|(field, _)| *field == code)
        .map(|(_, precision)| *precision)
}

/// A value destined for a template placeholder.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Integer(i64),
    Decimal(f64),
    Text(String),
}

impl From<&Value> for FieldValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::Number(number) => match number.as_i64() {
                Some(integer) => FieldValue::Integer(integer),
                None => FieldValue::Decimal(number.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(text) => FieldValue::Text(text.clone()),
            Value::Null => FieldValue::Text(String::new()),
            other => FieldValue::Text(other.to_string()),
        }
    }
}

impl FieldValue {
    fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Integer(integer) => Some(*integer as f64),
            FieldValue::Decimal(decimal) => Some(*decimal),
            FieldValue::Text(_) => None,
        }
    }
}

/// Symbols used when rendering numbers, passed explicitly instead of relying on a process locale.
#[derive(Clone, Debug, PartialEq)]
pub struct NumberFormat {
    pub currency_symbol: String,
    pub group_separator: char,
    pub decimal_separator: char,
    pub group_size: usize,
}

impl Default for NumberFormat {
    fn default() -> Self {
        Self::en_us()
    }
}

impl NumberFormat {
    pub fn en_us() -> Self {
        Self {
            currency_symbol: "$".to_string(),
            group_separator: ',',
            decimal_separator: '.',
            group_size: 3,
        }
    }

    /// Formats with exactly `decimals` places and grouped integer digits, e.g. `12,345.68`.
    pub fn grouped(&self, value: f64, decimals: usize) -> String {
        self.localise(&format!("{:.*}", decimals, value.abs()), value)
    }

    pub fn grouped_integer(&self, value: i64) -> String {
        self.localise(&value.unsigned_abs().to_string(), value as f64)
    }

    /// Formats with the shortest exact representation and grouped integer digits, e.g. `1,234.5`.
    pub fn grouped_natural(&self, value: f64) -> String {
        self.localise(&value.abs().to_string(), value)
    }

    pub fn currency(&self, value: f64, decimals: usize) -> String {
        let grouped = self.grouped(value, decimals);
        match grouped.strip_prefix('-') {
            Some(magnitude) => format!("-{}{magnitude}", self.currency_symbol),
            None => format!("{}{grouped}", self.currency_symbol),
        }
    }

    /// Reads back a value produced by any of the formatting methods.
    pub fn parse(&self, text: &str) -> Option<f64> {
        let normalised: String = text
            .trim()
            .replace(&self.currency_symbol, "")
            .chars()
            .filter(|c| *c != self.group_separator)
            .map(|c| if c == self.decimal_separator { '.' } else { c })
            .collect();

        normalised.parse().ok()
    }

    /// Renders a field as currency when it has a fixed precision, otherwise as a grouped number.
    pub fn field(&self, code: &str, value: &FieldValue) -> String {
        match (currency_precision(code), value) {
            (_, FieldValue::Text(text)) => text.clone(),
            (Some(precision), value) => {
                self.currency(value.as_f64().unwrap_or_default(), precision)
            }
            (None, FieldValue::Integer(integer)) => self.grouped_integer(*integer),
            (None, FieldValue::Decimal(decimal)) => self.grouped_natural(*decimal),
        }
    }

    /// `digits` is an unsigned plain rendering of `value`, using '.' as the decimal point.
    fn localise(&self, digits: &str, value: f64) -> String {
        let (integer_part, fraction) = match digits.split_once('.') {
            Some((integer_part, fraction)) => (integer_part, Some(fraction)),
            None => (digits, None),
        };

        let mut result = String::with_capacity(digits.len() + digits.len() / 3 + 2);
        let is_zero = digits.chars().all(|c| c == '0' || c == '.');
        if value < 0. && !is_zero {
            result.push('-');
        }
        result.push_str(&group_digits(integer_part, self.group_separator, self.group_size));
        if let Some(fraction) = fraction {
            result.push(self.decimal_separator);
            result.push_str(fraction);
        }

        result
    }
}

fn group_digits(digits: &str, separator: char, group_size: usize) -> String {
    let length = digits.len();
    digits
        .chars()
        .enumerate()
        .fold(String::with_capacity(length * 2), |mut grouped, (i, digit)| {
            if i > 0 && group_size > 0 && (length - i) % group_size == 0 {
                grouped.push(separator);
            }
            grouped.push(digit);
            grouped
        })
}

/// Renders every field for display, in the order given.
pub fn format_fields(
    fields: &IndexMap<String, FieldValue>,
    format: &NumberFormat,
) -> IndexMap<String, String> {
    fields
        .iter()
        .map(|(code, value)| (code.clone(), format.field(code, value)))
        .collect()
}
