// 💰 Currency formatting - locale-aware money strings
//
// A formatter is configured once (locale + currency code) and then formats
// any number of values. The locale data below plays the part of the
// platform number-formatting engine: separators, grouping and where the
// symbol goes.

use thiserror::Error;

pub const DEFAULT_LOCALE: &str = "pt-BR";
pub const DEFAULT_CURRENCY: &str = "BRL";

/// Fraction digits are never fewer than this
pub const MIN_FRACTION_DIGITS: usize = 2;

const NBSP: &str = "\u{a0}";
const NARROW_NBSP: &str = "\u{202f}";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("unsupported locale: {0:?}")]
    UnsupportedLocale(String),

    #[error("invalid currency code: {0:?}")]
    InvalidCurrency(String),
}

// ============================================================================
// LOCALE DATA
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SymbolPlacement {
    /// `R$ 1,00` / `$1.00`
    Before,
    /// `1,00 €`
    After,
}

#[derive(Debug)]
struct LocaleData {
    tag: &'static str,
    group: &'static str,
    decimal: &'static str,
    placement: SymbolPlacement,
    /// Gap between symbol and number when the symbol is a sign like `$`
    symbol_gap: &'static str,
    /// Smallest integer-digit count that gets grouped (es-ES does not group `1234`)
    min_grouping_digits: usize,
}

static LOCALES: &[LocaleData] = &[
    LocaleData {
        tag: "pt-BR",
        group: ".",
        decimal: ",",
        placement: SymbolPlacement::Before,
        symbol_gap: NBSP,
        min_grouping_digits: 4,
    },
    LocaleData {
        tag: "en-US",
        group: ",",
        decimal: ".",
        placement: SymbolPlacement::Before,
        symbol_gap: "",
        min_grouping_digits: 4,
    },
    LocaleData {
        tag: "en-GB",
        group: ",",
        decimal: ".",
        placement: SymbolPlacement::Before,
        symbol_gap: "",
        min_grouping_digits: 4,
    },
    LocaleData {
        tag: "de-DE",
        group: ".",
        decimal: ",",
        placement: SymbolPlacement::After,
        symbol_gap: NBSP,
        min_grouping_digits: 4,
    },
    LocaleData {
        tag: "fr-FR",
        group: NARROW_NBSP,
        decimal: ",",
        placement: SymbolPlacement::After,
        symbol_gap: NBSP,
        min_grouping_digits: 4,
    },
    LocaleData {
        tag: "es-ES",
        group: ".",
        decimal: ",",
        placement: SymbolPlacement::After,
        symbol_gap: NBSP,
        min_grouping_digits: 5,
    },
];

/// Resolve a locale tag: exact match first, then language-only fallback
fn find_locale(tag: &str) -> Result<&'static LocaleData, FormatError> {
    let normalized = tag.trim().replace('_', "-");
    let unsupported = || FormatError::UnsupportedLocale(tag.to_string());

    if normalized.is_empty() {
        return Err(unsupported());
    }

    if let Some(locale) = LOCALES
        .iter()
        .find(|l| l.tag.eq_ignore_ascii_case(&normalized))
    {
        return Ok(locale);
    }

    let language = normalized.split('-').next().unwrap_or_default();
    if language.len() < 2 || !language.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(unsupported());
    }

    LOCALES
        .iter()
        .find(|l| {
            l.tag
                .split('-')
                .next()
                .is_some_and(|lang| lang.eq_ignore_ascii_case(language))
        })
        .ok_or_else(unsupported)
}

/// Symbol for a currency as written in a given locale
fn currency_symbol(locale: &LocaleData, code: &str) -> String {
    let symbol = match (code, locale.tag) {
        ("BRL", _) => "R$",
        ("EUR", _) => "€",
        ("GBP", _) => "£",
        ("USD", "en-US") | ("USD", "de-DE") => "$",
        ("USD", "fr-FR") => "$US",
        ("USD", _) => "US$",
        ("JPY", "en-US") | ("JPY", "de-DE") => "¥",
        ("JPY", "fr-FR") | ("JPY", "es-ES") => "JPY",
        ("JPY", _) => "JP¥",
        _ => code,
    };
    symbol.to_string()
}

/// ISO 4217 minor units for the few currencies that differ from 2
fn minor_units(code: &str) -> usize {
    match code {
        "JPY" | "KRW" | "CLP" | "PYG" | "VND" => 0,
        "KWD" | "BHD" | "OMR" | "JOD" | "TND" => 3,
        _ => 2,
    }
}

fn normalize_currency(code: &str) -> Result<String, FormatError> {
    let trimmed = code.trim();
    if trimmed.len() == 3 && trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
        Ok(trimmed.to_ascii_uppercase())
    } else {
        Err(FormatError::InvalidCurrency(code.to_string()))
    }
}

// ============================================================================
// FORMATTER
// ============================================================================

/// A configured currency formatter
#[derive(Debug, Clone)]
pub struct CurrencyFormatter {
    locale: &'static LocaleData,
    currency: String,
    symbol: String,
    fraction_digits: usize,
}

impl CurrencyFormatter {
    /// Configure a formatter, failing on an unknown locale or malformed currency code
    pub fn new(locale: &str, currency: &str) -> Result<Self, FormatError> {
        let locale = find_locale(locale)?;
        let currency = normalize_currency(currency)?;
        Ok(Self::with_locale_data(locale, currency))
    }

    fn with_locale_data(locale: &'static LocaleData, currency: String) -> Self {
        let symbol = currency_symbol(locale, &currency);
        let fraction_digits = minor_units(&currency).max(MIN_FRACTION_DIGITS);

        CurrencyFormatter {
            locale,
            currency,
            symbol,
            fraction_digits,
        }
    }

    pub fn locale(&self) -> &str {
        self.locale.tag
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn fraction_digits(&self) -> usize {
        self.fraction_digits
    }

    /// Format a value as currency text
    pub fn format(&self, value: f64) -> String {
        let number = if value.is_nan() {
            "NaN".to_string()
        } else if value.is_infinite() {
            "∞".to_string()
        } else {
            self.format_magnitude(value.abs())
        };

        let negative = !value.is_nan() && value.is_sign_negative();
        let sign = if negative { "-" } else { "" };

        match self.locale.placement {
            SymbolPlacement::Before => {
                // A symbol ending in a letter ("XYZ") is always separated from the number
                let gap = if self.symbol.ends_with(|c: char| c.is_alphabetic()) {
                    NBSP
                } else {
                    self.locale.symbol_gap
                };
                format!("{}{}{}{}", sign, self.symbol, gap, number)
            }
            SymbolPlacement::After => {
                format!("{}{}{}{}", sign, number, self.locale.symbol_gap, self.symbol)
            }
        }
    }

    /// Digits of |value| with grouping and the decimal separator. Rounding is
    /// half away from zero on the shortest decimal form of the value, so
    /// `1.255` becomes `1.26` even though its binary value sits just below.
    fn format_magnitude(&self, magnitude: f64) -> String {
        let digits = self.fraction_digits;
        let shortest = magnitude.to_string();
        let (integer, fraction) = shortest
            .split_once('.')
            .unwrap_or((shortest.as_str(), ""));

        let mut kept: Vec<char> = integer
            .chars()
            .chain(fraction.chars().chain(std::iter::repeat('0')).take(digits))
            .collect();
        if fraction.chars().nth(digits).is_some_and(|d| d >= '5') {
            round_up(&mut kept);
        }

        let raw: String = kept.into_iter().collect();
        let (integer, fraction) = raw.split_at(raw.len() - digits);
        let grouped = self.group_integer(integer);

        if fraction.is_empty() {
            grouped
        } else {
            format!("{}{}{}", grouped, self.locale.decimal, fraction)
        }
    }

    fn group_integer(&self, integer: &str) -> String {
        if integer.len() < self.locale.min_grouping_digits {
            return integer.to_string();
        }

        let mut out = String::with_capacity(integer.len() + integer.len() / 3 * 3);
        let lead = integer.len() % 3;
        for (i, ch) in integer.chars().enumerate() {
            if i > 0 && (i + 3 - lead) % 3 == 0 {
                out.push_str(self.locale.group);
            }
            out.push(ch);
        }
        out
    }
}

/// Add one unit in the last place of a string of decimal digits
fn round_up(digits: &mut Vec<char>) {
    for d in digits.iter_mut().rev() {
        match d.to_digit(10) {
            Some(9) => *d = '0',
            Some(n) => {
                *d = char::from_digit(n + 1, 10).unwrap_or('0');
                return;
            }
            None => return,
        }
    }
    digits.insert(0, '1');
}

impl Default for CurrencyFormatter {
    /// Brazilian Portuguese, Brazilian Real
    fn default() -> Self {
        Self::with_locale_data(&LOCALES[0], DEFAULT_CURRENCY.to_string())
    }
}

/// Format `value` as currency under `locale` and `currency`
pub fn format_currency(value: f64, locale: &str, currency: &str) -> Result<String, FormatError> {
    Ok(CurrencyFormatter::new(locale, currency)?.format(value))
}

/// Format with the default locale and currency (pt-BR / BRL)
pub fn format_brl(value: f64) -> String {
    CurrencyFormatter::default().format(value)
}
