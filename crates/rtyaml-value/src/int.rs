//! Integers that remember how they were written.

use rtyaml_scanner::Version;

/// Radix and letter case of an integer literal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "facet", derive(facet::Facet))]
#[repr(u8)]
pub enum IntFormat {
    #[default]
    Decimal,
    /// `0b1010`
    Binary,
    /// `0o17`, or `017` under YAML 1.1
    Octal,
    /// `0x1f`
    Hex,
    /// `0x1F`
    HexCaps,
    /// `1:30:00`, YAML 1.1 only
    Sexagesimal,
}

/// Underscore grouping of digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "facet", derive(facet::Facet))]
pub struct Underscore {
    /// Group size, counted from the right. 0 means no grouping.
    pub every: usize,
    /// An underscore directly after the radix prefix.
    pub leading: bool,
    /// An underscore after the last digit.
    pub trailing: bool,
}

/// An integer plus the formatting needed to write it back unchanged.
#[derive(Debug, Clone)]
pub struct Int {
    value: i128,
    format: IntFormat,
    width: Option<usize>,
    underscore: Option<Underscore>,
    plus: bool,
    literal: Option<String>,
    pub anchor: Option<String>,
}

impl Int {
    pub fn new(value: i128) -> Self {
        Self {
            value,
            format: IntFormat::Decimal,
            width: None,
            underscore: None,
            plus: false,
            literal: None,
            anchor: None,
        }
    }

    pub fn with_format(mut self, format: IntFormat) -> Self {
        self.format = format;
        self.literal = None;
        self
    }

    /// Zero-pad the digits to `width`.
    pub fn with_width(mut self, width: usize) -> Self {
        self.width = Some(width);
        self.literal = None;
        self
    }

    pub fn with_underscore(mut self, underscore: Underscore) -> Self {
        self.underscore = Some(underscore);
        self.literal = None;
        self
    }

    #[inline]
    pub fn value(&self) -> i128 {
        self.value
    }

    #[inline]
    pub fn format(&self) -> IntFormat {
        self.format
    }

    pub fn width(&self) -> Option<usize> {
        self.width
    }

    pub fn underscore(&self) -> Option<Underscore> {
        self.underscore
    }

    /// The source text, while the value is unchanged.
    pub fn literal(&self) -> Option<&str> {
        self.literal.as_deref()
    }

    /// Replace the value, keeping the format.
    pub fn set(&mut self, value: i128) {
        if value != self.value {
            self.value = value;
            self.literal = None;
        }
    }

    /// Parse an integer literal the way the constructor sees it: the text
    /// already matched the `!!int` pattern of `version`.
    pub fn parse(text: &str, version: Version) -> Result<Self, String> {
        let yaml_1_1 = version == Version::V1_1;
        let (negative, plus, body) = split_sign(text);
        let digits: String = body.chars().filter(|&c| c != '_').collect();
        if digits.is_empty() {
            return Err(format!("invalid integer literal {text:?}"));
        }
        let mut int = Int::new(0);
        int.plus = plus;

        let (format, radix, number) = if let Some(rest) = digits.strip_prefix("0b") {
            (IntFormat::Binary, 2, rest)
        } else if let Some(rest) = digits.strip_prefix("0x") {
            let caps = rest
                .chars()
                .find(|c| c.is_ascii_alphabetic())
                .is_some_and(|c| c.is_ascii_uppercase());
            let format = if caps { IntFormat::HexCaps } else { IntFormat::Hex };
            (format, 16, rest)
        } else if let Some(rest) = digits.strip_prefix("0o") {
            (IntFormat::Octal, 8, rest)
        } else if yaml_1_1 && digits.contains(':') {
            let value = sexagesimal(&digits).ok_or_else(|| out_of_range(text))?;
            int.value = if negative { -value } else { value };
            int.format = IntFormat::Sexagesimal;
            int.literal = Some(text.to_string());
            return Ok(int);
        } else if yaml_1_1 && digits.len() > 1 && digits.starts_with('0') {
            (IntFormat::Octal, 8, &digits[1..])
        } else {
            (IntFormat::Decimal, 10, digits.as_str())
        };

        let magnitude = i128::from_str_radix(number, radix).map_err(|_| out_of_range(text))?;
        int.value = if negative { -magnitude } else { magnitude };
        int.format = format;

        let prefixed = matches!(
            format,
            IntFormat::Binary | IntFormat::Hex | IntFormat::HexCaps
        ) || (format == IntFormat::Octal && !yaml_1_1);
        if (prefixed && !yaml_1_1 && number.starts_with('0') && number.len() > 1)
            || (format == IntFormat::Decimal && number.len() > 1 && number.starts_with('0'))
        {
            int.width = Some(number.len());
        }
        int.underscore = underscore(body, prefixed);
        int.literal = Some(text.to_string());
        Ok(int)
    }

    /// The text to write for this integer under `version`.
    pub fn render(&self, version: Version) -> String {
        if let Some(literal) = &self.literal {
            return literal.clone();
        }
        let magnitude = self.value.unsigned_abs();
        let (prefix, digits) = match self.format {
            IntFormat::Decimal => ("", magnitude.to_string()),
            IntFormat::Binary => ("0b", format!("{magnitude:b}")),
            IntFormat::Octal if version == Version::V1_1 => ("0", format!("{magnitude:o}")),
            IntFormat::Octal => ("0o", format!("{magnitude:o}")),
            IntFormat::Hex => ("0x", format!("{magnitude:x}")),
            IntFormat::HexCaps => ("0x", format!("{magnitude:X}")),
            IntFormat::Sexagesimal if version == Version::V1_1 => ("", base60(magnitude)),
            IntFormat::Sexagesimal => ("", magnitude.to_string()),
        };
        let mut digits = match self.width {
            Some(width) if digits.len() < width => {
                format!("{}{digits}", "0".repeat(width - digits.len()))
            }
            _ => digits,
        };
        if let Some(underscore) = self.underscore {
            digits = group(&digits, underscore);
        }
        let sign = if self.value < 0 {
            "-"
        } else if self.plus {
            "+"
        } else {
            ""
        };
        format!("{sign}{prefix}{digits}")
    }
}

impl From<i128> for Int {
    fn from(value: i128) -> Self {
        Int::new(value)
    }
}

fn out_of_range(text: &str) -> String {
    format!("integer {text:?} does not fit in 128 bits")
}

/// `(negative, explicit plus, rest)`
pub(crate) fn split_sign(text: &str) -> (bool, bool, &str) {
    if let Some(rest) = text.strip_prefix('-') {
        (true, false, rest)
    } else if let Some(rest) = text.strip_prefix('+') {
        (false, true, rest)
    } else {
        (false, false, text)
    }
}

fn sexagesimal(digits: &str) -> Option<i128> {
    digits.split(':').try_fold(0i128, |acc, part| {
        let part: i128 = part.parse().ok()?;
        acc.checked_mul(60)?.checked_add(part)
    })
}

fn base60(mut magnitude: u128) -> String {
    let mut parts = Vec::new();
    while magnitude >= 60 {
        parts.push(format!("{:02}", magnitude % 60));
        magnitude /= 60;
    }
    parts.push(magnitude.to_string());
    parts.reverse();
    parts.join(":")
}

/// Underscore layout of `body` (sign stripped, underscores kept).
fn underscore(body: &str, prefixed: bool) -> Option<Underscore> {
    let number = if prefixed { body.get(2..).unwrap_or("") } else { body };
    let trimmed = number.trim_end_matches('_');
    let last = trimmed.rfind('_')?;
    Some(Underscore {
        every: trimmed.len() - last - 1,
        leading: prefixed && number.starts_with('_'),
        trailing: number.len() > 1 && number.ends_with('_'),
    })
}

fn group(digits: &str, underscore: Underscore) -> String {
    let mut out = String::with_capacity(digits.len() * 2);
    let len = digits.len();
    for (i, c) in digits.chars().enumerate() {
        if underscore.every > 0 && i > 0 && (len - i) % underscore.every == 0 {
            out.push('_');
        }
        out.push(c);
    }
    if underscore.leading {
        out.insert(0, '_');
    }
    if underscore.trailing {
        out.push('_');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use facet_testhelpers::test;

    fn parse(text: &str) -> Int {
        Int::parse(text, Version::V1_2).unwrap()
    }

    #[test]
    fn test_formats() {
        assert_eq!(parse("42").format(), IntFormat::Decimal);
        assert_eq!(parse("0x1f").format(), IntFormat::Hex);
        assert_eq!(parse("0x1F").value(), 31);
        assert_eq!(parse("0x1F").format(), IntFormat::HexCaps);
        assert_eq!(parse("0x10").format(), IntFormat::Hex);
        assert_eq!(parse("0o17").value(), 15);
        assert_eq!(parse("0b101").value(), 5);
        assert_eq!(parse("-1_000").value(), -1000);
        assert_eq!(parse("010").value(), 10);
    }

    #[test]
    fn test_yaml_1_1_forms() {
        let octal = Int::parse("010", Version::V1_1).unwrap();
        assert_eq!(octal.value(), 8);
        assert_eq!(octal.format(), IntFormat::Octal);
        let time = Int::parse("1:30", Version::V1_1).unwrap();
        assert_eq!(time.value(), 90);
        assert_eq!(time.format(), IntFormat::Sexagesimal);
    }

    #[test]
    fn test_unchanged_renders_literal() {
        for text in ["0x1F", "0x1f", "010", "1_000", "+7", "0b0010", "0o0_17"] {
            assert_eq!(parse(text).render(Version::V1_2), text);
        }
    }

    #[test]
    fn test_mutation_keeps_format() {
        let mut hex = parse("0x1F");
        hex.set(255);
        assert_eq!(hex.render(Version::V1_2), "0xFF");

        let mut grouped = parse("1_000");
        grouped.set(1_234_567);
        assert_eq!(grouped.render(Version::V1_2), "1_234_567");

        let mut padded = parse("0x00ff");
        padded.set(16);
        assert_eq!(padded.render(Version::V1_2), "0x0010");

        let mut leading_zero = parse("007");
        leading_zero.set(42);
        assert_eq!(leading_zero.render(Version::V1_2), "042");

        let mut negative = parse("+5");
        negative.set(-5);
        assert_eq!(negative.render(Version::V1_2), "-5");
    }

    #[test]
    fn test_octal_prefix_follows_version() {
        let int = Int::new(8).with_format(IntFormat::Octal);
        assert_eq!(int.render(Version::V1_2), "0o10");
        assert_eq!(int.render(Version::V1_1), "010");
    }

    #[test]
    fn test_sexagesimal_render() {
        let int = Int::new(5430).with_format(IntFormat::Sexagesimal);
        assert_eq!(int.render(Version::V1_1), "1:30:30");
        assert_eq!(int.render(Version::V1_2), "5430");
    }

    #[test]
    fn test_too_large() {
        let text = "0x1_0000_0000_0000_0000_0000_0000_0000_0000";
        let err = Int::parse(text, Version::V1_2).unwrap_err();
        assert!(err.contains("does not fit"));
    }
}
