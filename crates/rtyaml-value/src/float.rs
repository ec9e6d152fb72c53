//! Floats that remember how they were written.

use rtyaml_scanner::Version;

use crate::int::split_sign;

/// A float plus the layout of its literal.
///
/// The layout describes the mantissa without its sign: `width` counts its
/// digits and dot, `prec` is the position of the dot. It is used to write a
/// changed value in the same shape as the original.
#[derive(Debug, Clone)]
pub struct Float {
    value: f64,
    width: usize,
    prec: Option<usize>,
    m_sign: bool,
    m_lead0: usize,
    exp: Option<char>,
    e_sign: bool,
    e_width: usize,
    literal: Option<String>,
    pub anchor: Option<String>,
}

/// Result of parsing a float literal.
pub struct ParsedFloat {
    pub float: Float,
    /// A YAML 1.1 exponent form without a `.` in the mantissa.
    pub mantissa_without_dot: bool,
}

impl Float {
    pub fn new(value: f64) -> Self {
        Self {
            value,
            width: 0,
            prec: None,
            m_sign: false,
            m_lead0: 0,
            exp: None,
            e_sign: false,
            e_width: 0,
            literal: None,
            anchor: None,
        }
    }

    #[inline]
    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn literal(&self) -> Option<&str> {
        self.literal.as_deref()
    }

    /// Digits plus dot in the mantissa.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Index of the dot in the mantissa.
    pub fn prec(&self) -> Option<usize> {
        self.prec
    }

    /// Zeros before the first significant mantissa digit.
    pub fn leading_zeros(&self) -> usize {
        self.m_lead0
    }

    /// Exponent character, `e` or `E`.
    pub fn exp(&self) -> Option<char> {
        self.exp
    }

    pub fn set(&mut self, value: f64) {
        if value.to_bits() != self.value.to_bits() {
            self.value = value;
            self.literal = None;
        }
    }

    pub fn parse(text: &str, version: Version) -> Result<ParsedFloat, String> {
        let invalid = || format!("invalid float literal {text:?}");
        let (negative, plus, body) = split_sign(text);
        let clean: String = body.chars().filter(|&c| c != '_').collect();
        let lower = clean.to_ascii_lowercase();
        let signed = |v: f64| if negative { -v } else { v };

        let mut float = Float::new(0.0);
        float.m_sign = plus;
        float.literal = Some(text.to_string());

        if lower == ".inf" {
            float.value = signed(f64::INFINITY);
            return Ok(ParsedFloat {
                float,
                mantissa_without_dot: false,
            });
        }
        if lower == ".nan" {
            float.value = f64::NAN;
            return Ok(ParsedFloat {
                float,
                mantissa_without_dot: false,
            });
        }
        if version == Version::V1_1 && lower.contains(':') {
            let value = lower.split(':').try_fold(0.0f64, |acc, part| {
                part.parse::<f64>().map(|p| acc * 60.0 + p).map_err(|_| invalid())
            })?;
            float.value = signed(value);
            return Ok(ParsedFloat {
                float,
                mantissa_without_dot: false,
            });
        }

        let magnitude: f64 = lower.parse().map_err(|_| invalid())?;
        float.value = signed(magnitude);

        let (mantissa, exponent) = match clean.find(['e', 'E']) {
            Some(at) => {
                float.exp = clean[at..].chars().next();
                (&clean[..at], Some(&clean[at + 1..]))
            }
            None => (clean.as_str(), None),
        };
        float.width = mantissa.len();
        float.prec = mantissa.find('.');
        float.m_lead0 = mantissa
            .chars()
            .take_while(|&c| c == '0' || c == '.')
            .filter(|&c| c == '0')
            .count();
        if let Some(exponent) = exponent {
            float.e_sign = exponent.starts_with('+');
            float.e_width = exponent.trim_start_matches(['+', '-']).len();
        }

        let mantissa_without_dot =
            version == Version::V1_1 && exponent.is_some() && float.prec.is_none();
        Ok(ParsedFloat {
            float,
            mantissa_without_dot,
        })
    }

    pub fn render(&self) -> String {
        if let Some(literal) = &self.literal {
            return literal.clone();
        }
        if self.value.is_nan() {
            return ".nan".to_string();
        }
        if self.value.is_infinite() {
            return if self.value < 0.0 { "-.inf" } else { ".inf" }.to_string();
        }
        let sign = if self.value.is_sign_negative() && self.value != 0.0 {
            "-"
        } else if self.m_sign {
            "+"
        } else {
            ""
        };
        let magnitude = self.value.abs();

        if self.width == 0 {
            return format!("{sign}{}", shortest(magnitude));
        }

        let body = match self.exp {
            None => self.render_plain(magnitude),
            Some(exp) => self.render_exponent(magnitude, exp),
        };
        format!("{sign}{body}")
    }

    fn decimals(&self) -> usize {
        match self.prec {
            Some(prec) => self.width.saturating_sub(prec + 1),
            None => 0,
        }
    }

    fn render_plain(&self, magnitude: f64) -> String {
        let decimals = self.decimals();
        let mut body = format!("{magnitude:.decimals$}");
        if self.prec.is_some() && decimals == 0 {
            body.push('.');
        }
        if self.prec == Some(0)
            && let Some(rest) = body.strip_prefix("0.")
        {
            body = format!(".{rest}");
        }
        while body.len() < self.width {
            body.insert(0, '0');
        }
        body
    }

    fn render_exponent(&self, magnitude: f64, exp: char) -> String {
        let int_digits = self.prec.unwrap_or(self.width).max(1);
        let frac_digits = self.decimals();
        let formatted = format!("{:.*e}", int_digits - 1 + frac_digits, magnitude);
        let (mantissa, exponent) = formatted.split_once('e').unwrap_or((&formatted, "0"));
        let mut exponent: i32 = exponent.parse().unwrap_or(0);
        let digits: String = mantissa.chars().filter(|c| c.is_ascii_digit()).collect();

        let (head, tail) = digits.split_at(int_digits.min(digits.len()));
        if magnitude != 0.0 {
            exponent -= int_digits as i32 - 1;
        }
        let mut body = head.to_string();
        if self.prec.is_some() {
            body.push('.');
            body.push_str(tail);
        }

        let e_sign = if exponent < 0 {
            "-"
        } else if self.e_sign {
            "+"
        } else {
            ""
        };
        let e_digits = exponent.unsigned_abs().to_string();
        let pad = self.e_width.saturating_sub(e_digits.len());
        format!("{body}{exp}{e_sign}{}{e_digits}", "0".repeat(pad))
    }
}

impl From<f64> for Float {
    fn from(value: f64) -> Self {
        Float::new(value)
    }
}

/// Shortest text that reads back as `value` and still looks like a float.
fn shortest(value: f64) -> String {
    let text = format!("{value:?}");
    if text.contains(['.', 'e', 'E']) {
        text
    } else {
        format!("{text}.0")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use facet_testhelpers::test;

    fn parse(text: &str) -> Float {
        Float::parse(text, Version::V1_2).unwrap().float
    }

    fn changed(text: &str, value: f64) -> String {
        let mut float = parse(text);
        float.set(value);
        float.render()
    }

    #[test]
    fn test_unchanged_renders_literal() {
        for text in ["1.50", "1.5e+10", "-0.5", ".5", "1.", "+1.0E-03", ".inf", "-.Inf"] {
            assert_eq!(parse(text).render(), text);
        }
    }

    #[test]
    fn test_values() {
        assert_eq!(parse("1.5e+10").value(), 1.5e10);
        assert_eq!(parse("-.inf").value(), f64::NEG_INFINITY);
        assert!(parse(".NaN").value().is_nan());
        assert_eq!(parse("1_000.5").value(), 1000.5);
    }

    #[test]
    fn test_changed_plain_keeps_precision() {
        assert_eq!(changed("1.50", 2.25), "2.25");
        assert_eq!(changed("1.50", 3.0), "3.00");
        assert_eq!(changed("001.5", 2.5), "002.5");
        assert_eq!(changed(".5", 0.75), ".8");
        assert_eq!(changed("1.", 7.0), "7.");
        assert_eq!(changed("+1.0", 2.0), "+2.0");
        assert_eq!(changed("1.0", -2.0), "-2.0");
    }

    #[test]
    fn test_changed_exponent_keeps_shape() {
        assert_eq!(changed("1.5e+10", 2.5e11), "2.5e+11");
        assert_eq!(changed("1.0E-03", 0.002), "2.0E-03");
        assert_eq!(changed("12.5e3", 13500.0), "13.5e3");
    }

    #[test]
    fn test_special_values() {
        assert_eq!(changed("1.0", f64::INFINITY), ".inf");
        assert_eq!(changed("1.0", f64::NEG_INFINITY), "-.inf");
        assert_eq!(changed("1.0", f64::NAN), ".nan");
    }

    #[test]
    fn test_fresh_float() {
        assert_eq!(Float::new(3.0).render(), "3.0");
        assert_eq!(Float::new(0.1).render(), "0.1");
        assert_eq!(Float::new(-2.5).render(), "-2.5");
    }

    #[test]
    fn test_mantissa_without_dot() {
        let parsed = Float::parse("1e3", Version::V1_1).unwrap();
        assert!(parsed.mantissa_without_dot);
        assert_eq!(parsed.float.value(), 1000.0);
        assert!(!Float::parse("1e3", Version::V1_2).unwrap().mantissa_without_dot);
    }

    #[test]
    fn test_sexagesimal_float() {
        let parsed = Float::parse("190:20:30.15", Version::V1_1).unwrap();
        assert!((parsed.float.value() - 685230.15).abs() < 1e-6);
    }
}
