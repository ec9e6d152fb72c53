//! Null, boolean, string and unknown-tag scalars.

use rtyaml_scanner::{ScalarStyle, Version};

/// A null. Keeps the spelling it was loaded with (`~`, `null`, empty, ...).
#[derive(Debug, Clone, Default)]
pub struct Null {
    literal: Option<String>,
    pub anchor: Option<String>,
}

impl Null {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_literal(literal: impl Into<String>) -> Self {
        Self {
            literal: Some(literal.into()),
            anchor: None,
        }
    }

    /// The loaded spelling, `None` for a null created in code.
    pub fn literal(&self) -> Option<&str> {
        self.literal.as_deref()
    }
}

/// A boolean. Keeps its spelling (`True`, `yes`, ...) until changed.
#[derive(Debug, Clone)]
pub struct Bool {
    value: bool,
    literal: Option<String>,
    pub anchor: Option<String>,
}

impl Bool {
    pub fn new(value: bool) -> Self {
        Self {
            value,
            literal: None,
            anchor: None,
        }
    }

    /// Parse one of the boolean spellings of `version`.
    pub fn parse(text: &str, version: Version) -> Option<Self> {
        let value = match text {
            "true" | "True" | "TRUE" => true,
            "false" | "False" | "FALSE" => false,
            _ if version == Version::V1_1 => match text {
                "yes" | "Yes" | "YES" | "y" | "Y" | "on" | "On" | "ON" => true,
                "no" | "No" | "NO" | "n" | "N" | "off" | "Off" | "OFF" => false,
                _ => return None,
            },
            _ => return None,
        };
        Some(Self {
            value,
            literal: Some(text.to_string()),
            anchor: None,
        })
    }

    #[inline]
    pub fn value(&self) -> bool {
        self.value
    }

    pub fn set(&mut self, value: bool) {
        if value != self.value {
            self.value = value;
            self.literal = None;
        }
    }

    pub fn render(&self) -> String {
        match &self.literal {
            Some(literal) => literal.clone(),
            None if self.value => "true".to_string(),
            None => "false".to_string(),
        }
    }
}

/// A string with its presentation.
///
/// The style is only a preference: the emitter falls back to another style
/// when the content cannot be written in the requested one.
#[derive(Debug, Clone, Default)]
pub struct Str {
    pub value: String,
    /// `None` lets the emitter choose.
    pub style: Option<ScalarStyle>,
    /// For folded scalars, char offsets of the spaces that were line folds.
    pub folds: Vec<usize>,
    pub anchor: Option<String>,
}

impl Str {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            ..Self::default()
        }
    }

    pub fn with_style(value: impl Into<String>, style: ScalarStyle) -> Self {
        Self {
            value: value.into(),
            style: Some(style),
            ..Self::default()
        }
    }

    /// A `|` block scalar.
    pub fn literal(value: impl Into<String>) -> Self {
        Self::with_style(value, ScalarStyle::Literal)
    }

    /// A `>` block scalar.
    pub fn folded(value: impl Into<String>) -> Self {
        Self::with_style(value, ScalarStyle::Folded)
    }

    pub fn single_quoted(value: impl Into<String>) -> Self {
        Self::with_style(value, ScalarStyle::SingleQuoted)
    }

    pub fn double_quoted(value: impl Into<String>) -> Self {
        Self::with_style(value, ScalarStyle::DoubleQuoted)
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }
}

/// A scalar whose tag has no constructor. Written back with the same tag.
#[derive(Debug, Clone)]
pub struct Tagged {
    pub tag: String,
    pub value: String,
    pub style: Option<ScalarStyle>,
    pub anchor: Option<String>,
}

impl Tagged {
    pub fn new(tag: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            value: value.into(),
            style: None,
            anchor: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use facet_testhelpers::test;

    #[test]
    fn test_bool_spellings() {
        assert!(Bool::parse("True", Version::V1_2).unwrap().value());
        assert!(Bool::parse("yes", Version::V1_2).is_none());
        let off = Bool::parse("Off", Version::V1_1).unwrap();
        assert!(!off.value());
        assert_eq!(off.render(), "Off");
    }

    #[test]
    fn test_bool_set_drops_spelling() {
        let mut flag = Bool::parse("TRUE", Version::V1_2).unwrap();
        flag.set(true);
        assert_eq!(flag.render(), "TRUE");
        flag.set(false);
        assert_eq!(flag.render(), "false");
    }

    #[test]
    fn test_null_literal() {
        assert_eq!(Null::with_literal("~").literal(), Some("~"));
        assert_eq!(Null::new().literal(), None);
    }
}
