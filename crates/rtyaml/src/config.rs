//! Load and dump settings.

use rtyaml_emit::EmitterOptions;
use rtyaml_scanner::Version;
use rtyaml_value::{ConstructorOptions, Policy};

/// Settings shared by every load and dump of a [`Yaml`](crate::Yaml).
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "facet", derive(facet::Facet))]
pub struct YamlConfig {
    /// Keep single and double quotes on loaded strings (default: false)
    pub preserve_quotes: bool,

    /// Version used for every document. `None` lets a `%YAML` directive
    /// decide, falling back to 1.2. On dump, a pinned version is written as
    /// a `%YAML` directive (default: None)
    pub version: Option<Version>,

    /// Same key twice in one mapping (default: warn)
    pub duplicate_keys: Policy,

    /// YAML 1.1 float without a dot in the mantissa, like `1e3`
    /// (default: warn)
    pub mantissa_without_dot: Policy,

    /// Layout of dumped text
    pub emitter: EmitterOptions,

    /// Start every dumped document with `---` (default: false)
    pub explicit_start: bool,

    /// End every dumped document with `...` (default: false)
    pub explicit_end: bool,
}

impl YamlConfig {
    /// Create new default settings.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn preserve_quotes(mut self, preserve: bool) -> Self {
        self.preserve_quotes = preserve;
        self
    }

    /// Pin the YAML version.
    pub fn version(mut self, version: Option<Version>) -> Self {
        self.version = version;
        self
    }

    pub fn duplicate_keys(mut self, policy: Policy) -> Self {
        self.duplicate_keys = policy;
        self
    }

    pub fn mantissa_without_dot(mut self, policy: Policy) -> Self {
        self.mantissa_without_dot = policy;
        self
    }

    pub fn emitter(mut self, options: EmitterOptions) -> Self {
        self.emitter = options;
        self
    }

    pub fn explicit_start(mut self, explicit: bool) -> Self {
        self.explicit_start = explicit;
        self
    }

    pub fn explicit_end(mut self, explicit: bool) -> Self {
        self.explicit_end = explicit;
        self
    }

    /// Fail on every condition that is only a warning by default.
    pub fn strict(self) -> Self {
        self.duplicate_keys(Policy::Error)
            .mantissa_without_dot(Policy::Error)
    }

    pub(crate) fn constructor_options(&self) -> ConstructorOptions {
        ConstructorOptions {
            preserve_quotes: self.preserve_quotes,
            duplicate_keys: self.duplicate_keys,
            mantissa_without_dot: self.mantissa_without_dot,
        }
    }
}
