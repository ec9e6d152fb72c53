//! Tags of the YAML core and 1.1 type repositories.

pub const PREFIX: &str = "tag:yaml.org,2002:";

pub const STR: &str = "tag:yaml.org,2002:str";
pub const INT: &str = "tag:yaml.org,2002:int";
pub const FLOAT: &str = "tag:yaml.org,2002:float";
pub const BOOL: &str = "tag:yaml.org,2002:bool";
pub const NULL: &str = "tag:yaml.org,2002:null";
pub const TIMESTAMP: &str = "tag:yaml.org,2002:timestamp";
pub const BINARY: &str = "tag:yaml.org,2002:binary";
pub const MERGE: &str = "tag:yaml.org,2002:merge";
pub const VALUE: &str = "tag:yaml.org,2002:value";
pub const SEQ: &str = "tag:yaml.org,2002:seq";
pub const MAP: &str = "tag:yaml.org,2002:map";
pub const SET: &str = "tag:yaml.org,2002:set";
pub const OMAP: &str = "tag:yaml.org,2002:omap";
pub const PAIRS: &str = "tag:yaml.org,2002:pairs";

/// `!!str` style shorthand for messages.
pub fn short(tag: &str) -> String {
    match tag.strip_prefix(PREFIX) {
        Some(rest) => format!("!!{rest}"),
        None => tag.to_string(),
    }
}
