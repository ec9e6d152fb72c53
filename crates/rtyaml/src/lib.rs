#![doc = include_str!("../README.md")]

use std::io;

use rtyaml_emit::{Emitter, Serializer};
use rtyaml_parse::Parser;
use rtyaml_scanner::{Reader, Scanner};
use rtyaml_tree::{Composer, Document};
use rtyaml_value::{Constructor, Representer};
use tracing::debug;

pub use rtyaml_emit::{EmitterOptions, LineBreak};
pub use rtyaml_parse::CommentBundle;
pub use rtyaml_scanner::{Comment, CommentKind, Mark, MarkedError, Version, Warning, WarningKind};
pub use rtyaml_tree::{Diagnostic, DocumentInfo};
pub use rtyaml_value::{
    Bool, Float, Int, IntFormat, Map, Merge, Null, Object, Policy, Registry, Seq, Str, Tagged,
    Timestamp, Value, YamlClass,
};

mod config;
pub use config::YamlConfig;

mod error;
pub use error::{Error, Result};

mod indent;
pub use indent::{IndentGuess, guess_indent};

/// One loaded document with its framing.
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    pub value: Value,
    pub info: DocumentInfo,
}

/// A loaded stream that dumps back in its own layout.
#[derive(Debug, Clone, Default)]
pub struct Documents {
    pub documents: Vec<LoadedDocument>,
    /// Indentation found in the source text.
    pub indent: IndentGuess,
}

/// A round-trip loader and dumper.
///
/// Holds the settings and the tag tables. Every call runs a fresh pipeline,
/// so nothing but the warnings of the last load carries over between calls.
pub struct Yaml {
    config: YamlConfig,
    registry: Registry,
    warnings: Vec<Warning>,
}

impl Default for Yaml {
    fn default() -> Self {
        Self::new(YamlConfig::default())
    }
}

impl Yaml {
    pub fn new(config: YamlConfig) -> Self {
        Self::with_registry(config, Registry::round_trip())
    }

    pub fn with_registry(config: YamlConfig, registry: Registry) -> Self {
        Self {
            config,
            registry,
            warnings: Vec::new(),
        }
    }

    pub fn config(&self) -> &YamlConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut YamlConfig {
        &mut self.config
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    /// Load and dump `T` under `T::TAG`.
    pub fn register_class<T: YamlClass>(&mut self) -> &mut Self {
        self.registry.register_class::<T>();
        self
    }

    /// Warnings raised by the last load.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Load the only document of `text`. An empty stream loads as null.
    ///
    /// Comments around the document markers move onto the root collection.
    pub fn load(&mut self, text: &str) -> Result<Value> {
        let composer = Composer::from_str(text)?;
        self.load_single(composer)
    }

    /// Load the only document of a byte stream, detecting UTF-8 or UTF-16
    /// from its byte order mark.
    pub fn load_bytes(&mut self, bytes: &[u8]) -> Result<Value> {
        let reader = Reader::from_bytes(bytes)?;
        let composer = Composer::new(Parser::new(Scanner::new(reader)));
        self.load_single(composer)
    }

    /// Read `input` to the end and load its only document.
    pub fn load_reader(&mut self, mut input: impl io::Read) -> Result<Value> {
        let mut bytes = Vec::new();
        input.read_to_end(&mut bytes)?;
        self.load_bytes(&bytes)
    }

    /// Load every document of `text`.
    pub fn load_all(&mut self, text: &str) -> Result<Vec<Value>> {
        Ok(self
            .load_stream(text)?
            .into_iter()
            .map(|loaded| {
                attach_document_comments(&loaded.value, &loaded.info);
                loaded.value
            })
            .collect())
    }

    /// Load every document of `text`, keeping the document framing and the
    /// source indentation for [`dump_documents`](Self::dump_documents).
    pub fn load_documents(&mut self, text: &str) -> Result<Documents> {
        Ok(Documents {
            documents: self.load_stream(text)?,
            indent: guess_indent(text),
        })
    }

    /// Dump one document.
    pub fn dump(&self, value: &Value) -> Result<String> {
        self.dump_all(std::slice::from_ref(value))
    }

    /// Dump one document per value.
    pub fn dump_all(&self, values: &[Value]) -> Result<String> {
        let mut serializer = self.serializer(self.config.emitter.clone());
        serializer.open()?;
        for value in values {
            let document = self.represent(value, DocumentInfo::default())?;
            serializer.serialize(&document)?;
        }
        serializer.close()?;
        Ok(serializer.finish())
    }

    /// Dump `value` into `output`.
    pub fn dump_to(&self, value: &Value, mut output: impl io::Write) -> Result<()> {
        let text = self.dump(value)?;
        output.write_all(text.as_bytes())?;
        Ok(())
    }

    /// Dump documents from [`load_documents`](Self::load_documents) with
    /// their framing, in the indentation they were loaded with.
    pub fn dump_documents(&self, documents: &Documents) -> Result<String> {
        let options = documents.indent.apply(self.config.emitter.clone());
        let mut serializer = self.serializer(options);
        serializer.open()?;
        for loaded in &documents.documents {
            let document = self.represent(&loaded.value, loaded.info.clone())?;
            serializer.serialize(&document)?;
        }
        serializer.close()?;
        Ok(serializer.finish())
    }

    fn load_single(&mut self, mut composer: Composer) -> Result<Value> {
        self.warnings.clear();
        composer = composer.with_version(self.config.version);
        let mut constructor = Constructor::new(&self.registry, self.config.constructor_options());
        let document = composer.get_single_node();
        self.warnings.extend(composer.take_warnings());
        let Some(document) = document? else {
            debug!("Empty stream");
            return Ok(Value::null());
        };

        let version = composer.resolver_mut().version();
        let value = constructor.construct_document(&document, version);
        self.warnings.extend(constructor.take_warnings());
        let value = value?;
        attach_document_comments(&value, &document.info);
        Ok(value)
    }

    fn load_stream(&mut self, text: &str) -> Result<Vec<LoadedDocument>> {
        self.warnings.clear();
        let mut composer = Composer::from_str(text)?.with_version(self.config.version);
        let mut constructor = Constructor::new(&self.registry, self.config.constructor_options());
        let mut documents = Vec::new();
        loop {
            let document = composer.get_node();
            self.warnings.extend(composer.take_warnings());
            let Some(document) = document? else {
                break;
            };
            let version = composer.resolver_mut().version();
            let value = constructor.construct_document(&document, version);
            self.warnings.extend(constructor.take_warnings());
            documents.push(LoadedDocument {
                value: value?,
                info: document.info,
            });
        }
        debug!(documents = documents.len(), "Loaded stream");
        Ok(documents)
    }

    fn serializer(&self, options: EmitterOptions) -> Serializer {
        Serializer::new(Emitter::with_options(options))
            .version(self.config.version)
            .explicit_start(self.config.explicit_start)
            .explicit_end(self.config.explicit_end)
    }

    fn represent(&self, value: &Value, info: DocumentInfo) -> Result<Document> {
        let version = info.version.or(self.config.version).unwrap_or_default();
        let mut representer = Representer::new(&self.registry, version);
        let mut document = representer.represent(value)?;
        document.info = info;
        Ok(document)
    }
}

/// Move the comments around a document's markers onto its root collection.
/// A scalar root has nowhere to keep them.
fn attach_document_comments(value: &Value, info: &DocumentInfo) {
    let mut start: Vec<Comment> = info.start_comments.pre.clone();
    start.extend(info.start_comments.eol.iter().map(own_line));
    let end: Vec<Comment> = info.end_comments.iter().map(own_line).collect();
    if start.is_empty() && end.is_empty() {
        return;
    }

    let apply = |start_comment: &mut CommentBundle, end_comment: &mut CommentBundle| {
        let mut pre = start;
        pre.append(&mut start_comment.pre);
        start_comment.pre = pre;
        end_comment.pre.extend(end);
    };
    match value {
        Value::Map(map) => {
            let mut data = map.data_mut();
            let meta = &mut data.meta;
            apply(&mut meta.start_comment, &mut meta.end_comment);
        }
        Value::Seq(seq) => {
            let mut data = seq.data_mut();
            let meta = &mut data.meta;
            apply(&mut meta.start_comment, &mut meta.end_comment);
        }
        _ => debug!("Dropping document comments around a scalar root"),
    }
}

/// An eol comment that lost the marker it followed, as a full line.
fn own_line(comment: &Comment) -> Comment {
    if comment.is_eol() {
        Comment {
            kind: CommentKind::FullLine,
            column: 0,
            gap: 0,
            ..comment.clone()
        }
    } else {
        comment.clone()
    }
}

/// Load the only document of `text` with default settings.
pub fn load(text: &str) -> Result<Value> {
    Yaml::default().load(text)
}

/// Load every document of `text` with default settings.
pub fn load_all(text: &str) -> Result<Vec<Value>> {
    Yaml::default().load_all(text)
}

/// Dump `value` with default settings.
pub fn dump(value: &Value) -> Result<String> {
    Yaml::default().dump(value)
}

/// Dump one document per value with default settings.
pub fn dump_all(values: &[Value]) -> Result<String> {
    Yaml::default().dump_all(values)
}
