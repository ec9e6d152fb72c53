//! Round-trip sequences and mappings.
//!
//! Both are reference-counted handles around their data plus a side table of
//! presentation metadata: comments, source marks, flow style, anchor and tag.
//! The side table never takes part in equality or hashing.

use std::cell::{Ref, RefCell, RefMut};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use indexmap::IndexMap;
use rtyaml_parse::CommentBundle;
use rtyaml_scanner::{Comment, Mark, comment_lines};

use crate::Value;

/// Comments and source marks for one entry of a collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemMeta {
    /// Comments around the key. Unused for sequence items.
    pub key_comment: CommentBundle,
    /// Comments around the value or sequence item.
    pub value_comment: CommentBundle,
    pub key_mark: Option<Mark>,
    pub value_mark: Option<Mark>,
}

/// Presentation metadata of a collection, keyed by index or key.
#[derive(Debug, Clone, PartialEq)]
pub struct Meta<K: Eq + Hash> {
    /// Comments before the collection and on its opening line.
    pub start_comment: CommentBundle,
    /// Comments after the last entry.
    pub end_comment: CommentBundle,
    pub items: HashMap<K, ItemMeta>,
    /// Where the collection started in the source.
    pub mark: Option<Mark>,
    /// `Some(true)` for `[...]`/`{...}`, `Some(false)` for block, `None` to
    /// let the emitter decide.
    pub flow_style: Option<bool>,
    pub anchor: Option<String>,
    /// A tag other than the default `!!seq`/`!!map`.
    pub tag: Option<String>,
}

impl<K: Eq + Hash> Default for Meta<K> {
    fn default() -> Self {
        Self {
            start_comment: CommentBundle::default(),
            end_comment: CommentBundle::default(),
            items: HashMap::new(),
            mark: None,
            flow_style: None,
            anchor: None,
            tag: None,
        }
    }
}

impl<K: Eq + Hash> Meta<K> {
    pub fn item(&self, key: &K) -> Option<&ItemMeta> {
        self.items.get(key)
    }

    pub fn item_mut(&mut self, key: K) -> &mut ItemMeta {
        self.items.entry(key).or_default()
    }
}

/// The `<<` key of a mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct Merge {
    /// Number of own entries written before `<<`.
    pub position: usize,
    /// Merged mappings, in order of precedence.
    pub sources: Vec<Map>,
    /// Written as `<<: [*a, *b]` rather than `<<: *a`.
    pub sequence: bool,
    pub comment: CommentBundle,
}

thread_local! {
    static VISITING: RefCell<HashSet<usize>> = RefCell::new(HashSet::new());
}

/// Run `f` unless the collection at `ptr` is already being formatted.
fn guarded(
    ptr: usize,
    f: &mut fmt::Formatter<'_>,
    body: impl FnOnce(&mut fmt::Formatter<'_>) -> fmt::Result,
) -> fmt::Result {
    if !VISITING.with(|v| v.borrow_mut().insert(ptr)) {
        return f.write_str("<cycle>");
    }
    let result = body(f);
    VISITING.with(|v| v.borrow_mut().remove(&ptr));
    result
}

/// Set a start or end comment from text: each line becomes a full-line
/// comment at `column`.
fn replace_comment(slot: &mut CommentBundle, text: &str, column: usize) {
    slot.pre = comment_lines(text, column);
}

// Sequences

#[derive(Default)]
pub struct SeqData {
    pub items: Vec<Value>,
    pub meta: Meta<usize>,
}

/// An ordered, shared sequence.
#[derive(Clone, Default)]
pub struct Seq(Rc<RefCell<SeqData>>);

impl Seq {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_values(items: impl IntoIterator<Item = Value>) -> Self {
        let seq = Self::new();
        seq.0.borrow_mut().items.extend(items);
        seq
    }

    /// Whether both handles point at the same sequence.
    pub fn ptr_eq(&self, other: &Seq) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn ptr(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }

    pub fn data(&self) -> Ref<'_, SeqData> {
        self.0.borrow()
    }

    pub fn data_mut(&self) -> RefMut<'_, SeqData> {
        self.0.borrow_mut()
    }

    pub fn len(&self) -> usize {
        self.0.borrow().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Value> {
        self.0.borrow().items.get(index).cloned()
    }

    /// Replace the item at `index`, keeping its comments.
    pub fn set(&self, index: usize, value: impl Into<Value>) -> Option<Value> {
        let mut data = self.0.borrow_mut();
        let slot = data.items.get_mut(index)?;
        Some(std::mem::replace(slot, value.into()))
    }

    pub fn push(&self, value: impl Into<Value>) {
        self.0.borrow_mut().items.push(value.into());
    }

    /// Insert at `index`. Comments of later items move with them.
    pub fn insert(&self, index: usize, value: impl Into<Value>) {
        let mut data = self.0.borrow_mut();
        let index = index.min(data.items.len());
        data.items.insert(index, value.into());
        data.meta.items = std::mem::take(&mut data.meta.items)
            .into_iter()
            .map(|(i, meta)| if i >= index { (i + 1, meta) } else { (i, meta) })
            .collect();
    }

    /// Remove the item at `index` together with its comments.
    pub fn remove(&self, index: usize) -> Option<Value> {
        let mut data = self.0.borrow_mut();
        if index >= data.items.len() {
            return None;
        }
        let value = data.items.remove(index);
        data.meta.items = std::mem::take(&mut data.meta.items)
            .into_iter()
            .filter(|(i, _)| *i != index)
            .map(|(i, meta)| if i > index { (i - 1, meta) } else { (i, meta) })
            .collect();
        Some(value)
    }

    /// A snapshot of the items.
    pub fn to_vec(&self) -> Vec<Value> {
        self.0.borrow().items.clone()
    }

    pub fn anchor(&self) -> Option<String> {
        self.0.borrow().meta.anchor.clone()
    }

    pub fn set_anchor(&self, anchor: Option<String>) {
        self.0.borrow_mut().meta.anchor = anchor;
    }

    pub fn tag(&self) -> Option<String> {
        self.0.borrow().meta.tag.clone()
    }

    pub fn set_tag(&self, tag: Option<String>) {
        self.0.borrow_mut().meta.tag = tag;
    }

    pub fn flow_style(&self) -> Option<bool> {
        self.0.borrow().meta.flow_style
    }

    pub fn set_flow_style(&self, flow: bool) {
        self.0.borrow_mut().meta.flow_style = Some(flow);
    }

    pub fn set_block_style(&self) {
        self.set_flow_style(false);
    }

    /// Where the sequence started in the source.
    pub fn line_col(&self) -> Option<Mark> {
        self.0.borrow().meta.mark
    }

    /// Where item `index` started in the source.
    pub fn item_line_col(&self, index: usize) -> Option<Mark> {
        self.0.borrow().meta.item(&index)?.value_mark
    }

    pub fn set_start_comment(&self, text: &str, column: usize) {
        replace_comment(&mut self.0.borrow_mut().meta.start_comment, text, column);
    }

    pub fn set_end_comment(&self, text: &str, column: usize) {
        replace_comment(&mut self.0.borrow_mut().meta.end_comment, text, column);
    }

    /// Set the comment after item `index` on its line.
    pub fn set_eol_comment(&self, index: usize, text: &str) {
        self.0.borrow_mut().meta.item_mut(index).value_comment.eol = Some(Comment::eol(text));
    }

    /// Set the comment lines written before item `index`.
    pub fn set_comment_before(&self, index: usize, text: &str, column: usize) {
        self.0.borrow_mut().meta.item_mut(index).value_comment.pre = comment_lines(text, column);
    }

    pub fn eol_comment(&self, index: usize) -> Option<Comment> {
        self.0.borrow().meta.item(&index)?.value_comment.eol.clone()
    }

    pub fn comment_before(&self, index: usize) -> Vec<Comment> {
        self.0
            .borrow()
            .meta
            .item(&index)
            .map(|meta| meta.value_comment.pre.clone())
            .unwrap_or_default()
    }
}

impl From<Vec<Value>> for Seq {
    fn from(items: Vec<Value>) -> Self {
        Seq::from_values(items)
    }
}

impl PartialEq for Seq {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || self.0.borrow().items == other.0.borrow().items
    }
}

impl Eq for Seq {}

impl Hash for Seq {
    /// Length and scalar items only, so a sequence that contains itself can
    /// still be hashed.
    fn hash<H: Hasher>(&self, state: &mut H) {
        let data = self.0.borrow();
        data.items.len().hash(state);
        for item in &data.items {
            if !matches!(item, Value::Seq(_) | Value::Map(_)) {
                item.hash(state);
            }
        }
    }
}

impl fmt::Debug for Seq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        guarded(self.ptr(), f, |f| f.debug_list().entries(self.0.borrow().items.iter()).finish())
    }
}

// Mappings

#[derive(Default)]
pub struct MapData {
    /// Own entries, in insertion order.
    pub entries: IndexMap<Value, Value>,
    pub merge: Option<Merge>,
    pub meta: Meta<Value>,
}

/// An insertion-ordered, shared mapping.
///
/// Lookups fall back to the mappings merged in with `<<`, but only own
/// entries are stored: removing an own key that a merge source also defines
/// makes the merged value visible again.
#[derive(Clone, Default)]
pub struct Map(Rc<RefCell<MapData>>);

impl Map {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ptr_eq(&self, other: &Map) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn ptr(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }

    pub fn data(&self) -> Ref<'_, MapData> {
        self.0.borrow()
    }

    pub fn data_mut(&self) -> RefMut<'_, MapData> {
        self.0.borrow_mut()
    }

    /// Number of visible keys, own and merged.
    pub fn len(&self) -> usize {
        self.keys().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The value for `key`, from own entries first, then merge sources.
    pub fn get(&self, key: impl Into<Value>) -> Option<Value> {
        self.lookup(&key.into())
    }

    fn lookup(&self, key: &Value) -> Option<Value> {
        let data = self.0.borrow();
        if let Some(value) = data.entries.get(key) {
            return Some(value.clone());
        }
        let merge = data.merge.as_ref()?;
        merge
            .sources
            .iter()
            .filter(|source| !source.ptr_eq(self))
            .find_map(|source| source.lookup(key))
    }

    /// The value for `key` among own entries only.
    pub fn get_own(&self, key: impl Into<Value>) -> Option<Value> {
        self.0.borrow().entries.get(&key.into()).cloned()
    }

    pub fn contains_key(&self, key: impl Into<Value>) -> bool {
        self.lookup(&key.into()).is_some()
    }

    /// Whether `key` is visible only through a merge source.
    pub fn is_merged(&self, key: impl Into<Value>) -> bool {
        let key = key.into();
        !self.0.borrow().entries.contains_key(&key) && self.lookup(&key).is_some()
    }

    /// Insert or replace an own entry. A replaced entry keeps its position
    /// and comments.
    pub fn insert(&self, key: impl Into<Value>, value: impl Into<Value>) -> Option<Value> {
        self.0.borrow_mut().entries.insert(key.into(), value.into())
    }

    /// Insert at `index` among own entries. An existing key is moved.
    pub fn insert_at(&self, index: usize, key: impl Into<Value>, value: impl Into<Value>) {
        let mut data = self.0.borrow_mut();
        let key = key.into();
        let value = value.into();
        data.entries.shift_remove(&key);
        let index = index.min(data.entries.len());
        data.entries.shift_insert(index, key, value);
    }

    /// Remove an own entry and its comments.
    pub fn remove(&self, key: impl Into<Value>) -> Option<Value> {
        let key = key.into();
        let mut data = self.0.borrow_mut();
        let value = data.entries.shift_remove(&key)?;
        data.meta.items.remove(&key);
        Some(value)
    }

    /// Visible keys: own keys in order, then merged keys not shadowed by an
    /// own key.
    pub fn keys(&self) -> Vec<Value> {
        self.entries().into_iter().map(|(key, _)| key).collect()
    }

    /// Visible entries, own first, then merged.
    pub fn entries(&self) -> Vec<(Value, Value)> {
        let mut seen = HashSet::new();
        seen.insert(self.ptr());
        let mut out: IndexMap<Value, Value> = IndexMap::new();
        self.collect_entries(&mut out, &mut seen);
        out.into_iter().collect()
    }

    fn collect_entries(&self, out: &mut IndexMap<Value, Value>, seen: &mut HashSet<usize>) {
        let data = self.0.borrow();
        for (key, value) in &data.entries {
            out.entry(key.clone()).or_insert_with(|| value.clone());
        }
        if let Some(merge) = &data.merge {
            for source in &merge.sources {
                if seen.insert(source.ptr()) {
                    source.collect_entries(out, seen);
                }
            }
        }
    }

    /// Own entries only, in order.
    pub fn own_entries(&self) -> Vec<(Value, Value)> {
        self.0
            .borrow()
            .entries
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn merge(&self) -> Option<Merge> {
        self.0.borrow().merge.clone()
    }

    /// Merge `sources` in with a `<<` key written after `position` own
    /// entries.
    pub fn set_merge(&self, position: usize, sources: Vec<Map>) {
        let sequence = sources.len() > 1;
        self.0.borrow_mut().merge = Some(Merge {
            position,
            sources,
            sequence,
            comment: CommentBundle::default(),
        });
    }

    pub fn anchor(&self) -> Option<String> {
        self.0.borrow().meta.anchor.clone()
    }

    pub fn set_anchor(&self, anchor: Option<String>) {
        self.0.borrow_mut().meta.anchor = anchor;
    }

    pub fn tag(&self) -> Option<String> {
        self.0.borrow().meta.tag.clone()
    }

    pub fn set_tag(&self, tag: Option<String>) {
        self.0.borrow_mut().meta.tag = tag;
    }

    pub fn flow_style(&self) -> Option<bool> {
        self.0.borrow().meta.flow_style
    }

    pub fn set_flow_style(&self, flow: bool) {
        self.0.borrow_mut().meta.flow_style = Some(flow);
    }

    pub fn set_block_style(&self) {
        self.set_flow_style(false);
    }

    /// Where the mapping started in the source.
    pub fn line_col(&self) -> Option<Mark> {
        self.0.borrow().meta.mark
    }

    pub fn key_line_col(&self, key: impl Into<Value>) -> Option<Mark> {
        self.0.borrow().meta.item(&key.into())?.key_mark
    }

    pub fn value_line_col(&self, key: impl Into<Value>) -> Option<Mark> {
        self.0.borrow().meta.item(&key.into())?.value_mark
    }

    pub fn set_start_comment(&self, text: &str, column: usize) {
        replace_comment(&mut self.0.borrow_mut().meta.start_comment, text, column);
    }

    pub fn set_end_comment(&self, text: &str, column: usize) {
        replace_comment(&mut self.0.borrow_mut().meta.end_comment, text, column);
    }

    /// Set the comment after the value of `key` on its line.
    pub fn set_eol_comment(&self, key: impl Into<Value>, text: &str) {
        self.0.borrow_mut().meta.item_mut(key.into()).value_comment.eol = Some(Comment::eol(text));
    }

    /// Set the comment lines written before `key`.
    pub fn set_comment_before(&self, key: impl Into<Value>, text: &str, column: usize) {
        self.0.borrow_mut().meta.item_mut(key.into()).key_comment.pre = comment_lines(text, column);
    }

    pub fn eol_comment(&self, key: impl Into<Value>) -> Option<Comment> {
        self.0.borrow().meta.item(&key.into())?.value_comment.eol.clone()
    }

    pub fn comment_before(&self, key: impl Into<Value>) -> Vec<Comment> {
        self.0
            .borrow()
            .meta
            .item(&key.into())
            .map(|meta| meta.key_comment.pre.clone())
            .unwrap_or_default()
    }
}

impl<K: Into<Value>, V: Into<Value>> FromIterator<(K, V)> for Map {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let map = Map::new();
        {
            let mut data = map.0.borrow_mut();
            for (key, value) in iter {
                data.entries.insert(key.into(), value.into());
            }
        }
        map
    }
}

impl PartialEq for Map {
    /// Compares visible entries regardless of order.
    fn eq(&self, other: &Self) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        let ours = self.entries();
        let theirs = other.entries();
        if ours.len() != theirs.len() {
            return false;
        }
        let theirs: HashMap<Value, Value> = theirs.into_iter().collect();
        ours.iter().all(|(key, value)| theirs.get(key) == Some(value))
    }
}

impl Eq for Map {}

impl Hash for Map {
    /// Only the number of entries, which is order independent and safe for
    /// mappings that contain themselves.
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.borrow().entries.len().hash(state);
    }
}

impl fmt::Debug for Map {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        guarded(self.ptr(), f, |f| f.debug_map().entries(self.entries()).finish())
    }
}
