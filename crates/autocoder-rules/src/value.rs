//! Closed value tree for decoded manifest documents.
//!
//! Every scalar is kept as its literal source text so that trigger names,
//! runner labels and step commands compare as written: `3.10` stays `3.10`
//! and `0x1F` stays `0x1F`. Mappings keep document order.

use std::collections::HashMap;

use yaml_rust2::parser::{Event, EventReceiver, Parser};
use yaml_rust2::scanner::TScalarStyle;

use crate::error::ManifestError;

/// A decoded structured-text document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueTree {
    /// Key/value pairs in declaration order.
    Mapping(Vec<(String, ValueTree)>),
    Sequence(Vec<ValueTree>),
    /// Any scalar, as written. Null and empty values are the empty string.
    Scalar(String),
}

impl ValueTree {
    /// Decode the first YAML document without type resolution.
    pub fn decode(text: &str) -> Result<Self, ManifestError> {
        let mut builder = TreeBuilder::default();
        Parser::new(text.chars()).load(&mut builder, false)?;
        Ok(builder
            .root
            .unwrap_or_else(|| ValueTree::Scalar(String::new())))
    }

    /// Value under `key` if this is a mapping containing it.
    pub fn get(&self, key: &str) -> Option<&ValueTree> {
        self.as_mapping()?
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Follow a chain of mapping keys.
    pub fn path(&self, keys: &[&str]) -> Option<&ValueTree> {
        keys.iter().try_fold(self, |node, key| node.get(key))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ValueTree::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[ValueTree]> {
        match self {
            ValueTree::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&[(String, ValueTree)]> {
        match self {
            ValueTree::Mapping(entries) => Some(entries),
            _ => None,
        }
    }

    /// First mapping entry in declaration order.
    pub fn first_entry(&self) -> Option<(&str, &ValueTree)> {
        self.as_mapping()?
            .first()
            .map(|(k, v)| (k.as_str(), v))
    }

    /// Scalars of a sequence, in order. `None` unless every item is a scalar.
    pub fn str_items(&self) -> Option<Vec<&str>> {
        self.as_sequence()?.iter().map(ValueTree::as_str).collect()
    }

    /// Membership test: a mapping key, a scalar sequence item, or the scalar
    /// itself.
    pub fn contains(&self, needle: &str) -> bool {
        match self {
            ValueTree::Mapping(entries) => entries.iter().any(|(k, _)| k == needle),
            ValueTree::Sequence(items) => items.iter().any(|item| item.as_str() == Some(needle)),
            ValueTree::Scalar(s) => s == needle,
        }
    }

    /// Empty scalar, mapping or sequence.
    pub fn is_empty(&self) -> bool {
        match self {
            ValueTree::Mapping(entries) => entries.is_empty(),
            ValueTree::Sequence(items) => items.is_empty(),
            ValueTree::Scalar(s) => s.is_empty(),
        }
    }
}

enum Frame {
    Sequence {
        anchor: usize,
        items: Vec<ValueTree>,
    },
    Mapping {
        anchor: usize,
        entries: Vec<(String, ValueTree)>,
        key: Option<String>,
    },
}

/// Assembles a [`ValueTree`] from parser events.
#[derive(Default)]
struct TreeBuilder {
    stack: Vec<Frame>,
    anchors: HashMap<usize, ValueTree>,
    root: Option<ValueTree>,
}

impl TreeBuilder {
    fn complete(&mut self, anchor: usize, node: ValueTree) {
        // Anchor id 0 means the node carries no anchor.
        if anchor > 0 {
            self.anchors.insert(anchor, node.clone());
        }
        self.push(node);
    }

    fn push(&mut self, node: ValueTree) {
        match self.stack.last_mut() {
            None => {
                if self.root.is_none() {
                    self.root = Some(node);
                }
            }
            Some(Frame::Sequence { items, .. }) => items.push(node),
            Some(Frame::Mapping { entries, key, .. }) => match key.take() {
                None => *key = Some(key_text(node)),
                Some(k) => entries.push((k, node)),
            },
        }
    }
}

impl EventReceiver for TreeBuilder {
    fn on_event(&mut self, ev: Event) {
        match ev {
            Event::Scalar(text, style, anchor, ..) => {
                self.complete(anchor, ValueTree::Scalar(scalar_text(text, style)));
            }
            Event::Alias(id) => {
                let node = self
                    .anchors
                    .get(&id)
                    .cloned()
                    .unwrap_or_else(|| ValueTree::Scalar(String::new()));
                self.push(node);
            }
            Event::SequenceStart(anchor, ..) => self.stack.push(Frame::Sequence {
                anchor,
                items: Vec::new(),
            }),
            Event::MappingStart(anchor, ..) => self.stack.push(Frame::Mapping {
                anchor,
                entries: Vec::new(),
                key: None,
            }),
            Event::SequenceEnd | Event::MappingEnd => {
                if let Some(frame) = self.stack.pop() {
                    let (anchor, node) = match frame {
                        Frame::Sequence { anchor, items } => (anchor, ValueTree::Sequence(items)),
                        Frame::Mapping {
                            anchor, entries, ..
                        } => (anchor, ValueTree::Mapping(entries)),
                    };
                    self.complete(anchor, node);
                }
            }
            _ => {}
        }
    }
}

/// Plain null spellings (the parser reports an empty value as `~`) become
/// the empty string; everything else keeps its source text.
fn scalar_text(text: String, style: TScalarStyle) -> String {
    let is_null = matches!(text.as_str(), "~" | "null" | "Null" | "NULL");
    if is_null && matches!(style, TScalarStyle::Plain) {
        String::new()
    } else {
        text
    }
}

fn key_text(key: ValueTree) -> String {
    match key {
        ValueTree::Scalar(s) => s,
        complex => format!("{complex:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WORKFLOW: &str = r#"
name: AutoCoder
on:
  push:
    branches: [main]
  issues:
    types: [opened, reopened]
jobs:
  zeta:
    runs-on: ubuntu-latest
    timeout-minutes: 10
    continue-on-error: true
    steps:
      - uses: actions/checkout@v4
      - run: echo "Hello, world!"
  alpha:
    runs-on: windows-latest
"#;

    #[test]
    fn test_decode_preserves_job_order() {
        let doc = ValueTree::decode(WORKFLOW).unwrap();
        let (name, job) = doc.get("jobs").unwrap().first_entry().unwrap();
        assert_eq!(name, "zeta");
        assert_eq!(job.get("runs-on").unwrap().as_str(), Some("ubuntu-latest"));
    }

    #[test]
    fn test_scalars_stay_text() {
        let doc = ValueTree::decode(WORKFLOW).unwrap();
        let job = doc.path(&["jobs", "zeta"]).unwrap();
        assert_eq!(job.get("timeout-minutes").unwrap().as_str(), Some("10"));
        assert_eq!(job.get("continue-on-error").unwrap().as_str(), Some("true"));
    }

    #[test]
    fn test_on_key_is_not_boolean() {
        let doc = ValueTree::decode("on: push\n").unwrap();
        assert_eq!(doc.get("on").unwrap().as_str(), Some("push"));
    }

    #[test]
    fn test_null_decodes_as_empty_scalar() {
        let doc = ValueTree::decode("on:\n  push:\n  issues:\n").unwrap();
        let on = doc.get("on").unwrap();
        assert!(on.contains("push"));
        assert_eq!(on.get("issues"), Some(&ValueTree::Scalar(String::new())));
    }

    #[test]
    fn test_membership_forms() {
        let doc = ValueTree::decode("a: [x, y]\nb: x\nc: {x: 1}\n").unwrap();
        assert!(doc.get("a").unwrap().contains("y"));
        assert!(doc.get("b").unwrap().contains("x"));
        assert!(!doc.get("b").unwrap().contains("xx"));
        assert!(doc.get("c").unwrap().contains("x"));
    }

    #[test]
    fn test_steps_sequence_order() {
        let doc = ValueTree::decode(WORKFLOW).unwrap();
        let steps = doc.path(&["jobs", "zeta", "steps"]).unwrap().as_sequence().unwrap();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].get("uses").unwrap().as_str(), Some("actions/checkout@v4"));
        assert_eq!(steps[1].get("run").unwrap().as_str(), Some("echo \"Hello, world!\""));
    }

    #[test]
    fn test_absent_paths_return_none() {
        let doc = ValueTree::decode(WORKFLOW).unwrap();
        assert!(doc.path(&["jobs", "missing", "steps"]).is_none());
        assert!(doc.path(&["name", "nested"]).is_none());
    }

    #[test]
    fn test_empty_document() {
        assert!(ValueTree::decode("").unwrap().is_empty());
        assert!(ValueTree::decode("   \n").unwrap().is_empty());
    }

    #[test]
    fn test_numbers_keep_source_text() {
        let doc = ValueTree::decode("a: 3.10\nb: 0x1F\ne: 1e3\nf: +5\ng: 007\n").unwrap();
        assert_eq!(doc.get("a").unwrap().as_str(), Some("3.10"));
        assert_eq!(doc.get("b").unwrap().as_str(), Some("0x1F"));
        assert_eq!(doc.get("e").unwrap().as_str(), Some("1e3"));
        assert_eq!(doc.get("f").unwrap().as_str(), Some("+5"));
        assert_eq!(doc.get("g").unwrap().as_str(), Some("007"));
    }

    #[test]
    fn test_booleans_keep_source_text() {
        let doc = ValueTree::decode("a: yes\nb: True\n").unwrap();
        assert_eq!(doc.get("a").unwrap().as_str(), Some("yes"));
        assert_eq!(doc.get("b").unwrap().as_str(), Some("True"));
    }

    #[test]
    fn test_quoted_null_is_text() {
        let doc = ValueTree::decode("a: 'null'\nb: null\nc: ~\n").unwrap();
        assert_eq!(doc.get("a").unwrap().as_str(), Some("null"));
        assert_eq!(doc.get("b").unwrap().as_str(), Some(""));
        assert_eq!(doc.get("c").unwrap().as_str(), Some(""));
    }

    #[test]
    fn test_alias_resolves_to_anchored_node() {
        let doc = ValueTree::decode("base: &b [opened, reopened]\ncopy: *b\n").unwrap();
        assert_eq!(doc.get("copy"), doc.get("base"));
        assert!(doc.get("copy").unwrap().contains("reopened"));
    }

    #[test]
    fn test_only_first_document() {
        let doc = ValueTree::decode("a: 1\n---\nb: 2\n").unwrap();
        assert_eq!(doc.get("a").unwrap().as_str(), Some("1"));
        assert!(doc.get("b").is_none());
    }

    #[test]
    fn test_invalid_yaml_is_error() {
        assert!(ValueTree::decode("jobs: [unclosed").is_err());
    }
}
