//! Namespace trie used for longest-match IRI shortening.
//!
//! Namespaces are stored as whole string fragments rather than bytes: a node's
//! key is a full registered namespace and every descendant key extends it. Two
//! siblings never prefix one another, so a single descent that follows the
//! first matching child always ends at the longest registered namespace.

use std::collections::HashMap;

use unicode_general_category::{get_general_category, GeneralCategory};

/// Index of a node inside a [`NamespaceTrie`].
pub type NodeId = usize;

/// The root node. Its key is the empty string and it is never a namespace.
pub const ROOT: NodeId = 0;

/// Characters that may appear inside a local name even though their
/// general category is not a name category.
const ALLOWED_NAME_CHARS: [char; 8] = ['\u{00B7}', '\u{0387}', '-', '.', '_', '%', '(', ')'];

#[derive(Debug, Clone)]
struct TrieNode {
    key: String,
    children: Vec<NodeId>,
}

/// Fragment trie over registered namespaces.
///
/// Nodes live in a flat arena so a [`NodeId`] stays valid when an insertion
/// demotes existing keys under a new, shorter namespace. This lets callers
/// cache sub-trie handles per namespace.
#[derive(Debug, Clone)]
pub struct NamespaceTrie {
    nodes: Vec<TrieNode>,
    index: HashMap<String, NodeId>,
}

impl Default for NamespaceTrie {
    fn default() -> Self {
        Self::new()
    }
}

impl NamespaceTrie {
    /// Creates an empty trie holding only the root node.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![TrieNode {
                key: String::new(),
                children: Vec::new(),
            }],
            index: HashMap::new(),
        }
    }

    /// Inserts a namespace and returns the node holding it.
    ///
    /// Inserting a namespace that is already present is a no-op. The empty
    /// string maps to [`ROOT`].
    pub fn insert(&mut self, namespace: &str) -> NodeId {
        if namespace.is_empty() {
            return ROOT;
        }
        if let Some(&node) = self.index.get(namespace) {
            return node;
        }

        let mut parent = ROOT;
        'descend: loop {
            for &child in &self.nodes[parent].children {
                let key = &self.nodes[child].key;
                if namespace.len() > key.len() && namespace.starts_with(key.as_str()) {
                    parent = child;
                    continue 'descend;
                }
            }
            break;
        }

        let node = self.nodes.len();
        let (demoted, kept): (Vec<NodeId>, Vec<NodeId>) = self.nodes[parent]
            .children
            .iter()
            .partition(|&&child| self.nodes[child].key.starts_with(namespace));

        self.nodes.push(TrieNode {
            key: namespace.to_owned(),
            children: demoted,
        });
        let siblings = &mut self.nodes[parent].children;
        *siblings = kept;
        siblings.push(node);
        self.index.insert(namespace.to_owned(), node);
        node
    }

    /// Returns the node of a namespace inserted verbatim.
    #[must_use]
    pub fn get(&self, namespace: &str) -> Option<NodeId> {
        self.index.get(namespace).copied()
    }

    #[must_use]
    pub fn contains(&self, namespace: &str) -> bool {
        self.index.contains_key(namespace)
    }

    /// Returns the namespace stored at `node`.
    #[must_use]
    pub fn key(&self, node: NodeId) -> &str {
        self.nodes.get(node).map_or("", |node| node.key.as_str())
    }

    /// Returns the direct children of `node`.
    #[must_use]
    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.nodes
            .get(node)
            .map_or(&[][..], |node| node.children.as_slice())
    }

    /// Finds the deepest namespace below `from` that prefixes `value`.
    ///
    /// `from` itself is not reported; callers that already know `from`
    /// matches use it as the fallback.
    #[must_use]
    pub fn longest_match(&self, from: NodeId, value: &str) -> Option<NodeId> {
        self.path_from(from, value).last().copied()
    }

    /// Returns every namespace on the root path that prefixes `value`,
    /// shortest first. Equal keys count as a match.
    #[must_use]
    pub fn ancestors(&self, value: &str) -> Vec<NodeId> {
        self.path_from(ROOT, value)
    }

    fn path_from(&self, from: NodeId, value: &str) -> Vec<NodeId> {
        let mut path = Vec::new();
        let mut node = from;
        'descend: loop {
            for &child in self.children(node) {
                if value.starts_with(self.nodes[child].key.as_str()) {
                    path.push(child);
                    node = child;
                    continue 'descend;
                }
            }
            return path;
        }
    }

    /// Number of namespaces stored in the trie.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Iterates over the stored namespaces in insertion order.
    pub fn namespaces(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().skip(1).map(|node| node.key.as_str())
    }
}

fn is_name_start(c: char) -> bool {
    matches!(
        get_general_category(c),
        GeneralCategory::LowercaseLetter
            | GeneralCategory::UppercaseLetter
            | GeneralCategory::OtherLetter
            | GeneralCategory::TitlecaseLetter
            | GeneralCategory::LetterNumber
    )
}

fn is_split_start(c: char) -> bool {
    is_name_start(c) || get_general_category(c) == GeneralCategory::DecimalNumber
}

fn is_name_char(c: char) -> bool {
    is_split_start(c)
        || matches!(
            get_general_category(c),
            GeneralCategory::SpacingMark
                | GeneralCategory::EnclosingMark
                | GeneralCategory::NonspacingMark
                | GeneralCategory::ModifierLetter
        )
}

/// Splits an IRI into `(namespace, local_name)` following the RDF/XML qname
/// convention.
///
/// Scanning from the end, the local name extends over name characters and
/// [`ALLOWED_NAME_CHARS`]. At the first character outside that set the scan
/// turns around and the local name starts at the next letter, digit or `_`.
/// Returns `None` when no split leaves a non-empty namespace.
#[must_use]
pub fn split_iri(iri: &str) -> Option<(&str, &str)> {
    let chars: Vec<(usize, char)> = iri.char_indices().collect();
    for position in (0..chars.len()).rev() {
        let c = chars[position].1;
        if is_name_char(c) || ALLOWED_NAME_CHARS.contains(&c) {
            continue;
        }
        return chars[position..]
            .iter()
            .find(|(_, ch)| is_split_start(*ch) || *ch == '_')
            .and_then(|&(offset, _)| (offset > 0).then(|| iri.split_at(offset)));
    }
    None
}
