//! The crawl frontier: a multiway tree of URL occurrences.
//!
//! Nodes live in an arena and are addressed by [`NodeId`], so "references"
//! returned by [`PathMap::find`] are stable handles into live tree storage
//! rather than aliasing borrows. The same normalized URL may legitimately
//! appear as a key in several nodes at once (a shared footer link shows up
//! under every page that carries it); each such occurrence resolves
//! independently. Nothing is ever deleted, the tree only grows until the
//! crawl completes and the whole map becomes the final report.

use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::BTreeMap;

/// Stable handle to one node in the frontier arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// Resolution state of one URL occurrence.
///
/// One variant per crawl outcome, plus the two structural variants
/// ([`PathValue::Links`] for a page's discovered link set and the child map
/// inside [`PathValue::Redirect`] for walking redirect chains).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathValue {
    /// Discovered, no outcome yet. Serializes as `""`.
    Unresolved,
    /// Fetched cleanly with nothing further to record. Serializes as `true`.
    Resolved,
    /// Explicitly cleared. Serializes as `false`.
    Cleared,
    /// Terminal HTTP status (404, 500, ...).
    Status(u16),
    DataError,
    GzipError,
    ClientError,
    FragmentNotFound,
    BadFragment,
    /// Redirect record: status code plus a single-entry child map keyed by
    /// the target URL, so consumers (and [`PathMap::find`]) can walk
    /// redirect chains through the tree.
    Redirect { status: u16, child: NodeId },
    /// The set of links discovered on the page at this URL.
    Links(NodeId),
}

impl PathValue {
    /// Discriminates the nested-map variants from terminal markers. This is
    /// what decides whether [`PathMap::find`] descends through a value.
    pub fn is_map(&self) -> bool {
        matches!(self, PathValue::Links(_) | PathValue::Redirect { .. })
    }

    pub fn is_unresolved(&self) -> bool {
        matches!(self, PathValue::Unresolved)
    }

    fn child(&self) -> Option<NodeId> {
        match self {
            PathValue::Links(child) | PathValue::Redirect { child, .. } => Some(*child),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct Node {
    entries: BTreeMap<String, PathValue>,
}

/// Arena-backed tree mapping normalized URLs to their resolution state.
#[derive(Debug, Clone)]
pub struct PathMap {
    nodes: Vec<Node>,
}

impl PathMap {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::default()],
        }
    }

    /// The root node, representing the site root.
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn insert(&mut self, node: NodeId, url: impl Into<String>, value: PathValue) {
        self.nodes[node.0].entries.insert(url.into(), value);
    }

    /// Allocates an empty child node and attaches it under `url`.
    pub fn insert_child(&mut self, node: NodeId, url: impl Into<String>) -> NodeId {
        let child = self.alloc(Node::default());
        self.insert(node, url, PathValue::Links(child));
        child
    }

    /// Allocates a fresh link-set node (every link starts unresolved) and
    /// attaches it under `url`.
    pub fn insert_links(&mut self, node: NodeId, url: impl Into<String>, links: &[String]) -> NodeId {
        let child = self.alloc_links(links);
        self.insert(node, url, PathValue::Links(child));
        child
    }

    /// Allocates a node not yet referenced by any entry. Used to build the
    /// single-entry child of a redirect record before attaching it.
    pub fn alloc_detached(&mut self) -> NodeId {
        self.alloc(Node::default())
    }

    pub fn get(&self, node: NodeId, url: &str) -> Option<&PathValue> {
        self.nodes[node.0].entries.get(url)
    }

    pub fn entries(&self, node: NodeId) -> impl Iterator<Item = (&str, &PathValue)> {
        self.nodes[node.0].entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Depth-first search for every node that directly contains `url` as a
    /// key, across all nesting levels. Empty means "not found".
    pub fn find(&self, url: &str) -> Vec<NodeId> {
        let mut hits = Vec::new();
        self.find_from(self.root(), url, &mut hits);
        hits
    }

    fn find_from(&self, node: NodeId, url: &str, hits: &mut Vec<NodeId>) {
        if self.nodes[node.0].entries.contains_key(url) {
            hits.push(node);
        }
        let children: Vec<NodeId> = self.nodes[node.0]
            .entries
            .values()
            .filter_map(PathValue::child)
            .collect();
        for child in children {
            self.find_from(child, url, hits);
        }
    }

    /// True iff any node contains the key; short-circuits on first match.
    pub fn contains(&self, url: &str) -> bool {
        self.contains_from(self.root(), url)
    }

    fn contains_from(&self, node: NodeId, url: &str) -> bool {
        if self.nodes[node.0].entries.contains_key(url) {
            return true;
        }
        self.nodes[node.0]
            .entries
            .values()
            .filter_map(PathValue::child)
            .any(|child| self.contains_from(child, url))
    }

    /// Assigns `value` to every occurrence of `url`. Values carrying a
    /// nested map are deep-cloned for each occurrence past the first, so
    /// occurrence link sets never alias each other. Returns false when the
    /// URL has no occurrence anywhere.
    pub fn set_result(&mut self, url: &str, value: PathValue) -> bool {
        let hits = self.find(url);
        for (i, node) in hits.iter().enumerate() {
            let per_occurrence = if i == 0 {
                value.clone()
            } else {
                self.clone_value(&value)
            };
            self.nodes[node.0].entries.insert(url.to_string(), per_occurrence);
        }
        !hits.is_empty()
    }

    /// Transformation form of [`set_result`](Self::set_result): each
    /// occurrence's current value is fed through `f` and replaced with the
    /// return value. Supports the promote-only-if-still-unresolved merge
    /// used for plain fetch completions.
    pub fn set_result_with<F>(&mut self, url: &str, f: F) -> bool
    where
        F: Fn(&PathValue) -> PathValue,
    {
        let hits = self.find(url);
        for node in &hits {
            let current = self.nodes[node.0]
                .entries
                .get(url)
                .cloned()
                .unwrap_or(PathValue::Unresolved);
            let next = f(&current);
            self.nodes[node.0].entries.insert(url.to_string(), next);
        }
        !hits.is_empty()
    }

    /// Replaces the value of every occurrence of `page_url` with a fresh
    /// link-set node built from `links`. Each occurrence gets its own child
    /// node. Returns false when the page has no occurrence yet.
    pub fn record_links(&mut self, page_url: &str, links: &[String]) -> bool {
        let hits = self.find(page_url);
        for node in &hits {
            let child = self.alloc_links(links);
            self.nodes[node.0]
                .entries
                .insert(page_url.to_string(), PathValue::Links(child));
        }
        !hits.is_empty()
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    fn alloc_links(&mut self, links: &[String]) -> NodeId {
        let mut node = Node::default();
        for link in links {
            node.entries.insert(link.clone(), PathValue::Unresolved);
        }
        self.alloc(node)
    }

    fn clone_value(&mut self, value: &PathValue) -> PathValue {
        match value {
            PathValue::Links(child) => PathValue::Links(self.clone_subtree(*child)),
            PathValue::Redirect { status, child } => PathValue::Redirect {
                status: *status,
                child: self.clone_subtree(*child),
            },
            terminal => terminal.clone(),
        }
    }

    fn clone_subtree(&mut self, node: NodeId) -> NodeId {
        let entries = self.nodes[node.0].entries.clone();
        let mut copy = Node::default();
        for (url, value) in entries {
            let value = self.clone_value(&value);
            copy.entries.insert(url, value);
        }
        self.alloc(copy)
    }
}

impl Default for PathMap {
    fn default() -> Self {
        Self::new()
    }
}

struct ValueRef<'a> {
    map: &'a PathMap,
    value: &'a PathValue,
}

impl Serialize for ValueRef<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.value {
            PathValue::Unresolved => serializer.serialize_str(""),
            PathValue::Resolved => serializer.serialize_bool(true),
            PathValue::Cleared => serializer.serialize_bool(false),
            PathValue::Status(code) => serializer.serialize_u16(*code),
            PathValue::DataError => serializer.serialize_str("dataerror"),
            PathValue::GzipError => serializer.serialize_str("gziperror"),
            PathValue::ClientError => serializer.serialize_str("clienterror"),
            PathValue::FragmentNotFound => serializer.serialize_str("fragment_not_found"),
            PathValue::BadFragment => serializer.serialize_str("bad_fragment"),
            PathValue::Redirect { status, child } => {
                let entries = &self.map.nodes[child.0].entries;
                let mut out = serializer.serialize_map(Some(entries.len() + 2))?;
                out.serialize_entry("redirect", &true)?;
                out.serialize_entry("statusCode", status)?;
                for (url, value) in entries {
                    out.serialize_entry(url, &ValueRef { map: self.map, value })?;
                }
                out.end()
            }
            PathValue::Links(child) => NodeRef {
                map: self.map,
                id: *child,
            }
            .serialize(serializer),
        }
    }
}

struct NodeRef<'a> {
    map: &'a PathMap,
    id: NodeId,
}

impl Serialize for NodeRef<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let entries = &self.map.nodes[self.id.0].entries;
        let mut out = serializer.serialize_map(Some(entries.len()))?;
        for (url, value) in entries {
            out.serialize_entry(url, &ValueRef { map: self.map, value })?;
        }
        out.end()
    }
}

impl Serialize for PathMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        NodeRef {
            map: self,
            id: self.root(),
        }
        .serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Fixture with the same URL recorded at two nesting levels:
    /// `{"/": {"/something/somepath": true,
    ///         "/something/otherpath": {"/something/somepath": true}}}`
    fn two_occurrence_tree() -> PathMap {
        let mut map = PathMap::new();
        let root = map.root();
        let level1 = map.insert_child(root, "/");
        map.insert(level1, "/something/somepath", PathValue::Resolved);
        let level2 = map.insert_child(level1, "/something/otherpath");
        map.insert(level2, "/something/somepath", PathValue::Resolved);
        map
    }

    #[test]
    fn find_returns_every_occurrence() {
        let map = two_occurrence_tree();
        let hits = map.find("/something/somepath");
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn find_handles_mutate_live_tree_independently() {
        let mut map = two_occurrence_tree();
        let hits = map.find("/something/somepath");
        map.insert(hits[0], "/something/somepath", PathValue::Cleared);
        map.insert(hits[1], "/something/somepath", PathValue::Status(404));
        let hits = map.find("/something/somepath");
        assert_eq!(map.get(hits[0], "/something/somepath"), Some(&PathValue::Cleared));
        assert_eq!(map.get(hits[1], "/something/somepath"), Some(&PathValue::Status(404)));
    }

    #[test]
    fn contains_matches_deeply_nested_keys() {
        let mut map = PathMap::new();
        let root = map.root();
        let level1 = map.insert_child(root, "/");
        map.insert(level1, "/something", PathValue::Resolved);
        let level2 = map.insert_child(level1, "/somethingelse");
        map.insert(level2, "/somethingelse/nothing", PathValue::Resolved);
        let level3 = map.insert_child(level2, "/somethingelse/level3");
        map.insert(level3, "/somethingelse/level3/target", PathValue::Unresolved);

        assert!(map.contains("/somethingelse/level3/target"));
        assert!(!map.contains("/somethingelse/level3/nada"));
    }

    #[test]
    fn contains_agrees_with_find() {
        let map = two_occurrence_tree();
        for url in ["/", "/something/somepath", "/something/otherpath", "/nope"] {
            assert_eq!(map.contains(url), !map.find(url).is_empty(), "disagreement on {url}");
        }
    }

    #[test]
    fn is_map_discriminates_structural_values() {
        let mut map = PathMap::new();
        let root = map.root();
        let child = map.insert_child(root, "/page");
        assert!(PathValue::Links(child).is_map());
        assert!(PathValue::Redirect { status: 301, child }.is_map());
        assert!(!PathValue::Resolved.is_map());
        assert!(!PathValue::Status(404).is_map());
        assert!(!PathValue::Unresolved.is_map());
        assert!(!PathValue::DataError.is_map());
    }

    #[test]
    fn set_result_updates_all_occurrences() {
        let mut map = two_occurrence_tree();
        assert!(map.set_result("/something/somepath", PathValue::Status(500)));
        for node in map.find("/something/somepath") {
            assert_eq!(map.get(node, "/something/somepath"), Some(&PathValue::Status(500)));
        }
    }

    #[test]
    fn set_result_reports_missing_urls() {
        let mut map = two_occurrence_tree();
        assert!(!map.set_result("/not/here", PathValue::Status(500)));
    }

    #[test]
    fn record_links_gives_each_occurrence_an_independent_child() {
        let mut map = two_occurrence_tree();
        let links = vec!["/a".to_string(), "/b".to_string()];
        assert!(map.record_links("/something/somepath", &links));

        let hits = map.find("/something/somepath");
        assert_eq!(hits.len(), 2);
        let children: Vec<NodeId> = hits
            .iter()
            .map(|n| match map.get(*n, "/something/somepath") {
                Some(PathValue::Links(child)) => *child,
                other => panic!("expected links, got {:?}", other),
            })
            .collect();
        assert_ne!(children[0], children[1]);

        // resolving one occurrence's copy of a link leaves the other alone
        map.insert(children[0], "/a", PathValue::Status(404));
        assert_eq!(map.get(children[0], "/a"), Some(&PathValue::Status(404)));
        assert_eq!(map.get(children[1], "/a"), Some(&PathValue::Unresolved));
    }

    #[test]
    fn set_result_with_promotes_only_unresolved() {
        let mut map = PathMap::new();
        let root = map.root();
        map.insert(root, "/fresh", PathValue::Unresolved);
        map.insert(root, "/gone", PathValue::Status(404));

        let promote = |old: &PathValue| {
            if old.is_unresolved() {
                PathValue::Resolved
            } else {
                old.clone()
            }
        };
        map.set_result_with("/fresh", promote);
        map.set_result_with("/gone", promote);

        assert_eq!(map.get(root, "/fresh"), Some(&PathValue::Resolved));
        assert_eq!(map.get(root, "/gone"), Some(&PathValue::Status(404)));
    }

    #[test]
    fn find_descends_into_redirect_records() {
        let mut map = PathMap::new();
        let root = map.root();
        let child = map.alloc_detached();
        map.insert(child, "http://site.test/b", PathValue::Unresolved);
        map.insert(root, "http://site.test/a", PathValue::Redirect { status: 301, child });

        assert!(map.contains("http://site.test/b"));
        assert_eq!(map.find("http://site.test/b"), vec![child]);
    }

    #[test]
    fn serializes_to_report_shape() {
        let mut map = PathMap::new();
        let root = map.root();
        let page = map.insert_child(root, "http://site.test/a");
        map.insert(page, "http://site.test/a/b", PathValue::Resolved);
        map.insert(page, "http://site.test/a/c", PathValue::Status(404));
        map.insert(page, "http://site.test/a/d", PathValue::Unresolved);
        map.insert(page, "http://site.test/a/e", PathValue::DataError);

        let redirect_child = map.alloc_detached();
        map.insert(redirect_child, "http://site.test/b", PathValue::Unresolved);
        map.insert(
            page,
            "http://site.test/a/r",
            PathValue::Redirect { status: 301, child: redirect_child },
        );

        let json = serde_json::to_value(&map).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "http://site.test/a": {
                    "http://site.test/a/b": true,
                    "http://site.test/a/c": 404,
                    "http://site.test/a/d": "",
                    "http://site.test/a/e": "dataerror",
                    "http://site.test/a/r": {
                        "redirect": true,
                        "statusCode": 301,
                        "http://site.test/b": ""
                    }
                }
            })
        );
    }
}
