//! Tree model mirroring one page's DOM snapshot
//!
//! Records live in an arena owned by [`SnapshotModel`]. Views address them
//! either through row/column coordinates ([`SnapshotModel::index`]) or by
//! walking [`SnapshotModel::preorder`]. Every structural change bumps a
//! revision published on a `watch` channel.

use tokio::sync::watch;
use tracing::debug;

use crate::types::ElementRecord;

/// Column headers exposed to views
pub const HEADERS: [&str; 5] = ["Element", "ID", "Name", "Type", "Value"];

/// Label of the synthetic root node
pub const ROOT_LABEL: &str = "Document";

/// Handle to a node in the current snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl NodeId {
    /// The synthetic document root
    pub const ROOT: NodeId = NodeId(0);
}

/// Row/column coordinate of a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelIndex {
    pub node: NodeId,
    pub row: usize,
    pub column: usize,
}

#[derive(Debug)]
struct Node {
    record: ElementRecord,
    parent: Option<NodeId>,
    row: usize,
    children: Vec<NodeId>,
}

/// Tree model of the last successfully loaded page
#[derive(Debug)]
pub struct SnapshotModel {
    nodes: Vec<Node>,
    revision: watch::Sender<u64>,
}

impl Default for SnapshotModel {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotModel {
    pub fn new() -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            nodes: vec![Self::root_node()],
            revision,
        }
    }

    fn root_node() -> Node {
        Node {
            record: ElementRecord::new(ROOT_LABEL),
            parent: None,
            row: 0,
            children: Vec::new(),
        }
    }

    /// Subscribe to structural-change notifications
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    /// Current structural revision
    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    fn notify_changed(&self) {
        self.revision.send_modify(|rev| *rev += 1);
    }

    /// Discard the tree and install an empty document root
    pub fn reset(&mut self) {
        self.nodes.clear();
        self.nodes.push(Self::root_node());
        self.notify_changed();
    }

    /// Insert `elements` (and their subtrees, pre-order) under `parent`
    pub fn populate(&mut self, elements: &[ElementRecord], parent: NodeId) {
        if parent.0 >= self.nodes.len() {
            debug!("Ignoring populate under unknown node {:?}", parent);
            return;
        }
        for element in elements {
            self.insert(element, parent);
        }
        debug!("Snapshot now holds {} elements", self.len());
        self.notify_changed();
    }

    fn insert(&mut self, element: &ElementRecord, parent: NodeId) {
        let id = NodeId(self.nodes.len());
        let row = self.nodes[parent.0].children.len();
        self.nodes.push(Node {
            record: element.detached(),
            parent: Some(parent),
            row,
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);

        for child in &element.children {
            self.insert(child, id);
        }
    }

    /// Number of element nodes, excluding the synthetic root
    pub fn len(&self) -> usize {
        self.nodes.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn column_count(&self) -> usize {
        HEADERS.len()
    }

    pub fn header(&self, column: usize) -> Option<&'static str> {
        HEADERS.get(column).copied()
    }

    /// Number of children under `parent` (`None` means the root)
    pub fn row_count(&self, parent: Option<&ModelIndex>) -> usize {
        let parent = parent.map_or(NodeId::ROOT, |p| p.node);
        self.nodes.get(parent.0).map_or(0, |n| n.children.len())
    }

    /// The `row`th child of `parent` at `column`, or `None` when out of range
    pub fn index(&self, row: usize, column: usize, parent: Option<&ModelIndex>) -> Option<ModelIndex> {
        if column >= self.column_count() {
            return None;
        }
        let parent = parent.map_or(NodeId::ROOT, |p| p.node);
        let node = *self.nodes.get(parent.0)?.children.get(row)?;
        Some(ModelIndex { node, row, column })
    }

    /// Parent cell of `index`; `None` for top-level rows
    pub fn parent(&self, index: &ModelIndex) -> Option<ModelIndex> {
        let parent = self.nodes.get(index.node.0)?.parent?;
        if parent == NodeId::ROOT {
            return None;
        }
        Some(ModelIndex {
            node: parent,
            row: self.nodes[parent.0].row,
            column: 0,
        })
    }

    /// Display text for a cell
    pub fn data(&self, index: &ModelIndex) -> Option<&str> {
        let record = self.record(index.node)?;
        let text = match index.column {
            0 => &record.tag,
            1 => &record.id,
            2 => &record.name,
            3 => &record.element_type,
            4 => &record.value,
            _ => return None,
        };
        Some(text.as_str())
    }

    /// Record stored at `node`, without its children
    pub fn record(&self, node: NodeId) -> Option<&ElementRecord> {
        self.nodes.get(node.0).map(|n| &n.record)
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        match self.nodes.get(node.0) {
            Some(n) => &n.children,
            None => &[],
        }
    }

    /// Element nodes in pre-order, root excluded
    pub fn preorder(&self) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.len());
        let mut stack: Vec<NodeId> = self.children(NodeId::ROOT).iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.children(id).iter().rev().copied());
        }
        out
    }

    /// Resolve a dotted row path such as `0.1.2` through the addressing contract
    pub fn resolve_path(&self, path: &str) -> Option<ModelIndex> {
        let mut current: Option<ModelIndex> = None;
        for part in path.trim().split('.') {
            let row = part.parse::<usize>().ok()?;
            current = Some(self.index(row, 0, current.as_ref())?);
        }
        current
    }

    /// Dotted row path of `index`, the inverse of [`resolve_path`](Self::resolve_path)
    pub fn path_of(&self, index: &ModelIndex) -> String {
        let mut rows = vec![index.row];
        let mut current = *index;
        while let Some(parent) = self.parent(&current) {
            rows.push(parent.row);
            current = parent;
        }
        rows.iter()
            .rev()
            .map(|r| r.to_string())
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Depth of a node below the root (top-level rows are 0)
    pub fn depth(&self, node: NodeId) -> usize {
        let mut depth = 0;
        let mut current = self.nodes.get(node.0).and_then(|n| n.parent);
        while let Some(parent) = current {
            if parent == NodeId::ROOT {
                break;
            }
            depth += 1;
            current = self.nodes[parent.0].parent;
        }
        depth
    }

    /// Rebuild the owned record tree below the root
    pub fn to_records(&self) -> Vec<ElementRecord> {
        self.children(NodeId::ROOT)
            .iter()
            .map(|&id| self.subtree(id))
            .collect()
    }

    fn subtree(&self, node: NodeId) -> ElementRecord {
        let mut record = self.nodes[node.0].record.clone();
        record.children = self.children(node).iter().map(|&c| self.subtree(c)).collect();
        record
    }
}

#[cfg(test)]
#[path = "snapshot_test.rs"]
mod snapshot_test;
