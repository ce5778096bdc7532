use super::ResourceRecord;
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TreeError {
    #[error("duplicate resource id: {0}")]
    DuplicateId(String),

    #[error("resource {0} is its own ancestor")]
    Cycle(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Slot {
    record: ResourceRecord,
    parent: Option<usize>,
    children: Vec<usize>,
}

/// Ordered forest of course resources.
///
/// Nodes live in an arena and are addressed by their position in it. Children
/// are stored as ordered index lists, so a forest is cheap to clone and safe to
/// read from anywhere once built. It is never updated in place; when the
/// underlying records change, build a new one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Forest {
    slots: Vec<Slot>,
    roots: Vec<usize>,
    index: HashMap<String, usize>,
    orphans: Vec<usize>,
}

impl Forest {
    /// Link a flat batch of records into a forest.
    ///
    /// Records are indexed first and linked in a second, flat pass. A record
    /// whose parent is not in the batch becomes a root. Siblings end up ordered
    /// by `order_index`, ties keep the input order.
    ///
    /// The whole batch is rejected on a duplicate id or when the parent links
    /// contain a cycle.
    pub fn build(records: Vec<ResourceRecord>) -> Result<Self, TreeError> {
        let mut index = HashMap::with_capacity(records.len());

        for (i, record) in records.iter().enumerate() {
            if index.insert(record.id.clone(), i).is_some() {
                return Err(TreeError::DuplicateId(record.id.clone()));
            }
        }

        let mut slots = records
            .into_iter()
            .map(|record| Slot {
                record,
                parent: None,
                children: vec![],
            })
            .collect::<Vec<_>>();

        let mut roots = vec![];
        let mut orphans = vec![];

        for i in 0..slots.len() {
            let parent = match slots[i].record.parent_id.as_deref() {
                Some(parent_id) => match index.get(parent_id) {
                    Some(parent) => Some(*parent),
                    None => {
                        warn!(
                            "Resource {} references missing parent {parent_id}, placing at root",
                            slots[i].record.id
                        );
                        orphans.push(i);
                        None
                    }
                },
                None => None,
            };

            match parent {
                Some(parent) => {
                    slots[i].parent = Some(parent);
                    slots[parent].children.push(i);
                }
                None => roots.push(i),
            }
        }

        check_acyclic(&slots)?;

        sort_siblings(&slots, &mut roots);
        for i in 0..slots.len() {
            let mut children = std::mem::take(&mut slots[i].children);
            sort_siblings(&slots, &mut children);
            slots[i].children = children;
        }

        debug!(
            "Built resource forest with {} nodes and {} roots",
            slots.len(),
            roots.len()
        );

        Ok(Self {
            slots,
            roots,
            index,
            orphans,
        })
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<ResourceNode<'_>> {
        self.index.get(id).map(|idx| self.node(*idx))
    }

    pub fn roots(&self) -> impl Iterator<Item = ResourceNode<'_>> {
        self.roots.iter().map(|idx| self.node(*idx))
    }

    /// Records whose declared parent was missing from the batch.
    pub fn orphans(&self) -> impl Iterator<Item = ResourceNode<'_>> {
        self.orphans.iter().map(|idx| self.node(*idx))
    }

    /// The contents of a folder, or the root list for `None`.
    /// Unknown ids have no contents.
    pub fn children_of(&self, id: Option<&str>) -> Vec<ResourceNode<'_>> {
        match id {
            Some(id) => self
                .get(id)
                .map(|node| node.children().collect())
                .unwrap_or_default(),
            None => self.roots().collect(),
        }
    }

    /// Depth-first, pre-order search for the first leaf.
    pub fn first_leaf(&self) -> Option<ResourceNode<'_>> {
        let mut stack = self.roots.iter().rev().copied().collect::<Vec<_>>();

        while let Some(idx) = stack.pop() {
            let slot = &self.slots[idx];
            if !slot.record.is_folder {
                return Some(self.node(idx));
            }
            stack.extend(slot.children.iter().rev());
        }

        None
    }

    /// Prune the forest down to the nodes matching `predicate` and their
    /// ancestors. Folders that lead to no match are dropped, the relative
    /// order of everything that remains is unchanged.
    pub fn filter_preserving_ancestors<P>(&self, predicate: P) -> Forest
    where
        P: Fn(ResourceNode<'_>) -> bool,
    {
        let order = self.pre_order();
        let mut keep = vec![false; self.slots.len()];

        // Reverse pre-order visits every descendant before its ancestor.
        for &idx in order.iter().rev() {
            let leads_to_match = self.slots[idx].children.iter().any(|child| keep[*child]);
            keep[idx] = leads_to_match || predicate(self.node(idx));
        }

        let mut remap = vec![None; self.slots.len()];
        let mut kept = 0;
        for &idx in order.iter() {
            if keep[idx] {
                remap[idx] = Some(kept);
                kept += 1;
            }
        }

        let mut slots = Vec::with_capacity(kept);
        let mut index = HashMap::with_capacity(kept);

        for &idx in order.iter().filter(|idx| keep[**idx]) {
            let slot = &self.slots[idx];
            index.insert(slot.record.id.clone(), slots.len());
            slots.push(Slot {
                record: slot.record.clone(),
                parent: slot.parent.and_then(|parent| remap[parent]),
                children: slot
                    .children
                    .iter()
                    .filter_map(|child| remap[*child])
                    .collect(),
            });
        }

        Forest {
            slots,
            roots: self.roots.iter().filter_map(|idx| remap[*idx]).collect(),
            index,
            orphans: self.orphans.iter().filter_map(|idx| remap[*idx]).collect(),
        }
    }

    /// The path from the root down to `id`, ending with the node itself.
    pub fn breadcrumbs(&self, id: &str) -> Vec<ResourceNode<'_>> {
        let mut crumbs = vec![];
        let mut current = self.get(id);

        while let Some(node) = current {
            current = node.parent();
            crumbs.push(node);
        }

        crumbs.reverse();
        crumbs
    }

    /// `id` followed by all of its descendants, in pre-order.
    pub fn subtree_ids(&self, id: &str) -> Vec<&str> {
        let Some(start) = self.index.get(id) else {
            return vec![];
        };

        let mut ids = vec![];
        let mut stack = vec![*start];

        while let Some(idx) = stack.pop() {
            let slot = &self.slots[idx];
            ids.push(slot.record.id.as_str());
            stack.extend(slot.children.iter().rev());
        }

        ids
    }

    /// Whether `candidate` is `ancestor` or lies somewhere below it.
    pub fn is_within(&self, candidate: &str, ancestor: &str) -> bool {
        let Some(target) = self.index.get(ancestor) else {
            return false;
        };

        let mut current = self.index.get(candidate).copied();
        while let Some(idx) = current {
            if idx == *target {
                return true;
            }
            current = self.slots[idx].parent;
        }

        false
    }

    pub fn stats(&self) -> TreeStats {
        let folders = self.slots.iter().filter(|s| s.record.is_folder).count();
        TreeStats {
            folders,
            files: self.slots.len() - folders,
        }
    }

    /// Nested, serializable view of the forest.
    pub fn to_nested(&self) -> Vec<NestedNode<'_>> {
        self.roots().map(NestedNode::from).collect()
    }

    fn node(&self, idx: usize) -> ResourceNode<'_> {
        ResourceNode { forest: self, idx }
    }

    fn pre_order(&self) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.slots.len());
        let mut stack = self.roots.iter().rev().copied().collect::<Vec<_>>();

        while let Some(idx) = stack.pop() {
            order.push(idx);
            stack.extend(self.slots[idx].children.iter().rev());
        }

        order
    }
}

fn sort_siblings(slots: &[Slot], siblings: &mut [usize]) {
    // Stable, and siblings are linked in input order.
    siblings.sort_by_key(|idx| slots[*idx].record.order_index);
}

fn check_acyclic(slots: &[Slot]) -> Result<(), TreeError> {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Mark {
        Unvisited,
        Walking,
        Done,
    }

    let mut marks = vec![Mark::Unvisited; slots.len()];
    let mut chain = vec![];

    for start in 0..slots.len() {
        let mut current = Some(start);

        while let Some(idx) = current {
            match marks[idx] {
                Mark::Done => break,
                Mark::Walking => return Err(TreeError::Cycle(slots[idx].record.id.clone())),
                Mark::Unvisited => {
                    marks[idx] = Mark::Walking;
                    chain.push(idx);
                    current = slots[idx].parent;
                }
            }
        }

        for idx in chain.drain(..) {
            marks[idx] = Mark::Done;
        }
    }

    Ok(())
}

/// A node of a [Forest]: a record plus its ordered children.
#[derive(Clone, Copy)]
pub struct ResourceNode<'a> {
    forest: &'a Forest,
    idx: usize,
}

impl<'a> ResourceNode<'a> {
    pub fn record(&self) -> &'a ResourceRecord {
        &self.forest.slots[self.idx].record
    }

    pub fn id(&self) -> &'a str {
        &self.record().id
    }

    pub fn is_folder(&self) -> bool {
        self.record().is_folder
    }

    pub fn parent(&self) -> Option<ResourceNode<'a>> {
        self.forest.slots[self.idx].parent.map(|idx| self.forest.node(idx))
    }

    pub fn children(&self) -> impl Iterator<Item = ResourceNode<'a>> + 'a {
        let forest = self.forest;
        forest.slots[self.idx]
            .children
            .iter()
            .map(move |idx| forest.node(*idx))
    }
}

impl std::fmt::Debug for ResourceNode<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceNode")
            .field("record", self.record())
            .field("children", &self.children().map(|c| c.id()).collect::<Vec<_>>())
            .finish()
    }
}

impl PartialEq for ResourceNode<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.record() == other.record()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TreeStats {
    pub folders: usize,
    pub files: usize,
}

#[derive(Debug, Serialize)]
pub struct NestedNode<'a> {
    #[serde(flatten)]
    pub record: &'a ResourceRecord,
    pub children: Vec<NestedNode<'a>>,
}

impl<'a> From<ResourceNode<'a>> for NestedNode<'a> {
    fn from(node: ResourceNode<'a>) -> Self {
        Self {
            record: node.record(),
            children: node.children().map(NestedNode::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{ResourceKind, ResourceView};

    fn folder(id: &str, parent: Option<&str>, order_index: i32) -> ResourceRecord {
        ResourceRecord {
            id: id.to_string(),
            parent_id: parent.map(str::to_string),
            is_folder: true,
            kind: ResourceKind::Other,
            order_index,
            name: id.to_string(),
            locator: None,
        }
    }

    fn file(id: &str, parent: Option<&str>, order_index: i32, kind: ResourceKind) -> ResourceRecord {
        ResourceRecord {
            id: id.to_string(),
            parent_id: parent.map(str::to_string),
            is_folder: false,
            kind,
            order_index,
            name: id.to_string(),
            locator: Some(format!("course/{id}")),
        }
    }

    /// A[B[], X], Y
    fn scenario() -> Vec<ResourceRecord> {
        vec![
            folder("A", None, 0),
            folder("B", Some("A"), 0),
            file("X", Some("A"), 1, ResourceKind::Video),
            file("Y", None, 1, ResourceKind::Pdf),
        ]
    }

    fn ids<'a>(nodes: impl IntoIterator<Item = ResourceNode<'a>>) -> Vec<&'a str> {
        nodes.into_iter().map(|node| node.id()).collect()
    }

    fn count(forest: &Forest) -> usize {
        fn walk(node: ResourceNode<'_>) -> usize {
            1 + node.children().map(walk).sum::<usize>()
        }
        forest.roots().map(walk).sum()
    }

    #[test]
    fn builds_scenario() {
        let forest = Forest::build(scenario()).unwrap();

        assert_eq!(vec!["A", "Y"], ids(forest.roots()));
        assert_eq!(vec!["B", "X"], ids(forest.get("A").unwrap().children()));
        assert_eq!(0, forest.get("B").unwrap().children().count());
        assert_eq!("A", forest.get("X").unwrap().parent().unwrap().id());
    }

    #[test]
    fn every_record_reachable_once() {
        let records = vec![
            folder("root", None, 0),
            folder("week-1", Some("root"), 0),
            folder("week-2", Some("root"), 1),
            file("intro", Some("week-1"), 0, ResourceKind::Video),
            file("slides", Some("week-1"), 1, ResourceKind::Ppt),
            file("reading", Some("week-2"), 0, ResourceKind::Pdf),
            file("syllabus", None, 1, ResourceKind::Pdf),
        ];
        let forest = Forest::build(records.clone()).unwrap();

        assert_eq!(records.len(), forest.len());
        assert_eq!(records.len(), count(&forest));

        let mut reached = forest
            .roots()
            .flat_map(|root| forest.subtree_ids(root.id()))
            .collect::<Vec<_>>();
        reached.sort();
        let mut expected = records.iter().map(|r| r.id.as_str()).collect::<Vec<_>>();
        expected.sort();
        assert_eq!(expected, reached);
    }

    #[test]
    fn siblings_sorted_by_order_index() {
        let records = vec![
            folder("p", None, 0),
            file("three", Some("p"), 3, ResourceKind::Video),
            file("one", Some("p"), 1, ResourceKind::Video),
            file("two", Some("p"), 2, ResourceKind::Video),
        ];
        let forest = Forest::build(records).unwrap();

        assert_eq!(
            vec!["one", "two", "three"],
            ids(forest.get("p").unwrap().children())
        );
    }

    #[test]
    fn sibling_ties_keep_input_order() {
        let records = vec![
            folder("p", None, 0),
            file("first", Some("p"), 1, ResourceKind::Video),
            file("zero", Some("p"), 0, ResourceKind::Video),
            file("second", Some("p"), 1, ResourceKind::Video),
        ];
        let forest = Forest::build(records).unwrap();

        assert_eq!(
            vec!["zero", "first", "second"],
            ids(forest.get("p").unwrap().children())
        );
    }

    #[test]
    fn roots_sorted_by_order_index() {
        let records = vec![
            file("late", None, 5, ResourceKind::Pdf),
            folder("early", None, 0),
        ];
        let forest = Forest::build(records).unwrap();
        assert_eq!(vec!["early", "late"], ids(forest.roots()));
    }

    #[test]
    fn orphan_becomes_root() {
        let records = vec![
            folder("A", None, 0),
            file("lost", Some("missing"), 1, ResourceKind::Video),
        ];
        let forest = Forest::build(records).unwrap();

        assert_eq!(vec!["A", "lost"], ids(forest.roots()));
        assert_eq!(vec!["lost"], ids(forest.orphans()));
        assert_eq!(2, count(&forest));
    }

    #[test]
    fn first_leaf_is_depth_first() {
        let forest = Forest::build(scenario()).unwrap();
        assert_eq!("X", forest.first_leaf().unwrap().id());
    }

    #[test]
    fn first_leaf_descends_before_next_sibling() {
        let records = vec![
            folder("A", None, 0),
            folder("A1", Some("A"), 0),
            file("deep", Some("A1"), 0, ResourceKind::Pdf),
            file("shallow", Some("A"), 1, ResourceKind::Video),
            file("root-leaf", None, 1, ResourceKind::Video),
        ];
        let forest = Forest::build(records).unwrap();
        assert_eq!("deep", forest.first_leaf().unwrap().id());
    }

    #[test]
    fn first_leaf_absent_with_only_folders() {
        let records = vec![folder("A", None, 0), folder("B", Some("A"), 0)];
        let forest = Forest::build(records).unwrap();
        assert!(forest.first_leaf().is_none());
    }

    #[test]
    fn empty_input() {
        let forest = Forest::build(vec![]).unwrap();

        assert!(forest.is_empty());
        assert_eq!(0, forest.roots().count());
        assert!(forest.first_leaf().is_none());
        assert!(forest.to_nested().is_empty());
    }

    #[test]
    fn filter_drops_folders_without_matches() {
        let forest = Forest::build(scenario()).unwrap();
        let pdfs = forest.filter_preserving_ancestors(|node| node.record().kind == ResourceKind::Pdf);

        assert_eq!(vec!["Y"], ids(pdfs.roots()));
        assert_eq!(1, pdfs.len());
        assert!(pdfs.get("A").is_none());
    }

    #[test]
    fn filter_keeps_ancestors_of_matches() {
        let records = vec![
            folder("course", None, 0),
            folder("week-1", Some("course"), 0),
            folder("empty", Some("course"), 1),
            file("intro", Some("week-1"), 0, ResourceKind::Video),
            file("notes", Some("week-1"), 1, ResourceKind::Pdf),
            file("recap", Some("course"), 2, ResourceKind::Video),
        ];
        let forest = Forest::build(records).unwrap();
        let videos = ResourceView::Video.apply(&forest);

        assert_eq!(vec!["course"], ids(videos.roots()));
        assert_eq!(
            vec!["week-1", "recap"],
            ids(videos.get("course").unwrap().children())
        );
        assert_eq!(vec!["intro"], ids(videos.get("week-1").unwrap().children()));
        assert!(videos.get("empty").is_none());
        assert!(videos.get("notes").is_none());
        assert_eq!("course", videos.get("recap").unwrap().parent().unwrap().id());

        let docs = ResourceView::Document.apply(&forest);
        assert_eq!(vec!["course", "week-1", "notes"], docs.subtree_ids("course"));
    }

    #[test]
    fn build_is_idempotent() {
        let first = Forest::build(scenario()).unwrap();
        let second = Forest::build(scenario()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn duplicate_id_rejected() {
        let records = vec![
            folder("A", None, 0),
            file("A", None, 1, ResourceKind::Video),
        ];
        assert_eq!(
            TreeError::DuplicateId("A".to_string()),
            Forest::build(records).unwrap_err()
        );
    }

    #[test]
    fn cycle_rejected() {
        let records = vec![
            folder("root", None, 0),
            folder("a", Some("c"), 0),
            folder("b", Some("a"), 0),
            folder("c", Some("b"), 0),
        ];
        assert!(matches!(
            Forest::build(records),
            Err(TreeError::Cycle(_))
        ));
    }

    #[test]
    fn self_parent_rejected() {
        let records = vec![folder("loop", Some("loop"), 0)];
        assert_eq!(
            TreeError::Cycle("loop".to_string()),
            Forest::build(records).unwrap_err()
        );
    }

    #[test]
    fn breadcrumbs_from_root() {
        let forest = Forest::build(scenario()).unwrap();

        assert_eq!(vec!["A", "B"], ids(forest.breadcrumbs("B")));
        assert_eq!(vec!["Y"], ids(forest.breadcrumbs("Y")));
        assert!(forest.breadcrumbs("nope").is_empty());
    }

    #[test]
    fn children_of_folder_or_root() {
        let forest = Forest::build(scenario()).unwrap();

        assert_eq!(vec!["A", "Y"], ids(forest.children_of(None)));
        assert_eq!(vec!["B", "X"], ids(forest.children_of(Some("A"))));
        assert!(forest.children_of(Some("nope")).is_empty());
    }

    #[test]
    fn subtree_and_within() {
        let forest = Forest::build(scenario()).unwrap();

        assert_eq!(vec!["A", "B", "X"], forest.subtree_ids("A"));
        assert_eq!(vec!["Y"], forest.subtree_ids("Y"));
        assert!(forest.subtree_ids("nope").is_empty());

        assert!(forest.is_within("B", "A"));
        assert!(forest.is_within("A", "A"));
        assert!(!forest.is_within("A", "B"));
        assert!(!forest.is_within("Y", "A"));
    }

    #[test]
    fn stats_counts_folders_and_files() {
        let forest = Forest::build(scenario()).unwrap();
        assert_eq!(TreeStats { folders: 2, files: 2 }, forest.stats());
    }

    #[test]
    fn nested_serializes_children() {
        let forest = Forest::build(scenario()).unwrap();
        let json = serde_json::to_value(forest.to_nested()).unwrap();

        assert_eq!("A", json[0]["id"]);
        assert_eq!("B", json[0]["children"][0]["id"]);
        assert_eq!("X", json[0]["children"][1]["id"]);
        assert_eq!("video", json[0]["children"][1]["kind"]);
        assert_eq!("Y", json[1]["id"]);
        assert!(json[1]["children"].as_array().unwrap().is_empty());
    }
}
