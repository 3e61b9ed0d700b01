//! Producer-before-consumer ordering of linkables.
//!
//! Depth-first search with three colors over the owner graph. An owner's
//! successors are the owners its properties link into, plus the owners
//! those destinations' inputs forward to (boundary pass-through). Each
//! owner is placed in front of everything it reaches.
//!
//! Cycles do not fail the sort. A successor that is still on the DFS path
//! is recorded as a back edge and not descended into again, so members of
//! a cyclic group come out in a best-effort order.

use hashbrown::{HashMap, HashSet};
use tracing::{debug, warn};

use super::Graph;
use crate::model::{GroupRole, LinkableId};

/// Result of one sort.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortOutcome {
    pub order: Vec<LinkableId>,
    /// `(from, to)` owner pairs where `to` was still being visited.
    pub back_edges: Vec<(LinkableId, LinkableId)>,
}

impl SortOutcome {
    pub fn is_acyclic(&self) -> bool {
        self.back_edges.is_empty()
    }

    pub fn position(&self, id: LinkableId) -> Option<usize> {
        self.order.iter().position(|l| *l == id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Visited,
}

struct Frame {
    owner: LinkableId,
    successors: Vec<LinkableId>,
    next: usize,
}

#[derive(Debug, Default)]
pub struct LinkableSorter {
    marks: HashMap<LinkableId, Mark>,
}

impl LinkableSorter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sort(&mut self, graph: &Graph) -> SortOutcome {
        self.marks.clear();
        let mut finished = Vec::with_capacity(graph.len());
        let mut back_edges = Vec::new();

        for &root in graph.linkable_ids() {
            if self.marks.contains_key(&root) {
                continue;
            }
            self.marks.insert(root, Mark::Visiting);
            let mut stack = vec![Frame { owner: root, successors: successors(graph, root), next: 0 }];

            while let Some(frame) = stack.last_mut() {
                if let Some(&succ) = frame.successors.get(frame.next) {
                    frame.next += 1;
                    match self.marks.get(&succ).copied() {
                        Some(Mark::Visited) => {}
                        Some(Mark::Visiting) => back_edges.push((frame.owner, succ)),
                        None => {
                            self.marks.insert(succ, Mark::Visiting);
                            stack.push(Frame { owner: succ, successors: successors(graph, succ), next: 0 });
                        }
                    }
                } else {
                    let owner = frame.owner;
                    stack.pop();
                    self.marks.insert(owner, Mark::Visited);
                    finished.push(owner);
                }
            }
        }

        finished.reverse();
        if !back_edges.is_empty() {
            warn!(count = back_edges.len(), "Link graph has cycles; order is best effort");
        }
        debug!(linkables = finished.len(), "Linkables sorted");

        SortOutcome { order: finished, back_edges }
    }
}

/// Distinct owners reachable from `owner` in one or two link hops.
fn successors(graph: &Graph, owner: LinkableId) -> Vec<LinkableId> {
    let Some(linkable) = graph.linkable(owner) else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut result = Vec::new();
    let mut add = |id: LinkableId| {
        if id != owner && seen.insert(id) {
            result.push(id);
        }
    };

    let properties = linkable.ins().iter().chain(linkable.outs().iter());
    for link in properties.flat_map(|p| p.out_links()).filter_map(|id| graph.link(*id)) {
        let destination = link.destination().owner;
        add(destination);

        let Some(target) = graph.linkable(destination) else {
            continue;
        };
        for forward in target
            .group(GroupRole::Ins)
            .iter()
            .flat_map(|p| p.out_links())
            .filter_map(|id| graph.link(*id))
        {
            add(forward.destination().owner);
        }
    }
    result
}
