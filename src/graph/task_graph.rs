//! The internal dependency graph between the passes of a frame.
//!
//! Edges are derived from declared resource usage only. A pass writes a resource when it produces it, or when it
//! consumes it with a writing access mode.
//! - Passes writing the same resource are chained in registration order.
//! - A pass that only reads a resource reads the value of the closest writer registered before it, and must run
//!   before the next writer overwrites that value.
//! - A reader registered before every writer of the resource reads the value of the last writer.
//!
//! Two passes that only read a resource never get an edge, so the scheduler is free to order them.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

use anyhow::Result;
use petgraph::graph::{EdgeReference, NodeIndex};
use petgraph::{Graph, Incoming, Outgoing};

use crate::core::error::Error;
use crate::graph::pass::Pass;
use crate::graph::virtual_resource::ResourceHandle;

/// Node in the task graph. The index is the registration index of the pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskNode {
    pub index: usize,
    pub name: String,
}

/// Edge in the task graph, labeled with the resource that causes the dependency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskEdge {
    pub resource: ResourceHandle,
    pub name: String,
}

/// Pass dependency graph, used to derive an execution order.
#[derive(Debug, Default)]
pub struct TaskGraph {
    pub(crate) graph: Graph<TaskNode, TaskEdge>,
}

impl TaskGraph {
    /// Build the dependency graph for a list of passes. `name` maps a handle to its debug name.
    pub(crate) fn new<'cb, U>(passes: &[Pass<'cb, U>], name: impl Fn(ResourceHandle) -> String) -> Self {
        let mut graph = Graph::new();
        let nodes = passes
            .iter()
            .enumerate()
            .map(|(index, pass)| {
                graph.add_node(TaskNode {
                    index,
                    name: pass.name().to_owned(),
                })
            })
            .collect::<Vec<_>>();

        // Collect writers and readers per resource, in first-use order so that edge order is deterministic.
        let mut resources = Vec::new();
        let mut writers: HashMap<ResourceHandle, Vec<usize>> = HashMap::new();
        let mut readers: HashMap<ResourceHandle, Vec<usize>> = HashMap::new();
        for (index, pass) in passes.iter().enumerate() {
            for usage in pass.producers() {
                let list = writers.entry(usage.resource).or_default();
                if list.last() != Some(&index) {
                    list.push(index);
                }
                if !resources.contains(&usage.resource) {
                    resources.push(usage.resource);
                }
            }
            for usage in pass.consumers() {
                if pass.produces(usage.resource) {
                    continue;
                }
                let lists = if usage.access.is_write() { &mut writers } else { &mut readers };
                let list = lists.entry(usage.resource).or_default();
                if list.last() != Some(&index) {
                    list.push(index);
                }
                if !resources.contains(&usage.resource) {
                    resources.push(usage.resource);
                }
            }
        }

        for resource in resources {
            let Some(writers) = writers.get(&resource) else { continue };
            let edge = || TaskEdge {
                resource,
                name: name(resource),
            };
            for pair in writers.windows(2) {
                graph.add_edge(nodes[pair[0]], nodes[pair[1]], edge());
            }
            for &reader in readers.get(&resource).into_iter().flatten() {
                let next = writers.partition_point(|&writer| writer < reader);
                match next.checked_sub(1) {
                    Some(previous) => {
                        graph.add_edge(nodes[writers[previous]], nodes[reader], edge());
                        if let Some(&overwrite) = writers.get(next) {
                            graph.add_edge(nodes[reader], nodes[overwrite], edge());
                        }
                    }
                    None => {
                        if let Some(&last) = writers.last() {
                            graph.add_edge(nodes[last], nodes[reader], edge());
                        }
                    }
                }
            }
        }

        Self {
            graph,
        }
    }

    /// Number of passes in the graph
    pub fn num_tasks(&self) -> usize {
        self.graph.node_count()
    }

    /// Return all source nodes in the graph, these are the nodes with no parent node.
    pub fn sources(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph
            .node_indices()
            .filter(|node| self.graph.edges_directed(*node, Incoming).next().is_none())
    }

    /// Whether the graph has an edge from pass `from` to pass `to`.
    pub fn depends_on(&self, to: usize, from: usize) -> bool {
        self.graph.contains_edge(NodeIndex::new(from), NodeIndex::new(to))
    }

    /// Topologically sort the graph. Among passes that are ready at the same time, the one registered first
    /// is scheduled first, so equal inputs always give equal orders.
    /// # Errors
    /// - Fails with [`Error::CyclicDependency`] if the dependencies contain a cycle.
    pub fn execution_order(&self) -> Result<Vec<usize>> {
        let mut in_degree = self
            .graph
            .node_indices()
            .map(|node| self.graph.edges_directed(node, Incoming).count())
            .collect::<Vec<_>>();
        let mut ready = self
            .sources()
            .map(|node| Reverse(node.index()))
            .collect::<BinaryHeap<_>>();
        let mut order = Vec::with_capacity(self.num_tasks());

        while let Some(Reverse(index)) = ready.pop() {
            order.push(index);
            for child in self.graph.neighbors_directed(NodeIndex::new(index), Outgoing) {
                // Parallel edges are yielded once per edge, which matches the in-degree count.
                let degree = &mut in_degree[child.index()];
                *degree -= 1;
                if *degree == 0 {
                    ready.push(Reverse(child.index()));
                }
            }
        }

        if order.len() != self.num_tasks() {
            return Err(self.cycle_error(&order));
        }
        Ok(order)
    }

    /// Find one offending pair of passes. The pair is taken from the cycle that contains the earliest registered
    /// pass on any cycle.
    fn cycle_error(&self, scheduled: &[usize]) -> anyhow::Error {
        let scheduled = scheduled.iter().copied().collect::<HashSet<_>>();
        let is_cycle = |component: &Vec<NodeIndex>| {
            component.len() > 1 || component.iter().any(|&node| self.graph.contains_edge(node, node))
        };
        // Kahn's algorithm only stalls on a cycle, so at least one pass is left unscheduled.
        let component = petgraph::algo::tarjan_scc(&self.graph)
            .into_iter()
            .filter(is_cycle)
            .min_by_key(|component| component.iter().map(|node| node.index()).min())
            .unwrap_or_else(|| {
                self.graph
                    .node_indices()
                    .filter(|node| !scheduled.contains(&node.index()))
                    .collect()
            });
        let members = component.iter().copied().collect::<HashSet<_>>();
        let first = component
            .iter()
            .copied()
            .min_by_key(|node| node.index())
            .unwrap_or_else(|| NodeIndex::new(0));
        let second = self
            .graph
            .neighbors_directed(first, Outgoing)
            .filter(|node| members.contains(node))
            .min_by_key(|node| node.index())
            .unwrap_or(first);
        anyhow::Error::from(Error::CyclicDependency {
            first: self.graph[first].name.clone(),
            second: self.graph[second].name.clone(),
        })
    }

    pub(crate) fn get_edge_attributes(_: &Graph<TaskNode, TaskEdge>, _: EdgeReference<TaskEdge>) -> String {
        String::from("")
    }

    pub(crate) fn get_node_attributes(_: &Graph<TaskNode, TaskEdge>, _: (NodeIndex, &TaskNode)) -> String {
        String::from("fillcolor = \"#5e6df7\"")
    }
}
