//! Same-package dependency closure of the entry point
//!
//! ## Detection Algorithm
//!
//! 1. Every class in the entry package except `R` becomes a graph node
//! 2. An edge A -> B is added when B's simple name occurs in A's source
//! 3. A depth-first walk from the entry point collects the closure
//!
//! The reference test is a substring match, so `Foo` also matches inside
//! `FooBar`.

use super::AnalysisLog;
use crate::facts::{ClassFact, PackageFacts};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;

/// Simple name of the generated resource-identifier class
pub const RESOURCE_CLASS: &str = "R";

pub struct DependencyCollector {
    resource_class: String,
}

impl DependencyCollector {
    pub fn new() -> Self {
        Self {
            resource_class: RESOURCE_CLASS.to_string(),
        }
    }

    /// Collect the entry point and every class it transitively references
    ///
    /// The entry point comes first, the rest follow in discovery order.
    pub fn collect<'f>(
        &self,
        entry: &'f ClassFact,
        facts: &'f PackageFacts,
        log: &mut AnalysisLog,
    ) -> Vec<&'f ClassFact> {
        let mut graph: DiGraph<&'f ClassFact, ()> = DiGraph::new();

        let entry_node = graph.add_node(entry);
        let mut nodes: Vec<NodeIndex> = vec![entry_node];
        for class in &facts.classes {
            if class.name != entry.name
                && class.package == entry.package
                && class.simple_name != self.resource_class
            {
                nodes.push(graph.add_node(class));
            }
        }

        // Dfs pops the oldest edge first, so discovery follows fact order
        for &from in &nodes {
            for &to in &nodes {
                if from != to && graph[from].source.contains(graph[to].simple_name.as_str()) {
                    graph.add_edge(from, to, ());
                }
            }
        }

        let mut collected = Vec::new();
        let mut dfs = Dfs::new(&graph, entry_node);
        while let Some(node) = dfs.next(&graph) {
            let class = graph[node];
            if node != entry_node {
                log.log(format!("Adding class {} to referenced classes", class.name));
            }
            collected.push(class);
        }

        collected
    }
}

impl Default for DependencyCollector {
    fn default() -> Self {
        Self::new()
    }
}
