//! Serializable dependency graphs for visualization and debugging.
//!
//! Available with the `graph-export` feature. The exported graph is the one
//! resolution plans are compiled from: nodes in dependency-first order, one
//! edge per declared dependency or collection member.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::graph::{Graph, Node, NodeId};

/// A provider or collection node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    /// Position in dependency-first order.
    pub id: usize,
    pub type_name: String,
    pub kind: NodeKind,
    /// Owning scope; collections have none.
    pub scope: Option<String>,
    pub implementation: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Provider,
    Collection,
}

/// `from` depends on `to`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub from: usize,
    pub to: usize,
    /// Parameter name; collection members have none.
    pub name: Option<String>,
}

/// Dependency graph of one root type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyGraph {
    pub root: usize,
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl DependencyGraph {
    pub(crate) fn from_graph(graph: &Graph) -> Self {
        let index: HashMap<NodeId, usize> = graph
            .nodes
            .iter()
            .enumerate()
            .map(|(position, node)| (node.id(), position))
            .collect();

        let nodes = graph
            .nodes
            .iter()
            .enumerate()
            .map(|(id, node)| export_node(id, node))
            .collect();

        let mut edges = Vec::new();
        for (from, node) in graph.nodes.iter().enumerate() {
            let names: Vec<Option<String>> = match node {
                Node::Provider(provider) => provider
                    .dependencies
                    .iter()
                    .map(|dep| Some(dep.name.to_string()))
                    .collect(),
                Node::Collection { members, .. } => vec![None; members.len()],
            };
            for (target, name) in node.edges().iter().zip(names) {
                if let Some(&to) = index.get(target) {
                    edges.push(GraphEdge { from, to, name });
                }
            }
        }

        Self {
            root: index.get(&graph.root).copied().unwrap_or_default(),
            nodes,
            edges,
        }
    }

    /// Nodes `id` depends on directly.
    pub fn dependencies_of(&self, id: usize) -> impl Iterator<Item = &GraphNode> + '_ {
        self.edges
            .iter()
            .filter(move |edge| edge.from == id)
            .filter_map(|edge| self.nodes.get(edge.to))
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

fn export_node(id: usize, node: &Node) -> GraphNode {
    match node {
        Node::Provider(provider) => GraphNode {
            id,
            type_name: provider.type_key.to_string(),
            kind: NodeKind::Provider,
            scope: Some(provider.record.info.scope.name().to_string()),
            implementation: Some(provider.record.provider.implementation().to_string()),
        },
        Node::Collection { type_key, .. } => GraphNode {
            id,
            type_name: type_key.to_string(),
            kind: NodeKind::Collection,
            scope: None,
            implementation: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::Container;
    use crate::providers::{Scoped, Singleton};

    struct Pool;
    struct RepoA;
    struct RepoB;
    struct Service;

    #[test]
    fn test_diamond_exports_each_node_once() {
        let container = Container::new();
        container.register(Singleton::new(|_| Ok(Pool))).unwrap();
        container.register(Scoped::new(|_| Ok(RepoA)).dependency::<Pool>("pool")).unwrap();
        container.register(Scoped::new(|_| Ok(RepoB)).dependency::<Pool>("pool")).unwrap();
        container
            .register(
                Scoped::new(|_| Ok(Service))
                    .dependency::<RepoA>("a")
                    .dependency::<RepoB>("b"),
            )
            .unwrap();

        let graph = container
            .dependency_graph(&crate::TypeKey::of::<Service>())
            .unwrap();
        assert_eq!(graph.nodes.len(), 4);
        assert_eq!(graph.edges.len(), 4);
        assert_eq!(graph.root, 3);
        assert!(graph.nodes[0].type_name.ends_with("Pool"));

        let deps: Vec<_> = graph.dependencies_of(graph.root).map(|n| n.type_name.clone()).collect();
        assert_eq!(deps.len(), 2);

        let json = graph.to_json().unwrap();
        assert!(json.contains("\"kind\": \"provider\""));
        assert_eq!(DependencyGraph::from_json(&json).unwrap(), graph);
    }
}
