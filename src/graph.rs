//! Dependency graph construction.
//!
//! Walks the registry from a root type with an explicit stack, deduplicating
//! nodes by identity, then orders the discovered nodes dependency-first.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::error::{DiError, DiResult};
use crate::key::TypeKey;
use crate::registration::{ProviderRecord, Registry};

/// Identity of a graph node.
///
/// Provider nodes are identified by their record, so two providers producing
/// the same type inside one collection stay distinct.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum NodeId {
    Provider { type_key: TypeKey, record: usize },
    Collection(TypeKey),
}

fn record_id(record: &Arc<ProviderRecord>) -> usize {
    Arc::as_ptr(record) as usize
}

/// A dependency bound to a concrete type and to the node satisfying it.
#[derive(Debug, Clone)]
pub(crate) struct BoundDependency {
    pub(crate) name: Arc<str>,
    pub(crate) requested: TypeKey,
    pub(crate) node: NodeId,
}

#[derive(Debug, Clone)]
pub(crate) struct ProviderNode {
    pub(crate) type_key: TypeKey,
    pub(crate) record: Arc<ProviderRecord>,
    pub(crate) dependencies: Vec<BoundDependency>,
}

impl ProviderNode {
    pub(crate) fn id(&self) -> NodeId {
        NodeId::Provider {
            type_key: self.type_key.clone(),
            record: record_id(&self.record),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) enum Node {
    Provider(ProviderNode),
    /// Every provider of the inner type, in registration order.
    Collection {
        type_key: TypeKey,
        members: Vec<ProviderNode>,
    },
}

impl Node {
    pub(crate) fn id(&self) -> NodeId {
        match self {
            Node::Provider(node) => node.id(),
            Node::Collection { type_key, .. } => NodeId::Collection(type_key.clone()),
        }
    }

    pub(crate) fn type_key(&self) -> &TypeKey {
        match self {
            Node::Provider(node) => &node.type_key,
            Node::Collection { type_key, .. } => type_key,
        }
    }

    pub(crate) fn edges(&self) -> Vec<NodeId> {
        match self {
            Node::Provider(node) => node.dependencies.iter().map(|dep| dep.node.clone()).collect(),
            Node::Collection { members, .. } => members.iter().map(ProviderNode::id).collect(),
        }
    }
}

/// Nodes reachable from a root, dependencies before dependants.
#[derive(Debug)]
pub(crate) struct Graph {
    pub(crate) root: NodeId,
    pub(crate) nodes: Vec<Node>,
}

/// Builds the dependency graph of `root`.
///
/// Registry lookups fail with [`DiError::ProviderNotFound`] naming the
/// unresolvable type; cycles fail with [`DiError::Circular`].
pub(crate) fn build(root: &TypeKey, registry: &Registry) -> DiResult<Graph> {
    let root_node = node_for(root, registry)?;
    let root_id = root_node.id();

    let mut stack = vec![root_node];
    let mut seen = HashSet::new();
    let mut discovered = Vec::new();

    while let Some(node) = stack.pop() {
        if !seen.insert(node.id()) {
            continue;
        }
        match &node {
            Node::Provider(provider) => {
                for dependency in &provider.dependencies {
                    stack.push(node_for(&dependency.requested, registry)?);
                }
            }
            Node::Collection { members, .. } => {
                stack.extend(members.iter().cloned().map(Node::Provider));
            }
        }
        discovered.push(node);
    }

    // Discovery emits dependants before their dependencies.
    discovered.reverse();
    let nodes = dependency_first(discovered)?;

    Ok(Graph {
        root: root_id,
        nodes,
    })
}

fn node_for(key: &TypeKey, registry: &Registry) -> DiResult<Node> {
    match key.inner() {
        Some(inner) => {
            let members = registry
                .get_providers(inner)?
                .iter()
                .map(|record| provider_node(record, registry))
                .collect::<DiResult<Vec<_>>>()?;
            Ok(Node::Collection {
                type_key: key.clone(),
                members,
            })
        }
        None => Ok(Node::Provider(provider_node(registry.get_provider(key)?, registry)?)),
    }
}

fn node_id_for(key: &TypeKey, registry: &Registry) -> DiResult<NodeId> {
    match key.inner() {
        Some(inner) => {
            registry.get_providers(inner)?;
            Ok(NodeId::Collection(key.clone()))
        }
        None => {
            let record = registry.get_provider(key)?;
            Ok(NodeId::Provider {
                type_key: record.info.actual_type.clone(),
                record: record_id(record),
            })
        }
    }
}

fn provider_node(record: &Arc<ProviderRecord>, registry: &Registry) -> DiResult<ProviderNode> {
    let info = &record.info;
    let bindings = if info.dependencies.iter().any(|dep| dep.type_key.has_params()) {
        registry.types().bindings(&info.actual_type)
    } else {
        HashMap::new()
    };

    let dependencies = info
        .dependencies
        .iter()
        .map(|dep| {
            // Collection dependencies are looked up by their declared inner type.
            let requested = if dep.type_key.is_many() {
                dep.type_key.clone()
            } else {
                dep.type_key.substitute(&bindings)
            };
            let node = node_id_for(&requested, registry)?;
            Ok(BoundDependency {
                name: dep.name.clone(),
                requested,
                node,
            })
        })
        .collect::<DiResult<Vec<_>>>()?;

    Ok(ProviderNode {
        type_key: info.actual_type.clone(),
        record: record.clone(),
        dependencies,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    New,
    Active,
    Done,
}

/// Stable depth-first post-order over `nodes`.
///
/// Input already in dependency-first order comes back unchanged; otherwise
/// each node is moved after its dependencies.
fn dependency_first(nodes: Vec<Node>) -> DiResult<Vec<Node>> {
    let index: HashMap<NodeId, usize> = nodes
        .iter()
        .enumerate()
        .map(|(i, node)| (node.id(), i))
        .collect();
    let edges: Vec<Vec<usize>> = nodes
        .iter()
        .map(|node| node.edges().iter().filter_map(|id| index.get(id).copied()).collect())
        .collect();

    let mut marks = vec![Mark::New; nodes.len()];
    let mut order = Vec::with_capacity(nodes.len());

    for start in 0..nodes.len() {
        if marks[start] != Mark::New {
            continue;
        }
        marks[start] = Mark::Active;
        let mut stack = vec![(start, 0usize)];

        while let Some(frame) = stack.last_mut() {
            let current = frame.0;
            match edges[current].get(frame.1).copied() {
                Some(next) => {
                    frame.1 += 1;
                    match marks[next] {
                        Mark::New => {
                            marks[next] = Mark::Active;
                            stack.push((next, 0));
                        }
                        Mark::Active => {
                            let from = stack.iter().position(|&(i, _)| i == next).unwrap_or(0);
                            let mut path: Vec<TypeKey> = stack[from..]
                                .iter()
                                .map(|&(i, _)| nodes[i].type_key().clone())
                                .collect();
                            path.push(nodes[next].type_key().clone());
                            return Err(DiError::Circular(path));
                        }
                        Mark::Done => {}
                    }
                }
                None => {
                    marks[current] = Mark::Done;
                    order.push(current);
                    stack.pop();
                }
            }
        }
    }

    let mut slots: Vec<Option<Node>> = nodes.into_iter().map(Some).collect();
    Ok(order.into_iter().filter_map(|i| slots[i].take()).collect())
}
