//! Plan compilation and the plan cache.
//!
//! A plan freezes every structural decision for one (root type, mode) pair:
//! the step order, the slot each step fills, the cache policy of each step
//! and the scope tiers it touches. Executing a plan never walks the graph.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::directives::ResolveDirective;
use crate::error::{DiError, DiResult};
use crate::extensions::Extensions;
use crate::graph::{self, Graph, Node, NodeId, ProviderNode};
use crate::key::TypeKey;
use crate::registration::{ProviderRecord, Registry};
use crate::scope::Scope;

/// Execution mode of a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Sync,
    Async,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CachePolicy {
    /// Construct every time.
    None,
    /// The value must already be cached.
    Required,
    /// Probe, construct on a miss, store.
    Optional { locked: bool },
}

/// A factory input read from an earlier slot.
#[derive(Debug, Clone)]
pub(crate) struct Arg {
    pub(crate) name: Arc<str>,
    pub(crate) slot: usize,
    /// Provider whose interface view is passed on; `None` for collections.
    pub(crate) expose: Option<Arc<ProviderRecord>>,
}

#[derive(Debug, Clone)]
pub(crate) struct Member {
    pub(crate) slot: usize,
    pub(crate) record: Arc<ProviderRecord>,
}

#[derive(Debug)]
pub(crate) struct ProvideStep {
    pub(crate) type_key: TypeKey,
    pub(crate) record: Arc<ProviderRecord>,
    /// Index into [`ExecutionPlan::tiers`].
    pub(crate) tier: usize,
    pub(crate) cache: CachePolicy,
    pub(crate) construct: Option<ResolveDirective>,
    pub(crate) args: Vec<Arg>,
}

#[derive(Debug)]
pub(crate) enum Step {
    Provide(ProvideStep),
    Collect { members: Vec<Member> },
}

/// A scope tier used by a plan.
#[derive(Debug, Clone)]
pub(crate) struct TierBinding {
    pub(crate) scope: Scope,
    /// Some step in this tier produces a scoped resource.
    pub(crate) cleanup: bool,
    /// First type owned by this tier, reported when the tier is not active.
    pub(crate) owner: TypeKey,
}

/// Compiled resolution of one root type in one mode.
#[derive(Debug)]
pub(crate) struct ExecutionPlan {
    pub(crate) root: TypeKey,
    pub(crate) mode: Mode,
    /// Step `i` fills slot `i`.
    pub(crate) steps: Vec<Step>,
    pub(crate) root_slot: usize,
    pub(crate) root_expose: Option<Arc<ProviderRecord>>,
    pub(crate) tiers: Vec<TierBinding>,
    /// On-resolve observers exist for this mode.
    pub(crate) notify: bool,
}

/// Compiles a dependency-first graph into a plan.
pub(crate) fn compile(graph: &Graph, root: &TypeKey, mode: Mode, extensions: &Extensions) -> DiResult<ExecutionPlan> {
    let index: HashMap<NodeId, usize> = graph
        .nodes
        .iter()
        .enumerate()
        .map(|(slot, node)| (node.id(), slot))
        .collect();

    let mut tiers = Vec::new();
    let mut steps = Vec::with_capacity(graph.nodes.len());

    for node in &graph.nodes {
        let step = match node {
            Node::Provider(provider) => Step::Provide(compile_provider(provider, mode, graph, &index, &mut tiers)?),
            Node::Collection { type_key, members } => Step::Collect {
                members: members
                    .iter()
                    .map(|member| {
                        Ok(Member {
                            slot: slot_of(&index, &member.id(), type_key)?,
                            record: member.record.clone(),
                        })
                    })
                    .collect::<DiResult<Vec<_>>>()?,
            },
        };
        steps.push(step);
    }

    let root_slot = slot_of(&index, &graph.root, root)?;
    let notify = match mode {
        Mode::Sync => !extensions.on_resolve_sync.is_empty(),
        Mode::Async => !extensions.on_resolve.is_empty(),
    };

    Ok(ExecutionPlan {
        root: root.clone(),
        mode,
        steps,
        root_slot,
        root_expose: exposed_record(graph, root_slot),
        tiers,
        notify,
    })
}

fn compile_provider(
    node: &ProviderNode,
    mode: Mode,
    graph: &Graph,
    index: &HashMap<NodeId, usize>,
    tiers: &mut Vec<TierBinding>,
) -> DiResult<ProvideStep> {
    let info = &node.record.info;
    let directives = info.directives;

    if mode == Mode::Sync && directives.is_async() {
        return Err(DiError::AsyncProvider(node.type_key.clone()));
    }

    let cache = match directives.cache {
        None => CachePolicy::None,
        Some(cache) if !cache.optional => CachePolicy::Required,
        Some(_) => CachePolicy::Optional {
            locked: directives.is_locked(),
        },
    };

    let args = node
        .dependencies
        .iter()
        .map(|dep| {
            let slot = slot_of(index, &dep.node, &dep.requested)?;
            Ok(Arg {
                name: dep.name.clone(),
                slot,
                expose: exposed_record(graph, slot),
            })
        })
        .collect::<DiResult<Vec<_>>>()?;

    Ok(ProvideStep {
        type_key: node.type_key.clone(),
        record: node.record.clone(),
        tier: bind_tier(tiers, info.scope, &node.type_key, directives.is_context_manager()),
        cache,
        construct: directives.resolve,
        args,
    })
}

fn slot_of(index: &HashMap<NodeId, usize>, id: &NodeId, requested: &TypeKey) -> DiResult<usize> {
    index
        .get(id)
        .copied()
        .ok_or_else(|| DiError::ProviderNotFound(requested.clone()))
}

fn exposed_record(graph: &Graph, slot: usize) -> Option<Arc<ProviderRecord>> {
    match graph.nodes.get(slot) {
        Some(Node::Provider(provider)) => Some(provider.record.clone()),
        _ => None,
    }
}

fn bind_tier(tiers: &mut Vec<TierBinding>, scope: Scope, owner: &TypeKey, cleanup: bool) -> usize {
    match tiers.iter().position(|tier| tier.scope == scope) {
        Some(position) => {
            tiers[position].cleanup |= cleanup;
            position
        }
        None => {
            tiers.push(TierBinding {
                scope,
                cleanup,
                owner: owner.clone(),
            });
            tiers.len() - 1
        }
    }
}

/// Memoized plans keyed by (root type, mode).
#[derive(Default)]
pub(crate) struct PlanCache {
    plans: Mutex<HashMap<(TypeKey, Mode), Arc<ExecutionPlan>>>,
}

impl PlanCache {
    /// Returns the cached plan or builds, compiles and caches it.
    ///
    /// Compilation runs without holding the cache lock; when two callers race
    /// the first stored plan wins.
    pub(crate) fn get_or_compile(
        &self,
        root: &TypeKey,
        mode: Mode,
        registry: &Registry,
        extensions: &Extensions,
    ) -> DiResult<Arc<ExecutionPlan>> {
        let key = (root.clone(), mode);
        if let Some(plan) = self.plans.lock().get(&key) {
            return Ok(plan.clone());
        }

        let graph = graph::build(root, registry)?;
        let plan = Arc::new(compile(&graph, root, mode, extensions)?);
        debug!(
            root = %root,
            mode = ?mode,
            steps = plan.steps.len(),
            tiers = plan.tiers.len(),
            cleanup_tiers = plan.tiers.iter().filter(|tier| tier.cleanup).count(),
            "compiled resolution plan"
        );

        Ok(self.plans.lock().entry(key).or_insert(plan).clone())
    }

    pub(crate) fn clear(&self) {
        self.plans.lock().clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.plans.lock().len()
    }
}
