//! Plan execution.
//!
//! Runs the steps of a compiled plan in order against a context's scope
//! chain. Per step: probe the owning scope's cache, construct on a miss
//! (under the per-key lock when the step is locked), register a resource's
//! release, store, then notify on-resolve observers. Only cache hits and
//! misses are decided here; everything else was fixed at compile time.

use std::sync::Arc;

use tracing::trace;

use crate::context::{Context, ScopeState};
use crate::error::{DiError, DiResult};
use crate::plan::{Arg, CachePolicy, ExecutionPlan, Member, ProvideStep, Step};
use crate::providers::{Dependencies, Provided};
use crate::registration::Instance;

pub(crate) fn run_sync(plan: &ExecutionPlan, context: &Context) -> DiResult<Instance> {
    let states = bind_tiers(plan, context)?;
    let mut slots: Vec<Instance> = Vec::with_capacity(plan.steps.len());

    for step in &plan.steps {
        let instance = match step {
            Step::Provide(step) => provide_sync(plan, step, &states, &slots, context)?,
            Step::Collect { members } => collect(members, &slots)?,
        };
        slots.push(instance);
    }

    finish(plan, slots)
}

pub(crate) async fn run_async(plan: &ExecutionPlan, context: &Context) -> DiResult<Instance> {
    let states = bind_tiers(plan, context)?;
    let mut slots: Vec<Instance> = Vec::with_capacity(plan.steps.len());

    for step in &plan.steps {
        let instance = match step {
            Step::Provide(step) => provide_async(plan, step, &states, &slots, context).await?,
            Step::Collect { members } => collect(members, &slots)?,
        };
        slots.push(instance);
    }

    finish(plan, slots)
}

/// Looks up the live context of every tier the plan touches.
fn bind_tiers<'a>(plan: &ExecutionPlan, context: &'a Context) -> DiResult<Vec<&'a Arc<ScopeState>>> {
    plan.tiers
        .iter()
        .map(|tier| {
            context
                .state_for(tier.scope)
                .ok_or_else(|| DiError::ScopeNotActive {
                    ty: tier.owner.clone(),
                    scope: tier.scope.name(),
                })
        })
        .collect()
}

enum Probe {
    Hit(Instance),
    Miss,
}

fn probe(step: &ProvideStep, state: &ScopeState) -> DiResult<Probe> {
    match step.cache {
        CachePolicy::Required => state
            .cached(&step.type_key)
            .map(Probe::Hit)
            .ok_or_else(|| DiError::MissingContextValue(step.type_key.clone())),
        CachePolicy::Optional { .. } => Ok(state.cached(&step.type_key).map_or(Probe::Miss, Probe::Hit)),
        CachePolicy::None => Ok(Probe::Miss),
    }
}

fn provide_sync(
    plan: &ExecutionPlan,
    step: &ProvideStep,
    states: &[&Arc<ScopeState>],
    slots: &[Instance],
    context: &Context,
) -> DiResult<Instance> {
    let state = states[step.tier];
    if let Probe::Hit(instance) = probe(step, state)? {
        return Ok(instance);
    }
    if step.construct.is_none() {
        return Err(DiError::MissingContextValue(step.type_key.clone()));
    }

    let guard = matches!(step.cache, CachePolicy::Optional { locked: true })
        .then(|| state.locks().get(&step.type_key).lock_sync());
    if guard.is_some() {
        if let Some(instance) = state.cached(&step.type_key) {
            return Ok(instance);
        }
    }

    let dependencies = bind_args(&step.args, slots)?;
    let provided = step.record.provider.provide(dependencies)?;
    let instance = accept(step, state, provided);
    drop(guard);

    if plan.notify {
        let owner = context.ancestor(state.scope());
        for extension in &context.core().extensions.on_resolve_sync {
            extension.on_resolve(&owner, &step.record, &instance);
        }
    }
    Ok(instance)
}

async fn provide_async(
    plan: &ExecutionPlan,
    step: &ProvideStep,
    states: &[&Arc<ScopeState>],
    slots: &[Instance],
    context: &Context,
) -> DiResult<Instance> {
    let state = states[step.tier];
    if let Probe::Hit(instance) = probe(step, state)? {
        return Ok(instance);
    }
    let Some(construct) = step.construct else {
        return Err(DiError::MissingContextValue(step.type_key.clone()));
    };

    let guard = match step.cache {
        CachePolicy::Optional { locked: true } => {
            let guard = state.locks().get(&step.type_key).lock().await;
            if let Some(instance) = state.cached(&step.type_key) {
                return Ok(instance);
            }
            Some(guard)
        }
        _ => None,
    };

    let dependencies = bind_args(&step.args, slots)?;
    let provided = if construct.is_async {
        step.record.provider.provide_async(dependencies).await?
    } else {
        step.record.provider.provide(dependencies)?
    };
    let instance = accept(step, state, provided);
    drop(guard);

    if plan.notify {
        let owner = context.ancestor(state.scope());
        for extension in &context.core().extensions.on_resolve {
            extension.on_resolve(&owner, &step.record, &instance).await;
        }
    }
    Ok(instance)
}

/// Registers a resource's release and caches the product.
///
/// Runs without suspending, so a constructed resource is always on the
/// owning scope's cleanup stack before anything else can happen.
fn accept(step: &ProvideStep, state: &ScopeState, provided: Provided) -> Instance {
    let instance = match provided {
        Provided::Value(instance) => instance,
        Provided::Resource(instance, release) => {
            state.push_release(step.type_key.clone(), release);
            instance
        }
    };
    trace!(ty = %step.type_key, scope = %state.scope(), "constructed instance");

    match step.cache {
        CachePolicy::Optional { .. } => state.store(step.type_key.clone(), instance),
        CachePolicy::Required | CachePolicy::None => instance,
    }
}

fn slot(slots: &[Instance], index: usize, name: &str) -> DiResult<Instance> {
    slots
        .get(index)
        .cloned()
        .ok_or_else(|| DiError::MissingArgument(name.to_string()))
}

fn bind_args(args: &[Arg], slots: &[Instance]) -> DiResult<Dependencies> {
    let mut dependencies = Dependencies::with_capacity(args.len());
    for arg in args {
        let instance = slot(slots, arg.slot, &arg.name)?;
        let instance = match &arg.expose {
            Some(record) => record.expose(instance)?,
            None => instance,
        };
        dependencies.push(arg.name.clone(), instance);
    }
    Ok(dependencies)
}

fn collect(members: &[Member], slots: &[Instance]) -> DiResult<Instance> {
    let instances = members
        .iter()
        .map(|member| member_instance(member, slots))
        .collect::<DiResult<Vec<Instance>>>()?;
    Ok(Arc::new(instances) as Instance)
}

fn member_instance(member: &Member, slots: &[Instance]) -> DiResult<Instance> {
    let instance = slot(slots, member.slot, &member.record.info.actual_type.to_string())?;
    member.record.expose(instance)
}

fn finish(plan: &ExecutionPlan, slots: Vec<Instance>) -> DiResult<Instance> {
    let instance = slots
        .into_iter()
        .nth(plan.root_slot)
        .ok_or_else(|| DiError::ProviderNotFound(plan.root.clone()))?;
    trace!(root = %plan.root, mode = ?plan.mode, "resolved");
    match &plan.root_expose {
        Some(record) => record.expose(instance),
        None => Ok(instance),
    }
}
