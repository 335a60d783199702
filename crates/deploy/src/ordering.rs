//! Ordering validation run before any side effect.
//!
//! The deployment order is chosen by the caller. This pass only checks it: every name
//! is declared once and is not already resolved in the registry, and every reference
//! (constructor args, link targets, link args, query args) points at something resolved
//! strictly earlier in the plan, at an entry already in the registry, or at a seed.

use std::collections::HashMap;

use crate::{
    error::{OrchestrationError, OrderingViolation},
    registry::AddressRegistry,
    resource::{ArgDescriptor, ResourceSpec},
};

/// Position at which a name becomes available: `(spec index, step)`.
///
/// Step 0 is the spec's own resolution, step `j + 1` is the completion of its link `j`
/// (including the children that link's queries produce).
type Position = (usize, usize);

/// Validate a plan against the seeds and entries already in `registry`.
pub fn validate_plan(
    specs: &[ResourceSpec],
    registry: &AddressRegistry,
) -> Result<(), OrchestrationError> {
    let declared = declared_positions(specs, registry)?;

    for (i, spec) in specs.iter().enumerate() {
        let check = |name: &str, at: Position| check_reference(&declared, registry, spec, name, at);

        check_args(&spec.args, (i, 0), &check)?;

        for (j, link) in spec.links.iter().enumerate() {
            let at = (i, j + 1);
            if let Some(target) = &link.target {
                check(target, at)?;
            }
            check_args(&link.args, at, &check)?;
            for query in &link.queries {
                check_args(&query.args, at, &check)?;
            }
        }
    }

    tracing::debug!(components = specs.len(), "Deployment order validated");

    Ok(())
}

fn declared_positions<'a>(
    specs: &'a [ResourceSpec],
    registry: &AddressRegistry,
) -> Result<HashMap<&'a str, Position>, OrchestrationError> {
    let mut declared = HashMap::new();

    for (i, spec) in specs.iter().enumerate() {
        declare(&mut declared, registry, &spec.name, (i, 0))?;
    }
    for (i, spec) in specs.iter().enumerate() {
        for (j, link) in spec.links.iter().enumerate() {
            for query in &link.queries {
                declare(&mut declared, registry, &query.name, (i, j + 1))?;
            }
        }
    }

    Ok(declared)
}

fn declare<'a>(
    declared: &mut HashMap<&'a str, Position>,
    registry: &AddressRegistry,
    name: &'a str,
    at: Position,
) -> Result<(), OrchestrationError> {
    if registry.is_resolved(name) || declared.insert(name, at).is_some() {
        return Err(OrchestrationError::DuplicateComponent {
            name: name.to_string(),
        });
    }
    Ok(())
}

fn check_args<F>(args: &[ArgDescriptor], at: Position, check: &F) -> Result<(), OrchestrationError>
where
    F: Fn(&str, Position) -> Result<(), OrchestrationError>,
{
    for arg in args {
        match arg {
            ArgDescriptor::Reference { component, .. } => check(component, at)?,
            ArgDescriptor::Param { param } => check(&format!("param:{param}"), at)?,
            ArgDescriptor::Encoded { args, .. } => check_args(args, at, check)?,
            ArgDescriptor::Context { .. } | ArgDescriptor::Literal(_) => {}
        }
    }
    Ok(())
}

fn check_reference(
    declared: &HashMap<&str, Position>,
    registry: &AddressRegistry,
    spec: &ResourceSpec,
    reference: &str,
    at: Position,
) -> Result<(), OrchestrationError> {
    let violation = match declared.get(reference) {
        Some(pos) if *pos < at => return Ok(()),
        Some(_) if reference == spec.name => OrderingViolation::SelfReference,
        Some(_) => OrderingViolation::Forward,
        None if registry.is_seeded(reference) || registry.is_resolved(reference) => return Ok(()),
        None => OrderingViolation::Unknown,
    };

    Err(OrchestrationError::InvalidOrdering {
        component: spec.name.clone(),
        reference: reference.to_string(),
        violation,
    })
}
