//! The lowering stage: an ordered sequence of IR passes.
//!
//! Host passes form a fixed skeleton per target. Plugin passes are merged
//! into it according to their placement:
//!
//! ```text
//! [First plugins] [Before(h1)] h1 [After(h1)] ... [Before(hn)] hn [After(hn)] [Last plugins]
//! ```
//!
//! Plugins sharing a slot keep registry order.

mod passes;

use std::{
    any::Any,
    collections::HashMap,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
};

use thiserror::Error;
use tracing::{debug, trace};
use trellis_ir::{Descriptor, DescriptorId, DescriptorTable, IrModule};
use trellis_manifest::{Placement, Target};

pub use passes::{EliminateDeadCode, FlattenBlocks, FoldConstants, host_passes};

use crate::{
    ConfigError, PipelineFault,
    registry::{ExtensionRegistry, HOST_PLUGIN, LoweringPass},
};

/// What a pass can see besides the module it transforms.
pub struct PassContext<'a> {
    descriptors: &'a DescriptorTable,
    pass: &'a str,
    target: Target,
}

impl<'a> PassContext<'a> {
    pub(crate) fn new(descriptors: &'a DescriptorTable, pass: &'a str, target: Target) -> Self {
        Self {
            descriptors,
            pass,
            target,
        }
    }

    pub fn descriptors(&self) -> &DescriptorTable {
        self.descriptors
    }

    pub fn descriptor(&self, id: DescriptorId) -> Option<&Descriptor> {
        self.descriptors.get(id)
    }

    pub fn target(&self) -> Target {
        self.target
    }

    /// Identity of the running pass.
    pub fn pass(&self) -> &str {
        self.pass
    }

    /// Stop this pass. The unit is reported as faulted.
    pub fn abort(&self, message: impl Into<String>) -> PassAbort {
        PassAbort {
            pass: self.pass.to_string(),
            message: message.into(),
        }
    }
}

/// A pass gave up on a unit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{pass} aborted: {message}")]
pub struct PassAbort {
    pass: String,
    message: String,
}

impl PassAbort {
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// One entry in the plan.
#[derive(Clone)]
pub struct LoweringStep {
    /// `plugin/name` identity of the pass.
    pub id: String,
    pub pass: Arc<dyn LoweringPass>,
}

impl std::fmt::Debug for LoweringStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoweringStep").field("id", &self.id).finish()
    }
}

/// Ordered lowering passes for one target. Built once per run.
#[derive(Debug, Clone)]
pub struct LoweringPlan {
    target: Target,
    steps: Vec<LoweringStep>,
}

impl LoweringPlan {
    /// Merge the registry's lowering passes into the host passes for `target`.
    ///
    /// Fails if a plugin pass is anchored to a pass the target does not run.
    pub fn build(target: Target, registry: &ExtensionRegistry) -> Result<Self, ConfigError> {
        let host = host_passes(target);
        let host_names: Vec<&'static str> = host.iter().map(|p| p.name()).collect();

        let mut first = Vec::new();
        let mut last = Vec::new();
        let mut before: HashMap<&str, Vec<LoweringStep>> = HashMap::new();
        let mut after: HashMap<&str, Vec<LoweringStep>> = HashMap::new();

        for (record, pass) in registry.lowering_passes() {
            let step = LoweringStep {
                id: record.id.to_string(),
                pass: Arc::clone(pass),
            };
            let placement = record.placement.clone().unwrap_or_default();

            match &placement {
                Placement::First => first.push(step),
                Placement::Last => last.push(step),
                Placement::Before(anchor) | Placement::After(anchor) => {
                    let Some(anchor) = host_names.iter().find(|h| **h == anchor.as_str()) else {
                        return Err(ConfigError::UnknownAnchor {
                            pass: step.id,
                            anchor: anchor.clone(),
                            target,
                            available: host_names.join(", "),
                        });
                    };
                    let slot = if matches!(placement, Placement::Before(_)) {
                        &mut before
                    } else {
                        &mut after
                    };
                    slot.entry(*anchor).or_default().push(step);
                }
            }
        }

        let mut steps = first;
        for pass in host {
            let name = pass.name();
            steps.extend(before.remove(name).unwrap_or_default());
            steps.push(LoweringStep {
                id: format!("{}/{}", HOST_PLUGIN, name),
                pass,
            });
            steps.extend(after.remove(name).unwrap_or_default());
        }
        steps.extend(last);

        debug!(
            %target,
            passes = ?steps.iter().map(|s| s.id.as_str()).collect::<Vec<_>>(),
            "built lowering plan"
        );
        Ok(Self { target, steps })
    }

    pub fn target(&self) -> Target {
        self.target
    }

    pub fn steps(&self) -> &[LoweringStep] {
        &self.steps
    }

    /// Pass identities, in execution order.
    pub fn names(&self) -> Vec<String> {
        self.steps.iter().map(|s| s.id.clone()).collect()
    }

    /// Whether every pass in the plan declares itself idempotent.
    pub fn is_idempotent(&self) -> bool {
        self.steps.iter().all(|s| s.pass.idempotent())
    }

    /// Run every pass in order over `module`.
    ///
    /// The module is verified after each pass. A panic, an abort or a
    /// verification failure stops the plan and is reported as a fault
    /// naming the pass. On success the module is compacted.
    pub fn run(&self, module: &mut IrModule, descriptors: &DescriptorTable) -> Result<(), PipelineFault> {
        for step in &self.steps {
            let ctx = PassContext::new(descriptors, &step.id, self.target);

            match panic::catch_unwind(AssertUnwindSafe(|| step.pass.run(module, &ctx))) {
                Ok(Ok(())) => {}
                Ok(Err(abort)) => {
                    return Err(PipelineFault::PassAborted {
                        pass: step.id.clone(),
                        message: abort.message,
                    });
                }
                Err(payload) => {
                    return Err(PipelineFault::PassPanicked {
                        pass: step.id.clone(),
                        message: panic_message(payload.as_ref()),
                    });
                }
            }

            module
                .verify(descriptors)
                .map_err(|source| PipelineFault::MalformedIr {
                    pass: step.id.clone(),
                    source,
                })?;
            trace!(pass = %step.id, nodes = module.len(), "ran lowering pass");
        }

        module.compact();
        Ok(())
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use trellis_ir::{IrKind, Ty};

    use super::*;
    use crate::{Extension, ExtensionPoint, RegistryBuilder};

    struct Stub {
        name: &'static str,
        placement: Placement,
    }

    impl LoweringPass for Stub {
        fn name(&self) -> &'static str {
            self.name
        }

        fn placement(&self) -> Placement {
            self.placement.clone()
        }

        fn run(&self, _module: &mut IrModule, _ctx: &PassContext<'_>) -> Result<(), PassAbort> {
            Ok(())
        }
    }

    fn register(builder: &mut RegistryBuilder, name: &'static str, placement: Placement) {
        builder
            .register(
                "p",
                ExtensionPoint::IrLowering,
                Extension::lowering(Stub { name, placement }),
                None,
            )
            .unwrap();
    }

    #[test]
    fn test_plugin_passes_merge_around_host_passes() {
        let mut builder = RegistryBuilder::new();
        register(&mut builder, "tail", Placement::Last);
        register(&mut builder, "head", Placement::First);
        register(&mut builder, "pre-dce", Placement::Before("eliminate-dead-code".into()));
        register(&mut builder, "post-fold", Placement::After("fold-constants".into()));
        let registry = builder.build();

        let plan = LoweringPlan::build(Target::Native, &registry).unwrap();

        assert_eq!(
            plan.names(),
            vec![
                "p/head",
                "host/fold-constants",
                "p/post-fold",
                "p/pre-dce",
                "host/eliminate-dead-code",
                "host/flatten-blocks",
                "p/tail",
            ]
        );
        assert!(!plan.is_idempotent());
    }

    #[test]
    fn test_unknown_anchor_is_a_config_error() {
        let mut builder = RegistryBuilder::new();
        register(&mut builder, "x", Placement::After("flatten-blocks".into()));
        let registry = builder.build();

        // Bundle output only folds constants.
        let err = LoweringPlan::build(Target::Bundle, &registry).unwrap_err();

        assert!(matches!(
            err,
            ConfigError::UnknownAnchor { pass, anchor, .. } if pass == "p/x" && anchor == "flatten-blocks"
        ));
        assert!(LoweringPlan::build(Target::Native, &registry).is_ok());
    }

    #[test]
    fn test_host_plan_is_idempotent() {
        let registry = RegistryBuilder::with_host().build();
        let plan = LoweringPlan::build(Target::Native, &registry).unwrap();

        assert!(plan.is_idempotent());
        assert_eq!(plan.target(), Target::Native);
    }

    struct Panics;

    impl LoweringPass for Panics {
        fn name(&self) -> &'static str {
            "panics"
        }

        fn run(&self, _module: &mut IrModule, _ctx: &PassContext<'_>) -> Result<(), PassAbort> {
            panic!("boom");
        }
    }

    struct Aborts;

    impl LoweringPass for Aborts {
        fn name(&self) -> &'static str {
            "aborts"
        }

        fn run(&self, _module: &mut IrModule, ctx: &PassContext<'_>) -> Result<(), PassAbort> {
            Err(ctx.abort("not today"))
        }
    }

    struct Corrupts;

    impl LoweringPass for Corrupts {
        fn name(&self) -> &'static str {
            "corrupts"
        }

        fn run(&self, module: &mut IrModule, _ctx: &PassContext<'_>) -> Result<(), PassAbort> {
            let stray = module.alloc(IrKind::Block, None, Ty::Unit, Vec::new());
            module.push_child(module.root(), stray);
            Ok(())
        }
    }

    fn run_single(extension: Extension) -> Result<(), PipelineFault> {
        let mut builder = RegistryBuilder::new();
        builder
            .register("p", ExtensionPoint::IrLowering, extension, None)
            .unwrap();
        let plan = LoweringPlan::build(Target::Bundle, &builder.build()).unwrap();
        let mut module = IrModule::new("main");
        plan.run(&mut module, &DescriptorTable::new())
    }

    #[test]
    fn test_panicking_pass_becomes_fault() {
        let fault = run_single(Extension::lowering(Panics)).unwrap_err();
        assert_eq!(
            fault,
            PipelineFault::PassPanicked {
                pass: "p/panics".into(),
                message: "boom".into()
            }
        );
    }

    #[test]
    fn test_aborting_pass_becomes_fault() {
        let fault = run_single(Extension::lowering(Aborts)).unwrap_err();
        assert_eq!(fault.pass(), Some("p/aborts"));
        assert!(matches!(fault, PipelineFault::PassAborted { message, .. } if message == "not today"));
    }

    #[test]
    fn test_malformed_output_names_the_pass() {
        let fault = run_single(Extension::lowering(Corrupts)).unwrap_err();
        assert!(matches!(fault, PipelineFault::MalformedIr { pass, .. } if pass == "p/corrupts"));
    }
}
