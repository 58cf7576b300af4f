//! The fixed stages every unit goes through.

use std::sync::Arc;

use tracing::debug;
use trellis_manifest::Target;

use crate::{
    PipelineFault, UnitContext,
    analysis::{self, AnalysisOutcome},
    codegen::{Backend, BundleBackend, backend_for},
    ir_builder::build_ir,
    lowering::LoweringPlan,
    registry::ExtensionRegistry,
};

pub const ANALYZE: &str = "analyze";
pub const BUILD_IR: &str = "build-ir";
pub const LOWER: &str = "lower";
pub const CODEGEN: &str = "codegen";

/// Whether the unit should proceed to the next stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
    Continue,
    Halt,
}

/// One step of a unit's run.
pub trait Stage: Send + Sync {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    fn run(&self, ctx: &mut UnitContext<'_>) -> Result<StageOutcome, PipelineFault>;
}

/// Resolution, typing and checkers. The last stage allowed to report
/// diagnostics.
pub struct AnalyzeStage {
    registry: Arc<ExtensionRegistry>,
}

impl AnalyzeStage {
    pub fn new(registry: Arc<ExtensionRegistry>) -> Self {
        Self { registry }
    }
}

impl Stage for AnalyzeStage {
    fn name(&self) -> &'static str {
        ANALYZE
    }

    fn description(&self) -> &'static str {
        "Resolve references, type expressions and run checkers"
    }

    fn run(&self, ctx: &mut UnitContext<'_>) -> Result<StageOutcome, PipelineFault> {
        match analysis::analyze(ctx.tree, &self.registry, &mut ctx.diagnostics)? {
            AnalysisOutcome::Accepted(analysis) => {
                ctx.analysis = Some(analysis);
                Ok(StageOutcome::Continue)
            }
            AnalysisOutcome::Rejected => Ok(StageOutcome::Halt),
        }
    }
}

pub struct BuildIrStage;

impl Stage for BuildIrStage {
    fn name(&self) -> &'static str {
        BUILD_IR
    }

    fn description(&self) -> &'static str {
        "Build the IR module from the resolved tree"
    }

    fn run(&self, ctx: &mut UnitContext<'_>) -> Result<StageOutcome, PipelineFault> {
        let analysis = ctx
            .analysis
            .as_ref()
            .ok_or_else(|| PipelineFault::invariant(BUILD_IR, "unit was not analyzed"))?;
        ctx.ir = Some(build_ir(ctx.tree, &analysis.bindings, &analysis.descriptors)?);
        Ok(StageOutcome::Continue)
    }
}

/// Runs the lowering plan. For the bundle target the lowered IR is the
/// artifact, so this stage also produces it and halts.
pub struct LowerStage {
    plan: Arc<LoweringPlan>,
}

impl LowerStage {
    pub fn new(plan: Arc<LoweringPlan>) -> Self {
        Self { plan }
    }
}

impl Stage for LowerStage {
    fn name(&self) -> &'static str {
        LOWER
    }

    fn description(&self) -> &'static str {
        "Run host and plugin lowering passes"
    }

    fn run(&self, ctx: &mut UnitContext<'_>) -> Result<StageOutcome, PipelineFault> {
        let (Some(module), Some(analysis)) = (ctx.ir.as_mut(), ctx.analysis.as_ref()) else {
            return Err(PipelineFault::invariant(LOWER, "no IR to lower"));
        };
        self.plan.run(module, &analysis.descriptors)?;

        if self.plan.target() == Target::Bundle {
            ctx.artifact = Some(BundleBackend.generate(module, &analysis.descriptors)?);
            debug!(unit = ctx.tree.unit(), "bundled lowered IR");
            return Ok(StageOutcome::Halt);
        }
        Ok(StageOutcome::Continue)
    }
}

pub struct CodegenStage {
    backend: Box<dyn Backend>,
}

impl CodegenStage {
    pub fn new(target: Target) -> Self {
        Self {
            backend: backend_for(target),
        }
    }
}

impl Stage for CodegenStage {
    fn name(&self) -> &'static str {
        CODEGEN
    }

    fn description(&self) -> &'static str {
        "Emit the target artifact"
    }

    fn run(&self, ctx: &mut UnitContext<'_>) -> Result<StageOutcome, PipelineFault> {
        let (Some(module), Some(analysis)) = (ctx.ir.as_ref(), ctx.analysis.as_ref()) else {
            return Err(PipelineFault::invariant(CODEGEN, "no IR to generate from"));
        };
        ctx.artifact = Some(self.backend.generate(module, &analysis.descriptors)?);
        debug!(unit = ctx.tree.unit(), backend = self.backend.name(), "generated artifact");
        Ok(StageOutcome::Continue)
    }
}
