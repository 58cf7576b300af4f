//! Pipeline orchestrator.

use std::{
    collections::HashSet,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
};

use rayon::prelude::*;
use tracing::{debug, warn};
use trellis_manifest::{Manifest, Target};
use trellis_syntax::SyntaxTree;

use crate::{
    ConfigError, PipelineFault, UnitContext,
    lowering::{LoweringPlan, panic_message},
    observer::StageObserver,
    plugins::PluginCatalog,
    registry::{ExtensionRegistry, RegistryBuilder},
    report::{RunReport, UnitOutcome, UnitReport},
    stage::{AnalyzeStage, BuildIrStage, CodegenStage, LowerStage, Stage, StageOutcome},
};

/// How far each unit is taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Analysis only.
    Check,
    /// Every stage.
    Build,
}

/// The compilation pipeline for one run.
///
/// Holds the frozen registry and the lowering plan, both built before any
/// unit is processed, so every configuration error surfaces up front.
///
/// ```ignore
/// let pipeline = Pipeline::from_manifest(&manifest, &PluginCatalog::builtin())?
///     .observer(Arc::new(SnapshotObserver::new()));
/// let report = pipeline.run(&units)?;
/// ```
pub struct Pipeline {
    registry: Arc<ExtensionRegistry>,
    plan: Arc<LoweringPlan>,
    stages: Vec<Box<dyn Stage>>,
    observers: Vec<Arc<dyn StageObserver>>,
}

impl Pipeline {
    /// Build the lowering plan for `target` and the stage sequence.
    pub fn new(registry: ExtensionRegistry, target: Target) -> Result<Self, ConfigError> {
        let registry = Arc::new(registry);
        let plan = Arc::new(LoweringPlan::build(target, &registry)?);
        let stages: Vec<Box<dyn Stage>> = vec![
            Box::new(AnalyzeStage::new(Arc::clone(&registry))),
            Box::new(BuildIrStage),
            Box::new(LowerStage::new(Arc::clone(&plan))),
            Box::new(CodegenStage::new(target)),
        ];

        Ok(Self {
            registry,
            plan,
            stages,
            observers: Vec::new(),
        })
    }

    /// Discover the manifest's plugins and build the pipeline for its target.
    pub fn from_manifest(manifest: &Manifest, catalog: &PluginCatalog) -> Result<Self, ConfigError> {
        let registry = RegistryBuilder::discover(manifest, catalog)?.build();
        Self::new(registry, manifest.project.target)
    }

    /// Add an observer to receive stage callbacks.
    pub fn observer(mut self, observer: Arc<dyn StageObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn registry(&self) -> &ExtensionRegistry {
        &self.registry
    }

    pub fn plan(&self) -> &LoweringPlan {
        &self.plan
    }

    pub fn target(&self) -> Target {
        self.plan.target()
    }

    /// Stage names in execution order.
    pub fn stages(&self) -> impl Iterator<Item = (&'static str, &'static str)> + '_ {
        self.stages.iter().map(|s| (s.name(), s.description()))
    }

    /// Analyze every unit without building IR.
    pub fn check(&self, units: &[SyntaxTree]) -> Result<RunReport, ConfigError> {
        self.run_units(units, Mode::Check)
    }

    /// Take every unit through all stages.
    pub fn run(&self, units: &[SyntaxTree]) -> Result<RunReport, ConfigError> {
        self.run_units(units, Mode::Build)
    }

    /// Reject runs where two units share a name, since everything a unit
    /// produces is keyed by it.
    pub fn validate_units(units: &[SyntaxTree]) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for tree in units {
            if !seen.insert(tree.unit()) {
                return Err(ConfigError::DuplicateUnit {
                    unit: tree.unit().to_string(),
                });
            }
        }
        Ok(())
    }

    /// Units run in parallel; the report keeps input order.
    fn run_units(&self, units: &[SyntaxTree], mode: Mode) -> Result<RunReport, ConfigError> {
        Self::validate_units(units)?;

        let reports = rayon::ThreadPoolBuilder::new()
            .build_scoped(rayon::ThreadBuilder::run, |pool| {
                pool.install(|| {
                    units
                        .par_iter()
                        .map(|tree| self.run_unit(tree, mode))
                        .collect::<Vec<_>>()
                })
            })
            .unwrap_or_else(|e| {
                warn!("failed to create thread pool ({e}), running units sequentially");
                units.iter().map(|tree| self.run_unit(tree, mode)).collect()
            });

        Ok(RunReport { units: reports })
    }

    fn run_unit(&self, tree: &SyntaxTree, mode: Mode) -> UnitReport {
        let mut ctx = UnitContext::new(tree);
        let stages = match mode {
            Mode::Check => &self.stages[..1],
            Mode::Build => &self.stages[..],
        };

        let outcome = match self.run_stages(stages, &mut ctx) {
            Err(fault) => {
                warn!(unit = tree.unit(), %fault, "unit faulted");
                UnitOutcome::Faulted(fault)
            }
            Ok(()) if ctx.diagnostics.has_errors() => UnitOutcome::Rejected,
            Ok(()) => match ctx.artifact.take() {
                Some(artifact) => UnitOutcome::Compiled(artifact),
                None => UnitOutcome::Checked,
            },
        };

        UnitReport {
            unit: tree.unit().to_string(),
            diagnostics: ctx.diagnostics.sorted(),
            outcome,
        }
    }

    fn run_stages(&self, stages: &[Box<dyn Stage>], ctx: &mut UnitContext<'_>) -> Result<(), PipelineFault> {
        for stage in stages {
            let name = stage.name();
            self.notify(name, ctx, |o, ctx| o.on_before_stage(name, ctx))?;

            debug!(unit = ctx.unit(), stage = name, "running stage");
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| stage.run(ctx)))
                .map_err(|payload| {
                    PipelineFault::invariant(
                        name,
                        format!("panicked: {}", panic_message(payload.as_ref())),
                    )
                })??;

            self.notify(name, ctx, |o, ctx| o.on_after_stage(name, ctx))?;
            if outcome == StageOutcome::Halt {
                debug!(unit = ctx.unit(), stage = name, "unit halted");
                break;
            }
        }
        Ok(())
    }

    fn notify<F>(&self, stage: &str, ctx: &UnitContext<'_>, f: F) -> Result<(), PipelineFault>
    where
        F: Fn(&dyn StageObserver, &UnitContext<'_>) -> eyre::Result<()>,
    {
        for observer in &self.observers {
            f(observer.as_ref(), ctx).map_err(|e| PipelineFault::Observer {
                observer: observer.name().to_string(),
                stage: stage.to_string(),
                message: format!("{e:#}"),
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::stage::{BUILD_IR, CODEGEN};

    struct CountingObserver {
        stage: &'static str,
        before: AtomicUsize,
        after: AtomicUsize,
    }

    impl CountingObserver {
        fn new(stage: &'static str) -> Arc<Self> {
            Arc::new(Self {
                stage,
                before: AtomicUsize::new(0),
                after: AtomicUsize::new(0),
            })
        }
    }

    impl StageObserver for CountingObserver {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn on_before_stage(&self, stage: &str, _ctx: &UnitContext<'_>) -> eyre::Result<()> {
            if stage == self.stage {
                self.before.fetch_add(1, Ordering::SeqCst);
            }
            Ok(())
        }

        fn on_after_stage(&self, stage: &str, _ctx: &UnitContext<'_>) -> eyre::Result<()> {
            if stage == self.stage {
                self.after.fetch_add(1, Ordering::SeqCst);
            }
            Ok(())
        }
    }

    struct Failing;

    impl StageObserver for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn on_before_stage(&self, stage: &str, _ctx: &UnitContext<'_>) -> eyre::Result<()> {
            if stage == CODEGEN {
                eyre::bail!("disk full");
            }
            Ok(())
        }
    }

    fn unit(name: &str, body: &str) -> SyntaxTree {
        let source = format!(
            "[[items]]\nkind = \"function\"\nname = \"main\"\nbody = [{}]\n",
            body
        );
        trellis_syntax::parse_str_with_filename(&source, &format!("{}.toml", name), name).unwrap()
    }

    fn host_pipeline(target: Target) -> Pipeline {
        Pipeline::new(RegistryBuilder::with_host().build(), target).unwrap()
    }

    #[test]
    fn test_run_compiles_units_in_input_order() {
        let units: Vec<_> = (0..8)
            .map(|i| unit(&format!("u{}", i), r#"{ kind = "return" }"#))
            .collect();

        let report = host_pipeline(Target::Native).run(&units).unwrap();

        assert!(report.is_success());
        assert_eq!(
            report.units.iter().map(|u| u.unit.clone()).collect::<Vec<_>>(),
            (0..8).map(|i| format!("u{}", i)).collect::<Vec<_>>()
        );
        assert_eq!(report.units[3].artifact().map(|a| a.file_name()), Some("u3.lst".into()));
    }

    #[test]
    fn test_check_stops_after_analysis() {
        let counter = CountingObserver::new(BUILD_IR);
        let pipeline = host_pipeline(Target::Native).observer(counter.clone());

        let report = pipeline.check(&[unit("main", r#"{ kind = "return" }"#)]).unwrap();

        assert_eq!(report.units[0].outcome, UnitOutcome::Checked);
        assert_eq!(counter.before.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_rejected_unit_does_not_stop_others() {
        let units = [
            unit("bad", r#"{ kind = "expr", value = { kind = "ref", name = "nope" } }"#),
            unit("good", r#"{ kind = "return" }"#),
        ];

        let report = host_pipeline(Target::Native).run(&units).unwrap();

        assert_eq!(report.units[0].outcome, UnitOutcome::Rejected);
        assert_eq!(report.units[0].diagnostics.len(), 1);
        assert!(report.units[1].is_success());
        assert_eq!(report.error_count(), 1);
    }

    #[test]
    fn test_bundle_target_skips_codegen() {
        let counter = CountingObserver::new(CODEGEN);
        let pipeline = host_pipeline(Target::Bundle).observer(counter.clone());

        let report = pipeline.run(&[unit("main", r#"{ kind = "return" }"#)]).unwrap();

        let artifact = report.units[0].artifact().unwrap();
        assert_eq!(artifact.file_name(), "main.bundle.json");
        assert_eq!(counter.before.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_failing_observer_faults_the_unit() {
        let pipeline = host_pipeline(Target::Native).observer(Arc::new(Failing));

        let report = pipeline.run(&[unit("main", r#"{ kind = "return" }"#)]).unwrap();

        assert_eq!(
            report.units[0].fault(),
            Some(&PipelineFault::Observer {
                observer: "failing".into(),
                stage: CODEGEN.into(),
                message: "disk full".into(),
            })
        );
    }

    #[test]
    fn test_duplicate_unit_names_are_rejected_before_running() {
        let counter = CountingObserver::new(crate::stage::ANALYZE);
        let pipeline = host_pipeline(Target::Native).observer(counter.clone());
        let units = [
            unit("main", r#"{ kind = "return" }"#),
            unit("other", r#"{ kind = "return" }"#),
            unit("main", r#"{ kind = "return" }"#),
        ];

        let err = pipeline.run(&units).unwrap_err();

        assert_eq!(
            err,
            ConfigError::DuplicateUnit {
                unit: "main".into()
            }
        );
        assert_eq!(counter.before.load(Ordering::SeqCst), 0);
        assert!(pipeline.check(&units).is_err());
    }
}
