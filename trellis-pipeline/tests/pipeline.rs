//! End-to-end tests through the public pipeline API.

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use pretty_assertions::assert_eq;
use trellis_ir::{DescriptorKind, IrKind, IrModule};
use trellis_manifest::{Manifest, Placement, Target};
use trellis_pipeline::{
    AnalysisOutcome, BUILD_IR, DeclarationSite, Diagnostic, DiagnosticSet, DiagnosticSink,
    Extension, ExtensionPoint, LoweringPlan, Pipeline, PipelineFault, PluginCatalog,
    RegistryBuilder, Severity, StageObserver, UnitContext, UnitOutcome, analyze, build_ir,
    lowering::{PassAbort, PassContext},
    registry::{DeclarationChecker, LoweringPass},
};
use trellis_syntax::{SyntaxKind, SyntaxTree};

fn parse(unit: &str, source: &str) -> SyntaxTree {
    trellis_syntax::parse_str_with_filename(source, &format!("{}.toml", unit), unit).unwrap()
}

const CALLS_F: &str = r#"
    [[items]]
    kind = "function"
    name = "f"
    returns = "int"
    body = [{ kind = "return", value = { kind = "binary", op = "*", lhs = { kind = "int", value = 6 }, rhs = { kind = "int", value = 7 } } }]

    [[items]]
    kind = "function"
    name = "main"
    body = [
        { kind = "let", name = "answer", value = { kind = "call", callee = "f", args = [] } },
        { kind = "expr", value = { kind = "call", callee = "print", args = [{ kind = "str", value = "done" }] } },
    ]
"#;

#[test]
fn test_every_reference_is_bound_after_acceptance() {
    let tree = parse("main", CALLS_F);
    let registry = RegistryBuilder::with_host().build();
    let mut diagnostics = DiagnosticSet::new();

    let AnalysisOutcome::Accepted(analysis) = analyze(&tree, &registry, &mut diagnostics).unwrap()
    else {
        panic!("expected acceptance: {:?}", diagnostics.sorted());
    };

    for (id, node) in tree.iter() {
        let binding = analysis.bindings.get(id);
        match &node.kind {
            SyntaxKind::Ref { .. } | SyntaxKind::Call { .. } => {
                assert!(binding.and_then(|b| b.target).is_some(), "{} is unbound", node.path);
            }
            kind if kind.declared_name().is_some() => {
                assert!(binding.and_then(|b| b.declares).is_some(), "{} declares nothing", node.path);
            }
            _ => {}
        }
    }
}

#[test]
fn test_call_binds_to_the_declaring_descriptor() {
    let tree = parse("main", CALLS_F);
    let registry = RegistryBuilder::with_host().build();
    let mut diagnostics = DiagnosticSet::new();
    let AnalysisOutcome::Accepted(analysis) = analyze(&tree, &registry, &mut diagnostics).unwrap()
    else {
        panic!("expected acceptance");
    };

    let declaration = tree
        .iter()
        .find(|(_, n)| matches!(&n.kind, SyntaxKind::Function { name, .. } if name == "f"))
        .map(|(id, _)| id)
        .unwrap();
    let call = tree
        .iter()
        .find(|(_, n)| matches!(&n.kind, SyntaxKind::Call { callee, .. } if callee == "f"))
        .map(|(id, _)| id)
        .unwrap();

    let declares = analysis.bindings.get(declaration).unwrap().declares;
    let target = analysis.bindings.get(call).unwrap().target;
    assert!(declares.is_some());
    assert_eq!(declares, target);

    let descriptor = analysis.descriptors.get(target.unwrap()).unwrap();
    assert_eq!(descriptor.kind, DescriptorKind::Function);
    assert_eq!(descriptor.name, "f");
}

#[test]
fn test_function_and_call_ir_share_the_descriptor_of_f() {
    let tree = parse("main", CALLS_F);
    let registry = RegistryBuilder::with_host().build();
    let mut diagnostics = DiagnosticSet::new();
    let AnalysisOutcome::Accepted(analysis) = analyze(&tree, &registry, &mut diagnostics).unwrap()
    else {
        panic!("expected acceptance");
    };
    let declaration = tree
        .iter()
        .find(|(_, n)| matches!(&n.kind, SyntaxKind::Function { name, .. } if name == "f"))
        .map(|(id, _)| id)
        .unwrap();
    let declares = analysis.bindings.get(declaration).unwrap().declares.unwrap();

    let module = build_ir(&tree, &analysis.bindings, &analysis.descriptors).unwrap();

    let functions: Vec<_> = module
        .preorder()
        .into_iter()
        .filter(|&id| matches!(module.kind(id), IrKind::Function { name } if name == "f"))
        .map(|id| module.node(id).descriptor())
        .collect();
    let calls: Vec<_> = module
        .preorder()
        .into_iter()
        .filter(|&id| matches!(module.kind(id), IrKind::Call))
        .filter_map(|id| module.node(id).descriptor())
        .filter(|&d| analysis.descriptors.get(d).is_some_and(|d| d.name == "f"))
        .collect();

    assert_eq!(functions, vec![Some(declares)]);
    assert_eq!(calls, vec![declares]);
    assert_eq!(analysis.descriptors.get(declares).unwrap().name, "f");
}

#[test]
fn test_diagnostics_are_sealed_after_acceptance() {
    let tree = parse("main", CALLS_F);
    let registry = RegistryBuilder::with_host().build();
    let mut diagnostics = DiagnosticSet::new();
    analyze(&tree, &registry, &mut diagnostics).unwrap();

    let late = diagnostics.push(Diagnostic::error(
        "X0001",
        "too late",
        tree.location(tree.items()[0]),
    ));

    assert!(matches!(late, Err(PipelineFault::LateDiagnostic { .. })));
    assert!(diagnostics.is_empty());
}

#[test]
fn test_repeated_runs_are_identical() {
    let units: Vec<_> = (0..6)
        .map(|i| parse(&format!("unit{}", i), CALLS_F))
        .collect();
    let pipeline = Pipeline::new(RegistryBuilder::with_host().build(), Target::Native).unwrap();

    let first = pipeline.run(&units).unwrap();
    let second = pipeline.run(&units).unwrap();

    let contents = |report: &trellis_pipeline::RunReport| {
        report
            .units
            .iter()
            .map(|u| u.artifact().map(|a| a.content().to_string()))
            .collect::<Vec<_>>()
    };
    assert!(first.is_success());
    assert_eq!(contents(&first), contents(&second));
}

#[test]
fn test_lowering_plan_is_idempotent_over_module() {
    let tree = parse("main", CALLS_F);
    let registry = RegistryBuilder::with_host().build();
    let mut diagnostics = DiagnosticSet::new();
    let AnalysisOutcome::Accepted(analysis) = analyze(&tree, &registry, &mut diagnostics).unwrap()
    else {
        panic!("expected acceptance");
    };
    let plan = LoweringPlan::build(Target::Native, &registry).unwrap();
    assert!(plan.is_idempotent());

    let mut once = build_ir(&tree, &analysis.bindings, &analysis.descriptors).unwrap();
    plan.run(&mut once, &analysis.descriptors).unwrap();
    let mut twice: IrModule = once.clone();
    plan.run(&mut twice, &analysis.descriptors).unwrap();

    assert_eq!(once, twice);
}

struct Noop(Placement);

impl LoweringPass for Noop {
    fn name(&self) -> &'static str {
        "noop"
    }

    fn placement(&self) -> Placement {
        self.0.clone()
    }

    fn run(&self, _module: &mut IrModule, _ctx: &PassContext<'_>) -> Result<(), PassAbort> {
        Ok(())
    }
}

fn plan_with(placement: Placement) -> Vec<String> {
    let mut builder = RegistryBuilder::with_host();
    builder
        .register(
            "p",
            ExtensionPoint::IrLowering,
            Extension::lowering(Noop(placement)),
            None,
        )
        .unwrap();
    LoweringPlan::build(Target::Native, &builder.build())
        .unwrap()
        .names()
}

#[test]
fn test_default_placement_runs_after_host_passes() {
    assert_eq!(
        plan_with(Placement::Last),
        vec![
            "host/fold-constants",
            "host/eliminate-dead-code",
            "host/flatten-blocks",
            "p/noop",
        ]
    );
}

#[test]
fn test_anchored_placement_runs_next_to_anchor() {
    assert_eq!(
        plan_with(Placement::After("fold-constants".into())),
        vec![
            "host/fold-constants",
            "p/noop",
            "host/eliminate-dead-code",
            "host/flatten-blocks",
        ]
    );
}

struct RejectNamed(&'static str);

impl DeclarationChecker for RejectNamed {
    fn name(&self) -> &'static str {
        "reject"
    }

    fn check(&self, site: &DeclarationSite<'_>, sink: &mut DiagnosticSink) {
        if site.descriptor.name == self.0 {
            sink.error("X0001", "rejected", site.location.clone());
        }
    }
}

struct StageCounter {
    stage: &'static str,
    count: AtomicUsize,
}

impl StageObserver for StageCounter {
    fn name(&self) -> &'static str {
        "stage-counter"
    }

    fn on_before_stage(&self, stage: &str, _ctx: &UnitContext<'_>) -> eyre::Result<()> {
        if stage == self.stage {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

#[test]
fn test_checker_error_stops_the_unit_before_ir() {
    let mut builder = RegistryBuilder::with_host();
    builder
        .register(
            "strict",
            ExtensionPoint::DeclarationChecker,
            Extension::declaration_checker(RejectNamed("f")),
            None,
        )
        .unwrap();
    let counter = Arc::new(StageCounter {
        stage: BUILD_IR,
        count: AtomicUsize::new(0),
    });
    let pipeline = Pipeline::new(builder.build(), Target::Native)
        .unwrap()
        .observer(counter.clone());

    let report = pipeline.run(&[parse("main", CALLS_F)]).unwrap();

    assert_eq!(report.units[0].outcome, UnitOutcome::Rejected);
    assert_eq!(report.error_count(), 1);
    assert_eq!(report.units[0].diagnostics[0].reporter.name, "strict/reject");
    assert_eq!(counter.count.load(Ordering::SeqCst), 0);
}

const POINT: &str = r#"
    [[items]]
    kind = "class"
    name = "Point"
    fields = [{ name = "x", type = "int" }, { name = "y", type = "int" }]

    [[items]]
    kind = "function"
    name = "read_x"
    params = [{ name = "p", type = "Point" }]
    returns = "int"
    body = [{ kind = "return", value = { kind = "call", callee = "get_x", args = [{ kind = "ref", name = "p" }] } }]
"#;

#[test]
fn test_accessors_lower_to_field_reads() {
    let manifest: Manifest = r#"
        [project]
        name = "points"

        [[plugins]]
        id = "accessors"
    "#
    .parse()
    .unwrap();
    let pipeline = Pipeline::from_manifest(&manifest, &PluginCatalog::builtin()).unwrap();
    assert_eq!(pipeline.plan().names()[0], "accessors/lower-accessors");

    let report = pipeline.run(&[parse("points", POINT)]).unwrap();

    let listing = report.units[0].artifact().unwrap().content().to_string();
    assert!(listing.contains("getfield Point.x"), "{}", listing);
    assert!(!listing.contains("call get_x"), "{}", listing);
}

#[test]
fn test_accessors_are_unresolved_without_plugin() {
    let pipeline = Pipeline::new(RegistryBuilder::with_host().build(), Target::Native).unwrap();

    let report = pipeline.run(&[parse("points", POINT)]).unwrap();

    assert_eq!(report.units[0].outcome, UnitOutcome::Rejected);
    assert_eq!(report.units[0].diagnostics[0].code, "E0002");
}

#[test]
fn test_manifest_plugins_report_with_configured_severity() {
    let manifest: Manifest = r#"
        [project]
        name = "demo"
        target = "native"

        [[plugins]]
        id = "naming"

        [[plugins]]
        id = "forbid-calls"
        options = { names = "print", severity = "warning" }
    "#
    .parse()
    .unwrap();
    let pipeline = Pipeline::from_manifest(&manifest, &PluginCatalog::builtin()).unwrap();

    let source = r#"
        [[items]]
        kind = "function"
        name = "Main"
        body = [{ kind = "expr", value = { kind = "call", callee = "print", args = [{ kind = "str", value = "hi" }] } }]
    "#;
    let report = pipeline.run(&[parse("demo", source)]).unwrap();

    let unit = &report.units[0];
    assert!(unit.is_success());
    assert_eq!(
        unit.diagnostics
            .iter()
            .map(|d| (d.severity, d.code.as_str(), d.reporter.name.as_str()))
            .collect::<Vec<_>>(),
        vec![
            (Severity::Warning, "N0001", "naming/naming"),
            (Severity::Warning, "F0001", "forbid-calls/forbid-calls"),
        ]
    );
}

#[test]
fn test_units_from_different_directories_cannot_share_a_name() {
    let dir = tempfile::TempDir::new().unwrap();
    let first = dir.path().join("a").join("main.toml");
    let second = dir.path().join("b").join("x.toml");
    for (path, source) in [(&first, String::new()), (&second, "unit = \"main\"\n".to_string())] {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, source).unwrap();
    }
    let units = vec![
        trellis_syntax::parse_file(&first).unwrap(),
        trellis_syntax::parse_file(&second).unwrap(),
    ];
    let pipeline = Pipeline::new(RegistryBuilder::with_host().build(), Target::Native).unwrap();

    let err = pipeline.run(&units).unwrap_err();

    assert_eq!(
        err,
        trellis_pipeline::ConfigError::DuplicateUnit {
            unit: "main".into()
        }
    );
}
