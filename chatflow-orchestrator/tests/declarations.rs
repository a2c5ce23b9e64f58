mod support;

use std::sync::Arc;

use chatflow_core::{
    handler_fn, CatalogError, Context, HandlerCatalog, MessageSender, StateStore, StepResult,
    Transition, Value,
};
use chatflow_macros::step;
use chatflow_orchestrator::{ChatOrchestrator, LoadError, OrchestratorError, StepDeclarations};
use chatflow_script::CompileError;
use serde_json::json;
use support::{ctx, CountingStore, RecordingSender};

mod flows {
    pub mod greeting {
        use super::super::*;

        #[step]
        pub async fn dummy_start_handler(
            _chat_id: &str,
            _user_input: &Value,
            _context: Context,
            _sender: &dyn MessageSender,
        ) -> StepResult {
            Ok(Transition::new("process", ctx(json!({"data": "dummy"}))))
        }
    }
}

const START_REF: &str = "declarations.flows.greeting.dummy_start_handler";

const PROCESS_SRC: &str = r#"
fn process(chat_id, user_input, context, sender) {
    sender.send_message(chat_id, "Processing " + str(user_input));
    context["data"] = "processed";
    return ("next_state", context);
}
"#;

fn orchestrator() -> (ChatOrchestrator, Arc<CountingStore>, Arc<RecordingSender>) {
    let store = Arc::new(CountingStore::default());
    let sender = Arc::new(RecordingSender::default());
    let orchestrator = ChatOrchestrator::new(Arc::clone(&store), Arc::clone(&sender));
    (orchestrator, store, sender)
}

#[tokio::test]
async fn json_file_mixes_qualified_references_and_inline_source() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("steps.json");
    let document = json!({"start": START_REF, "process": PROCESS_SRC});
    std::fs::write(&path, serde_json::to_string_pretty(&document).unwrap()).unwrap();

    let (mut orchestrator, store, sender) = orchestrator();
    orchestrator.register_steps_from_json(&path).unwrap();
    assert_eq!(orchestrator.registry().state_ids(), vec!["process", "start"]);

    orchestrator.handle_message("c1", "hi").await.unwrap();
    let state = store.inner.get_state("c1").await.unwrap();
    assert_eq!(state.state_id.as_deref(), Some("process"));
    assert_eq!(Value::Object(state.context), json!({"data": "dummy"}));

    orchestrator.handle_message("c1", 42).await.unwrap();
    let state = store.inner.get_state("c1").await.unwrap();
    assert_eq!(state.state_id.as_deref(), Some("next_state"));
    assert_eq!(Value::Object(state.context), json!({"data": "processed"}));
    assert_eq!(sender.texts(), vec!["Processing 42"]);
}

#[test]
fn inline_import_is_a_security_error_and_registers_nothing() {
    let (mut orchestrator, _, _) = orchestrator();
    let declarations = StepDeclarations::new().with(
        "start",
        "import os\nfn start(chat_id, user_input, context, sender) { return (\"start\", context); }",
    );
    // Without the semicolon this is a syntax error.
    let err = orchestrator.register_steps(&declarations).unwrap_err();
    assert!(matches!(
        err,
        OrchestratorError::Load(LoadError::Inline {
            source: CompileError::Syntax(_),
            ..
        })
    ));

    let declarations = StepDeclarations::new().with(
        "start",
        "import os;\nfn start(chat_id, user_input, context, sender) { return (\"start\", context); }",
    );
    let err = orchestrator.register_steps(&declarations).unwrap_err();
    assert!(err.is_security());
    assert!(err.is_configuration());
    assert!(orchestrator.registry().is_empty());
}

#[test]
fn denylisted_calls_and_attributes_are_rejected() {
    for source in [
        "fn h(chat_id, user_input, context, sender) { os.system(\"ls\"); return (\"s\", context); }",
        "fn h(chat_id, user_input, context, sender) { return (eval(\"1 + 1\"), context); }",
        "fn h(chat_id, user_input, context, sender) { let o = context.os; return (\"s\", context); }",
    ] {
        let (mut orchestrator, _, _) = orchestrator();
        let err = orchestrator
            .register_steps(&StepDeclarations::new().with("start", source))
            .unwrap_err();
        assert!(err.is_security(), "{source}: {err}");
        assert!(!orchestrator.registry().contains("start"));
    }
}

#[test]
fn batch_loading_stops_at_first_failure() {
    let (mut orchestrator, _, _) = orchestrator();
    let declarations: StepDeclarations = [
        ("start", START_REF),
        (
            "broken",
            "fn broken(chat_id, user_input) { return (\"x\", {}); }",
        ),
        ("later", START_REF),
    ]
    .into_iter()
    .collect();

    let err = orchestrator.register_steps(&declarations).unwrap_err();
    match err {
        OrchestratorError::Load(LoadError::Inline { state_id, source }) => {
            assert_eq!(state_id, "broken");
            assert!(source.to_string().contains("exactly 4 arguments"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(orchestrator.registry().contains("start"));
    assert!(!orchestrator.registry().contains("broken"));
    assert!(!orchestrator.registry().contains("later"));
}

#[test]
fn function_count_errors_name_the_rule() {
    let (mut orchestrator, _, _) = orchestrator();
    let two = "fn a(w, x, y, z) { return (\"s\", y); }\nfn b(w, x, y, z) { return (\"s\", y); }";
    let err = orchestrator
        .register_steps(&StepDeclarations::new().with("start", two))
        .unwrap_err();
    assert!(err
        .to_string()
        .contains("must define exactly one top-level function"));
}

#[test]
fn unresolved_references_keep_catalog_reason() {
    let (mut orchestrator, _, _) = orchestrator();

    let err = orchestrator
        .register_steps(&StepDeclarations::new().with("start", "no_such.module.handler"))
        .unwrap_err();
    assert!(matches!(
        err,
        OrchestratorError::Load(LoadError::Unresolved {
            reason: CatalogError::ModuleNotFound { .. },
            ..
        })
    ));

    let err = orchestrator
        .register_steps(
            &StepDeclarations::new().with("start", "declarations.flows.greeting.missing"),
        )
        .unwrap_err();
    assert!(matches!(
        err,
        OrchestratorError::Load(LoadError::Unresolved {
            reason: CatalogError::FunctionNotFound { .. },
            ..
        })
    ));
    assert!(!err.is_security());
    assert!(err.is_configuration());
}

#[tokio::test]
async fn explicit_catalog_replaces_collected_steps() {
    let catalog = HandlerCatalog::new()
        .with_handler(
            "billing.invoices.open",
            Arc::new(handler_fn(|_, _, context, _| {
                Ok(Transition::new("invoice_open", context))
            })),
        )
        .unwrap();
    let (orchestrator, store, _) = orchestrator();
    let mut orchestrator = orchestrator.with_catalog(catalog);

    assert!(orchestrator
        .register_steps(&StepDeclarations::new().with("start", START_REF))
        .is_err());
    orchestrator
        .register_steps(&StepDeclarations::new().with("start", "billing::invoices::open"))
        .unwrap();

    orchestrator.handle_message("c1", "hi").await.unwrap();
    assert_eq!(
        store.inner.get_state("c1").await.unwrap().state_id.as_deref(),
        Some("invoice_open")
    );
}

#[test]
fn unreadable_or_malformed_files_are_source_errors() {
    let dir = tempfile::tempdir().unwrap();
    let (mut orchestrator, _, _) = orchestrator();

    let err = orchestrator
        .register_steps_from_json(dir.path().join("missing.json"))
        .unwrap_err();
    assert!(matches!(err, OrchestratorError::Load(LoadError::Source { .. })));

    let path = dir.path().join("steps.json");
    std::fs::write(&path, r#"{"start": ["not", "a", "string"]}"#).unwrap();
    let err = orchestrator.register_steps_from_json(&path).unwrap_err();
    assert!(matches!(err, OrchestratorError::Load(LoadError::Source { .. })));
}

#[test]
fn declarations_keep_document_order() {
    let declarations =
        StepDeclarations::from_json_str(r#"{"zeta": "a.b", "alpha": "c.d", "mid": "e.f"}"#)
            .unwrap();
    let ids: Vec<_> = declarations.iter().map(|(id, _)| id).collect();
    assert_eq!(ids, vec!["zeta", "alpha", "mid"]);
}
