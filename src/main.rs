//! Demo runner: load a screen document, activate the first screen, then
//! trigger events typed on stdin. Tool-call publications are logged from a
//! subscriber task, standing in for the voice layer.

use std::io::Write;
use std::path::PathBuf;

use screenflow::document::{load_document_from_file, rewrite_placeholder_deeplinks};
use screenflow::{Engine, EngineConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let path: PathBuf = std::env::args()
        .nth(1)
        .unwrap_or_else(|| {
            eprintln!("Usage: screenflow <document.json>");
            std::process::exit(1);
        })
        .into();

    let mut document = load_document_from_file(&path)?;
    let rewritten = rewrite_placeholder_deeplinks(&mut document);
    if rewritten > 0 {
        eprintln!("Rewrote {rewritten} placeholder deeplink(s)");
    }

    let first = document.screens[0].id.clone();
    let mut engine = Engine::new(document, EngineConfig::default())?;
    engine.activate(&first)?;

    // Voice-layer stand-in: log every tool publication
    let mut tools = engine.subscribe_tools();
    tokio::spawn(async move {
        while let Ok(message) = tools.recv().await {
            eprintln!("[tool] {} {}", message.tool, message.params);
        }
    });

    eprintln!("screenflow v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("Session {}", engine.session_id());
    eprintln!("Type an event id and press Enter. /quit to exit.\n");
    print_screen(&engine);

    let stdin = std::io::stdin();
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input == "/quit" {
            break;
        }

        let outcome = engine.trigger_event(input);
        eprintln!(
            "matched={} run={} skipped={} failed={}",
            outcome.matched, outcome.actions_run, outcome.actions_skipped, outcome.actions_failed
        );
        for signal in &outcome.signals {
            eprintln!("[signal] {}", serde_json::to_string(signal)?);
        }
        print_screen(&engine);
    }

    Ok(())
}

fn print_screen(engine: &Engine) {
    if let Some(screen) = engine.active_screen() {
        let title = engine.interpolate(&screen.title);
        eprintln!("── {} ({}) ──", screen.id, title);
        eprintln!("  screenState: {}", engine.screen_state());
        eprintln!("  moduleState: {}", engine.module_state());
    }
}
