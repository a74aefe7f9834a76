//! Point d'entrée de SuriVR : harnais headless piloté au clavier.
//!
//! Usage :
//!   surivr [URL]
//!
//! Le monde est construit sur le moteur headless et rendu par le thread de
//! scène de référence. Chaque ligne de stdin simule une entrée de l'hôte :
//!
//! ```text
//! back | swipe left|right | private | close-private | settings
//! load <url> | preset <n> | focus | resize | quit
//! ```
//!
//! Exemples :
//!   cargo run                              → charge general.default_url
//!   cargo run -- wikipedia.org             → ajoute https:// automatiquement
//!   RUST_LOG=surivr=debug cargo run        → trace chaque commande de rendu

use std::env;
use std::error::Error;
use std::io::{self, BufRead};
use std::rc::Rc;
use std::time::Instant;

use tracing::{info, warn};
use url::Url;

use surivr::config::Config;
use surivr::engine::headless::HeadlessEngine;
use surivr::gesture::SwipeDirection;
use surivr::orchestrator::{BackOutcome, NavigationAction, Orchestrator, TrayEvent};

fn main() -> Result<(), Box<dyn Error>> {
    // ── 1. Logging / Tracing ───────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // ── 2. Configuration ───────────────────────────────────────────────
    let config = Config::load();

    // ── 3. Parser l'URL depuis les arguments CLI ───────────────────────
    let url = parse_url_from_args();

    // ── 4. Thread de rendu ─────────────────────────────────────────────
    let (commands, receiver) = surivr::command::command_queue();
    let render = surivr::scene::spawn_render_thread(receiver)?;

    // ── 5. Monde initial ───────────────────────────────────────────────
    let engine = HeadlessEngine::new();
    let mut orchestrator =
        Orchestrator::new(config, Rc::new(engine.clone()), commands, url.as_ref())?;
    pump(&mut orchestrator, &engine);

    // ── 6. Boucle d'entrées ────────────────────────────────────────────
    for line in io::stdin().lock().lines() {
        let line = line?;
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            continue;
        };
        let now = Instant::now();

        match (command, words.next()) {
            ("quit", _) => break,
            ("back", _) => {
                if orchestrator.back_pressed() == BackOutcome::Exit {
                    info!("Nothing to go back to, exiting");
                    break;
                }
            }
            ("swipe", Some("left")) => {
                orchestrator.handle_gesture(SwipeDirection::Left, now);
            }
            ("swipe", Some("right")) => {
                orchestrator.handle_gesture(SwipeDirection::Right, now);
            }
            ("private", _) => orchestrator.handle_tray_event(TrayEvent::Private),
            ("close-private", _) => {
                orchestrator.exit_private_browsing();
            }
            ("settings", _) => orchestrator.handle_tray_event(TrayEvent::Settings),
            ("load", Some(input)) => {
                let bar = orchestrator.navigation_bar();
                bar.focus_url_bar();
                bar.type_text(input);
                orchestrator.on_navigation_action(NavigationAction::SubmitUrl);
            }
            ("preset", Some(value)) => match value.parse::<f32>() {
                Ok(preset) if preset > 0.0 => {
                    orchestrator.on_navigation_action(NavigationAction::ResizePreset(preset))
                }
                _ => warn!(value, "Invalid preset"),
            },
            ("focus", _) => orchestrator.on_navigation_action(NavigationAction::EnterFocusMode),
            ("resize", _) => orchestrator.on_navigation_action(NavigationAction::EnterResizeMode),
            _ => warn!(%line, "Unknown command"),
        }

        pump(&mut orchestrator, &engine);
        orchestrator.tick(Instant::now());
    }

    // ── 7. Arrêt ───────────────────────────────────────────────────────
    orchestrator.shutdown();
    drop(orchestrator);
    match render.join() {
        Ok(scene) => info!(nodes = scene.len(), "Scene closed"),
        Err(_) => warn!("Render thread panicked"),
    }
    Ok(())
}

/// Réinjecte les notifications du moteur headless dans l'orchestrateur.
fn pump(orchestrator: &mut Orchestrator, engine: &HeadlessEngine) {
    loop {
        let events = engine.take_events();
        if events.is_empty() {
            break;
        }
        for (id, event) in events {
            orchestrator.handle_engine_event(id, event);
        }
    }
}

/// Parse le premier argument CLI comme URL.
/// Si l'argument ne contient pas de schéma (http/https), on ajoute "https://".
fn parse_url_from_args() -> Option<Url> {
    let input = env::args().skip(1).find(|arg| !arg.starts_with("--"))?;

    if let Ok(url) = Url::parse(&input) {
        return Some(url);
    }

    match Url::parse(&format!("https://{input}")) {
        Ok(url) => Some(url),
        Err(error) => {
            warn!(%input, %error, "Invalid URL argument, using default");
            None
        }
    }
}
