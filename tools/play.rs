/// Play — terminal playthrough shell for an encounter.
///
/// Usage: play [--seed <n>] [--content <path>] [--config <path>] [--events]
///
/// Commands:
///   <Enter>      — confirm (advance a turn without choices)
///   <n>          — pick choice n
///   desk         — walk up to the desk (reopens a closed dialogue)
///   status       — show meters, health and progress
///   jump <id|n>  — jump to a node id or step number
///   restart      — play again once the run has ended
///   help         — list commands
///   quit         — exit

use guild_encounter::core::engine::NarrativeEngine;
use guild_encounter::core::presenter::{InputOutcome, Surface, TurnPresenter};
use guild_encounter::schema::event::PresentationEvent;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::time::Instant;

fn main() {
    env_logger::init();
    let args: Vec<String> = std::env::args().collect();

    let mut content_path = None;
    let mut config_path = None;
    let mut seed: u64 = 42;
    let mut show_events = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_usage();
                return;
            }
            "--content" if i + 1 < args.len() => {
                i += 1;
                content_path = Some(args[i].clone());
            }
            "--config" if i + 1 < args.len() => {
                i += 1;
                config_path = Some(args[i].clone());
            }
            "--seed" if i + 1 < args.len() => {
                i += 1;
                seed = args[i].parse().unwrap_or(42);
            }
            "--events" => show_events = true,
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let mut builder = NarrativeEngine::builder().seed(seed);
    if let Some(ref path) = content_path {
        builder = if Path::new(path).is_dir() {
            builder.content_dir(path)
        } else {
            builder.content_file(path)
        };
    }
    if let Some(ref path) = config_path {
        builder = builder.config_file(path);
    }
    let engine = match builder.build() {
        Ok(e) => e,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    };

    println!(
        "Loaded {} nodes ({} main-track)",
        engine.content().len(),
        engine.content().count_main_track_nodes()
    );
    println!("Seed: {}", seed);
    println!("Type 'help' for commands.\n");

    let mut presenter = TurnPresenter::new(engine);
    if let Err(e) = presenter.start_encounter() {
        eprintln!("ERROR: {}", e);
        std::process::exit(1);
    }
    let clock = Instant::now();
    settle(&mut presenter, show_events);

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("play> ");
        stdout.flush().ok();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).is_err() || line.is_empty() {
            break;
        }
        let line = line.trim();
        let now = clock.elapsed().as_millis() as u64;

        let parts: Vec<&str> = line.split_whitespace().collect();
        let cmd = parts.first().map(|s| s.to_lowercase()).unwrap_or_default();

        let result = match cmd.as_str() {
            "" => presenter.submit_confirm(now),
            "quit" | "exit" | "q" => {
                println!("Goodbye.");
                break;
            }
            "help" | "h" | "?" => {
                print_help();
                continue;
            }
            "status" => {
                print_status(&presenter);
                continue;
            }
            "desk" => presenter.submit_interact_trigger(now),
            "restart" => presenter.submit_restart(now),
            "jump" => {
                if parts.len() < 2 {
                    println!("Usage: jump <node_id | step number>");
                    continue;
                }
                presenter.jump_to_node(parts[1]).map(|_| InputOutcome::Advanced)
            }
            other => match other.parse::<usize>() {
                Ok(n) if n >= 1 => presenter.submit_choice(n - 1, now),
                _ => {
                    println!("Unknown command: {}. Type 'help'.", other);
                    continue;
                }
            },
        };

        match result {
            Ok(InputOutcome::Debounced) => println!("(too fast, input dropped)"),
            Ok(InputOutcome::Ignored) => match presenter.surface() {
                Surface::Idle => println!("(the dialogue is closed; type 'desk')"),
                _ if cmd == "restart" => println!("(the run is still going)"),
                _ => println!("(pick a numbered choice)"),
            },
            Ok(_) => {}
            Err(e) => println!("ERROR: {}", e),
        }
        settle(&mut presenter, show_events);
    }
}

/// Run frames until nothing is animating, then print what changed.
fn settle(presenter: &mut TurnPresenter, show_events: bool) {
    let mut frames = 0u32;
    while presenter.is_revealing() || presenter.surface() == Surface::Cutscene {
        if let Some(caption) = presenter.interstitial_text() {
            if frames % 60 == 0 {
                println!("\n    {}\n", caption);
            }
        }
        if let Err(e) = presenter.tick() {
            println!("ERROR: {}", e);
            break;
        }
        frames += 1;
    }

    for event in presenter.drain_events() {
        print_event(&event, show_events);
    }
}

fn print_event(event: &PresentationEvent, verbose: bool) {
    match event {
        PresentationEvent::TurnPresented { text, choices, .. } => {
            println!("\n{}\n", strip_markup(text));
            for (i, choice) in choices.iter().enumerate() {
                println!("  {}. {}", i + 1, choice);
            }
            if choices.is_empty() {
                println!("  (Enter to continue)");
            }
        }
        PresentationEvent::StatusChanged {
            snapshot,
            health,
            max_health,
        } => {
            println!(
                "  [fatigue {:>3}%  psyche {:>3}%  time {:>3}%  health {}/{}]",
                snapshot.fatigue, snapshot.psyche, snapshot.time, health, max_health
            );
        }
        PresentationEvent::CueRequested { cue } => println!("  ♪ {}", cue.name()),
        PresentationEvent::CelebrationRequested => println!("  *** confetti ***"),
        PresentationEvent::EndStateReached { banner, .. } => {
            println!("\n========== {} ==========", banner);
            println!("Enter or 'restart' to play again.");
        }
        PresentationEvent::DialogueClosed => {
            println!("  (You step away from the desk. Type 'desk' to go back.)")
        }
        PresentationEvent::CharactersRevealed { .. } => {}
        other if verbose => println!("  {:?}", other),
        _ => {}
    }
}

fn print_status(presenter: &TurnPresenter) {
    let engine = presenter.engine();
    let status = engine.status();
    let health = engine.health();
    let progress = engine.progress();
    println!("  Fatigue:  {:>3}%", status.fatigue);
    println!("  Psyche:   {:>3}%", status.psyche);
    println!("  Time:     {:>3}%", status.time);
    println!("  Health:   {}/{}", health.current(), health.max());
    println!(
        "  Progress: {}/{} ({:.0}%)",
        progress.visited(),
        progress.total(),
        progress.ratio() * 100.0
    );
    println!("  State:    {:?}", engine.state());
    println!("  Rephrase returns to: {}", engine.last_safe_node());
}

fn strip_markup(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_tag = false;
    for c in text.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

fn print_usage() {
    println!("Usage: play [--seed <n>] [--content <path>] [--config <path>] [--events]");
    println!();
    println!("  --content   dialogue RON file or directory (default: built-in guild office)");
    println!("  --config    encounter RON file (default: built-in settings)");
    println!("  --events    print every presentation event");
}

fn print_help() {
    println!("Commands:");
    println!("  <Enter>      confirm (advance a turn without choices)");
    println!("  <n>          pick choice n");
    println!("  desk         walk up to the desk (reopens a closed dialogue)");
    println!("  status       show meters, health and progress");
    println!("  jump <id|n>  jump to a node id or step number");
    println!("  restart      play again once the run has ended");
    println!("  quit         exit");
}
