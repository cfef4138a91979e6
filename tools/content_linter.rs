/// Content Linter — validates dialogue graph closure and authoring quality.
///
/// Usage: content_linter <dialogue.ron | content_dir> [--config <encounter.ron>]

use guild_encounter::core::config::EncounterConfig;
use guild_encounter::core::content::{ContentError, ContentTable};
use guild_encounter::schema::node::NodeCategory;
use std::collections::HashSet;
use std::path::Path;
use std::process;

fn main() {
    env_logger::init();
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        println!("Usage: content_linter <dialogue.ron | content_dir> [--config <encounter.ron>]");
        process::exit(0);
    }

    let content_path = &args[1];
    let mut config_path = None;

    let mut i = 2;
    while i < args.len() {
        if args[i] == "--config" && i + 1 < args.len() {
            i += 1;
            config_path = Some(args[i].clone());
        }
        i += 1;
    }

    let config = match config_path {
        Some(ref path) => match EncounterConfig::load_from_ron(Path::new(path)) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("ERROR: Failed to load config file: {}", e);
                process::exit(1);
            }
        },
        None => EncounterConfig::default(),
    };

    let mut table = ContentTable::default();
    let path = Path::new(content_path);

    if path.is_file() {
        match ContentTable::load_from_ron(path) {
            Ok(t) => table.merge(t),
            Err(e) => {
                eprintln!("ERROR: Failed to load content file: {}", e);
                process::exit(1);
            }
        }
    } else if path.is_dir() {
        load_content_recursive(path, &mut table);
    } else {
        eprintln!("ERROR: Path '{}' does not exist", content_path);
        process::exit(1);
    }

    table.classify(&config);
    println!("Loaded {} nodes", table.len());

    let (errors, warnings) = lint_content(&table, &config);

    println!("\n=== Content Lint Report ===\n");

    if errors.is_empty() && warnings.is_empty() {
        println!("All checks passed!");
    }

    for warning in &warnings {
        println!("WARNING: {}", warning);
    }

    for error in &errors {
        println!("ERROR: {}", error);
    }

    println!(
        "\nSummary: {} errors, {} warnings ({} main-track nodes)",
        errors.len(),
        warnings.len(),
        table.count_main_track_nodes()
    );

    if errors.is_empty() {
        process::exit(0);
    } else {
        process::exit(1);
    }
}

fn load_content_recursive(dir: &Path, table: &mut ContentTable) {
    if let Ok(entries) = std::fs::read_dir(dir) {
        let mut paths: Vec<_> = entries.flatten().map(|e| e.path()).collect();
        paths.sort();
        for path in paths {
            if path.is_dir() {
                load_content_recursive(&path, table);
            } else if path.extension().and_then(|s| s.to_str()) == Some("ron") {
                match ContentTable::load_from_ron(&path) {
                    Ok(t) => {
                        println!("  Loaded: {}", path.display());
                        table.merge(t);
                    }
                    Err(e) => {
                        eprintln!("  ERROR loading {}: {}", path.display(), e);
                    }
                }
            }
        }
    }
}

fn lint_content(table: &ContentTable, config: &EncounterConfig) -> (Vec<String>, Vec<String>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    // Closure: dangling targets, missing designated ids, bad fatal ids
    if let Err(ContentError::Invalid(defects)) = table.validate(config) {
        errors.extend(defects.iter().map(|d| d.to_string()));
    }

    // Unreachable nodes. Fail nodes are only reached through choices, so
    // they are checked separately below.
    let mut reachable = table.reachable_from(&config.entry_node);
    reachable.extend(table.reachable_from(&config.interaction_node));
    for id in table.ids_sorted() {
        let is_fail = table
            .class_of(id)
            .map(|c| c.category.is_fail())
            .unwrap_or(false);
        if !is_fail && !reachable.contains(id) {
            warnings.push(format!("Node '{}' is unreachable from the entry node", id));
        }
    }

    // Fail nodes nothing points at
    let targeted: HashSet<&str> = table.nodes().flat_map(|n| n.targets()).collect();
    for id in table.ids_sorted() {
        let class = match table.class_of(id) {
            Ok(c) => c,
            Err(_) => continue,
        };
        if class.category.is_fail() && !targeted.contains(id) {
            let kind = match class.category {
                NodeCategory::FatalFail => "Fatal fail",
                _ => "Fail",
            };
            warnings.push(format!("{} node '{}' is never targeted by any choice", kind, id));
        }
    }

    // Authoring quality
    for id in table.ids_sorted() {
        let Ok(node) = table.get(id) else { continue };
        if node.choices.len() == 1 && node.fallthrough.is_none() {
            warnings.push(format!("Node '{}' offers only one choice", id));
        }
        if !node.choices.is_empty() && node.fallthrough.is_some() {
            warnings.push(format!(
                "Node '{}' has both choices and a fallthrough; the fallthrough is never used",
                id
            ));
        }
        if node.text.matches('<').count() != node.text.matches('>').count() {
            errors.push(format!("Node '{}' has unbalanced markup", id));
        }
        for choice in &node.choices {
            if choice.text.trim().is_empty() {
                errors.push(format!("Node '{}' has a choice with empty text", id));
            }
        }
    }

    (errors, warnings)
}
