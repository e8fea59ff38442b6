use std::path::{Path, PathBuf};
use std::{fs, process};

use clap::Parser;
use lincheck_cli::{App, Command, FmtArgs, GenerateArgs, VerifyArgs};
use lincheck_core::history::display::format_history;
use lincheck_core::{check, Engine, History, Witness};
use lincheck_parser::parse_history;
use lincheck_testgen::generator::{
    generate_labelled_histories, generate_mult_histories, GeneratedHistory,
};
use lincheck_testgen::predicates::{intervals_strictly_ordered, reads_follow_false_cas};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let app = App::parse();
    match &app.command {
        Command::Generate(args) => generate(args),
        Command::Verify(args) => verify(args),
        Command::Fmt(args) => fmt(args),
        Command::Schema => schema(),
    }
}

fn fail(message: &str) -> ! {
    eprintln!("{message}");
    process::exit(1);
}

fn generate(args: &GenerateArgs) {
    fs::create_dir_all(&args.output_dir)
        .unwrap_or_else(|e| fail(&format!("Failed to create output directory: {e}")));

    let params = args.params();
    let histories = match args.label {
        Some(n_linearizable) => {
            generate_labelled_histories(args.n_hist, n_linearizable, args.max_attempts, &params)
        }
        None => generate_mult_histories(args.n_hist, &params),
    }
    .unwrap_or_else(|e| fail(&format!("Failed to generate histories: {e}")));

    for history in &histories {
        let path = args.output_dir.join(format!("{}.json", history.get_id()));
        let file = fs::File::create(&path)
            .unwrap_or_else(|e| fail(&format!("Failed to create {}: {e}", path.display())));
        serde_json::to_writer_pretty(file, history)
            .unwrap_or_else(|e| fail(&format!("Failed to write {}: {e}", path.display())));
    }

    println!(
        "Generated {} histories to {}",
        histories.len(),
        args.output_dir.display()
    );
}

/// A `.hist` file, a bare JSON history, or a generated (possibly labelled)
/// JSON history.
fn load(path: &Path) -> Result<(History<u64>, Option<bool>), String> {
    let text = fs::read_to_string(path).map_err(|e| e.to_string())?;
    if path.extension().is_some_and(|ext| ext == "hist") {
        return parse_history(&text)
            .map(|history| (history, None))
            .map_err(|e| e.to_string());
    }
    serde_json::from_str::<GeneratedHistory>(&text)
        .map(|generated| (generated.get_data().clone(), generated.get_verdict()))
        .or_else(|_| serde_json::from_str::<History<u64>>(&text).map(|history| (history, None)))
        .map_err(|e| e.to_string())
}

fn print_witness(witness: &Witness<u64>) {
    println!("  linearizations: {}", witness.count());
    if let Some(order) = witness.order() {
        for call in order.by_order() {
            println!("    {call}");
        }
    }
}

/// A labelled history fails only when the verdict disagrees with its label;
/// an unlabelled one fails when it is rejected.
const fn counts_as_failure(linearizable: bool, expected: Option<bool>) -> bool {
    match expected {
        Some(verdict) => verdict != linearizable,
        None => !linearizable,
    }
}

fn verify(args: &VerifyArgs) {
    let engine = Engine::from(args.engine);
    let mut any_failed = false;

    let mut entries: Vec<PathBuf> = fs::read_dir(&args.input_dir)
        .unwrap_or_else(|e| fail(&format!("Failed to read input directory: {e}")))
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension()
                .is_some_and(|ext| ext == "json" || ext == "hist")
        })
        .collect();

    entries.sort();

    if entries.is_empty() {
        fail(&format!(
            "No .json or .hist files found in {}",
            args.input_dir.display()
        ));
    }

    for path in entries {
        let filename = path.file_name().unwrap_or_default().to_string_lossy();

        let (history, expected) = load(&path)
            .unwrap_or_else(|e| fail(&format!("Failed to parse {filename}: {e}")));

        let result = check(&history, engine);
        let mismatch = expected.is_some_and(|verdict| verdict != result.is_ok());
        any_failed |= counts_as_failure(result.is_ok(), expected);

        if args.json {
            let record = match &result {
                Ok(witness) => serde_json::json!({
                    "file": filename,
                    "ok": true,
                    "expected": expected,
                    "witness": witness,
                }),
                Err(e) => serde_json::json!({
                    "file": filename,
                    "ok": false,
                    "expected": expected,
                    "error": e,
                }),
            };
            println!("{record}");
            continue;
        }

        let verdict = if result.is_ok() { "PASS" } else { "FAIL" };
        let note = if mismatch {
            " (label disagrees)"
        } else {
            ""
        };
        match &result {
            Ok(witness) => {
                println!("{filename}: {verdict}{note}");
                if args.verbose {
                    print_witness(witness);
                }
            }
            Err(e) if args.verbose => {
                println!("{filename}: {verdict}{note}");
                println!("  error: {e}");
                println!("  detail: {e:?}");
            }
            Err(e) => println!("{filename}: {verdict} ({e}){note}"),
        }
        if args.verbose {
            println!(
                "  intervals strictly ordered: {}, reads before false cas: {}",
                intervals_strictly_ordered(&history),
                reads_follow_false_cas(&history)
            );
        }
    }

    if any_failed {
        process::exit(1);
    }
}

fn hist_files(path: &Path) -> Vec<PathBuf> {
    if !path.is_dir() {
        return vec![path.to_path_buf()];
    }
    let mut files: Vec<PathBuf> = fs::read_dir(path)
        .unwrap_or_else(|e| fail(&format!("Failed to read {}: {e}", path.display())))
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|file| file.extension().is_some_and(|ext| ext == "hist"))
        .collect();
    files.sort();
    files
}

fn fmt(args: &FmtArgs) {
    let mut any_failed = false;

    for path in args.paths.iter().flat_map(|path| hist_files(path)) {
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) => {
                eprintln!("{}: {e}", path.display());
                any_failed = true;
                continue;
            }
        };
        let formatted = match parse_history(&text) {
            Ok(history) => format_history(&history),
            Err(e) => {
                eprintln!("{}: {e}", path.display());
                any_failed = true;
                continue;
            }
        };
        if formatted == text {
            continue;
        }
        if args.check {
            println!("{}: not formatted", path.display());
            any_failed = true;
        } else if let Err(e) = fs::write(&path, formatted) {
            eprintln!("{}: {e}", path.display());
            any_failed = true;
        } else {
            println!("{}: formatted", path.display());
        }
    }

    if any_failed {
        process::exit(1);
    }
}

fn schema() {
    let schema = schemars::schema_for!(History<u64>);
    let text = serde_json::to_string_pretty(&schema)
        .unwrap_or_else(|e| fail(&format!("Failed to render schema: {e}")));
    println!("{text}");
}
