//! Codius Manifest CLI
//!
//! Entry point for the `codius-manifest` command-line tool.

use clap::{Parser, Subcommand};
use codius_manifest::validate::{format_findings, validate_document};
use codius_manifest::{
    generate_manifest_from_files, generate_simple_manifest, Manifest, RegistryResolver,
};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "codius-manifest")]
#[command(about = "Generate, validate and resolve Codius deployment manifests", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a manifest from codius.json and codiusvars.json
    Generate {
        /// Path to the variables document (default: codiusvars.json)
        #[arg(long, short = 'v')]
        vars: Option<PathBuf>,

        /// Path to the authored manifest (default: codius.json)
        #[arg(long, short = 'm')]
        manifest: Option<PathBuf>,

        /// Write the generated manifest to a file instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Validate a generated manifest
    Validate {
        /// Path to the manifest file
        manifest: PathBuf,

        /// Output findings in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Resolve a generated manifest into its runtime form
    Resolve {
        /// Path to the manifest file
        manifest: PathBuf,

        /// Write the resolved manifest to a file instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("CODIUS_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .without_time()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            vars,
            manifest,
            output,
        } => {
            run_generate(vars, manifest, output);
        }
        Commands::Validate { manifest, json } => {
            run_validate(&manifest, json);
        }
        Commands::Resolve { manifest, output } => {
            run_resolve(&manifest, output);
        }
    }
}

fn run_generate(vars: Option<PathBuf>, manifest: Option<PathBuf>, output: Option<PathBuf>) {
    let vars_path = vars.unwrap_or_else(|| PathBuf::from("codiusvars.json"));
    let manifest_path = manifest.unwrap_or_else(|| PathBuf::from("codius.json"));

    let resolver = RegistryResolver::new();
    let generated = match generate_manifest_from_files(&vars_path, &manifest_path, &resolver) {
        Ok(generated) => generated,
        Err(e) => {
            eprintln!("Error generating manifest: {}", e);
            process::exit(1);
        }
    };

    write_output(&generated.to_json(), output);
}

fn run_validate(manifest_path: &PathBuf, json_output: bool) {
    let document = match load_document(manifest_path) {
        Ok(document) => document,
        Err(e) => {
            eprintln!("Error reading manifest: {}", e);
            process::exit(1);
        }
    };

    let findings = validate_document(&document);

    if json_output {
        match serde_json::to_string_pretty(&findings) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing output: {}", e);
                process::exit(1);
            }
        }
    } else if findings.is_empty() {
        println!("Manifest valid: {}", manifest_path.display());
    } else {
        eprintln!("{}", format_findings(&findings));
    }

    if findings.is_empty() {
        process::exit(0);
    } else {
        process::exit(1);
    }
}

fn run_resolve(manifest_path: &PathBuf, output: Option<PathBuf>) {
    let manifest = match Manifest::from_file(manifest_path) {
        Ok(manifest) => manifest,
        Err(e) => {
            eprintln!("Error reading manifest: {}", e);
            process::exit(1);
        }
    };

    let simple = match generate_simple_manifest(&manifest) {
        Ok(simple) => simple,
        Err(e) => {
            eprintln!("Error resolving manifest: {}", e);
            process::exit(1);
        }
    };

    write_output(&simple.to_json(), output);
}

fn load_document(path: &PathBuf) -> Result<serde_json::Value, String> {
    let text = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
    serde_json::from_str(&text).map_err(|e| e.to_string())
}

fn write_output(json: &Result<String, serde_json::Error>, output: Option<PathBuf>) {
    let json = match json {
        Ok(json) => json,
        Err(e) => {
            eprintln!("Error serializing output: {}", e);
            process::exit(1);
        }
    };

    match output {
        Some(path) => {
            if let Err(e) = std::fs::write(&path, json) {
                eprintln!("Error writing {}: {}", path.display(), e);
                process::exit(1);
            }
            println!("Wrote {}", path.display());
        }
        None => println!("{}", json),
    }
}
