use clap::{Parser, Subcommand};
use colored::Colorize;
use log::{debug, LevelFilter};
use pkgversion_core::emitter::{self, Metadata, VersionPolicy};
use pkgversion_core::git::{Git, Vcs};
use pkgversion_core::{normalizer, requirements};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process;

/// pkgversion — PEP 440 versions from git, and the setup.py that carries them
///
/// Exit codes: 0 success, 1 no usable result, 2 error.
#[derive(Parser)]
#[command(name = "pkgversion", version, about, long_about = None)]
struct Cli {
    /// Directory whose git repository is queried
    #[arg(long, global = true, default_value = ".", env = "PKGVERSION_REPO")]
    repo: PathBuf,

    /// Suppress stdout
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Increase log verbosity (repeatable)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize describe strings to PEP 440
    Normalize {
        /// Raw version strings, e.g. 1.2.3-4-gabcdef0
        #[arg(required = true)]
        raw: Vec<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Query git describe in --repo and normalize the result
    Describe {
        /// Print the describe output unchanged
        #[arg(long)]
        raw: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the top-level directory of the repository
    Root,

    /// List the requirements of a pip requirements file
    Requirements {
        /// Path to requirements file
        file: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write setup.py with the current version
    WriteSetup {
        /// Destination (defaults to setup.py at the repository root)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Requirements file used for install_requires
        #[arg(short, long)]
        requirements: Option<PathBuf>,
        /// Extra setup() keyword, value parsed as JSON when possible
        #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_key_value)]
        set: Vec<(String, Value)>,
        /// Explicit version instead of git describe
        #[arg(long)]
        version: Option<String>,
        /// Keep git describe output unnormalized
        #[arg(long)]
        raw_version: bool,
    },

    /// Show version information
    Version,
}

fn parse_key_value(arg: &str) -> Result<(String, Value), String> {
    let (key, value) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got {:?}", arg))?;
    if key.is_empty() {
        return Err(format!("empty key in {:?}", arg));
    }
    let value =
        serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    let mut builder = env_logger::Builder::new();
    builder.filter_level(level);
    if let Ok(spec) = std::env::var("RUST_LOG") {
        builder.parse_filters(&spec);
    }
    builder.init();
}

fn report(err: &pkgversion_core::Error) -> i32 {
    eprintln!("{} {}", "error:".red().bold(), err);
    2
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let quiet = cli.quiet;
    let git = Git::new(&cli.repo);

    let exit_code = match cli.command {
        Commands::Normalize { raw, json } => cmd_normalize(&raw, json, quiet),
        Commands::Describe { raw, json } => cmd_describe(&git, raw, json, quiet),
        Commands::Root => cmd_root(&git, quiet),
        Commands::Requirements { file, json } => cmd_requirements(&file, json, quiet),
        Commands::WriteSetup {
            output,
            requirements,
            set,
            version,
            raw_version,
        } => {
            let policy = if raw_version {
                VersionPolicy::Raw
            } else {
                VersionPolicy::Normalized
            };
            cmd_write_setup(&git, output, requirements, set, version, policy, quiet)
        }
        Commands::Version => {
            if !quiet {
                println!(
                    "pkgversion {} (pkgversion-core {})",
                    env!("CARGO_PKG_VERSION"),
                    env!("CARGO_PKG_VERSION")
                );
            }
            0
        }
    };

    process::exit(exit_code);
}

fn cmd_normalize(inputs: &[String], json: bool, quiet: bool) -> i32 {
    let results: Vec<(&String, Option<normalizer::Version>)> = inputs
        .iter()
        .map(|raw| (raw, normalizer::parse(raw)))
        .collect();
    let all_ok = results.iter().all(|(_, v)| v.is_some());

    if json {
        let entries: Vec<Value> = results
            .iter()
            .map(|(raw, version)| {
                serde_json::json!({
                    "input": raw,
                    "version": version.as_ref().map(ToString::to_string),
                    "components": version,
                })
            })
            .collect();
        if !quiet {
            println!("{}", Value::Array(entries));
        }
    } else {
        for (raw, version) in &results {
            match version {
                Some(v) if !quiet => println!("{}", v),
                Some(_) => {}
                None => eprintln!("{} {:?} is not a PEP 440 version", "error:".red().bold(), raw),
            }
        }
    }

    if all_ok {
        0
    } else {
        1
    }
}

fn cmd_describe(git: &Git, raw: bool, json: bool, quiet: bool) -> i32 {
    let described = match git.describe() {
        Ok(d) => d,
        Err(e) => return report(&e),
    };
    debug!("git describe: {}", described);

    let version = if raw {
        Some(described.clone())
    } else {
        normalizer::normalize(&described)
    };

    if json && !quiet {
        println!(
            "{}",
            serde_json::json!({
                "describe": described,
                "version": version,
            })
        );
    }

    match version {
        Some(v) => {
            if !json && !quiet {
                println!("{}", v);
            }
            0
        }
        None => {
            eprintln!(
                "{} git describe output {:?} is not a PEP 440 version",
                "error:".red().bold(),
                described
            );
            1
        }
    }
}

fn cmd_root(git: &Git, quiet: bool) -> i32 {
    match git.toplevel() {
        Ok(Some(root)) => {
            if !quiet {
                println!("{}", root.display());
            }
            0
        }
        Ok(None) => {
            eprintln!(
                "{} {} is not inside a git repository",
                "error:".red().bold(),
                git.workdir().display()
            );
            1
        }
        Err(e) => report(&e),
    }
}

fn cmd_requirements(file: &Path, json: bool, quiet: bool) -> i32 {
    let reqs = match requirements::list_requirements(file) {
        Ok(r) => r,
        Err(e) => return report(&e),
    };
    let lines: Vec<String> = reqs.iter().map(ToString::to_string).collect();

    if !quiet {
        if json {
            println!("{}", serde_json::json!(lines));
        } else {
            for line in &lines {
                println!("{}", line);
            }
        }
    }
    0
}

fn cmd_write_setup(
    git: &Git,
    output: Option<PathBuf>,
    requirements_file: Option<PathBuf>,
    set: Vec<(String, Value)>,
    version: Option<String>,
    policy: VersionPolicy,
    quiet: bool,
) -> i32 {
    let mut overrides = Metadata::new();
    if let Some(file) = requirements_file {
        match requirements::list_requirements(&file) {
            Ok(reqs) => {
                let names: Vec<Value> = reqs.iter().map(|r| Value::String(r.to_string())).collect();
                overrides.insert("install_requires".into(), Value::Array(names));
            }
            Err(e) => return report(&e),
        }
    }
    overrides.extend(set);
    if let Some(v) = version {
        overrides.insert("version".into(), Value::String(v));
    }

    match emitter::write_setup_py(git, output.as_deref(), overrides, policy) {
        Ok(path) => {
            if !quiet {
                println!("{} {}", "wrote".green(), path.display());
            }
            0
        }
        Err(e) => report(&e),
    }
}
