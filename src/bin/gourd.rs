//! gourd CLI
//!
//! Run the scenarios of a Given/When/Then spec file.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context as _, Result};
use clap::Parser;
use gourd::{RunConfig, Runner, Scenario, DEFAULT_SHELL};
use regex::Regex;

#[derive(Parser, Debug)]
#[command(name = "gourd")]
#[command(version)]
#[command(about = "Run Given/When/Then spec files")]
struct Cli {
    /// Spec file to run, `-` reads from stdin
    #[arg(default_value = "-")]
    path: PathBuf,

    /// Print the parsed scenarios instead of running them
    #[arg(long = "parse-only")]
    parse_only: bool,

    /// Only run scenarios whose Given description matches this regex
    #[arg(short = 'f', long)]
    filter: Option<String>,

    /// Run each scenario in a fresh temporary directory
    #[arg(long)]
    sandbox: bool,

    /// Keep sandbox directories after the run (for debugging)
    #[arg(short = 'k', long = "keep")]
    keep: bool,

    /// Working directory, or the sandbox root with --sandbox
    /// [default: the spec file's directory]
    #[arg(long = "workdir")]
    workdir: Option<PathBuf>,

    /// Shell used to run command lines
    #[arg(long, default_value = DEFAULT_SHELL)]
    shell: String,

    /// Environment variables to set (KEY=VALUE)
    #[arg(short = 'e', long = "env")]
    env_vars: Vec<String>,

    /// Verbose output: debug logging and the execution log of passing scenarios
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<bool> {
    let scenarios = read_scenarios(&cli.path)?;
    log::info!("{} scenario(s) in {}", scenarios.len(), cli.path.display());

    if cli.parse_only {
        for scenario in &scenarios {
            println!("{}", scenario);
        }
        return Ok(true);
    }

    let runner = Runner::new(config(cli)?);
    let result = runner.run_all(&scenarios);

    for case in &result.cases {
        if case.skipped {
            println!("SKIP  {}", case.name);
        } else if case.passed {
            println!("PASS  {} ({}ms)", case.name, case.duration.as_millis());
            if cli.verbose && !case.log.is_empty() {
                for line in case.log.lines() {
                    println!("      {}", line);
                }
            }
        } else {
            println!("FAIL  {}", case.name);
            if let Some(ref err) = case.error {
                println!("      {}", err);
            }
            if !case.log.is_empty() {
                println!("      --- log ---");
                for line in case.log.lines() {
                    println!("      {}", line);
                }
            }
            if let Some(ref wd) = case.workdir {
                println!("      workdir: {}", wd.display());
            }
        }
    }

    println!();
    println!("{}", result.summary());

    Ok(result.all_passed())
}

fn read_scenarios(path: &Path) -> Result<Vec<Scenario>> {
    if path == Path::new("-") {
        return gourd::parse_reader(std::io::stdin().lock()).context("failed to read stdin");
    }
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    gourd::parse_reader(file).with_context(|| format!("failed to read {}", path.display()))
}

fn config(cli: &Cli) -> Result<RunConfig> {
    let filter = cli
        .filter
        .as_deref()
        .map(Regex::new)
        .transpose()
        .context("invalid --filter pattern")?;

    let mut env = Vec::with_capacity(cli.env_vars.len());
    for var in &cli.env_vars {
        let Some((key, value)) = var.split_once('=') else {
            bail!("invalid --env {:?}: expected KEY=VALUE", var);
        };
        env.push((key.to_string(), value.to_string()));
    }

    let spec_dir = if cli.path == Path::new("-") {
        PathBuf::from(".")
    } else {
        match cli.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        }
    };

    let (dir, workdir_root) = if cli.sandbox {
        (spec_dir, cli.workdir.clone())
    } else {
        (cli.workdir.clone().unwrap_or(spec_dir), None)
    };

    Ok(RunConfig {
        dir,
        sandbox: cli.sandbox,
        workdir_root,
        preserve_work: cli.keep,
        filter,
        shell: cli.shell.clone(),
        env,
    })
}
