use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use cs_patcher::plan::{
    self, Mode, PatchPlan, RunError, RunOutput, Runner, StepOutcome, StepReport,
};
use similar::{ChangeTag, TextDiff};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cs-patcher")]
#[command(about = "Structural, formatting-preserving patching of C# source trees", long_about = None)]
#[command(version)]
struct Cli {
    /// Raise log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply a patch plan to a project root
    Apply {
        /// Project root (the playwright-dotnet checkout)
        #[arg(env = "CS_PATCHER_ROOT")]
        root: PathBuf,

        /// Plan file (defaults to the built-in Patchright plan)
        #[arg(short, long)]
        plan: Option<PathBuf>,

        /// Show what would change without modifying files
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Show unified diff of changes
        #[arg(short, long)]
        diff: bool,
    },

    /// Show which steps are applied and which are pending
    Status {
        #[arg(env = "CS_PATCHER_ROOT")]
        root: PathBuf,

        #[arg(short, long)]
        plan: Option<PathBuf>,
    },

    /// Exit non-zero unless every step is already applied
    Verify {
        #[arg(env = "CS_PATCHER_ROOT")]
        root: PathBuf,

        #[arg(short, long)]
        plan: Option<PathBuf>,
    },

    /// List the steps of a plan
    List {
        #[arg(short, long)]
        plan: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Apply {
            root,
            plan,
            dry_run,
            diff,
        } => cmd_apply(&root, plan, dry_run, diff),
        Commands::Status { root, plan } => cmd_status(&root, plan),
        Commands::Verify { root, plan } => cmd_verify(&root, plan),
        Commands::List { plan } => cmd_list(plan),
    };

    if let Err(err) = result {
        eprintln!("{} {:#}", "error:".red().bold(), err);
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_plan(path: Option<PathBuf>) -> Result<PatchPlan> {
    match path {
        Some(path) => Ok(plan::load_from_path(&path)?),
        None => Ok(plan::builtin()?),
    }
}

fn check_root(root: &Path) -> Result<()> {
    if !root.is_dir() {
        bail!("project root {} does not exist", root.display());
    }
    Ok(())
}

fn run(root: &Path, plan: &PatchPlan, mode: Mode) -> Result<RunOutput> {
    check_root(root)?;
    let mut runner = Runner::new(root, mode)
        .with_context(|| format!("cannot use {} as project root", root.display()))?;
    Ok(runner.run(plan))
}

fn display_diff(file: &Path, original: &str, modified: &str) {
    println!(
        "\n{}",
        format!("--- {} (original)", file.display()).dimmed()
    );
    println!("{}", format!("+++ {} (patched)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, modified);
    for change in diff.iter_all_changes() {
        let line = match change.tag() {
            ChangeTag::Delete => format!("-{change}").red(),
            ChangeTag::Insert => format!("+{change}").green(),
            ChangeTag::Equal => continue,
        };
        print!("{line}");
    }
}

fn print_failure(err: &RunError) {
    let RunError::Step { step, file, source } = err;
    eprintln!("{} {}: {}", "✗".red(), step, source);
    eprintln!("  File: {file}");
    eprintln!(
        "  {}",
        "Run stopped here; files patched by earlier steps keep their changes.".dimmed()
    );
}

fn print_report(report: &StepReport, dry_run: bool, show_diff: bool) {
    match report.outcome {
        StepOutcome::Applied => {
            let verb = if dry_run { "Would apply to" } else { "Applied to" };
            println!("{} {}: {} {}", "✓".green(), report.step, verb, report.file);
            if show_diff {
                for change in &report.changes {
                    display_diff(&change.path, &change.before, &change.after);
                }
            }
        }
        StepOutcome::AlreadyApplied => {
            println!(
                "{} {}: Already applied to {}",
                "⊙".yellow(),
                report.step,
                report.file
            );
        }
    }
}

fn cmd_apply(root: &Path, plan: Option<PathBuf>, dry_run: bool, show_diff: bool) -> Result<()> {
    let plan = load_plan(plan)?;
    let mode = if dry_run { Mode::Check } else { Mode::Apply };

    println!("Project root: {}", root.display());
    if dry_run {
        println!("{}", "[DRY RUN - no files are modified]".cyan());
    }
    println!();

    let output = run(root, &plan, mode)?;
    for report in &output.reports {
        print_report(report, dry_run, show_diff);
    }

    let applied = output
        .reports
        .iter()
        .filter(|r| r.outcome == StepOutcome::Applied)
        .count();
    println!();
    println!("{}", "Summary:".bold());
    println!("  {} applied", applied.to_string().green());
    println!(
        "  {} already applied",
        (output.reports.len() - applied).to_string().yellow()
    );

    if let Some(err) = &output.failure {
        let remaining = plan.steps.len() - output.reports.len() - 1;
        println!("  {} failed, {} not run", "1".red(), remaining);
        print_failure(err);
        std::process::exit(1);
    }
    Ok(())
}

fn cmd_status(root: &Path, plan: Option<PathBuf>) -> Result<()> {
    let plan = load_plan(plan)?;
    let output = run(root, &plan, Mode::Check)?;

    println!("{}", "Patch Status Report".bold());
    println!("Project root: {}\n", root.display());
    for report in &output.reports {
        match report.outcome {
            StepOutcome::AlreadyApplied => {
                println!("{} {} ({})", "✓".green(), report.step, report.file)
            }
            StepOutcome::Applied => {
                println!("{} {} ({}) pending", "○".yellow(), report.step, report.file)
            }
        }
    }
    if let Some(err) = &output.failure {
        print_failure(err);
        std::process::exit(1);
    }
    Ok(())
}

fn cmd_verify(root: &Path, plan: Option<PathBuf>) -> Result<()> {
    let plan = load_plan(plan)?;
    let output = run(root, &plan, Mode::Check)?;

    if output.all_applied() {
        println!(
            "{} all {} steps applied",
            "✓".green(),
            output.reports.len()
        );
        return Ok(());
    }

    for report in output
        .reports
        .iter()
        .filter(|r| r.outcome == StepOutcome::Applied)
    {
        eprintln!("{} {}: not applied ({})", "✗".red(), report.step, report.file);
    }
    if let Some(err) = &output.failure {
        print_failure(err);
    }
    std::process::exit(1);
}

fn cmd_list(plan: Option<PathBuf>) -> Result<()> {
    let plan = load_plan(plan)?;
    if !plan.meta.name.is_empty() {
        println!("{}", plan.meta.name.bold());
    }
    if let Some(description) = &plan.meta.description {
        println!("{}", description.dimmed());
    }
    println!();
    for step in &plan.steps {
        let target = step
            .operation
            .target()
            .map(|t| format!(" [{t}]"))
            .unwrap_or_default();
        println!(
            "  {} {}{}  {}",
            step.id.bold(),
            step.operation.name().cyan(),
            target,
            step.file.dimmed()
        );
    }
    Ok(())
}
