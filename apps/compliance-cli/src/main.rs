//! Building compliance checker
//!
//! Loads a project description, runs the compliance engine over it and prints
//! a report. Optionally writes the project back enriched with computed values.

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use compliance_engine::readiness::project_completion;
use compliance_engine::{
    ComplianceEngine, ComplianceStatus, EngineConfig, ProjectAnalysis, RuleBook, Specialty,
    SpecialtyOutcome,
};
use shared_types::BuildingProject;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "compliance-cli")]
#[command(
    version,
    about = "Check a building project against Portuguese construction regulations"
)]
struct Args {
    /// Project description (JSON, one object per section)
    project: PathBuf,

    /// Rule book (JSON) overlaid on the builtin rules
    #[arg(short, long)]
    rules: Option<PathBuf>,

    /// Use only the rules from --rules, without the builtin book
    #[arg(long, requires = "rules")]
    replace_rules: bool,

    /// Engine configuration (TOML) with reference tables and scoring policy
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Analyze a single specialty (e.g. fire_safety, energy)
    #[arg(short, long, value_parser = parse_specialty)]
    specialty: Option<Specialty>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Write the enriched project to this path
    #[arg(long)]
    enrich: Option<PathBuf>,

    /// Print per-section completion instead of running the analysis
    #[arg(long)]
    completion: bool,

    /// Lint the rule book and exit
    #[arg(long)]
    check_rules: bool,

    /// Exit with a failure code unless the project is compliant
    #[arg(long)]
    strict: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn parse_specialty(s: &str) -> Result<Specialty, String> {
    Specialty::parse(s).ok_or_else(|| {
        let known: Vec<&str> = Specialty::ALL.iter().map(Specialty::id).collect();
        format!("unknown specialty '{}' (expected one of: {})", s, known.join(", "))
    })
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Reports go to stdout, logs to stderr
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(&args) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::from(2)
        }
    }
}

fn run(args: &Args) -> Result<ExitCode> {
    let rules = load_rules(args)?;

    if args.check_rules {
        let issues = rules.lint();
        for issue in &issues {
            println!("{}.{}: {}", issue.specialty, issue.rule_id, issue.message);
        }
        tracing::info!(rules = rules.len(), issues = issues.len(), "rule book checked");
        return Ok(if issues.is_empty() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        });
    }

    let mut project = load_project(&args.project)?;

    if args.completion {
        let completion = project_completion(&project);
        match args.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&completion)?),
            OutputFormat::Text => {
                for section in &completion {
                    println!(
                        "{:<28} {:>3}% ({}/{})",
                        section.specialty.name(),
                        section.percentage,
                        section.filled,
                        section.total
                    );
                }
            }
        }
        return Ok(ExitCode::SUCCESS);
    }

    let config = match &args.config {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::default(),
    };
    let engine = ComplianceEngine::new(config, rules)?;

    let analysis = match args.specialty {
        Some(specialty) => analyze_one(&engine, &project, specialty),
        None => engine.analyze(&project),
    };

    match args.format {
        OutputFormat::Text => print!("{}", analysis.to_text()),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&analysis)?),
    }

    if let Some(out) = &args.enrich {
        let patch = analysis.enrichment();
        patch.apply(&mut project);
        let json = serde_json::to_string_pretty(&project)?;
        fs::write(out, json)
            .with_context(|| format!("Failed to write enriched project: {}", out.display()))?;
        tracing::info!(path = %out.display(), entries = patch.len(), "enriched project written");
    }

    if fails_strict(analysis.status, args.strict) {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

/// Under `--strict` anything short of a compliant verdict fails, including
/// analyses that were incomplete or could not run at all
fn fails_strict(status: ComplianceStatus, strict: bool) -> bool {
    strict && !status.is_compliant()
}

fn load_rules(args: &Args) -> Result<RuleBook> {
    let custom = args.rules.as_deref().map(RuleBook::from_file).transpose()?;
    match custom {
        Some(book) if args.replace_rules => Ok(book),
        Some(book) => Ok(RuleBook::builtin()?.merge(book)),
        None => Ok(RuleBook::builtin()?),
    }
}

fn load_project(path: &Path) -> Result<BuildingProject> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read project: {}", path.display()))?;
    let project = BuildingProject::from_json(&content)
        .with_context(|| format!("Invalid project: {}", path.display()))?;
    if project.field_count() == 0 {
        bail!("Project {} has no fields", path.display());
    }
    Ok(project)
}

/// Same shape as a full analysis, restricted to one specialty
fn analyze_one(
    engine: &ComplianceEngine,
    project: &BuildingProject,
    specialty: Specialty,
) -> ProjectAnalysis {
    let outcome = match engine.analyze_specialty(project, specialty) {
        Ok(analysis) => analysis.into(),
        Err(err) => {
            tracing::warn!(specialty = %specialty, error = %err, "specialty analysis failed");
            SpecialtyOutcome::failed(specialty, err.to_string())
        }
    };
    ProjectAnalysis::from_outcomes(vec![outcome])
}
