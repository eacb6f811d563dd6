//! Taskloom CLI - turn requirements documents into task graphs

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use taskloom_core::commands::{Analyzer, expand, project};
use taskloom_core::config::Config;
use taskloom_core::domain::AnalysisResult;
use taskloom_core::domain::expansion::{ExpansionOutcome, ExpansionStatus};
use taskloom_core::domain::stack::{
    ConflictResolver, DecisionPoint, NonInteractive, Preset, Resolution,
};
use taskloom_core::oracle::OracleGateway;
use taskloom_core::storage::{Database, SqliteGraphRepository};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "taskloom")]
#[command(author, version, about = "Turn requirements documents into task graphs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Quiet mode (minimal output)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a requirements document and save the project graph
    Analyze {
        /// Document path, or `-` for stdin
        file: PathBuf,
        /// Never prompt; stack conflicts stay open with a warning
        #[arg(long)]
        no_interactive: bool,
        /// Resolve stack conflicts up front
        /// (fullstack-only, fullstack-with-api, frontend-with-api)
        #[arg(long, value_parser = parse_resolution)]
        stack: Option<Resolution>,
        /// Print the full analysis as JSON
        #[arg(long)]
        json: bool,
        /// Analyze without persisting
        #[arg(long)]
        no_save: bool,
    },

    /// Break one task into subtasks
    Expand { task_id: i64 },

    /// Expand the highest priority eligible tasks of a project
    ExpandProject {
        project_id: i64,
        /// Defaults to `expansion.max_tasks`
        #[arg(long)]
        max_tasks: Option<u32>,
    },

    /// Show a saved project graph
    Show {
        project_id: i64,
        #[arg(long)]
        json: bool,
    },

    /// List saved projects, newest first
    Projects {
        #[arg(short, long, default_value_t = project::DEFAULT_LIST_LIMIT)]
        limit: u32,
    },

    /// Move a task to a new status (todo, in_progress, completed, blocked)
    Status { task_id: i64, status: String },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Run health check
    Doctor,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Get a configuration value
    Get { key: String },
    /// Set a configuration value
    Set { key: String, value: String },
    /// List all configuration values
    List,
    /// Reset configuration to defaults
    Reset,
    /// Show config file path
    Path,
}

fn parse_resolution(value: &str) -> Result<Resolution, String> {
    Resolution::parse(value).ok_or_else(|| {
        let names: Vec<&str> = Resolution::ALL.iter().map(|r| r.as_str()).collect();
        format!("expected one of: {}", names.join(", "))
    })
}

/// Asks on the terminal which way to settle a stack conflict
struct PromptResolver;

impl ConflictResolver for PromptResolver {
    fn resolve(&self, point: &DecisionPoint) -> Option<Resolution> {
        println!("\n{}", point.question);
        println!("  Involved: {}", point.technologies.join(", "));
        for (i, option) in point.options.iter().enumerate() {
            println!("  {}. {}", i + 1, option.label());
        }

        let mut rl = match DefaultEditor::new() {
            Ok(rl) => rl,
            Err(e) => {
                warn!(error = %e, "Cannot open prompt; leaving conflict open");
                return None;
            }
        };

        loop {
            match rl.readline("Choice (blank to decide later) > ") {
                Ok(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        return None;
                    }
                    match line.parse::<usize>() {
                        Ok(n) if (1..=point.options.len()).contains(&n) => {
                            return Some(point.options[n - 1]);
                        }
                        _ => println!("Enter a number between 1 and {}", point.options.len()),
                    }
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => return None,
                Err(e) => {
                    warn!(error = %e, "Prompt failed; leaving conflict open");
                    return None;
                }
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("taskloom=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            file,
            no_interactive,
            stack,
            json,
            no_save,
        } => {
            let resolver: Box<dyn ConflictResolver> = match (stack, no_interactive) {
                (Some(resolution), _) => Box::new(Preset(resolution)),
                (None, true) => Box::new(NonInteractive),
                (None, false) => Box::new(PromptResolver),
            };
            cmd_analyze(&file, resolver.as_ref(), json, no_save, cli.quiet).await
        }

        Commands::Expand { task_id } => cmd_expand(task_id, cli.quiet).await,

        Commands::ExpandProject {
            project_id,
            max_tasks,
        } => cmd_expand_project(project_id, max_tasks, cli.quiet).await,

        Commands::Show { project_id, json } => cmd_show(project_id, json).await,

        Commands::Projects { limit } => cmd_projects(limit, cli.quiet).await,

        Commands::Status { task_id, status } => cmd_status(task_id, &status, cli.quiet).await,

        Commands::Config { action } => cmd_config(action, cli.quiet),

        Commands::Doctor => cmd_doctor(cli.quiet).await,
    }
}

// ============================================================================
// Command Implementations
// ============================================================================

async fn open() -> anyhow::Result<(Config, Database)> {
    let config = Config::load()?;
    let db = Database::from_config(&config).await?;
    Ok((config, db))
}

fn read_document(path: &Path) -> anyhow::Result<String> {
    if path.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read document from stdin")?;
        return Ok(text);
    }
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read document: {}", path.display()))
}

async fn cmd_analyze(
    file: &Path,
    resolver: &dyn ConflictResolver,
    json: bool,
    no_save: bool,
    quiet: bool,
) -> anyhow::Result<()> {
    let text = read_document(file)?;
    let config = Config::load()?;
    let gateway = OracleGateway::from_config(&config)?;
    let analyzer = Analyzer::new(&gateway, resolver);

    let (project_id, analysis) = if no_save {
        (None, analyzer.analyze(&text).await?)
    } else {
        let db = Database::from_config(&config).await?;
        let repository = SqliteGraphRepository::new(db.pool().clone());
        let (id, analysis) = analyzer.analyze_and_save(&repository, &text).await?;
        (Some(id), analysis)
    };

    if json {
        let out = serde_json::json!({ "project_id": project_id, "analysis": analysis });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else if !quiet {
        print_analysis(&analysis, project_id);
    } else if let Some(id) = project_id {
        println!("{}", id);
    }
    Ok(())
}

fn print_analysis(analysis: &AnalysisResult, project_id: Option<i64>) {
    let enhancement = &analysis.enhancement;
    let stats = analysis.statistics();

    println!("Project: {}", analysis.project.name);
    println!("  {}", analysis.project.description);
    println!(
        "  Quality: {:.1} -> {:.1}{}",
        enhancement.quality_before.score,
        enhancement.quality_after.score,
        if enhancement.was_enhanced { " (enhanced)" } else { "" }
    );
    println!(
        "  Complexity: {:.1}/10, timeline {}",
        analysis.complexity.score, analysis.complexity.timeline
    );
    println!("  Package manager: {}", analysis.package_manager.as_str());

    println!("\nFeatures ({}):", stats.total_features);
    for feature in &analysis.features {
        println!("  - {} [{}]", feature.name, feature.priority);
    }

    println!("\nStack:");
    for tech in &analysis.stack.technologies {
        println!(
            "  - {}: {} ({:.0}%)",
            tech.category,
            tech.technology,
            tech.confidence * 100.0
        );
    }
    for warning in &analysis.stack.warnings {
        println!("  [!!] {}", warning);
    }

    println!(
        "\nTasks: {} ({} high, {} medium, {} low), {:.0}h total",
        stats.total_tasks,
        stats.high_priority_tasks,
        stats.medium_priority_tasks,
        stats.low_priority_tasks,
        stats.total_hours
    );

    if !analysis.clarifications.is_empty() {
        println!("\nOpen questions:");
        for question in &analysis.clarifications {
            println!("  - {}", question);
        }
    }

    match project_id {
        Some(id) => {
            println!("\nSaved as project {}.", id);
            println!("\nNext steps:");
            println!("  1. Run `taskloom show {}` to review the task graph", id);
            println!("  2. Run `taskloom expand-project {}` to break down large tasks", id);
        }
        None => println!("\nNot saved (--no-save)."),
    }
}

fn print_outcome(outcome: &ExpansionOutcome) {
    match outcome.status {
        ExpansionStatus::Success => println!(
            "Task {}: {} subtasks created{} {:?}",
            outcome.task_id,
            outcome.subtasks_created,
            if outcome.used_fallback { " (fallback)" } else { "" },
            outcome.subtask_ids
        ),
        _ => println!(
            "Task {}: {} - {}",
            outcome.task_id,
            outcome.status.as_str(),
            outcome.message.as_deref().unwrap_or("")
        ),
    }
}

async fn cmd_expand(task_id: i64, quiet: bool) -> anyhow::Result<()> {
    let (config, db) = open().await?;
    let outcome = expand::expand_task(&db, &config, task_id).await?;

    if !quiet {
        print_outcome(&outcome);
    }
    if outcome.status == ExpansionStatus::Error {
        anyhow::bail!(
            "{}",
            outcome.message.unwrap_or_else(|| "Expansion failed".to_string())
        );
    }
    Ok(())
}

async fn cmd_expand_project(
    project_id: i64,
    max_tasks: Option<u32>,
    quiet: bool,
) -> anyhow::Result<()> {
    let (config, db) = open().await?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received; finishing the current task");
            on_interrupt.cancel();
        }
    });

    let result = expand::expand_project(&db, &config, project_id, max_tasks, &cancel).await?;

    if !quiet {
        for outcome in &result.results {
            print_outcome(outcome);
        }
        println!(
            "\nExpanded {} of {} tasks{}.",
            result.tasks_expanded,
            result.results.len(),
            if result.cancelled { " (cancelled)" } else { "" }
        );
    }
    Ok(())
}

async fn cmd_show(project_id: i64, json: bool) -> anyhow::Result<()> {
    let (_, db) = open().await?;
    let graph = project::show(&db, project_id).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&graph)?);
    } else {
        print!("{}", project::render(&graph));
    }
    Ok(())
}

async fn cmd_projects(limit: u32, quiet: bool) -> anyhow::Result<()> {
    let (_, db) = open().await?;
    let projects = project::list(&db, limit).await?;

    if projects.is_empty() {
        if !quiet {
            println!("No projects found.");
            println!("\nCreate one with: taskloom analyze <file>");
        }
        return Ok(());
    }

    if !quiet {
        println!("Projects:");
    }
    for p in projects {
        println!(
            "  {} - {} ({} tasks, {:.0}h, {})",
            p.id,
            p.name,
            p.task_count,
            p.total_hours,
            p.created_at.format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}

async fn cmd_status(task_id: i64, status: &str, quiet: bool) -> anyhow::Result<()> {
    let (_, db) = open().await?;
    let task = project::set_task_status(&db, task_id, status).await?;
    if !quiet {
        println!("Task {} '{}' is now {}.", task.id, task.title, task.status.as_str());
    }
    Ok(())
}

fn cmd_config(action: ConfigAction, quiet: bool) -> anyhow::Result<()> {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            let value = config.get(&key)?;
            println!("{}", value);
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            config.save()?;
            if !quiet {
                println!("Set {} = {}", key, value);
            }
        }
        ConfigAction::List => {
            let config = Config::load()?;
            for (key, value) in config.list()? {
                println!("{} = {}", key, value);
            }
        }
        ConfigAction::Reset => {
            Config::reset()?;
            if !quiet {
                println!("Configuration reset to defaults.");
            }
        }
        ConfigAction::Path => {
            let path = Config::config_path()?;
            println!("{}", path.display());
        }
    }
    Ok(())
}

async fn cmd_doctor(quiet: bool) -> anyhow::Result<()> {
    if !quiet {
        println!("Taskloom Health Check");
        println!("=====================");
        println!();
    }

    let mut all_ok = true;

    match Config::load() {
        Ok(config) => {
            if !quiet {
                println!("[OK] Configuration: Valid");
            }
            match config.llm.redacted_api_key() {
                Ok(Some(redacted)) => {
                    if !quiet {
                        println!("[OK] API Key: Configured ({})", redacted);
                        println!("     Model: {}", config.llm.model);
                    }
                }
                Ok(None) => {
                    if !quiet {
                        println!("[--] API Key: Not configured (deterministic generators only)");
                        println!(
                            "     Set TASKLOOM_API_KEY or OPENROUTER_API_KEY to enable generation"
                        );
                    }
                }
                Err(e) => {
                    all_ok = false;
                    if !quiet {
                        println!("[!!] API Key: Error - {}", e);
                    }
                }
            }

            if !quiet {
                check_database(&config, &mut all_ok).await;
            }
        }
        Err(e) => {
            all_ok = false;
            if !quiet {
                println!("[!!] Configuration: Error - {}", e);
            }
        }
    }

    if !quiet {
        match Config::config_path() {
            Ok(path) if path.exists() => println!("[OK] Config file: {}", path.display()),
            Ok(path) => println!("[--] Config file: {} (using defaults)", path.display()),
            Err(e) => println!("[!!] Config file: Error - {}", e),
        }

        println!();
        if all_ok {
            println!("All checks passed!");
        } else {
            println!("Some checks failed. See above for details.");
        }
    }

    Ok(())
}

async fn check_database(config: &Config, all_ok: &mut bool) {
    let db = match Database::from_config(config).await {
        Ok(db) => db,
        Err(e) => {
            *all_ok = false;
            println!("[!!] Database: Failed to initialize - {}", e);
            return;
        }
    };

    if let Err(e) = db.health_check().await {
        *all_ok = false;
        println!("[!!] Database: Health check failed - {}", e);
        return;
    }
    println!("[OK] Database: Connected");
    println!("     Path: {}", db.path().display());

    match db.migration_status().await {
        Ok(status) if status.needs_migration => println!(
            "[!!] Database: Migrations pending (v{} -> v{})",
            status.current_version, status.target_version
        ),
        Ok(status) => println!("[OK] Database: Schema v{}", status.current_version),
        Err(e) => println!("[!!] Database: Migration check failed - {}", e),
    }

    let projects = project::list(&db, u32::MAX).await.unwrap_or_default();
    println!("     Projects: {}", projects.len());
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_analyze_flags() {
        let cli = Cli::try_parse_from([
            "taskloom",
            "analyze",
            "prd.md",
            "--no-interactive",
            "--stack",
            "fullstack-only",
            "--json",
            "--no-save",
        ])
        .unwrap();

        match cli.command {
            Commands::Analyze {
                file,
                no_interactive,
                stack,
                json,
                no_save,
            } => {
                assert_eq!(file, PathBuf::from("prd.md"));
                assert!(no_interactive && json && no_save);
                assert_eq!(stack, Some(Resolution::FullstackOnly));
            }
            _ => panic!("expected analyze"),
        }
    }

    #[test]
    fn test_unknown_stack_resolution_is_rejected() {
        assert!(Cli::try_parse_from(["taskloom", "analyze", "prd.md", "--stack", "monolith"]).is_err());
    }

    #[test]
    fn test_expand_project_max_tasks() {
        let cli =
            Cli::try_parse_from(["taskloom", "expand-project", "3", "--max-tasks", "2"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::ExpandProject {
                project_id: 3,
                max_tasks: Some(2)
            }
        ));
    }

    #[test]
    fn test_projects_default_limit() {
        let cli = Cli::try_parse_from(["taskloom", "projects"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Projects { limit } if limit == project::DEFAULT_LIST_LIMIT
        ));
    }
}
