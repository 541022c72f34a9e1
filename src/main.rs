use anyhow::{Context, Result};
use scoped_pipeline::cli::commands::{ListCommand, ResolveCommand, ValidateCommand};
use scoped_pipeline::cli::output::*;
use scoped_pipeline::cli::{Cli, Command};
use scoped_pipeline::core::Config;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging, RUST_LOG overrides --verbose
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.default_log_filter()));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    match &cli.command {
        Command::List(cmd) => list_pipelines(cmd)?,
        Command::Validate(cmd) => validate_pipelines(cmd)?,
        Command::Resolve(cmd) => resolve_pipeline(cmd)?,
    }

    Ok(())
}

fn load(file: &str) -> Result<Config> {
    let config = Config::from_file(file).context("Failed to load pipeline config")?;
    info!("Loaded {} pipeline(s) from {}", config.list_ids().len(), file);
    Ok(config)
}

fn list_pipelines(cmd: &ListCommand) -> Result<()> {
    let config = load(&cmd.file)?;

    if cmd.json {
        let pipelines: Vec<_> = config
            .definitions()
            .iter()
            .map(|p| {
                serde_json::json!({
                    "id": p.id,
                    "name": p.name,
                    "steps": p.steps.len(),
                })
            })
            .collect();
        let data = serde_json::json!({ "pipelines": pipelines });
        println!("{}", serde_json::to_string_pretty(&data)?);
        return Ok(());
    }

    if config.definitions().is_empty() {
        println!("{} No pipelines declared", INFO);
        return Ok(());
    }

    println!("{} Pipelines:", INFO);
    for pipeline in config.definitions() {
        let scoped = pipeline.steps.iter().filter(|s| s.has_scopes()).count();
        println!(
            "  {} {} ({} steps, {} scoped)",
            style(&pipeline.id).bold(),
            style(pipeline.name.as_deref().unwrap_or("")).dim(),
            style(pipeline.steps.len()).cyan(),
            style(scoped).cyan()
        );
    }

    Ok(())
}

fn validate_pipelines(cmd: &ValidateCommand) -> Result<()> {
    println!("{} Validating pipelines...", INFO);

    let config = load(&cmd.file)?;
    let ctx = cmd.scope.to_context();
    let mut failures = 0;

    for id in config.list_ids() {
        let result = config.lookup(&id, Some(&ctx)).and_then(|pipeline| match pipeline {
            Some(pipeline) => pipeline.steps(None).map(|steps| steps.len()),
            None => Ok(0),
        });

        match result {
            Ok(count) => println!("  {} {} ({} steps)", CHECK, style(&id).bold(), count),
            Err(e) => {
                failures += 1;
                println!("  {} {}: {}", CROSS, style(&id).bold(), format_error(&e));
            }
        }
    }

    if failures > 0 {
        error!("{} pipeline(s) failed to resolve", failures);
        std::process::exit(1);
    }

    println!("{} Pipeline configuration is valid!", CHECK);
    Ok(())
}

fn resolve_pipeline(cmd: &ResolveCommand) -> Result<()> {
    let config = load(&cmd.file)?;
    let ctx = cmd.scope.to_context();

    let pipeline = match config.lookup(&cmd.id, Some(&ctx)) {
        Ok(Some(pipeline)) => pipeline,
        Ok(None) => {
            println!("{} Pipeline '{}' not found", WARN, cmd.id);
            std::process::exit(1);
        }
        Err(e) => {
            println!("{} {}", CROSS, format_error(&e));
            std::process::exit(1);
        }
    };

    let steps = match pipeline.steps(None) {
        Ok(steps) => steps,
        Err(e) => {
            println!("{} {}", CROSS, format_error(&e));
            std::process::exit(1);
        }
    };

    if cmd.json {
        let data = serde_json::json!({
            "ref": pipeline.reference(),
            "name": pipeline.name,
            "description": pipeline.description,
            "steps": steps,
        });
        println!("{}", serde_json::to_string_pretty(&data)?);
        return Ok(());
    }

    println!(
        "{} {} {}",
        INFO,
        style(&pipeline.id).bold(),
        style(pipeline.name.as_deref().unwrap_or("")).dim()
    );
    if let Some(description) = &pipeline.description {
        println!("  {}", description);
    }
    for (index, step) in steps.iter().enumerate() {
        println!("{}", format_step(index, step));
    }

    Ok(())
}
