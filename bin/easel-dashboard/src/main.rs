// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2024 Jonathan Lee
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License version 3
// as published by the Free Software Foundation.
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see https://www.gnu.org/licenses/.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use easel::schema::read_csv;
use easel::{Coordinator, EaselConfig, GenerationResult, Session};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "easel-dashboard",
    about = "Turn plain-language requests into charts over a CSV dataset"
)]
struct Cli {
    /// TOML configuration file; environment variables still apply on top.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate one chart for a request.
    Generate {
        csv: PathBuf,
        prompt: String,
        /// Skip the model and use rule-based generation only.
        #[arg(long)]
        no_llm: bool,
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
        /// Write the chart here instead of stdout.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Column kinds and summary statistics.
    Profile { csv: PathBuf },
    /// Ready-made prompts for a dataset.
    Suggest { csv: PathBuf },
    /// Model availability.
    Status,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Json,
    Html,
}

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = EaselConfig::load(cli.config.as_deref()).context("loading configuration")?;

    match cli.cmd {
        Command::Generate {
            csv,
            prompt,
            no_llm,
            format,
            output,
        } => generate(&config, &csv, &prompt, !no_llm, format, output.as_deref()),
        Command::Profile { csv } => profile(&csv),
        Command::Suggest { csv } => suggest(&config, &csv),
        Command::Status => status(&config),
    }
}

fn load_session(csv: &Path) -> Result<Session> {
    let df = read_csv(csv)?;
    info!(path = %csv.display(), rows = df.height(), "loaded dataset");
    Ok(Session::new(df)?)
}

fn generate(
    config: &EaselConfig,
    csv: &Path,
    prompt: &str,
    use_llm: bool,
    format: OutputFormat,
    output: Option<&Path>,
) -> Result<()> {
    let session = load_session(csv)?;
    let coordinator = Coordinator::from_config(config);
    let result = coordinator.generate_for(&session, prompt, use_llm);
    report(&result);

    let rendered = match format {
        OutputFormat::Json => result.figure.to_json_pretty()?,
        OutputFormat::Html => result.figure.to_html()?,
    };
    match output {
        Some(path) => {
            std::fs::write(path, rendered)
                .with_context(|| format!("writing chart to {}", path.display()))?;
            eprintln!("Chart written to {}", path.display());
        }
        None => println!("{rendered}"),
    }
    Ok(())
}

fn report(result: &GenerationResult) {
    eprintln!("Method: {}", result.method);
    if let Some(title) = result.figure.title() {
        eprintln!("Title: {title}");
    }
    if let Some(raw) = &result.raw {
        eprintln!("Draft: {raw}");
    }
    if result.figure.is_error_placeholder() {
        eprintln!("The chart could not be rendered; see the figure annotation for details.");
    }
}

fn profile(csv: &Path) -> Result<()> {
    let session = load_session(csv)?;
    let profile = session.profile();
    print!("{}", profile.summary().report());
    println!();
    for stats in &profile.stats {
        let mean = stats
            .mean
            .map(|m| format!(", mean {m:.2}"))
            .unwrap_or_default();
        println!(
            "{:<24} {:<12} {} non-null, {} distinct{}",
            stats.name,
            stats.kind.label(),
            stats.non_null,
            stats.distinct,
            mean
        );
    }
    Ok(())
}

fn suggest(config: &EaselConfig, csv: &Path) -> Result<()> {
    let session = load_session(csv)?;
    let suggestions = Coordinator::new(config).suggest(session.schema());
    if suggestions.is_empty() {
        println!("No suggestions for this dataset.");
    }
    for suggestion in suggestions {
        println!("[{}] {}\n    {}", suggestion.category, suggestion.title, suggestion.prompt);
    }
    Ok(())
}

fn status(config: &EaselConfig) -> Result<()> {
    let status = Coordinator::from_config(config).model_status();
    println!("{status}");
    if !status.available_models.is_empty() {
        println!("{}", serde_json::to_string_pretty(&status.available_models)?);
    }
    Ok(())
}
