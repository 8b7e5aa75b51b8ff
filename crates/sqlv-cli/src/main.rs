//! sqlv - terminal client for the database console backend
//!
//! # Usage
//!
//! ```bash
//! sqlv open ./shop.db
//! sqlv view users --limit 20
//! sqlv query "SELECT count(*) AS n FROM users"
//! sqlv --yes delete-row users 0
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use sqlv_core::{Page, SqlvConfig};
use sqlv_gateway::HttpGateway;
use sqlv_view::Console;
use std::process::ExitCode;
use std::sync::Arc;

mod args;
mod terminal;

use args::{Cli, Command};
use terminal::{format_rows, TerminalSurface};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = SqlvConfig::load_from(cli.config.as_deref())?;
    if let Some(url) = cli.base_url.clone() {
        config.gateway.base_url = url;
    }

    sqlv_telemetry::init_telemetry(&config.observability)
        .context("Failed to initialize telemetry")?;

    let gateway = HttpGateway::from_config(&config.gateway)
        .with_context(|| format!("Invalid backend URL: {}", config.gateway.base_url))?;
    tracing::debug!(base_url = %gateway.base_url(), "Using backend");

    let surface = Arc::new(TerminalSurface::new(cli.yes, cli.show_fragments));
    let mut console = Console::new(Arc::new(gateway), surface).with_view_config(&config.view);
    if let Command::View { limit, offset, .. } = &cli.command {
        console = console.with_page(Page {
            limit: limit.unwrap_or(config.view.page_size),
            offset: *offset,
        });
    }

    // Console operations report their own failures on stderr
    match run(&console, cli.command).await {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            tracing::debug!(error = %e, "Command failed");
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn run(console: &Console, command: Command) -> sqlv_core::Result<()> {
    match command {
        Command::Open { path } => {
            let contents = tokio::fs::read(&path).await.inspect_err(|e| {
                eprintln!("Failed to read {}: {}", path.display(), e);
            })?;
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            console.open_database(&file_name, contents).await?;
            print_catalog(console);
        }
        Command::Create { name } => {
            console.create_database(&name).await?;
            print_catalog(console);
        }
        Command::Tables => {
            console.refresh_indexes().await;
            print_catalog(console);
        }
        Command::View { table, .. } => {
            console.view_table(&table).await?;
            print_view(console);
        }
        Command::Query { sql } => {
            let rows = console.execute_query(&sql).await?;
            match rows.first() {
                Some(first) => {
                    let headers: Vec<String> = first.column_names().map(str::to_string).collect();
                    print!("{}", format_rows(&headers, &rows));
                }
                None => println!("Query executed successfully (no results)"),
            }
        }
        Command::Generate { prompt, table } => {
            let sql = console.generate_sql(&prompt, table.as_deref()).await?;
            println!("{}", sql);
        }
        Command::DropTable { table } => console.drop_table(&table).await?,
        Command::DropIndex { index } => console.drop_index(&index).await?,
        Command::DeleteRow { table, row_id } => {
            console.view_table(&table).await?;
            if console.view().row(row_id).is_none() {
                eprintln!("No row {} in the first page of {}", row_id, table);
                return Ok(());
            }
            console.delete_row(row_id).await?;
            print_view(console);
        }
        Command::Export { table, format } => console.export_table(&table, format.into())?,
    }
    Ok(())
}

fn print_catalog(console: &Console) {
    let catalog = console.catalog();
    if let Some(path) = &catalog.db_path {
        println!("Database: {}", path);
    }
    for table in &catalog.tables {
        println!("table\t{}", table.name);
    }
    for index in &catalog.indexes {
        println!("index\t{}\ton {}", index.name, index.table_name);
    }
}

fn print_view(console: &Console) {
    let view = console.view();
    let headers: Vec<String> = view.columns.iter().map(|c| c.name.clone()).collect();
    print!("{}", format_rows(&headers, &view.rows));
}
