//! Inventario CLI - record stock movements and review inventory

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use inventario::prelude::*;
use inventario::schema::{catalog as catalog_columns, movements as movement_columns};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "inventario")]
#[command(
    author,
    version,
    about = "Record stock movements against a spreadsheet catalog"
)]
struct Cli {
    /// Store workbook (default: Inventario.xlsx next to the executable)
    #[arg(short, long, global = true)]
    file: Option<PathBuf>,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the whole catalog
    Catalog {
        #[arg(long, value_enum, default_value_t = Format::Table)]
        format: Format,
    },

    /// Catalog items whose code or description contains TEXT (case-insensitive)
    Search {
        /// Text to look for; empty lists everything
        #[arg(default_value = "")]
        text: String,
    },

    /// Record goods received
    #[command(alias = "entrada")]
    In(RegisterArgs),

    /// Record goods issued
    #[command(alias = "salida")]
    Out(RegisterArgs),

    /// Show a movement log
    Report {
        /// Which log: in/entrada or out/salida
        kind: MovementKind,

        #[arg(long, value_enum, default_value_t = Format::Table)]
        format: Format,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show current stock (initial + in - out), hiding items at zero
    Stock {
        #[arg(long, value_enum, default_value_t = Format::Table)]
        format: Format,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(clap::Args)]
struct RegisterArgs {
    /// Catalog code of the product
    #[arg(short, long)]
    code: String,

    /// Whole number of units, at least 1
    #[arg(short, long)]
    quantity: String,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Table,
    Csv,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let store = Store::new(cli.file.clone().unwrap_or_else(Store::default_path));
    let session = match Session::open(store) {
        Ok(session) => session,
        Err(err) => {
            eprintln!("error: {err}");
            if err.is_fatal() {
                eprintln!("cannot start without the store file");
            }
            return ExitCode::FAILURE;
        }
    };

    match run(&session, cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr).with_target(false))
        .with(filter)
        .init();
}

fn run(session: &Session, command: Commands) -> Result<()> {
    tracing::debug!(
        path = %session.store().path().display(),
        items = session.catalog().len(),
        "session ready"
    );
    match command {
        Commands::Catalog { format } => {
            let items: Vec<&CatalogItem> = session.catalog().items().iter().collect();
            write_catalog(&items, format, &mut io::stdout().lock())
        }
        Commands::Search { text } => {
            let items = session.search(&text);
            if items.is_empty() {
                println!("No products match '{text}'");
                return Ok(());
            }
            write_catalog(&items, Format::Table, &mut io::stdout().lock())
        }
        Commands::In(args) => register(session, MovementKind::In, &args),
        Commands::Out(args) => register(session, MovementKind::Out, &args),
        Commands::Report {
            kind,
            format,
            output,
        } => {
            let records = session
                .report(kind)
                .with_context(|| format!("Failed to read the {} log", kind.section()))?;
            if records.is_empty() {
                println!("No data recorded in {}", kind.section());
                return Ok(());
            }
            with_output(output.as_deref(), |out| write_report(&records, format, out))
        }
        Commands::Stock { format, output } => {
            let rows = session
                .current_stock()
                .context("Failed to compute current stock")?;
            if rows.is_empty() {
                println!("No stock on hand");
                return Ok(());
            }
            with_output(output.as_deref(), |out| write_stock(&rows, format, out))
        }
    }
}

fn register(session: &Session, kind: MovementKind, args: &RegisterArgs) -> Result<()> {
    let request = RegisterRequest {
        kind,
        selection: session.find(&args.code),
        quantity: &args.quantity,
    };
    let record = session
        .register(request)
        .with_context(|| format!("Movement for '{}' not recorded", args.code))?;

    println!(
        "Recorded in {}: {} x{} ({}) at {}",
        kind.section(),
        record.code,
        record.quantity,
        record.description,
        record.timestamp_text()
    );
    Ok(())
}

/// Run `write` against stdout, or a file created at `path`
fn with_output<F>(path: Option<&Path>, write: F) -> Result<()>
where
    F: FnOnce(&mut dyn Write) -> Result<()>,
{
    match path {
        Some(path) => {
            let mut file = File::create(path)
                .with_context(|| format!("Failed to create '{}'", path.display()))?;
            write(&mut file)?;
            file.flush()
                .with_context(|| format!("Failed to write '{}'", path.display()))?;
            eprintln!("Wrote '{}'", path.display());
            Ok(())
        }
        None => write(&mut io::stdout().lock()),
    }
}

fn write_catalog(items: &[&CatalogItem], format: Format, out: &mut dyn Write) -> Result<()> {
    let header = [
        catalog_columns::CODE,
        catalog_columns::DESCRIPTION,
        catalog_columns::PRESENTATION_UNIT,
        catalog_columns::FINAL_PRICE,
        catalog_columns::INITIAL_STOCK_CORRECTED,
    ];
    let rows = items
        .iter()
        .map(|item| {
            vec![
                item.code.clone(),
                item.description.clone(),
                item.presentation_unit.clone(),
                format_currency(item.final_price),
                format_stock(item.initial_stock),
            ]
        })
        .collect::<Vec<_>>();
    emit(&header, &rows, format, out)
}

fn write_report(records: &[MovementRecord], format: Format, out: &mut dyn Write) -> Result<()> {
    let rows = records
        .iter()
        .map(|record| {
            vec![
                record.timestamp_text(),
                record.code.clone(),
                record.description.clone(),
                record.presentation_unit.clone(),
                format_currency(record.final_price),
                record.quantity.to_string(),
            ]
        })
        .collect::<Vec<_>>();
    emit(&movement_columns::HEADER, &rows, format, out)
}

fn write_stock(rows: &[ReconciledStock], format: Format, out: &mut dyn Write) -> Result<()> {
    let header = [
        catalog_columns::CODE,
        catalog_columns::DESCRIPTION,
        catalog_columns::PRESENTATION_UNIT,
        catalog_columns::FINAL_PRICE,
        catalog_columns::INITIAL_STOCK_CORRECTED,
        movement_columns::IN_SHEET,
        movement_columns::OUT_SHEET,
        "Inventario Actual",
    ];
    let rows = rows
        .iter()
        .map(|row| {
            vec![
                row.code.clone(),
                row.description.clone(),
                row.presentation_unit.clone(),
                row.price_display(),
                format_stock(row.initial_stock),
                format_stock(row.ins),
                format_stock(row.outs),
                row.stock_display(),
            ]
        })
        .collect::<Vec<_>>();
    emit(&header, &rows, format, out)
}

fn emit(header: &[&str], rows: &[Vec<String>], format: Format, out: &mut dyn Write) -> Result<()> {
    match format {
        Format::Table => write_table(header, rows, out).context("Failed to write table"),
        Format::Csv => write_csv(header, rows, out),
    }
}

fn write_csv(header: &[&str], rows: &[Vec<String>], out: &mut dyn Write) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(header).context("Failed to write CSV")?;
    for row in rows {
        writer.write_record(row).context("Failed to write CSV")?;
    }
    writer.flush().context("Failed to write CSV")?;
    Ok(())
}

/// Left-aligned text columns separated by two spaces
fn write_table(header: &[&str], rows: &[Vec<String>], out: &mut dyn Write) -> io::Result<()> {
    let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    writeln!(out, "{}", table_line(header.iter().copied(), &widths))?;
    let rule: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    writeln!(out, "{}", rule.join("  "))?;
    for row in rows {
        writeln!(out, "{}", table_line(row.iter().map(String::as_str), &widths))?;
    }
    Ok(())
}

fn table_line<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    let padded: Vec<String> = cells
        .zip(widths)
        .map(|(cell, &width)| format!("{cell:<width$}"))
        .collect();
    padded.join("  ").trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_aliases_and_kinds() {
        let cli = Cli::try_parse_from(["inventario", "entrada", "--code", "A1", "--quantity", "5"])
            .unwrap();
        assert!(matches!(cli.command, Commands::In(ref args) if args.code == "A1" && args.quantity == "5"));

        let cli = Cli::try_parse_from(["inventario", "-vv", "report", "salida", "--format", "csv"])
            .unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(matches!(
            cli.command,
            Commands::Report { kind: MovementKind::Out, format: Format::Csv, output: None }
        ));

        assert!(Cli::try_parse_from(["inventario", "report", "sideways"]).is_err());
    }

    #[test]
    fn test_table_layout() {
        let mut out = Vec::new();
        let rows = vec![vec!["A1".to_string(), "Pintura Azul".to_string()]];
        write_table(&["Codigo", "Descripcion"], &rows, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "Codigo  Descripcion\n------  ------------\nA1      Pintura Azul\n"
        );
    }

    #[test]
    fn test_csv_export() {
        let mut out = Vec::new();
        let rows = vec![vec!["A1".to_string(), "Pintura, Azul".to_string()]];
        write_csv(&["Codigo", "Descripcion"], &rows, &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Codigo,Descripcion\nA1,\"Pintura, Azul\"\n"
        );
    }
}
