mod config;
mod db;
mod invoice_gen;
mod layout;
mod models;
mod render;

use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::error;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::db::{Database, InvoiceStore};
use crate::invoice_gen::InvoiceGenerator;
use crate::models::Invoice;

#[derive(Parser)]
#[command(name = "invoice_generator", about = "Render invoices to PDF and record them in Postgres")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print a blank invoice to fill in
    Template,
    /// Render an invoice file to PDF
    Render {
        file: PathBuf,
        /// Overrides OUTPUT_DIR
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
    /// Save an invoice file to the database
    Save { file: PathBuf },
    /// Render an invoice file and save it
    Issue {
        file: PathBuf,
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
    /// Create the database tables if they are missing
    Schema,
    /// Print a stored invoice
    Show { id: i32 },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = config::init()?;

    match cli.command {
        Command::Template => {
            let draft = Invoice::draft(Local::now().date_naive());
            println!("{}", serde_json::to_string_pretty(&draft)?);
        }
        Command::Render { file, out_dir } => {
            let invoice = read_invoice(&file)?;
            let path = render(&config, out_dir.as_deref(), &invoice)?;
            println!("Invoice written to {}", path.display());
        }
        Command::Save { file } => {
            let invoice = read_invoice(&file)?;
            let db = db::init(&config).await?;
            let result = save(&db, &invoice).await;
            db.close().await;
            println!("Invoice saved with id {}", result?);
        }
        Command::Issue { file, out_dir } => {
            let invoice = read_invoice(&file)?;
            issue(&config, out_dir.as_deref(), &invoice).await?;
        }
        Command::Schema => {
            let db = db::init(&config).await?;
            let result = InvoiceStore::new(db.clone()).ensure_schema().await;
            db.close().await;
            if result.context("schema provisioning failed")?.created {
                println!("Database tables created");
            } else {
                println!("Database tables already exist");
            }
        }
        Command::Show { id } => {
            let db = db::init(&config).await?;
            let result = InvoiceStore::new(db.clone()).load_invoice(id).await;
            db.close().await;
            match result? {
                Some(stored) => println!("{}", serde_json::to_string_pretty(&stored)?),
                None => bail!("no invoice with id {}", id),
            }
        }
    }

    Ok(())
}

/// Read and validate an invoice JSON file
fn read_invoice(path: &Path) -> Result<Invoice> {
    let raw = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let mut invoice: Invoice =
        serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))?;

    invoice.validate().with_context(|| format!("invalid invoice in {}", path.display()))?;

    // The form fills in the total before saving; do the same for files that omit it
    if invoice.total_amount.is_none() {
        invoice.total_amount = Some(invoice.line_items_total());
    }

    Ok(invoice)
}

fn render(config: &Config, out_dir: Option<&Path>, invoice: &Invoice) -> Result<PathBuf> {
    let out_dir = out_dir.unwrap_or_else(|| Path::new(&config.output_dir));
    let generator = InvoiceGenerator::new(out_dir)?;
    generator.generate_invoice(invoice)
}

async fn save(db: &Database, invoice: &Invoice) -> Result<i32> {
    let store = InvoiceStore::new(db.clone());
    let invoice_id = store.save_invoice(invoice).await?;
    Ok(invoice_id)
}

/// Render and save independently, so one failing does not hide the other
async fn issue(config: &Config, out_dir: Option<&Path>, invoice: &Invoice) -> Result<()> {
    let rendered = render(config, out_dir, invoice);
    match &rendered {
        Ok(path) => println!("Invoice written to {}", path.display()),
        Err(err) => error!("Generation failed: {:#}", err),
    }

    let saved = match db::init(config).await {
        Ok(db) => {
            let result = save(&db, invoice).await;
            db.close().await;
            result
        }
        Err(err) => Err(err),
    };
    match &saved {
        Ok(invoice_id) => println!("Invoice saved with id {}", invoice_id),
        Err(err) => error!("Save failed: {:#}", err),
    }

    match (rendered, saved) {
        (Ok(_), Ok(_)) => Ok(()),
        (Err(_), Ok(_)) => bail!("invoice was saved but the document could not be generated"),
        (Ok(_), Err(_)) => bail!("document was generated but the invoice could not be saved"),
        (Err(_), Err(_)) => bail!("invoice could neither be generated nor saved"),
    }
}
