mod config;
mod draft;
mod export;
mod format;
mod ledger;
mod model;
mod numbering;
mod preview;
mod session;
mod settings;
mod storage;

use std::path::PathBuf;
use std::rc::Rc;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use comfy_table::{Attribute, Cell, CellAlignment, Table};
use inquire::{Confirm, DateSelect, Select, Text};
use tracing_subscriber::EnvFilter;

use crate::config::{AppConfig, load_config, setup_config_wizard};
use crate::export::{
    CommandExporter, ExportOutcome, Printer, SystemPrinter, export_pdf, write_print_page,
};
use crate::format::{coerce_amount, iso, today};
use crate::ledger::ItemField;
use crate::model::{InvoiceType, LineItem};
use crate::numbering::{CounterPolicy, build_policy};
use crate::preview::render_html;
use crate::session::{DraftField, Session};
use crate::storage::{BlobStore, FileStore};

// ==========================================
// CLI
// ==========================================

#[derive(Parser)]
#[command(name = "invoice-builder")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Edit the current draft interactively
    Edit,
    /// Show the current draft
    Show,
    /// Discard the saved draft and start a new invoice
    Reset {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Export the draft as PDF
    Pdf,
    /// Open the draft in the system viewer for printing
    Print,
    /// Set shop name, tagline, logo and stamp
    Settings {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        tagline: Option<String>,
        /// Logo image file
        #[arg(long)]
        logo: Option<PathBuf>,
        /// Stamp / signature image file
        #[arg(long)]
        stamp: Option<PathBuf>,
    },
    /// Configure data directory and numbering
    Config,
    /// Show the invoice counter
    Counter,
}

// ==========================================
// Main Function
// ==========================================

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "invoice_builder=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run() {
        eprintln!("❌ Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        use clap::CommandFactory;
        Cli::command().print_help()?;
        return Ok(());
    };

    let config = match command {
        Commands::Config => {
            setup_config_wizard()?;
            return Ok(());
        }
        _ => load_config().unwrap_or_default(),
    };

    let store: Rc<dyn BlobStore> = Rc::new(FileStore::new(config.store_dir()));

    match command {
        Commands::Counter => {
            let counter = CounterPolicy::new(store, config.invoice_start);
            println!("🔢 Last issued invoice number: {}", counter.read());
            Ok(())
        }
        command => {
            let mut session = open_session(&config, store);
            match command {
                Commands::Edit => edit_loop(&mut session, &config),
                Commands::Show => {
                    show_preview(&session);
                    Ok(())
                }
                Commands::Reset { yes } => reset(&mut session, yes),
                Commands::Pdf => download_pdf(&session, &config),
                Commands::Print => print(&session, &config),
                Commands::Settings {
                    name,
                    tagline,
                    logo,
                    stamp,
                } => settings_command(&mut session, name, tagline, logo, stamp),
                Commands::Config | Commands::Counter => Ok(()),
            }
        }
    }
}

fn open_session(config: &AppConfig, store: Rc<dyn BlobStore>) -> Session {
    let numbering = build_policy(config.numbering, store.clone(), config.invoice_start);
    Session::open(store, numbering, config.tax_in_total, today())
}

// ==========================================
// 1. Interactive Editing
// ==========================================

const MENU_FIELD: &str = "✏️  Edit field";
const MENU_ADD: &str = "➕ Add item";
const MENU_ITEM: &str = "📝 Edit item";
const MENU_REMOVE: &str = "🗑️  Remove item";
const MENU_SHOW: &str = "👀 Show preview";
const MENU_SAVE: &str = "💾 Save";
const MENU_RESET: &str = "♻️  Reset";
const MENU_PRINT: &str = "🖨️  Print";
const MENU_PDF: &str = "📄 Download PDF";
const MENU_SETTINGS: &str = "⚙️  Shop settings";
const MENU_QUIT: &str = "🚪 Quit";

fn edit_loop(session: &mut Session, config: &AppConfig) -> anyhow::Result<()> {
    show_preview(session);
    loop {
        let options = vec![
            MENU_FIELD, MENU_ADD, MENU_ITEM, MENU_REMOVE, MENU_SHOW, MENU_SAVE, MENU_RESET,
            MENU_PRINT, MENU_PDF, MENU_SETTINGS, MENU_QUIT,
        ];
        let choice = match Select::new("What next?", options).with_page_size(11).prompt() {
            Ok(choice) => choice,
            Err(_) => return Ok(()),
        };

        match choice {
            MENU_FIELD => edit_field(session)?,
            MENU_ADD => {
                let item = prompt_item(&LineItem::default())?;
                session.add_item(item);
                show_totals(session);
            }
            MENU_ITEM => {
                if let Some(idx) = pick_item(session, "Edit which item?")? {
                    let current = session.draft().items.items()[idx].clone();
                    let item = prompt_item(&current)?;
                    session.update_item(idx, ItemField::Quantity, &item.quantity.to_string());
                    session.update_item(idx, ItemField::Description, &item.description);
                    session.update_item(idx, ItemField::UnitPrice, &item.unit_price.to_string());
                    show_totals(session);
                }
            }
            MENU_REMOVE => {
                if let Some(idx) = pick_item(session, "Remove which item?")? {
                    session.remove_item(idx);
                    show_totals(session);
                }
            }
            MENU_SHOW => show_preview(session),
            MENU_SAVE => {
                session.save()?;
                println!("✅ Saved.");
            }
            MENU_RESET => reset(session, false)?,
            MENU_PRINT => print(session, config)?,
            MENU_PDF => download_pdf(session, config)?,
            MENU_SETTINGS => settings_wizard(session)?,
            _ => return Ok(()),
        }
    }
}

fn edit_field(session: &mut Session) -> anyhow::Result<()> {
    let show_service = session.draft().invoice_type.has_service_section();
    let fields: Vec<DraftField> = DraftField::ALL
        .into_iter()
        .filter(|f| show_service || !f.is_service())
        .filter(|f| session.include_tax() || *f != DraftField::Tax)
        .collect();

    let field = Select::new("Field:", fields).prompt()?;
    let draft = session.draft();

    let raw = match field {
        DraftField::InvoiceType => {
            let kind = Select::new("Invoice type:", InvoiceType::ALL.to_vec()).prompt()?;
            kind.code().to_string()
        }
        DraftField::Date => {
            let current = chrono::NaiveDate::parse_from_str(&draft.date, "%Y-%m-%d")
                .unwrap_or_else(|_| today());
            iso(DateSelect::new("Invoice date:").with_default(current).prompt()?)
        }
        DraftField::Discount => prompt_text(field, &draft.discount.to_string())?,
        DraftField::Tax => prompt_text(field, &draft.tax.to_string())?,
        _ => prompt_text(field, &current_text(session, field))?,
    };

    session.set_field(field, &raw);
    show_totals(session);
    Ok(())
}

fn current_text(session: &Session, field: DraftField) -> String {
    let d = session.draft();
    match field {
        DraftField::Number => d.number.clone(),
        DraftField::CustomerName => d.customer.name.clone(),
        DraftField::CustomerPhone => d.customer.phone.clone(),
        DraftField::CustomerAddress => d.customer.address.clone(),
        DraftField::Terms => d.terms.clone(),
        DraftField::ServiceDevice => d.service.device.clone(),
        DraftField::ServiceSerial => d.service.serial_number.clone(),
        DraftField::ServiceWork => d.service.work_description.clone(),
        DraftField::ServiceNote => d.service.note.clone(),
        _ => String::new(),
    }
}

fn prompt_text(field: DraftField, current: &str) -> anyhow::Result<String> {
    Ok(Text::new(&format!("{}:", field.label()))
        .with_initial_value(current)
        .prompt()?)
}

fn prompt_item(current: &LineItem) -> anyhow::Result<LineItem> {
    let quantity = Text::new("Qty:")
        .with_initial_value(&current.quantity.to_string())
        .prompt()?;
    let description = Text::new("Description:")
        .with_initial_value(&current.description)
        .prompt()?;
    let price = Text::new("Unit price (Rp):")
        .with_initial_value(&current.unit_price.to_string())
        .prompt()?;

    Ok(LineItem::new(
        coerce_amount(&quantity),
        description,
        coerce_amount(&price),
    ))
}

fn pick_item(session: &Session, prompt: &str) -> anyhow::Result<Option<usize>> {
    let options: Vec<String> = session
        .preview()
        .rows
        .iter()
        .enumerate()
        .map(|(i, row)| format!("{}. {} x {} @ {}", i + 1, row.quantity, row.description, row.unit_price))
        .collect();

    match Select::new(prompt, options.clone()).prompt() {
        Ok(choice) => Ok(options.iter().position(|o| *o == choice)),
        Err(_) => Ok(None),
    }
}

fn settings_wizard(session: &mut Session) -> anyhow::Result<()> {
    let current = session.settings().clone();
    let name = Text::new("Shop name:")
        .with_initial_value(current.name.as_deref().unwrap_or_default())
        .prompt()?;
    let tagline = Text::new("Tagline:")
        .with_initial_value(current.tagline.as_deref().unwrap_or_default())
        .prompt()?;

    let logo = pick_image("Choose a new logo?")?;
    let stamp = pick_image("Choose a new stamp / signature?")?;

    session.apply_settings(&name, &tagline, logo.as_deref(), stamp.as_deref())?;
    println!("✅ Shop settings saved.");
    Ok(())
}

fn pick_image(question: &str) -> anyhow::Result<Option<PathBuf>> {
    if !Confirm::new(question).with_default(false).prompt()? {
        return Ok(None);
    }
    Ok(rfd::FileDialog::new()
        .set_title("Select Image")
        .add_filter("Images", &["png", "jpg", "jpeg", "gif", "webp", "svg"])
        .pick_file())
}

// ==========================================
// 2. Commands
// ==========================================

fn reset(session: &mut Session, yes: bool) -> anyhow::Result<()> {
    let confirmed = yes
        || Confirm::new("Reset all data?")
            .with_default(false)
            .prompt()
            .unwrap_or(false);
    if !confirmed {
        println!("Cancelled");
        return Ok(());
    }
    session.reset_all()?;
    println!("♻️  New invoice: {}", session.draft().number);
    Ok(())
}

fn settings_command(
    session: &mut Session,
    name: Option<String>,
    tagline: Option<String>,
    logo: Option<PathBuf>,
    stamp: Option<PathBuf>,
) -> anyhow::Result<()> {
    if name.is_none() && tagline.is_none() && logo.is_none() && stamp.is_none() {
        return settings_wizard(session);
    }
    let current = session.settings().clone();
    let name = name.or(current.name).unwrap_or_default();
    let tagline = tagline.or(current.tagline).unwrap_or_default();
    session.apply_settings(&name, &tagline, logo.as_deref(), stamp.as_deref())?;
    println!("✅ Shop settings saved.");
    Ok(())
}

fn download_pdf(session: &Session, config: &AppConfig) -> anyhow::Result<()> {
    let html = render_html(session.preview()).context("rendering invoice")?;
    let output_dir = config.output_dir();
    let exporter = CommandExporter::new(&config.pdf_command, &output_dir);

    println!("\n🔨 Generating PDF...");
    match export_pdf(&html, &session.draft().number, &output_dir, &exporter) {
        ExportOutcome::Written(path) => println!("✅ PDF Generated: {:?}", path),
        ExportOutcome::RendererMissing => println!(
            "❌ PDF tool '{}' is not available. Try `invoice-builder print` instead.",
            config.pdf_command
        ),
        ExportOutcome::Failed(reason) => println!("❌ PDF export failed: {}", reason),
    }
    Ok(())
}

fn print(session: &Session, config: &AppConfig) -> anyhow::Result<()> {
    let html = render_html(session.preview()).context("rendering invoice")?;
    let page = write_print_page(&html, &config.output_dir())?;
    println!("🖨️  Opening {:?} for printing", page);
    SystemPrinter.print(&page);
    Ok(())
}

// ==========================================
// 3. Display
// ==========================================

fn show_preview(session: &Session) {
    let p = session.preview();
    println!("\n{} | {}", p.brand.name, p.brand.tagline);
    println!("INVOICE {}  No: {}  Date: {}", p.type_label.to_uppercase(), p.number, p.date);
    println!(
        "Customer: {} | {} | {}",
        p.customer_name, p.customer_phone, p.customer_address
    );

    if p.show_service {
        println!(
            "Device: {}  S/N: {}\nWork: {}\nNote: {}",
            p.service.device, p.service.serial_number, p.service.work_description, p.service.note
        );
    }

    let mut table = Table::new();
    table.set_header(vec![
        Cell::new("#"),
        Cell::new("Qty"),
        Cell::new("Description"),
        Cell::new("Price"),
        Cell::new("Subtotal"),
    ]);
    for (i, row) in p.rows.iter().enumerate() {
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(&row.quantity).set_alignment(CellAlignment::Right),
            Cell::new(&row.description),
            Cell::new(&row.unit_price).set_alignment(CellAlignment::Right),
            Cell::new(&row.subtotal).set_alignment(CellAlignment::Right),
        ]);
    }
    println!("{table}");
    show_totals(session);
    println!("Terms: {}", p.terms);
}

fn show_totals(session: &Session) {
    let p = session.preview();
    let mut table = Table::new();
    table.add_row(vec![Cell::new("Subtotal"), Cell::new(&p.subtotal)]);
    table.add_row(vec![Cell::new("Discount"), Cell::new(&p.discount)]);
    if let Some(tax) = &p.tax {
        table.add_row(vec![Cell::new("Tax"), Cell::new(tax)]);
    }
    table.add_row(vec![
        Cell::new("Total").add_attribute(Attribute::Bold),
        Cell::new(&p.total).add_attribute(Attribute::Bold),
    ]);
    println!("{table}");
}
