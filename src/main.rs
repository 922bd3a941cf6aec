use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Datelike, Local};
use clap::{Parser, Subcommand};
use comfy_table::{Attribute, Cell, Color, Table};
use inquire::{Confirm, DateSelect, InquireError, Select, Text};

use finch_invoice::config::{self, AppSettings};
use finch_invoice::model::{Edit, Invoice, InvoiceId, InvoiceStatus, LineItemId};
use finch_invoice::query::{self, Breakdown, UNTITLED_CLIENT};
use finch_invoice::render::{self, InvoiceRenderer, money};
use finch_invoice::{InvoiceStore, JsonFileBackend, Totals, logging};

type Store = InvoiceStore<JsonFileBackend>;

const PAID_GREEN: Color = Color::Rgb { r: 4, g: 120, b: 87 };
const DUE_RED: Color = Color::Rgb { r: 185, g: 28, b: 28 };

// ==========================================
// CLI
// ==========================================

#[derive(Parser)]
#[command(name = "finch-invoice", version, about = "Record, edit and review invoices")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new invoice
    New,
    /// Edit an existing invoice
    Edit,
    /// Set the status of an invoice
    Status,
    /// Delete an invoice
    Delete,
    /// List invoices, most recent first
    List {
        /// Only show invoices with this status
        #[arg(long)]
        status: Option<InvoiceStatus>,
    },
    /// Show invoice count, total billed and total paid
    Stats,
    /// Monthly and per-client totals for a year
    Summary {
        /// Year to summarize (defaults to current year)
        year: Option<i32>,
    },
    /// Write a printable HTML copy of an invoice
    Print,
    /// Configure data directory
    Config,
}

fn main() {
    logging::init();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        use clap::CommandFactory;
        let _ = Cli::command().print_help();
        return;
    };

    if let Err(e) = run(command) {
        if is_cancelled(&e) {
            println!("Cancelled");
            return;
        }
        eprintln!("❌ Error: {e:#}");
        std::process::exit(1);
    }
}

fn run(command: Commands) -> Result<()> {
    if let Commands::Config = command {
        return setup_config_wizard();
    }

    let settings = config::load().context("failed to load settings")?;
    let data_dir = settings.data_dir()?;
    let mut store = InvoiceStore::open(JsonFileBackend::new(&data_dir));

    match command {
        Commands::New => new_invoice(&mut store),
        Commands::Edit => edit_invoice(&mut store),
        Commands::Status => change_status(&mut store),
        Commands::Delete => delete_invoice(&mut store),
        Commands::List { status } => {
            list_invoices(&store, status);
            Ok(())
        }
        Commands::Stats => {
            show_stats(&store);
            Ok(())
        }
        Commands::Summary { year } => {
            show_summary(&store, year.unwrap_or_else(|| Local::now().year()));
            Ok(())
        }
        Commands::Print => print_invoice(&store, &settings),
        Commands::Config => setup_config_wizard(),
    }
}

fn is_cancelled(e: &anyhow::Error) -> bool {
    matches!(
        e.downcast_ref::<InquireError>(),
        Some(InquireError::OperationCanceled | InquireError::OperationInterrupted)
    )
}

// ==========================================
// 1. Create / Edit
// ==========================================

fn new_invoice(store: &mut Store) -> Result<()> {
    store.clear_selection();
    let mut draft = store.edit_draft();
    println!("\n--- New Invoice {} ---", draft.id());
    edit_wizard(&mut draft)?;
    save_with_confirm(store, draft)
}

fn edit_invoice(store: &mut Store) -> Result<()> {
    let Some(id) = select_invoice(store, "Select Invoice to Edit:")? else {
        return Ok(());
    };
    store.select(&id);
    let mut draft = store.edit_draft();
    println!("\n--- Editing {} ---", draft.id());
    edit_wizard(&mut draft)?;
    save_with_confirm(store, draft)
}

fn save_with_confirm(store: &mut Store, draft: Invoice) -> Result<()> {
    print_totals(&draft.totals(), draft.tax_rate);
    if !Confirm::new("Save invoice?").with_default(true).prompt()? {
        println!("Not saved.");
        return Ok(());
    }
    let id = draft.id().clone();
    store.save_draft(draft).context("failed to save invoices")?;
    println!("✅ Saved {id}");
    Ok(())
}

fn edit_wizard(draft: &mut Invoice) -> Result<()> {
    println!("💡 Tip: Use '\\n' for new lines in the address and notes.");

    let name = Text::new("Client Name:").with_default(&draft.client.name).prompt()?;
    draft.apply(Edit::ClientName(name));
    let email = Text::new("Client Email:").with_default(&draft.client.email).prompt()?;
    draft.apply(Edit::ClientEmail(email));
    let address = Text::new("Client Address:")
        .with_default(&escape_newlines(&draft.client.address))
        .prompt()?;
    draft.apply(Edit::ClientAddress(unescape_newlines(&address)));

    draft.date = DateSelect::new("Invoice Date:").with_default(draft.date).prompt()?;
    draft.due_date = DateSelect::new("Due Date:")
        .with_default(draft.due_date.max(draft.date))
        .prompt()?;

    edit_items(draft)?;

    let tax = Text::new("Tax Rate %:").with_default(&draft.tax_rate.to_string()).prompt()?;
    draft.apply(Edit::TaxRate(tax));
    let discount = Text::new("Discount:").with_default(&draft.discount.to_string()).prompt()?;
    draft.apply(Edit::Discount(discount));

    let notes = Text::new("Notes:").with_default(&escape_newlines(&draft.notes)).prompt()?;
    draft.apply(Edit::Notes(unescape_newlines(&notes)));

    let status = select_status("Status:", draft.status)?;
    draft.apply(Edit::Status(status));
    Ok(())
}

const ADD_ITEM_OPT: &str = "➕ Add Item";
const EDIT_ITEM_OPT: &str = "✏️  Edit Item";
const REMOVE_ITEM_OPT: &str = "🗑  Remove Item";
const DONE_OPT: &str = "✅ Done";

fn edit_items(draft: &mut Invoice) -> Result<()> {
    loop {
        print_items(draft);
        let mut options = vec![ADD_ITEM_OPT];
        if !draft.items.is_empty() {
            options.extend([EDIT_ITEM_OPT, REMOVE_ITEM_OPT]);
        }
        options.push(DONE_OPT);

        match Select::new("Line Items:", options).prompt()? {
            ADD_ITEM_OPT => {
                let id = draft.add_item();
                edit_item(draft, id)?;
            }
            EDIT_ITEM_OPT => {
                if let Some(id) = select_item(draft, "Select Item to Edit:")? {
                    edit_item(draft, id)?;
                }
            }
            REMOVE_ITEM_OPT => {
                if let Some(id) = select_item(draft, "Select Item to Remove:")? {
                    draft.apply(Edit::RemoveItem(id));
                }
            }
            _ => return Ok(()),
        }
    }
}

fn edit_item(draft: &mut Invoice, id: LineItemId) -> Result<()> {
    let Some(item) = draft.items.iter().find(|it| it.id == id).cloned() else {
        return Ok(());
    };
    let description = Text::new("Description:").with_default(&item.description).prompt()?;
    let qty = Text::new("Qty:").with_default(&item.qty.to_string()).prompt()?;
    let price = Text::new("Price:").with_default(&item.price.to_string()).prompt()?;

    draft.apply(Edit::ItemDescription(id, description));
    draft.apply(Edit::ItemQty(id, qty));
    draft.apply(Edit::ItemPrice(id, price));
    Ok(())
}

fn select_item(draft: &Invoice, prompt: &str) -> Result<Option<LineItemId>> {
    let labels: Vec<String> = draft
        .items
        .iter()
        .map(|it| {
            let description = item_label(&it.description);
            format!("#{} {description} ({} x {})", it.id, it.qty, money(it.price))
        })
        .collect();
    match Select::new(prompt, labels).raw_prompt() {
        Ok(choice) => Ok(Some(draft.items[choice.index].id)),
        Err(InquireError::OperationCanceled) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn item_label(description: &str) -> &str {
    if description.trim().is_empty() { "(no description)" } else { description }
}

fn escape_newlines(s: &str) -> String {
    s.replace('\n', "\\n")
}

fn unescape_newlines(s: &str) -> String {
    s.replace("\\n", "\n")
}

// ==========================================
// 2. Status / Delete
// ==========================================

fn select_status(prompt: &str, current: InvoiceStatus) -> Result<InvoiceStatus> {
    let cursor = InvoiceStatus::ALL.iter().position(|s| *s == current).unwrap_or(0);
    Ok(Select::new(prompt, InvoiceStatus::ALL.to_vec())
        .with_starting_cursor(cursor)
        .prompt()?)
}

fn change_status(store: &mut Store) -> Result<()> {
    let Some(id) = select_invoice(store, "Select Invoice:")? else {
        return Ok(());
    };
    let Some(current) = store.get(&id).map(|inv| inv.status) else {
        return Ok(());
    };
    let status = select_status("New Status:", current)?;
    // Any status may be assigned directly, Draft included.
    store.set_status(&id, status).context("failed to save invoices")?;
    println!("✅ {id} is now {status}");
    Ok(())
}

fn delete_invoice(store: &mut Store) -> Result<()> {
    let Some(id) = select_invoice(store, "Select Invoice to DELETE:")? else {
        return Ok(());
    };
    let sure = Confirm::new(&format!("Delete {id}? This cannot be undone."))
        .with_default(false)
        .prompt()?;
    if sure {
        store.delete(&id).context("failed to save invoices")?;
        println!("🗑  Deleted {id}");
    }
    Ok(())
}

fn select_invoice(store: &Store, prompt: &str) -> Result<Option<InvoiceId>> {
    let rows = query::display_rows(store.all());
    if rows.is_empty() {
        println!("❌ No invoices found.");
        return Ok(None);
    }
    let labels: Vec<String> = rows
        .iter()
        .map(|row| {
            format!(
                "{} | {} | {} | {} | {}",
                row.invoice.id(),
                row.invoice.date,
                client_label(&row.invoice.client.name),
                row.invoice.status,
                money(row.totals.total)
            )
        })
        .collect();

    let choice = Select::new(prompt, labels).with_page_size(10).raw_prompt()?;
    Ok(Some(rows[choice.index].invoice.id().clone()))
}

fn client_label(name: &str) -> &str {
    if name.trim().is_empty() { UNTITLED_CLIENT } else { name }
}

// ==========================================
// 3. List / Stats / Summary
// ==========================================

fn status_cell(status: InvoiceStatus) -> Cell {
    let cell = Cell::new(status);
    match status {
        InvoiceStatus::Paid => cell.fg(PAID_GREEN),
        InvoiceStatus::Overdue => cell.fg(DUE_RED),
        _ => cell,
    }
}

fn list_invoices(store: &Store, status: Option<InvoiceStatus>) {
    let listed = match status {
        Some(s) => {
            println!("--- {s} Invoices ---");
            query::filter_by_status(store.all(), s)
        }
        None => {
            println!("--- Invoices ({} total) ---", store.len());
            query::list_for_display(store.all())
        }
    };
    if listed.is_empty() {
        println!("No invoices yet. Create your first one with `finch-invoice new`.");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["Invoice", "Date", "Client", "Status", "Total", "Due"]);
    for inv in listed {
        table.add_row(vec![
            Cell::new(inv.id()),
            Cell::new(inv.date),
            Cell::new(client_label(&inv.client.name)),
            status_cell(inv.status),
            Cell::new(money(inv.totals().total)).add_attribute(Attribute::Bold),
            Cell::new(inv.due_date),
        ]);
    }
    println!("{table}");
}

fn show_stats(store: &Store) {
    let stats = query::portfolio_stats(store.all());
    let mut table = Table::new();
    table.set_header(vec!["Invoices", "Total Billed", "Paid"]);
    table.add_row(vec![
        Cell::new(stats.count),
        Cell::new(money(stats.total_billed)),
        Cell::new(money(stats.total_paid)).fg(PAID_GREEN),
    ]);
    println!("{table}");
}

fn breakdown_cells(b: &Breakdown) -> [Cell; 3] {
    let paid = Cell::new(money(b.paid));
    let unpaid = Cell::new(money(b.unpaid));
    [
        if b.paid > 0.0 { paid.fg(PAID_GREEN) } else { paid },
        if b.unpaid > 0.0 { unpaid.fg(DUE_RED) } else { unpaid },
        Cell::new(money(b.billed())),
    ]
}

fn show_summary(store: &Store, year: i32) {
    let summary = query::monthly_summary(store.all(), year);
    if summary.months.is_empty() {
        println!("No invoices dated {year}.");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["Month", "Paid", "Unpaid", "Total"]);
    for (month, breakdown) in &summary.months {
        let label = chrono::NaiveDate::from_ymd_opt(year, *month, 1)
            .map(|d| d.format("%B %Y").to_string())
            .unwrap_or_else(|| format!("{year}-{month:02}"));
        let mut row = vec![Cell::new(label)];
        row.extend(breakdown_cells(breakdown));
        table.add_row(row);
    }
    let mut total_row = vec![Cell::new(format!("Total ({year})")).add_attribute(Attribute::Bold)];
    total_row.extend(
        breakdown_cells(&summary.total)
            .map(|c| c.add_attribute(Attribute::Bold)),
    );
    table.add_row(total_row);

    println!("\n--- Monthly Invoice Summary ({year}) ---");
    println!("{table}");

    let in_year: Vec<Invoice> = store
        .all()
        .iter()
        .filter(|inv| inv.date.year() == year)
        .cloned()
        .collect();
    let mut client_table = Table::new();
    client_table.set_header(vec!["Client", "Paid", "Unpaid", "Total"]);
    for (client, breakdown) in query::client_summary(&in_year) {
        let mut row = vec![Cell::new(client)];
        row.extend(breakdown_cells(&breakdown));
        client_table.add_row(row);
    }

    println!("\n--- Client Summary ({year}) ---");
    println!("{client_table}");
}

// ==========================================
// 4. Preview / Print
// ==========================================

fn print_items(draft: &Invoice) {
    if draft.items.is_empty() {
        println!("(no line items)");
        return;
    }
    let mut table = Table::new();
    table.set_header(vec!["#", "Description", "Qty", "Price", "Amount"]);
    for it in &draft.items {
        table.add_row(vec![
            Cell::new(it.id),
            Cell::new(item_label(&it.description)),
            Cell::new(it.qty),
            Cell::new(money(it.price)),
            Cell::new(money(it.amount())),
        ]);
    }
    println!("{table}");
}

fn print_totals(totals: &Totals, tax_rate: f64) {
    let mut table = Table::new();
    table.add_row(vec![Cell::new("Subtotal"), Cell::new(money(totals.subtotal))]);
    table.add_row(vec![
        Cell::new("Discount"),
        Cell::new(format!("-{}", money(totals.discount_applied))),
    ]);
    table.add_row(vec![Cell::new(format!("Tax ({tax_rate}%)")), Cell::new(money(totals.tax))]);
    table.add_row(vec![
        Cell::new("Total").add_attribute(Attribute::Bold),
        Cell::new(money(totals.total)).add_attribute(Attribute::Bold),
    ]);
    println!("{table}");
}

fn print_invoice(store: &Store, settings: &AppSettings) -> Result<()> {
    let Some(id) = select_invoice(store, "Select Invoice to Print:")? else {
        return Ok(());
    };
    let Some(invoice) = store.get(&id) else {
        return Ok(());
    };

    let html = InvoiceRenderer::new()?.render(invoice)?;
    let output_dir = settings.output_dir()?;
    fs::create_dir_all(&output_dir)
        .with_context(|| format!("failed to create {}", output_dir.display()))?;
    let path: PathBuf = output_dir.join(render::output_file_name(invoice.id()));
    fs::write(&path, html).with_context(|| format!("failed to write {}", path.display()))?;
    println!("✅ Printable invoice written: {}", path.display());
    Ok(())
}

// ==========================================
// 5. Config
// ==========================================

fn setup_config_wizard() -> Result<()> {
    println!("\n⚙️  --- Configuration Setup ---");
    // A broken settings file must not block fixing it.
    let current = match config::load() {
        Ok(settings) => settings.data_root,
        Err(e) => {
            tracing::warn!(error = %e, "ignoring unreadable settings");
            String::from("~/Documents/Invoices")
        }
    };
    let root = Text::new("Data Directory:").with_default(&current).prompt()?;
    let settings = AppSettings {
        data_root: root.trim().to_string(),
    };
    let path = config::save(&settings)?;
    println!("✅ Settings saved to {}", path.display());
    Ok(())
}
