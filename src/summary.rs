use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use wifiqr::batch::{RowOutcome, RowStatus};
use wifiqr::logo::LogoStatus;
use wifiqr::pipeline::RenderedQr;
use wifiqr::sheet::column_letter;
use wifiqr::store::{RecentFile, SourceConfigEntry};

use crate::commands::{BatchResult, SourcesView};

pub fn print_generated(rendered: &RenderedQr) {
    println!("Saved: {}", rendered.path.display());
    println!("Error correction: {}", rendered.composition.ecc.letter());
    match &rendered.composition.logo {
        LogoStatus::Applied(placement) => println!(
            "Logo: {}x{} at ({}, {})",
            placement.width, placement.height, placement.x, placement.y
        ),
        LogoStatus::Skipped(warning) => println!("Logo: skipped ({warning})"),
        LogoStatus::NotRequested => {}
    }
}

pub fn print_batch_summary(result: &BatchResult) {
    let report = &result.report;
    println!("Sheet: {} ({})", result.sheet, result.file.display());
    println!("Output: {}", result.output_dir.display());

    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Row"),
        header_cell("Room"),
        header_cell("Status"),
        header_cell("Detail"),
    ]);
    apply_summary_table_style(&mut table);
    align_column(&mut table, 0, CellAlignment::Right);
    align_column(&mut table, 2, CellAlignment::Center);
    for outcome in &report.outcomes {
        table.add_row(outcome_row(outcome));
    }
    table.add_row(vec![
        Cell::new("TOTAL")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        Cell::new(format!("{} rows", report.outcomes.len() + report.skipped))
            .add_attribute(Attribute::Bold),
        count_cell(report.generated(), Color::Green),
        Cell::new(format!("{} failed, {} skipped", report.failed(), report.skipped))
            .add_attribute(Attribute::Bold),
    ]);
    println!("{table}");
    if report.cancelled {
        eprintln!("Cancelled: {} rows were not processed.", report.skipped);
    }
    for error in &result.unsaved {
        eprintln!("Preference not saved: {error}");
    }
}

fn outcome_row(outcome: &RowOutcome) -> Vec<Cell> {
    let room = Cell::new(outcome.room.as_deref().unwrap_or("-"));
    match &outcome.status {
        RowStatus::Generated { path, logo_warning } => {
            let status = Cell::new("✓").fg(Color::Green).add_attribute(Attribute::Bold);
            let detail = match logo_warning {
                Some(warning) => Cell::new(format!("{} (no logo: {warning})", path.display()))
                    .fg(Color::Yellow),
                None => Cell::new(path.display()),
            };
            vec![Cell::new(outcome.row), room, status, detail]
        }
        RowStatus::Failed(error) => vec![
            Cell::new(outcome.row),
            room,
            Cell::new("✗").fg(Color::Red).add_attribute(Attribute::Bold),
            Cell::new(error).fg(Color::Red),
        ],
    }
}

pub fn print_sources(view: &SourcesView) {
    match view {
        SourcesView::Recent(files) => print_recent(files),
        SourcesView::Entry { file, sheet, entry } => {
            println!("File: {}", file.display());
            println!("Sheet: {sheet}");
            print_entry(entry);
        }
    }
}

fn print_recent(files: &[RecentFile]) {
    if files.is_empty() {
        println!("No recent sheets.");
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![header_cell("#"), header_cell("File"), header_cell("Last sheet")]);
    apply_table_style(&mut table);
    align_column(&mut table, 0, CellAlignment::Right);
    for (idx, file) in files.iter().enumerate() {
        table.add_row(vec![
            Cell::new(idx + 1),
            Cell::new(file.path.display()),
            Cell::new(&file.last_sheet),
        ]);
    }
    println!("{table}");
}

fn print_entry(entry: &SourceConfigEntry) {
    let mut table = Table::new();
    table.set_header(vec![header_cell("Setting"), header_cell("Value")]);
    apply_table_style(&mut table);
    for (role, column) in &entry.column_map {
        table.add_row(vec![
            Cell::new(format!("{role} column")),
            Cell::new(column_letter(*column)),
        ]);
    }
    table.add_row(vec![
        Cell::new("encryption from sheet"),
        flag_cell(entry.use_excel_security),
    ]);
    table.add_row(vec![
        Cell::new("property from sheet"),
        flag_cell(entry.use_excel_property),
    ]);
    table.add_row(vec![
        Cell::new("default encryption"),
        Cell::new(entry.default_encryption.label()),
    ]);
    table.add_row(vec![
        Cell::new("default property"),
        match entry.default_property {
            Some(property) => Cell::new(property.tag()),
            None => dim_cell("none"),
        },
    ]);
    println!("{table}");
}

fn flag_cell(value: bool) -> Cell {
    if value {
        Cell::new("yes").fg(Color::Green)
    } else {
        dim_cell("no")
    }
}

fn count_cell(count: usize, color: Color) -> Cell {
    if count > 0 {
        Cell::new(count).fg(color).add_attribute(Attribute::Bold)
    } else {
        dim_cell(count)
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value.to_string()).fg(Color::DarkGrey)
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(140);
}
