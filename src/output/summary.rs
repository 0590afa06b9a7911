use std::fmt::Write;
use std::path::Path;

use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, CellAlignment, Color as TableColor, ContentArrangement, Table};
use console::style;

use crate::flatten::Dataset;

/// Prints a per-artifact breakdown of a flattened dataset to stderr.
///
/// Artifacts that contributed no rows are dimmed so that empty or error
/// batches stand out.
pub fn print_flatten_summary(dataset: &Dataset, output: &Path) {
    eprintln!("{}", render_flatten_summary(dataset, output));
}

fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn count_cell(count: usize) -> Cell {
    Cell::new(count).set_alignment(CellAlignment::Right)
}

fn render_flatten_summary(dataset: &Dataset, output: &Path) -> String {
    let mut rendered = String::new();

    let mut table = create_table();
    table.set_header(
        ["Batch artifact", "Builds", "Rows"]
            .iter()
            .map(|label| Cell::new(*label).fg(TableColor::Cyan))
            .collect::<Vec<_>>(),
    );

    for source in dataset.sources() {
        let name = if source.rows == 0 {
            Cell::new(&source.file).fg(TableColor::DarkGrey)
        } else {
            Cell::new(&source.file)
        };
        table.add_row(vec![name, count_cell(source.builds), count_cell(source.rows)]);
    }

    let total_builds: usize = dataset.sources().iter().map(|s| s.builds).sum();
    table.add_row(vec![
        Cell::new("Total").fg(TableColor::Green),
        count_cell(total_builds),
        count_cell(dataset.rows().len()),
    ]);

    let _ = writeln!(
        rendered,
        "{}",
        style("Flattened dataset").bright().underlined()
    );
    let _ = writeln!(rendered, "{table}");
    let _ = write!(
        rendered,
        "{} {}",
        style("Written to").dim(),
        output.display()
    );

    rendered
}
