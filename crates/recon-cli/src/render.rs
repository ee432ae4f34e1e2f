//! Terminal rendering for scores, candidates, validation and triage.

use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use recon_core::ConflictLedger;
use recon_model::{
    ConfidenceLevel, ConflictSeverity, FieldMapping, MappingCandidate, MappingConflict,
    ResolutionStatus,
};
use recon_validate::ValidationReport;

/// Factor-by-factor breakdown of a single score.
pub fn score_details(candidate: &MappingCandidate) -> String {
    let mut lines = vec![format!(
        "{} → {}: {:.1} ({})",
        candidate.source_field,
        candidate.target_field,
        candidate.confidence,
        candidate.level.description()
    )];
    for (factor, value) in candidate.factors.iter() {
        lines.push(format!("  {:<24}{:>5.0}%", factor.label(), value * 100.0));
    }
    for warning in &candidate.warnings {
        lines.push(format!("  warning: {warning}"));
    }
    for recommendation in &candidate.recommendations {
        lines.push(format!("  recommend: {recommendation}"));
    }
    lines.join("\n")
}

pub fn candidate_table(candidates: &[MappingCandidate]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Source"),
        header_cell("Target"),
        header_cell("Confidence"),
        header_cell("Level"),
        header_cell("Warnings"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 2, CellAlignment::Right);
    align_column(&mut table, 3, CellAlignment::Center);
    for candidate in candidates {
        table.add_row(vec![
            Cell::new(&candidate.source_field),
            Cell::new(&candidate.target_field),
            Cell::new(format!("{:.1}", candidate.confidence)),
            level_cell(candidate.level),
            text_or_dash(&candidate.warnings.join("\n")),
        ]);
    }
    table
}

/// One row per mapping; passing mappings show a dash.
pub fn validation_table(results: &[(&FieldMapping, ValidationReport)]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Source"),
        header_cell("Target"),
        header_cell("Type"),
        header_cell("Result"),
        header_cell("Warnings"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 3, CellAlignment::Center);
    for (mapping, report) in results {
        let result = if report.passed() {
            Cell::new("PASS").fg(Color::Green)
        } else {
            Cell::new("WARN").fg(Color::Yellow)
        };
        table.add_row(vec![
            Cell::new(format!("{}.{}", mapping.source_object, mapping.source_field)),
            Cell::new(format!("{}.{}", mapping.target_object, mapping.target_field)),
            Cell::new(mapping.mapping_type),
            result,
            text_or_dash(&report.messages().join("\n")),
        ]);
    }
    table
}

/// Every conflict in triage order.
pub fn triage_table(ledger: &ConflictLedger) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("ID"),
        header_cell("Severity"),
        header_cell("Type"),
        header_cell("Status"),
        header_cell("Description"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 0, CellAlignment::Right);
    align_column(&mut table, 1, CellAlignment::Center);
    for conflict in ledger.triage() {
        table.add_row(vec![
            Cell::new(conflict.id),
            severity_cell(conflict.severity),
            Cell::new(conflict.conflict_type),
            status_cell(conflict),
            Cell::new(&conflict.description),
        ]);
    }
    table
}

/// One-line ledger summary, e.g. `3 conflicts: 2 open (1 blocker, 1 error), 1 closed`.
pub fn ledger_summary(ledger: &ConflictLedger) -> String {
    let open = ledger.open_by_severity();
    let open_total: usize = open.values().sum();
    let closed = ledger.len() - open_total;
    let noun = if ledger.len() == 1 { "conflict" } else { "conflicts" };
    if open_total == 0 {
        return format!("{} {noun}: 0 open, {closed} closed", ledger.len());
    }
    let breakdown: Vec<String> = open
        .iter()
        .rev()
        .map(|(severity, count)| format!("{count} {severity}"))
        .collect();
    format!(
        "{} {noun}: {open_total} open ({}), {closed} closed",
        ledger.len(),
        breakdown.join(", ")
    )
}

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn level_cell(level: ConfidenceLevel) -> Cell {
    match level {
        ConfidenceLevel::High => Cell::new("HIGH")
            .fg(Color::Green)
            .add_attribute(Attribute::Bold),
        ConfidenceLevel::Medium => Cell::new("MEDIUM").fg(Color::Yellow),
        ConfidenceLevel::Low => Cell::new("LOW").fg(Color::Red),
    }
}

fn severity_cell(severity: ConflictSeverity) -> Cell {
    match severity {
        ConflictSeverity::Blocker => Cell::new("BLOCKER")
            .fg(Color::Red)
            .add_attribute(Attribute::Bold),
        ConflictSeverity::Error => Cell::new("ERROR").fg(Color::Red),
        ConflictSeverity::Warning => Cell::new("WARN").fg(Color::Yellow),
        ConflictSeverity::Info => dim_cell("INFO"),
    }
}

fn status_cell(conflict: &MappingConflict) -> Cell {
    match conflict.resolution_status {
        ResolutionStatus::Unresolved => Cell::new("open").add_attribute(Attribute::Bold),
        ResolutionStatus::Ignored => dim_cell("ignored"),
        status => {
            let action = conflict
                .resolution_action
                .map(|a| format!("{status}: {a}"))
                .unwrap_or_else(|| status.to_string());
            Cell::new(action).fg(Color::Green)
        }
    }
}

fn text_or_dash(text: &str) -> Cell {
    if text.is_empty() {
        dim_cell("-")
    } else {
        Cell::new(text)
    }
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}

#[cfg(test)]
mod tests {
    use recon_model::{ConflictType, NewConflict};

    use super::*;

    #[test]
    fn empty_ledger_summary() {
        assert_eq!(
            ledger_summary(&ConflictLedger::new()),
            "0 conflicts: 0 open, 0 closed"
        );
    }

    #[test]
    fn triage_table_lists_every_conflict() {
        let mut ledger = ConflictLedger::new();
        ledger
            .open_conflict(NewConflict::new(
                ConflictType::DuplicateMapping,
                ConflictSeverity::Error,
                "2 mappings target 'Item.Code': Product2.Code, Product2.Sku",
            ))
            .unwrap();
        let table = triage_table(&ledger);
        assert_eq!(table.row_iter().count(), 1);
        assert!(table.to_string().contains("Item.Code"));
    }
}
