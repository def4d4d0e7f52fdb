// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Result formatting for CLI output

use colored::*;
use comfy_table::{presets::UTF8_FULL, Cell, CellAlignment, Color, Table};
use powerstats::{
    CacheInfo, IngestionReport, PlantDetail, PlantGeneration, ReconcileReport, ResponseSource,
    StateDetail, StateInfo, StateSummary,
};
use serde::Serialize;

/// Result formatter for the table output format
pub struct ResultFormatter;

impl ResultFormatter {
    pub fn top_plants(plants: &[PlantGeneration], source: ResponseSource) -> String {
        if plants.is_empty() {
            return format!("{}\n", "No results found".yellow());
        }

        let mut output = Self::header("Top Plants", plants.len(), source);
        let mut table = Self::table(&[
            "Rank", "Plant ID", "Plant", "State", "Year", "Net MWh", "% of State",
        ]);
        for plant in plants {
            table.add_row(vec![
                Cell::new(plant.rank),
                Cell::new(plant.plant_id),
                Cell::new(&plant.plant_name),
                Cell::new(&plant.state_code),
                Cell::new(plant.year),
                Self::number(plant.net_generation),
                Self::percent(plant.percent_of_state),
            ]);
        }
        output.push_str(&table.to_string());
        output.push('\n');
        output
    }

    pub fn states_summary(states: &[StateSummary], source: ResponseSource) -> String {
        if states.is_empty() {
            return format!("{}\n", "No results found".yellow());
        }

        let mut output = Self::header("State Totals", states.len(), source);
        let mut table = Self::table(&[
            "Rank", "State", "Name", "Year", "Net MWh", "% of National", "Plants",
        ]);
        for state in states {
            table.add_row(vec![
                Cell::new(state.rank),
                Cell::new(&state.state_code),
                Cell::new(&state.state_name),
                Cell::new(state.year),
                Self::number(state.total_generation),
                Self::percent(state.percent_of_national),
                Cell::new(state.plant_count).set_alignment(CellAlignment::Right),
            ]);
        }
        output.push_str(&table.to_string());
        output.push('\n');
        output
    }

    pub fn state_detail(detail: &StateDetail, source: ResponseSource) -> String {
        let mut output = format!(
            "{} {} ({})\n",
            detail.state_name.bold().green(),
            detail.year,
            Self::source_label(source)
        );
        output.push_str(&format!(
            "Net generation: {} MWh ({:.2}% of national)\n",
            Self::format_mwh(detail.total_generation),
            detail.percent_of_national
        ));
        output.push_str(&format!("Plants: {}\n\n", detail.plant_count));
        output.push_str(&Self::top_plants(&detail.top_plants, source));
        output
    }

    pub fn plant(detail: &PlantDetail, source: ResponseSource) -> String {
        let mut output = format!(
            "{} #{} ({})\n",
            detail.name.bold().green(),
            detail.plant_id,
            Self::source_label(source)
        );
        output.push_str(&format!(
            "State: {} ({})\n",
            detail.state_name, detail.state_code
        ));
        if let Some(source_id) = detail.source_id {
            output.push_str(&format!("Source plant code: {}\n", source_id));
        }
        output.push('\n');

        let mut table = Self::table(&["Year", "Net MWh"]);
        for entry in &detail.history {
            table.add_row(vec![Cell::new(entry.year), Self::number(entry.net_generation)]);
        }
        output.push_str(&table.to_string());
        output.push('\n');
        output
    }

    pub fn state_list(states: &[StateInfo], source: ResponseSource) -> String {
        if states.is_empty() {
            return format!("{}\n", "No states loaded".yellow());
        }

        let mut output = Self::header("States", states.len(), source);
        let mut table = Self::table(&["Code", "Name"]);
        for state in states {
            table.add_row(vec![Cell::new(&state.code), Cell::new(&state.name)]);
        }
        output.push_str(&table.to_string());
        output.push('\n');
        output
    }

    pub fn ingestion(report: &IngestionReport) -> String {
        let mut output = format!(
            "{}\n",
            format!("✅ Loaded {} generation data", report.year).green()
        );
        output.push_str(&format!("Run: {}\n", report.run_id));
        output.push_str(&format!("Source fingerprint: {}\n", report.fingerprint));
        output.push_str(&format!(
            "Rows: {} read, {} loaded, {} skipped\n",
            report.rows_read,
            report.rows_loaded,
            report.skipped.total()
        ));
        if report.skipped.total() > 0 {
            output.push_str(&format!(
                "  invalid state: {}, missing name: {}, invalid generation: {}\n",
                report.skipped.invalid_state,
                report.skipped.missing_name,
                report.skipped.invalid_generation
            ));
        }
        output.push_str(&format!(
            "Plants: {} ({} new) in {} states\n",
            report.plants, report.commit.plants_created, report.states
        ));
        output.push_str(&format!(
            "Facts: {} written, {} replaced in {} ms\n\n",
            report.commit.facts_written,
            report.commit.facts_replaced,
            report.commit.duration.as_millis()
        ));

        let mut table = Self::table(&["State", "Net MWh"]);
        for (code, total) in &report.state_totals {
            table.add_row(vec![Cell::new(code), Self::number(*total)]);
        }
        output.push_str(&table.to_string());
        output.push_str("\n\n");
        output.push_str(&Self::reconcile(&report.reconcile));
        output
    }

    pub fn reconcile(report: &ReconcileReport) -> String {
        let mut output = format!("{}\n", "Reconciliation".bold().green());
        output.push_str(&format!(
            "Aggregate view: {} rows (generation {}, {} removed) in {} ms\n",
            report.refresh.rows,
            report.refresh.generation,
            report.refresh.rows_removed,
            report.refresh.duration.as_millis()
        ));
        output.push_str(&format!(
            "Refreshed at: {}\n",
            report.refresh.refreshed_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));

        match &report.consistency {
            Some(check) if check.is_consistent() => output.push_str(&format!(
                "Consistency: {} rows checked for {:?}\n",
                check.rows_checked, check.years_checked
            )),
            Some(check) => output.push_str(&format!(
                "{}\n",
                format!(
                    "Consistency: {} mismatched rows for {:?}",
                    check.mismatches.len(),
                    check.years_checked
                )
                .red()
            )),
            None => output.push_str(&format!("{}\n", "Consistency: check skipped".yellow())),
        }

        let invalidation = &report.invalidation;
        if invalidation.cache_degraded {
            output.push_str(&format!(
                "{}\n",
                "Cache unavailable: invalidation skipped".yellow()
            ));
        } else {
            output.push_str(&format!(
                "Invalidated: {} entries\n",
                invalidation.entries_invalidated
            ));
        }

        let warming = &report.warming;
        output.push_str(&format!(
            "Warmed: {} global, {}/{} per-state for {:?} in {} ms\n",
            warming.global_warmed,
            warming.succeeded,
            warming.attempted,
            warming.years,
            warming.duration.as_millis()
        ));
        let failures: Vec<&String> = warming
            .global_failures
            .iter()
            .chain(warming.failures.iter())
            .collect();
        if !failures.is_empty() {
            output.push_str(&format!("\n{}\n", "Warming failures:".bold().yellow()));
            for (i, failure) in failures.iter().enumerate() {
                output.push_str(&format!("  {}. {}\n", i + 1, failure.yellow()));
            }
        }
        output
    }

    pub fn cache_info(info: &CacheInfo) -> String {
        let status = if info.reachable {
            "reachable".green()
        } else {
            "unreachable".red()
        };
        let mut output = format!("{} {}\n", "Cache".bold().green(), status);
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.add_row(vec!["Backend".to_string(), info.backend.clone()]);
        table.add_row(vec!["TTL (s)".to_string(), info.ttl_secs.to_string()]);
        table.add_row(vec![
            "Keys".to_string(),
            Self::optional(info.key_count),
        ]);
        table.add_row(vec![
            "Memory (bytes)".to_string(),
            Self::optional(info.used_memory_bytes),
        ]);
        table.add_row(vec![
            "Hit rate".to_string(),
            format!("{:.1}%", info.stats.hit_rate() * 100.0),
        ]);
        table.add_row(vec![
            "Failures".to_string(),
            info.stats.failures.to_string(),
        ]);
        output.push_str(&table.to_string());
        output.push('\n');
        output
    }

    /// Pretty-print any serializable report
    pub fn json<T: Serialize>(value: &T) -> String {
        serde_json::to_string_pretty(value).unwrap_or_else(|_| {
            "{\"status\": \"error\", \"error\": \"Could not serialize results to JSON\"}".to_string()
        })
    }

    fn header(title: &str, rows: usize, source: ResponseSource) -> String {
        let mut output = format!("{}\n", title.bold().green());
        output.push_str(&format!("Served from: {}\n", Self::source_label(source)));
        output.push_str(&format!("Rows returned: {}\n\n", rows));
        output
    }

    fn table(columns: &[&str]) -> Table {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(
            columns
                .iter()
                .map(|col| Cell::new(col).fg(Color::Green))
                .collect::<Vec<_>>(),
        );
        table
    }

    fn source_label(source: ResponseSource) -> ColoredString {
        match source {
            ResponseSource::Cache => "cache".cyan(),
            ResponseSource::Computed => "computed".normal(),
        }
    }

    fn number(value: f64) -> Cell {
        Cell::new(Self::format_mwh(value)).set_alignment(CellAlignment::Right)
    }

    fn percent(value: f64) -> Cell {
        Cell::new(format!("{:.2}", value)).set_alignment(CellAlignment::Right)
    }

    fn optional(value: Option<u64>) -> String {
        value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
    }

    /// Whole MWh with thousands separators
    fn format_mwh(value: f64) -> String {
        let rounded = format!("{:.0}", value.abs());
        let mut grouped = String::with_capacity(rounded.len() + rounded.len() / 3);
        for (i, digit) in rounded.chars().enumerate() {
            if i > 0 && (rounded.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(digit);
        }
        if value < 0.0 && rounded != "0" {
            format!("-{}", grouped)
        } else {
            grouped
        }
    }
}
