//! Text rendering of command results.

use crate::sync::SyncReport;
use crate::tree::{flatten, Collection, CollectionSummary};
use crate::workflows::{CollectionReport, GeneratedCollection, PersistPath, TestScriptOutcome};
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use owo_colors::OwoColorize;

/// Section heading in bold and underlined
pub fn format_section_heading(title: &str) -> String {
    format!("{}", title.bold().underline())
}

fn table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(header);
    table
}

pub fn format_collections_text(collections: &[CollectionSummary]) -> String {
    if collections.is_empty() {
        return "No collections found.".to_string();
    }
    let mut out = format!("{}\n\n", format_section_heading("Collections"));
    let mut rows = table(vec!["Name", "ID", "UID"]);
    for collection in collections {
        rows.add_row(vec![
            collection.name.clone(),
            collection.id.clone(),
            collection.uid.clone().unwrap_or_else(|| "-".to_string()),
        ]);
    }
    out.push_str(&format!("{}\n\nTotal: {} collection(s)", rows, collections.len()));
    out
}

/// Collection name plus one row per request endpoint
pub fn format_collection_text(collection: &Collection) -> String {
    let endpoints = flatten(&collection.item);
    let mut out = format!("{}\n\n", format_section_heading(&collection.info.name));
    if let Some(id) = &collection.info.id {
        out.push_str(&format!("  ID: {}\n", id));
    }
    out.push_str(&format!("  Requests: {}\n\n", endpoints.len()));
    if endpoints.is_empty() {
        return out;
    }

    let mut rows = table(vec!["Path", "Method", "URL", "Auth", "Headers"]);
    for endpoint in &endpoints {
        rows.add_row(vec![
            endpoint.path.clone(),
            endpoint.method.clone(),
            endpoint.url.clone(),
            endpoint.auth.clone(),
            endpoint.headers.clone(),
        ]);
    }
    out.push_str(&rows.to_string());
    out
}

fn format_sync_report_text(report: &SyncReport) -> String {
    let mut out = format!(
        "  Folders created: {}\n  Requests created: {}\n",
        report.folders_created, report.requests_created
    );
    if !report.skipped.is_empty() {
        out.push_str(&format!(
            "  Skipped (no URL): {}\n",
            report.skipped.join(", ")
        ));
    }
    out
}

pub fn format_generated_text(generated: &GeneratedCollection) -> String {
    let mut out = format!(
        "{}\n\n",
        format_section_heading("Generated example collection")
    );
    out.push_str(&format!("  Name: {}\n", generated.name));
    out.push_str(&format!("  ID: {}\n", generated.collection_id));
    out.push_str(&format_sync_report_text(&generated.report));
    out.push_str(&format!("\n{}", generated.link));
    out
}

pub fn format_test_script_text(outcome: &TestScriptOutcome) -> String {
    let via = match outcome.persisted_via {
        PersistPath::RequestUpdate => "request update",
        PersistPath::CollectionReplace => "collection replace",
    };
    format!(
        "{}\n\n  Request: {} ({})\n  Saved via: {}\n\n{}",
        format_section_heading("Added AI test script"),
        outcome.request_name,
        outcome.request_id,
        via,
        outcome.script
    )
}

pub fn format_report_text(title: &str, report: &CollectionReport) -> String {
    format!(
        "{}\n\n  Endpoints: {}\n\n{}",
        format_section_heading(&format!("{}: {}", title, report.collection_name)),
        report.endpoint_count,
        report.content.trim_end()
    )
}
