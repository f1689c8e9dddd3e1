//! Overpass QL query construction.

use crate::models::{GeoArea, MatchMode, SearchSpec, TypeFilter};

const ELEMENT_KINDS: [&str; 3] = ["node", "way", "relation"];

/// Query for places whose name matches the search term.
pub fn build(spec: &SearchSpec, area: &GeoArea) -> String {
    let name_clause = match spec.mode() {
        MatchMode::Exact => format!(r#"["name"="{}"]"#, escape_literal(spec.term())),
        MatchMode::Partial => format!(
            r#"["name"~"{}",i]"#,
            escape_literal(&regex::escape(spec.term()))
        ),
    };
    render(&name_clause, spec, area)
}

/// Query for every named place in the area, ignoring the search term.
pub fn build_broad(spec: &SearchSpec, area: &GeoArea) -> String {
    render(r#"["name"]"#, spec, area)
}

/// Assemble the union of element clauses.
///
/// Type filters are alternatives: each filter produces its own set of
/// node/way/relation clauses inside the union.
fn render(name_clause: &str, spec: &SearchSpec, area: &GeoArea) -> String {
    let bbox = format!(
        "({},{},{},{})",
        area.south(),
        area.west(),
        area.north(),
        area.east()
    );

    let type_clauses: Vec<String> = if spec.filters().is_empty() {
        vec![String::new()]
    } else {
        spec.filters().iter().map(filter_clause).collect()
    };

    let mut statements = Vec::with_capacity(type_clauses.len() * ELEMENT_KINDS.len());
    for type_clause in &type_clauses {
        for kind in ELEMENT_KINDS {
            statements.push(format!("  {}{}{}{};", kind, name_clause, type_clause, bbox));
        }
    }

    format!(
        "[out:json][timeout:{}];\n(\n{}\n);\nout center meta;\n",
        spec.timeout().as_secs().max(1),
        statements.join("\n")
    )
}

fn filter_clause(filter: &TypeFilter) -> String {
    match &filter.value {
        Some(value) => format!(
            r#"["{}"="{}"]"#,
            escape_literal(&filter.key),
            escape_literal(value)
        ),
        None => format!(r#"["{}"]"#, escape_literal(&filter.key)),
    }
}

/// Escape text for a double-quoted Overpass string literal.
fn escape_literal(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '\\' => out.push_str(r"\\"),
            '"' => out.push_str(r#"\""#),
            '\'' => out.push_str(r"\'"),
            '\n' => out.push_str(r"\n"),
            '\t' => out.push_str(r"\t"),
            '\r' => {}
            c => out.push(c),
        }
    }
    out
}
