//! Console, JSON and CSV renderings of an investigation.

use std::io::Write;

use anyhow::Result;
use chrono::NaiveDateTime;
use clap::ValueEnum;
use serde::Serialize;

use place_detective::analysis::SimilarName;
use place_detective::models::{OsmType, Place};
use place_detective::{AnalysisReport, Investigation};

const CSV_HEADER: [&str; 13] = [
    "name",
    "type",
    "id",
    "lat",
    "lon",
    "category",
    "subcategory",
    "address",
    "phone",
    "website",
    "opening_hours",
    "brand",
    "cuisine",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable blocks on stdout
    Table,
    Json,
    Csv,
}

impl OutputFormat {
    /// File extension for formats written to disk.
    pub fn extension(&self) -> Option<&'static str> {
        match self {
            OutputFormat::Table => None,
            OutputFormat::Json => Some("json"),
            OutputFormat::Csv => Some("csv"),
        }
    }
}

/// Flattened CSV row for a place
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    osm_type: OsmType,
    id: i64,
    lat: Option<f64>,
    lon: Option<f64>,
    category: &'a str,
    subcategory: &'a str,
    address: String,
    phone: &'a str,
    website: &'a str,
    opening_hours: &'a str,
    brand: &'a str,
    cuisine: &'a str,
}

impl<'a> From<&'a Place> for CsvRow<'a> {
    fn from(place: &'a Place) -> Self {
        let text = |field: &'a Option<String>| field.as_deref().unwrap_or("");
        Self {
            name: text(&place.name),
            osm_type: place.id.osm_type,
            id: place.id.osm_id,
            lat: place.location.map(|p| p.lat),
            lon: place.location.map(|p| p.lon),
            category: text(&place.category),
            subcategory: text(&place.subcategory),
            address: place
                .address
                .as_ref()
                .map(|a| a.formatted())
                .unwrap_or_default(),
            phone: text(&place.phone),
            website: text(&place.website),
            opening_hours: text(&place.opening_hours),
            brand: text(&place.brand),
            cuisine: text(&place.cuisine),
        }
    }
}

pub fn write_csv<W: Write>(places: &[Place], out: W) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(out);
    writer.write_record(CSV_HEADER)?;
    for place in places {
        writer.serialize(CsvRow::from(place))?;
    }
    writer.flush()?;
    Ok(())
}

/// Pretty-printed array of places, raw tags included.
pub fn write_json<W: Write>(places: &[Place], mut out: W) -> Result<()> {
    serde_json::to_writer_pretty(&mut out, places)?;
    writeln!(out)?;
    Ok(())
}

/// `place_detective_<term>_<region>_<YYYYmmdd_HHMMSS>.<ext>`
pub fn default_filename(term: &str, region: &str, extension: &str, now: NaiveDateTime) -> String {
    format!(
        "place_detective_{}_{}_{}.{}",
        sanitize(term),
        sanitize(region),
        now.format("%Y%m%d_%H%M%S"),
        extension
    )
}

fn sanitize(text: &str) -> String {
    text.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn osm_url(place: &Place) -> String {
    format!("https://www.openstreetmap.org/{}", place.source_id())
}

/// One block describing a place. `label` is its position in the listing.
pub fn write_place<W: Write>(out: &mut W, label: &str, place: &Place) -> Result<()> {
    writeln!(out, "[{}] {}", label, place.name().unwrap_or("(unnamed)"))?;
    match (&place.category, &place.subcategory) {
        (Some(category), Some(subcategory)) => writeln!(
            out,
            "    Type: {} | Category: {}/{}",
            place.id.osm_type, category, subcategory
        )?,
        _ => writeln!(out, "    Type: {}", place.id.osm_type)?,
    }
    writeln!(out, "    OSM ID: {}", place.id.osm_id)?;
    if let Some(location) = place.location {
        writeln!(out, "    Location: {}, {}", location.lat, location.lon)?;
    }
    if let Some(address) = place
        .address
        .as_ref()
        .map(|a| a.formatted())
        .filter(|a| !a.is_empty())
    {
        writeln!(out, "    Address: {}", address)?;
    }

    let optional = [
        ("Phone", &place.phone),
        ("Website", &place.website),
        ("Hours", &place.opening_hours),
        ("Brand", &place.brand),
        ("Cuisine", &place.cuisine),
    ];
    for (label, value) in optional {
        if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
            writeln!(out, "    {}: {}", label, value)?;
        }
    }
    writeln!(out, "    Map: {}", osm_url(place))?;
    Ok(())
}

pub fn write_table<W: Write>(places: &[Place], mut out: W) -> Result<()> {
    for (i, place) in places.iter().enumerate() {
        if i > 0 {
            writeln!(out)?;
        }
        write_place(&mut out, &(i + 1).to_string(), place)?;
    }
    Ok(())
}

/// Analysis findings, with every place in each group listed.
pub fn write_analysis<W: Write>(
    report: &AnalysisReport,
    places: &[Place],
    mut out: W,
) -> Result<()> {
    writeln!(out, "Total places found: {}", report.total_places)?;
    writeln!(out, "Unique names: {}", report.unique_names)?;

    if report.multiple_locations.is_empty() {
        writeln!(out, "Each place name found at a single location")?;
    }
    for (name, indices) in &report.multiple_locations {
        writeln!(out)?;
        writeln!(out, "'{}' found at {} locations:", name, indices.len())?;
        for (i, place) in AnalysisReport::resolve(places, indices).enumerate() {
            write_place(&mut out, &(i + 1).to_string(), place)?;
        }
    }

    if report.name_variations.is_empty() {
        writeln!(out, "No similar name variations found")?;
    }
    for variation in &report.name_variations {
        writeln!(out)?;
        writeln!(
            out,
            "'{}' vs '{}' (similarity: {}%)",
            variation.name_a, variation.name_b, variation.similarity
        )?;
        for (i, place) in AnalysisReport::resolve(places, &variation.places_a).enumerate() {
            write_place(&mut out, &format!("A{}", i + 1), place)?;
        }
        for (i, place) in AnalysisReport::resolve(places, &variation.places_b).enumerate() {
            write_place(&mut out, &format!("B{}", i + 1), place)?;
        }
    }
    Ok(())
}

/// Similar names from a broad search, each shown with its first place.
pub fn write_similar<W: Write>(
    similar: &[SimilarName],
    places: &[Place],
    mut out: W,
) -> Result<()> {
    let matches = similar.iter().filter_map(|found| {
        places
            .iter()
            .find(|p| p.name() == Some(found.name.as_str()))
            .map(|place| (found.score, place))
    });
    for (i, (score, place)) in matches.enumerate() {
        if i > 0 {
            writeln!(out)?;
        }
        write_place(&mut out, &format!("{} ({}% similar)", i + 1, score), place)?;
    }
    Ok(())
}

/// Closing summary lines.
pub fn write_summary<W: Write>(
    term: &str,
    investigation: &Investigation,
    report: &AnalysisReport,
    mut out: W,
) -> Result<()> {
    for (name, indices) in &report.multiple_locations {
        writeln!(out, "  * '{}' found at {} locations", name, indices.len())?;
    }
    for variation in &report.name_variations {
        writeln!(
            out,
            "  * '{}' vs '{}' ({}% similar)",
            variation.name_a, variation.name_b, variation.similarity
        )?;
    }
    if !report.has_findings() {
        if report.total_places > 0 {
            writeln!(
                out,
                "Found {} place(s) matching '{}', each with a unique name",
                report.total_places, term
            )?;
        } else {
            writeln!(out, "No places found matching '{}'", term)?;
        }
    }
    if !investigation.is_complete() {
        writeln!(
            out,
            "{} of {} tiles failed; results may be incomplete",
            investigation.failed_count(),
            investigation.tiles_total
        )?;
    }
    Ok(())
}
