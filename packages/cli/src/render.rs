//! Plain-text rendering of a [`LookupReport`].

use std::io::{self, Write};

use chrono::Datelike as _;
use property_snapshot_database_models::{EvictionCase, PropertyRecord};
use property_snapshot_lookup::{LookupOutcome, LookupReport};

/// Writes `report` to `out` as a sequence of sections.
///
/// # Errors
///
/// Returns an error if writing to `out` fails.
pub fn render(report: &LookupReport, out: &mut impl Write) -> io::Result<()> {
    if report.outcome == LookupOutcome::EmptyAddress {
        return render_empty_address(out);
    }

    heading(out, "Results")?;

    if let Some(geocode) = &report.geocode {
        writeln!(
            out,
            "Accuracy of geocode result: {}. Coordinates: {}, {}",
            geocode.accuracy,
            coordinate(geocode.latitude),
            coordinate(geocode.longitude),
        )?;
        if let Some(formatted) = &geocode.formatted_address {
            writeln!(out, "Matched address: {formatted}")?;
        }
    }

    match report.outcome {
        LookupOutcome::EmptyAddress | LookupOutcome::NotGeocoded => return Ok(()),
        LookupOutcome::NoParcel => {
            writeln!(out, "No TCAD parcel found at these coordinates.")?;
            return Ok(());
        }
        LookupOutcome::Found => {}
    }

    let ids = report.property_ids();
    if report.is_ambiguous() {
        writeln!(out, "Found more than one property: {}", id_list(&ids))?;
        writeln!(out, "Found TCAD parcel with property id: {}", id_list(&ids))?;
    } else {
        writeln!(out, "Found TCAD parcel with property id: {}", ids.join(""))?;
    }

    heading(out, "Property Info")?;
    for property in &report.properties {
        if property.records.is_empty() {
            writeln!(out, "No property data for {}", property.property_id)?;
        }
        for record in &property.records {
            write_record(out, record)?;
        }

        if !property.related.is_empty() {
            writeln!(
                out,
                "Other properties with the same owner address as {}:",
                property.property_id
            )?;
            for related in &property.related {
                writeln!(
                    out,
                    "  {}  {}",
                    related.property_id,
                    related.parcel_address.as_deref().unwrap_or("(no address)")
                )?;
            }
        }
    }

    heading(out, "Evictions")?;
    if report.evictions.is_empty() {
        writeln!(
            out,
            "We do not have records (since {}) of evictions at this property",
            report.range.start.year()
        )?;
    } else {
        writeln!(
            out,
            "There have been {} evictions at this property",
            report.evictions.len()
        )?;
        writeln!(out, "Here are the case numbers for those evictions")?;
        write_cases(out, &report.evictions)?;
    }

    if !report.related_evictions.is_empty() {
        writeln!(
            out,
            "There have been {} evictions at properties with the same owner address",
            report.related_evictions.len()
        )?;
        write_cases(out, &report.related_evictions)?;
    }

    Ok(())
}

/// Writes the prompt shown when no address was entered.
///
/// # Errors
///
/// Returns an error if writing to `out` fails.
pub fn render_empty_address(out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "Enter an address to search.")
}

fn heading(out: &mut impl Write, title: &str) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "{title}")?;
    writeln!(out, "{}", "-".repeat(title.len()))
}

fn coordinate(value: Option<f64>) -> String {
    value.map_or_else(|| "none".to_string(), |v| v.to_string())
}

fn id_list(ids: &[&str]) -> String {
    format!("[{}]", ids.join(", "))
}

fn write_record(out: &mut impl Write, record: &PropertyRecord) -> io::Result<()> {
    let fields = [
        ("Property id", Some(record.property_id.as_str())),
        ("Parcel id", record.parcel_id.as_deref()),
        ("Address", record.parcel_address.as_deref()),
        ("Owner", record.owner_name.as_deref()),
        ("Owner address", record.owner_address.as_deref()),
        ("DBA", record.dba_name.as_deref()),
        ("CARES Act", record.cares_act.as_deref()),
        ("CARES Act id", record.cares_act_id.as_deref()),
        ("NHPD", record.nhpd.as_deref()),
        ("NHPD id", record.nhpd_id.as_deref()),
        ("Housing choice vouchers", record.housing_choice_vouchers.as_deref()),
    ];

    for (label, value) in fields {
        if let Some(value) = value {
            writeln!(out, "{label:<24} {value}")?;
        }
    }
    writeln!(out)
}

fn write_cases(out: &mut impl Write, cases: &[EvictionCase]) -> io::Result<()> {
    for case in cases {
        writeln!(
            out,
            "  {}  filed {}  (property {})",
            case.case_number,
            case.date_filed.format("%m/%d/%Y"),
            case.property_id
        )?;
    }
    Ok(())
}
