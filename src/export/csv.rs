//! CSV tables, one per populated source

use std::fs::File;
use std::io::Write;
use std::path::Path;

use chrono::NaiveDate;
use serde::Serialize;

use super::ExportError;
use crate::cache::FetchResult;
use crate::data::SourceId;
use crate::pipeline::Snapshot;

#[derive(Serialize)]
struct ViewsRow {
    date: NaiveDate,
    views: u64,
}

/// Sources for which a CSV is offered: those that returned data
pub fn csv_sources(snapshot: &Snapshot) -> Vec<SourceId> {
    snapshot.populated()
}

fn write_rows<W: Write, R: Serialize>(
    writer: W,
    rows: impl IntoIterator<Item = R>,
) -> Result<usize, ExportError> {
    let mut wtr = ::csv::WriterBuilder::new()
        .has_headers(true)
        .from_writer(writer);
    let mut count = 0;
    for row in rows {
        wtr.serialize(row)?;
        count += 1;
    }
    wtr.flush()?;
    Ok(count)
}

/// Writes the table for `source` to `writer` and returns the data row count
///
/// Returns `Ok(None)` when the source has no data to export.
pub fn write_table<W: Write>(
    writer: W,
    snapshot: &Snapshot,
    source: SourceId,
) -> Result<Option<usize>, ExportError> {
    let rows = match source {
        SourceId::SearchInterest => match &snapshot.trends {
            FetchResult::Data(series) => Some(write_rows(writer, series.points.iter())?),
            _ => None,
        },
        SourceId::News => match &snapshot.news {
            FetchResult::Data(headlines) => Some(write_rows(writer, headlines.iter())?),
            _ => None,
        },
        SourceId::Pageviews => match &snapshot.pageviews {
            FetchResult::Data(views) => Some(write_rows(
                writer,
                views.series.points.iter().map(|p| ViewsRow {
                    date: p.date,
                    views: p.value,
                }),
            )?),
            _ => None,
        },
        SourceId::Social => match &snapshot.social {
            FetchResult::Data(posts) => Some(write_rows(writer, posts.iter())?),
            _ => None,
        },
    };
    Ok(rows)
}

/// Renders the table for `source` into memory
pub fn to_bytes(snapshot: &Snapshot, source: SourceId) -> Result<Option<Vec<u8>>, ExportError> {
    let mut buf = Vec::new();
    Ok(write_table(&mut buf, snapshot, source)?.map(|_| buf))
}

/// Writes the table for `source` to `path`; returns the data row count
pub(super) fn write_source(
    path: &Path,
    snapshot: &Snapshot,
    source: SourceId,
) -> Result<usize, ExportError> {
    let file = File::create(path)?;
    Ok(write_table(file, snapshot, source)?.unwrap_or(0))
}
