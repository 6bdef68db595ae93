//! CSV reading and writing for sample point tables

use crate::error::{Error, Result};
use crate::points::{PointSchema, PointTable, SamplePoint};
use std::fs::File;
use std::path::Path;

/// Name of the derived column written by [`write_points_csv`]
pub const PROTECTED_COLUMN: &str = "protected";

/// Read a CSV of sample points.
///
/// Only `taxon_column`, `lon_column` and `lat_column` of `schema` are used;
/// every other header becomes an extra column. Coordinates must be present,
/// numeric and within geographic range, otherwise the whole load fails.
pub fn read_points<P: AsRef<Path>>(path: P, schema: &PointSchema) -> Result<PointTable> {
    let file = File::open(path.as_ref())?;
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(file);

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let find = |name: &str| -> Result<usize> {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| Error::MissingColumn(name.to_string()))
    };
    let taxon_idx = find(&schema.taxon_column)?;
    let lon_idx = find(&schema.lon_column)?;
    let lat_idx = find(&schema.lat_column)?;

    let extra_idx: Vec<usize> = (0..headers.len())
        .filter(|i| ![taxon_idx, lon_idx, lat_idx].contains(i))
        .collect();

    let mut points = Vec::new();
    for result in reader.records() {
        let record = result?;
        let line = record.position().map_or(0, |p| p.line());

        let lon = parse_coordinate(&record, lon_idx, &schema.lon_column, line, 180.0)?;
        let lat = parse_coordinate(&record, lat_idx, &schema.lat_column, line, 90.0)?;
        let taxon = record.get(taxon_idx).unwrap_or("").to_string();

        let attributes = extra_idx
            .iter()
            .map(|&i| record.get(i).unwrap_or("").to_string())
            .collect();

        points.push(SamplePoint {
            taxon,
            lon,
            lat,
            attributes,
        });
    }

    let schema = PointSchema {
        taxon_column: schema.taxon_column.clone(),
        lon_column: schema.lon_column.clone(),
        lat_column: schema.lat_column.clone(),
        extra_columns: extra_idx.iter().map(|&i| headers[i].clone()).collect(),
    };

    Ok(PointTable::new(schema, points))
}

fn parse_coordinate(
    record: &csv::StringRecord,
    idx: usize,
    column: &str,
    line: u64,
    limit: f64,
) -> Result<f64> {
    let malformed = |reason: String| Error::MalformedRow {
        line,
        column: column.to_string(),
        reason,
    };

    let raw = record.get(idx).unwrap_or("");
    if raw.is_empty() || raw.eq_ignore_ascii_case("NA") {
        return Err(malformed("missing coordinate".into()));
    }
    let value: f64 = raw
        .parse()
        .map_err(|_| malformed(format!("'{}' is not a number", raw)))?;
    if !value.is_finite() || value.abs() > limit {
        return Err(malformed(format!("{} is outside [-{}, {}]", value, limit, limit)));
    }
    Ok(value)
}

/// Write a point table as CSV.
///
/// Column order is taxon, lon, lat, the extra columns, then `protected` when the
/// table has been joined. No-data protected values are written as empty cells.
/// A joined table drops any extra column already named `protected`, so a
/// labelled file can be labelled again.
pub fn write_points_csv<P: AsRef<Path>>(table: &PointTable, path: P) -> Result<()> {
    let mut writer = csv::Writer::from_path(path.as_ref())?;
    let schema = table.schema();

    let kept: Vec<usize> = (0..schema.extra_columns.len())
        .filter(|&i| table.protected().is_none() || schema.extra_columns[i] != PROTECTED_COLUMN)
        .collect();

    let mut header: Vec<&str> = vec![
        schema.taxon_column.as_str(),
        schema.lon_column.as_str(),
        schema.lat_column.as_str(),
    ];
    header.extend(kept.iter().map(|&i| schema.extra_columns[i].as_str()));
    if table.protected().is_some() {
        header.push(PROTECTED_COLUMN);
    }
    writer.write_record(&header)?;

    for (i, p) in table.iter().enumerate() {
        let mut row: Vec<String> = vec![p.taxon.clone(), p.lon.to_string(), p.lat.to_string()];
        row.extend(kept.iter().map(|&i| p.attributes.get(i).cloned().unwrap_or_default()));
        if let Some(col) = table.protected() {
            row.push(col.values()[i].map(|v| v.to_string()).unwrap_or_default());
        }
        writer.write_record(&row)?;
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::points::ProtectedColumn;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn csv_file(contents: &str) -> NamedTempFile {
        let mut tmp = NamedTempFile::with_suffix(".csv").unwrap();
        tmp.write_all(contents.as_bytes()).unwrap();
        tmp.flush().unwrap();
        tmp
    }

    #[test]
    fn test_read_points_with_extra_columns() {
        let tmp = csv_file(
            "species,observed_on,longitude,latitude,source\n\
             Gopherus morafkai,2019-04-02,-112.0,31.0,iNaturalist\n\
             Anaxyrus punctatus,2019-05-11,-111.25,32.5,GBIF\n",
        );
        let table = read_points(tmp.path(), &PointSchema::default()).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.schema().extra_columns, vec!["observed_on", "source"]);
        let p = &table.points()[1];
        assert_eq!(p.taxon, "Anaxyrus punctatus");
        assert_eq!((p.lon, p.lat), (-111.25, 32.5));
        assert_eq!(p.attributes, vec!["2019-05-11", "GBIF"]);
    }

    #[test]
    fn test_missing_column() {
        let tmp = csv_file("species,lon,lat\nA,1,2\n");
        let err = read_points(tmp.path(), &PointSchema::default()).unwrap_err();
        assert!(matches!(err, Error::MissingColumn(c) if c == "longitude"));
    }

    #[test]
    fn test_missing_coordinate_is_malformed() {
        let tmp = csv_file("species,longitude,latitude\nA,-112.0,31.0\nB,,31.5\n");
        let err = read_points(tmp.path(), &PointSchema::default()).unwrap_err();
        match err {
            Error::MalformedRow { line, column, .. } => {
                assert_eq!(line, 3);
                assert_eq!(column, "longitude");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_out_of_range_latitude_is_malformed() {
        let tmp = csv_file("species,longitude,latitude\nA,-112.0,131.0\n");
        assert!(matches!(
            read_points(tmp.path(), &PointSchema::default()),
            Err(Error::MalformedRow { .. })
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        assert!(matches!(
            read_points("/nonexistent/points.csv", &PointSchema::default()),
            Err(Error::Io(_))
        ));
    }

    #[test]
    fn test_write_roundtrip_with_protected() {
        let src = csv_file("species,longitude,latitude,source\nA,-112,31,x\nB,-111,32,y\n");
        let table = read_points(src.path(), &PointSchema::default())
            .unwrap()
            .with_protected(ProtectedColumn(vec![Some(1.0), None]))
            .unwrap();

        let out = NamedTempFile::with_suffix(".csv").unwrap();
        write_points_csv(&table, out.path()).unwrap();
        let text = std::fs::read_to_string(out.path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "species,longitude,latitude,source,protected");
        assert_eq!(lines[1], "A,-112,31,x,1");
        assert_eq!(lines[2], "B,-111,32,y,");

        let reread = read_points(out.path(), &PointSchema::default()).unwrap();
        assert_eq!(reread.len(), 2);
        assert_eq!(reread.schema().extra_columns, vec!["source", "protected"]);
        assert_eq!(reread.points()[0].attributes, vec!["x", "1"]);
    }

    #[test]
    fn test_relabelling_replaces_protected_column() {
        let src = csv_file("species,longitude,latitude,protected,source\nA,-112,31,1,x\n");
        let table = read_points(src.path(), &PointSchema::default())
            .unwrap()
            .with_protected(ProtectedColumn(vec![Some(0.0)]))
            .unwrap();

        let out = NamedTempFile::with_suffix(".csv").unwrap();
        write_points_csv(&table, out.path()).unwrap();
        let text = std::fs::read_to_string(out.path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "species,longitude,latitude,source,protected");
        assert_eq!(lines[1], "A,-112,31,x,0");
    }
}
