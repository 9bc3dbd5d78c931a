//! Extraction of datapoints and field metadata from observation archives.
//!
//! An archive holds semicolon separated Windows-1252 text files:
//!
//! * `Metadaten_Parameter_*.txt` describes every measured field,
//! * `Metadaten_Fehlwerte_*.txt` lists gaps without emitting rows for them,
//! * `produkt_*.txt` holds the observations themselves.
//!
//! Every other entry is ignored.

use crate::archive::encoding::decode_windows_1252;
use crate::archive::error::ArchiveError;
use crate::types::datapoint::{Datapoint, DatapointValue, FieldMetadata};
use crate::types::date_range::DateTimeRange;
use crate::types::quality_flag::QualityFlag;
use crate::types::timestamp::{localize, parse_timestamp, TimestampError};
use chrono::{DateTime, FixedOffset, NaiveDateTime};
use csv::StringRecord;
use log::debug;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::{Path, PathBuf};
use zip::ZipArchive;

const PARAMETERS_PREFIX: &str = "Metadaten_Parameter_";
const MISSING_VALUES_PREFIX: &str = "Metadaten_Fehlwerte_";
const DATA_PREFIX: &str = "produkt_";
const TEXT_SUFFIX: &str = ".txt";

const META_PARAMETER: &str = "Parameter";
const META_DESCRIPTION: &str = "Parameterbeschreibung";
const META_UNIT: &str = "Einheit";
const META_FROM: &str = "Von_Datum";
const META_UNTIL: &str = "Bis_Datum";

const DATA_STATION_ID: &str = "STATIONS_ID";
const DATA_DATE: &str = "MESS_DATUM";
const DATA_QUALITY_PREFIX: &str = "QN";
const DATA_END_OF_ROW: &str = "eor";

const GAP_STATION_ID: &str = "Stations_ID";
const GAP_FROM: &str = "Von_Datum";
const GAP_UNTIL: &str = "Bis_Datum";
const GAP_COUNT: &str = "Anzahl_Fehlwerte";
const GAP_PARAMETER: &str = "Parameter";
const GAP_DATE_FORMAT: &str = "%d.%m.%Y-%H:%M";

/// Everything read from one archive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedArchive {
    /// Observed datapoints followed by the placeholders synthesized for gaps.
    pub datapoints: Vec<Datapoint>,
    pub metadata: Vec<FieldMetadata>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryKind {
    Parameters,
    MissingValues,
    Data,
}

impl EntryKind {
    fn classify(entry_name: &str) -> Option<Self> {
        let file_name = entry_name.rsplit('/').next().unwrap_or(entry_name);
        if !file_name.ends_with(TEXT_SUFFIX) {
            return None;
        }
        if file_name.starts_with(PARAMETERS_PREFIX) {
            Some(EntryKind::Parameters)
        } else if file_name.starts_with(MISSING_VALUES_PREFIX) {
            Some(EntryKind::MissingValues)
        } else if file_name.starts_with(DATA_PREFIX) {
            Some(EntryKind::Data)
        } else {
            None
        }
    }
}

/// Parses the archive at `path`, keeping observations inside `range`.
pub fn parse_archive(path: &Path, range: &DateTimeRange) -> Result<ParsedArchive, ArchiveError> {
    let file = File::open(path).map_err(|e| ArchiveError::Open(path.to_path_buf(), e))?;
    parse_reader(BufReader::new(file), range)
}

/// Runs [`parse_archive`] on the blocking thread pool.
pub async fn parse_archive_blocking(
    path: PathBuf,
    range: DateTimeRange,
) -> Result<ParsedArchive, ArchiveError> {
    tokio::task::spawn_blocking(move || parse_archive(&path, &range)).await?
}

pub fn parse_reader<R: Read + Seek>(
    reader: R,
    range: &DateTimeRange,
) -> Result<ParsedArchive, ArchiveError> {
    let mut archive = ZipArchive::new(reader)?;
    let mut metadata = Vec::new();
    let mut observed = Vec::new();
    let mut gaps = Vec::new();

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        let name = entry.name().to_string();
        let Some(kind) = EntryKind::classify(&name) else {
            continue;
        };

        let mut bytes = Vec::new();
        entry
            .read_to_end(&mut bytes)
            .map_err(|source| ArchiveError::EntryRead {
                entry: name.clone(),
                source,
            })?;
        let rows = read_rows(&name, &bytes)?;

        match kind {
            EntryKind::Parameters => metadata.extend(parse_metadata(&name, &rows)?),
            EntryKind::MissingValues => gaps.extend(synthesize_gaps(&name, &rows, range)?),
            EntryKind::Data => observed.extend(parse_observations(&name, &rows, range)?),
        }
        debug!("Parsed archive entry {} ({} rows)", name, rows.len());
    }

    if !metadata.is_empty() {
        let units: HashMap<&str, &str> = metadata
            .iter()
            .map(|m: &FieldMetadata| (m.name.as_str(), m.unit.as_str()))
            .collect();
        for datapoint in &mut observed {
            datapoint.unit = units.get(datapoint.label.as_str()).map(|u| u.to_string());
        }
    }

    observed.extend(gaps);
    Ok(ParsedArchive {
        datapoints: observed,
        metadata,
    })
}

fn read_rows(entry: &str, bytes: &[u8]) -> Result<Vec<StringRecord>, ArchiveError> {
    let text = decode_windows_1252(bytes);
    csv::ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes())
        .records()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| ArchiveError::Csv {
            entry: entry.to_string(),
            source,
        })
}

fn column(entry: &str, header: &StringRecord, name: &'static str) -> Result<usize, ArchiveError> {
    header
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| ArchiveError::MissingColumn {
            entry: entry.to_string(),
            column: name,
        })
}

fn timestamp(entry: &str, row: usize, raw: &str) -> Result<DateTime<FixedOffset>, ArchiveError> {
    parse_timestamp(raw).map_err(|source| ArchiveError::Timestamp {
        entry: entry.to_string(),
        row,
        source,
    })
}

fn parse_metadata(entry: &str, rows: &[StringRecord]) -> Result<Vec<FieldMetadata>, ArchiveError> {
    let Some(header) = rows.first() else {
        return Ok(Vec::new());
    };
    let name = column(entry, header, META_PARAMETER)?;
    let description = column(entry, header, META_DESCRIPTION)?;
    let unit = column(entry, header, META_UNIT)?;
    let from = column(entry, header, META_FROM)?;
    let until = column(entry, header, META_UNTIL)?;

    let mut metadata = Vec::new();
    // Trailer lines ("Legende", "generiert") never have the header's width.
    for (row, record) in rows.iter().enumerate().skip(1) {
        if record.len() != header.len() {
            continue;
        }
        metadata.push(FieldMetadata {
            name: record[name].to_string(),
            description: record[description].to_string(),
            unit: record[unit].to_string(),
            valid_from: timestamp(entry, row, &record[from])?,
            valid_until: timestamp(entry, row, &record[until])?,
        });
    }
    Ok(metadata)
}

/// A value column and the quality column that applies to it.
struct ValueColumn<'a> {
    index: usize,
    label: &'a str,
    quality: Option<usize>,
}

/// Each quality column covers the value columns following it. Value columns
/// before the first quality column fall under that first one.
fn value_columns(header: &StringRecord) -> Vec<ValueColumn<'_>> {
    let is_quality = |h: &str| h.starts_with(DATA_QUALITY_PREFIX);
    let mut quality = header.iter().position(is_quality);
    let mut columns = Vec::new();
    for (index, label) in header.iter().enumerate() {
        if label == DATA_STATION_ID || label == DATA_DATE || label == DATA_END_OF_ROW {
            continue;
        }
        if is_quality(label) {
            quality = Some(index);
            continue;
        }
        columns.push(ValueColumn {
            index,
            label,
            quality,
        });
    }
    columns
}

fn parse_observations(
    entry: &str,
    rows: &[StringRecord],
    range: &DateTimeRange,
) -> Result<Vec<Datapoint>, ArchiveError> {
    let Some(header) = rows.first() else {
        return Ok(Vec::new());
    };
    let date = column(entry, header, DATA_DATE)?;
    let columns = value_columns(header);
    // Trailing columns past the last one read are tolerated.
    let required = columns
        .iter()
        .flat_map(|c| [Some(c.index), c.quality])
        .flatten()
        .chain([date])
        .max()
        .map_or(0, |last| last + 1);

    let mut datapoints = Vec::new();
    for (row, record) in rows.iter().enumerate().skip(1) {
        if record.len() < required {
            return Err(ArchiveError::ShortRow {
                entry: entry.to_string(),
                row,
                found: record.len(),
                required,
            });
        }
        let observed_at = timestamp(entry, row, &record[date])?;
        if !range.contains(&observed_at) {
            continue;
        }
        for column in &columns {
            datapoints.push(Datapoint {
                label: column.label.to_string(),
                timestamp: observed_at,
                value: Some(DatapointValue::from_raw(&record[column.index])),
                unit: None,
                quality: column.quality.map(|q| QualityFlag::from_raw(&record[q])),
            });
        }
    }
    Ok(datapoints)
}

fn gap_boundary(entry: &str, row: usize, raw: &str) -> Result<DateTime<FixedOffset>, ArchiveError> {
    let naive = NaiveDateTime::parse_from_str(raw, GAP_DATE_FORMAT).map_err(|source| {
        ArchiveError::GapBoundary {
            entry: entry.to_string(),
            row,
            value: raw.to_string(),
            source,
        }
    })?;
    localize(naive).ok_or_else(|| ArchiveError::Timestamp {
        entry: entry.to_string(),
        row,
        source: TimestampError::OutOfRange(raw.to_string()),
    })
}

/// Reconstructs the sampling grid of each documented gap.
///
/// A gap of `n > 1` samples between `start` and `end` yields `n - 1` points
/// spaced `(end - start) / (n - 1)` apart, starting at `start`. A single
/// missing sample yields one point at `start`.
fn synthesize_gaps(
    entry: &str,
    rows: &[StringRecord],
    range: &DateTimeRange,
) -> Result<Vec<Datapoint>, ArchiveError> {
    let Some(header) = rows.first() else {
        return Ok(Vec::new());
    };
    let from = column(entry, header, GAP_FROM)?;
    let until = column(entry, header, GAP_UNTIL)?;
    let count = column(entry, header, GAP_COUNT)?;
    let parameter = column(entry, header, GAP_PARAMETER)?;
    let trailer = rows.len() - 1;

    let mut datapoints = Vec::new();
    for (row, record) in rows.iter().enumerate().skip(1) {
        if row == trailer || record.get(0) == Some(GAP_STATION_ID) {
            continue;
        }
        let (Some(raw_from), Some(raw_until), Some(raw_count), Some(label)) = (
            record.get(from),
            record.get(until),
            record.get(count),
            record.get(parameter),
        ) else {
            continue;
        };

        let start = gap_boundary(entry, row, raw_from)?;
        let end = gap_boundary(entry, row, raw_until)?;
        let invalid_count = || ArchiveError::GapCount {
            entry: entry.to_string(),
            row,
            value: raw_count.to_string(),
        };
        let missing: i64 = raw_count.parse().map_err(|_| invalid_count())?;

        let instants: Vec<DateTime<FixedOffset>> = match missing {
            i64::MIN..=0 => Vec::new(),
            1 => vec![start],
            _ => {
                let intervals = i32::try_from(missing - 1).map_err(|_| invalid_count())?;
                let step = (end - start) / intervals;
                (0..intervals).map(|i| start + step * i).collect()
            }
        };
        datapoints.extend(
            instants
                .into_iter()
                .filter(|instant| range.contains(instant))
                .map(|instant| Datapoint::missing(label, instant)),
        );
    }
    Ok(datapoints)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::Duration;
    use std::io::{Cursor, Write};
    use zip::write::SimpleFileOptions;

    pub(crate) const PARAMETERS: &[u8] = b"Stations_ID;Von_Datum;Bis_Datum;Stationsname;Parameter;Parameterbeschreibung;Einheit;Datenquelle (Strukturversion=SV);Zusatz-Info;Besonderheiten;Literaturhinweis;eor
1;19500101;20230101;Aach;TT_TU;2m-Lufttemperatur;\xb0C;Hauptamtliche Messnetzstation;;;;eor
1;19500101;20230101;Aach;RF_TU;2m-relative Feuchte;%;Hauptamtliche Messnetzstation;;;;eor
Legende: keine
generiert: 01.02.2023 --  Deutscher Wetterdienst  --
";

    pub(crate) const OBSERVATIONS: &str = "STATIONS_ID;MESS_DATUM;QN_9;TT_TU;RF_TU;eor
          1;1999123123;    3;  -2.4;  91.0;eor
          1;2000010100;    1;  -2.6;-999;eor
          1;2000010101;    x;  fault;  90.0;eor
";

    pub(crate) const MISSING_VALUES: &str = "Stations_ID;Stations_Name;Parameter;Von_Datum;Bis_Datum;Anzahl_Fehlwerte
1;Aach;TT_TU;01.01.2000-02:00;01.01.2000-02:10;3
Stations_ID;Stations_Name;Parameter;Von_Datum;Bis_Datum;Anzahl_Fehlwerte
1;Aach;RF_TU;01.01.2000-05:00;01.01.2000-05:00;1
generiert: 01.02.2023
";

    pub(crate) fn archive_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut cursor);
            for (name, content) in entries {
                writer
                    .start_file(name.to_string(), SimpleFileOptions::default())
                    .unwrap();
                writer.write_all(content).unwrap();
            }
            writer.finish().unwrap();
        }
        cursor.into_inner()
    }

    fn full_archive() -> Vec<u8> {
        archive_bytes(&[
            ("Metadaten_Parameter_tu_stunde_00001.txt", PARAMETERS),
            ("produkt_tu_stunde_19500101_20221231_00001.txt", OBSERVATIONS.as_bytes()),
            ("Metadaten_Fehlwerte_00001.txt", MISSING_VALUES.as_bytes()),
            ("Metadaten_Geographie_00001.txt", b"ignored".as_slice()),
            ("produkt_tu_stunde.html", b"<html></html>".as_slice()),
        ])
    }

    fn parse(bytes: Vec<u8>, range: DateTimeRange) -> ParsedArchive {
        parse_reader(Cursor::new(bytes), &range).unwrap()
    }

    #[test]
    fn classifies_entries_by_prefix() {
        assert_eq!(EntryKind::classify("produkt_x.txt"), Some(EntryKind::Data));
        assert_eq!(
            EntryKind::classify("Metadaten_Fehlwerte_1.txt"),
            Some(EntryKind::MissingValues)
        );
        assert_eq!(
            EntryKind::classify("sub/Metadaten_Parameter_1.txt"),
            Some(EntryKind::Parameters)
        );
        assert_eq!(EntryKind::classify("Metadaten_Geographie_1.txt"), None);
        assert_eq!(EntryKind::classify("produkt_x.html"), None);
    }

    #[test]
    fn reads_metadata_and_skips_trailers() {
        let parsed = parse(full_archive(), DateTimeRange::unbounded());
        assert_eq!(parsed.metadata.len(), 2);
        let tt = &parsed.metadata[0];
        assert_eq!(tt.name, "TT_TU");
        assert_eq!(tt.unit, "°C");
        assert_eq!(tt.valid_from, parse_timestamp("19500101").unwrap());
    }

    #[test]
    fn observations_carry_values_flags_and_units() {
        let parsed = parse(full_archive(), DateTimeRange::unbounded());
        let observed: Vec<_> = parsed.datapoints.iter().filter(|d| !d.is_missing()).collect();
        assert_eq!(observed.len(), 6);

        let first = observed[0];
        assert_eq!(first.label, "TT_TU");
        assert_eq!(first.value, Some(DatapointValue::Number(-2.4)));
        assert_eq!(first.quality, Some(QualityFlag::ConfirmedAfterObjection));
        assert_eq!(first.unit.as_deref(), Some("°C"));
        assert_eq!(first.timestamp.offset().local_minus_utc(), 3600);

        let sentinel = observed[3];
        assert_eq!(sentinel.label, "RF_TU");
        assert_eq!(sentinel.value, Some(DatapointValue::Number(-999.0)));
        assert_eq!(sentinel.unit.as_deref(), Some("%"));

        let garbage = observed[4];
        assert_eq!(garbage.value, Some(DatapointValue::Text("fault".to_string())));
        assert_eq!(garbage.quality, Some(QualityFlag::FlagNonExistent));
    }

    #[test]
    fn gaps_reconstruct_the_sampling_grid() {
        let parsed = parse(full_archive(), DateTimeRange::unbounded());
        let gaps: Vec<_> = parsed.datapoints.iter().filter(|d| d.is_missing()).collect();
        let t0 = parse_timestamp("200001010200").unwrap();
        let stamps: Vec<_> = gaps.iter().map(|d| (d.label.as_str(), d.timestamp)).collect();
        assert_eq!(
            stamps,
            vec![
                ("TT_TU", t0),
                ("TT_TU", t0 + Duration::minutes(5)),
                ("RF_TU", parse_timestamp("200001010500").unwrap()),
            ]
        );
        assert!(gaps.iter().all(|d| d.unit.is_none() && d.quality.is_none()));
    }

    #[test]
    fn range_filters_rows_inclusively() {
        let start = parse_timestamp("2000010100").unwrap();
        let range = DateTimeRange::new(Some(start), Some(start));
        let parsed = parse(full_archive(), range);
        assert_eq!(parsed.datapoints.len(), 2);
        assert!(parsed.datapoints.iter().all(|d| d.timestamp == start));
    }

    #[test]
    fn observations_without_metadata_have_no_units() {
        let bytes = archive_bytes(&[("produkt_x.txt", OBSERVATIONS.as_bytes())]);
        let parsed = parse(bytes, DateTimeRange::unbounded());
        assert!(parsed.metadata.is_empty());
        assert_eq!(parsed.datapoints.len(), 6);
        assert!(parsed.datapoints.iter().all(|d| d.unit.is_none()));
    }

    #[test]
    fn each_quality_column_covers_the_following_values() {
        let daily = "STATIONS_ID;MESS_DATUM;QN_3;FX;FM;QN_4;RSK;eor\n1;20200101;10;5.0;2.0;3;0.4;eor\n";
        let bytes = archive_bytes(&[("produkt_klima_tag.txt", daily.as_bytes())]);
        let parsed = parse(bytes, DateTimeRange::unbounded());
        let flags: Vec<_> = parsed
            .datapoints
            .iter()
            .map(|d| (d.label.as_str(), d.quality))
            .collect();
        assert_eq!(
            flags,
            vec![
                ("FX", Some(QualityFlag::FlagNonExistent)),
                ("FM", Some(QualityFlag::FlagNonExistent)),
                ("RSK", Some(QualityFlag::ConfirmedAfterObjection)),
            ]
        );
    }

    #[test]
    fn schema_and_date_errors_fail_the_archive() {
        let no_date = archive_bytes(&[("produkt_x.txt", b"STATIONS_ID;TT;eor\n1;2;eor\n".as_slice())]);
        assert!(matches!(
            parse_reader(Cursor::new(no_date), &DateTimeRange::unbounded()),
            Err(ArchiveError::MissingColumn { column: DATA_DATE, .. })
        ));
        let bad_date =
            archive_bytes(&[("produkt_x.txt", b"STATIONS_ID;MESS_DATUM;TT;eor\n1;2020;2;eor\n".as_slice())]);
        assert!(matches!(
            parse_reader(Cursor::new(bad_date), &DateTimeRange::unbounded()),
            Err(ArchiveError::Timestamp { row: 1, .. })
        ));
    }

    #[test]
    fn trailing_columns_after_end_of_row_are_ignored() {
        let trailing = "STATIONS_ID;MESS_DATUM;QN_9;TT_TU;eor\n1;2000010100;1;-2.6;eor;\n1;2000010101;1;-2.9;eor;\n";
        let bytes = archive_bytes(&[("produkt_x.txt", trailing.as_bytes())]);
        let parsed = parse(bytes, DateTimeRange::unbounded());
        let values: Vec<_> = parsed.datapoints.iter().map(|d| d.value.clone()).collect();
        assert_eq!(
            values,
            vec![
                Some(DatapointValue::Number(-2.6)),
                Some(DatapointValue::Number(-2.9)),
            ]
        );

        let missing_eor = "STATIONS_ID;MESS_DATUM;QN_9;TT_TU;eor\n1;2000010100;1;-2.6\n";
        let bytes = archive_bytes(&[("produkt_x.txt", missing_eor.as_bytes())]);
        assert_eq!(parse(bytes, DateTimeRange::unbounded()).datapoints.len(), 1);
    }

    #[test]
    fn short_rows_fail_the_archive() {
        let short = "STATIONS_ID;MESS_DATUM;QN_9;TT_TU;eor\n1;2000010100;1;-2.6;eor\n1;2000010101\n";
        let bytes = archive_bytes(&[("produkt_x.txt", short.as_bytes())]);
        assert!(matches!(
            parse_reader(Cursor::new(bytes), &DateTimeRange::unbounded()),
            Err(ArchiveError::ShortRow {
                row: 2,
                found: 2,
                required: 4,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn parses_archives_on_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&full_archive()).unwrap();
        let parsed = parse_archive_blocking(file.path().to_path_buf(), DateTimeRange::unbounded())
            .await
            .unwrap();
        assert_eq!(parsed.metadata.len(), 2);
        assert!(matches!(
            parse_archive(Path::new("/nonexistent/archive.zip"), &DateTimeRange::unbounded()),
            Err(ArchiveError::Open(..))
        ));
    }
}
