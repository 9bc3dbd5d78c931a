use chrono::Duration;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use dwd_climate::{parse_reader, parse_station_list, parse_timestamp, DateTimeRange};
use std::fmt::Write as _;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

const PARAMETERS: &str = "Stations_ID;Von_Datum;Bis_Datum;Stationsname;Parameter;Parameterbeschreibung;Einheit;eor
44;20070209;20231231;Gro\u{df}enkneten;TT_TU;2m-Lufttemperatur;Grad C;eor
44;20070209;20231231;Gro\u{df}enkneten;RF_TU;2m-relative Feuchte;%;eor
generiert: 01.02.2024
";

/// A year of hourly observations for one station.
fn hourly_archive() -> Vec<u8> {
    let start = parse_timestamp("2020010100").unwrap();
    let mut observations = String::from("STATIONS_ID;MESS_DATUM;QN_9;TT_TU;RF_TU;eor\n");
    for hour in 0..24 * 366 {
        let at = start + Duration::hours(hour);
        let temperature = (hour % 300) as f64 / 10.0 - 5.0;
        writeln!(
            observations,
            "        44;{};    3;{:6.1};  {:4.1};eor",
            at.format("%Y%m%d%H"),
            temperature,
            60.0 + (hour % 40) as f64
        )
        .unwrap();
    }

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = ZipWriter::new(&mut cursor);
        for (name, content) in [
            ("Metadaten_Parameter_tu_stunde_00044.txt", PARAMETERS),
            ("produkt_tu_stunde_20200101_20201231_00044.txt", observations.as_str()),
        ] {
            writer
                .start_file(name, SimpleFileOptions::default())
                .unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
    }
    cursor.into_inner()
}

fn station_list() -> String {
    let mut list = String::from(
        "Stations_id von_datum bis_datum Stationshoehe geoBreite geoLaenge Stationsname Bundesland Abgabe\n\
         ----------- --------- --------- ------------- --------- --------- ------------ ---------- ------\n",
    );
    for id in 0..1_500 {
        writeln!(
            list,
            "{id:05} 19500101 20231231 {:>14} {:>11.4} {:>9.4} Station Nummer {id} Niedersachsen Frei",
            id % 900,
            47.0 + (id % 80) as f64 / 10.0,
            6.0 + (id % 90) as f64 / 10.0,
        )
        .unwrap();
    }
    list
}

fn bench_archive(c: &mut Criterion) {
    let archive = hourly_archive();
    let unbounded = DateTimeRange::unbounded();
    let january = DateTimeRange::new(
        Some(parse_timestamp("2020010100").unwrap()),
        Some(parse_timestamp("2020013123").unwrap()),
    );
    c.bench_function("parse_archive_unbounded", |b| {
        b.iter(|| parse_reader(Cursor::new(black_box(archive.as_slice())), &unbounded))
    });
    c.bench_function("parse_archive_january", |b| {
        b.iter(|| parse_reader(Cursor::new(black_box(archive.as_slice())), &january))
    });

    let list = station_list();
    c.bench_function("parse_station_list", |b| {
        b.iter(|| parse_station_list(black_box(&list)))
    });
}

criterion_group!(benches, bench_archive);
criterion_main!(benches);
