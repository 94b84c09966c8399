//! Integration tests over a local input tree
//!
//! Tests the full end-to-end flow: YAML config → JSON input → partitioned
//! Parquet output, read back with an independent Parquet reader.

use parquet::file::reader::{FileReader, SerializedFileReader};
use playlog_etl::output::{CompletionMarker, StorageRoot};
use playlog_etl::{Error, JobConfig, OutputTable, Pipeline, WriteMode};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::fs::File;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

// ============================================================================
// Helpers
// ============================================================================

fn write_json_lines(path: &Path, records: &[Value]) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    let body: Vec<String> = records.iter().map(Value::to_string).collect();
    std::fs::write(path, body.join("\n")).unwrap();
}

fn parquet_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let Ok(entries) = std::fs::read_dir(dir) else {
        return files;
    };
    for entry in entries {
        let path = entry.unwrap().path();
        if path.is_dir() {
            files.extend(parquet_files(&path));
        } else if path.extension().is_some_and(|e| e == "parquet") {
            files.push(path);
        }
    }
    files.sort();
    files
}

fn parquet_rows(dir: &Path) -> i64 {
    parquet_files(dir)
        .iter()
        .map(|path| {
            let reader = SerializedFileReader::new(File::open(path).unwrap()).unwrap();
            reader.metadata().file_metadata().num_rows()
        })
        .sum()
}

fn parquet_columns(dir: &Path) -> Vec<String> {
    let files = parquet_files(dir);
    let reader = SerializedFileReader::new(File::open(&files[0]).unwrap()).unwrap();
    reader
        .metadata()
        .file_metadata()
        .schema_descr()
        .columns()
        .iter()
        .map(|c| c.name().to_string())
        .collect()
}

/// Input tree laid out like the public dataset
fn sample_input(root: &Path) {
    let songs = [
        ("TRAAA", "Song A", "ARAAA", "ArtistA", 2004, 218.93),
        ("TRAAB", "Song B", "ARAAA", "ArtistA", 0, 152.92),
        ("TRAAC", "Song C", "ARAAC", "ArtistC", 1999, 301.2),
    ];
    for (id, title, parent, name, year, duration) in songs {
        write_json_lines(
            &root.join(format!("catalog_data/A/A/B/{id}.json")),
            &[json!({
                "num_songs": 1, "id": id, "title": title, "parent_id": parent,
                "parent_name": name, "parent_location": "", "parent_lat": null,
                "parent_long": null, "year": year, "duration": duration
            })],
        );
    }

    let event = |page: &str, song: Option<(&str, &str, f64)>, ts: i64, user: &str, item: i64| {
        let mut record = json!({
            "page": page, "ts": ts, "userId": user, "firstName": "Kate",
            "lastName": "Harrell", "gender": "F", "level": "paid",
            "sessionId": 293, "itemInSession": item, "auth": "Logged In",
            "method": "PUT", "status": 200, "registration": 1_540_472_624_796_i64,
            "location": "Lansing-East Lansing, MI", "userAgent": "Mozilla/5.0"
        });
        if let Some((title, parent, length)) = song {
            record["song"] = json!(title);
            record["artist"] = json!(parent);
            record["length"] = json!(length);
        }
        record
    };

    write_json_lines(
        &root.join("activity_data/2018/11/2018-11-01-events.json"),
        &[
            event("Home", None, 1_541_105_830_796, "97", 0),
            event("NextSong", Some(("Song A", "ARAAA", 218.93)), 1_541_106_106_796, "97", 1),
            event("NextSong", Some(("Song B", "ARAAA", 152.92)), 1_541_106_325_796, "97", 2),
        ],
    );
    write_json_lines(
        &root.join("activity_data/2018/11/2018-11-02-events.json"),
        &[
            event("NextSong", Some(("Not In Catalog", "ARZZZ", 100.0)), 1_541_121_934_796, "97", 3),
            event("Logout", None, 1_541_122_000_000, "97", 4),
        ],
    );
}

struct Job {
    _dir: TempDir,
    output: PathBuf,
    config: JobConfig,
}

fn job(mode: &str) -> Job {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input");
    let output = dir.path().join("output");
    sample_input(&input);

    let yaml = format!(
        "input_root: {}\noutput_root: {}\nwrite_mode: {mode}\ntimezone: UTC\n\
         output:\n  compression: zstd\n  row_group_size: 1000\n",
        input.display(),
        output.display()
    );
    let config = JobConfig::from_yaml_str(&yaml).unwrap();
    Job {
        _dir: dir,
        output,
        config,
    }
}

// ============================================================================
// End-to-end
// ============================================================================

#[tokio::test]
async fn test_full_run_writes_all_tables() {
    let job = job("append");
    let report = Pipeline::new(job.config.clone()).unwrap().run().await.unwrap();

    assert_eq!(report.write_mode, WriteMode::Append);
    assert_eq!(report.stages.len(), 2);
    assert_eq!(report.stages[1].input_rows, 5);
    assert_eq!(report.stages[1].kept_rows, 3);

    let expected = [
        (OutputTable::Entities, 3),
        (OutputTable::Attributes, 2),
        (OutputTable::Actors, 1),
        (OutputTable::Time, 3),
        (OutputTable::Facts, 3),
    ];
    for (table, rows) in expected {
        assert_eq!(report.rows(table), rows, "{table}");
        assert_eq!(
            parquet_rows(&job.output.join(table.dir_name())),
            rows as i64,
            "{table}"
        );
        assert!(job.output.join(table.dir_name()).join("_SUCCESS").is_file());
    }
}

#[tokio::test]
async fn test_partition_layout() {
    let job = job("append");
    Pipeline::new(job.config.clone()).unwrap().run().await.unwrap();

    for dir in [
        "entities/year=2004/parent_id=ARAAA",
        "entities/year=0/parent_id=ARAAA",
        "entities/year=1999/parent_id=ARAAC",
        "attributes/name=ArtistA/parent_id=ARAAA",
        "actors/user_id=97",
        "time/year=2018/month=11",
        "facts/year=2018/month=11",
    ] {
        assert!(job.output.join(dir).is_dir(), "{dir}");
    }
    assert!(parquet_files(&job.output.join("facts"))
        .iter()
        .all(|p| p.file_name().unwrap().to_str().unwrap().starts_with("part-")));
}

#[tokio::test]
async fn test_partition_columns_live_in_paths() {
    let job = job("append");
    Pipeline::new(job.config.clone()).unwrap().run().await.unwrap();

    assert_eq!(
        parquet_columns(&job.output.join("entities")),
        vec!["id", "title", "duration"]
    );
    assert_eq!(
        parquet_columns(&job.output.join("facts")),
        vec![
            "surrogate_id",
            "timestamp",
            "user_id",
            "tier",
            "entity_id",
            "parent_id",
            "session_id",
            "location",
            "user_agent"
        ]
    );
}

#[tokio::test]
async fn test_rerun_modes() {
    let job = job("append");
    Pipeline::new(job.config.clone()).unwrap().run().await.unwrap();
    Pipeline::new(job.config.clone()).unwrap().run().await.unwrap();
    assert_eq!(parquet_rows(&job.output.join("facts")), 6);
    assert_eq!(parquet_rows(&job.output.join("entities")), 6);

    let mut overwrite = job.config.clone();
    overwrite.write_mode = WriteMode::Overwrite;
    Pipeline::new(overwrite).unwrap().run().await.unwrap();
    assert_eq!(parquet_rows(&job.output.join("facts")), 3);
    assert_eq!(parquet_rows(&job.output.join("entities")), 3);
}

#[tokio::test]
async fn test_standalone_stages() {
    let job = job("append");

    let err = Pipeline::new(job.config.clone())
        .unwrap()
        .run_activity_only()
        .await
        .unwrap_err();
    assert!(matches!(err, Error::StageIncomplete { .. }));
    for dir in ["actors", "time", "facts"] {
        assert!(!job.output.join(dir).exists(), "{dir}");
    }

    Pipeline::new(job.config.clone())
        .unwrap()
        .run_catalog_only()
        .await
        .unwrap();
    let root = StorageRoot::parse(job.output.to_str().unwrap()).unwrap();
    let marker = CompletionMarker::read(&root, OutputTable::Entities)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(marker.rows, 3);

    let report = Pipeline::new(job.config.clone())
        .unwrap()
        .run_activity_only()
        .await
        .unwrap();
    assert_eq!(report.rows(OutputTable::Facts), 3);
    assert_eq!(parquet_rows(&job.output.join("facts")), 3);
}

#[test]
fn test_same_roots_rejected() {
    let mut config = JobConfig::default();
    config.input_root = "/data/shared".to_string();
    config.output_root = "/data/shared".to_string();
    assert!(Pipeline::new(config).is_err());
}
