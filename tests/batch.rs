use anyhow::Result;
use prefixflow::io::cloud::FakeObjectIO;
use prefixflow::testing::{RecordingTransform, numbered_keys, read_rows, sample_rows, upload_rows};
use prefixflow::{
    Batch, EtlError, MarkerKeyMapper, ObjectDest, ObjectIO, ObjectSource, RegexKeyMapper, Row,
    RowCollection, RunState, SelectionConfig, ShardCoordinates, TemplateArgs,
};

const BUCKET: &str = "bucket";
const TEMPLATE: &str = "{env}/{date}/foo_input/foo_input.tsv";
const PREFIX: &str = "dev/2016-11-01/foo_input/foo_input.tsv";

fn args() -> TemplateArgs {
    TemplateArgs::new().with("env", "dev").with("date", "2016-11-01")
}

/// Seed `n` parts; part `i` holds `i + 1` rows.
fn seed(n: usize) -> Result<(FakeObjectIO, Vec<String>)> {
    let storage = FakeObjectIO::new();
    let keys = numbered_keys(PREFIX, 0..n);
    for (i, key) in keys.iter().enumerate() {
        upload_rows(&storage, BUCKET, key, &sample_rows(i + 1))?;
    }
    Ok((storage, keys))
}

fn source(storage: &FakeObjectIO) -> ObjectSource<FakeObjectIO> {
    ObjectSource::new(storage.clone(), BUCKET, TEMPLATE).with_columns(["id", "name"])
}

fn output_key(key: &str) -> String {
    key.replace("_input", "_output")
}

fn echo(rows: &RowCollection) -> anyhow::Result<Vec<Row>> {
    Ok(rows.iter().cloned().collect())
}

#[test]
fn run_writes_every_file_at_mapped_key() -> Result<()> {
    let (storage, keys) = seed(3)?;
    let mut batch = Batch::new(source(&storage), echo)
        .with_default_dest(storage.clone())
        .with_args(args());

    let report = batch.run(false)?;

    assert_eq!(batch.state(), RunState::Completed);
    assert_eq!(report.prefix, PREFIX);
    assert_eq!(report.listed, 3);
    assert_eq!(
        report.written,
        keys.iter().map(|k| output_key(k)).collect::<Vec<_>>()
    );
    for (i, key) in keys.iter().enumerate() {
        assert_eq!(read_rows(&storage, BUCKET, &output_key(key))?, sample_rows(i + 1));
    }

    let summary = report.summary().expect("summary for processed files");
    assert_eq!(summary.files, 3);
    assert_eq!(summary.total_rows, 6);
    Ok(())
}

/// Stats count input rows, whatever the transform returns.
#[test]
fn stats_record_input_row_counts() -> Result<()> {
    let (storage, _) = seed(2)?;
    let first_only = |rows: &RowCollection| -> anyhow::Result<Vec<Row>> {
        Ok(rows.iter().take(1).cloned().collect())
    };
    let mut batch = Batch::new(source(&storage), first_only)
        .with_default_dest(storage.clone())
        .with_args(args());

    let report = batch.run(false)?;
    let counts: Vec<usize> = report.stats.files().iter().map(|f| f.row_count).collect();
    assert_eq!(counts, vec![1, 2]);
    assert_eq!(read_rows(&storage, BUCKET, &report.written[1])?.len(), 1);
    Ok(())
}

#[test]
fn dry_run_writes_nothing_and_matches_wet_stats() -> Result<()> {
    let (storage, _) = seed(4)?;
    let writes_before = storage.writes().len();

    let mut dry = Batch::new(source(&storage), echo)
        .with_default_dest(storage.clone())
        .with_args(args());
    let dry_report = dry.run(true)?;

    assert!(dry_report.dry);
    assert!(dry_report.written.is_empty());
    assert_eq!(storage.writes().len(), writes_before);
    assert!(storage.keys(BUCKET, "dev/2016-11-01/foo_output/").is_empty());

    let mut wet = Batch::new(source(&storage), echo)
        .with_default_dest(storage.clone())
        .with_args(args());
    let wet_report = wet.run(false)?;

    let shape = |r: &prefixflow::RunReport| -> Vec<(String, usize)> {
        r.stats
            .files()
            .iter()
            .map(|f| (f.key.clone(), f.row_count))
            .collect()
    };
    assert_eq!(shape(&dry_report), shape(&wet_report));
    assert_eq!(wet_report.written.len(), 4);
    Ok(())
}

#[test]
fn second_run_skips_everything() -> Result<()> {
    let (storage, _) = seed(3)?;
    let mut batch = Batch::new(source(&storage), RecordingTransform::new())
        .with_default_dest(storage.clone())
        .with_args(args());

    batch.run(false)?;
    assert_eq!(batch.transform().calls(), 3);
    let writes_after_first = storage.writes().len();

    batch.reset();
    let report = batch.run(false)?;

    assert_eq!(batch.transform().calls(), 3);
    assert_eq!(report.listed, 3);
    assert!(report.stats.is_empty());
    assert!(report.summary().is_none());
    assert_eq!(storage.writes().len(), writes_after_first);
    Ok(())
}

/// A run that dies part-way leaves earlier outputs; the rerun only does the rest.
#[test]
fn rerun_after_failure_resumes() -> Result<()> {
    let (storage, keys) = seed(5)?;

    let mut crashed = Batch::new(source(&storage), RecordingTransform::failing_on(3))
        .with_default_dest(storage.clone())
        .with_args(args());
    let err = crashed.run(false).unwrap_err();
    assert!(matches!(err, EtlError::Transform(_)));
    assert_eq!(crashed.state(), RunState::Failed);
    assert_eq!(storage.keys(BUCKET, "dev/2016-11-01/foo_output/").len(), 2);

    let mut resumed = Batch::new(source(&storage), RecordingTransform::new())
        .with_default_dest(storage.clone())
        .with_args(args());
    let report = resumed.run(false)?;

    assert_eq!(resumed.transform().row_counts(), &[3, 4, 5]);
    assert_eq!(
        report.written,
        keys[2..].iter().map(|k| output_key(k)).collect::<Vec<_>>()
    );
    Ok(())
}

/// Without skip probing a dry run still sees already-processed files.
#[test]
fn dry_run_ignores_existing_outputs() -> Result<()> {
    let (storage, _) = seed(2)?;
    let mut wet = Batch::new(source(&storage), echo)
        .with_default_dest(storage.clone())
        .with_args(args());
    wet.run(false)?;

    let mut dry = Batch::new(source(&storage), echo)
        .with_default_dest(storage.clone())
        .with_args(args());
    assert_eq!(dry.run(true)?.stats.len(), 2);
    Ok(())
}

#[test]
fn empty_prefix_is_fatal() -> Result<()> {
    let storage = FakeObjectIO::new();
    upload_rows(&storage, BUCKET, "elsewhere/part.gz", &sample_rows(1))?;

    let sharded = source(&storage)
        .with_selection(SelectionConfig::default().with_shard(ShardCoordinates::new(1, 4)?));
    let mut batch = Batch::new(sharded, echo).with_args(args());

    let err = batch.run(false).unwrap_err();
    assert!(matches!(err, EtlError::SourceEmpty { ref prefix } if prefix == PREFIX));
    assert_eq!(
        err.to_string(),
        format!("source does not exist: `{PREFIX}`")
    );
    assert_eq!(batch.state(), RunState::Failed);
    Ok(())
}

/// A shard whose slice is empty completes quietly.
#[test]
fn empty_shard_slice_completes() -> Result<()> {
    let (storage, _) = seed(1)?;
    let sharded = source(&storage)
        .with_selection(SelectionConfig::default().with_shard(ShardCoordinates::new(0, 4)?));
    let mut batch = Batch::new(sharded, echo).with_args(args());

    let report = batch.run(false)?;
    assert_eq!(report.listed, 1);
    assert!(report.stats.is_empty());
    assert_eq!(batch.state(), RunState::Completed);
    Ok(())
}

#[test]
fn missing_template_argument_is_config_error() -> Result<()> {
    let (storage, _) = seed(1)?;
    let mut batch = Batch::new(source(&storage), echo)
        .with_args(TemplateArgs::new().with("env", "dev"));

    let err = batch.run(false).unwrap_err();
    assert!(matches!(err, EtlError::Config(ref m) if m.contains("date")));
    Ok(())
}

#[test]
fn corrupt_file_aborts_run() -> Result<()> {
    let (storage, keys) = seed(3)?;
    storage.put_object(BUCKET, &keys[1], b"not gzip at all")?;

    let mut batch = Batch::new(source(&storage), RecordingTransform::new())
        .with_default_dest(storage.clone())
        .with_args(args());
    let err = batch.run(false).unwrap_err();

    assert!(matches!(err, EtlError::Decode { ref key, .. } if key == &keys[1]));
    assert_eq!(batch.transform().calls(), 1);
    assert_eq!(
        storage.keys(BUCKET, "dev/2016-11-01/foo_output/"),
        vec![output_key(&keys[0])]
    );
    Ok(())
}

#[test]
fn empty_files_are_skipped() -> Result<()> {
    let (storage, keys) = seed(3)?;
    storage.put_object(BUCKET, &keys[0], b"")?;
    upload_rows(&storage, BUCKET, &keys[2], &[])?;

    let mut batch = Batch::new(source(&storage), RecordingTransform::new())
        .with_default_dest(storage.clone())
        .with_args(args());
    let report = batch.run(false)?;

    assert_eq!(report.listed, 3);
    assert_eq!(batch.transform().row_counts(), &[2]);
    assert_eq!(report.written, vec![output_key(&keys[1])]);
    Ok(())
}

#[test]
fn batch_without_destination_never_writes() -> Result<()> {
    let (storage, _) = seed(2)?;
    let writes_before = storage.writes().len();
    let mut batch = Batch::new(source(&storage), RecordingTransform::new()).with_args(args());

    let report = batch.run(false)?;
    assert_eq!(batch.transform().calls(), 2);
    assert!(report.written.is_empty());
    assert_eq!(storage.writes().len(), writes_before);
    Ok(())
}

#[test]
fn columns_are_applied_and_optional() -> Result<()> {
    let (storage, _) = seed(1)?;

    let named = |rows: &RowCollection| -> anyhow::Result<Vec<Row>> {
        assert_eq!(rows.column("name"), Some(vec!["row-0"]));
        Ok(Vec::new())
    };
    Batch::new(source(&storage), named).with_args(args()).run(true)?;

    let unnamed = |rows: &RowCollection| -> anyhow::Result<Vec<Row>> {
        assert!(rows.columns().is_none());
        assert_eq!(rows.width(), 2);
        Ok(Vec::new())
    };
    let bare = ObjectSource::new(storage.clone(), BUCKET, TEMPLATE).with_columns(Vec::<String>::new());
    Batch::new(bare, unnamed).with_args(args()).run(true)?;
    Ok(())
}

#[test]
fn custom_destination_mapping() -> Result<()> {
    let (storage, _) = seed(2)?;
    storage.create_bucket("archive");
    let dest = ObjectDest::new(storage.clone())
        .with_key_mapper(RegexKeyMapper::new(r"^dev/(.+)/foo_input/foo_input", "prod/$1/bar/bar")?)
        .with_bucket("archive");
    let mut batch = Batch::new(source(&storage), echo)
        .with_dest(dest)
        .with_args(args());

    let report = batch.run(false)?;
    assert_eq!(report.written[0], "prod/2016-11-01/bar/bar.tsv.0000_part_00.gz");
    assert_eq!(storage.keys("archive", "prod/").len(), 2);

    // the skip probe uses the same mapping and bucket
    batch.reset();
    assert!(batch.run(false)?.stats.is_empty());
    assert!(storage.keys(BUCKET, "dev/2016-11-01/foo_output/").is_empty());
    Ok(())
}

#[test]
fn marker_mapper_can_be_swapped() -> Result<()> {
    let (storage, _) = seed(1)?;
    let dest = ObjectDest::new(storage.clone())
        .with_key_mapper(MarkerKeyMapper::new("foo_input", "foo_done"));
    let mut batch = Batch::new(source(&storage), echo)
        .with_dest(dest)
        .with_args(args());

    let report = batch.run(false)?;
    assert_eq!(
        report.written,
        vec!["dev/2016-11-01/foo_done/foo_done.tsv.0000_part_00.gz".to_string()]
    );
    Ok(())
}
