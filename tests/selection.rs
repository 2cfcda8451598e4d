use anyhow::Result;
use prefixflow::io::cloud::FakeObjectIO;
use prefixflow::testing::{numbered_keys, upload_rows};
use prefixflow::{
    Batch, KeyAllowList, ObjectSource, ParallelEnv, Row, RowCollection, SelectionConfig,
    ShardCoordinates, TemplateArgs, row, split_even,
};
use std::collections::{HashMap, HashSet};

const BUCKET: &str = "bucket";
const PREFIX: &str = "dev/photo_input/photo_input.tsv";

fn seed(n: usize) -> Result<(FakeObjectIO, Vec<String>)> {
    let storage = FakeObjectIO::new();
    let keys = numbered_keys(PREFIX, 0..n);
    for (i, key) in keys.iter().enumerate() {
        upload_rows(&storage, BUCKET, key, &[row![i]])?;
    }
    Ok((storage, keys))
}

fn echo(rows: &RowCollection) -> anyhow::Result<Vec<Row>> {
    Ok(rows.iter().cloned().collect())
}

/// Keys processed by a dry run under `selection`.
fn processed(storage: &FakeObjectIO, selection: SelectionConfig) -> Result<Vec<String>> {
    let source = ObjectSource::new(storage.clone(), BUCKET, PREFIX).with_selection(selection);
    let report = Batch::new(source, echo).run(true)?;
    Ok(report.stats.files().iter().map(|f| f.key.clone()).collect())
}

#[test]
fn shard_two_of_four_takes_the_third_quarter() -> Result<()> {
    let (storage, keys) = seed(100)?;
    let selection = SelectionConfig::default().with_shard(ShardCoordinates::new(2, 4)?);

    assert_eq!(processed(&storage, selection)?, keys[50..75].to_vec());
    Ok(())
}

/// Every shard's output together covers each file exactly once.
#[test]
fn shards_partition_the_listing() -> Result<()> {
    let (storage, keys) = seed(23)?;
    let size = 5;

    let mut written = Vec::new();
    for index in 0..size {
        let source = ObjectSource::new(storage.clone(), BUCKET, PREFIX).with_selection(
            SelectionConfig::default().with_shard(ShardCoordinates::new(index, size)?),
        );
        let mut batch = Batch::new(source, echo).with_default_dest(storage.clone());
        written.extend(batch.run(false)?.written);
    }

    let expected: Vec<String> = keys.iter().map(|k| k.replace("_input", "_output")).collect();
    assert_eq!(written, expected);

    let mut per_key: HashMap<String, usize> = HashMap::new();
    for (_, key) in storage.writes() {
        *per_key.entry(key).or_default() += 1;
    }
    assert!(per_key.values().all(|&n| n == 1));
    Ok(())
}

#[test]
fn shard_slices_match_split_even() -> Result<()> {
    let (storage, keys) = seed(7)?;
    let groups = split_even(&keys, 3);
    for (index, group) in groups.iter().enumerate() {
        let selection = SelectionConfig::default().with_shard(ShardCoordinates::new(index, 3)?);
        assert_eq!(&processed(&storage, selection)?, group);
    }
    Ok(())
}

#[test]
fn allow_list_keeps_exactly_the_named_keys() -> Result<()> {
    let (storage, keys) = seed(20)?;
    let allow: KeyAllowList = [keys[3].as_str(), keys[17].as_str()].into_iter().collect();

    let got = processed(&storage, SelectionConfig::default().with_allow_list(allow))?;
    assert_eq!(got, vec![keys[3].clone(), keys[17].clone()]);
    Ok(())
}

#[test]
fn allow_list_intersects_with_shard() -> Result<()> {
    let (storage, keys) = seed(20)?;
    let allow: KeyAllowList = [keys[3].as_str(), keys[17].as_str()].into_iter().collect();
    let selection = SelectionConfig::default()
        .with_shard(ShardCoordinates::new(1, 2)?)
        .with_allow_list(allow);

    assert_eq!(processed(&storage, selection)?, vec![keys[17].clone()]);
    Ok(())
}

#[test]
fn allow_list_of_unknown_keys_processes_nothing() -> Result<()> {
    let (storage, _) = seed(3)?;
    let allow = KeyAllowList::parse("dev/other.gz");

    assert!(processed(&storage, SelectionConfig::default().with_allow_list(allow))?.is_empty());
    Ok(())
}

/// Selection resolved from environment-style lookups, the way an entry point does it.
#[test]
fn selection_resolved_from_variables() -> Result<()> {
    let (storage, keys) = seed(8)?;
    let vars: HashMap<&str, String> = HashMap::from([
        ("WORKER_INDEX", "1".to_string()),
        ("WORKER_COUNT", "2".to_string()),
        ("ONLY_KEYS", format!("{}, {}", keys[1], keys[5])),
    ]);
    let parallel = ParallelEnv::new("WORKER_INDEX", "WORKER_COUNT");

    let selection =
        SelectionConfig::resolve(Some(&parallel), Some("ONLY_KEYS"), |name| vars.get(name).cloned())?;

    assert_eq!(processed(&storage, selection)?, vec![keys[5].clone()]);
    Ok(())
}

#[test]
fn templated_prefix_scopes_the_listing() -> Result<()> {
    let storage = FakeObjectIO::new();
    for date in ["2016-11-01", "2016-11-02"] {
        for key in numbered_keys(&format!("dev/{date}/in_input/in_input.tsv"), 0..3) {
            upload_rows(&storage, BUCKET, &key, &[row![date]])?;
        }
    }

    let source = ObjectSource::new(storage.clone(), BUCKET, "dev/{date}/in_input/in_input.tsv");
    let mut batch = Batch::new(source, echo)
        .with_default_dest(storage.clone())
        .with_args(TemplateArgs::new().with("date", "2016-11-02"));
    let report = batch.run(false)?;

    assert_eq!(report.listed, 3);
    let written: HashSet<&str> = report.written.iter().map(String::as_str).collect();
    assert!(written.iter().all(|k| k.starts_with("dev/2016-11-02/in_output/")));
    assert!(storage.keys(BUCKET, "dev/2016-11-01/in_output/").is_empty());
    Ok(())
}

/// Selection loaded from JSON is validated the same way as one built in code.
#[test]
fn out_of_range_shard_in_json_is_rejected() -> Result<()> {
    for json in [
        r#"{"shard":{"index":5,"size":4},"allow_list":null}"#,
        r#"{"shard":{"index":0,"size":0},"allow_list":null}"#,
    ] {
        assert!(serde_json::from_str::<SelectionConfig>(json).is_err());
    }

    let (storage, keys) = seed(8)?;
    let selection: SelectionConfig =
        serde_json::from_str(r#"{"shard":{"index":3,"size":4},"allow_list":null}"#)?;
    assert_eq!(processed(&storage, selection)?, keys[6..8].to_vec());
    Ok(())
}
