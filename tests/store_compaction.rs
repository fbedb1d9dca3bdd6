use std::collections::HashMap;

use kitedb_columnar::{
  ColumnValue, ColumnarError, ColumnarStore, CompactionOptions, GraphSchema, Row, RowKey,
};

const SCHEMA_JSON: &str = r#"[
  {
    "name": "Visit",
    "kind": "edge",
    "vertex_type": "string",
    "properties": [
      { "name": "day", "value_type": "string", "group_by": true },
      { "name": "hits", "value_type": "long", "aggregate_function": "sum" },
      { "name": "last_seen", "value_type": "date", "aggregate_function": "max" },
      { "name": "agents", "value_type": "frequency_map", "aggregate_function": "frequency_map_merge" },
      { "name": "source", "value_type": "type_value", "aggregate_function": "first" }
    ]
  }
]"#;

fn store() -> ColumnarStore {
  let schema = GraphSchema::from_json(SCHEMA_JSON).expect("schema json");
  ColumnarStore::open(schema).expect("open store")
}

fn visit(store: &ColumnarStore, user: &str, day: &str, i: i64) -> Row {
  store
    .layout("Visit")
    .unwrap()
    .row_builder()
    .edge([ColumnValue::utf8(user)], [ColumnValue::utf8("site")], true)
    .unwrap()
    .property("day", [ColumnValue::utf8(day)])
    .unwrap()
    .property("hits", [ColumnValue::Int64(i)])
    .unwrap()
    .property("last_seen", [ColumnValue::Int64(1_000 + i)])
    .unwrap()
    .property("agents", [ColumnValue::count_map([(format!("agent-{}", i % 3), 1)])])
    .unwrap()
    .property("source", [ColumnValue::utf8("web"), ColumnValue::utf8("organic")])
    .unwrap()
    .without_count()
    .build()
}

#[test]
fn compaction_matches_sequential_fold() {
  let store = store();
  let engine = store.engine("Visit").unwrap();

  let users = ["alice", "bob", "carol"];
  let days = ["mon", "tue"];
  let rows: Vec<Row> = (0..60)
    .map(|i| visit(&store, users[i % 3], days[i % 2], i as i64))
    .collect();

  let mut expected: HashMap<RowKey, Vec<Row>> = HashMap::new();
  for row in &rows {
    expected
      .entry(engine.key_of(row).unwrap())
      .or_default()
      .push(row.clone());
  }
  let expected: HashMap<RowKey, Row> = expected
    .into_iter()
    .map(|(key, group)| (key, engine.merge_all(group).unwrap().unwrap()))
    .collect();

  let partitions: Vec<Vec<Row>> = rows.chunks(7).map(<[Row]>::to_vec).collect();
  let output = store
    .compact("Visit", partitions, CompactionOptions::new().output_partitions(4))
    .unwrap();

  assert_eq!(output.stats.input_rows, 60);
  assert_eq!(output.stats.output_rows, 6);

  let mut seen = 0;
  for row in output.partitions.iter().flatten() {
    let key = engine.key_of(row).unwrap();
    assert_eq!(Some(row), expected.get(&key));
    assert_eq!(engine.count_of(row).unwrap(), 10);
    seen += 1;
  }
  assert_eq!(seen, expected.len());
}

#[test]
fn group_by_columns_split_keys() {
  let store = store();
  let mon = visit(&store, "alice", "mon", 1);
  let tue = visit(&store, "alice", "tue", 2);
  assert!(matches!(
    store.merge("Visit", &mon, &tue),
    Err(ColumnarError::PreconditionViolation(_))
  ));
}

#[test]
fn multi_column_first_is_kept() {
  let store = store();
  let layout = store.layout("Visit").unwrap();
  let merged = store
    .merge("Visit", &visit(&store, "bob", "mon", 1), &visit(&store, "bob", "mon", 2))
    .unwrap();

  let source = layout.columns_for("source").unwrap();
  assert_eq!(source.len(), 2);
  assert_eq!(merged.get(source[0]), Some(&ColumnValue::utf8("web")));
  assert_eq!(merged.get(source[1]), Some(&ColumnValue::utf8("organic")));

  let last_seen = layout.columns_for("last_seen").unwrap()[0];
  assert_eq!(merged.get(last_seen), Some(&ColumnValue::Int64(1_002)));
  assert_eq!(
    layout.column_names()[source[0]..=source[1]],
    ["source_type".to_string(), "source_value".to_string()]
  );
}

#[test]
fn unknown_function_in_json_fails_at_open() {
  let json = SCHEMA_JSON.replace("\"first\"", "\"latest_wins\"");
  let schema = GraphSchema::from_json(&json).unwrap();
  let err = ColumnarStore::open(schema).unwrap_err();
  assert!(err.is_configuration());
  assert!(matches!(
    err,
    ColumnarError::UnknownAggregator { ref function, .. } if function == "latest_wins"
  ));
}
