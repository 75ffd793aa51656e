//! Emitter wire-format tests over hand-built snapshots.
//!
//! These exercise the three output contracts end to end without a live
//! cluster: the walk is the only component that needs a server, and the
//! emitters operate purely on snapshots and sample batches.

use mongocensus_core::emit::{
    FILE_END_MARKER, FILE_START_MARKER, SampleStreamWriter, build_index_export, write_summary,
};
use mongocensus_core::index::normalize_index;
use mongocensus_core::models::{ClusterSnapshot, CollectionSnapshot, DatabaseSnapshot};
use mongocensus_core::{SampleBatch, SampleSink};
use mongodb::bson::{Binary, DateTime, Decimal128, doc, spec::BinarySubtype};
use std::str::FromStr;

/// Builds the two-database fixture from the traversal scenarios:
/// `shop.orders` with an `_id` index and a compound unique index, and an
/// empty `logs.events` with no indexes.
fn fixture_snapshot() -> ClusterSnapshot {
    let mut snapshot = ClusterSnapshot::new();

    let mut shop = DatabaseSnapshot::new("shop", 65536, false);
    let mut orders = CollectionSnapshot::new("shop", "orders");
    orders.indexes = vec![
        normalize_index(
            &doc! { "v": 2_i32, "key": { "_id": 1_i32 }, "name": "_id_" },
            "shop.orders",
        ),
        normalize_index(
            &doc! {
                "v": 2_i32,
                "key": { "customer": 1_i32, "date": -1_i32 },
                "name": "customer_1_date_-1",
                "unique": true,
            },
            "shop.orders",
        ),
    ];
    orders.summary.total_indexes = orders.indexes.len() as u64;
    orders.summary.total_documents = 120;
    shop.summary.absorb_collection(&orders);
    shop.collections.push(orders);
    shop.stats.total_size = Some(4 * 1024 * 1024);
    snapshot.summary.absorb_database(&shop);
    snapshot.databases.push(shop);

    let mut logs = DatabaseSnapshot::new("logs", 8192, false);
    let events = CollectionSnapshot::new("logs", "events");
    logs.summary.absorb_collection(&events);
    logs.collections.push(events);
    snapshot.summary.absorb_database(&logs);
    snapshot.databases.push(logs);

    snapshot
}

#[test]
fn index_flat_export_contains_compound_unique_record() {
    let snapshot = fixture_snapshot();
    let export = build_index_export(&snapshot);

    let json = serde_json::to_value(&export).unwrap();
    assert_eq!(json["metadata"]["source"], "MongoDB");
    assert!(json["metadata"]["timestamp"].is_string());
    assert_eq!(json["options"], serde_json::json!({}));

    // Flatten order is database, then collection, then definition order.
    let indexes = json["indexes"].as_array().unwrap();
    assert_eq!(indexes.len(), 2);
    assert_eq!(indexes[0]["name"], "_id_");

    let compound = &indexes[1];
    assert_eq!(compound["name"], "customer_1_date_-1");
    assert_eq!(compound["unique"], true);
    assert_eq!(compound["ns"], "shop.orders");
    assert_eq!(
        compound["key"],
        serde_json::json!([["customer", 1], ["date", -1]])
    );
}

#[test]
fn summary_counters_match_children() {
    let snapshot = fixture_snapshot();

    let index_total: u64 = snapshot
        .databases
        .iter()
        .flat_map(|db| db.collections.iter())
        .map(|c| c.indexes.len() as u64)
        .sum();
    let collection_total: u64 = snapshot
        .databases
        .iter()
        .map(|db| db.collections.len() as u64)
        .sum();

    assert_eq!(snapshot.summary.total_indexes, index_total);
    assert_eq!(snapshot.summary.total_collections, collection_total);
    assert_eq!(snapshot.summary.total_databases, snapshot.databases.len() as u64);
}

#[test]
fn metadata_export_lists_empty_collection() {
    let snapshot = fixture_snapshot();
    let json = serde_json::to_value(&snapshot).unwrap();

    let logs = &json["databases"][1];
    assert_eq!(logs["name"], "logs");
    let events = &logs["collections"][0];
    assert_eq!(events["namespace"], "logs.events");
    assert_eq!(events["summary"]["totalDocuments"], 0);
    assert_eq!(events["indexes"], serde_json::json!([]));
    // failed/unfetched stats serialize as an empty object, not null
    assert_eq!(events["stats"], serde_json::json!({}));
}

#[test]
fn human_summary_uses_mb_and_stays_out_of_json() {
    let snapshot = fixture_snapshot();

    let mut json_out = Vec::new();
    serde_json::to_writer_pretty(&mut json_out, &snapshot).unwrap();
    let mut summary_out = Vec::new();
    write_summary(&snapshot, &mut summary_out).unwrap();

    let summary = String::from_utf8(summary_out).unwrap();
    assert!(summary.contains("Processed 2 databases"));
    assert!(summary.contains("Processed 2 collections"));
    assert!(summary.contains("Found 2 total indexes"));
    assert!(summary.contains("Total size: 4.00 MB"));
    assert!(summary.contains("- shop: 1 collections, 2 indexes, 4.00 MB"));

    // the structured stream parses standalone as a single JSON value
    let parsed: serde_json::Value =
        serde_json::from_slice(&json_out).expect("JSON stream must stay uncontaminated");
    assert!(parsed.get("databases").is_some());

    // raw byte counts in JSON, MB only in the human summary
    assert_eq!(parsed["summary"]["totalSize"], 4 * 1024 * 1024);
}

#[test]
fn sample_blocks_follow_committed_wire_format() {
    let mut writer = SampleStreamWriter::new(Vec::new(), "sample_data");

    let price = Decimal128::from_str("19.99").unwrap();
    writer
        .emit_batch(SampleBatch {
            database: "shop".to_string(),
            collection: "orders".to_string(),
            documents: vec![
                doc! {
                    "total": price,
                    "placed": DateTime::from_millis(1_700_000_000_000),
                    "receipt": Binary { subtype: BinarySubtype::Generic, bytes: vec![1, 2] },
                },
                doc! { "total": Decimal128::from_str("5.00").unwrap() },
            ],
        })
        .unwrap();

    let stats = writer.stats().clone();
    assert_eq!(stats.collections, 1);
    assert_eq!(stats.documents, 2);
    assert_eq!(stats.skipped, 0);
    assert_eq!(stats.partial_documents, 0);

    let output = String::from_utf8(writer.into_parts().1).unwrap();
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines.len(), 5);
    assert_eq!(
        lines[0],
        format!("{}sample_data/shop_orders_sample.json", FILE_START_MARKER)
    );
    assert_eq!(lines[3], FILE_END_MARKER);
    assert_eq!(
        lines[4],
        "# Metadata: database=shop, collection=orders, sample_size=2"
    );

    // each document line is strict Extended JSON, types preserved
    let first = mongocensus_core::ejson::decode_document(lines[1]).unwrap();
    assert!(matches!(
        first.get("total"),
        Some(mongodb::bson::Bson::Decimal128(_))
    ));
    assert!(matches!(
        first.get("receipt"),
        Some(mongodb::bson::Bson::Binary(_))
    ));
}

#[test]
fn empty_collection_emits_no_block_and_counts_skip() {
    let mut writer = SampleStreamWriter::new(Vec::new(), "sample_data");

    writer
        .emit_batch(SampleBatch {
            database: "logs".to_string(),
            collection: "events".to_string(),
            documents: Vec::new(),
        })
        .unwrap();

    assert_eq!(writer.stats().collections, 1);
    assert_eq!(writer.stats().skipped, 1);
    assert_eq!(writer.stats().documents, 0);

    let (_, out) = writer.into_parts();
    assert!(out.is_empty());
}

#[test]
fn stream_splits_back_into_one_file_per_collection() {
    // A line-oriented post-processor must be able to split the stream
    // using only the three markers.
    let mut writer = SampleStreamWriter::new(Vec::new(), "sample_data");
    for (db, coll) in [("shop", "orders"), ("shop", "customers")] {
        writer
            .emit_batch(SampleBatch {
                database: db.to_string(),
                collection: coll.to_string(),
                documents: vec![doc! { "from": format!("{}.{}", db, coll) }],
            })
            .unwrap();
    }

    let output = String::from_utf8(writer.into_parts().1).unwrap();

    let mut files: Vec<(String, Vec<String>)> = Vec::new();
    let mut current: Option<(String, Vec<String>)> = None;
    for line in output.lines() {
        if let Some(name) = line.strip_prefix(FILE_START_MARKER) {
            current = Some((name.to_string(), Vec::new()));
        } else if line == FILE_END_MARKER {
            files.push(current.take().unwrap());
        } else if let Some((_, lines)) = current.as_mut() {
            lines.push(line.to_string());
        }
    }

    assert_eq!(files.len(), 2);
    assert_eq!(files[0].0, "sample_data/shop_orders_sample.json");
    assert_eq!(files[1].0, "sample_data/shop_customers_sample.json");
    assert_eq!(files[0].1.len(), 1);
    assert_eq!(files[1].1.len(), 1);
}
