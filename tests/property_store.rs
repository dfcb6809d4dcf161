//! Property-based tests for store and archive invariants.
//!
//! Uses proptest to verify round-trip and ordering guarantees across
//! many randomly generated datasets.

use proptest::collection::{btree_map, vec as prop_vec};
use proptest::prelude::*;
use qwick::{
    archive, build_with_options, BuildOptions, Compression, Database, MemTable, Value, ZstdLevel,
};
use std::collections::BTreeMap;
use tempfile::tempdir;

fn arb_options() -> impl Strategy<Value = BuildOptions> {
    (
        prop_oneof![
            Just(Compression::Auto),
            Just(Compression::Zstd),
            Just(Compression::S2),
        ],
        prop_oneof![
            Just(ZstdLevel::Fastest),
            Just(ZstdLevel::Default),
            Just(ZstdLevel::Better),
        ],
        prop_oneof![Just(0usize), Just(16), Just(256)],
    )
        .prop_map(|(compression, zstd_level, size_cutover)| BuildOptions {
            compression,
            zstd_level,
            size_cutover,
        })
}

proptest! {
    #[test]
    fn prop_round_trip(
        entries in btree_map(
            prop_vec(any::<u8>(), 0..24),
            prop_vec(any::<u8>(), 0..512),
            0..32,
        ),
        opts in arb_options(),
    ) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("prop.qwick");

        let mut table = MemTable::new();
        for (k, v) in &entries {
            table.insert(k.clone(), v.clone());
        }
        build_with_options(&table, &path, opts).unwrap();

        let db = Database::open(&path).unwrap();
        prop_assert_eq!(db.len(), entries.len());

        let mut scratch = Vec::new();
        for (k, v) in &entries {
            let found = db.find(k, &mut scratch).unwrap();
            prop_assert_eq!(found, Some(v.as_slice()));
            prop_assert!(db.get_raw(k).unwrap().is_some());
        }

        // A key guaranteed absent: longer than any generated key.
        let absent = vec![0u8; 64];
        prop_assert!(db.find(&absent, &mut scratch).unwrap().is_none());
    }

    #[test]
    fn prop_prefix_soundness(
        keys in proptest::collection::btree_set(
            prop_vec(prop_oneof![Just(b'a'), Just(b'b'), Just(b'c')], 0..6),
            0..24,
        ),
        prefix in prop_vec(prop_oneof![Just(b'a'), Just(b'b'), Just(b'c')], 0..4),
    ) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("prefix.qwick");

        let mut table = MemTable::new();
        let mut model = BTreeMap::new();
        for key in &keys {
            table.insert(key.clone(), Value::Bytes(key.clone()));
            model.insert(key.clone(), key.clone());
        }
        build_with_options(&table, &path, BuildOptions::default()).unwrap();

        let db = Database::open(&path).unwrap();
        let mut scratch = Vec::new();
        let mut visited = Vec::new();
        db.prefix(&prefix, &mut scratch, |k, v| {
            visited.push((k.to_vec(), v.to_vec()));
            true
        })
        .unwrap();

        let expected: Vec<(Vec<u8>, Vec<u8>)> = model
            .iter()
            .filter(|(k, _)| k.starts_with(&prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        prop_assert_eq!(visited, expected);
    }

    #[test]
    fn prop_prefix_early_stop(
        count in 1usize..20,
        stop_after in 1usize..20,
    ) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stop.qwick");

        let mut table = MemTable::new();
        for i in 0..count {
            table.insert(format!("k{i:03}"), format!("v{i}"));
        }
        build_with_options(&table, &path, BuildOptions::default()).unwrap();

        let db = Database::open(&path).unwrap();
        let mut seen = 0usize;
        db.prefix_raw(b"k", |_, _| {
            seen += 1;
            seen < stop_after
        })
        .unwrap();
        prop_assert_eq!(seen, stop_after.min(count));
    }

    #[test]
    fn prop_archive_round_trip(data in prop_vec(any::<u8>(), 0..4096)) {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src");
        let enc = dir.path().join("enc");
        let dec = dir.path().join("dec");

        std::fs::write(&src, &data).unwrap();
        let key = [0x42u8; 32];
        archive::encrypt(&enc, &src, &key).unwrap();
        archive::decrypt(&dec, &enc, &key).unwrap();
        prop_assert_eq!(std::fs::read(&dec).unwrap(), data);
    }

    #[test]
    fn prop_archive_tamper_evidence(
        data in prop_vec(any::<u8>(), 1..2048),
        flip_bit in 0usize..8,
        position in any::<prop::sample::Index>(),
    ) {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src");
        let enc = dir.path().join("enc");

        std::fs::write(&src, &data).unwrap();
        let key = [0x42u8; 32];
        archive::encrypt(&enc, &src, &key).unwrap();

        let mut bytes = std::fs::read(&enc).unwrap();
        let index = position.index(bytes.len());
        bytes[index] ^= 1 << flip_bit;
        std::fs::write(&enc, &bytes).unwrap();

        // Any single-bit flip must be detected (as an authentication
        // failure, or as truncation when the length field grew).
        let result = archive::decrypt(dir.path().join("dec"), &enc, &key);
        prop_assert!(matches!(
            result,
            Err(qwick::QwickError::AuthenticationFailed)
                | Err(qwick::QwickError::Truncated(_))
        ));
    }
}
