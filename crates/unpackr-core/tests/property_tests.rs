//! Property-based tests for entry name sanitization.
//!
//! These tests use proptest to generate arbitrary entry names and verify
//! the containment properties hold across a wide range of cases.

#![allow(clippy::expect_used)]

use proptest::prelude::*;
use unpackr_core::security::MAX_FILE_NAME_BYTES;
use unpackr_core::security::sanitize_entry;
use unpackr_core::security::sanitize_file_name;
use unpackr_core::types::OutputDir;
use unpackr_core::types::SanitizedEntry;

fn output_dir() -> OutputDir {
    OutputDir::new("/srv/unpackr/out").expect("absolute output dir")
}

proptest! {
    /// Whatever the name, an extracted path never leaves the output dir.
    #[test]
    fn prop_extracted_paths_stay_inside(
        parts in prop::collection::vec(
            prop_oneof!["[a-z]{1,8}", Just("..".to_string()), Just(".".to_string()), Just(String::new())],
            1..8
        ),
        backslash in any::<bool>(),
        absolute in any::<bool>(),
    ) {
        let separator = if backslash { "\\" } else { "/" };
        let mut name = parts.join(separator);
        if absolute {
            name.insert(0, '/');
        }

        let out = output_dir();
        if let Ok(SanitizedEntry::Extract(path)) = sanitize_entry(&name, &out) {
            prop_assert!(path.as_path().starts_with(out.as_path()));
            prop_assert_ne!(path.as_path(), out.as_path());
            prop_assert!(!path.as_path().components().any(|c| c.as_os_str() == ".."));
        }
    }

    /// Plain relative names are extracted under the output dir unchanged.
    #[test]
    fn prop_plain_names_accepted(
        components in prop::collection::vec("[a-zA-Z0-9_-]{1,20}", 1..5)
    ) {
        let name = components.join("/");
        let out = output_dir();
        let expected = out.as_path().join(&name);
        let entry = sanitize_entry(&name, &out).expect("plain name accepted");
        prop_assert_eq!(entry.path(), Some(expected.as_path()));
    }

    /// Sanitization is a pure function of the name.
    #[test]
    fn prop_sanitize_deterministic(name in "\\PC{0,80}") {
        let out = output_dir();
        let first = sanitize_entry(&name, &out).ok();
        let second = sanitize_entry(&name, &out).ok();
        prop_assert_eq!(first, second);
    }

    /// Cleaned file names are printable ASCII within the length limit.
    #[test]
    fn prop_file_name_printable_and_short(name in "[^/]{1,400}") {
        let cleaned = sanitize_file_name(&name);
        prop_assert!(cleaned.len() <= MAX_FILE_NAME_BYTES);
        prop_assert!(cleaned.bytes().all(|b| (0x20..0x7f).contains(&b)));
        prop_assert!(!cleaned.contains('/'));
    }
}
