// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use settingsync::{Value, ValueKind};

#[derive(Arbitrary, Debug)]
enum Kind {
    Bool,
    Int,
    Double,
    String,
    StringList,
}

#[derive(Arbitrary, Debug)]
struct Input<'a> {
    kind: Kind,
    text: &'a str,
}

fuzz_target!(|input: Input<'_>| {
    let kind = match input.kind {
        Kind::Bool => ValueKind::Bool,
        Kind::Int => ValueKind::Int,
        Kind::Double => ValueKind::Double,
        Kind::String => ValueKind::String,
        Kind::StringList => ValueKind::StringList,
    };

    if let Ok(value) = kind.parse_value(input.text) {
        assert_eq!(value.kind(), Some(kind));
        // Parsed values keep their kind through the store encoding
        let json = serde_json::to_string(&value).unwrap();
        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(back.kind(), value.kind());
    }

    // Arbitrary stored text must never panic the decoder
    let _ = serde_json::from_str::<Value>(input.text);
});
