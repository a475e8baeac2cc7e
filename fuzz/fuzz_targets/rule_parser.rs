#![no_main]

use bro_awk::fields::{FieldIndex, Record};
use bro_awk::filters::{Filter, ValueMatch};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    // "<rule>\n<row>": parsing and evaluating must never panic
    let (rule, row) = text.split_once('\n').unwrap_or((text, ""));
    let Ok(filter) = Filter::parse(rule) else {
        return;
    };

    let index = FieldIndex::from_header(filter.fields().iter().cloned());
    for value_match in [ValueMatch::All, ValueMatch::Any] {
        let compiled = filter
            .compile(&index, value_match)
            .expect("header built from the rule's own fields");
        let _ = compiled.passes(&Record::parse(row.as_bytes()));
    }
});
