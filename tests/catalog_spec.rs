use std::io::Write;

use mo_reader::{export_catalog, Endianness, MemSource, MoError, MoReader};

/// Little fixture compiler: builds a catalog image from (original,
/// translation) pairs, in either byte order. Entries are sorted by raw
/// key bytes, which is the order the format requires of the originals
/// table.
fn build_catalog(entries: &[(&[u8], &[u8])], big_endian: bool) -> Vec<u8> {
    let mut sorted: Vec<(&[u8], &[u8])> = entries.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let n = sorted.len() as u32;
    let header_size = 20u32;
    let orig_tab_offset = header_size;
    let trans_tab_offset = orig_tab_offset + n * 8;
    let strings_offset = trans_tab_offset + n * 8;

    let word = |value: u32| -> [u8; 4] {
        if big_endian {
            value.to_be_bytes()
        } else {
            value.to_le_bytes()
        }
    };

    let mut string_data = Vec::new();
    let mut orig_table = Vec::new();
    let mut trans_table = Vec::new();

    for (original, translation) in &sorted {
        for (bytes, table) in [(original, &mut orig_table), (translation, &mut trans_table)] {
            let length = bytes.len() as u32;
            // Zero-length slots carry a junk offset on purpose: the
            // length is authoritative and the offset must never be
            // dereferenced.
            let offset = if length == 0 {
                0xdead_beef
            } else {
                strings_offset + string_data.len() as u32
            };
            table.extend_from_slice(&word(length));
            table.extend_from_slice(&word(offset));
            string_data.extend_from_slice(bytes);
            string_data.push(0);
        }
    }

    let mut data = Vec::new();
    if big_endian {
        data.extend_from_slice(&[0x95, 0x04, 0x12, 0xde]);
    } else {
        data.extend_from_slice(&[0xde, 0x12, 0x04, 0x95]);
    }
    data.extend_from_slice(&word(0)); // revision
    data.extend_from_slice(&word(n));
    data.extend_from_slice(&word(orig_tab_offset));
    data.extend_from_slice(&word(trans_tab_offset));
    data.extend_from_slice(&orig_table);
    data.extend_from_slice(&trans_table);
    data.extend_from_slice(&string_data);
    data
}

const METADATA: &[u8] = b"Project-Id-Version: demo\n\
Content-Type: text/plain; charset=UTF-8\n\
Plural-Forms: nplurals=2; plural=n != 1;\n";

fn german_entries() -> Vec<(&'static [u8], &'static [u8])> {
    vec![
        (b"".as_ref(), METADATA),
        (b"Open file".as_ref(), b"Datei \xc3\xb6ffnen".as_ref()),
        (b"Save".as_ref(), b"Speichern".as_ref()),
        (b"empty translation".as_ref(), b"".as_ref()),
        (
            b"one item\x00%d items".as_ref(),
            b"ein Element\x00%d Elemente".as_ref(),
        ),
        (b"menu\x04Open".as_ref(), b"\xc3\x96ffnen".as_ref()),
        (
            b"menu\x04one entry\x00%d entries".as_ref(),
            b"ein Eintrag\x00%d Eintr\xc3\xa4ge".as_ref(),
        ),
    ]
}

fn reader_for(bytes: Vec<u8>, enable_cache: bool) -> MoReader {
    MoReader::new(Box::new(MemSource::new(bytes)), enable_cache)
}

fn german_reader(enable_cache: bool) -> MoReader {
    reader_for(build_catalog(&german_entries(), false), enable_cache)
}

#[test]
fn translate_hits_and_misses() {
    for enable_cache in [true, false] {
        let reader = german_reader(enable_cache);
        assert_eq!(reader.translate("Open file"), "Datei öffnen");
        assert_eq!(reader.translate("Save"), "Speichern");
        assert_eq!(reader.translate("empty translation"), "");
        // Misses echo the input.
        assert_eq!(reader.translate("Close"), "Close");
        assert_eq!(reader.translate(""), String::from_utf8_lossy(METADATA));
    }
}

#[test]
fn cache_and_search_modes_agree() {
    let cached = german_reader(true);
    let searched = german_reader(false);

    let mut probes: Vec<String> = german_entries()
        .iter()
        .map(|(original, _)| String::from_utf8_lossy(original).into_owned())
        .collect();
    probes.extend(["Close", "", "zzz", "A", "one item"].map(String::from));

    for probe in &probes {
        assert_eq!(
            cached.translate(probe),
            searched.translate(probe),
            "modes disagree on {:?}",
            probe
        );
    }
}

#[test]
fn both_byte_orders_decode_identically() {
    for big_endian in [false, true] {
        let bytes = build_catalog(&german_entries(), big_endian);
        let reader = reader_for(bytes, true);
        assert_eq!(
            reader.endianness(),
            Some(if big_endian {
                Endianness::Big
            } else {
                Endianness::Little
            })
        );
        assert_eq!(reader.translate("Open file"), "Datei öffnen");
        assert_eq!(reader.translate_plural("one item", "%d items", 5), "%d Elemente");
    }
}

#[test]
fn plural_lookup_selects_stored_forms() {
    for enable_cache in [true, false] {
        let reader = german_reader(enable_cache);
        assert_eq!(
            reader.translate_plural("one item", "%d items", 1),
            "ein Element"
        );
        assert_eq!(
            reader.translate_plural("one item", "%d items", 5),
            "%d Elemente"
        );
        assert_eq!(
            reader.translate_plural("one item", "%d items", 0),
            "%d Elemente"
        );
        // Miss: plain n != 1 fallback.
        assert_eq!(reader.translate_plural("one fish", "%d fish", 1), "one fish");
        assert_eq!(reader.translate_plural("one fish", "%d fish", 3), "%d fish");
    }
}

#[test]
fn slavic_rule_routes_to_three_forms() {
    let metadata: &[u8] =
        b"Content-Type: text/plain; charset=UTF-8\n\
          Plural-Forms: nplurals=3; plural=(n==1)?0:((n>=2&&n<=4)?1:2);\n";
    let entries: Vec<(&[u8], &[u8])> = vec![
        (b"".as_ref(), metadata),
        (
            b"one file\x00%d files".as_ref(),
            b"jeden soubor\x00%d soubory\x00%d soubor\xc5\xaf".as_ref(),
        ),
    ];
    for big_endian in [false, true] {
        let reader = reader_for(build_catalog(&entries, big_endian), true);
        assert_eq!(reader.plural_rule().nplurals, 3);
        assert_eq!(reader.translate_plural("one file", "%d files", 1), "jeden soubor");
        assert_eq!(reader.translate_plural("one file", "%d files", 2), "%d soubory");
        assert_eq!(reader.translate_plural("one file", "%d files", 5), "%d souborů");
    }
}

#[test]
fn plural_index_clamps_to_stored_forms() {
    // Rule promises three forms but the entry only stores two.
    let metadata: &[u8] = b"Plural-Forms: nplurals=3; plural=(n==1)?0:((n>=2&&n<=4)?1:2);\n";
    let entries: Vec<(&[u8], &[u8])> = vec![
        (b"".as_ref(), metadata),
        (
            b"one file\x00%d files".as_ref(),
            b"jeden soubor\x00%d soubory".as_ref(),
        ),
    ];
    let reader = reader_for(build_catalog(&entries, false), true);
    assert_eq!(reader.translate_plural("one file", "%d files", 5), "%d soubory");
}

#[test]
fn context_lookups() {
    for enable_cache in [true, false] {
        let reader = german_reader(enable_cache);
        assert_eq!(reader.translate_context("menu", "Open"), "Öffnen");
        // Unknown context: the echoed key still carries 0x04, so the
        // bare message comes back.
        assert_eq!(reader.translate_context("dialog", "Open"), "Open");
        assert_eq!(reader.translate_context("menu", "Close"), "Close");

        assert_eq!(
            reader.translate_context_plural("menu", "one entry", "%d entries", 1),
            "ein Eintrag"
        );
        assert_eq!(
            reader.translate_context_plural("menu", "one entry", "%d entries", 4),
            "%d Einträge"
        );
        // Miss with n != 1 falls back to the bare plural.
        assert_eq!(
            reader.translate_context_plural("dialog", "one entry", "%d entries", 4),
            "%d entries"
        );
        // Miss with n == 1 echoes the context key, caught by the sentinel.
        assert_eq!(
            reader.translate_context_plural("dialog", "one entry", "%d entries", 1),
            "one entry"
        );
    }
}

#[test]
fn genuine_translation_containing_separator_is_dropped() {
    // Documented ambiguity: a real translation containing 0x04 trips the
    // unresolved-key sentinel and the bare message wins.
    let entries: Vec<(&[u8], &[u8])> = vec![
        (b"".as_ref(), b"Plural-Forms: nplurals=2; plural=n!=1;\n".as_ref()),
        (b"menu\x04Weird".as_ref(), b"Str\x04ange".as_ref()),
    ];
    let reader = reader_for(build_catalog(&entries, false), true);
    assert_eq!(reader.translate_context("menu", "Weird"), "Weird");
}

#[test]
fn bad_magic_enters_passthrough() {
    let reader = reader_for(b"PK\x03\x04 definitely not a catalog".to_vec(), true);
    assert!(reader.is_passthrough());
    assert!(matches!(
        reader.catalog_error(),
        Some(MoError::BadMagic([0x50, 0x4b, 0x03, 0x04]))
    ));
    assert_eq!(reader.translate("x"), "x");
    assert_eq!(reader.translate_plural("one", "many", 1), "one");
    assert_eq!(reader.translate_plural("one", "many", 7), "many");
    assert_eq!(reader.translate_context("c", "msg"), "msg");
    assert_eq!(reader.translate_context_plural("c", "one", "many", 2), "many");
}

#[test]
fn truncated_source_enters_passthrough() {
    let reader = reader_for(vec![0xde, 0x12], true);
    assert!(reader.is_passthrough());
    assert!(matches!(
        reader.catalog_error(),
        Some(MoError::TruncatedRead { .. })
    ));
    assert_eq!(reader.translate("hello"), "hello");
}

#[test]
fn explicit_passthrough_reader() {
    let reader = MoReader::passthrough();
    assert!(reader.is_passthrough());
    assert!(reader.catalog_error().is_none());
    assert_eq!(reader.translate("hello"), "hello");
}

#[test]
fn missing_plural_forms_defaults_to_english_rule() {
    let entries: Vec<(&[u8], &[u8])> = vec![
        (b"".as_ref(), b"Content-Type: text/plain; charset=UTF-8\n".as_ref()),
        (
            b"one item\x00%d items".as_ref(),
            b"uno\x00muchos".as_ref(),
        ),
    ];
    for enable_cache in [true, false] {
        let reader = reader_for(build_catalog(&entries, false), enable_cache);
        let rule = reader.plural_rule();
        assert_eq!(rule.nplurals, 2);
        assert_eq!(rule.select(0), 1);
        assert_eq!(rule.select(1), 0);
        assert_eq!(rule.select(2), 1);
        assert_eq!(reader.translate_plural("one item", "%d items", 1), "uno");
        assert_eq!(reader.translate_plural("one item", "%d items", 9), "muchos");
    }
}

#[test]
fn file_backed_catalog() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("demo.mo");
    std::fs::write(&path, build_catalog(&german_entries(), false)).expect("write catalog");

    let reader = MoReader::open(&path);
    assert!(!reader.is_passthrough());
    assert_eq!(reader.translate("Save"), "Speichern");

    let searched = MoReader::open_with_cache(&path, false);
    assert_eq!(searched.translate("Save"), "Speichern");

    let missing = MoReader::open(dir.path().join("nope.mo"));
    assert!(missing.is_passthrough());
    assert!(matches!(missing.catalog_error(), Some(MoError::Io(_))));
    assert_eq!(missing.translate("Save"), "Save");
}

#[test]
fn export_transcodes_and_tags_metadata() {
    let metadata: &[u8] =
        b"Content-Type: text/plain; charset=ISO-8859-1\n\
          Plural-Forms: nplurals=2; plural=n != 1;\n";
    let entries: Vec<(&[u8], &[u8])> = vec![
        (b"".as_ref(), metadata),
        (b"coffee".as_ref(), b"caf\xe9".as_ref()), // latin-1 e-acute
    ];
    let reader = reader_for(build_catalog(&entries, false), true);

    let mut out = Vec::new();
    export_catalog(&reader, &mut out).expect("export");

    let json: serde_json::Value = serde_json::from_slice(&out).expect("valid json");
    assert_eq!(json["meta"]["revision"], 0);
    assert_eq!(json["meta"]["total_strings"], 2);
    assert_eq!(json["meta"]["table_size"], 2);
    assert_eq!(json["meta"]["format_version"], "A");
    assert_eq!(json["meta"]["encoding"], "UTF-8");
    assert_eq!(json["entries"]["coffee"], "café");
}

#[test]
fn export_requires_a_catalog_and_a_cache() {
    let mut out = Vec::new();
    assert!(matches!(
        export_catalog(&MoReader::passthrough(), &mut out),
        Err(MoError::Export(_))
    ));
    let searched = german_reader(false);
    assert!(matches!(
        export_catalog(&searched, &mut out),
        Err(MoError::Export(_))
    ));
    assert!(out.is_empty());
    // Sanity: the sink itself still works.
    out.write_all(b"ok").unwrap();
}
