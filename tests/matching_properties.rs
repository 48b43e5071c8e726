//! Algebraic properties of references and selection keys.

use statx_core::{Key, KeyBuilder, ResourceRef};

#[test]
fn ref_round_trip_normalizes_elision_to_wildcards() {
    for text in ["ECB,EXR,1.0", "EXR", "all,EXR,latest", ",EXR,"] {
        let parsed = ResourceRef::parse(text).expect("ref should parse");
        let reparsed = ResourceRef::parse(&parsed.to_string()).expect("round trip");
        assert_eq!(parsed, reparsed, "round trip of '{text}'");
    }

    assert_eq!(
        ResourceRef::parse("EXR").expect("ref should parse").to_string(),
        "all,EXR,latest"
    );
}

#[test]
fn ref_containment_is_reflexive() {
    for text in ["ECB,EXR,1.0", "EXR", "all,EXR,1.0", "ECB,EXR,latest"] {
        let parsed = ResourceRef::parse(text).expect("ref should parse");
        assert!(parsed.contains(&parsed), "'{text}' should contain itself");
    }
}

#[test]
fn strict_ref_containment_is_antisymmetric() {
    let pairs = [
        ("EXR", "ECB,EXR,1.0"),
        ("ECB,EXR,latest", "ECB,EXR,1.0"),
        ("all,EXR,1.0", "ECB,EXR,1.0"),
    ];

    for (general_text, specific_text) in pairs {
        let general = ResourceRef::parse(general_text).expect("ref should parse");
        let specific = ResourceRef::parse(specific_text).expect("ref should parse");

        assert!(general.contains(&specific));
        assert_ne!(general, specific);
        assert!(
            !specific.contains(&general),
            "'{specific_text}' must not contain '{general_text}'"
        );
    }
}

#[test]
fn key_round_trip_modulo_wildcard_spelling() {
    for text in ["LOCSTL04.AUS.M", "A..M", "A+B.X.", "all"] {
        let key = Key::parse(text);
        assert_eq!(Key::parse(&key.to_string()), key, "round trip of '{text}'");
    }

    assert_eq!(Key::parse("A.*.M"), Key::parse("A..M"));
}

#[test]
fn key_accessor_examples() {
    assert_eq!(Key::of(["LOCSTL04", "AUS", "M"]).to_string(), "LOCSTL04.AUS.M");
    assert_eq!(Key::parse("LOCSTL04..M").get(1), Some(""));
    assert!(Key::parse("LOCSTL04.AUS.M").is_series());
    assert!(!Key::parse("LOCSTL04..M").is_series());
}

#[test]
fn key_containment_laws() {
    let all = Key::all();
    let partial = Key::parse("A..M");
    let series = Key::parse("A.X.M");

    assert!(all.contains(&partial));
    assert!(all.contains(&series));
    assert!(partial.contains(&series));
    assert!(!series.contains(&partial));

    assert!(partial.supersedes(&series));
    assert!(!partial.supersedes(&partial));
}

#[test]
fn builder_maps_ids_to_positions_and_keeps_width() {
    let mut builder = KeyBuilder::new(["FREQ", "REF_AREA", "SUBJECT"]);
    builder.put("SUBJECT", "LOCSTL04").expect("dimension known");
    builder.put("FREQ", "M").expect("dimension known");

    let key = builder.build();
    assert_eq!(key.size(), 3);
    assert_eq!(key.to_string(), "M..LOCSTL04");

    builder.clear();
    assert_eq!(builder.build().to_string(), "..");
}
