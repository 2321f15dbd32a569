use ontquery::ontology::{
    default_prefixes, display, CurieRegistry, DisplayStyle, IdSpec, Identifier, IdentifierError,
};
use proptest::prelude::*;

fn prefix_and_suffix() -> impl Strategy<Value = (String, String, String)> {
    let pairs: Vec<(String, String)> = default_prefixes().into_iter().collect();
    (prop::sample::select(pairs), "[A-Za-z0-9_]{1,12}")
        .prop_map(|((prefix, namespace), suffix)| (prefix, namespace, suffix))
}

proptest! {
    #[test]
    fn curie_and_iri_forms_agree((prefix, namespace, suffix) in prefix_and_suffix()) {
        let registry = CurieRegistry::with_defaults();
        let iri = format!("{namespace}{suffix}");

        let from_curie = Identifier::from_curie(&registry, &format!("{prefix}:{suffix}"))
            .expect("curie");
        let from_iri = Identifier::from_iri(&registry, &iri).expect("iri");
        let combined = Identifier::new(
            &registry,
            &IdSpec::new().prefix(prefix.as_str()).suffix(suffix.as_str()).iri(iri.as_str()),
        )
        .expect("combined");

        prop_assert_eq!(from_curie.iri(), iri.as_str());
        prop_assert_eq!(&from_curie, &from_iri);
        prop_assert_eq!(from_curie.curie(), from_iri.curie());
        prop_assert_eq!(combined.curie(), from_iri.curie());
    }

    #[test]
    fn disagreeing_forms_never_normalize(suffix in "[0-9]{1,7}", other in "[a-z]{1,8}") {
        let registry = CurieRegistry::with_defaults();
        let err = Identifier::new(
            &registry,
            &IdSpec::new()
                .curie(format!("UBERON:{suffix}"))
                .iri(format!("http://example.org/{other}")),
        )
        .expect_err("ambiguous");
        let is_ambiguous = matches!(err, IdentifierError::Ambiguous { .. });
        prop_assert!(is_ambiguous);
    }
}

#[test]
fn registry_decides_the_canonical_prefix() {
    let registry = CurieRegistry::with_defaults();
    let id = Identifier::parse(&registry, "obo:UBERON_0000955").expect("obo curie");

    assert_eq!(id.curie().as_deref(), Some("UBERON:0000955"));
    display::once(DisplayStyle::Curie);
    assert_eq!(id.to_string(), "UBERON:0000955");
}

#[test]
fn rotation_returns_to_the_start() {
    let start = display::style();
    for _ in 0..4 {
        display::rotate();
    }
    assert_eq!(display::style(), start);
}
