use indexmap::IndexMap;
use lingo_runtime::{Document, DocumentReader, EngineConfig, ExtractError, Locale, QueryCache};
use rstest::{fixture, rstest};

const RECORD: &str = r#"<record xml:lang="en">
  <title>English Title</title>
  <title xml:lang="de">Deutscher Titel</title>
  <title xml:lang="fr-CA">Titre</title>
  <alt></alt>
  <subject xml:lang="de">Geschichte</subject>
  <subject>History</subject>
  <subject>Politics</subject>
  <identifier type="isbn">978-3</identifier>
  <identifier type="doi">10.1/x</identifier>
  <identifier type="isbn">978-4</identifier>
  <identifier>untyped</identifier>
</record>"#;

#[fixture]
fn record() -> Document {
    Document::parse(RECORD).unwrap()
}

fn locales<V>(map: &IndexMap<Locale, V>) -> Vec<String> {
    map.keys().map(ToString::to_string).collect()
}

#[rstest]
fn single_takes_the_first_value_of_the_first_locale(record: Document) {
    let cache = QueryCache::default();
    let reader = DocumentReader::new(&record, &cache);
    assert_eq!(reader.resolve_single(&["/record/missing", "/record/title"]).unwrap().as_deref(), Some("English Title"));
    assert_eq!(reader.resolve_single(&["/record/missing"]).unwrap(), None);
    assert_eq!(reader.resolve_single::<&str>(&[]).unwrap(), None);
}

#[rstest]
fn an_empty_match_still_wins(record: Document) {
    let cache = QueryCache::default();
    let reader = DocumentReader::new(&record, &cache);
    let value = reader.resolve_single(&["/record/missing", "/record/alt", "/record/title"]).unwrap();
    assert_eq!(value.as_deref(), Some(""));
}

#[rstest]
fn members_are_tried_in_order_until_one_matches(record: Document) {
    let cache = QueryCache::default();
    let reader = DocumentReader::new(&record, &cache);
    reader.resolve_multi(&["/record/a", "/record/b", "/record/subject", "/record/title", "/record/c"]).unwrap();
    // Members after the first match are never compiled.
    assert_eq!(cache.len(), 3);
    assert!(cache.compile("/record/subject").is_ok());
    assert_eq!(cache.len(), 3);
}

#[rstest]
fn multi_collects_values_across_locales(record: Document) {
    let cache = QueryCache::default();
    let reader = DocumentReader::new(&record, &cache);
    assert_eq!(reader.resolve_multi(&["/record/subject"]).unwrap(), ["Geschichte", "History", "Politics"]);
}

#[rstest]
fn localized_uses_the_matched_node_language(record: Document) {
    let cache = QueryCache::default();
    let reader = DocumentReader::new(&record, &cache);
    let titles = reader.resolve_localized(&["/record/title"]).unwrap();
    assert_eq!(locales(&titles), ["und", "de", "fr"]);
    assert_eq!(titles[&Locale::parse("fr")], "Titre");
    assert_eq!(titles[&Locale::ROOT], "English Title");
}

#[rstest]
fn inherited_language_comes_from_ancestors(record: Document) {
    let config = EngineConfig::from_json_str(r#"{ "inherit_lang": true }"#).unwrap();
    let cache = config.query_cache();
    let reader = DocumentReader::with_config(&record, &cache, &config);

    let titles = reader.resolve_localized(&["/record/title"]).unwrap();
    assert_eq!(locales(&titles), ["en", "de", "fr"]);

    let subjects = reader.resolve_localized_multi(&["/record/subject"]).unwrap();
    assert_eq!(subjects[&Locale::parse("de")], ["Geschichte"]);
    assert_eq!(subjects[&Locale::parse("en")], ["History", "Politics"]);
}

#[rstest]
fn attribute_matches_take_the_language_of_their_element(record: Document) {
    let cache = QueryCache::default();
    let reader = DocumentReader::new(&record, &cache);
    let langs = reader.resolve_localized(&["/record/title/@xml:lang"]).unwrap();
    assert_eq!(langs[&Locale::parse("de")], "de");
    assert_eq!(langs[&Locale::parse("fr")], "fr-CA");
}

#[rstest]
fn keyed_maps(record: Document) {
    let cache = QueryCache::default();
    let reader = DocumentReader::new(&record, &cache);

    let single = reader.resolve_keyed_map(&["/record/identifier"], "./@type").unwrap();
    assert_eq!(single.len(), 2);
    assert_eq!(single["isbn"], "978-3");
    assert_eq!(single["doi"], "10.1/x");

    let multi = reader.resolve_keyed_map_multi(&["/record/identifier"], "./@type").unwrap();
    assert_eq!(multi["isbn"], ["978-3", "978-4"]);
    assert_eq!(multi.keys().collect::<Vec<_>>(), ["isbn", "doi"]);

    let nodes = reader.resolve_keyed_map_nodes(&["/record/identifier"], "./@type").unwrap();
    assert_eq!(nodes["doi"].local_name(), "identifier");
    assert_eq!(nodes["isbn"].string_value(), "978-3");
}

#[rstest]
fn key_paths_must_be_relative(record: Document) {
    let cache = QueryCache::default();
    let reader = DocumentReader::new(&record, &cache);
    let err = reader.resolve_keyed_map(&["/record/none"], "@type").unwrap_err();
    let ExtractError::Resolution { expression, .. } = &err else { panic!("unexpected error: {err}") };
    assert_eq!(expression, "@type");
    assert!(matches!(err.root_cause(), ExtractError::InvalidRelativeExpression(_)));
}

#[rstest]
fn root_paths_expand_every_member(record: Document) {
    let config = EngineConfig::from_json_str(r#"{ "root_paths": ["/nothing", "/record"] }"#).unwrap();
    let cache = config.query_cache();
    let reader = DocumentReader::with_config(&record, &cache, &config);
    assert_eq!(reader.resolve_single(&["/title[@xml:lang = 'de']"]).unwrap().as_deref(), Some("Deutscher Titel"));
    assert_eq!(reader.resolve_multi(&["/subject"]).unwrap().len(), 3);

    let roots = vec!["/record/subject".to_string(), "/record/title".to_string()];
    let reader = DocumentReader::new(&record, &cache).with_root_paths(&roots);
    // Both expansions match, so both contribute.
    assert_eq!(reader.resolve_multi(&["[@xml:lang = 'de']"]).unwrap(), ["Geschichte", "Deutscher Titel"]);
}

#[rstest]
fn failing_expressions_are_reported_with_their_text(record: Document) {
    let cache = QueryCache::default();
    let reader = DocumentReader::new(&record, &cache);
    // Never reached, so never compiled.
    assert!(reader.resolve_single(&["/record/title", "/record/["]).is_ok());

    let err = reader.resolve_single(&["/record/none", "/record/["]).unwrap_err();
    match &err {
        ExtractError::Resolution { expression, .. } => assert_eq!(expression, "/record/["),
        other => panic!("unexpected error: {other}"),
    }
    assert!(matches!(err.root_cause(), ExtractError::InvalidExpression { .. }));
}

#[test]
fn keyless_matches_still_win_the_expression_list() {
    let doc = Document::parse("<r><a>1</a><b><k>key</k>2</b></r>").unwrap();
    let cache = QueryCache::default();
    let reader = DocumentReader::new(&doc, &cache);
    assert!(reader.resolve_keyed_map(&["/r/a", "/r/b"], "./k").unwrap().is_empty());
    let map = reader.resolve_keyed_map(&["/r/b"], "./k").unwrap();
    assert_eq!(map["key"], "key2");
}
