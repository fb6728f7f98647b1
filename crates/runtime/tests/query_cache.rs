use std::sync::Arc;

use lingo_runtime::{Document, DocumentReader, ExtractError, QueryCache, QueryView};
use lingo_xpath::ErrorCode;

#[test]
fn compiling_twice_returns_the_same_object() {
    let cache = QueryCache::default();
    let first = cache.compile("/library/book[1]/title").unwrap();
    let second = cache.compile("/library/book[1]/title").unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(cache.len(), 1);
}

#[test]
fn size_tracks_distinct_expressions_only() {
    let doc = Document::parse("<r><a>1</a><b>2</b></r>").unwrap();
    let cache = QueryCache::default();
    let reader = DocumentReader::new(&doc, &cache);
    for _ in 0..25 {
        reader.resolve_single(&["/r/a"]).unwrap();
        reader.resolve_multi(&["/r/b"]).unwrap();
        reader.view().as_number("count(/r/*)", None).unwrap();
    }
    assert_eq!(cache.len(), 3);
}

#[test]
fn invalid_expressions_fail_at_compile_time_and_are_not_cached() {
    let cache = QueryCache::default();
    let err = cache.compile("/a[").unwrap_err();
    let ExtractError::InvalidExpression { expression, source } = err else { panic!("unexpected error: {err}") };
    assert_eq!(expression, "/a[");
    assert_eq!(source.code, ErrorCode::XPST0003);
    assert!(matches!(cache.compile("/p:a"), Err(ExtractError::InvalidExpression { .. })));
    assert!(cache.is_empty());
}

#[test]
fn changing_the_default_namespace_invalidates() {
    let doc = Document::parse(r#"<r xmlns="urn:books"><title>Dune</title></r>"#).unwrap();
    let mut cache = QueryCache::default();

    let before = cache.compile("/r/title").unwrap();
    assert_eq!(QueryView::new(&doc, &cache).as_string("/r/title", None).unwrap(), "");

    cache.set_default_namespace(Some("urn:books"));
    assert!(cache.is_empty());
    assert_eq!(cache.default_namespace(), Some("urn:books"));

    let after = cache.compile("/r/title").unwrap();
    assert!(!Arc::ptr_eq(&before, &after));
    assert_eq!(QueryView::new(&doc, &cache).as_string("/r/title", None).unwrap(), "Dune");
}

#[test]
fn setting_the_same_namespace_keeps_entries() {
    let mut cache = QueryCache::default();
    cache.set_default_namespace(Some("urn:a"));
    cache.compile("/a").unwrap();
    cache.set_default_namespace(Some("urn:a"));
    assert_eq!(cache.len(), 1);
    cache.set_default_namespace(Some(""));
    assert!(cache.is_empty());
    assert_eq!(cache.default_namespace(), None);
}

#[test]
fn concurrent_compiles_agree_on_one_entry() {
    let cache = QueryCache::default();
    let expressions = ["/a", "/a/b", "//c[@d]", "count(//e)"];
    std::thread::scope(|scope| {
        for _ in 0..8 {
            scope.spawn(|| {
                for expr in expressions {
                    cache.compile(expr).unwrap();
                }
            });
        }
    });
    assert_eq!(cache.len(), expressions.len());
    let again = cache.compile("/a/b").unwrap();
    assert!(Arc::ptr_eq(&again, &cache.compile("/a/b").unwrap()));
}
