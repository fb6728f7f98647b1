use lingo_runtime::{Document, ExtractError, QueryCache, QueryView};
use lingo_xpath::ErrorCode;
use rstest::{fixture, rstest};

const CATALOG: &str = r#"<catalog>
  <item id="1"><name>  Alpha  </name><price>2.5</price></item>
  <item id="2"><name>Beta</name><price>4</price></item>
</catalog>"#;

#[fixture]
fn catalog() -> Document {
    Document::parse(CATALOG).unwrap()
}

#[rstest]
fn nodes_by_position(catalog: Document) {
    let cache = QueryCache::default();
    let view = QueryView::new(&catalog, &cache);

    let first = view.as_node("/catalog/item", None).unwrap().unwrap();
    assert_eq!(first.attribute(None, "id"), Some("1"));
    let second = view.as_node_at("/catalog/item", 1, None).unwrap().unwrap();
    assert_eq!(second.attribute(None, "id"), Some("2"));
    assert!(view.as_node_at("/catalog/item", 2, None).unwrap().is_none());
    assert!(view.as_node("/catalog/missing", None).unwrap().is_none());

    let all = view.as_node_list("//name | //item", None).unwrap();
    let names: Vec<&str> = all.iter().map(|n| n.local_name()).collect();
    assert_eq!(names, ["item", "name", "item", "name"]);
}

#[rstest]
#[case("/catalog/item/name", "Alpha")]
#[case("/catalog/item[2]/name", "Beta")]
#[case("/catalog/nothing", "")]
#[case("concat(' ', //item[2]/@id, ' ')", "2")]
fn strings_are_trimmed(catalog: Document, #[case] expr: &str, #[case] expected: &str) {
    let cache = QueryCache::default();
    assert_eq!(QueryView::new(&catalog, &cache).as_string(expr, None).unwrap(), expected);
}

#[rstest]
fn numbers_and_booleans(catalog: Document) {
    let cache = QueryCache::default();
    let view = QueryView::new(&catalog, &cache);
    assert!((view.as_number("sum(//price)", None).unwrap() - 6.5).abs() < f64::EPSILON);
    assert!(view.as_number("//name", None).unwrap().is_nan());
    assert!(view.as_boolean("count(//item) = 2", None).unwrap());
    assert!(!view.as_boolean("//missing", None).unwrap());
}

#[rstest]
fn relative_queries_need_a_leading_dot(catalog: Document) {
    let cache = QueryCache::default();
    let view = QueryView::new(&catalog, &cache);
    let item = view.as_node_at("//item", 1, None).unwrap().unwrap();

    let names = view.relative(item, "./name").unwrap();
    assert_eq!(names.len(), 1);
    assert_eq!(names[0].string_value(), "Beta");
    assert_eq!(view.as_string("./price", Some(item)).unwrap(), "4");

    let err = view.relative(item, "name").unwrap_err();
    assert!(matches!(err, ExtractError::InvalidRelativeExpression(e) if e == "name"));
}

#[rstest]
fn nodes_of_other_documents_are_rejected(catalog: Document) {
    let other = Document::parse(CATALOG).unwrap();
    let cache = QueryCache::default();
    let view = QueryView::new(&catalog, &cache);
    let foreign = other.root_element().unwrap();
    assert!(matches!(view.as_string("./item", Some(foreign)), Err(ExtractError::ForeignNode)));
    assert!(matches!(view.relative(foreign, "./item"), Err(ExtractError::ForeignNode)));
}

#[rstest]
fn errors_name_the_expression(catalog: Document) {
    let cache = QueryCache::default();
    let view = QueryView::new(&catalog, &cache);
    assert!(matches!(
        view.as_node("//[", None),
        Err(ExtractError::InvalidExpression { expression, .. }) if expression == "//["
    ));
    match view.as_node_list("count(//item)", None) {
        Err(ExtractError::Evaluation { expression, source }) => {
            assert_eq!(expression, "count(//item)");
            assert_eq!(source.code, ErrorCode::XPTY0019);
        }
        other => panic!("unexpected result: {other:?}"),
    }
}
