use lingo_xpath::{
    Document, ErrorCode, NodeKind, StaticContextBuilder, XPathValue, compile_xpath, compile_xpath_with_context,
    evaluate, evaluate_nodes,
};
use rstest::{fixture, rstest};

const LIBRARY: &str = r#"<?xml version="1.0"?>
<library xml:lang="en">
  <book id="b1" year="1999">
    <title>First</title>
    <title xml:lang="de">Erstes</title>
    <author>Ann</author>
  </book>
  <book id="b2" year="2005">
    <title>Second</title>
    <author>Bob</author>
    <author>Cid</author>
  </book>
  <!-- catalogue end -->
  <?render mode="compact"?>
</library>"#;

#[fixture]
fn library() -> Document {
    Document::parse(LIBRARY).expect("library parses")
}

fn strings(doc: &Document, expr: &str) -> Vec<String> {
    let compiled = compile_xpath(expr).unwrap();
    evaluate_nodes(&compiled, doc.root()).unwrap().iter().map(|n| n.string_value().trim().to_string()).collect()
}

fn value<'d>(doc: &'d Document, expr: &str) -> XPathValue<'d> {
    evaluate(&compile_xpath(expr).unwrap(), doc.root()).unwrap()
}

#[rstest]
#[case::child_path("/library/book/title", &["First", "Erstes", "Second"])]
#[case::descendant("//author", &["Ann", "Bob", "Cid"])]
#[case::positional("//book[2]/author[1]", &["Bob"])]
#[case::last("//book/author[last()]", &["Ann", "Cid"])]
#[case::attribute_predicate("//book[@year > 2000]/title", &["Second"])]
#[case::attribute_values("//book/@id", &["b1", "b2"])]
#[case::parent("//author[. = 'Cid']/../title", &["Second"])]
#[case::ancestor_positional("//author[1]/ancestor::*[1]/@id", &["b1", "b2"])]
#[case::following_sibling("//title[. = 'First']/following-sibling::*", &["Erstes", "Ann"])]
#[case::preceding_sibling_nearest("//author[. = 'Cid']/preceding-sibling::*[1]", &["Bob"])]
#[case::preceding("//author[. = 'Bob']/preceding::title", &["First", "Erstes", "Second"])]
#[case::following("//book[1]/following::author", &["Bob", "Cid"])]
#[case::union_in_document_order("//author | //title[1]", &["First", "Ann", "Second", "Bob", "Cid"])]
#[case::filter_expression("(//author)[2]", &["Bob"])]
#[case::lang_function("//title[lang('de')]", &["Erstes"])]
#[case::lang_inherited("//title[lang('en')]", &["First", "Second"])]
#[case::positional_per_parent("//author[1]/text()", &["Ann", "Bob"])]
#[case::positional_over_whole_set("(//author)[1]/text()", &["Ann"])]
#[case::comment("//comment()", &["catalogue end"])]
#[case::processing_instruction("//processing-instruction('render')", &["mode=\"compact\""])]
fn node_set_results(library: Document, #[case] expr: &str, #[case] expected: &[&str]) {
    assert_eq!(strings(&library, expr), expected);
}

#[rstest]
#[case("count(//author)", 3.0)]
#[case("sum(//book/@year)", 4004.0)]
#[case("string-length(//author[1])", 3.0)]
#[case("7 mod 3 + 10 div 4", 3.5)]
#[case("-(2 * 3)", -6.0)]
#[case("round(2.5) + floor(-1.5) + ceiling(0.2)", 2.0)]
#[case("number('  42 ')", 42.0)]
fn numeric_results(library: Document, #[case] expr: &str, #[case] expected: f64) {
    let n = value(&library, expr).to_number();
    assert!((n - expected).abs() < 1e-9, "{expr} = {n}");
}

#[rstest]
#[case("concat(//book[1]/@id, '-', //book[2]/@id)", "b1-b2")]
#[case("normalize-space('  a   b ')", "a b")]
#[case("substring-before('2005-01', '-')", "2005")]
#[case("substring-after('2005-01', '-')", "01")]
#[case("translate('abc', 'ab', 'AB')", "ABc")]
#[case("local-name(/*)", "library")]
#[case("name(//@xml:lang)", "xml:lang")]
#[case("string(1 div 0)", "Infinity")]
#[case("string(//missing)", "")]
fn string_results(library: Document, #[case] expr: &str, #[case] expected: &str) {
    assert_eq!(value(&library, expr).to_xpath_string(), expected);
}

#[rstest]
#[case("//author = 'Cid'", true)]
#[case("//author != 'Cid'", true)]
#[case("//author = 'Zed'", false)]
#[case("//book/@year < 2000", true)]
#[case("//book/@year > 2010", false)]
#[case("//missing = //missing", false)]
#[case("//author = true()", true)]
#[case("not(//missing)", true)]
#[case("starts-with(//title, 'Fi') and contains(//title[2], 'rst')", true)]
#[case("ends-with('Second', 'ond')", true)]
#[case("'1' = 1.0", true)]
fn boolean_results(library: Document, #[case] expr: &str, #[case] expected: bool) {
    assert_eq!(value(&library, expr).to_boolean(), expected, "{expr}");
}

#[rstest]
fn relative_evaluation_from_context_node(library: Document) {
    let book = evaluate_nodes(&compile_xpath("//book[2]").unwrap(), library.root()).unwrap()[0];
    let authors = evaluate_nodes(&compile_xpath("./author").unwrap(), book).unwrap();
    assert_eq!(authors.len(), 2);
    assert!(authors.iter().all(|a| book.is_ancestor_of(a)));
    let id = evaluate(&compile_xpath("string(./@id)").unwrap(), book).unwrap();
    assert_eq!(id.to_xpath_string(), "b2");
}

#[test]
fn default_element_namespace_applies_to_unprefixed_steps() {
    let doc = Document::parse(r#"<r xmlns="urn:a" xmlns:b="urn:b"><x>1</x><b:x>2</b:x></r>"#).unwrap();
    let ctx = StaticContextBuilder::new().with_default_element_namespace("urn:a").with_namespace("q", "urn:b").build();
    let plain = evaluate_nodes(&compile_xpath_with_context("/r/x", &ctx).unwrap(), doc.root()).unwrap();
    assert_eq!(plain.len(), 1);
    assert_eq!(plain[0].string_value(), "1");
    let prefixed = evaluate_nodes(&compile_xpath_with_context("/r/q:x", &ctx).unwrap(), doc.root()).unwrap();
    assert_eq!(prefixed[0].string_value(), "2");
    let wildcard = evaluate_nodes(&compile_xpath_with_context("/r/q:*", &ctx).unwrap(), doc.root()).unwrap();
    assert_eq!(wildcard.len(), 1);

    // Without a default namespace the unprefixed step finds nothing.
    let none = evaluate_nodes(&compile_xpath("/r/x").unwrap(), doc.root()).unwrap();
    assert!(none.is_empty());
}

#[test]
fn node_set_function_over_string_is_a_type_error() {
    let doc = Document::parse("<r/>").unwrap();
    let err = evaluate(&compile_xpath("count(('a'))").unwrap(), doc.root()).unwrap_err();
    assert_eq!(err.code, ErrorCode::XPTY0019);
}

#[test]
fn entities_and_cdata_become_text() {
    let doc = Document::parse("<r>a &amp; b <![CDATA[<c>]]> &#x41;</r>").unwrap();
    let root = doc.root_element().unwrap();
    assert_eq!(root.string_value(), "a & b <c> A");
    let kinds: Vec<NodeKind> = root.children().map(|n| n.kind()).collect();
    assert_eq!(kinds, vec![NodeKind::Text]);
}

#[test]
fn malformed_documents_are_rejected() {
    assert!(Document::parse("<r><a></r>").is_err());
    assert!(Document::parse("<r>").is_err());
    assert!(Document::parse("<p:r/>").is_err());
}
