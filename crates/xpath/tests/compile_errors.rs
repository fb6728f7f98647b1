use lingo_xpath::{ErrorCode, ErrorKind, StaticContextBuilder, compile_xpath, compile_xpath_with_context};
use rstest::rstest;

#[rstest]
#[case::unbalanced_predicate("//a[", ErrorCode::XPST0003)]
#[case::dangling_operator("1 +", ErrorCode::XPST0003)]
#[case::empty("", ErrorCode::XPST0003)]
#[case::unterminated_literal("'abc", ErrorCode::XPST0003)]
#[case::namespace_axis("namespace::*", ErrorCode::XPST0003)]
#[case::variable("$title", ErrorCode::XPST0008)]
#[case::unknown_function("upper-case('a')", ErrorCode::XPST0017)]
#[case::prefixed_function("fn:count(/a)", ErrorCode::XPST0017)]
#[case::wrong_arity("substring('a')", ErrorCode::XPST0017)]
#[case::unbound_prefix("/x:root", ErrorCode::XPST0081)]
#[case::unbound_wildcard_prefix("/x:*", ErrorCode::XPST0081)]
fn invalid_expressions_are_static_errors(#[case] expr: &str, #[case] code: ErrorCode) {
    let err = compile_xpath(expr).unwrap_err();
    assert_eq!(err.code, code, "{expr}: {err}");
    assert_eq!(err.kind, ErrorKind::Static);
    assert!(err.is_static());
}

#[rstest]
#[case("/library/book[@id = 'b1']/title[1]")]
#[case("count(//book) > 1 and not(//missing)")]
#[case("//order")]
#[case("//div/mod")]
#[case("ancestor-or-self::node()[last()]")]
#[case("- - 3")]
#[case("(//a | //b)[1]/@c")]
#[case("processing-instruction('x')")]
fn valid_expressions_compile(#[case] expr: &str) {
    let compiled = compile_xpath(expr).unwrap();
    assert_eq!(compiled.source(), expr);
}

#[test]
fn prefixes_come_from_the_static_context() {
    let ctx = StaticContextBuilder::new().with_namespace("x", "urn:x").build();
    let compiled = compile_xpath_with_context("/x:root/@x:id", &ctx).unwrap();
    assert_eq!(compiled.static_context().resolve_prefix("x"), Some("urn:x"));
    assert!(compile_xpath("/x:root").is_err());
}

#[test]
fn xml_prefix_cannot_be_rebound() {
    let ctx = StaticContextBuilder::new().with_namespace("xml", "urn:other").build();
    assert_eq!(ctx.resolve_prefix("xml"), Some(lingo_xpath::XML_NS));
}

#[rstest]
#[case("./title", true)]
#[case(".", true)]
#[case("title", false)]
#[case("/library", false)]
#[case("//title", false)]
fn context_relative_detection(#[case] expr: &str, #[case] relative: bool) {
    assert_eq!(compile_xpath(expr).unwrap().is_context_relative(), relative);
}
