use lingo_xpath::parser::{Rule, XPathParser};
use pest::Parser;
use pest::iterators::Pair;

fn print_pair(pair: &Pair<'_, Rule>, indent: usize) {
    println!("{:indent$}{:?}: {:?}", "", pair.as_rule(), pair.as_str());
    for child in pair.clone().into_inner() {
        print_pair(&child, indent + 2);
    }
}

fn main() {
    let Some(src) = std::env::args().nth(1) else {
        eprintln!("Usage: dump_parse <xpath>");
        std::process::exit(2);
    };
    match XPathParser::parse(Rule::xpath, &src) {
        Ok(pairs) => pairs.for_each(|pair| print_pair(&pair, 0)),
        Err(e) => {
            eprintln!("Parse error: {e}");
            std::process::exit(1);
        }
    }
}
