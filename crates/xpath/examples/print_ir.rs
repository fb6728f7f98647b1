use lingo_xpath::{StaticContextBuilder, compile_xpath_with_context};

fn main() {
    let mut args = std::env::args().skip(1);
    let Some(src) = args.next() else {
        eprintln!("Usage: print_ir <xpath> [default-namespace]");
        std::process::exit(2);
    };
    let mut builder = StaticContextBuilder::new();
    if let Some(ns) = args.next() {
        builder = builder.with_default_element_namespace(ns);
    }
    match compile_xpath_with_context(&src, &builder.build()) {
        Ok(compiled) => println!("{:#?}", compiled.ir()),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
