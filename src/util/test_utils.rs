use std::collections::HashMap;

use crate::{
    cursor::TokenCursor,
    lexer, parser,
    processor::Processor,
    resolved::{Expr, Object},
    source::MemorySource,
    util::fmt::tree,
};

/// Builds a resolved object from its members, in order.
pub fn object<const N: usize>(members: [(&str, Expr); N]) -> Object {
    members
        .into_iter()
        .map(|(key, value)| (key.to_owned(), value))
        .collect()
}

/// Each variant contains the input.
pub enum Test {
    /// A single source file.
    Parser(&'static str),
    /// `(path, source)` pairs; the first one is the root.
    Linker(&'static [(&'static str, &'static str)]),
}

pub enum Assertion {
    TreeOk(&'static str),
    ExpectedErrors(&'static [&'static str]),
}

/// The environment every linker test runs with.
pub fn test_env() -> HashMap<&'static str, &'static str> {
    HashMap::from([("password", "qwerty")])
}

#[track_caller]
pub fn run_pipeline(test: Test) -> (String, Vec<String>) {
    match test {
        Test::Parser(input) => {
            let tokens = match lexer::lex_in_new(input) {
                Ok(tokens) => tokens,
                Err(error) => return (String::new(), vec![error.to_string()]),
            };
            match parser::parse(&mut TokenCursor::new(tokens)) {
                Ok(file) => (tree::print_file_string(&file), vec![]),
                Err(error) => (String::new(), vec![error.to_string()]),
            }
        }
        Test::Linker(files) => {
            let mut source = MemorySource::new();
            for (path, src) in files {
                source = source.file(path, *src);
            }
            for (key, value) in test_env() {
                source = source.var(key, value);
            }
            let (root, _) = files[0];
            match Processor::new(&source).process(root) {
                Ok(object) => (tree::print_resolved_string(&object), vec![]),
                Err(error) => (String::new(), vec![error.chain()]),
            }
        }
    }
}

#[track_caller]
pub fn run_assertion(
    assertion: Assertion,
    formatted_actual_tree: &str,
    formatted_actual_errors: &[String],
) {
    match assertion {
        Assertion::TreeOk(expected_tree) => {
            let expected_errors: &[&str] = &[];
            ::pretty_assertions::assert_eq!(formatted_actual_errors, expected_errors);
            ::pretty_assertions::assert_eq!(formatted_actual_tree.trim(), expected_tree.trim());
        }
        Assertion::ExpectedErrors(expected_errors) => {
            ::pretty_assertions::assert_eq!(formatted_actual_errors, expected_errors);
        }
    }
}

macro_rules! tree_tests {
    (
        use $test_kind:ident;

        $(
            fn $test_name:ident() {
                let $source_kind:ident = $source:expr;
                $($assertions_tt:tt)*
            }
        )*
    ) => {
        $(
            #[test]
            fn $test_name() {
                let test: crate::util::test_utils::Test =
                    tree_tests!(@@get_test($test_kind, $source_kind), $source);
                let (formatted_actual_tree, formatted_actual_errors) =
                    crate::util::test_utils::run_pipeline(test);
                let ctx = (&formatted_actual_tree, &formatted_actual_errors);
                tree_tests!(@@expand_assertions, ctx, [$($assertions_tt)*]);
            }
        )*
    };

    (@@expand_assertions, $ctx:expr, []) => {};
    (@@expand_assertions, $ctx:expr, [
        let $assertion:ident = $assertion_expected:expr;
        $($rest_assertions_tt:tt)*
    ]) => {
        crate::util::test_utils::run_assertion(
            tree_tests!(@@assertion, $assertion, $assertion_expected),
            $ctx.0,
            $ctx.1,
        );
        tree_tests!(@@expand_assertions, $ctx, [$($rest_assertions_tt)*]);
    };

    (@@assertion, tree_ok, $expected:expr) => {
        crate::util::test_utils::Assertion::TreeOk(::indoc::indoc! { $expected })
    };
    (@@assertion, expected_errors, $expected:expr) => {
        crate::util::test_utils::Assertion::ExpectedErrors($expected)
    };

    (@@get_test(parser, file), $source:expr) => {
        crate::util::test_utils::Test::Parser($source)
    };
    (@@get_test(linker, files), $source:expr) => {
        crate::util::test_utils::Test::Linker($source)
    };
}
pub(crate) use tree_tests;
