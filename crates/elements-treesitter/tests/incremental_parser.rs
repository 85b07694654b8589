use elements_core::{ChangeEvent, Position, Range, apply_changes};
use elements_treesitter::{
    ChangeAnalyzer, IncrementalParser, ParseError, ParseStrategy, SyntaxTarget, validate_tree,
};
use pretty_assertions::assert_eq;
use tree_sitter::{Parser, Tree};

struct HtmlTarget {
    text: String,
    tree: Option<Tree>,
    parser: Option<Parser>,
}

impl HtmlTarget {
    fn new(text: &str) -> Self {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_html::LANGUAGE.into())
            .unwrap();
        let tree = parser.parse(text, None);
        Self {
            text: text.to_string(),
            tree,
            parser: Some(parser),
        }
    }

    fn apply(
        &mut self,
        engine: &IncrementalParser,
        changes: &[ChangeEvent],
    ) -> Result<bool, ParseError> {
        let new_text = apply_changes(&self.text, changes);
        let outcome = engine.parse_with_strategy(self, &new_text, changes)?;
        self.text = new_text;
        self.tree = Some(outcome.tree);
        Ok(outcome.used_incremental)
    }
}

impl SyntaxTarget for HtmlTarget {
    fn uri(&self) -> &str {
        "file:///test.html"
    }

    fn text(&self) -> &str {
        &self.text
    }

    fn tree(&self) -> Option<&Tree> {
        self.tree.as_ref()
    }

    fn parser_mut(&mut self) -> Option<&mut Parser> {
        self.parser.as_mut()
    }
}

fn fresh_sexp(text: &str) -> String {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_html::LANGUAGE.into())
        .unwrap();
    parser.parse(text, None).unwrap().root_node().to_sexp()
}

fn at(line: u32, col: u32, text: &str) -> ChangeEvent {
    ChangeEvent::ranged(
        Range::new(Position::new(line, col), Position::new(line, col)),
        text,
    )
}

#[test]
fn test_small_edit_is_incremental_and_matches_fresh_parse() {
    let mut target = HtmlTarget::new("<div>\n  <p>hello</p>\n</div>\n");
    let engine = IncrementalParser::default();

    let used_incremental = target.apply(&engine, &[at(1, 10, " world")]).unwrap();

    assert!(used_incremental);
    assert_eq!(target.text, "<div>\n  <p>hello world</p>\n</div>\n");
    assert_eq!(
        target.tree.as_ref().unwrap().root_node().to_sexp(),
        fresh_sexp(&target.text)
    );
}

#[test]
fn test_installed_tree_always_matches_fresh_parse() {
    let engine = IncrementalParser::new(ParseStrategy::Incremental, ChangeAnalyzer::default());
    let edits = [
        at(0, 5, "<span"),
        at(0, 10, " class=\"x"),
        at(0, 19, "\">"),
        at(0, 0, "<"),
    ];

    let mut target = HtmlTarget::new("<div></div>");
    for edit in edits {
        let used_incremental = target.apply(&engine, std::slice::from_ref(&edit)).unwrap();
        let tree = target.tree.as_ref().unwrap();
        assert_eq!(
            tree.root_node().to_sexp(),
            fresh_sexp(&target.text),
            "incremental: {used_incremental}"
        );
        if tree.root_node().has_error() {
            assert!(!used_incremental, "erroneous tree accepted for {:?}", target.text);
        }
        assert!(!used_incremental || validate_tree(tree, &target.text));
    }
}

#[test]
fn test_validation_rejects_tree_shorter_than_content() {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_html::LANGUAGE.into())
        .unwrap();
    let tree = parser.parse("<p></p>", None).unwrap();

    assert!(validate_tree(&tree, "<p></p>"));
    assert!(!validate_tree(&tree, "<p></p>xyz"));
}

#[test]
fn test_accepted_incremental_trees_match_fresh_parse() {
    let engine = IncrementalParser::default();
    let mut target = HtmlTarget::new("<ul>\n  <li>a</li>\n</ul>\n");
    let edits = [
        at(1, 7, "bc"),
        at(1, 14, "\n  <li>d</li>"),
        at(0, 3, " class=\"list\""),
    ];

    for edit in edits {
        let used_incremental = target.apply(&engine, std::slice::from_ref(&edit)).unwrap();
        assert!(used_incremental, "fell back for {:?}", target.text);
        assert_eq!(
            target.tree.as_ref().unwrap().root_node().to_sexp(),
            fresh_sexp(&target.text)
        );
    }
    assert_eq!(
        target.text,
        "<ul class=\"list\">\n  <li>abc</li>\n  <li>d</li>\n</ul>\n"
    );
}

#[test]
fn test_auto_strategy_falls_back_for_large_batches() {
    let engine = IncrementalParser::default();

    let mut target = HtmlTarget::new("<div></div>");
    let six: Vec<_> = (0..6).map(|_| at(0, 5, "x")).collect();
    assert!(!target.apply(&engine, &six).unwrap());
    assert_eq!(target.text, "<div>xxxxxx</div>");

    let mut target = HtmlTarget::new("<div></div>");
    let big = at(0, 5, &"y".repeat(1000));
    assert!(!target.apply(&engine, &[big]).unwrap());

    let mut target = HtmlTarget::new("<div></div>");
    assert!(!target.apply(&engine, &[ChangeEvent::full("<p></p>")]).unwrap());
    assert_eq!(
        target.tree.as_ref().unwrap().root_node().to_sexp(),
        fresh_sexp("<p></p>")
    );
}

#[test]
fn test_full_strategy_never_reuses() {
    let engine = IncrementalParser::new(ParseStrategy::Full, ChangeAnalyzer::default());
    let mut target = HtmlTarget::new("<div></div>");
    assert!(!target.apply(&engine, &[at(0, 5, "x")]).unwrap());
}

#[test]
fn test_inconsistent_batch_reparses_from_scratch() {
    let engine = IncrementalParser::new(ParseStrategy::Incremental, ChangeAnalyzer::default());
    let mut target = HtmlTarget::new("<div></div>");

    // The batch says "insert x", but the content the client sent differs.
    let outcome = engine
        .parse_with_strategy(&mut target, "<div>y</div>", &[at(0, 5, "x")])
        .unwrap();

    assert!(!outcome.used_incremental);
    assert!(outcome.previous.is_some());
    assert_eq!(outcome.tree.root_node().to_sexp(), fresh_sexp("<div>y</div>"));
}

#[test]
fn test_missing_tree_parses_in_full() {
    let engine = IncrementalParser::new(ParseStrategy::Incremental, ChangeAnalyzer::default());
    let mut target = HtmlTarget::new("<div></div>");
    target.tree = None;

    let outcome = engine
        .parse_with_strategy(&mut target, "<div>x</div>", &[at(0, 5, "x")])
        .unwrap();
    assert!(!outcome.used_incremental);
    assert!(outcome.previous.is_none());
}

#[test]
fn test_missing_parser_is_an_error() {
    let engine = IncrementalParser::default();
    let mut target = HtmlTarget::new("<div></div>");
    target.parser = None;

    let err = engine
        .parse_with_strategy(&mut target, "<div>x</div>", &[at(0, 5, "x")])
        .unwrap_err();
    assert!(matches!(err, ParseError::NoParser { .. }));
}
