use elements_core::Position;
use elements_lsp::DocumentStore;
use pretty_assertions::assert_eq;

const PAGE: &str = r#"<html>
<head>
<script type="module">
import './my-button.js';
</script>
</head>
<body>
<my-button variant="primary" disabled></my-button>
<div></div>
<my-card><span slot="header">x</span></my-card>
</body>
</html>
"#;

#[test]
fn test_custom_elements_in_markup() {
    let store = DocumentStore::new();
    store.open("file:///index.html", PAGE, 1).unwrap();

    let elements = store.custom_elements("file:///index.html").unwrap();
    let names: Vec<_> = elements.iter().map(|e| e.tag_name.as_str()).collect();
    assert_eq!(names, vec!["my-button", "my-card"]);

    let button = &elements[0];
    assert_eq!(button.range.start, Position::new(7, 1));
    let attributes: Vec<_> = button
        .attributes
        .iter()
        .map(|a| (a.name.as_str(), a.value.as_deref()))
        .collect();
    assert_eq!(
        attributes,
        vec![("variant", Some("primary")), ("disabled", None)]
    );
}

#[test]
fn test_element_and_attribute_at() {
    let store = DocumentStore::new();
    store.open("file:///index.html", PAGE, 1).unwrap();

    let element = store
        .element_at("file:///index.html", Position::new(7, 3))
        .unwrap();
    assert_eq!(element.tag_name, "my-button");

    let (attribute, tag) = store
        .attribute_at("file:///index.html", Position::new(7, 13))
        .unwrap();
    assert_eq!((attribute.name.as_str(), tag.as_str()), ("variant", "my-button"));

    assert!(
        store
            .element_at("file:///index.html", Position::new(8, 2))
            .is_none()
    );
}

#[test]
fn test_insertion_points_in_markup() {
    let store = DocumentStore::new();
    store.open("file:///index.html", PAGE, 1).unwrap();

    assert_eq!(
        store.module_script_insertion("file:///index.html"),
        Some(Position::new(4, 0))
    );
    assert_eq!(
        store.head_insertion_point("file:///index.html"),
        Some(Position::new(5, 0))
    );

    store
        .open("file:///bare.html", "<body></body>", 1)
        .unwrap();
    assert_eq!(store.module_script_insertion("file:///bare.html"), None);
    assert_eq!(store.head_insertion_point("file:///bare.html"), None);
}

#[test]
fn test_custom_elements_in_templates() {
    let store = DocumentStore::new();
    let source = "const t = html`<my-button .value=${v}></my-button>`;\n\
                  const u = `<not-template></not-template>`;\n";
    store.open("file:///el.ts", source, 1).unwrap();

    let elements = store.custom_elements("file:///el.ts").unwrap();
    assert_eq!(elements.len(), 1);
    assert_eq!(elements[0].tag_name, "my-button");
    assert_eq!(elements[0].range.start, Position::new(0, 16));
    assert_eq!(elements[0].attributes[0].name, ".value");

    assert_eq!(
        store.module_script_insertion("file:///el.ts"),
        Some(Position::new(2, 0))
    );
    assert_eq!(store.head_insertion_point("file:///el.ts"), None);
}
