/*!
 * Tests for the namespace registry and the built-in XHTML metadata
 */

use indexmap::IndexMap;
use xlate::errors::PipelineError;
use xlate::xml::xhtml::XHTML_URI;
use xlate::xml::{Attributes, Datatype, ElementSchema, Namespace, NamespaceRegistry, QName};

fn xhtml(name: &str) -> QName {
    QName::new(Some(XHTML_URI), name)
}

/// Test that a different definition for a registered URI is a conflict
#[test]
fn test_register_withDifferentDefinition_shouldConflict() {
    let mut registry = NamespaceRegistry::new();
    registry
        .register(Namespace::new(Some("urn:doc"), Some("d")))
        .unwrap();

    let result = registry.register(
        Namespace::new(Some("urn:doc"), Some("d")).with_element(ElementSchema::block("para")),
    );

    assert_eq!(result, Err(PipelineError::NamespaceConflict("urn:doc".to_string())));
}

/// Test that bare elements use the XHTML metadata with the built-ins
#[test]
fn test_with_builtins_bareElements_shouldResolveAsXhtml() {
    let registry = NamespaceRegistry::with_builtins();

    let em = registry.element_schema(None, "em", 1).unwrap();
    assert!(em.is_inline);
    assert_eq!(em.context.as_deref(), Some("emphasis"));

    let legacy = registry.element_schema(None, "blink", 4).unwrap();
    assert!(!legacy.is_inline);
    assert_eq!(legacy.context.as_deref(), Some("blink"));
}

/// Test that a namespace without a default element rejects unlisted names
#[test]
fn test_element_schema_withStrictNamespace_shouldFail() {
    let mut registry = NamespaceRegistry::new();
    registry
        .register(Namespace::new(Some("urn:strict"), None).with_element(ElementSchema::block("doc")))
        .unwrap();

    let result = registry.element_schema(Some("urn:strict"), "chapter", 4);
    assert!(matches!(
        result,
        Err(PipelineError::UnknownElement { line: 4, .. })
    ));
}

/// Test that clearing the bare namespace falls back to the permissive default
#[test]
fn test_clear_bare_namespace_shouldMakeBareElementsBlocks() {
    let mut registry = NamespaceRegistry::with_builtins();
    registry.clear_bare_namespace();

    let em = registry.element_schema(None, "em", 1).unwrap();
    assert!(!em.is_inline);
    assert!(!registry.is_registered(None));
    assert!(registry.is_registered(Some(XHTML_URI)));
}

/// Test that an alias shares the metadata of its target namespace
#[test]
fn test_register_alias_shouldShareMetadata() {
    let mut registry = NamespaceRegistry::new();
    registry
        .register(
            Namespace::new(Some("urn:doc"), Some("d"))
                .with_element(ElementSchema::inline("b")),
        )
        .unwrap();
    registry.register_alias(Some("urn:doc:v2"), "urn:doc").unwrap();

    let schema = registry.element_schema(Some("urn:doc:v2"), "b", 1).unwrap();
    assert!(schema.is_inline);
    assert!(registry.register_alias(None, "urn:missing").is_err());
}

/// Test the attribute resolution order: element, namespace, default
#[test]
fn test_attribute_datatype_shouldFollowResolutionOrder() {
    let registry = NamespaceRegistry::with_builtins();
    let attributes = Attributes::new();

    let alt = registry
        .attribute_datatype(&xhtml("img"), &QName::local("alt"), &attributes, 1)
        .unwrap();
    assert_eq!(alt, Datatype::Unicode);

    let title = registry
        .attribute_datatype(&xhtml("p"), &QName::local("title"), &attributes, 1)
        .unwrap();
    assert_eq!(title, Datatype::Unicode);

    let class = registry
        .attribute_datatype(&xhtml("p"), &QName::local("class"), &attributes, 1)
        .unwrap();
    assert_eq!(class, Datatype::String);

    let href = registry
        .attribute_datatype(&xhtml("a"), &QName::local("href"), &attributes, 1)
        .unwrap();
    assert_eq!(href, Datatype::Uri);
}

/// Test that foreign attributes are resolved by their own namespace
#[test]
fn test_attribute_datatype_withXmlLang_shouldUseXmlNamespace() {
    let registry = NamespaceRegistry::with_builtins();
    let lang = QName::new(Some("http://www.w3.org/XML/1998/namespace"), "lang");

    let datatype = registry
        .attribute_datatype(&xhtml("p"), &lang, &Attributes::new(), 1)
        .unwrap();
    assert_eq!(datatype, Datatype::String);
}

/// Test that an attribute nobody knows is reported
#[test]
fn test_attribute_datatype_withoutAnySchema_shouldFail() {
    let mut registry = NamespaceRegistry::new();
    registry
        .register(Namespace::new(Some("urn:strict"), None).with_element(ElementSchema::block("doc")))
        .unwrap();

    let result = registry.attribute_datatype(
        &QName::new(Some("urn:strict"), "doc"),
        &QName::local("color"),
        &Attributes::new(),
        7,
    );
    assert_eq!(
        result,
        Err(PipelineError::UnknownAttribute {
            element: "doc".to_string(),
            attribute: "color".to_string(),
            line: 7,
        })
    );
}

/// Test that conditional attributes depend on the value of another attribute
#[test]
fn test_attribute_datatype_withInputValue_shouldDependOnType() {
    let registry = NamespaceRegistry::with_builtins();
    let mut submit: Attributes = IndexMap::new();
    submit.insert(QName::local("type"), "Submit".to_string());
    let mut text: Attributes = IndexMap::new();
    text.insert(QName::local("type"), "text".to_string());

    let button = registry
        .attribute_datatype(&xhtml("input"), &QName::local("value"), &submit, 1)
        .unwrap();
    assert_eq!(button, Datatype::Unicode);

    let field = registry
        .attribute_datatype(&xhtml("input"), &QName::local("value"), &text, 1)
        .unwrap();
    assert!(!field.is_translatable());
}

/// Test that an unknown namespace uses the permissive default
#[test]
fn test_lookup_withUnknownNamespace_shouldAcceptAnyAttribute() {
    let registry = NamespaceRegistry::with_builtins();
    let datatype = registry
        .attribute_datatype(
            &QName::new(Some("urn:unknown"), "thing"),
            &QName::local("whatever"),
            &Attributes::new(),
            1,
        )
        .unwrap();
    assert_eq!(datatype, Datatype::String);
}
