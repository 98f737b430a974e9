/*!
 * Built-in XHTML namespace metadata.
 *
 * Unlisted names, custom elements included, are treated as blocks so that
 * documents with legacy or ad-hoc markup still go through. Every element is
 * scoped by its own name unless a more readable context is given
 * (`paragraph`, `heading`).
 */

use crate::xml::namespaces::{Datatype, ElementSchema, Namespace};

pub const XHTML_URI: &str = "http://www.w3.org/1999/xhtml";

const TRANSLATABLE_ATTRIBUTES: &[&str] = &[
    "abbr", "alt", "label", "prompt", "standby", "summary", "title",
];

const URI_ATTRIBUTES: &[&str] = &[
    "action", "background", "cite", "classid", "codebase", "data", "href", "longdesc",
    "profile", "src", "usemap",
];

const INTEGER_ATTRIBUTES: &[&str] = &[
    "border", "cols", "colspan", "marginheight", "marginwidth", "maxlength", "rowspan",
    "span", "start", "tabindex", "vspace",
];

const BOOLEAN_ATTRIBUTES: &[&str] = &[
    "checked", "compact", "declare", "defer", "disabled", "ismap", "multiple", "nohref",
    "noresize", "noshade", "nowrap", "readonly", "selected",
];

const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "audio", "blockquote", "body", "canvas", "caption", "center",
    "colgroup", "datalist", "dd", "del", "details", "dialog", "div", "dl", "dt", "fieldset",
    "figcaption", "figure", "footer", "form", "frameset", "head", "header", "hgroup", "html",
    "iframe", "legend", "li", "main", "map", "menu", "nav", "noframes", "noscript", "object", "ol",
    "optgroup", "option", "output", "progress", "section", "select", "summary", "tbody",
    "template", "tfoot", "thead", "time", "title", "tr", "track", "ul", "video",
];

const EMPTY_BLOCK_ELEMENTS: &[&str] = &[
    "area", "base", "col", "embed", "frame", "hr", "isindex", "link", "meta", "param", "source",
];

const INLINE_ELEMENTS: &[&str] = &[
    "abbr", "acronym", "b", "bdi", "bdo", "big", "button", "cite", "dfn", "font", "i", "ins",
    "kbd", "label", "mark", "meter", "nobr", "q", "rb", "rp", "rt", "rtc", "ruby", "s", "samp",
    "small", "span", "strike", "sub", "sup", "textarea", "tt", "u", "var", "wbr",
];

const EMPTY_INLINE_ELEMENTS: &[&str] = &["basefont", "br", "img"];

/// The XHTML namespace with its element table
pub fn namespace() -> Namespace {
    let mut namespace = Namespace::new(Some(XHTML_URI), None)
        .with_default_datatype(Datatype::String)
        .with_default_element(ElementSchema::block(""))
        .with_name_as_context();

    for name in TRANSLATABLE_ATTRIBUTES {
        namespace = namespace.with_free_attribute(name, Datatype::Unicode);
    }
    for name in URI_ATTRIBUTES {
        namespace = namespace.with_free_attribute(name, Datatype::Uri);
    }
    for name in INTEGER_ATTRIBUTES {
        namespace = namespace.with_free_attribute(name, Datatype::Integer);
    }
    for name in BOOLEAN_ATTRIBUTES {
        namespace = namespace.with_free_attribute(name, Datatype::Boolean);
    }

    for name in BLOCK_ELEMENTS {
        namespace = namespace.with_element(ElementSchema::block(name));
    }
    for name in EMPTY_BLOCK_ELEMENTS {
        namespace = namespace.with_element(ElementSchema::block(name).empty());
    }
    for name in INLINE_ELEMENTS {
        namespace = namespace.with_element(ElementSchema::inline(name));
    }
    for name in EMPTY_INLINE_ELEMENTS {
        namespace = namespace.with_element(ElementSchema::inline(name).empty());
    }

    namespace
        .with_element(ElementSchema::block("p").with_context("paragraph"))
        .with_element(ElementSchema::block("h1").with_context("heading"))
        .with_element(ElementSchema::block("h2").with_context("heading"))
        .with_element(ElementSchema::block("h3").with_context("heading"))
        .with_element(ElementSchema::block("h4").with_context("heading"))
        .with_element(ElementSchema::block("h5").with_context("heading"))
        .with_element(ElementSchema::block("h6").with_context("heading"))
        .with_element(ElementSchema::block("td").with_context("table cell"))
        .with_element(ElementSchema::block("th").with_context("table cell"))
        .with_element(ElementSchema::block("table"))
        .with_element(ElementSchema::block("pre").keep_spaces())
        .with_element(ElementSchema::block("script").skip_content())
        .with_element(ElementSchema::block("style").skip_content())
        .with_element(ElementSchema::inline("a").with_context("link"))
        .with_element(ElementSchema::inline("em").with_context("emphasis"))
        .with_element(ElementSchema::inline("strong").with_context("emphasis"))
        .with_element(ElementSchema::inline("code").skip_content())
        .with_element(ElementSchema::inline("input").empty().with_conditional_attribute(
            "value",
            "type",
            &["submit", "reset", "button"],
            Datatype::Unicode,
        ))
}
