/*!
 * Namespace registry.
 *
 * Maps namespace URIs to their prefix and per-element metadata: whether an
 * element is inline, skips its content, keeps its whitespace, which context
 * scopes its messages, and the datatypes of its attributes. Unknown URIs fall
 * back to a permissive default namespace whose elements are translatable
 * blocks.
 *
 * A process-wide registry is installed once before parsing starts
 * ([`install`]), read through [`registry`], and dropped with [`teardown`].
 */

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use log::warn;
use once_cell::sync::Lazy;
use parking_lot::{Mutex, RwLock};

use crate::errors::{PipelineError, PipelineResult};
use crate::xml::event::{Attributes, QName};

pub const XML_URI: &str = "http://www.w3.org/XML/1998/namespace";
pub const XMLNS_URI: &str = "http://www.w3.org/2000/xmlns/";

/// How an attribute value is interpreted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Datatype {
    String,
    /// Human-readable text that goes through the catalog
    Unicode,
    Uri,
    Integer,
    Boolean,
}

impl Datatype {
    pub fn is_translatable(&self) -> bool {
        matches!(self, Datatype::Unicode)
    }
}

/// A rule making an attribute translatable only for some values of another attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionalAttribute {
    pub attribute: String,
    pub when_attribute: String,
    pub when_values: Vec<String>,
    pub datatype: Datatype,
}

/// Per-element metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementSchema {
    pub name: String,
    pub default_datatype: Option<Datatype>,
    pub attributes: HashMap<String, Datatype>,
    pub conditional_attributes: Vec<ConditionalAttribute>,
    pub is_empty: bool,
    pub is_inline: bool,
    pub skip_content: bool,
    pub keep_spaces: bool,
    pub context: Option<String>,
}

impl ElementSchema {
    /// A block element: it bounds messages
    pub fn block(name: &str) -> Self {
        Self {
            name: name.to_string(),
            default_datatype: None,
            attributes: HashMap::new(),
            conditional_attributes: Vec::new(),
            is_empty: false,
            is_inline: false,
            skip_content: false,
            keep_spaces: false,
            context: None,
        }
    }

    /// An inline element: it becomes a format pair inside the enclosing message
    pub fn inline(name: &str) -> Self {
        Self {
            is_inline: true,
            ..Self::block(name)
        }
    }

    pub fn empty(mut self) -> Self {
        self.is_empty = true;
        self
    }

    pub fn skip_content(mut self) -> Self {
        self.skip_content = true;
        self
    }

    pub fn keep_spaces(mut self) -> Self {
        self.keep_spaces = true;
        self
    }

    pub fn with_context(mut self, context: &str) -> Self {
        self.context = Some(context.to_string());
        self
    }

    pub fn with_attribute(mut self, name: &str, datatype: Datatype) -> Self {
        self.attributes.insert(name.to_string(), datatype);
        self
    }

    pub fn with_default_datatype(mut self, datatype: Datatype) -> Self {
        self.default_datatype = Some(datatype);
        self
    }

    /// `attribute` becomes `datatype` when `when_attribute` has one of `values`
    pub fn with_conditional_attribute(
        mut self,
        attribute: &str,
        when_attribute: &str,
        values: &[&str],
        datatype: Datatype,
    ) -> Self {
        self.conditional_attributes.push(ConditionalAttribute {
            attribute: attribute.to_string(),
            when_attribute: when_attribute.to_string(),
            when_values: values.iter().map(|value| value.to_string()).collect(),
            datatype,
        });
        self
    }

    /// Datatype of one of this element's own attributes
    pub fn attribute_datatype(&self, name: &str, attributes: &Attributes) -> Option<Datatype> {
        for rule in &self.conditional_attributes {
            if rule.attribute != name {
                continue;
            }
            let actual = attributes
                .get(&QName::local(&rule.when_attribute))
                .map(|value| value.to_ascii_lowercase());
            if actual.is_some_and(|value| rule.when_values.iter().any(|v| *v == value)) {
                return Some(rule.datatype.clone());
            }
        }

        self.attributes
            .get(name)
            .cloned()
            .or_else(|| self.default_datatype.clone())
    }
}

/// One namespace and its element metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    pub uri: Option<String>,
    pub prefix: Option<String>,
    pub elements: HashMap<String, ElementSchema>,
    /// Attributes shared by all elements of this namespace, also valid on foreign ones (`xml:lang`)
    pub free_attributes: HashMap<String, Datatype>,
    pub default_datatype: Option<Datatype>,
    /// Template applied to element names missing from `elements`
    pub default_element: Option<ElementSchema>,
    /// Elements without an explicit context are scoped by their own name
    pub name_as_context: bool,
}

impl Namespace {
    pub fn new(uri: Option<&str>, prefix: Option<&str>) -> Self {
        Self {
            uri: uri.map(str::to_string),
            prefix: prefix.map(str::to_string),
            elements: HashMap::new(),
            free_attributes: HashMap::new(),
            default_datatype: None,
            default_element: None,
            name_as_context: false,
        }
    }

    pub fn with_element(mut self, schema: ElementSchema) -> Self {
        self.elements.insert(schema.name.clone(), schema);
        self
    }

    pub fn with_free_attribute(mut self, name: &str, datatype: Datatype) -> Self {
        self.free_attributes.insert(name.to_string(), datatype);
        self
    }

    pub fn with_default_datatype(mut self, datatype: Datatype) -> Self {
        self.default_datatype = Some(datatype);
        self
    }

    pub fn with_default_element(mut self, schema: ElementSchema) -> Self {
        self.default_element = Some(schema);
        self
    }

    pub fn with_name_as_context(mut self) -> Self {
        self.name_as_context = true;
        self
    }

    pub fn element_schema(&self, name: &str) -> Option<Cow<'_, ElementSchema>> {
        let mut schema = match self.elements.get(name) {
            Some(schema) => Cow::Borrowed(schema),
            None => {
                let mut schema = self.default_element.clone()?;
                schema.name = name.to_string();
                Cow::Owned(schema)
            }
        };

        if self.name_as_context && schema.context.is_none() {
            schema.to_mut().context = Some(name.to_string());
        }
        Some(schema)
    }

    /// The namespace applied to unknown URIs: every element is a translatable block
    pub fn permissive_default() -> Self {
        Namespace::new(None, None)
            .with_default_datatype(Datatype::String)
            .with_default_element(
                ElementSchema::block("").with_default_datatype(Datatype::String),
            )
    }

    /// `xml:lang`, `xml:space`, `xml:base`, `xml:id`
    pub fn xml() -> Self {
        Namespace::new(Some(XML_URI), Some("xml"))
            .with_free_attribute("lang", Datatype::String)
            .with_free_attribute("space", Datatype::String)
            .with_free_attribute("base", Datatype::Uri)
            .with_free_attribute("id", Datatype::String)
    }

    pub fn xmlns() -> Self {
        Namespace::new(Some(XMLNS_URI), Some("xmlns")).with_default_datatype(Datatype::String)
    }
}

/// Resolves namespace metadata for the parsing and translation passes
#[derive(Debug)]
pub struct NamespaceRegistry {
    namespaces: HashMap<Option<String>, Arc<Namespace>>,
    default: Arc<Namespace>,
    warned: Mutex<HashSet<String>>,
}

impl Default for NamespaceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl NamespaceRegistry {
    /// A registry holding only the reserved `xml` and `xmlns` namespaces
    pub fn new() -> Self {
        let mut namespaces = HashMap::new();
        for namespace in [Namespace::xml(), Namespace::xmlns()] {
            namespaces.insert(namespace.uri.clone(), Arc::new(namespace));
        }

        Self {
            namespaces,
            default: Arc::new(Namespace::permissive_default()),
            warned: Mutex::new(HashSet::new()),
        }
    }

    /// The reserved namespaces plus XHTML, with bare elements read as XHTML
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        let xhtml = Arc::new(super::xhtml::namespace());
        registry.namespaces.insert(xhtml.uri.clone(), Arc::clone(&xhtml));
        registry.namespaces.insert(None, xhtml);
        registry
    }

    /// Add a namespace; registering the same definition twice is a no-op
    pub fn register(&mut self, namespace: Namespace) -> PipelineResult<()> {
        let key = namespace.uri.clone();
        if let Some(existing) = self.namespaces.get(&key) {
            if **existing == namespace {
                return Ok(());
            }
            return Err(PipelineError::NamespaceConflict(
                key.unwrap_or_default(),
            ));
        }
        self.namespaces.insert(key, Arc::new(namespace));
        Ok(())
    }

    /// Let the namespace registered for `uri` also answer for `alias`
    ///
    /// `alias = None` makes elements without a namespace use that metadata.
    pub fn register_alias(&mut self, alias: Option<&str>, uri: &str) -> PipelineResult<()> {
        let target = self
            .namespaces
            .get(&Some(uri.to_string()))
            .cloned()
            .ok_or_else(|| PipelineError::NamespaceConflict(format!("{} is not registered", uri)))?;
        self.namespaces.insert(alias.map(str::to_string), target);
        Ok(())
    }

    /// Drop whatever answers for elements without a namespace
    pub fn clear_bare_namespace(&mut self) {
        self.namespaces.remove(&None);
    }

    pub fn is_registered(&self, uri: Option<&str>) -> bool {
        self.namespaces.contains_key(&uri.map(str::to_string))
    }

    /// Namespace for `uri`, or the permissive default with a one-time warning
    pub fn lookup(&self, uri: Option<&str>) -> &Namespace {
        if let Some(namespace) = self.namespaces.get(&uri.map(str::to_string)) {
            return namespace;
        }
        if let Some(uri) = uri {
            let mut warned = self.warned.lock();
            if warned.insert(uri.to_string()) {
                warn!("Unknown namespace '{}', using the default element schema", uri);
            }
        }
        &self.default
    }

    pub fn element_schema(
        &self,
        uri: Option<&str>,
        name: &str,
        line: usize,
    ) -> PipelineResult<Cow<'_, ElementSchema>> {
        self.lookup(uri)
            .element_schema(name)
            .ok_or_else(|| PipelineError::UnknownElement {
                uri: uri.unwrap_or_default().to_string(),
                name: name.to_string(),
                line,
            })
    }

    /// Datatype of `attribute` on the element `tag`
    ///
    /// Namespace declarations are strings. Attributes without a namespace, or
    /// in the element's own namespace, are resolved by the element schema.
    /// Anything else is resolved by the attribute's own namespace.
    pub fn attribute_datatype(
        &self,
        tag: &QName,
        attribute: &QName,
        attributes: &Attributes,
        line: usize,
    ) -> PipelineResult<Datatype> {
        let unknown = || PipelineError::UnknownAttribute {
            element: tag.name.clone(),
            attribute: attribute.name.clone(),
            line,
        };

        if attribute.uri() == Some(XMLNS_URI) || (attribute.uri.is_none() && attribute.name == "xmlns") {
            return Ok(Datatype::String);
        }

        if attribute.uri.is_none() || attribute.uri == tag.uri {
            let namespace = self.lookup(tag.uri());
            let schema = self.element_schema(tag.uri(), &tag.name, line)?;
            return schema
                .attribute_datatype(&attribute.name, attributes)
                .or_else(|| namespace.free_attributes.get(&attribute.name).cloned())
                .or_else(|| namespace.default_datatype.clone())
                .ok_or_else(unknown);
        }

        let namespace = self.lookup(attribute.uri());
        namespace
            .free_attributes
            .get(&attribute.name)
            .cloned()
            .or_else(|| namespace.default_datatype.clone())
            .ok_or_else(unknown)
    }

    /// Preferred prefix of a namespace, if it has one
    pub fn prefix_for(&self, uri: &str) -> Option<&str> {
        self.namespaces
            .get(&Some(uri.to_string()))
            .and_then(|namespace| namespace.prefix.as_deref())
    }
}

static REGISTRY: Lazy<RwLock<Option<Arc<NamespaceRegistry>>>> = Lazy::new(|| RwLock::new(None));

/// Install the process-wide registry, replacing any previous one
pub fn install(registry: NamespaceRegistry) -> Arc<NamespaceRegistry> {
    let registry = Arc::new(registry);
    *REGISTRY.write() = Some(Arc::clone(&registry));
    registry
}

/// The process-wide registry; the built-in one is installed on first use
pub fn registry() -> Arc<NamespaceRegistry> {
    if let Some(registry) = REGISTRY.read().as_ref() {
        return Arc::clone(registry);
    }
    let mut slot = REGISTRY.write();
    Arc::clone(slot.get_or_insert_with(|| Arc::new(NamespaceRegistry::with_builtins())))
}

/// Drop the process-wide registry
pub fn teardown() {
    *REGISTRY.write() = None;
}
