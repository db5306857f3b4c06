//! Owned XML element tree
//!
//! Elements and attributes remember the prefix they were written with and
//! the namespace URI that prefix resolved to, so lookups can match on the
//! URI while output keeps the original spelling.

/// An `xmlns` or `xmlns:prefix` declaration carried by an element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceDeclaration {
    /// `None` declares the default namespace
    pub prefix: Option<String>,
    pub uri: String,
}

/// A non-namespace attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlAttribute {
    pub prefix: Option<String>,
    pub name: String,
    pub namespace: Option<String>,
    pub value: String,
}

impl XmlAttribute {
    #[must_use]
    pub fn qualified_name(&self) -> String {
        qualify(self.prefix.as_deref(), &self.name)
    }
}

/// Element content
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
}

impl XmlNode {
    #[must_use]
    pub fn is_element(&self) -> bool {
        matches!(self, XmlNode::Element(_))
    }
}

/// An element with its attributes and content
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlElement {
    pub prefix: Option<String>,
    pub name: String,
    pub namespace: Option<String>,
    pub declarations: Vec<NamespaceDeclaration>,
    pub attributes: Vec<XmlAttribute>,
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    /// Create an empty element with a local name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_prefix(mut self, prefix: Option<&str>) -> Self {
        self.prefix = prefix.map(str::to_string);
        self
    }

    #[must_use]
    pub fn with_namespace(mut self, namespace: Option<&str>) -> Self {
        self.namespace = namespace.map(str::to_string);
        self
    }

    /// Name as written, e.g. `x:order`.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        qualify(self.prefix.as_deref(), &self.name)
    }

    /// Concatenated text content directly under this element.
    #[must_use]
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|child| match child {
                XmlNode::Text(text) => Some(text.as_str()),
                XmlNode::Element(_) => None,
            })
            .collect()
    }

    /// Replace the text content, keeping child elements. An empty or
    /// absent value leaves no text node behind.
    pub fn set_text(&mut self, value: Option<&str>) {
        self.children.retain(XmlNode::is_element);
        if let Some(text) = value.filter(|text| !text.is_empty()) {
            self.children.push(XmlNode::Text(text.to_string()));
        }
    }

    #[must_use]
    pub fn has_child_elements(&self) -> bool {
        self.children.iter().any(XmlNode::is_element)
    }

    /// Child elements in document order.
    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|child| match child {
            XmlNode::Element(element) => Some(element),
            XmlNode::Text(_) => None,
        })
    }

    /// Mutable access to the child node at `position`, if it is an element.
    pub fn element_at_mut(&mut self, position: usize) -> Option<&mut XmlElement> {
        match self.children.get_mut(position) {
            Some(XmlNode::Element(element)) => Some(element),
            _ => None,
        }
    }

    /// Append a child element, returning its position among all children.
    pub fn push_element(&mut self, element: XmlElement) -> usize {
        self.children.push(XmlNode::Element(element));
        self.children.len() - 1
    }

    /// Set an attribute, replacing one with the same name and namespace.
    pub fn set_attribute(&mut self, attribute: XmlAttribute) {
        let existing = self.attributes.iter_mut().find(|a| {
            a.name == attribute.name
                && a.namespace == attribute.namespace
                && (a.namespace.is_some() || a.prefix == attribute.prefix)
        });
        match existing {
            Some(slot) => slot.value = attribute.value,
            None => self.attributes.push(attribute),
        }
    }

    /// Whether this element declares `prefix` (`None` for the default
    /// namespace).
    #[must_use]
    pub fn declares(&self, prefix: Option<&str>) -> bool {
        self.declarations
            .iter()
            .any(|d| d.prefix.as_deref() == prefix)
    }

    /// Visit this element and every descendant element.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a XmlElement)) {
        visit(self);
        for child in self.elements() {
            child.walk(visit);
        }
    }
}

/// Split `prefix:name` into its parts.
#[must_use]
pub fn split_qualified(qualified: &str) -> (Option<&str>, &str) {
    match qualified.split_once(':') {
        Some((prefix, name)) => (Some(prefix), name),
        None => (None, qualified),
    }
}

fn qualify(prefix: Option<&str>, name: &str) -> String {
    match prefix {
        Some(prefix) => format!("{prefix}:{name}"),
        None => name.to_string(),
    }
}
