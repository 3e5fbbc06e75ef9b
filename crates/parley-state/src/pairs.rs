//! Attributes and the messages that carry them.

/// A named attribute with an opaque value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: Vec<u8>,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// An ordered list of attributes.
pub type AttrList = Vec<Attribute>;

/// An inbound or outbound protocol message, reduced to its attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    attrs: AttrList,
}

impl Message {
    pub fn new() -> Self {
        Self::default()
    }

    /// First attribute called `name`.
    pub fn find(&self, name: &str) -> Option<&Attribute> {
        self.attrs.iter().find(|a| a.name == name)
    }

    /// Append an attribute.
    pub fn add(&mut self, attr: Attribute) {
        self.attrs.push(attr);
    }

    /// Remove every attribute called `name`, returning how many went.
    pub fn remove_all(&mut self, name: &str) -> usize {
        let before = self.attrs.len();
        self.attrs.retain(|a| a.name != name);
        before - self.attrs.len()
    }

    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }
}
