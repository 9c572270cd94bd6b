//! Physical links.
//!
//! Links are undirected: given one endpoint, [`Link::counterpart`] returns
//! the other. [`LinkManager`] indexes every endpoint once at construction.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// One end of a link, identified by node and port name.
///
/// Serialized as a `[node, port]` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "(String, String)", into = "(String, String)")]
pub struct LinkElement {
    pub node: String,
    pub port: String,
}

impl LinkElement {
    pub fn new(node: &str, port: &str) -> Self {
        Self {
            node: node.to_string(),
            port: port.to_string(),
        }
    }
}

impl From<(String, String)> for LinkElement {
    fn from((node, port): (String, String)) -> Self {
        Self { node, port }
    }
}

impl From<LinkElement> for (String, String) {
    fn from(elm: LinkElement) -> Self {
        (elm.node, elm.port)
    }
}

impl fmt::Display for LinkElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.node, self.port)
    }
}

/// Undirected link between two endpoints
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub endpoint1: LinkElement,
    pub endpoint2: LinkElement,
}

impl Link {
    pub fn new(endpoint1: LinkElement, endpoint2: LinkElement) -> Self {
        Self {
            endpoint1,
            endpoint2,
        }
    }

    /// The opposite end of `elm`, or `None` if `elm` is not on this link
    pub fn counterpart(&self, elm: &LinkElement) -> Option<&LinkElement> {
        if *elm == self.endpoint1 {
            Some(&self.endpoint2)
        } else if *elm == self.endpoint2 {
            Some(&self.endpoint1)
        } else {
            None
        }
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Link: [{}, {}]", self.endpoint1, self.endpoint2)
    }
}

/// Immutable index over the physical link list
#[derive(Debug, Clone, Default)]
pub struct LinkManager {
    links: Vec<Link>,
    endpoint_index: HashMap<LinkElement, usize>,
}

impl LinkManager {
    pub fn new(link_list: &[(LinkElement, LinkElement)]) -> Self {
        let mut links = Vec::with_capacity(link_list.len());
        let mut endpoint_index = HashMap::new();
        for (index, (endpoint1, endpoint2)) in link_list.iter().enumerate() {
            // first link listing an endpoint wins
            endpoint_index.entry(endpoint1.clone()).or_insert(index);
            endpoint_index.entry(endpoint2.clone()).or_insert(index);
            links.push(Link::new(endpoint1.clone(), endpoint2.clone()));
        }
        Self {
            links,
            endpoint_index,
        }
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    fn find_link(&self, elm: &LinkElement) -> Option<&Link> {
        self.endpoint_index.get(elm).map(|&index| &self.links[index])
    }

    /// Endpoint on the far side of the link attached to `node`/`port`
    pub fn counterpart_by_name(&self, node: &str, port: &str) -> Option<&LinkElement> {
        let elm = LinkElement::new(node, port);
        self.find_link(&elm).and_then(|link| link.counterpart(&elm))
    }
}
