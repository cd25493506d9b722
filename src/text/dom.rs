//! html5ever TreeSink that keeps only what text extraction needs.
//!
//! Nodes are reference counted so element names can be borrowed straight
//! from the handle, which is what `TreeSink::elem_name` asks for.

use std::borrow::Cow;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

use html5ever::tendril::StrTendril;
use html5ever::tree_builder::{ElementFlags, NodeOrText, QuirksMode, TreeSink};
use html5ever::{Attribute, QualName, local_name, ns};

pub type Handle = Rc<Node>;

pub enum NodeKind {
    Document,
    Element,
    Text(RefCell<String>),
    /// Comments, processing instructions.
    Other,
}

pub struct Node {
    pub name: QualName,
    pub kind: NodeKind,
    parent: RefCell<Option<Weak<Node>>>,
    pub children: RefCell<Vec<Handle>>,
}

impl Node {
    fn new(name: QualName, kind: NodeKind) -> Handle {
        Rc::new(Node {
            name,
            kind,
            parent: RefCell::new(None),
            children: RefCell::new(Vec::new()),
        })
    }

    fn unnamed(kind: NodeKind) -> Handle {
        Self::new(QualName::new(None, ns!(), local_name!("")), kind)
    }

    fn text(text: &str) -> Handle {
        Self::unnamed(NodeKind::Text(RefCell::new(text.to_string())))
    }

    pub fn local_name(&self) -> &str {
        &self.name.local
    }

    fn parent(&self) -> Option<Handle> {
        self.parent.borrow().as_ref().and_then(Weak::upgrade)
    }

    fn set_parent(&self, parent: &Handle) {
        *self.parent.borrow_mut() = Some(Rc::downgrade(parent));
    }
}

/// Unlink `node` from its current parent, if it has one.
fn detach(node: &Handle) {
    let parent = node.parent.borrow_mut().take().and_then(|weak| weak.upgrade());
    if let Some(parent) = parent {
        parent.children.borrow_mut().retain(|c| !Rc::ptr_eq(c, node));
    }
}

fn append_child(parent: &Handle, child: NodeOrText<Handle>) {
    let node = match child {
        NodeOrText::AppendNode(node) => node,
        NodeOrText::AppendText(text) => {
            // Adjacent text merges into one node
            if let Some(last) = parent.children.borrow().last()
                && let NodeKind::Text(existing) = &last.kind
            {
                existing.borrow_mut().push_str(&text);
                return;
            }
            Node::text(&text)
        }
    };
    detach(&node);
    node.set_parent(parent);
    parent.children.borrow_mut().push(node);
}

fn insert_before(sibling: &Handle, child: NodeOrText<Handle>) {
    let Some(parent) = sibling.parent() else {
        return;
    };

    let node = match child {
        NodeOrText::AppendNode(node) => node,
        NodeOrText::AppendText(text) => {
            let children = parent.children.borrow();
            let idx = children.iter().position(|c| Rc::ptr_eq(c, sibling));
            if let Some(idx) = idx
                && idx > 0
                && let NodeKind::Text(existing) = &children[idx - 1].kind
            {
                existing.borrow_mut().push_str(&text);
                return;
            }
            Node::text(&text)
        }
    };

    detach(&node);
    let mut children = parent.children.borrow_mut();
    let idx = children
        .iter()
        .position(|c| Rc::ptr_eq(c, sibling))
        .unwrap_or(children.len());
    node.set_parent(&parent);
    children.insert(idx, node);
}

/// Builds the minimal DOM consumed by [`super::extract_text`].
pub struct TextSink {
    document: Handle,
}

impl Default for TextSink {
    fn default() -> Self {
        Self {
            document: Node::unnamed(NodeKind::Document),
        }
    }
}

impl TreeSink for TextSink {
    type Handle = Handle;
    type Output = Handle;
    type ElemName<'a>
        = &'a QualName
    where
        Self: 'a;

    fn finish(self) -> Self::Output {
        self.document
    }

    fn parse_error(&self, _msg: Cow<'static, str>) {
        // Page markup is frequently sloppy; recover like a browser
    }

    fn get_document(&self) -> Self::Handle {
        self.document.clone()
    }

    fn elem_name<'a>(&'a self, target: &'a Self::Handle) -> Self::ElemName<'a> {
        &target.name
    }

    fn create_element(
        &self,
        name: QualName,
        _attrs: Vec<Attribute>,
        _flags: ElementFlags,
    ) -> Self::Handle {
        Node::new(name, NodeKind::Element)
    }

    fn create_comment(&self, _text: StrTendril) -> Self::Handle {
        Node::unnamed(NodeKind::Other)
    }

    fn create_pi(&self, _target: StrTendril, _data: StrTendril) -> Self::Handle {
        Node::unnamed(NodeKind::Other)
    }

    fn append(&self, parent: &Self::Handle, child: NodeOrText<Self::Handle>) {
        append_child(parent, child);
    }

    fn append_based_on_parent_node(
        &self,
        element: &Self::Handle,
        prev_element: &Self::Handle,
        child: NodeOrText<Self::Handle>,
    ) {
        if element.parent().is_some() {
            insert_before(element, child);
        } else {
            append_child(prev_element, child);
        }
    }

    fn append_doctype_to_document(
        &self,
        _name: StrTendril,
        _public_id: StrTendril,
        _system_id: StrTendril,
    ) {
    }

    fn get_template_contents(&self, target: &Self::Handle) -> Self::Handle {
        target.clone()
    }

    fn same_node(&self, x: &Self::Handle, y: &Self::Handle) -> bool {
        Rc::ptr_eq(x, y)
    }

    fn set_quirks_mode(&self, _mode: QuirksMode) {}

    fn append_before_sibling(&self, sibling: &Self::Handle, new_node: NodeOrText<Self::Handle>) {
        insert_before(sibling, new_node);
    }

    fn add_attrs_if_missing(&self, _target: &Self::Handle, _attrs: Vec<Attribute>) {}

    fn remove_from_parent(&self, target: &Self::Handle) {
        detach(target);
    }

    fn reparent_children(&self, node: &Self::Handle, new_parent: &Self::Handle) {
        let children = std::mem::take(&mut *node.children.borrow_mut());
        let mut target = new_parent.children.borrow_mut();
        for child in children {
            child.set_parent(new_parent);
            target.push(child);
        }
    }
}

#[cfg(test)]
mod tests {
    use html5ever::tendril::TendrilSink;
    use html5ever::{ParseOpts, parse_document};

    use super::*;

    fn parse_html(html: &str) -> Handle {
        parse_document(TextSink::default(), ParseOpts::default())
            .from_utf8()
            .one(html.as_bytes())
    }

    fn find(node: &Handle, tag: &str) -> Option<Handle> {
        if matches!(node.kind, NodeKind::Element) && node.local_name() == tag {
            return Some(node.clone());
        }
        node.children.borrow().iter().find_map(|c| find(c, tag))
    }

    #[test]
    fn test_basic_parse() {
        let doc = parse_html("<html><body><p>Hello</p></body></html>");
        let p = find(&doc, "p").expect("should find p");
        let children = p.children.borrow();
        assert_eq!(children.len(), 1);
        match &children[0].kind {
            NodeKind::Text(t) => assert_eq!(&*t.borrow(), "Hello"),
            _ => panic!("expected text"),
        }
    }

    #[test]
    fn test_adjacent_text_merges() {
        let doc = parse_html("<p>a&amp;b</p>");
        let p = find(&doc, "p").unwrap();
        assert_eq!(p.children.borrow().len(), 1);
    }

    #[test]
    fn test_misnested_table_text_is_kept() {
        // Foster parenting moves stray text in front of the table
        let doc = parse_html("<table>stray<tr><td>cell</td></tr></table>");
        let body = find(&doc, "body").unwrap();
        let has_stray = body.children.borrow().iter().any(|c| match &c.kind {
            NodeKind::Text(t) => t.borrow().contains("stray"),
            _ => false,
        });
        assert!(has_stray, "expected foster-parented text under body");
    }
}
