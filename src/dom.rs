use std::io;

use html5ever::interface::{ElementFlags, NodeOrText, TreeSink};
use html5ever::serialize::{SerializeOpts, TraversalScope, serialize};
use html5ever::tendril::{StrTendril, TendrilSink};
use html5ever::{Attribute, LocalName, Namespace, QualName, parse_document};
use markup5ever_rcdom::{Handle, NodeData, RcDom, SerializableHandle};

const HTML_NS: &str = "http://www.w3.org/1999/xhtml";

/// Parses a full html document. html5ever recovers from malformed markup,
/// so this never fails.
pub fn get_dom(html: &str) -> RcDom {
    parse_document(RcDom::default(), Default::default()).one(html)
}

pub fn serialize_document(dom: &RcDom) -> io::Result<String> {
    let handle: SerializableHandle = dom.document.clone().into();
    let mut out = Vec::new();
    serialize(&mut out, &handle, SerializeOpts::default())?;
    String::from_utf8(out).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Outer html of a single element.
pub fn serialize_node(node: &Handle) -> io::Result<String> {
    let handle: SerializableHandle = node.clone().into();
    let mut out = Vec::new();
    let opts = SerializeOpts {
        traversal_scope: TraversalScope::IncludeNode,
        ..Default::default()
    };
    serialize(&mut out, &handle, opts)?;
    String::from_utf8(out).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

pub fn tag_is(node: &Handle, tag: &str) -> bool {
    matches!(&node.data, NodeData::Element { name, .. } if &*name.local == tag)
}

pub fn is_element(node: &Handle) -> bool {
    matches!(&node.data, NodeData::Element { .. })
}

/// First element carrying `id`, in document order.
pub fn element_by_id(root: &Handle, id: &str) -> Option<Handle> {
    if attr(root, "id").as_deref() == Some(id) {
        return Some(root.clone());
    }
    for child in root.children.borrow().iter() {
        if let Some(found) = element_by_id(child, id) {
            return Some(found);
        }
    }
    None
}

pub fn first_element_by_tag(root: &Handle, tag: &str) -> Option<Handle> {
    for child in root.children.borrow().iter() {
        if tag_is(child, tag) {
            return Some(child.clone());
        }
        if let Some(found) = first_element_by_tag(child, tag) {
            return Some(found);
        }
    }
    None
}

/// Snapshot of every descendant element named `tag`, in document order.
/// Later mutations of the tree do not affect the returned list.
pub fn elements_by_tag(root: &Handle, tag: &str) -> Vec<Handle> {
    let mut out = Vec::new();
    collect_by_tag(root, tag, &mut out);
    out
}

fn collect_by_tag(node: &Handle, tag: &str, out: &mut Vec<Handle>) {
    for child in node.children.borrow().iter() {
        if tag_is(child, tag) {
            out.push(child.clone());
        }
        collect_by_tag(child, tag, out);
    }
}

pub fn parent_of(node: &Handle) -> Option<Handle> {
    let weak = node.parent.take();
    let parent = weak.as_ref().and_then(|w| w.upgrade());
    node.parent.set(weak);
    parent
}

pub fn attr(node: &Handle, name: &str) -> Option<String> {
    match &node.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|a| &*a.name.local == name)
            .map(|a| a.value.to_string()),
        _ => None,
    }
}

pub fn set_attr(node: &Handle, name: &str, value: &str) {
    if let NodeData::Element { attrs, .. } = &node.data {
        let mut attrs = attrs.borrow_mut();
        match attrs.iter_mut().find(|a| &*a.name.local == name) {
            Some(existing) => existing.value = StrTendril::from_slice(value),
            None => attrs.push(new_attribute(name, value)),
        }
    }
}

pub fn remove_attr(node: &Handle, name: &str) {
    if let NodeData::Element { attrs, .. } = &node.data {
        attrs.borrow_mut().retain(|a| &*a.name.local != name);
    }
}

fn new_attribute(name: &str, value: &str) -> Attribute {
    Attribute {
        name: QualName::new(None, Namespace::from(""), LocalName::from(name)),
        value: StrTendril::from_slice(value),
    }
}

/// Creates a detached html element.
pub fn create_element(dom: &RcDom, tag: &str, attrs: &[(&str, &str)]) -> Handle {
    let name = QualName::new(None, Namespace::from(HTML_NS), LocalName::from(tag));
    let attrs = attrs
        .iter()
        .map(|(name, value)| new_attribute(name, value))
        .collect();
    dom.create_element(name, attrs, ElementFlags::default())
}

/// Appends `child` as the last child of `parent`, detaching it from any
/// previous parent first.
pub fn append_child(dom: &RcDom, parent: &Handle, child: Handle) {
    dom.remove_from_parent(&child);
    dom.append(parent, NodeOrText::AppendNode(child));
}

pub fn append_text(dom: &RcDom, parent: &Handle, text: &str) {
    dom.append(parent, NodeOrText::AppendText(StrTendril::from_slice(text)));
}

/// Puts `new` at the position `old` occupies and detaches `old`.
/// Returns false when `old` has no parent.
pub fn replace_with(dom: &RcDom, old: &Handle, new: Handle) -> bool {
    if parent_of(old).is_none() {
        return false;
    }
    dom.append_before_sibling(old, NodeOrText::AppendNode(new));
    dom.remove_from_parent(old);
    true
}

pub fn clear_children(dom: &RcDom, node: &Handle) {
    let children: Vec<Handle> = node.children.borrow().clone();
    for child in children {
        dom.remove_from_parent(&child);
    }
}

pub fn text_content(node: &Handle) -> String {
    let mut out = String::new();
    push_text(node, &mut out);
    out
}

fn push_text(node: &Handle, out: &mut String) {
    if let NodeData::Text { contents } = &node.data {
        out.push_str(&contents.borrow());
    }
    for child in node.children.borrow().iter() {
        push_text(child, out);
    }
}

/// Rewrites the `visibility` declaration of the inline style, keeping
/// every other declaration. Showing an element also drops `hidden`.
pub fn set_visibility(node: &Handle, visible: bool) {
    let style = attr(node, "style").unwrap_or_default();
    let mut declarations: Vec<String> = style
        .split(';')
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .filter(|d| {
            let property = d.split(':').next().unwrap_or_default();
            !property.trim().eq_ignore_ascii_case("visibility")
        })
        .map(str::to_string)
        .collect();
    declarations.push(format!(
        "visibility: {}",
        if visible { "visible" } else { "hidden" }
    ));
    set_attr(node, "style", &declarations.join("; "));
    if visible {
        remove_attr(node, "hidden");
    }
}

pub fn is_visible(node: &Handle) -> bool {
    if attr(node, "hidden").is_some() {
        return false;
    }
    let style = attr(node, "style").unwrap_or_default();
    let mut visible = true;
    for declaration in style.split(';') {
        if let Some((property, value)) = declaration.split_once(':') {
            if property.trim().eq_ignore_ascii_case("visibility") {
                visible = !value.trim().eq_ignore_ascii_case("hidden");
            }
        }
    }
    visible
}
