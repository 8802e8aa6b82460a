use crate::validate::{ElementNode, ExpressionNode, FragmentNode, TemplateNode, TextNode};

/// Read-only traversal over the element tree built by `parse`.
///
/// Rules:
/// 1. Children are visited in document order.
/// 2. Implementers override `visit_*` methods to add behavior.
/// 3. Implementers call the matching `walk_*` function to keep descending,
///    or skip it to prune the subtree.
pub trait TemplateVisitor {
    fn visit_node(&mut self, node: &TemplateNode) {
        walk_node(self, node);
    }

    fn visit_element(&mut self, element: &ElementNode) {
        walk_element(self, element);
    }

    fn visit_fragment(&mut self, fragment: &FragmentNode) {
        walk_fragment(self, fragment);
    }

    fn visit_text(&mut self, _text: &TextNode) {}

    fn visit_expression(&mut self, _expression: &ExpressionNode) {}

    fn visit_children(&mut self, children: &[TemplateNode]) {
        walk_children(self, children);
    }
}

pub fn walk_node<V: TemplateVisitor + ?Sized>(visitor: &mut V, node: &TemplateNode) {
    match node {
        TemplateNode::Element(el) => visitor.visit_element(el),
        TemplateNode::Fragment(f) => visitor.visit_fragment(f),
        TemplateNode::Text(t) => visitor.visit_text(t),
        TemplateNode::Expression(e) => visitor.visit_expression(e),
    }
}

pub fn walk_children<V: TemplateVisitor + ?Sized>(visitor: &mut V, children: &[TemplateNode]) {
    for node in children {
        visitor.visit_node(node);
    }
}

pub fn walk_element<V: TemplateVisitor + ?Sized>(visitor: &mut V, element: &ElementNode) {
    visitor.visit_children(&element.children);
}

pub fn walk_fragment<V: TemplateVisitor + ?Sized>(visitor: &mut V, fragment: &FragmentNode) {
    visitor.visit_children(&fragment.children);
}

/// Mutable counterpart used by passes that annotate the tree in place.
pub trait TemplateVisitorMut {
    fn visit_node_mut(&mut self, node: &mut TemplateNode) {
        walk_node_mut(self, node);
    }

    fn visit_element_mut(&mut self, element: &mut ElementNode) {
        walk_children_mut(self, &mut element.children);
    }

    fn visit_fragment_mut(&mut self, fragment: &mut FragmentNode) {
        walk_children_mut(self, &mut fragment.children);
    }
}

pub fn walk_node_mut<V: TemplateVisitorMut + ?Sized>(visitor: &mut V, node: &mut TemplateNode) {
    match node {
        TemplateNode::Element(el) => visitor.visit_element_mut(el),
        TemplateNode::Fragment(f) => visitor.visit_fragment_mut(f),
        TemplateNode::Text(_) | TemplateNode::Expression(_) => {}
    }
}

pub fn walk_children_mut<V: TemplateVisitorMut + ?Sized>(
    visitor: &mut V,
    children: &mut [TemplateNode],
) {
    for node in children {
        visitor.visit_node_mut(node);
    }
}
