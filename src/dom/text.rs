use crate::dom::tree::{DocumentInner, NodeData, NodeId};

/// Elements whose content never renders.
const SKIPPED_TAGS: &[&str] = &["script", "style", "template", "noscript", "head"];

/// Elements that start on their own line.
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "dd", "details", "div", "dl", "dt",
    "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6",
    "header", "hr", "li", "main", "nav", "ol", "p", "pre", "section", "summary", "table",
    "tr", "ul",
];

/// Append the rendered-text approximation of `node` to `out`.
///
/// Text nodes contribute their content verbatim, `<br>` a newline, and block
/// elements are separated from their neighbours by a newline. Hidden and
/// non-rendering elements are skipped. Whitespace is left as-is; callers
/// normalize it.
pub(crate) fn collect_inner_text(doc: &DocumentInner, node: NodeId, out: &mut String) {
    let Some(n) = doc.node(node) else {
        return;
    };

    let tag = match &n.data {
        NodeData::Text(text) => {
            out.push_str(text);
            return;
        }
        NodeData::Element { tag, .. } => tag.as_str(),
    };

    if SKIPPED_TAGS.contains(&tag) || doc.attr(node, "hidden").is_some() {
        return;
    }
    if tag == "br" {
        out.push('\n');
        return;
    }

    let block = BLOCK_TAGS.contains(&tag);
    if block && !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
    for child in &n.children {
        collect_inner_text(doc, *child, out);
    }
    if block && !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
}
