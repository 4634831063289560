#![allow(dead_code)]

use quick_nav::cli::config::AppConfig;
use quick_nav::dom::tree::{Document, NodeId};

pub const CHAT_URL: &str = "https://chatgpt.com/c/1";

pub fn fixture(name: &str) -> String {
    let base = std::env::current_dir().unwrap();
    base.join("tests").join("fixtures").join(name).display().to_string()
}

/// Empty chat page: `<html><body><main></main></body></html>`.
pub fn chat_page() -> (Document, NodeId) {
    let doc = Document::new(CHAT_URL);
    let body = doc.body().unwrap();
    let main = doc.create_element("main");
    doc.append_child(body, main);
    (doc, main)
}

/// Build a detached turn `<div data-message-author-role=role>text</div>`.
pub fn turn(doc: &Document, role: &str, text: &str) -> NodeId {
    let div = doc.create_element("div");
    doc.set_attribute(div, "data-message-author-role", role);
    let content = doc.create_text(text);
    doc.append_child(div, content);
    div
}

/// Append a role-marked turn under `parent`.
pub fn push_turn(doc: &Document, parent: NodeId, role: &str, text: &str) -> NodeId {
    let node = turn(doc, role, text);
    doc.append_child(parent, node);
    node
}

/// Append an unmarked `<article>` turn under `parent`.
pub fn push_article(doc: &Document, parent: NodeId, text: &str) -> NodeId {
    let article = doc.create_element("article");
    let content = doc.create_text(text);
    doc.append_child(article, content);
    doc.append_child(parent, article);
    article
}

/// Chat page holding `u1, a1, u2, a2, a3`.
pub fn conversation() -> (Document, NodeId) {
    let (doc, main) = chat_page();
    push_turn(&doc, main, "user", "How do I reverse a list?");
    push_turn(&doc, main, "assistant", "Use reversed() or slicing.");
    push_turn(&doc, main, "user", "And a string?");
    push_turn(&doc, main, "assistant", "Same idea: s[::-1].");
    push_turn(&doc, main, "assistant", "Anything else?");
    (doc, main)
}

/// Default config with tracing off and no panel file.
pub fn test_config() -> AppConfig {
    AppConfig::default()
}
