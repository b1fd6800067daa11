//! The "markdown parser" external collaborator: turns a
//! markdown string into a [`SectionNode`] tree. Given one concrete
//! implementation here (`pulldown-cmark`) so the crate is runnable
//! end-to-end; callers may supply their own tree directly to
//! [`crate::indexer::sync_document`] instead.

use pulldown_cmark::{Event, HeadingLevel, Parser, Tag, TagEnd};

use super::document::{derive_section_id, SectionNode};

struct Block {
    /// Raw markdown heading level (1..=6); 0 for the synthetic root.
    raw_level: u32,
    title: String,
    content: Vec<String>,
    children: Vec<usize>,
}

/// Parse a markdown document string into a [`SectionNode`] tree rooted at
/// `doc_title`.
///
/// Headings form the hierarchy (section level is computed from tree depth,
/// not raw heading number, so skipped levels like `#` followed directly by
/// `###` still satisfy the "child level = parent level + 1" invariant).
/// Paragraph text is attached to the nearest preceding heading (or the
/// document root, for text appearing before the first heading).
pub fn parse_markdown_to_tree(doc_title: &str, markdown: &str) -> SectionNode {
    let mut arena: Vec<Block> = vec![Block {
        raw_level: 0,
        title: doc_title.to_string(),
        content: Vec::new(),
        children: Vec::new(),
    }];

    let mut stack: Vec<usize> = vec![0];
    let mut current_target = 0usize;
    let mut heading_buf: Option<String> = None;
    let mut paragraph_buf: Option<String> = None;

    let parser = Parser::new(markdown);
    for event in parser {
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                heading_buf = Some(String::new());
                let _ = level;
            }
            Event::End(TagEnd::Heading(level)) => {
                let title = heading_buf.take().unwrap_or_default();
                let raw_level = heading_level_to_u32(level);

                while stack.len() > 1 && arena[*stack.last().unwrap()].raw_level >= raw_level {
                    stack.pop();
                }
                let parent = *stack.last().unwrap();

                let idx = arena.len();
                arena.push(Block {
                    raw_level,
                    title: title.trim().to_string(),
                    content: Vec::new(),
                    children: Vec::new(),
                });
                arena[parent].children.push(idx);
                stack.push(idx);
                current_target = idx;
            }
            Event::Start(Tag::Paragraph) => {
                paragraph_buf = Some(String::new());
            }
            Event::End(TagEnd::Paragraph) => {
                if let Some(text) = paragraph_buf.take() {
                    let trimmed = text.trim();
                    if !trimmed.is_empty() {
                        arena[current_target].content.push(trimmed.to_string());
                    }
                }
            }
            Event::Text(text) | Event::Code(text) => {
                if let Some(buf) = heading_buf.as_mut() {
                    buf.push_str(&text);
                } else if let Some(buf) = paragraph_buf.as_mut() {
                    buf.push_str(&text);
                }
            }
            Event::SoftBreak => {
                if let Some(buf) = paragraph_buf.as_mut() {
                    buf.push(' ');
                } else if let Some(buf) = heading_buf.as_mut() {
                    buf.push(' ');
                }
            }
            Event::HardBreak => {
                if let Some(buf) = paragraph_buf.as_mut() {
                    buf.push('\n');
                }
            }
            _ => {}
        }
    }

    build_node(&arena, 0, 0)
}

fn heading_level_to_u32(level: HeadingLevel) -> u32 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

fn build_node(arena: &[Block], idx: usize, level: u32) -> SectionNode {
    let block = &arena[idx];
    let id = derive_section_id(&block.title);
    let children: Vec<SectionNode> = block
        .children
        .iter()
        .map(|&c| build_node(arena, c, level + 1))
        .collect();

    let node = if idx == 0 {
        SectionNode::new_document(id, block.title.clone())
    } else {
        SectionNode::new_section(id, level, block.title.clone(), block.content.clone())
    };
    node.with_children(children)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_headings_produce_flat_tree() {
        let md = "# Intro\nHello there.\n\n# Conclusion\nBye.\n";
        let root = parse_markdown_to_tree("Doc", md);
        assert_eq!(root.children.len(), 2);
        assert_eq!(root.children[0].title, "Intro");
        assert_eq!(root.children[0].level, 1);
        assert_eq!(root.children[0].content, vec!["Hello there.".to_string()]);
    }

    #[test]
    fn nested_headings_nest() {
        let md = "# A\n## B\ntext\n### C\nmore\n";
        let root = parse_markdown_to_tree("Doc", md);
        assert_eq!(root.children.len(), 1);
        let a = &root.children[0];
        assert_eq!(a.title, "A");
        assert_eq!(a.children.len(), 1);
        let b = &a.children[0];
        assert_eq!(b.title, "B");
        assert_eq!(b.level, 2);
        assert_eq!(b.children.len(), 1);
        assert_eq!(b.children[0].title, "C");
        assert_eq!(b.children[0].level, 3);
    }

    #[test]
    fn skipped_heading_levels_still_satisfy_depth_invariant() {
        // H1 then H3 directly: tree level must still be parent+1, not 3.
        let md = "# A\n### C\ntext\n";
        let root = parse_markdown_to_tree("Doc", md);
        let a = &root.children[0];
        let c = &a.children[0];
        assert_eq!(c.level, a.level + 1);
    }

    #[test]
    fn leading_text_attaches_to_root() {
        let md = "intro text before any heading\n\n# A\nbody\n";
        let root = parse_markdown_to_tree("Doc", md);
        assert_eq!(root.content, vec!["intro text before any heading".to_string()]);
    }
}
