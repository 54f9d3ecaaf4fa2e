use srcx::rewrite::{escape_text, make_attrs, RewriteBuffer, Tag};
use srcx::strpool::StrPool;

fn tag(pool: &mut StrPool, element: &'static str, open: u32, close: u32, classes: &[&str]) -> Tag {
    Tag {
        element,
        open,
        close,
        attrs: pool.insert(make_attrs(classes, &[]).as_bytes()),
    }
}

/// Drop everything between `<` and `>`, undo the entity escapes.
fn strip_tags(html: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut in_tag = false;
    let mut i = 0;
    while i < html.len() {
        match html[i] {
            b'<' => in_tag = true,
            b'>' if in_tag => in_tag = false,
            b if !in_tag => out.push(b),
            _ => {}
        }
        i += 1;
    }
    let text = String::from_utf8(out).unwrap();
    text.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .into_bytes()
}

fn check_balanced(html: &str) {
    let mut stack: Vec<String> = Vec::new();
    let mut rest = html;
    while let Some(at) = rest.find('<') {
        rest = &rest[at + 1..];
        let end = rest.find('>').expect("unterminated tag");
        let body = &rest[..end];
        rest = &rest[end + 1..];
        if let Some(name) = body.strip_prefix('/') {
            assert_eq!(stack.pop().as_deref(), Some(name), "mismatched close");
        } else {
            let name = body.split_whitespace().next().unwrap();
            stack.push(name.to_string());
        }
    }
    assert!(stack.is_empty(), "unclosed tags: {:?}", stack);
}

#[test]
fn literal_bytes_escape_and_survive() {
    let mut pool = StrPool::new("tag");
    let mut buffer = RewriteBuffer::default();
    let body = b"if (a < b && c > d) { run(); }";
    buffer.add(tag(&mut pool, "span", 0, 2, &["keyword", "if"]), body.len() as u32);

    let html = buffer.render(body, &pool);
    assert_eq!(strip_tags(&html), body.to_vec());
    check_balanced(std::str::from_utf8(&html).unwrap());
    assert!(html.starts_with(b"<span class='keyword if'>if</span>"));
}

#[test]
fn output_is_independent_of_insertion_order() {
    let body = b"alpha beta gamma";
    let render = |order: &[(u32, u32)]| {
        let mut pool = StrPool::new("tag");
        let mut buffer = RewriteBuffer::default();
        for &(open, close) in order {
            buffer.add(tag(&mut pool, "span", open, close, &["x"]), body.len() as u32);
        }
        buffer.render(body, &pool)
    };
    let forward = render(&[(0, 5), (6, 10)]);
    let backward = render(&[(6, 10), (0, 5)]);
    assert_eq!(forward, backward);
}

#[test]
fn longer_closing_tag_becomes_the_outer_element() {
    let mut pool = StrPool::new("tag");
    let mut buffer = RewriteBuffer::default();
    let body = b"abcdef";
    buffer.add(tag(&mut pool, "span", 0, 3, &["inner"]), 6);
    buffer.add(tag(&mut pool, "a", 0, 6, &["outer"]), 6);

    let html = buffer.render(body, &pool);
    let text = String::from_utf8(html).unwrap();
    assert_eq!(
        text,
        "<a class='outer'><span class='inner'>abc</span>def</a>"
    );
}

#[test]
fn nested_tags_close_most_recent_first() {
    let mut pool = StrPool::new("tag");
    let mut buffer = RewriteBuffer::default();
    let body = b"xyzw";
    // Same close offset: the later-opened span must close first.
    buffer.add(tag(&mut pool, "a", 0, 4, &["outer"]), 4);
    buffer.add(tag(&mut pool, "span", 1, 4, &["inner"]), 4);

    let html = String::from_utf8(buffer.render(body, &pool)).unwrap();
    assert_eq!(
        html,
        "<a class='outer'>x<span class='inner'>yzw</span></a>"
    );
}

#[test]
fn duplicate_requests_render_once() {
    let mut pool = StrPool::new("tag");
    let mut buffer = RewriteBuffer::default();
    let body = b"name";
    buffer.add(tag(&mut pool, "span", 0, 4, &["def"]), 4);
    buffer.add(tag(&mut pool, "span", 0, 4, &["def"]), 4);

    let html = String::from_utf8(buffer.render(body, &pool)).unwrap();
    assert_eq!(html, "<span class='def'>name</span>");
    assert_eq!(buffer.duplicates, 1);
}

#[test]
fn same_range_different_attributes_both_render() {
    let mut pool = StrPool::new("tag");
    let mut buffer = RewriteBuffer::default();
    let body = b"name";
    buffer.add(tag(&mut pool, "span", 0, 4, &["def"]), 4);
    buffer.add(tag(&mut pool, "span", 0, 4, &["decl"]), 4);

    let html = String::from_utf8(buffer.render(body, &pool)).unwrap();
    check_balanced(&html);
    assert!(html.contains("class='def'"));
    assert!(html.contains("class='decl'"));
}

#[test]
fn invalid_requests_are_dropped_at_insertion() {
    let mut pool = StrPool::new("tag");
    let mut buffer = RewriteBuffer::default();
    buffer.add(tag(&mut pool, "span", 5, 2, &["x"]), 10);
    buffer.add(tag(&mut pool, "span", 0, 11, &["x"]), 10);
    assert_eq!(buffer.dropped, 2);
    assert!(buffer.is_empty());
}

#[test]
fn empty_body_renders_empty() {
    let mut pool = StrPool::new("tag");
    let mut buffer = RewriteBuffer::default();
    let html = buffer.render(b"", &pool);
    assert!(html.is_empty());
}

#[test]
fn single_byte_body_with_wrap() {
    let mut pool = StrPool::new("tag");
    let mut buffer = RewriteBuffer::default();
    buffer.add(tag(&mut pool, "span", 0, 1, &["numeric"]), 1);
    let html = String::from_utf8(buffer.render(b"7", &pool)).unwrap();
    assert_eq!(html, "<span class='numeric'>7</span>");
}

#[test]
fn zero_width_tag_opens_and_closes_in_place() {
    let mut pool = StrPool::new("tag");
    let mut buffer = RewriteBuffer::default();
    buffer.add(tag(&mut pool, "span", 2, 2, &["mark"]), 4);
    let html = String::from_utf8(buffer.render(b"abcd", &pool)).unwrap();
    assert_eq!(html, "ab<span class='mark'></span>cd");
}

#[test]
fn bytes_after_the_last_tag_are_flushed() {
    let mut pool = StrPool::new("tag");
    let mut buffer = RewriteBuffer::default();
    buffer.add(tag(&mut pool, "span", 0, 3, &["x"]), 12);
    let html = String::from_utf8(buffer.render(b"one two<tail", &pool)).unwrap();
    assert_eq!(html, "<span class='x'>one</span> two&lt;tail");
}

#[test]
fn overlap_at_same_open_keeps_containment() {
    let mut pool = StrPool::new("tag");
    let mut buffer = RewriteBuffer::default();
    let body = b"0123456789";
    buffer.add(tag(&mut pool, "span", 2, 5, &["short"]), 10);
    buffer.add(tag(&mut pool, "a", 2, 8, &["long"]), 10);

    let html = String::from_utf8(buffer.render(body, &pool)).unwrap();
    check_balanced(&html);
    let long_at = html.find("class='long'").unwrap();
    let short_at = html.find("class='short'").unwrap();
    assert!(long_at < short_at, "longer-closing tag must open first");
}

#[test]
fn escape_text_replaces_only_the_three_entities() {
    assert_eq!(escape_text(b"a&b<c>d\"e'"), b"a&amp;b&lt;c&gt;d\"e'".to_vec());
}
