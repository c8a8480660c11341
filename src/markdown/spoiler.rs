//! `>!` spoiler blocks.
//!
//! A block quote whose first paragraph starts with the spoiler prefix is
//! rendered as a `<details>` element:
//!
//! ```text
//! >! [Click me] hidden text
//! ```
//!
//! becomes `<details><summary>Click me</summary>hidden text</details>`.
//! Without a bracketed label the default reveal text is used.

use pulldown_cmark::{CowStr, Event, Tag, TagEnd};

struct Opening {
    reveal: Option<String>,
    remainder: String,
    paragraph_end: usize,
}

/// Rewrite spoiler block quotes in an event stream.
pub fn apply_spoilers<'a>(
    events: Vec<Event<'a>>,
    prefix: &str,
    default_reveal: &str,
) -> Vec<Event<'a>> {
    let mut out = Vec::with_capacity(events.len());
    // One entry per open block quote: was it opened as a spoiler?
    let mut open: Vec<bool> = Vec::new();
    let mut skip: Vec<usize> = Vec::new();

    let mut i = 0;
    while i < events.len() {
        if skip.contains(&i) {
            i += 1;
            continue;
        }
        match &events[i] {
            Event::Start(Tag::BlockQuote(_)) => match detect(&events, i, prefix) {
                Some(opening) => {
                    open.push(true);
                    let reveal = opening.reveal.as_deref().unwrap_or(default_reveal);
                    out.push(Event::Html(CowStr::from(format!(
                        "<details><summary>{}</summary>",
                        html_escape::encode_text(reveal)
                    ))));
                    skip.push(opening.paragraph_end);
                    if !opening.remainder.is_empty() {
                        out.push(Event::Text(CowStr::from(opening.remainder)));
                    } else if matches!(
                        events.get(i + 3),
                        Some(Event::SoftBreak | Event::HardBreak)
                    ) {
                        skip.push(i + 3);
                    }
                    // Block quote start, paragraph start, marker text.
                    i += 3;
                    continue;
                }
                None => {
                    open.push(false);
                    out.push(events[i].clone());
                }
            },
            Event::End(TagEnd::BlockQuote(_)) => {
                if open.pop() == Some(true) {
                    out.push(Event::Html(CowStr::Borrowed("</details>")));
                } else {
                    out.push(events[i].clone());
                }
            }
            event => out.push(event.clone()),
        }
        i += 1;
    }
    out
}

fn detect(events: &[Event<'_>], start: usize, prefix: &str) -> Option<Opening> {
    if !matches!(events.get(start + 1), Some(Event::Start(Tag::Paragraph))) {
        return None;
    }
    let Some(Event::Text(text)) = events.get(start + 2) else {
        return None;
    };
    let rest = text.strip_prefix(prefix)?.trim_start();

    let (reveal, rest) = match rest.strip_prefix('[').and_then(|r| r.split_once(']')) {
        Some((label, after)) if !label.trim().is_empty() && !label.contains('\n') => {
            (Some(label.trim().to_string()), after)
        }
        _ => (None, rest),
    };

    let paragraph_end = events[start + 3..]
        .iter()
        .position(|e| matches!(e, Event::End(TagEnd::Paragraph)))
        .map(|offset| start + 3 + offset)?;

    Some(Opening {
        reveal,
        remainder: rest.trim_start().to_string(),
        paragraph_end,
    })
}
