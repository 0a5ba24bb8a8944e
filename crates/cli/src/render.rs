//! Reply text split into prose and fenced code blocks

use console::style;

const FENCE: &str = "```";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    Text(&'a str),
    Code { lang: Option<&'a str>, code: &'a str },
}

/// Split `text` at ```` ``` ```` fences. An unterminated fence runs to the
/// end of the text.
pub fn segments(text: &str) -> Vec<Segment<'_>> {
    let mut out = Vec::new();
    let mut rest = text;

    while let Some(open) = rest.find(FENCE) {
        push_text(&mut out, &rest[..open]);
        let after = &rest[open + FENCE.len()..];
        let line_end = after.find('\n').unwrap_or(after.len());

        // ```inline```
        if let Some(close) = after[..line_end].find(FENCE) {
            out.push(Segment::Code {
                lang: None,
                code: &after[..close],
            });
            rest = &after[close + FENCE.len()..];
            continue;
        }

        let info = after[..line_end].trim();
        let lang = (!info.is_empty()).then_some(info);
        let body = after.get(line_end + 1..).unwrap_or_default();

        match body.find(FENCE) {
            Some(close) => {
                out.push(Segment::Code {
                    lang,
                    code: trim_newline(&body[..close]),
                });
                let tail = &body[close + FENCE.len()..];
                rest = tail.strip_prefix('\n').unwrap_or(tail);
            }
            None => {
                out.push(Segment::Code {
                    lang,
                    code: trim_newline(body),
                });
                return out;
            }
        }
    }

    push_text(&mut out, rest);
    out
}

fn push_text<'a>(out: &mut Vec<Segment<'a>>, text: &'a str) {
    let text = text.trim_matches('\n');
    if !text.trim().is_empty() {
        out.push(Segment::Text(text));
    }
}

fn trim_newline(code: &str) -> &str {
    code.strip_suffix('\n').unwrap_or(code)
}

/// Terminal rendering of a reply. Without `styled`, code blocks keep their
/// fences so the output can be pasted back as markdown.
pub fn render(text: &str, styled: bool) -> String {
    let mut blocks = Vec::new();
    for segment in segments(text) {
        match segment {
            Segment::Text(text) => blocks.push(text.to_string()),
            Segment::Code { lang, code } if styled => {
                let mut block = style(format!("── {}", lang.unwrap_or("code")))
                    .dim()
                    .to_string();
                for line in code.lines() {
                    block.push('\n');
                    block.push_str(&style(line).cyan().to_string());
                }
                blocks.push(block);
            }
            Segment::Code { lang, code } => {
                blocks.push(format!("{FENCE}{}\n{code}\n{FENCE}", lang.unwrap_or_default()));
            }
        }
    }
    blocks.join("\n\n")
}
