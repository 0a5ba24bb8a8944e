use crate::dialect::Dialect;
use crate::strategy::{ScriptExtractor, ScriptOutline};

/// GDScript (`.gd`): `class_name`, `extends` and `func` lines
#[derive(Debug, Default, Clone, Copy)]
pub struct GdScriptExtractor;

impl ScriptExtractor for GdScriptExtractor {
    fn dialect(&self) -> Dialect {
        Dialect::GdScript
    }

    fn extract(&self, text: &str) -> ScriptOutline {
        let mut outline = ScriptOutline::default();
        let comment = self.dialect().comment_prefix();

        for raw in text.lines() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with(comment) {
                continue;
            }

            let mut tokens = line.split_whitespace();
            match tokens.next() {
                Some("class_name") => {
                    if outline.class_name.is_none() {
                        outline.class_name = tokens.next().and_then(clean_class_name);
                    }
                    // Godot 4 allows `class_name X extends Y` on one line
                    if tokens.next() == Some("extends") && outline.extends.is_none() {
                        outline.extends = tokens.next().and_then(clean_type_name);
                    }
                }
                Some("extends") => {
                    if outline.extends.is_none() {
                        outline.extends = tokens.next().and_then(clean_type_name);
                    }
                }
                Some("func") | Some("static") => {
                    if let Some(name) = function_name(line) {
                        outline.functions.push(name);
                    }
                }
                _ => {}
            }
        }

        outline.summary = summarize(&outline);
        outline
    }
}

fn clean_class_name(token: &str) -> Option<String> {
    let end = token.find([':', ',']).unwrap_or(token.len());
    let name = token[..end].trim();
    (!name.is_empty()).then(|| name.to_string())
}

fn clean_type_name(token: &str) -> Option<String> {
    let name = token.trim_end_matches(':').trim();
    (!name.is_empty()).then(|| name.to_string())
}

fn function_name(line: &str) -> Option<String> {
    let rest = line.strip_prefix("static ").unwrap_or(line).trim_start();
    let rest = rest.strip_prefix("func ")?;
    let end = rest.find('(').unwrap_or(rest.len());
    let name = rest[..end].trim();
    (!name.is_empty()).then(|| name.to_string())
}

fn summarize(outline: &ScriptOutline) -> String {
    let mut summary = String::from("GDScript");
    if let Some(parent) = &outline.extends {
        summary.push_str(" extending ");
        summary.push_str(parent);
    }
    if !outline.functions.is_empty() {
        summary.push_str(&format!(" with {} functions", outline.functions.len()));
    }
    summary
}
