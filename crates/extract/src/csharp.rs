use crate::dialect::Dialect;
use crate::strategy::{ScriptExtractor, ScriptOutline};

/// Return-type keywords that mark a line as a method signature candidate
const METHOD_MARKERS: &[&str] = &["void ", "async ", "int ", "float ", "string ", "bool "];

/// C# (`.cs`): namespace, first class declaration with its base type (when
/// one follows `:`), and methods
#[derive(Debug, Default, Clone, Copy)]
pub struct CSharpExtractor;

impl ScriptExtractor for CSharpExtractor {
    fn dialect(&self) -> Dialect {
        Dialect::CSharp
    }

    fn extract(&self, text: &str) -> ScriptOutline {
        let mut outline = ScriptOutline::default();
        let comment = self.dialect().comment_prefix();

        for raw in text.lines() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with(comment) {
                continue;
            }

            if let Some(rest) = line.strip_prefix("namespace ") {
                if outline.namespace.is_none() {
                    outline.namespace = namespace_name(rest);
                }
                continue;
            }

            if outline.class_name.is_none() {
                if let Some((class_name, base)) = class_declaration(line) {
                    outline.class_name = Some(class_name);
                    outline.extends = base;
                    continue;
                }
            }

            if let Some(name) = method_name(line) {
                outline.functions.push(name);
            }
        }

        outline.summary = summarize(&outline);
        outline
    }
}

fn namespace_name(rest: &str) -> Option<String> {
    let end = rest.find(['{', ';']).unwrap_or(rest.len());
    let name = rest[..end].trim();
    (!name.is_empty()).then(|| name.to_string())
}

/// `public partial class Player : CharacterBody2D, IDamageable` → (`Player`, `CharacterBody2D`)
fn class_declaration(line: &str) -> Option<(String, Option<String>)> {
    let start = line.find("class ")? + "class ".len();
    let rest = &line[start..];

    let (name_part, base_part) = match rest.find(':') {
        Some(colon) => (&rest[..colon], Some(&rest[colon + 1..])),
        None => (rest, None),
    };

    let name = name_part
        .split(|c: char| c.is_whitespace() || c == '{' || c == '<')
        .find(|s| !s.is_empty())?;
    if !is_identifier(name) {
        return None;
    }

    let base = base_part.and_then(|b| {
        b.split([',', '{'])
            .next()
            .map(str::trim)
            .and_then(|b| b.split_whitespace().next())
            .map(str::to_string)
    });

    Some((name.to_string(), base))
}

fn method_name(line: &str) -> Option<String> {
    if !METHOD_MARKERS.iter().any(|m| line.contains(m)) {
        return None;
    }
    let paren = line.find('(')?;
    let signature = line[..paren].trim();
    // assignments such as `int total = Sum(a, b);` are calls, not declarations
    if signature.contains('=') {
        return None;
    }

    let parts: Vec<&str> = signature.split_whitespace().collect();
    if parts.len() < 2 {
        return None;
    }
    let name = parts[parts.len() - 1];
    let name = name.split('<').next().unwrap_or(name);
    is_identifier(name).then(|| name.to_string())
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_' || c == '@')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
}

fn summarize(outline: &ScriptOutline) -> String {
    let mut summary = String::from("C# script");
    if let Some(ns) = &outline.namespace {
        summary.push_str(" in namespace ");
        summary.push_str(ns);
    }
    if let Some(base) = &outline.extends {
        summary.push_str(" inheriting from ");
        summary.push_str(base);
    }
    if !outline.functions.is_empty() {
        summary.push_str(&format!(" with {} methods", outline.functions.len()));
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PLAYER: &str = r#"
using Godot;
using System.Threading.Tasks;

namespace Game.Actors
{
    public partial class Player : CharacterBody2D, IDamageable
    {
        private int _health = 100;

        public override void _Ready()
        {
            int bonus = ComputeBonus(3);
        }

        // public void Commented()
        public async Task LoadAsync(string path) { }

        private bool IsAlive() => _health > 0;

        public static float Speed(float mult) { return 1f; }
    }
}
"#;

    #[test]
    fn extracts_namespace_class_and_methods() {
        let outline = CSharpExtractor.extract(PLAYER);
        assert_eq!(outline.namespace.as_deref(), Some("Game.Actors"));
        assert_eq!(outline.class_name.as_deref(), Some("Player"));
        assert_eq!(outline.extends.as_deref(), Some("CharacterBody2D"));
        assert_eq!(outline.functions, vec!["_Ready", "LoadAsync", "IsAlive", "Speed"]);
        assert_eq!(
            outline.summary,
            "C# script in namespace Game.Actors inheriting from CharacterBody2D with 4 methods"
        );
    }

    #[test]
    fn file_scoped_namespace_and_plain_class() {
        let outline = CSharpExtractor.extract("namespace Tools;\npublic static class MathUtil {\n}\n");
        assert_eq!(outline.namespace.as_deref(), Some("Tools"));
        assert_eq!(outline.class_name.as_deref(), Some("MathUtil"));
        assert_eq!(outline.extends, None);
        assert_eq!(outline.summary, "C# script in namespace Tools");
    }

    #[test]
    fn generic_class_and_method_names() {
        let outline =
            CSharpExtractor.extract("public class Pool<T> : Node where T : class\n{\n  public async Task<int> Fill<TItem>(int n) {}\n}\n");
        assert_eq!(outline.class_name.as_deref(), Some("Pool"));
        assert_eq!(outline.extends.as_deref(), Some("Node"));
        assert_eq!(outline.functions, vec!["Fill"]);
    }

    #[test]
    fn first_class_declaration_wins() {
        let outline = CSharpExtractor
            .extract("public class Enemy : Area2D
{
}

internal class Loot : Resource
{
}
");
        assert_eq!(outline.class_name.as_deref(), Some("Enemy"));
        assert_eq!(outline.extends.as_deref(), Some("Area2D"));
    }

    #[test]
    fn noise_yields_bare_summary() {
        let outline = CSharpExtractor.extract("if (x) { return; }\nvoid(\n:: class :\n");
        assert!(outline.class_name.is_none());
        assert!(outline.functions.is_empty());
        assert_eq!(outline.summary, "C# script");
    }
}
