//! Parameter descriptions from docstrings.
//!
//! Google style (`Args:` sections) and numpydoc style (`Parameters` with a
//! dashed underline) are recognized. Descriptions become widget tooltips
//! unless a tooltip was given explicitly.

use indexmap::IndexMap;

use crate::signature::Signature;

const GOOGLE_HEADERS: &[&str] = &[
    "Args:",
    "Arguments:",
    "Parameters:",
    "Params:",
    "Keyword Args:",
    "Keyword Arguments:",
    "Other Parameters:",
];

const NUMPY_HEADERS: &[&str] = &["Parameters", "Other Parameters"];

fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

fn is_underline(line: &str) -> bool {
    let trimmed = line.trim();
    !trimmed.is_empty() && trimmed.chars().all(|c| c == '-')
}

struct Entry {
    names: Vec<String>,
    description: Vec<String>,
}

impl Entry {
    fn google(line: &str) -> Self {
        let (head, description) = match line.split_once(':') {
            Some((head, rest)) => (head, rest.trim()),
            None => (line, ""),
        };
        let name = head.split_whitespace().next().unwrap_or_default();
        Self {
            names: vec![name.to_string()],
            description: vec![description.to_string()],
        }
    }

    fn numpy(line: &str) -> Self {
        let head = line.split_once(" :").map_or(line, |(head, _)| head);
        let head = head.split_once(':').map_or(head, |(head, _)| head);
        Self {
            names: head
                .split(',')
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty())
                .collect(),
            description: Vec::new(),
        }
    }
}

/// Descriptions of the documented parameters, by name, in order.
///
/// Backticks are removed and continuation lines joined with spaces.
pub fn param_descriptions(doc: &str) -> IndexMap<String, String> {
    let lines: Vec<&str> = doc.lines().collect();
    let mut entries: Vec<Entry> = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];
        let trimmed = line.trim();
        let header_indent = indent_of(line);

        if GOOGLE_HEADERS.contains(&trimmed) {
            i += 1;
            let mut entry_indent = None;
            while i < lines.len() {
                let line = lines[i];
                if line.trim().is_empty() {
                    i += 1;
                    continue;
                }
                let indent = indent_of(line);
                if indent <= header_indent {
                    break;
                }
                let entry_indent = *entry_indent.get_or_insert(indent);
                if indent <= entry_indent {
                    entries.push(Entry::google(line.trim()));
                } else if let Some(entry) = entries.last_mut() {
                    entry.description.push(line.trim().to_string());
                }
                i += 1;
            }
            continue;
        }

        if NUMPY_HEADERS.contains(&trimmed) && lines.get(i + 1).is_some_and(|l| is_underline(l)) {
            i += 2;
            while i < lines.len() {
                let line = lines[i];
                if line.trim().is_empty() {
                    i += 1;
                    continue;
                }
                if lines.get(i + 1).is_some_and(|l| is_underline(l)) {
                    break;
                }
                let indent = indent_of(line);
                if indent < header_indent {
                    break;
                }
                if indent == header_indent {
                    entries.push(Entry::numpy(line.trim()));
                } else if let Some(entry) = entries.last_mut() {
                    entry.description.push(line.trim().to_string());
                }
                i += 1;
            }
            continue;
        }
        i += 1;
    }

    let mut descriptions = IndexMap::new();
    for entry in entries {
        let text = entry
            .description
            .iter()
            .map(String::as_str)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
            .replace('`', "");
        for name in entry.names {
            descriptions.insert(name, text.clone());
        }
    }
    descriptions
}

/// Set each documented parameter's tooltip, keeping explicit ones.
///
/// Documented names the signature does not have are ignored.
pub fn inject_tooltips(doc: Option<&str>, signature: &mut Signature) {
    let Some(doc) = doc else {
        return;
    };
    for (name, description) in param_descriptions(doc) {
        if let Some(param) = signature.get_mut(&name) {
            param.options.tooltip.get_or_insert(description);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::WidgetOptions;
    use crate::signature::Parameter;

    const GOOGLE: &str = "Add things.

    Args:
        x (int): The first value.
            Must be `positive`.
        y: The second value.

    Returns:
        int: The sum.
    ";

    const NUMPY: &str = "Add things.

    Parameters
    ----------
    x : int
        The first value.
    a, b : float
        Shared description.

    Returns
    -------
    int
        The sum.
    ";

    #[test]
    fn test_google_sections() {
        let d = param_descriptions(GOOGLE);
        assert_eq!(d.get("x").map(String::as_str), Some("The first value. Must be positive."));
        assert_eq!(d.get("y").map(String::as_str), Some("The second value."));
        assert_eq!(d.len(), 2);
    }

    #[test]
    fn test_numpy_sections() {
        let d = param_descriptions(NUMPY);
        assert_eq!(d.get("x").map(String::as_str), Some("The first value."));
        assert_eq!(d.get("a").map(String::as_str), Some("Shared description."));
        assert_eq!(d.get("b").map(String::as_str), Some("Shared description."));
        assert!(!d.contains_key("int"));
    }

    #[test]
    fn test_explicit_tooltip_kept() {
        let mut sig = Signature::new([
            Parameter::new("x").with_options(WidgetOptions::new().with_tooltip("mine")),
            Parameter::new("y"),
        ]);
        inject_tooltips(Some(GOOGLE), &mut sig);
        assert_eq!(sig.get("x").unwrap().options.tooltip.as_deref(), Some("mine"));
        assert_eq!(
            sig.get("y").unwrap().options.tooltip.as_deref(),
            Some("The second value.")
        );
    }
}
