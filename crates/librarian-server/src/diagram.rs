//! Mermaid text generation over resolved graph edges.

use std::collections::{HashMap, HashSet};

/// Render directed `(src, dst)` pairs as a Mermaid `graph TD` flowchart.
/// Nodes are declared with their label on first appearance; ids are stable
/// across runs because edges arrive sorted from the store.
pub fn mermaid_graph(edges: &[(String, String)]) -> String {
    let mut lines = vec!["graph TD".to_string()];
    if edges.is_empty() {
        lines.push("    empty[\"(no resolved edges)\"]".to_string());
        return lines.join("\n");
    }

    let mut ids: HashMap<&str, String> = HashMap::new();
    for (src, dst) in edges {
        for name in [src.as_str(), dst.as_str()] {
            if !ids.contains_key(name) {
                let id = format!("n{}", ids.len());
                ids.insert(name, id);
            }
        }
    }

    let mut declared: HashSet<&str> = HashSet::new();
    for (src, dst) in edges {
        let left = node_ref(src, &ids, &mut declared);
        let right = node_ref(dst, &ids, &mut declared);
        lines.push(format!("    {left} --> {right}"));
    }
    lines.join("\n")
}

fn node_ref<'a>(
    name: &'a str,
    ids: &HashMap<&str, String>,
    declared: &mut HashSet<&'a str>,
) -> String {
    let id = &ids[name];
    if declared.insert(name) {
        format!("{id}[\"{}\"]", name.replace('"', "'"))
    } else {
        id.clone()
    }
}
