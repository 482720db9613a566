use crate::bounds::BoundingBox;

/// Build an Overpass-QL query for all nodes, ways and relations matching
/// the tag filter inside the bounding box.
///
/// The query selects with the `nwr` shorthand, prints the matched set with
/// `out body;`, recurses down to every member way and node with `>;`, and
/// prints the recursed skeleton with `out skel qt;` so the converter can
/// resolve node references.
///
/// Filter forms:
/// - no tag: every element in the box
/// - tag only: `["tag"]` (presence)
/// - tag with one value: `["tag"="value"]` (equality)
/// - tag with several values, or `case_insensitive`: `["tag"~"v1|v2"]`
///
/// Tag and value content is interpolated literally; escaping beyond that is
/// a caller responsibility.
pub fn build(
    bounds: &BoundingBox,
    tag: Option<&str>,
    values: &[String],
    case_insensitive: bool,
    timeout_secs: u64,
) -> String {
    let filter = tag_filter(tag, values, case_insensitive);
    format!("[out:json][timeout:{timeout_secs}];(nwr{filter}{bounds};);out body;>;out skel qt;")
}

fn tag_filter(tag: Option<&str>, values: &[String], case_insensitive: bool) -> String {
    let Some(tag) = tag else {
        return String::new();
    };

    if values.is_empty() {
        return format!("[\"{tag}\"]");
    }

    let values: Vec<String> = if case_insensitive {
        values.iter().map(|v| first_char_insensitive(v)).collect()
    } else {
        values.to_vec()
    };

    if values.len() > 1 || case_insensitive {
        format!("[\"{}\"~\"{}\"]", tag, values.join("|"))
    } else {
        format!("[\"{}\"=\"{}\"]", tag, values[0])
    }
}

/// Replace the first character of a value by an upper/lower regex
/// alternation: `Residential` becomes `[rR]esidential`. The remaining
/// characters stay case-sensitive.
fn first_char_insensitive(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => format!(
            "[{}{}]{}",
            first.to_lowercase(),
            first.to_uppercase(),
            chars.as_str()
        ),
        None => String::new(),
    }
}
