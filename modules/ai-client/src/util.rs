/// Truncate a string to at most `max_bytes` bytes at a character boundary.
pub fn truncate_to_char_boundary(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) && end > 0 {
        end -= 1;
    }
    &s[..end]
}

/// Strip markdown code fences (```json ... ```) wrapped around a model reply.
pub fn strip_code_blocks(response: &str) -> &str {
    response
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}

/// Best-effort isolation of the outermost JSON object in a model reply.
///
/// Models sometimes wrap JSON in prose ("Here is the result: {...}"). Returns
/// the fenced-stripped text unchanged when no braces are found.
pub fn extract_json_object(response: &str) -> &str {
    let stripped = strip_code_blocks(response);
    match (stripped.find('{'), stripped.rfind('}')) {
        (Some(start), Some(end)) if start < end => &stripped[start..=end],
        _ => stripped,
    }
}
