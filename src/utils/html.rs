/// Sanitizes user- or model-supplied text before it is stored.
///
/// Safe inline markup survives; `<script>` blocks and event-handler
/// attributes are removed.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}

/// Sanitizes an optional field, dropping it when nothing is left.
pub fn clean_optional(input: Option<&str>) -> Option<String> {
    input
        .map(|s| clean_html(s.trim()))
        .filter(|s| !s.is_empty())
}
