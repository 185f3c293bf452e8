//! String utility functions

/// Fill `{key}` placeholders in a message template
///
/// Unknown placeholders are left untouched so a typo in the config shows up
/// verbatim in chat instead of silently disappearing.
pub fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut result = template.to_string();
    for (key, value) in values {
        result = result.replace(&format!("{{{}}}", key), value);
    }
    result
}

/// Comma-separated list of names, the way received items are logged
pub fn join_names<'a, I>(names: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    names.into_iter().collect::<Vec<_>>().join(", ")
}
