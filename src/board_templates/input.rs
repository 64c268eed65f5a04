use std::collections::{BTreeMap, HashMap};

/// Flat form input as submitted by the template and post forms.
///
/// Scalar fields live in `values`. Rows named `custom_fields[<i>][<attr>]`
/// are collected into `custom_fields`, ordered by their index. When the
/// same key appears twice the last value wins, which lets a hidden `0`
/// precede a checkbox of the same name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawInput {
    values: HashMap<String, String>,
    custom_fields: Option<Vec<HashMap<String, String>>>,
}

const CUSTOM_FIELDS_KEY: &str = "custom_fields";

/// Checkbox-ish truthiness: absent, empty and explicit negatives are false.
pub fn truthy(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "" | "0" | "false" | "off" | "no"
    )
}

impl RawInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.insert(key, value);
        self
    }

    pub fn with_custom_field(mut self, entry: &[(&str, &str)]) -> Self {
        let row = entry
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.custom_fields.get_or_insert_with(Vec::new).push(row);
        self
    }

    pub fn insert(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
    }

    /// The raw value, `None` when absent or blank.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// `Some(bool)` when the key was submitted at all.
    pub fn flag(&self, key: &str) -> Option<bool> {
        self.values.get(key).map(|v| truthy(v))
    }

    pub fn is_set(&self, key: &str) -> bool {
        self.flag(key).unwrap_or(false)
    }

    pub fn custom_fields(&self) -> Option<&[HashMap<String, String>]> {
        self.custom_fields.as_deref()
    }

    pub fn values(&self) -> &HashMap<String, String> {
        &self.values
    }

    /// Parse an `application/x-www-form-urlencoded` body.
    pub fn from_urlencoded(body: &str) -> Self {
        Self::from_pairs(
            url::form_urlencoded::parse(body.as_bytes())
                .map(|(k, v)| (k.into_owned(), v.into_owned())),
        )
    }

    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut input = RawInput::new();
        let mut rows: BTreeMap<usize, HashMap<String, String>> = BTreeMap::new();
        let mut saw_rows = false;

        for (key, value) in pairs {
            if let Some(rest) = key.strip_prefix(CUSTOM_FIELDS_KEY) {
                if rest.is_empty() {
                    // a scalar `custom_fields` is not a sequence; ignore it
                    continue;
                }
                if let Some((index, attr)) = parse_row_key(rest) {
                    saw_rows = true;
                    rows.entry(index).or_default().insert(attr.to_string(), value);
                }
                continue;
            }
            input.values.insert(key, value);
        }

        if saw_rows {
            input.custom_fields = Some(rows.into_values().collect());
        }
        input
    }
}

/// `[3][label]` -> `(3, "label")`
fn parse_row_key(rest: &str) -> Option<(usize, &str)> {
    let rest = rest.strip_prefix('[')?;
    let (index, rest) = rest.split_once(']')?;
    let index = index.parse().ok()?;
    let attr = rest.strip_prefix('[')?.strip_suffix(']')?;
    if attr.is_empty() {
        return None;
    }
    Some((index, attr))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthy_values() {
        assert!(truthy("1"));
        assert!(truthy("on"));
        assert!(truthy("true"));
        assert!(!truthy("0"));
        assert!(!truthy(""));
        assert!(!truthy("false"));
        assert!(!truthy("OFF"));
    }

    #[test]
    fn urlencoded_collects_custom_rows_in_index_order() {
        let body = "name=Notices&custom_fields%5B1%5D%5Bname%5D=phone\
                    &custom_fields%5B0%5D%5Bname%5D=email&custom_fields%5B0%5D%5Btype%5D=text";
        let input = RawInput::from_urlencoded(body);
        assert_eq!(input.get("name"), Some("Notices"));
        let rows = input.custom_fields().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("name").map(String::as_str), Some("email"));
        assert_eq!(rows[0].get("type").map(String::as_str), Some("text"));
        assert_eq!(rows[1].get("name").map(String::as_str), Some("phone"));
    }

    #[test]
    fn scalar_custom_fields_is_not_a_sequence() {
        let input = RawInput::from_urlencoded("custom_fields=oops");
        assert!(input.custom_fields().is_none());
        assert!(input.values().get("custom_fields").is_none());
    }

    #[test]
    fn last_value_wins_for_hidden_checkbox_pairs() {
        let input = RawInput::from_urlencoded("is_active=0&is_active=1");
        assert_eq!(input.flag("is_active"), Some(true));
        let input = RawInput::from_urlencoded("is_active=0");
        assert_eq!(input.flag("is_active"), Some(false));
        assert_eq!(input.flag("missing"), None);
    }

    #[test]
    fn blank_values_read_as_absent() {
        let input = RawInput::new().with("field_title_label", "   ");
        assert_eq!(input.get("field_title_label"), None);
    }
}
