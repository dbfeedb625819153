//! List content.

use serde::{Deserialize, Serialize};

use crate::util::{to_alpha, to_roman};

/// Marker family of a list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListType {
    /// `•`, `-`, `*`, `+`
    Bullet,
    /// `1.`, `2)`
    Numbered,
    /// `a.`, `B)`
    Alpha,
    /// `i.`, `IV)`
    Roman,
}

impl ListType {
    /// Marker for the 1-based item `ordinal`.
    pub fn marker(self, ordinal: u32) -> String {
        match self {
            ListType::Bullet => "•".to_string(),
            ListType::Numbered => format!("{}.", ordinal),
            ListType::Alpha => format!("{}.", to_alpha(ordinal)),
            ListType::Roman => format!("{}.", to_roman(ordinal)),
        }
    }
}

/// Structured list content of a `list` block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct List {
    /// Marker family, taken from the first item
    pub list_type: ListType,

    /// Items in reading order
    pub items: Vec<ListItem>,
}

/// A single list item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListItem {
    /// Item text without its marker
    pub text: String,

    /// Nesting level (0 = top level)
    #[serde(default)]
    pub level: u8,

    /// Marker as it appeared (e.g. `"1."`, `"•"`)
    pub marker: String,
}

impl ListItem {
    pub fn new(marker: impl Into<String>, text: impl Into<String>, level: u8) -> Self {
        Self {
            text: text.into(),
            level,
            marker: marker.into(),
        }
    }
}

impl List {
    pub fn new(list_type: ListType) -> Self {
        Self {
            list_type,
            items: Vec::new(),
        }
    }

    pub fn push(&mut self, item: ListItem) {
        self.items.push(item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Regenerate markers for ordered lists after items were inserted or removed.
    ///
    /// Numbering restarts at 1 for every nesting level run.
    pub fn renumber(&mut self) {
        if self.list_type == ListType::Bullet {
            return;
        }
        let mut counters: Vec<u32> = Vec::new();
        for item in &mut self.items {
            let level = item.level as usize;
            counters.truncate(level + 1);
            counters.resize(level + 1, 0);
            counters[level] += 1;
            item.marker = self.list_type.marker(counters[level]);
        }
    }

    /// One line per item: indent, marker, text.
    pub fn plain_text(&self) -> String {
        self.items
            .iter()
            .map(|item| {
                format!(
                    "{}{} {}",
                    "  ".repeat(item.level as usize),
                    item.marker,
                    item.text
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markers() {
        assert_eq!(ListType::Numbered.marker(3), "3.");
        assert_eq!(ListType::Alpha.marker(2), "b.");
        assert_eq!(ListType::Roman.marker(4), "iv.");
        assert_eq!(ListType::Bullet.marker(9), "•");
    }

    #[test]
    fn test_renumber_nested() {
        let mut list = List::new(ListType::Numbered);
        list.push(ListItem::new("7.", "First", 0));
        list.push(ListItem::new("9.", "Child", 1));
        list.push(ListItem::new("2.", "Second", 0));
        list.push(ListItem::new("1.", "Child again", 1));
        list.renumber();

        let markers: Vec<&str> = list.items.iter().map(|i| i.marker.as_str()).collect();
        assert_eq!(markers, vec!["1.", "1.", "2.", "1."]);
    }

    #[test]
    fn test_plain_text() {
        let mut list = List::new(ListType::Bullet);
        list.push(ListItem::new("•", "Apples", 0));
        list.push(ListItem::new("-", "Green", 1));
        assert_eq!(list.plain_text(), "• Apples\n  - Green");
    }
}
