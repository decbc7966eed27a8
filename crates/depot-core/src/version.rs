//! # Maven Version Ordering
//!
//! Versions are split into numeric and qualifier items, with `-` and
//! digit/letter transitions opening a nested list. Trailing "null" items
//! (`0`, `""`, `ga`, `final`, `release`) are dropped so that `1.0` and `1`
//! compare equal. Known qualifiers order as
//! `alpha < beta < milestone < rc < snapshot < "" < sp`, unknown qualifiers
//! sort after all of them, lexically.
//!
//! ```text
//! 1.0-alpha-1 < 1.0-beta < 1.0-SNAPSHOT < 1.0 < 1.0-sp < 1.0.1 < 1.1
//! ```

use std::cmp::Ordering;

const QUALIFIERS: [&str; 7] = ["alpha", "beta", "milestone", "rc", "snapshot", "", "sp"];
const RELEASE_INDEX: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Item {
    /// Decimal digits with leading zeros stripped; empty means zero.
    Int(String),
    Str(String),
    List(Vec<Item>),
}

impl Item {
    fn int(digits: &str) -> Self {
        Item::Int(digits.trim_start_matches('0').to_string())
    }

    fn qualifier(raw: &str, followed_by_digit: bool) -> Self {
        let mut value = raw.to_string();
        if followed_by_digit && value.len() == 1 {
            value = match value.as_str() {
                "a" => "alpha".to_string(),
                "b" => "beta".to_string(),
                "m" => "milestone".to_string(),
                _ => value,
            };
        }
        let value = match value.as_str() {
            "ga" | "final" | "release" => String::new(),
            "cr" => "rc".to_string(),
            _ => value,
        };
        Item::Str(value)
    }

    fn is_null(&self) -> bool {
        match self {
            Item::Int(digits) => digits.is_empty(),
            Item::Str(value) => comparable_qualifier(value) == RELEASE_INDEX.to_string(),
            Item::List(items) => items.is_empty(),
        }
    }

    fn compare(&self, other: Option<&Item>) -> Ordering {
        match (self, other) {
            (Item::Int(digits), None) => {
                if digits.is_empty() {
                    Ordering::Equal
                } else {
                    Ordering::Greater
                }
            }
            (Item::Int(a), Some(Item::Int(b))) => a.len().cmp(&b.len()).then_with(|| a.cmp(b)),
            (Item::Int(_), Some(_)) => Ordering::Greater,

            (Item::Str(value), None) => {
                comparable_qualifier(value).cmp(&RELEASE_INDEX.to_string())
            }
            (Item::Str(_), Some(Item::Int(_))) => Ordering::Less,
            (Item::Str(a), Some(Item::Str(b))) => {
                comparable_qualifier(a).cmp(&comparable_qualifier(b))
            }
            (Item::Str(_), Some(Item::List(_))) => Ordering::Less,

            (Item::List(items), None) => match items.first() {
                None => Ordering::Equal,
                Some(first) => first.compare(None),
            },
            (Item::List(_), Some(Item::Int(_))) => Ordering::Less,
            (Item::List(_), Some(Item::Str(_))) => Ordering::Greater,
            (Item::List(a), Some(Item::List(b))) => compare_lists(a, b),
        }
    }
}

fn comparable_qualifier(value: &str) -> String {
    match QUALIFIERS.iter().position(|q| *q == value) {
        Some(index) => index.to_string(),
        None => format!("{}-{}", QUALIFIERS.len(), value),
    }
}

fn compare_lists(a: &[Item], b: &[Item]) -> Ordering {
    let len = a.len().max(b.len());
    for i in 0..len {
        let ordering = match (a.get(i), b.get(i)) {
            (Some(left), right) => left.compare(right),
            (None, Some(right)) => right.compare(None).reverse(),
            (None, None) => Ordering::Equal,
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// Remove trailing null items, looking through nested lists.
fn normalize(items: &mut Vec<Item>) {
    let mut i = items.len();
    while i > 0 {
        i -= 1;
        if items[i].is_null() {
            items.remove(i);
        } else if !matches!(items[i], Item::List(_)) {
            break;
        }
    }
}

/// A parsed version that orders the way Maven orders versions.
#[derive(Debug, Clone)]
pub struct MavenVersion {
    raw: String,
    items: Vec<Item>,
}

impl MavenVersion {
    /// Parse a version string. Parsing never fails; every string is a version.
    pub fn parse(version: &str) -> Self {
        let lower = version.to_lowercase();
        let chars: Vec<char> = lower.chars().collect();

        // Each `-` or digit/letter transition opens a list nested in the
        // current one; the stack holds the open lists, innermost last.
        let mut stack: Vec<Vec<Item>> = vec![Vec::new()];
        let mut start = 0usize;
        let mut is_digit = false;

        let text = |from: usize, to: usize| -> String { chars[from..to].iter().collect() };

        for (i, &c) in chars.iter().enumerate() {
            let current = stack.len() - 1;
            if c == '.' {
                let item = if i == start {
                    Item::Int(String::new())
                } else {
                    parse_item(is_digit, &text(start, i))
                };
                stack[current].push(item);
                start = i + 1;
            } else if c == '-' {
                let item = if i == start {
                    Item::Int(String::new())
                } else {
                    parse_item(is_digit, &text(start, i))
                };
                stack[current].push(item);
                start = i + 1;
                stack.push(Vec::new());
            } else if c.is_ascii_digit() {
                if !is_digit && i > start {
                    stack[current].push(Item::qualifier(&text(start, i), true));
                    start = i;
                    stack.push(Vec::new());
                }
                is_digit = true;
            } else {
                if is_digit && i > start {
                    stack[current].push(Item::int(&text(start, i)));
                    start = i;
                    stack.push(Vec::new());
                }
                is_digit = false;
            }
        }
        if chars.len() > start {
            let current = stack.len() - 1;
            stack[current].push(parse_item(is_digit, &text(start, chars.len())));
        }

        // Innermost first: each normalized list becomes the last item of
        // its parent, which is where it was opened.
        let mut child: Option<Vec<Item>> = None;
        while let Some(mut list) = stack.pop() {
            if let Some(inner) = child.take() {
                list.push(Item::List(inner));
            }
            normalize(&mut list);
            child = Some(list);
        }

        Self {
            raw: version.to_string(),
            items: child.unwrap_or_default(),
        }
    }

    /// The original version string.
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

fn parse_item(is_digit: bool, text: &str) -> Item {
    if is_digit {
        Item::int(text)
    } else {
        Item::qualifier(text, false)
    }
}

impl PartialEq for MavenVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for MavenVersion {}

impl PartialOrd for MavenVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MavenVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_lists(&self.items, &other.items)
    }
}

impl std::fmt::Display for MavenVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Compare two version strings in Maven order.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    MavenVersion::parse(a).cmp(&MavenVersion::parse(b))
}

/// Sort version strings in place, oldest first.
pub fn sort_versions(versions: &mut [String]) {
    versions.sort_by(|a, b| compare_versions(a, b).then_with(|| a.cmp(b)));
}
