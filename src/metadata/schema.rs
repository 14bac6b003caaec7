//! Structural rules for WOFF 1.0 extended metadata.
//!
//! <https://www.w3.org/TR/WOFF/#Metadata>

use crate::error::MetadataViolation;
use crate::metadata::document::{Content, Element, MetadataDocument};

/// How often a child element may appear
struct ChildRule {
    name: &'static str,
    min: usize,
    max: Option<usize>,
}

const fn optional(name: &'static str) -> ChildRule {
    ChildRule {
        name,
        min: 0,
        max: Some(1),
    }
}

const fn any(name: &'static str) -> ChildRule {
    ChildRule {
        name,
        min: 0,
        max: None,
    }
}

const fn at_least_one(name: &'static str) -> ChildRule {
    ChildRule {
        name,
        min: 1,
        max: None,
    }
}

struct ElementRule {
    name: &'static str,
    required: &'static [&'static str],
    optional: &'static [&'static str],
    children: &'static [ChildRule],
    allows_text: bool,
}

const TEXT_ATTRIBUTES: &[&str] = &["xml:lang", "lang", "dir", "class"];
const STYLE_ATTRIBUTES: &[&str] = &["dir", "class"];

static RULES: &[ElementRule] = &[
    ElementRule {
        name: "metadata",
        required: &["version"],
        optional: &[],
        children: &[
            optional("uniqueid"),
            optional("vendor"),
            optional("credits"),
            optional("description"),
            optional("license"),
            optional("copyright"),
            optional("trademark"),
            optional("licensee"),
            any("extension"),
        ],
        allows_text: false,
    },
    ElementRule {
        name: "uniqueid",
        required: &["id"],
        optional: &[],
        children: &[],
        allows_text: false,
    },
    ElementRule {
        name: "vendor",
        required: &["name"],
        optional: &["url", "dir", "class"],
        children: &[],
        allows_text: false,
    },
    ElementRule {
        name: "credits",
        required: &[],
        optional: &[],
        children: &[at_least_one("credit")],
        allows_text: false,
    },
    ElementRule {
        name: "credit",
        required: &["name"],
        optional: &["url", "role", "dir", "class"],
        children: &[],
        allows_text: false,
    },
    ElementRule {
        name: "description",
        required: &[],
        optional: &["url"],
        children: &[at_least_one("text")],
        allows_text: false,
    },
    ElementRule {
        name: "license",
        required: &[],
        optional: &["url", "id"],
        children: &[any("text")],
        allows_text: false,
    },
    ElementRule {
        name: "copyright",
        required: &[],
        optional: &[],
        children: &[at_least_one("text")],
        allows_text: false,
    },
    ElementRule {
        name: "trademark",
        required: &[],
        optional: &[],
        children: &[at_least_one("text")],
        allows_text: false,
    },
    ElementRule {
        name: "licensee",
        required: &["name"],
        optional: &["dir", "class"],
        children: &[],
        allows_text: false,
    },
    ElementRule {
        name: "extension",
        required: &[],
        optional: &["id"],
        children: &[any("name"), at_least_one("item")],
        allows_text: false,
    },
    ElementRule {
        name: "item",
        required: &[],
        optional: &["id"],
        children: &[at_least_one("name"), at_least_one("value")],
        allows_text: false,
    },
    ElementRule {
        name: "name",
        required: &[],
        optional: TEXT_ATTRIBUTES,
        children: &[],
        allows_text: true,
    },
    ElementRule {
        name: "value",
        required: &[],
        optional: TEXT_ATTRIBUTES,
        children: &[],
        allows_text: true,
    },
    ElementRule {
        name: "text",
        required: &[],
        optional: TEXT_ATTRIBUTES,
        children: &[any("div"), any("span")],
        allows_text: true,
    },
    ElementRule {
        name: "div",
        required: &[],
        optional: STYLE_ATTRIBUTES,
        children: &[any("div"), any("span")],
        allows_text: true,
    },
    ElementRule {
        name: "span",
        required: &[],
        optional: STYLE_ATTRIBUTES,
        children: &[any("span")],
        allows_text: true,
    },
];

fn rule_for(name: &str) -> Option<&'static ElementRule> {
    RULES.iter().find(|rule| rule.name == name)
}

/// Check a document against the metadata vocabulary, returning every problem found.
pub fn validate(document: &MetadataDocument) -> Vec<MetadataViolation> {
    let mut violations = Vec::new();
    let root = document.root();
    match rule_for(&root.name) {
        Some(rule) if rule.name == "metadata" => {
            if let Some(version) = root.attribute("version") {
                if version != "1.0" {
                    violations.push(invalid(root, format!("unsupported version {version:?}")));
                }
            }
            check_element(root, rule, &mut violations);
        }
        _ => violations.push(invalid(root, "root element must be <metadata>".to_owned())),
    }
    violations
}

fn check_element(element: &Element, rule: &ElementRule, violations: &mut Vec<MetadataViolation>) {
    for attribute in &element.attributes {
        let name = attribute.name.as_str();
        if !rule.required.contains(&name) && !rule.optional.contains(&name) {
            violations.push(invalid(element, format!("unexpected attribute {name:?}")));
        }
    }
    for required in rule.required {
        if element.attribute(required).is_none() {
            violations.push(invalid(element, format!("missing attribute {required:?}")));
        }
    }
    if let Some(dir) = element.attribute("dir") {
        if dir != "ltr" && dir != "rtl" {
            violations.push(invalid(element, format!("dir must be \"ltr\" or \"rtl\", found {dir:?}")));
        }
    }

    let mut counts = vec![0usize; rule.children.len()];
    for child in &element.children {
        match child {
            Content::Text(text) => {
                if !rule.allows_text && !text.trim().is_empty() {
                    violations.push(invalid(element, "unexpected text content".to_owned()));
                }
            }
            Content::Element(child) => {
                let allowed = rule
                    .children
                    .iter()
                    .position(|child_rule| child_rule.name == child.name);
                match (allowed, rule_for(&child.name)) {
                    (Some(idx), Some(child_rule)) => {
                        counts[idx] += 1;
                        check_element(child, child_rule, violations);
                    }
                    _ => violations.push(invalid(
                        element,
                        format!("unexpected child element <{}>", child.name),
                    )),
                }
            }
        }
    }

    for (child_rule, &count) in rule.children.iter().zip(&counts) {
        if count < child_rule.min {
            violations.push(invalid(
                element,
                format!("requires at least {} <{}>", child_rule.min, child_rule.name),
            ));
        }
        if child_rule.max.is_some_and(|max| count > max) {
            violations.push(invalid(
                element,
                format!("<{}> may appear only once", child_rule.name),
            ));
        }
    }
}

fn invalid(element: &Element, reason: String) -> MetadataViolation {
    MetadataViolation::InvalidElement {
        element: element.name.clone(),
        reason,
    }
}
