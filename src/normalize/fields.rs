//! Field catalog and the semantic lookups that depend on it.

use super::adf;
use crate::record::{CustomValue, Sprint};
use jira_api::{FieldDefinition, RawIssue};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

const STORY_POINT_TERMS: [&str; 3] = ["story points", "storypoints", "story point estimate"];
const EPIC_TERMS: [&str; 3] = ["epic link", "epic name", "parent epic"];
const SPRINT_TERM: &str = "sprint";
const CUSTOM_SKIP_TERMS: [&str; 8] = [
    "story point",
    "sprint",
    "epic",
    "rank",
    "flagged",
    "development",
    "team",
    "change reason",
];
const CUSTOM_PREFIX: &str = "customfield_";

static LEGACY_SPRINT_ATTR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\[|,)(name|state)=([^,\]]*)").expect("invalid legacy sprint regex")
});

/// Field id to display name, in the order the service lists fields, with role ids resolved up front.
#[derive(Debug, Clone, Default)]
pub struct FieldCatalog {
    names: Vec<(String, String)>,
    story_point_ids: Vec<String>,
    epic_ids: Vec<String>,
    sprint_ids: Vec<String>,
}

fn matches_any(name: &str, terms: &[&str]) -> bool {
    let lower = name.to_lowercase();
    terms.iter().any(|term| lower.contains(term))
}

impl FieldCatalog {
    pub fn new(definitions: &[FieldDefinition]) -> Self {
        let names: Vec<(String, String)> = definitions
            .iter()
            .map(|def| (def.id.clone(), def.name.clone()))
            .collect();
        let ids_for = |terms: &[&str]| -> Vec<String> {
            names
                .iter()
                .filter(|(_, name)| matches_any(name, terms))
                .map(|(id, _)| id.clone())
                .collect()
        };
        let story_point_ids = ids_for(&STORY_POINT_TERMS);
        let epic_ids = ids_for(&EPIC_TERMS);
        let sprint_ids = ids_for(&[SPRINT_TERM]);

        Self {
            names,
            story_point_ids,
            epic_ids,
            sprint_ids,
        }
    }

    /// Catalog from the `names` map an issue carries when fetched with `expand=names`.
    pub fn from_issue_names(issue: &RawIssue) -> Self {
        let mut definitions: Vec<FieldDefinition> = issue
            .names
            .iter()
            .map(|(id, name)| FieldDefinition {
                id: id.clone(),
                name: name.clone(),
                custom: id.starts_with(CUSTOM_PREFIX),
            })
            .collect();
        definitions.sort_by(|a, b| a.id.cmp(&b.id));
        Self::new(&definitions)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn name_of<'a>(&'a self, id: &'a str) -> &'a str {
        self.names
            .iter()
            .find(|(field_id, _)| field_id == id)
            .map(|(_, name)| name.as_str())
            .unwrap_or(id)
    }

    /// First story points field with a numeric value.
    pub fn story_points(&self, issue: &RawIssue) -> Option<f64> {
        let value = first_present(issue, &self.story_point_ids)?;
        let value = collapse_named(value).unwrap_or(value);
        match value {
            Value::Number(number) => number.as_f64(),
            Value::String(text) => text.trim().parse().ok(),
            _ => None,
        }
    }

    /// First epic field with a value; objects collapse to `value`, `name`, then `key`.
    pub fn epic(&self, issue: &RawIssue) -> Option<String> {
        let value = first_present(issue, &self.epic_ids)?;
        let value = collapse_named(value)
            .or_else(|| value.get("key").filter(|v| !v.is_null()))
            .unwrap_or(value);
        match value {
            Value::String(text) => Some(text.clone()),
            Value::Number(number) => Some(number.to_string()),
            other => Some(other.to_string()),
        }
    }

    /// Every sprint field contributes, in catalog order.
    pub fn sprints(&self, issue: &RawIssue) -> Vec<Sprint> {
        let mut sprints = Vec::new();
        for id in &self.sprint_ids {
            match issue.raw(id) {
                Some(Value::Array(items)) => sprints.extend(items.iter().filter_map(parse_sprint)),
                Some(single) => sprints.extend(parse_sprint(single)),
                None => {}
            }
        }
        sprints
    }

    /// Custom fields not surfaced elsewhere, keyed by display name.
    pub fn custom_fields(&self, issue: &RawIssue) -> Vec<(String, CustomValue)> {
        let mut resolved = Vec::new();
        for (id, value) in &issue.fields {
            if !id.starts_with(CUSTOM_PREFIX) || value.is_null() {
                continue;
            }
            let name = self.name_of(id);
            if matches_any(name, &CUSTOM_SKIP_TERMS) {
                continue;
            }
            if let Some(custom) = custom_value(value) {
                resolved.push((name.to_string(), custom));
            }
        }
        resolved
    }
}

fn first_present<'a>(issue: &'a RawIssue, ids: &[String]) -> Option<&'a Value> {
    ids.iter().find_map(|id| issue.raw(id))
}

fn collapse_named(value: &Value) -> Option<&Value> {
    ["value", "name"]
        .iter()
        .find_map(|key| value.get(*key).filter(|v| !v.is_null()))
}

fn parse_sprint(value: &Value) -> Option<Sprint> {
    match value {
        Value::Object(map) => Some(Sprint {
            name: map
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or("Unknown")
                .to_string(),
            state: map
                .get("state")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string(),
        }),
        Value::String(text) => Some(parse_legacy_sprint(text)),
        _ => None,
    }
}

/// Handles `com.atlassian.greenhopper.service.sprint.Sprint@1a2b[id=1,state=ACTIVE,name=Sprint 1,...]`.
fn parse_legacy_sprint(text: &str) -> Sprint {
    let mut name = None;
    let mut state = None;
    if text.contains('[') {
        for caps in LEGACY_SPRINT_ATTR.captures_iter(text) {
            let value = caps[2].trim().to_string();
            match &caps[1] {
                "name" => name = Some(value),
                "state" => state = Some(value),
                _ => {}
            }
        }
    }
    Sprint {
        name: name.unwrap_or_else(|| text.to_string()),
        state: state.unwrap_or_else(|| "unknown".to_string()),
    }
}

fn list_item_text(value: &Value) -> String {
    match collapse_named(value) {
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
        None => match value {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        },
    }
}

fn custom_value(value: &Value) -> Option<CustomValue> {
    match value {
        Value::Null => None,
        Value::Bool(flag) => Some(CustomValue::Bool(*flag)),
        Value::Number(number) => number.as_f64().map(CustomValue::Number),
        Value::String(text) if text.is_empty() => None,
        Value::String(text) => Some(CustomValue::Text(text.clone())),
        Value::Array(items) if items.is_empty() => None,
        Value::Array(items) => Some(CustomValue::List(
            items.iter().map(list_item_text).collect(),
        )),
        Value::Object(map) => {
            let text = ["value", "name", "displayName"]
                .iter()
                .find_map(|key| map.get(*key).filter(|v| !v.is_null()))
                .map(|v| match v {
                    Value::String(text) => text.clone(),
                    other => other.to_string(),
                })
                .unwrap_or_else(|| {
                    if map.contains_key("content") {
                        adf::to_text(value)
                    } else {
                        value.to_string()
                    }
                });
            Some(CustomValue::Text(text))
        }
    }
}
