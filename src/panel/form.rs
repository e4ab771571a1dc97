//! Serde helpers for form-shaped input.
//!
//! Browser forms send every field as a string and leave unset fields as `""`.
//! These deserializers treat blank strings as absent and accept tag lists as
//! either a JSON array or a comma-separated string.

use std::str::FromStr;

use chrono::{NaiveDate, NaiveTime};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum TagInput {
    List(Vec<String>),
    Csv(String),
}

/// Trim, drop blanks, and dedupe while keeping first-seen order.
#[must_use]
pub fn normalize_tags<I, S>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut tags: Vec<String> = Vec::new();
    for tag in raw {
        let tag = tag.as_ref().trim();
        if !tag.is_empty() && !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_owned());
        }
    }
    tags
}

fn tags_from_input(input: TagInput) -> Vec<String> {
    match input {
        TagInput::List(list) => normalize_tags(list),
        TagInput::Csv(csv) => normalize_tags(csv.split(',')),
    }
}

pub(crate) fn tags<'de, D>(de: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<TagInput>::deserialize(de)?.map(tags_from_input).unwrap_or_default())
}

pub(crate) fn optional_tags<'de, D>(de: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<TagInput>::deserialize(de)?.map(tags_from_input))
}

/// Accepts `HH:MM` and `HH:MM:SS`.
///
/// # Errors
///
/// Returns a chrono parse error when neither format matches.
pub fn parse_time(raw: &str) -> Result<NaiveTime, chrono::ParseError> {
    NaiveTime::parse_from_str(raw, "%H:%M:%S").or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
}

/// Accepts `YYYY-MM-DD`.
///
/// # Errors
///
/// Returns a chrono parse error on any other shape.
pub fn parse_date(raw: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::from_str(raw)
}

fn blank_as_none<'de, D>(de: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(de)?
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty()))
}

pub(crate) fn optional_date<'de, D>(de: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    blank_as_none(de)?
        .map(|raw| parse_date(&raw).map_err(|e| D::Error::custom(format!("invalid date {raw:?}: {e}"))))
        .transpose()
}

pub(crate) fn optional_time<'de, D>(de: D) -> Result<Option<NaiveTime>, D::Error>
where
    D: Deserializer<'de>,
{
    blank_as_none(de)?
        .map(|raw| parse_time(&raw).map_err(|e| D::Error::custom(format!("invalid time {raw:?}: {e}"))))
        .transpose()
}

/// Patch form of `optional_time`: a present `null` or `""` clears the time.
/// Use with `#[serde(default)]` so an omitted field stays `None`.
pub(crate) fn patch_time<'de, D>(de: D) -> Result<Option<Option<NaiveTime>>, D::Error>
where
    D: Deserializer<'de>,
{
    optional_time(de).map(Some)
}

#[cfg(test)]
#[path = "form_test.rs"]
mod tests;
