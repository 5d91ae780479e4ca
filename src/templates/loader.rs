/*
 *  templates/loader.rs
 *
 *  p4mgr - LED destination sign manager
 *  (c) 2020-26 Stuart Hunter
 *
 *  Template file parsing and validation
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::debug;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::constants::*;
use crate::display::color::{Color, ColorParseError};
use crate::templates::model::{
    Code, DestinationTemplate, StyledText, TemplateConfig, TemplateSpec, TextTemplate, TypeBox,
};

/// Error type for template file loading/validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read template file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("template file is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("template file must be a JSON object keyed by two-digit code")]
    NotAnObject,
    #[error("{} template entries rejected", .0.len())]
    Rejected(Vec<EntryError>),
}

impl ConfigError {
    /// Per-entry failures, empty for file-level errors
    pub fn entries(&self) -> &[EntryError] {
        match self {
            ConfigError::Rejected(v) => v,
            _ => &[],
        }
    }
}

/// A rejected entry, keyed by the code as written in the file.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("code {code:?}: {kind}")]
pub struct EntryError {
    pub code: String,
    pub kind: EntryErrorKind,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EntryErrorKind {
    #[error("code must be exactly two digits")]
    InvalidCode,
    #[error("entry must be a JSON object")]
    InvalidEntry,
    #[error("missing \"type\"")]
    MissingType,
    #[error("unknown type {0:?} (expected dest, textNsc or textScr)")]
    UnknownType(String),
    #[error("missing required field {0}")]
    MissingField(String),
    #[error("field {0} must not be empty")]
    EmptyText(String),
    #[error("field {field}: bad colour {value:?}: {reason}")]
    InvalidColor {
        field: String,
        value: String,
        reason: ColorParseError,
    },
    #[error("field {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

#[derive(Debug, Deserialize)]
struct RawText {
    text: Option<String>,
    color: Option<String>,
    size: Option<u32>,
    font: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawTypeBox {
    texts: Option<Vec<String>>,
    color: Option<String>,
    width: Option<u32>,
    font: Option<String>,
}

/// Read and validate a template file.
pub fn load(path: &Path) -> Result<TemplateConfig, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&text)
}

/// Validate template JSON. Every bad entry is reported, not just the first.
pub fn parse(text: &str) -> Result<TemplateConfig, ConfigError> {
    let root: Value = serde_json::from_str(text)?;
    let Value::Object(root) = root else {
        return Err(ConfigError::NotAnObject);
    };

    let mut entries = BTreeMap::new();
    let mut rejected = Vec::new();

    for (key, value) in &root {
        let Some(code) = Code::parse(key) else {
            rejected.push(EntryError { code: key.clone(), kind: EntryErrorKind::InvalidCode });
            continue;
        };
        match parse_entry(value) {
            Ok(spec) => {
                debug!("template {} ({}): {}", code, spec.kind(), spec.summary());
                entries.insert(code, Arc::new(spec));
            }
            Err(kind) => rejected.push(EntryError { code: key.clone(), kind }),
        }
    }

    if !rejected.is_empty() {
        rejected.sort_by(|a, b| a.code.cmp(&b.code));
        return Err(ConfigError::Rejected(rejected));
    }
    Ok(TemplateConfig::new(entries))
}

fn parse_entry(value: &Value) -> Result<TemplateSpec, EntryErrorKind> {
    let obj = value.as_object().ok_or(EntryErrorKind::InvalidEntry)?;
    let tag = match obj.get("type") {
        None | Some(Value::Null) => return Err(EntryErrorKind::MissingType),
        Some(Value::String(s)) => s.as_str(),
        Some(other) => return Err(EntryErrorKind::UnknownType(other.to_string())),
    };

    match tag {
        "dest" => parse_destination(obj).map(TemplateSpec::Destination),
        "textNsc" => parse_text(obj).map(TemplateSpec::StaticText),
        "textScr" => parse_text(obj).map(TemplateSpec::ScrollText),
        other => Err(EntryErrorKind::UnknownType(other.to_string())),
    }
}

fn parse_text(obj: &Map<String, Value>) -> Result<TextTemplate, EntryErrorKind> {
    let raw = section::<RawText>(obj, "txt")?;
    let text = required_text(raw, "txt", DEFAULT_TEXT_SIZE)?;
    Ok(TextTemplate { text })
}

fn parse_destination(obj: &Map<String, Value>) -> Result<DestinationTemplate, EntryErrorKind> {
    let annotation = match section::<RawText>(obj, "scroll")? {
        Some(raw) => {
            let color = color_field(raw.color.as_deref(), "scroll.color", Color::WHITE)?;
            let size = size_field(raw.size, "scroll.size", DEFAULT_ANNOTATION_SIZE, MAX_TEXT_SIZE)?;
            let font = font_field(raw.font, "scroll.font")?;
            // an empty note means "no note", not an error
            raw.text
                .filter(|t| !t.trim().is_empty())
                .map(|content| StyledText { content, color, size, font })
        }
        None => None,
    };

    let default_size = if annotation.is_some() {
        DEFAULT_DESTINATION_SIZE
    } else {
        DEFAULT_DESTINATION_SIZE_NO_ANNOTATION
    };
    let destination = required_text(section(obj, "destination")?, "destination", default_size)?;

    let background = match obj.get("dstBgColor") {
        None | Some(Value::Null) => default_color(DEFAULT_TYPE_BOX_BACKGROUND),
        Some(Value::String(s)) => color_field(Some(s), "dstBgColor", Color::RED)?,
        Some(other) => {
            return Err(EntryErrorKind::InvalidValue {
                field: "dstBgColor".into(),
                reason: format!("expected a colour string, found {}", other),
            });
        }
    };

    let type_box = match section::<RawTypeBox>(obj, "typeBox")? {
        Some(raw) => TypeBox {
            labels: raw
                .texts
                .unwrap_or_else(|| DEFAULT_TYPE_BOX_LABELS.iter().map(|s| s.to_string()).collect()),
            color: color_field(raw.color.as_deref(), "typeBox.color", Color::WHITE)?,
            width: size_field(raw.width, "typeBox.width", DEFAULT_TYPE_BOX_WIDTH, MAX_TYPE_BOX_WIDTH)?,
            font: font_field(raw.font, "typeBox.font")?,
        },
        None => TypeBox {
            labels: DEFAULT_TYPE_BOX_LABELS.iter().map(|s| s.to_string()).collect(),
            color: Color::WHITE,
            width: DEFAULT_TYPE_BOX_WIDTH,
            font: None,
        },
    };

    Ok(DestinationTemplate { destination, background, annotation, type_box })
}

/// Optional sub-object deserialised into `T`; null counts as absent.
fn section<T: DeserializeOwned>(
    obj: &Map<String, Value>,
    field: &str,
) -> Result<Option<T>, EntryErrorKind> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => T::deserialize(v).map(Some).map_err(|e| EntryErrorKind::InvalidValue {
            field: field.to_string(),
            reason: e.to_string(),
        }),
    }
}

fn required_text(
    raw: Option<RawText>,
    field: &str,
    default_size: u32,
) -> Result<StyledText, EntryErrorKind> {
    let raw = raw.ok_or_else(|| EntryErrorKind::MissingField(field.to_string()))?;
    let content = raw
        .text
        .ok_or_else(|| EntryErrorKind::MissingField(format!("{field}.text")))?;
    if content.trim().is_empty() {
        return Err(EntryErrorKind::EmptyText(format!("{field}.text")));
    }
    Ok(StyledText {
        content,
        color: color_field(raw.color.as_deref(), &format!("{field}.color"), Color::WHITE)?,
        size: size_field(raw.size, &format!("{field}.size"), default_size, MAX_TEXT_SIZE)?,
        font: font_field(raw.font, &format!("{field}.font"))?,
    })
}

/// A font is a bare file name inside the font directory.
fn font_field(value: Option<String>, field: &str) -> Result<Option<String>, EntryErrorKind> {
    let Some(name) = value else {
        return Ok(None);
    };
    let bare = Path::new(&name).file_name().is_some_and(|f| f == name.as_str());
    if name.trim().is_empty() || !bare {
        return Err(EntryErrorKind::InvalidValue {
            field: field.to_string(),
            reason: format!("{:?} is not a font file name", name),
        });
    }
    Ok(Some(name))
}

fn color_field(value: Option<&str>, field: &str, default: Color) -> Result<Color, EntryErrorKind> {
    match value {
        None => Ok(default),
        Some(s) => Color::parse(s).map_err(|reason| EntryErrorKind::InvalidColor {
            field: field.to_string(),
            value: s.to_string(),
            reason,
        }),
    }
}

fn size_field(value: Option<u32>, field: &str, default: u32, max: u32) -> Result<u32, EntryErrorKind> {
    match value {
        None => Ok(default),
        Some(v) if (1..=max).contains(&v) => Ok(v),
        Some(v) => Err(EntryErrorKind::InvalidValue {
            field: field.to_string(),
            reason: format!("{} is outside 1..={}", v, max),
        }),
    }
}

fn default_color(hex: &str) -> Color {
    Color::parse(hex).unwrap_or(Color::WHITE)
}
