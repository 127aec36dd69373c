use std::str::FromStr;

use serde_json::{Map, Value};

use crate::config::settings::PathSyntax;
use crate::error::{Error, Result};

/// Largest list position a path may address. Writes pad the list with nulls
/// up to the position, so this bounds the allocation a single path can cause.
pub const MAX_LIST_INDEX: usize = 1 << 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListIndex {
    Append,
    At(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    Key(String),
    Index(ListIndex),
}

/// Address of a location inside a configuration tree.
///
/// The first segment is always a map key, so a `PathSpec` can never address
/// (and therefore never replace) the root mapping itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathSpec {
    root: String,
    rest: Vec<Segment>,
}

impl PathSpec {
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            rest: Vec::new(),
        }
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.rest.push(Segment::Key(key.into()));
        self
    }

    pub fn index(mut self, index: usize) -> Self {
        self.rest.push(Segment::Index(ListIndex::At(index)));
        self
    }

    pub fn append(mut self) -> Self {
        self.rest.push(Segment::Index(ListIndex::Append));
        self
    }

    pub fn from_segments(segments: Vec<Segment>) -> Result<Self> {
        let mut iter = segments.into_iter();
        match iter.next() {
            Some(Segment::Key(root)) => Ok(Self {
                root,
                rest: iter.collect(),
            }),
            Some(Segment::Index(_)) => Err(Error::RootReplacementRejected(
                "path starts with a list index".to_owned(),
            )),
            None => Err(Error::RootReplacementRejected(String::new())),
        }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        Self::parse_with(raw, &PathSyntax::default())
    }

    pub fn parse_with(raw: &str, syntax: &PathSyntax) -> Result<Self> {
        if raw.is_empty() {
            return Err(Error::RootReplacementRejected(String::new()));
        }

        let segments = raw
            .split(syntax.delimiter.as_str())
            .map(|segment| parse_segment(raw, segment, syntax))
            .collect::<Result<Vec<_>>>()?;

        Self::from_segments(segments).map_err(|err| match err {
            Error::RootReplacementRejected(_) => Error::RootReplacementRejected(raw.to_owned()),
            other => other,
        })
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn segments(&self) -> impl Iterator<Item = Segment> + '_ {
        std::iter::once(Segment::Key(self.root.clone())).chain(self.rest.iter().cloned())
    }

    /// Stores `value` at this path, creating intermediate containers.
    ///
    /// A slot holding the wrong kind of container (or a scalar) is replaced
    /// outright: the last write wins. Positions above [`MAX_LIST_INDEX`] fail
    /// with [`Error::InvalidPath`] before the tree is touched.
    pub fn write(&self, tree: &mut Map<String, Value>, value: Value) -> Result<()> {
        if let Some(position) = self.rest.iter().find_map(|segment| match segment {
            Segment::Index(ListIndex::At(position)) if *position > MAX_LIST_INDEX => {
                Some(*position)
            }
            _ => None,
        }) {
            return Err(Error::InvalidPath {
                path: self.to_string(),
                reason: format!("list index {position} exceeds the maximum of {MAX_LIST_INDEX}"),
            });
        }

        let mut slot = tree.entry(self.root.clone()).or_insert(Value::Null);

        for segment in &self.rest {
            slot = match segment {
                Segment::Key(key) => {
                    if !slot.is_object() {
                        *slot = Value::Object(Map::new());
                    }
                    slot.as_object_mut()
                        .expect("slot was just coerced to an object")
                        .entry(key.clone())
                        .or_insert(Value::Null)
                }
                Segment::Index(index) => {
                    if !slot.is_array() {
                        *slot = Value::Array(Vec::new());
                    }
                    let items = slot
                        .as_array_mut()
                        .expect("slot was just coerced to an array");
                    let position = match index {
                        ListIndex::Append => {
                            items.push(Value::Null);
                            items.len() - 1
                        }
                        ListIndex::At(position) => {
                            if items.len() <= *position {
                                items.resize(position + 1, Value::Null);
                            }
                            *position
                        }
                    };
                    &mut items[position]
                }
            };
        }

        *slot = value;
        Ok(())
    }

    /// Read-only walk. Append segments never match an existing value.
    pub fn lookup<'a>(&self, tree: &'a Map<String, Value>) -> Option<&'a Value> {
        let mut cursor = tree.get(&self.root)?;
        for segment in &self.rest {
            cursor = match segment {
                Segment::Key(key) => cursor.as_object()?.get(key)?,
                Segment::Index(ListIndex::At(position)) => cursor.as_array()?.get(*position)?,
                Segment::Index(ListIndex::Append) => return None,
            };
        }
        Some(cursor)
    }
}

fn parse_segment(raw: &str, segment: &str, syntax: &PathSyntax) -> Result<Segment> {
    let Some(suffix) = segment.strip_prefix(syntax.list_prefix.as_str()) else {
        return Ok(Segment::Key(segment.to_owned()));
    };

    if syntax.append_tokens.iter().any(|token| token == suffix) {
        return Ok(Segment::Index(ListIndex::Append));
    }

    if suffix.is_empty() || !suffix.bytes().all(|byte| byte.is_ascii_digit()) {
        return Ok(Segment::Key(segment.to_owned()));
    }

    let position = suffix
        .parse::<usize>()
        .ok()
        .filter(|position| *position <= MAX_LIST_INDEX)
        .ok_or_else(|| Error::InvalidPath {
            path: raw.to_owned(),
            reason: format!("list index '{suffix}' exceeds the maximum of {MAX_LIST_INDEX}"),
        })?;
    Ok(Segment::Index(ListIndex::At(position)))
}

impl FromStr for PathSpec {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        Self::parse(value)
    }
}

impl PathSpec {
    /// Renders the path in `syntax`, the inverse of [`PathSpec::parse_with`].
    /// Append segments use the first append token.
    pub fn display_with<'a>(&'a self, syntax: &'a PathSyntax) -> PathDisplay<'a> {
        PathDisplay { spec: self, syntax }
    }
}

pub struct PathDisplay<'a> {
    spec: &'a PathSpec,
    syntax: &'a PathSyntax,
}

impl std::fmt::Display for PathDisplay<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let syntax = self.syntax;
        let append = syntax.append_tokens.first().map_or("00", String::as_str);
        write!(f, "{}", self.spec.root)?;
        for segment in &self.spec.rest {
            write!(f, "{}", syntax.delimiter)?;
            match segment {
                Segment::Key(key) => write!(f, "{key}")?,
                Segment::Index(ListIndex::Append) => {
                    write!(f, "{}{append}", syntax.list_prefix)?
                }
                Segment::Index(ListIndex::At(position)) => {
                    write!(f, "{}{position}", syntax.list_prefix)?
                }
            }
        }
        Ok(())
    }
}

impl std::fmt::Display for PathSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_with(&PathSyntax::default()))
    }
}
