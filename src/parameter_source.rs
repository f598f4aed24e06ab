//! Parameter sources and the factories that build them from requests
//!
//! A [`ParameterSource`] answers "what value does the placeholder `:name`
//! take?" for one statement execution. A [`ParameterSourceFactory`] builds a
//! fresh source from each incoming request.
//!
//! The default factory, [`PropertyParameterSourceFactory`], serializes the
//! request with serde and resolves placeholder names as paths into the
//! resulting tree:
//!
//! | placeholder             | resolves to                                  |
//! |-------------------------|----------------------------------------------|
//! | `:payload`              | the `payload` field                          |
//! | `:payload.name`         | field `name` of the payload                  |
//! | `:headers[id]`          | header `id`                                  |
//! | `:headers[business.id]` | header `business.id` (no quoting needed)     |
//! | `:items[0]`             | first element of the `items` array           |
//!
//! Field and key matches are exact first, then case-insensitive.

use std::{collections::HashMap, sync::Arc};

use diesel::{result::Error as DieselError, QueryResult};
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::value::BindValue;

/// The resolved name-to-value mapping for one statement execution
pub trait ParameterSource: Send + Sync {
    /// The value bound to `name`, or `None` if this source has no such parameter
    fn value(&self, name: &str) -> Option<BindValue>;

    /// Check whether this source can supply `name`
    fn has_value(&self, name: &str) -> bool {
        self.value(name).is_some()
    }
}

/// Builds a parameter source from a request
///
/// Implemented for closures, so custom binding logic can be supplied inline:
///
/// ```
/// use d1_update_handler::{MapParameterSource, ParameterSource, ParameterSourceFactory};
///
/// let factory = |order: &(i64, String)| -> diesel::QueryResult<Box<dyn ParameterSource>> {
///     Ok(Box::new(
///         MapParameterSource::new()
///             .add_value("id", order.0)
///             .add_value("sku", order.1.clone()),
///     ))
/// };
/// let source = factory.create_parameter_source(&(7, "A-1".to_string())).unwrap();
/// assert!(source.has_value("sku"));
/// ```
pub trait ParameterSourceFactory<R: ?Sized>: Send + Sync {
    /// Create a fresh parameter source for `request`
    fn create_parameter_source(&self, request: &R) -> QueryResult<Box<dyn ParameterSource>>;
}

impl<R, F> ParameterSourceFactory<R> for F
where
    R: ?Sized,
    F: Fn(&R) -> QueryResult<Box<dyn ParameterSource>> + Send + Sync,
{
    fn create_parameter_source(&self, request: &R) -> QueryResult<Box<dyn ParameterSource>> {
        self(request)
    }
}

/// A parameter source backed by an explicit map
///
/// Names are matched exactly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapParameterSource {
    values: HashMap<String, BindValue>,
}

impl MapParameterSource {
    /// Create an empty source
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter, builder-style
    pub fn add_value(mut self, name: impl Into<String>, value: impl Into<BindValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Add or replace a parameter
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<BindValue>) {
        self.values.insert(name.into(), value.into());
    }

    /// Number of parameters
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the source has no parameters
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl ParameterSource for MapParameterSource {
    fn value(&self, name: &str) -> Option<BindValue> {
        self.values.get(name).cloned()
    }
}

impl<K: Into<String>, V: Into<BindValue>> FromIterator<(K, V)> for MapParameterSource {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// A parameter source resolving names as paths into a serialized request
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyParameterSource {
    root: JsonValue,
}

impl PropertyParameterSource {
    /// Serialize `request` and wrap the resulting tree
    pub fn from_request<R: Serialize + ?Sized>(request: &R) -> QueryResult<Self> {
        let root =
            serde_json::to_value(request).map_err(|e| DieselError::SerializationError(Box::new(e)))?;
        Ok(Self { root })
    }

    /// Wrap an already-built JSON tree
    pub fn from_json(root: JsonValue) -> Self {
        Self { root }
    }

    fn lookup(&self, name: &str) -> Option<&JsonValue> {
        if let Some(found) = resolve_path(&self.root, name) {
            return Some(found);
        }
        // Names such as `business.id` may be literal keys rather than paths
        if let Some(found) = field(&self.root, name) {
            return Some(found);
        }
        self.root
            .get("headers")
            .and_then(|headers| field(headers, name))
    }
}

impl ParameterSource for PropertyParameterSource {
    fn value(&self, name: &str) -> Option<BindValue> {
        self.lookup(name).map(BindValue::from_json)
    }
}

/// The default factory: exposes a request's serialized fields and headers by name
#[derive(Debug, Clone, Copy, Default)]
pub struct PropertyParameterSourceFactory;

impl<R: Serialize + ?Sized> ParameterSourceFactory<R> for PropertyParameterSourceFactory {
    fn create_parameter_source(&self, request: &R) -> QueryResult<Box<dyn ParameterSource>> {
        Ok(Box::new(PropertyParameterSource::from_request(request)?))
    }
}

/// A factory mapping parameter names to path expressions over the request
///
/// Static parameters win over expressions; names listed in neither fall back
/// to direct property resolution.
///
/// # Example
///
/// ```
/// use d1_update_handler::{
///     BindValue, ExpressionParameterSourceFactory, Message, ParameterSourceFactory,
/// };
///
/// let factory = ExpressionParameterSourceFactory::new()
///     .with_expression("message_id", "headers[id]")
///     .with_static_parameter("source", "orders");
///
/// let message = Message::new("hello").with_header("id", 42);
/// let source = factory.create_parameter_source(&message).unwrap();
/// assert_eq!(source.value("message_id"), Some(BindValue::Integer(42)));
/// assert_eq!(source.value("source"), Some(BindValue::Text("orders".into())));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ExpressionParameterSourceFactory {
    expressions: Arc<HashMap<String, String>>,
    static_parameters: Arc<HashMap<String, BindValue>>,
}

impl ExpressionParameterSourceFactory {
    /// Create a factory with no expressions and no static parameters
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind parameter `name` to the value found at `path` in the request
    pub fn with_expression(mut self, name: impl Into<String>, path: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.expressions).insert(name.into(), path.into());
        self
    }

    /// Bind parameter `name` to a fixed value regardless of the request
    pub fn with_static_parameter(
        mut self,
        name: impl Into<String>,
        value: impl Into<BindValue>,
    ) -> Self {
        Arc::make_mut(&mut self.static_parameters).insert(name.into(), value.into());
        self
    }
}

impl<R: Serialize + ?Sized> ParameterSourceFactory<R> for ExpressionParameterSourceFactory {
    fn create_parameter_source(&self, request: &R) -> QueryResult<Box<dyn ParameterSource>> {
        Ok(Box::new(ExpressionParameterSource {
            properties: PropertyParameterSource::from_request(request)?,
            expressions: Arc::clone(&self.expressions),
            static_parameters: Arc::clone(&self.static_parameters),
        }))
    }
}

struct ExpressionParameterSource {
    properties: PropertyParameterSource,
    expressions: Arc<HashMap<String, String>>,
    static_parameters: Arc<HashMap<String, BindValue>>,
}

impl ParameterSource for ExpressionParameterSource {
    fn value(&self, name: &str) -> Option<BindValue> {
        if let Some(value) = self.static_parameters.get(name) {
            return Some(value.clone());
        }
        match self.expressions.get(name) {
            Some(path) => self.properties.value(path),
            None => self.properties.value(name),
        }
    }
}

#[derive(Debug, PartialEq)]
enum Segment<'a> {
    Field(&'a str),
    Key(&'a str),
}

/// Split `a.b[c].d` into segments; `None` if a bracket is left open or a segment is empty
fn parse_path(path: &str) -> Option<Vec<Segment<'_>>> {
    let mut segments = Vec::new();
    let mut rest = path;

    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix('[') {
            let end = after.find(']')?;
            segments.push(Segment::Key(&after[..end]));
            rest = &after[end + 1..];
        } else {
            let rest_field = rest.strip_prefix('.').unwrap_or(rest);
            if rest_field.len() != rest.len() && segments.is_empty() {
                return None;
            }
            let end = rest_field.find(|c| c == '.' || c == '[').unwrap_or(rest_field.len());
            if end == 0 {
                return None;
            }
            segments.push(Segment::Field(&rest_field[..end]));
            rest = &rest_field[end..];
        }
    }

    if segments.is_empty() {
        None
    } else {
        Some(segments)
    }
}

fn resolve_path<'a>(root: &'a JsonValue, path: &str) -> Option<&'a JsonValue> {
    parse_path(path)?
        .into_iter()
        .try_fold(root, |node, segment| match segment {
            Segment::Field(name) => field(node, name),
            Segment::Key(key) => match node {
                JsonValue::Array(items) => key.trim().parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => field(node, key),
            },
        })
}

fn field<'a>(node: &'a JsonValue, name: &str) -> Option<&'a JsonValue> {
    let object = node.as_object()?;
    object.get(name).or_else(|| {
        object
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    })
}
