//! Collection configuration and per-operation options.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::object::{Attributes, Object, ObjectClass};
use crate::query::Query;

type KeyFn = Arc<dyn Fn(&Object) -> Value + Send + Sync>;
type CompareFn = Arc<dyn Fn(&Object, &Object) -> Ordering + Send + Sync>;

/// Ordering rule that keeps a collection sorted.
///
/// Comparators run while the collection is locked and must not call back into it.
#[derive(Clone)]
pub enum Comparator {
    /// Stable sort by the value of an attribute.
    Attribute(String),
    /// Stable sort by a derived key.
    Key(KeyFn),
    /// Direct pairwise comparison.
    Compare(CompareFn),
}

impl Comparator {
    pub fn attribute(name: impl Into<String>) -> Self {
        Comparator::Attribute(name.into())
    }

    pub fn key<F>(key: F) -> Self
    where
        F: Fn(&Object) -> Value + Send + Sync + 'static,
    {
        Comparator::Key(Arc::new(key))
    }

    pub fn compare<F>(compare: F) -> Self
    where
        F: Fn(&Object, &Object) -> Ordering + Send + Sync + 'static,
    {
        Comparator::Compare(Arc::new(compare))
    }

    pub(crate) fn sort(&self, models: &mut Vec<Object>) {
        match self {
            Comparator::Attribute(attr) => {
                sort_by_value(models, |object| object.get(attr).unwrap_or(Value::Null))
            }
            Comparator::Key(key) => sort_by_value(models, |object| key(object)),
            Comparator::Compare(compare) => models.sort_by(|a, b| compare(a, b)),
        }
    }
}

impl fmt::Debug for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Comparator::Attribute(attr) => f.debug_tuple("Attribute").field(attr).finish(),
            Comparator::Key(_) => f.write_str("Key(..)"),
            Comparator::Compare(_) => f.write_str("Compare(..)"),
        }
    }
}

/// Each key is computed once; equal keys keep their relative order.
fn sort_by_value<F>(models: &mut Vec<Object>, mut key: F)
where
    F: FnMut(&Object) -> Value,
{
    let mut keyed: Vec<(Value, Object)> = models
        .drain(..)
        .map(|object| (key(&object), object))
        .collect();
    keyed.sort_by(|a, b| compare_values(&a.0, &b.0));
    models.extend(keyed.into_iter().map(|(_, object)| object));
}

/// Total order over JSON values used for key sorting. Null/missing sorts last,
/// values of different types are ordered by type.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Greater,
        (_, Value::Null) => Ordering::Less,
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::Number(a), Value::Number(b)) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(a), Value::String(b)) => a.cmp(b),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Bool(_) => 0,
        Value::Number(_) => 1,
        Value::String(_) => 2,
        Value::Array(_) => 3,
        Value::Object(_) => 4,
        Value::Null => 5,
    }
}

/// Collection configuration.
#[derive(Clone, Default)]
pub struct CollectionOptions {
    pub(crate) comparator: Option<Comparator>,
    pub(crate) model: ObjectClass,
    pub(crate) query: Option<Arc<dyn Query>>,
}

impl CollectionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_comparator(mut self, comparator: Comparator) -> Self {
        self.comparator = Some(comparator);
        self
    }

    /// Class used to coerce raw attribute bags into objects.
    pub fn with_model(mut self, model: ObjectClass) -> Self {
        self.model = model;
        self
    }

    /// Default query for `fetch`.
    pub fn with_query(mut self, query: Arc<dyn Query>) -> Self {
        self.query = Some(query);
        self
    }
}

impl fmt::Debug for CollectionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionOptions")
            .field("comparator", &self.comparator)
            .field("model", &self.model)
            .field("query", &self.query.is_some())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AddOptions {
    /// Insertion index; defaults to the end, clamped to the length.
    pub at: Option<usize>,
    pub silent: bool,
}

impl AddOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(mut self, index: usize) -> Self {
        self.at = Some(index);
        self
    }

    pub fn silent(mut self) -> Self {
        self.silent = true;
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemoveOptions {
    pub silent: bool,
}

impl RemoveOptions {
    pub fn silent() -> Self {
        RemoveOptions { silent: true }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResetOptions {
    pub silent: bool,
}

impl ResetOptions {
    pub fn silent() -> Self {
        ResetOptions { silent: true }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SortOptions {
    pub silent: bool,
}

impl SortOptions {
    pub fn silent() -> Self {
        SortOptions { silent: true }
    }
}

/// Options for `fetch`.
#[derive(Clone, Default)]
pub struct FetchOptions {
    /// Add the results instead of resetting with them.
    pub add: bool,
    pub silent: bool,
    /// Ad hoc query overriding the bound one.
    pub query: Option<Arc<dyn Query>>,
}

impl FetchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(mut self) -> Self {
        self.add = true;
        self
    }

    pub fn silent(mut self) -> Self {
        self.silent = true;
        self
    }

    pub fn with_query(mut self, query: Arc<dyn Query>) -> Self {
        self.query = Some(query);
        self
    }
}

impl fmt::Debug for FetchOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchOptions")
            .field("add", &self.add)
            .field("silent", &self.silent)
            .field("query", &self.query.is_some())
            .finish()
    }
}

/// Callback run instead of the `Sync` event once a created object is saved.
pub type SuccessCallback = Box<dyn FnOnce(&Object) + Send>;

/// Options for `create`.
#[derive(Default)]
pub struct CreateOptions {
    /// Add only after the save succeeds.
    pub wait: bool,
    pub at: Option<usize>,
    pub silent: bool,
    pub success: Option<SuccessCallback>,
}

impl CreateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn wait(mut self) -> Self {
        self.wait = true;
        self
    }

    pub fn at(mut self, index: usize) -> Self {
        self.at = Some(index);
        self
    }

    pub fn silent(mut self) -> Self {
        self.silent = true;
        self
    }

    pub fn on_success<F>(mut self, callback: F) -> Self
    where
        F: FnOnce(&Object) + Send + 'static,
    {
        self.success = Some(Box::new(callback));
        self
    }

    pub(crate) fn add_options(&self) -> AddOptions {
        AddOptions {
            at: self.at,
            silent: self.silent,
        }
    }
}

impl fmt::Debug for CreateOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CreateOptions")
            .field("wait", &self.wait)
            .field("at", &self.at)
            .field("silent", &self.silent)
            .field("success", &self.success.is_some())
            .finish()
    }
}

/// Input to `add`/`reset`/`create`: an existing object or a raw attribute bag.
#[derive(Debug, Clone)]
pub enum ModelInput {
    Object(Object),
    Raw(Value),
}

impl From<Object> for ModelInput {
    fn from(object: Object) -> Self {
        ModelInput::Object(object)
    }
}

impl From<&Object> for ModelInput {
    fn from(object: &Object) -> Self {
        ModelInput::Object(object.clone())
    }
}

impl From<Value> for ModelInput {
    fn from(value: Value) -> Self {
        ModelInput::Raw(value)
    }
}

impl From<Attributes> for ModelInput {
    fn from(attributes: Attributes) -> Self {
        ModelInput::Raw(Value::Object(attributes))
    }
}

/// One or many model inputs. A JSON array counts as many.
pub trait IntoModels {
    fn into_models(self) -> Vec<ModelInput>;
}

impl IntoModels for ModelInput {
    fn into_models(self) -> Vec<ModelInput> {
        vec![self]
    }
}

impl IntoModels for Object {
    fn into_models(self) -> Vec<ModelInput> {
        vec![ModelInput::Object(self)]
    }
}

impl IntoModels for &Object {
    fn into_models(self) -> Vec<ModelInput> {
        vec![ModelInput::Object(self.clone())]
    }
}

impl IntoModels for Attributes {
    fn into_models(self) -> Vec<ModelInput> {
        vec![self.into()]
    }
}

impl IntoModels for Value {
    fn into_models(self) -> Vec<ModelInput> {
        match self {
            Value::Array(items) => items.into_iter().map(ModelInput::Raw).collect(),
            other => vec![ModelInput::Raw(other)],
        }
    }
}

impl<T: Into<ModelInput>> IntoModels for Vec<T> {
    fn into_models(self) -> Vec<ModelInput> {
        self.into_iter().map(Into::into).collect()
    }
}

impl<T: Into<ModelInput>, const N: usize> IntoModels for [T; N] {
    fn into_models(self) -> Vec<ModelInput> {
        self.into_iter().map(Into::into).collect()
    }
}

impl<T: Clone + Into<ModelInput>> IntoModels for &[T] {
    fn into_models(self) -> Vec<ModelInput> {
        self.iter().cloned().map(Into::into).collect()
    }
}

/// Reference to a member: an object, or a client/server id.
#[derive(Debug, Clone)]
pub enum MemberRef {
    Object(Object),
    Key(String),
}

impl From<Object> for MemberRef {
    fn from(object: Object) -> Self {
        MemberRef::Object(object)
    }
}

impl From<&Object> for MemberRef {
    fn from(object: &Object) -> Self {
        MemberRef::Object(object.clone())
    }
}

impl From<&str> for MemberRef {
    fn from(key: &str) -> Self {
        MemberRef::Key(key.to_string())
    }
}

impl From<String> for MemberRef {
    fn from(key: String) -> Self {
        MemberRef::Key(key)
    }
}

impl From<&String> for MemberRef {
    fn from(key: &String) -> Self {
        MemberRef::Key(key.clone())
    }
}

/// One or many member references.
pub trait IntoMemberRefs {
    fn into_member_refs(self) -> Vec<MemberRef>;
}

impl IntoMemberRefs for MemberRef {
    fn into_member_refs(self) -> Vec<MemberRef> {
        vec![self]
    }
}

impl IntoMemberRefs for Object {
    fn into_member_refs(self) -> Vec<MemberRef> {
        vec![MemberRef::Object(self)]
    }
}

impl IntoMemberRefs for &Object {
    fn into_member_refs(self) -> Vec<MemberRef> {
        vec![MemberRef::Object(self.clone())]
    }
}

impl IntoMemberRefs for &str {
    fn into_member_refs(self) -> Vec<MemberRef> {
        vec![self.into()]
    }
}

impl IntoMemberRefs for String {
    fn into_member_refs(self) -> Vec<MemberRef> {
        vec![self.into()]
    }
}

impl<T: Into<MemberRef>> IntoMemberRefs for Vec<T> {
    fn into_member_refs(self) -> Vec<MemberRef> {
        self.into_iter().map(Into::into).collect()
    }
}

impl<T: Into<MemberRef>, const N: usize> IntoMemberRefs for [T; N] {
    fn into_member_refs(self) -> Vec<MemberRef> {
        self.into_iter().map(Into::into).collect()
    }
}

impl<T: Clone + Into<MemberRef>> IntoMemberRefs for &[T] {
    fn into_member_refs(self) -> Vec<MemberRef> {
        self.iter().cloned().map(Into::into).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn compare_values_orders_null_last() {
        let mut values = vec![json!(null), json!(3), json!(1), json!(2)];
        values.sort_by(compare_values);
        assert_eq!(values, vec![json!(1), json!(2), json!(3), json!(null)]);
    }

    #[test]
    fn compare_values_mixed_types() {
        assert_eq!(compare_values(&json!("a"), &json!("b")), Ordering::Less);
        assert_eq!(compare_values(&json!(2.5), &json!(2)), Ordering::Greater);
        assert_eq!(compare_values(&json!(true), &json!(1)), Ordering::Less);
        assert_eq!(compare_values(&json!([1]), &json!({})), Ordering::Less);
    }

    #[test]
    fn json_array_is_many_inputs() {
        let inputs = json!([{"a": 1}, {"a": 2}]).into_models();
        assert_eq!(inputs.len(), 2);
        let single = json!({"a": 1}).into_models();
        assert_eq!(single.len(), 1);
    }

    #[test]
    fn option_builders() {
        let add = AddOptions::new().at(2).silent();
        assert_eq!(add, AddOptions { at: Some(2), silent: true });

        let create = CreateOptions::new().wait().on_success(|_| {});
        assert!(create.wait);
        assert!(create.success.is_some());
        assert_eq!(create.add_options(), AddOptions::default());
    }
}
