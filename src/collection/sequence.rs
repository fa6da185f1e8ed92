//! Read-only sequence operations over a snapshot of members.
//!
//! Every operation works on the members as of the call; nothing is cached.

use std::collections::HashMap;
use std::hash::Hash;

use itertools::Itertools;
use rand::seq::SliceRandom;
use serde_json::Value;

use super::options::compare_values;
use crate::object::Object;

/// Sequence operations shared by [`Collection`](super::Collection) and [`Chain`].
pub trait ObjectSequence {
    /// The members to operate on, in order.
    fn objects(&self) -> Vec<Object>;

    fn size(&self) -> usize {
        self.objects().len()
    }

    fn to_vec(&self) -> Vec<Object> {
        self.objects()
    }

    fn each<F>(&self, mut f: F)
    where
        F: FnMut(&Object, usize),
    {
        for (index, object) in self.objects().iter().enumerate() {
            f(object, index);
        }
    }

    fn map<T, F>(&self, f: F) -> Vec<T>
    where
        F: FnMut(&Object) -> T,
    {
        self.objects().iter().map(f).collect()
    }

    fn filter<P>(&self, mut predicate: P) -> Vec<Object>
    where
        P: FnMut(&Object) -> bool,
    {
        self.objects()
            .into_iter()
            .filter(|object| predicate(object))
            .collect()
    }

    fn reject<P>(&self, mut predicate: P) -> Vec<Object>
    where
        P: FnMut(&Object) -> bool,
    {
        self.filter(|object| !predicate(object))
    }

    fn reduce<T, F>(&self, init: T, f: F) -> T
    where
        F: FnMut(T, &Object) -> T,
    {
        self.objects().iter().fold(init, f)
    }

    fn reduce_right<T, F>(&self, init: T, f: F) -> T
    where
        F: FnMut(T, &Object) -> T,
    {
        self.objects().iter().rev().fold(init, f)
    }

    fn find<P>(&self, mut predicate: P) -> Option<Object>
    where
        P: FnMut(&Object) -> bool,
    {
        self.objects().into_iter().find(|object| predicate(object))
    }

    fn every<P>(&self, predicate: P) -> bool
    where
        P: FnMut(&Object) -> bool,
    {
        self.objects().iter().all(predicate)
    }

    fn some<P>(&self, predicate: P) -> bool
    where
        P: FnMut(&Object) -> bool,
    {
        self.objects().iter().any(predicate)
    }

    fn contains(&self, object: &Object) -> bool {
        self.objects().contains(object)
    }

    fn max_by_key<K, F>(&self, f: F) -> Option<Object>
    where
        K: Ord,
        F: FnMut(&Object) -> K,
    {
        self.objects().into_iter().max_by_key(f)
    }

    fn min_by_key<K, F>(&self, f: F) -> Option<Object>
    where
        K: Ord,
        F: FnMut(&Object) -> K,
    {
        self.objects().into_iter().min_by_key(f)
    }

    /// Stable sort by a derived key.
    fn sort_by_key<K, F>(&self, f: F) -> Vec<Object>
    where
        K: Ord,
        F: FnMut(&Object) -> K,
    {
        let mut objects = self.objects();
        objects.sort_by_key(f);
        objects
    }

    /// Stable sort by an attribute value, unset values last.
    fn sort_by_attribute(&self, attr: &str) -> Vec<Object> {
        self.objects()
            .into_iter()
            .map(|object| (object.get(attr).unwrap_or(Value::Null), object))
            .sorted_by(|a, b| compare_values(&a.0, &b.0))
            .map(|(_, object)| object)
            .collect()
    }

    /// Index at which `object` would be inserted to keep the sequence ordered by `f`.
    fn sorted_index<K, F>(&self, object: &Object, mut f: F) -> usize
    where
        K: Ord,
        F: FnMut(&Object) -> K,
    {
        let key = f(object);
        self.objects().partition_point(|member| f(member) < key)
    }

    fn group_by<K, F>(&self, mut f: F) -> HashMap<K, Vec<Object>>
    where
        K: Eq + Hash,
        F: FnMut(&Object) -> K,
    {
        self.objects().into_iter().into_group_map_by(|object| f(object))
    }

    fn count_by<K, F>(&self, mut f: F) -> HashMap<K, usize>
    where
        K: Eq + Hash,
        F: FnMut(&Object) -> K,
    {
        self.objects().into_iter().counts_by(|object| f(&object))
    }

    fn first(&self) -> Option<Object> {
        self.objects().into_iter().next()
    }

    fn first_n(&self, n: usize) -> Vec<Object> {
        self.objects().into_iter().take(n).collect()
    }

    fn last(&self) -> Option<Object> {
        self.objects().pop()
    }

    fn last_n(&self, n: usize) -> Vec<Object> {
        let objects = self.objects();
        let skip = objects.len().saturating_sub(n);
        objects.into_iter().skip(skip).collect()
    }

    /// Everything but the last `n`.
    fn initial(&self, n: usize) -> Vec<Object> {
        let mut objects = self.objects();
        objects.truncate(objects.len().saturating_sub(n));
        objects
    }

    /// Everything but the first `n`.
    fn rest(&self, n: usize) -> Vec<Object> {
        self.objects().into_iter().skip(n).collect()
    }

    fn without(&self, excluded: &[Object]) -> Vec<Object> {
        self.filter(|object| !excluded.contains(object))
    }

    fn index_of(&self, object: &Object) -> Option<usize> {
        self.objects().iter().position(|member| member == object)
    }

    fn last_index_of(&self, object: &Object) -> Option<usize> {
        self.objects().iter().rposition(|member| member == object)
    }

    fn shuffle(&self) -> Vec<Object> {
        let mut objects = self.objects();
        objects.shuffle(&mut rand::rng());
        objects
    }
}

impl ObjectSequence for super::Collection {
    fn objects(&self) -> Vec<Object> {
        self.models()
    }
}

/// Chainable operations over an owned snapshot; finish with [`Chain::value`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Chain {
    objects: Vec<Object>,
}

impl Chain {
    pub fn new(objects: Vec<Object>) -> Self {
        Chain { objects }
    }

    pub fn filter<P>(mut self, mut predicate: P) -> Self
    where
        P: FnMut(&Object) -> bool,
    {
        self.objects.retain(|object| predicate(object));
        self
    }

    pub fn reject<P>(self, mut predicate: P) -> Self
    where
        P: FnMut(&Object) -> bool,
    {
        self.filter(|object| !predicate(object))
    }

    pub fn sort_by_key<K, F>(mut self, f: F) -> Self
    where
        K: Ord,
        F: FnMut(&Object) -> K,
    {
        self.objects.sort_by_key(f);
        self
    }

    pub fn sort_by_attribute(self, attr: &str) -> Self {
        Chain::new(ObjectSequence::sort_by_attribute(&self, attr))
    }

    pub fn first_n(mut self, n: usize) -> Self {
        self.objects.truncate(n);
        self
    }

    pub fn rest(mut self, n: usize) -> Self {
        let start = n.min(self.objects.len());
        self.objects = self.objects.split_off(start);
        self
    }

    pub fn without(self, excluded: &[Object]) -> Self {
        self.filter(|object| !excluded.contains(object))
    }

    pub fn reverse(mut self) -> Self {
        self.objects.reverse();
        self
    }

    pub fn shuffle(mut self) -> Self {
        self.objects.shuffle(&mut rand::rng());
        self
    }

    pub fn value(self) -> Vec<Object> {
        self.objects
    }
}

impl ObjectSequence for Chain {
    fn objects(&self) -> Vec<Object> {
        self.objects.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::{AddOptions, Collection};
    use crate::object::{Attributes, ObjectClass};
    use serde_json::json;

    fn ranked(ranks: &[i64]) -> (Collection, Vec<Object>) {
        let class = ObjectClass::new("Item");
        let objects: Vec<Object> = ranks
            .iter()
            .map(|rank| {
                let mut attrs = Attributes::new();
                attrs.insert("rank".to_string(), json!(rank));
                class.build(attrs).unwrap()
            })
            .collect();
        let collection = Collection::default();
        collection.add(objects.clone(), AddOptions::new()).unwrap();
        (collection, objects)
    }

    fn rank(object: &Object) -> i64 {
        object.get("rank").and_then(|v| v.as_i64()).unwrap_or(0)
    }

    #[test]
    fn map_filter_reduce() {
        let (collection, _) = ranked(&[3, 1, 2]);

        assert_eq!(collection.map(rank), vec![3, 1, 2]);
        assert_eq!(collection.filter(|o| rank(o) > 1).len(), 2);
        assert_eq!(collection.reject(|o| rank(o) > 1).len(), 1);
        assert_eq!(collection.reduce(0, |sum, o| sum + rank(o)), 6);

        let order = collection.reduce_right(Vec::new(), |mut acc, o| {
            acc.push(rank(o));
            acc
        });
        assert_eq!(order, vec![2, 1, 3]);
    }

    #[test]
    fn find_every_some() {
        let (collection, objects) = ranked(&[3, 1, 2]);

        assert_eq!(collection.find(|o| rank(o) == 1), Some(objects[1].clone()));
        assert!(collection.every(|o| rank(o) > 0));
        assert!(collection.some(|o| rank(o) == 2));
        assert!(!collection.some(|o| rank(o) == 9));
        assert!(collection.contains(&objects[0]));
    }

    #[test]
    fn ordering_helpers() {
        let (collection, objects) = ranked(&[3, 1, 2]);

        assert_eq!(collection.max_by_key(rank), Some(objects[0].clone()));
        assert_eq!(collection.min_by_key(rank), Some(objects[1].clone()));
        assert_eq!(
            collection.sort_by_key(rank),
            vec![objects[1].clone(), objects[2].clone(), objects[0].clone()]
        );
        assert_eq!(
            collection.sort_by_attribute("rank"),
            collection.sort_by_key(rank)
        );

        let (sorted, _) = ranked(&[1, 3, 5]);
        let (_, probe) = ranked(&[4]);
        assert_eq!(sorted.sorted_index(&probe[0], rank), 2);
    }

    #[test]
    fn grouping() {
        let (collection, _) = ranked(&[1, 2, 3, 4, 5]);

        let groups = collection.group_by(|o| rank(o) % 2 == 0);
        assert_eq!(groups[&true].len(), 2);
        assert_eq!(groups[&false].len(), 3);

        let counts = collection.count_by(|o| rank(o) > 2);
        assert_eq!(counts[&true], 3);
        assert_eq!(counts[&false], 2);
    }

    #[test]
    fn slicing() {
        let (collection, objects) = ranked(&[1, 2, 3, 4]);

        assert_eq!(collection.first(), Some(objects[0].clone()));
        assert_eq!(collection.first_n(2), objects[..2].to_vec());
        assert_eq!(collection.last(), Some(objects[3].clone()));
        assert_eq!(collection.last_n(2), objects[2..].to_vec());
        assert_eq!(collection.initial(1), objects[..3].to_vec());
        assert_eq!(collection.rest(3), objects[3..].to_vec());
        assert_eq!(collection.rest(10), Vec::<Object>::new());
        assert_eq!(
            collection.without(&[objects[1].clone()]),
            vec![objects[0].clone(), objects[2].clone(), objects[3].clone()]
        );
        assert_eq!(collection.index_of(&objects[2]), Some(2));
        assert_eq!(collection.last_index_of(&objects[2]), Some(2));
        assert_eq!(collection.size(), 4);
    }

    #[test]
    fn shuffle_keeps_members() {
        let (collection, objects) = ranked(&[1, 2, 3, 4, 5, 6]);
        let mut shuffled = collection.shuffle();
        shuffled.sort_by_key(rank);
        assert_eq!(shuffled, objects);
    }

    #[test]
    fn chain_composes() {
        let (collection, objects) = ranked(&[5, 1, 4, 2, 3]);

        let result = collection
            .chain()
            .reject(|o| rank(o) == 4)
            .sort_by_key(rank)
            .rest(1)
            .first_n(2)
            .value();
        assert_eq!(result, vec![objects[3].clone(), objects[4].clone()]);

        let reversed = collection.chain().sort_by_attribute("rank").reverse().value();
        assert_eq!(reversed.first(), Some(&objects[0]));
    }

    #[test]
    fn snapshot_is_taken_at_call_time() {
        let (collection, _) = ranked(&[1, 2]);
        let chain = collection.chain();
        collection.add(ranked(&[3]).1, AddOptions::new()).unwrap();

        assert_eq!(chain.size(), 2);
        assert_eq!(collection.size(), 3);
    }
}
