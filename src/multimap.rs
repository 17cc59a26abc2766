use indexmap::IndexMap;
use std::hash::Hash;

/// Insertion-ordered map keeping every value pushed under a key.
///
/// Keys are ordered by their first appearance, values by their push order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MultiMap<K: Hash + Eq, V> {
	inner: IndexMap<K, Vec<V>>,
}

impl<K: Hash + Eq, V> Default for MultiMap<K, V> {
	fn default() -> Self {
		Self {
			inner: IndexMap::new(),
		}
	}
}

impl<K: Hash + Eq, V> MultiMap<K, V> {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn append(&mut self, key: K, value: V) {
		self.inner.entry(key).or_default().push(value);
	}

	pub fn get<Q>(&self, key: &Q) -> Option<&[V]>
	where
		K: std::borrow::Borrow<Q>,
		Q: Hash + Eq + ?Sized,
	{
		self.inner.get(key).map(Vec::as_slice)
	}

	pub fn first<Q>(&self, key: &Q) -> Option<&V>
	where
		K: std::borrow::Borrow<Q>,
		Q: Hash + Eq + ?Sized,
	{
		self.get(key).and_then(|v| v.first())
	}

	/// Every (key, value) pair, grouped by key.
	pub fn pairs(&self) -> impl Iterator<Item = (&K, &V)> {
		self.inner
			.iter()
			.flat_map(|(k, values)| values.iter().map(move |v| (k, v)))
	}
}

impl<K: Hash + Eq, V> FromIterator<(K, V)> for MultiMap<K, V> {
	fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
		iter.into_iter().fold(Self::new(), |mut map, (k, v)| {
			map.append(k, v);
			map
		})
	}
}
