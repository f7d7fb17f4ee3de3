//! Storage-related types for the order tracker.

/// Namespace shared by every key the application persists.
pub const APP_NAMESPACE: &str = "foodie";

/// Keys of the collections persisted by the tracker.
///
/// Each key is addressed as `<namespace>:<id>` in the key-value store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
	/// Insertion-ordered sequence of order records.
	Orders,
}

impl StorageKey {
	/// Namespace part of the key.
	pub fn namespace(&self) -> &'static str {
		APP_NAMESPACE
	}

	/// Id part of the key within its namespace.
	pub fn id(&self) -> &'static str {
		match self {
			StorageKey::Orders => "orders",
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_key_is_namespace_and_id() {
		let key = StorageKey::Orders;
		assert_eq!(format!("{}:{}", key.namespace(), key.id()), "foodie:orders");
	}
}
