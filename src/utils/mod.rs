// airtabletool/src/utils/mod.rs
use serde_json::Value;

/// Lazily yields every value stored under `key` anywhere inside `value`.
///
/// Objects and arrays are walked depth-first in document order with an explicit
/// stack, so deeply nested input cannot overflow the call stack. A matched value
/// is searched as well, which means `{"filename": {"filename": 1}}` yields twice.
pub fn find_keys<'a>(value: &'a Value, key: &'a str) -> FindKeys<'a> {
    FindKeys {
        key,
        stack: vec![value],
    }
}

/// Returns true if `key` appears at any depth inside `value`.
pub fn contains_key(value: &Value, key: &str) -> bool {
    find_keys(value, key).next().is_some()
}

/// Iterator returned by [`find_keys`].
pub struct FindKeys<'a> {
    key: &'a str,
    stack: Vec<&'a Value>,
}

impl<'a> Iterator for FindKeys<'a> {
    type Item = &'a Value;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(node) = self.stack.pop() {
            match node {
                Value::Object(map) => {
                    self.stack.extend(map.values().rev());
                    if let Some(found) = map.get(self.key) {
                        return Some(found);
                    }
                }
                Value::Array(items) => self.stack.extend(items.iter().rev()),
                _ => {}
            }
        }
        None
    }
}
