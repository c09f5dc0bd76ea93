//! Property name snapshots

use jsbridge_sys::*;
use std::fmt;
use std::iter::FusedIterator;
use std::marker::PhantomData;
use tracing::trace;

use crate::context::Context;
use crate::group::ContextGroup;
use crate::stats::handle_stats;
use crate::string::JsString;

/// Property names of an object at the moment it was copied
///
/// Holds its own retain on the engine array and on the context group, so it
/// can outlive the object and the context it came from. Later changes to the
/// object are not reflected.
pub struct PropertyNameArray {
    raw: JSPropertyNameArrayRef,
    group: ContextGroup,
    /// Marker to make this type !Send + !Sync
    _not_send: PhantomData<*mut ()>,
}

impl PropertyNameArray {
    /// Take ownership of an array the engine returned with one retain
    ///
    /// # Safety
    /// `raw` must be a live array from `ctx` carrying one retain for the caller.
    pub(crate) unsafe fn from_owned(ctx: &Context, raw: JSPropertyNameArrayRef) -> Self {
        assert!(!raw.is_null(), "null property name array");
        handle_stats().record_name_array_retained();
        trace!(array = ?raw, "property name array copied");
        Self {
            raw,
            group: ctx.group(),
            _not_send: PhantomData,
        }
    }

    /// Get the raw array reference
    pub fn raw(&self) -> JSPropertyNameArrayRef {
        self.raw
    }

    /// Take another retain on the same snapshot
    pub fn retain(&self) -> PropertyNameArray {
        // SAFETY: self.raw is retained for the lifetime of self
        let raw = unsafe { JSPropertyNameArrayRetain(self.raw) };
        handle_stats().record_name_array_retained();
        trace!(array = ?raw, "property name array retained");
        Self {
            raw,
            group: self.group.clone(),
            _not_send: PhantomData,
        }
    }

    /// Give back this handle's retain
    pub fn release(self) {
        drop(self);
    }

    /// Number of names, fixed when the snapshot was taken
    pub fn count(&self) -> usize {
        // SAFETY: self.raw is retained
        unsafe { JSPropertyNameArrayGetCount(self.raw) }
    }

    pub fn len(&self) -> usize {
        self.count()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// The name at `index`
    ///
    /// # Panics
    /// If `index >= count()`.
    pub fn name_at_index(&self, index: usize) -> String {
        let count = self.count();
        assert!(
            index < count,
            "property name index {} out of range for snapshot of {} names",
            index,
            count
        );
        // SAFETY: index is in range; the array only lends the string out, so
        // retain it before converting
        unsafe { JsString::retain_borrowed(JSPropertyNameArrayGetNameAtIndex(self.raw, index)) }
            .to_string_lossy()
    }

    /// The name at `index`, or `None` past the end
    pub fn get(&self, index: usize) -> Option<String> {
        (index < self.count()).then(|| self.name_at_index(index))
    }

    pub fn iter(&self) -> Names<'_> {
        Names {
            array: self,
            next: 0,
            end: self.count(),
        }
    }

    /// Every name, in enumeration order
    pub fn to_vec(&self) -> Vec<String> {
        self.iter().collect()
    }
}

impl Clone for PropertyNameArray {
    fn clone(&self) -> Self {
        self.retain()
    }
}

impl Drop for PropertyNameArray {
    fn drop(&mut self) {
        // SAFETY: balanced with the retain owned by this wrapper
        unsafe { JSPropertyNameArrayRelease(self.raw) };
        handle_stats().record_name_array_released();
        trace!(array = ?self.raw, "property name array released");
    }
}

impl fmt::Debug for PropertyNameArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// Iterator over a [`PropertyNameArray`]
pub struct Names<'a> {
    array: &'a PropertyNameArray,
    next: usize,
    end: usize,
}

impl Iterator for Names<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.next >= self.end {
            return None;
        }
        let name = self.array.name_at_index(self.next);
        self.next += 1;
        Some(name)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.end - self.next;
        (remaining, Some(remaining))
    }
}

impl DoubleEndedIterator for Names<'_> {
    fn next_back(&mut self) -> Option<String> {
        if self.next >= self.end {
            return None;
        }
        self.end -= 1;
        Some(self.array.name_at_index(self.end))
    }
}

impl ExactSizeIterator for Names<'_> {}

impl FusedIterator for Names<'_> {}

impl<'a> IntoIterator for &'a PropertyNameArray {
    type Item = String;
    type IntoIter = Names<'a>;

    fn into_iter(self) -> Names<'a> {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_names_of_object() {
        let ctx = Context::new().unwrap();
        let obj = ctx.eval("({ a: 1, b: 2 })").unwrap().to_object().unwrap();
        let names = obj.copy_property_names();
        assert_eq!(names.count(), 2);
        let set: HashSet<String> = names.iter().collect();
        assert_eq!(set, HashSet::from(["a".to_string(), "b".to_string()]));
    }

    #[test]
    fn test_insertion_order() {
        let ctx = Context::new().unwrap();
        let obj = ctx
            .eval("({ zeta: 1, alpha: 2, mid: 3 })")
            .unwrap()
            .to_object()
            .unwrap();
        assert_eq!(obj.copy_property_names().to_vec(), ["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_snapshot_is_fixed() {
        let ctx = Context::new().unwrap();
        let obj = ctx.eval("({ a: 1 })").unwrap().to_object().unwrap();
        let names = obj.copy_property_names();
        ctx.global_object()
            .set_property("o", &obj.to_value(), Default::default())
            .unwrap();
        ctx.eval("o.b = 2; delete o.a").unwrap();
        assert_eq!(names.to_vec(), ["a"]);
        assert_eq!(obj.copy_property_names().to_vec(), ["b"]);
    }

    #[test]
    fn test_empty_object() {
        let ctx = Context::new().unwrap();
        let names = ctx.new_empty_object().copy_property_names();
        assert!(names.is_empty());
        assert_eq!(names.get(0), None);
        assert_eq!(names.iter().next(), None);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_index_at_count_panics() {
        let ctx = Context::new().unwrap();
        let obj = ctx.eval("({ a: 1, b: 2 })").unwrap().to_object().unwrap();
        let names = obj.copy_property_names();
        names.name_at_index(names.count());
    }

    #[test]
    fn test_retained_copy_outlives_original_and_context() {
        let names = {
            let ctx = Context::new().unwrap();
            let obj = ctx.eval("({ x: 1 })").unwrap().to_object().unwrap();
            let original = obj.copy_property_names();
            let copy = original.retain();
            original.release();
            copy
        };
        assert_eq!(names.len(), 1);
        assert_eq!(names.name_at_index(0), "x");
    }

    #[test]
    fn test_iterator_both_ends() {
        let ctx = Context::new().unwrap();
        let obj = ctx
            .eval("({ a: 1, b: 2, c: 3 })")
            .unwrap()
            .to_object()
            .unwrap();
        let names = obj.copy_property_names();
        let mut iter = names.iter();
        assert_eq!(iter.len(), 3);
        assert_eq!(iter.next_back().as_deref(), Some("c"));
        assert_eq!(iter.next().as_deref(), Some("a"));
        assert_eq!(iter.collect::<Vec<_>>(), ["b"]);

        let mut seen = Vec::new();
        for name in &names {
            seen.push(name);
        }
        assert_eq!(seen, ["a", "b", "c"]);
        assert_eq!(format!("{:?}", names), r#"["a", "b", "c"]"#);
    }

    #[test]
    fn test_array_indices_are_names() {
        let ctx = Context::new().unwrap();
        let array = ctx.new_array(&[ctx.null(), ctx.null()]).unwrap();
        assert_eq!(array.copy_property_names().to_vec(), ["0", "1"]);
    }
}
