//! RAII wrapper for JSC strings

use jsbridge_sys::*;
use std::fmt;
use std::marker::PhantomData;

use crate::stats::handle_stats;

/// Owned `JSStringRef`, released when dropped
///
/// Every name, script, body and URL handed to the engine goes through one of
/// these, so the release happens on the error path as well.
///
/// # Thread Safety
///
/// This type is `!Send` and `!Sync` because JSC strings should not be
/// shared across threads.
pub struct JsString {
    raw: JSStringRef,
    /// Marker to make this type !Send + !Sync
    _not_send: PhantomData<*mut ()>,
}

impl JsString {
    /// Create a JSC string from UTF-8, transcoding to UTF-16
    ///
    /// Interior NUL characters are kept, unlike the C-string constructor.
    pub fn new(s: &str) -> Self {
        let units: Vec<JSChar> = s.encode_utf16().collect();
        // SAFETY: the buffer is valid for units.len() code units and copied by the engine
        let raw = unsafe { JSStringCreateWithCharacters(units.as_ptr(), units.len()) };
        assert!(!raw.is_null(), "JSStringCreateWithCharacters returned null");
        handle_stats().record_string_created();
        Self {
            raw,
            _not_send: PhantomData,
        }
    }

    /// Take ownership of a string the engine returned with a +1 retain count
    /// (for example from `JSValueToStringCopy`)
    ///
    /// # Safety
    /// `raw` must be a valid string the caller owns one retain of.
    pub(crate) unsafe fn from_owned(raw: JSStringRef) -> Self {
        assert!(!raw.is_null(), "engine returned a null string");
        handle_stats().record_string_created();
        Self {
            raw,
            _not_send: PhantomData,
        }
    }

    /// Retain a string the engine only lent out
    ///
    /// # Safety
    /// `raw` must be a valid string for the duration of this call.
    pub(crate) unsafe fn retain_borrowed(raw: JSStringRef) -> Self {
        assert!(!raw.is_null(), "engine returned a null string");
        // SAFETY: raw is valid per caller contract
        let raw = unsafe { JSStringRetain(raw) };
        handle_stats().record_string_created();
        Self {
            raw,
            _not_send: PhantomData,
        }
    }

    /// Get the raw JSStringRef
    pub fn raw(&self) -> JSStringRef {
        self.raw
    }

    /// Length in UTF-16 code units
    pub fn len(&self) -> usize {
        // SAFETY: self.raw is valid for the lifetime of self
        unsafe { JSStringGetLength(self.raw) }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// UTF-16 contents, borrowed from the engine
    pub fn as_utf16(&self) -> &[JSChar] {
        let len = self.len();
        if len == 0 {
            return &[];
        }
        // SAFETY: the engine keeps len code units alive until the string is released
        unsafe { std::slice::from_raw_parts(JSStringGetCharactersPtr(self.raw), len) }
    }

    /// Convert to a Rust string, replacing unpaired surrogates
    pub fn to_string_lossy(&self) -> String {
        String::from_utf16_lossy(self.as_utf16())
    }
}

impl Drop for JsString {
    fn drop(&mut self) {
        // SAFETY: self.raw holds exactly one retain owned by this wrapper
        unsafe { JSStringRelease(self.raw) };
        handle_stats().record_string_released();
    }
}

impl PartialEq for JsString {
    fn eq(&self, other: &Self) -> bool {
        // SAFETY: both strings are valid
        unsafe { JSStringIsEqual(self.raw, other.raw) }
    }
}

impl fmt::Display for JsString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_lossy())
    }
}

impl fmt::Debug for JsString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "JsString({:?})", self.to_string_lossy())
    }
}

impl From<&str> for JsString {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Null when absent, for optional string parameters such as source URLs
pub(crate) fn raw_or_null(s: Option<&JsString>) -> JSStringRef {
    s.map_or(std::ptr::null_mut(), JsString::raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_creation() {
        let s = JsString::new("hello");
        assert_eq!(s.to_string(), "hello");
        assert_eq!(s.len(), 5);
    }

    #[test]
    fn test_empty_string() {
        let s = JsString::new("");
        assert!(s.is_empty());
        assert_eq!(s.to_string(), "");
        assert!(s.as_utf16().is_empty());
    }

    #[test]
    fn test_unicode_string() {
        let s = JsString::new("héllo 🌍");
        assert_eq!(s.to_string(), "héllo 🌍");
        // the emoji is a surrogate pair
        assert_eq!(s.len(), 8);
    }

    #[test]
    fn test_interior_nul_is_kept() {
        let s = JsString::new("a\0b");
        assert_eq!(s.len(), 3);
        assert_eq!(s.to_string(), "a\0b");
    }

    #[test]
    fn test_engine_equality() {
        assert_eq!(JsString::new("abc"), JsString::from("abc"));
        assert_ne!(JsString::new("abc"), JsString::new("abd"));
    }

    #[test]
    fn test_retain_borrowed_outlives_original() {
        let original = JsString::new("kept");
        // SAFETY: original is alive for the call
        let copy = unsafe { JsString::retain_borrowed(original.raw()) };
        drop(original);
        assert_eq!(copy.to_string(), "kept");
    }

    #[test]
    fn test_raw_or_null() {
        assert!(raw_or_null(None).is_null());
        let s = JsString::new("url");
        assert_eq!(raw_or_null(Some(&s)), s.raw());
    }
}
