//! Request context passed through to custom checks

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Opaque user data attached to permissions, roles or a [`Context`]
pub type ExtData = Arc<dyn Any + Send + Sync>;

/// Per-request context
///
/// The engine does not interpret the context; it is handed to custom
/// checks untouched. A single opaque value can be attached to it.
///
/// ```
/// use std::sync::Arc;
/// use cretoai_rbac::Context;
///
/// let ctx = Context::new().with_ext_data(Some(Arc::new(42u32)));
/// assert_eq!(ctx.ext_data_as::<u32>(), Some(&42));
/// ```
#[derive(Clone, Default)]
pub struct Context {
    ext_data: Option<ExtData>,
}

impl Context {
    /// Creates an empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches a value, replacing the previous one
    ///
    /// `None` leaves the current value in place.
    pub fn with_ext_data(mut self, data: Option<ExtData>) -> Self {
        if data.is_some() {
            self.ext_data = data;
        }
        self
    }

    /// The attached value
    pub fn ext_data(&self) -> Option<&ExtData> {
        self.ext_data.as_ref()
    }

    /// The attached value, if it is a `T`
    pub fn ext_data_as<T: Any>(&self) -> Option<&T> {
        self.ext_data.as_deref().and_then(|data| data.downcast_ref::<T>())
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("ext_data", &self.ext_data.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_ext_data_last_write_wins() {
        let ctx = Context::new()
            .with_ext_data(Some(Arc::new("first")))
            .with_ext_data(Some(Arc::new("second")));
        assert_eq!(ctx.ext_data_as::<&str>(), Some(&"second"));
    }

    #[test]
    fn test_none_keeps_previous_value() {
        let val: HashMap<String, String> = [("test".to_string(), "value".to_string())].into();
        let ctx = Context::new()
            .with_ext_data(Some(Arc::new(val.clone())))
            .with_ext_data(None);
        assert_eq!(ctx.ext_data_as::<HashMap<String, String>>(), Some(&val));
    }

    #[test]
    fn test_wrong_type() {
        let ctx = Context::new().with_ext_data(Some(Arc::new(1u8)));
        assert!(ctx.ext_data().is_some());
        assert!(ctx.ext_data_as::<u16>().is_none());
        assert!(Context::new().ext_data().is_none());
    }
}
