//! StreamKey - 会话内的逻辑流名称

use std::borrow::Borrow;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// Logical channel of a session (`depth`, `gyro_ascii`, ...).
///
/// Hashes like the underlying `str`, so registry maps keyed by `StreamKey`
/// can be queried with a plain `&str`.
///
/// ```
/// use contracts::StreamKey;
///
/// let key = StreamKey::from("gyro");
/// assert_eq!(key.ascii(), "gyro_ascii");
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamKey(Arc<str>);

impl StreamKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 对应的 ASCII 镜像流
    pub fn ascii(&self) -> Self {
        Self::from(format!("{}_ascii", self.0))
    }
}

impl Deref for StreamKey {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for StreamKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for StreamKey {
    fn from(s: &str) -> Self {
        Self(s.into())
    }
}

impl From<String> for StreamKey {
    fn from(s: String) -> Self {
        Self(s.into())
    }
}

impl PartialEq<str> for StreamKey {
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl PartialEq<&str> for StreamKey {
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}

impl fmt::Display for StreamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for StreamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}
