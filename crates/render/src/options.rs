//! Command-line flags passed to Chrome.
//!
//! An [`Options`] set is an insertion-ordered map of flag names to optional
//! values. Setting a name that already exists replaces the value in place, so
//! the rendered argument order only depends on when a flag was first seen.

/// Flags supplied to every invocation unless removed or overridden.
pub const DEFAULT_FLAGS: [&str; 12] = [
    "headless",
    "incognito",
    "mute-audio",
    "no-first-run",
    "no-margins",
    "enable-viewport",
    "disable-gpu",
    "disable-translate",
    "disable-extensions",
    "disable-sync",
    "disable-default-apps",
    "hide-scrollbars",
];

/// An ordered set of Chrome flags.
///
/// # Example
///
/// ```
/// use chromepdf_render::Options;
///
/// let options = Options::new().with_flag("headless").with("window-size", "1280,720");
/// assert_eq!(options.to_args(), ["--headless", "--window-size=1280,720"]);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Options {
    entries: Vec<(String, Option<String>)>,
}
impl Options {
    /// Creates an empty option set.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in defaults: every entry of [`DEFAULT_FLAGS`], without values.
    pub fn defaults() -> Self {
        DEFAULT_FLAGS.iter().map(|flag| (*flag, None::<&str>)).collect()
    }

    /// Sets `name` to `value`, replacing any previous value for that name.
    pub fn insert(&mut self, name: impl Into<String>, value: Option<String>) -> &mut Self {
        let name = name.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, existing)) => *existing = value,
            None => self.entries.push((name, value)),
        }
        self
    }

    /// Sets a flag that carries a value (`--name=value`).
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.insert(name, Some(value.into()))
    }

    /// Sets a bare flag (`--name`).
    pub fn set_flag(&mut self, name: impl Into<String>) -> &mut Self {
        self.insert(name, None)
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    pub fn with_flag(mut self, name: impl Into<String>) -> Self {
        self.set_flag(name);
        self
    }

    /// Removes a flag entirely, returning its previous value.
    pub fn remove(&mut self, name: &str) -> Option<Option<String>> {
        let index = self.entries.iter().position(|(existing, _)| existing == name)?;
        Some(self.entries.remove(index).1)
    }

    /// `None` if the flag is absent, `Some(None)` if it's a bare flag.
    pub fn get(&self, name: &str) -> Option<Option<&str>> {
        self.entries.iter().find(|(existing, _)| existing == name).map(|(_, value)| value.as_deref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Overlays `other` on top of this set; `other` wins on conflicts.
    pub fn merge(&mut self, other: &Options) -> &mut Self {
        for (name, value) in &other.entries {
            self.insert(name.clone(), value.clone());
        }
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.entries.iter().map(as_pair)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Renders every entry as a command-line argument, in order.
    pub fn to_args(&self) -> Vec<String> {
        self.iter().map(|(name, value)| render_flag(name, value)).collect()
    }
}

/// Empty values render the same as absent ones: `--name`, never `--name=`.
pub(crate) fn render_flag(name: &str, value: Option<&str>) -> String {
    match value {
        Some(value) if !value.is_empty() => format!("--{name}={value}"),
        _ => format!("--{name}"),
    }
}

impl<K, V> FromIterator<(K, Option<V>)> for Options
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, Option<V>)>>(iter: I) -> Self {
        let mut options = Self::new();
        options.extend(iter);
        options
    }
}

impl<K, V> Extend<(K, Option<V>)> for Options
where
    K: Into<String>,
    V: Into<String>,
{
    fn extend<I: IntoIterator<Item = (K, Option<V>)>>(&mut self, iter: I) {
        for (name, value) in iter {
            self.insert(name, value.map(Into::into));
        }
    }
}

impl<'a> IntoIterator for &'a Options {
    type Item = (&'a str, Option<&'a str>);
    type IntoIter = std::iter::Map<
        std::slice::Iter<'a, (String, Option<String>)>,
        fn(&'a (String, Option<String>)) -> (&'a str, Option<&'a str>),
    >;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter().map(as_pair as fn(&'a (String, Option<String>)) -> (&'a str, Option<&'a str>))
    }
}

fn as_pair((name, value): &(String, Option<String>)) -> (&str, Option<&str>) {
    (name.as_str(), value.as_deref())
}
