//! Dataset open options and driver creation options.

use std::fmt::{Debug, Formatter};

use bitflags::bitflags;
use log::warn;

use crate::errors::{RasterError, Result};

/// Open options for [`crate::Dataset`].
#[derive(Debug, Default)]
pub struct DatasetOptions<'a> {
    pub open_flags: OpenFlags,
    /// Restrict format probing to these driver short names.
    pub allowed_drivers: Option<&'a [&'a str]>,
}

bitflags! {
    /// Extended open flags used by [`Dataset::open_ex`].
    ///
    /// [`Dataset::open_ex`]: crate::Dataset::open_ex
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct OpenFlags: u32 {
        /// Open in read-only mode (default).
        const READONLY = 0x00;
        /// Open in update mode.
        const UPDATE = 0x01;
    }
}

impl Default for OpenFlags {
    fn default() -> OpenFlags {
        OpenFlags::READONLY
    }
}

/// Key/value pairs of driver-specific creation options, passed verbatim
/// to [`Driver::create_with_options`](crate::Driver::create_with_options)
/// and [`Driver::create_copy`](crate::Driver::create_copy).
///
/// Keys are unique (later assignments overwrite) and order-insensitive.
#[derive(Default, Clone)]
pub struct CreationOptions {
    items: Vec<(String, String)>,
}

impl CreationOptions {
    /// Creates an empty option list.
    pub fn new() -> Self {
        Default::default()
    }

    /// Assigns `value` to `name`.
    ///
    /// Overwrites duplicate `name`s.
    ///
    /// Returns `Ok(())` on success, an error if `name` has non-alphanumeric
    /// characters, or `value` has newline characters.
    pub fn set_name_value(&mut self, name: &str, value: &str) -> Result<()> {
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(RasterError::BadArgument(format!(
                "Invalid characters in name: '{name}'"
            )));
        }
        if value.contains(['\n', '\r']) {
            return Err(RasterError::BadArgument(format!(
                "Invalid characters in value: '{value}'"
            )));
        }
        match self.items.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(name)) {
            Some((_, v)) => *v = value.to_string(),
            None => self.items.push((name.to_string(), value.to_string())),
        }
        Ok(())
    }

    /// Looks up the value corresponding to `key`, case-insensitively.
    pub fn fetch_name_value(&self, key: &str) -> Option<&str> {
        self.items
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Number of entries in the list.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterator over the name/value pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.items.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl Debug for CreationOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut list = f.debug_list();
        for (k, v) in self.iter() {
            list.entry(&format!("{k}={v}"));
        }
        list.finish()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for CreationOptions {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut opts = CreationOptions::new();
        for (k, v) in iter {
            // skips entries with invalid characters
            let _ = opts.set_name_value(&k.into(), &v.into());
        }
        opts
    }
}

/// Type tag of a single creation option descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionType {
    /// `YES`/`NO` (also accepts `TRUE`/`FALSE`, `ON`/`OFF`).
    Boolean,
    Int,
    Float,
    /// Free-form string.
    String,
    /// One value out of a fixed set.
    StringSelect,
}

/// One entry of a driver's statically advertised creation option schema.
#[derive(Debug, Clone, Copy)]
pub struct CreationOptionDef {
    pub name: &'static str,
    pub option_type: OptionType,
    pub default: Option<&'static str>,
    /// Allowed values; only meaningful for [`OptionType::StringSelect`].
    pub allowed: &'static [&'static str],
}

const BOOL_WORDS: [&str; 6] = ["YES", "NO", "TRUE", "FALSE", "ON", "OFF"];

/// Validates `options` against a driver's option schema.
///
/// Unknown option names are logged and passed through, matching the
/// tolerant behavior of most format libraries; known names with values
/// that fail their type tag are rejected.
pub fn validate_creation_options(
    defs: &[CreationOptionDef],
    options: &CreationOptions,
) -> Result<()> {
    for (name, value) in options.iter() {
        let Some(def) = defs.iter().find(|d| d.name.eq_ignore_ascii_case(name)) else {
            warn!("creation option '{name}' is not declared by the driver; passing through");
            continue;
        };
        let ok = match def.option_type {
            OptionType::Boolean => BOOL_WORDS.iter().any(|w| w.eq_ignore_ascii_case(value)),
            OptionType::Int => value.parse::<i64>().is_ok(),
            OptionType::Float => value.parse::<f64>().is_ok(),
            OptionType::String => true,
            OptionType::StringSelect => def.allowed.iter().any(|a| a.eq_ignore_ascii_case(value)),
        };
        if !ok {
            return Err(RasterError::BadArgument(format!(
                "invalid value '{value}' for creation option '{name}' ({:?})",
                def.option_type
            )));
        }
    }
    Ok(())
}
