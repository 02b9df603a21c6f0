//! Flat permissions

use crate::error::Result;
use crate::options::Opt;
use crate::pattern::match_any;

use super::PermissionData;

/// Permission identified by its name alone
#[derive(Clone, Debug)]
pub struct SimplePermission {
    pub(super) data: PermissionData,
}

impl SimplePermission {
    /// Creates a simple permission
    pub fn new(name: impl Into<String>, options: impl IntoIterator<Item = Opt>) -> Result<Self> {
        let data = PermissionData::build(name.into(), None, options)?;
        Ok(Self { data })
    }

    pub fn name(&self) -> &str {
        &self.data.name
    }

    /// Returns true if the name matches any of the requested patterns
    pub(super) fn matches_request(&self, patterns: &[&str]) -> bool {
        match_any(&self.data.name, patterns)
    }
}
